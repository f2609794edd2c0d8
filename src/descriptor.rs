use serde::Deserialize;

/// A descriptor definition: a metadata key that archives of one category carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    category: String,
    options: Vec<String>,
}

impl Descriptor {
    pub(crate) fn new(category: &str, record: DescriptorRecord) -> Self {
        let (name, options) = match record {
            DescriptorRecord::Name(name) => (name, Vec::new()),
            DescriptorRecord::Definition { name, options } => (name, options),
        };
        Self {
            name,
            category: category.to_owned(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the category this descriptor belongs to.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Allowed values, when the server lists them. Empty means free-form.
    pub fn options(&self) -> &[String] {
        &self.options
    }
}

/// Wire shape of a descriptor: either a bare name or `{name, options}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DescriptorRecord {
    Name(String),
    Definition {
        name: String,
        #[serde(default)]
        options: Vec<String>,
    },
}
