use std::collections::BTreeMap;

/// Prefix the server expects on descriptor filter keys.
pub const DESCRIPTOR_PREFIX: &str = "descriptor_";

/// Filters for [`crate::Browser::get_archives_by_args`].
///
/// Unset filters are left out of the query string entirely, so the server
/// applies no restriction on that axis.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveQuery {
    author: Option<String>,
    category: Option<String>,
    dates: Vec<String>,
    descriptors: BTreeMap<String, String>,
    extra: Vec<(String, String)>,
}

impl ArchiveQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restricts to a single date (`YYYY-MM-DD`).
    #[must_use]
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.dates = vec![date.into()];
        self
    }

    /// Restricts to an inclusive range of dates, sent as two `date` parameters.
    #[must_use]
    pub fn date_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.dates = vec![from.into(), to.into()];
        self
    }

    /// Adds a descriptor filter. A later value for the same key replaces the earlier one.
    #[must_use]
    pub fn descriptor(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptors.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn descriptors<I, K, V>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.descriptors.extend(
            descriptors
                .into_iter()
                .map(|(name, value)| (name.into(), value.into())),
        );
        self
    }

    /// Adds any other server-side filter, passed through verbatim.
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Serializes the filters into ordered query pairs.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(author) = &self.author {
            pairs.push(("author".to_owned(), author.clone()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category".to_owned(), category.clone()));
        }
        pairs.extend(self.dates.iter().map(|date| ("date".to_owned(), date.clone())));
        pairs.extend(
            self.descriptors
                .iter()
                .map(|(name, value)| (format!("{DESCRIPTOR_PREFIX}{name}"), value.clone())),
        );
        pairs.extend(self.extra.iter().cloned());
        pairs
    }
}
