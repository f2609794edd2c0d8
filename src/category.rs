use serde::Deserialize;
use serde_json::Value;

use crate::client::api_path;
use crate::descriptor::DescriptorRecord;
use crate::{AstrClient, ClientError, Descriptor};

/// An archive category as returned by the server.
///
/// Building a `Category` sends no request. [`Category::get_descriptors`]
/// contacts the server on every call and never caches.
#[derive(Clone, Debug)]
pub struct Category<'c> {
    client: &'c AstrClient,
    id: String,
    name: String,
    author: String,
    definitions: Vec<Descriptor>,
}

#[derive(Deserialize)]
pub(crate) struct CategoryRecord {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    descriptors: Vec<DescriptorRecord>,
}

impl<'c> Category<'c> {
    pub(crate) fn from_record(client: &'c AstrClient, record: CategoryRecord) -> Self {
        let definitions = record
            .descriptors
            .into_iter()
            .map(|descriptor| Descriptor::new(&record.name, descriptor))
            .collect();
        Self {
            client,
            id: record.id,
            name: record.name,
            author: record.author,
            definitions,
        }
    }

    pub(crate) fn from_json(client: &'c AstrClient, value: Value) -> Result<Self, ClientError> {
        Ok(Self::from_record(client, serde_json::from_value(value)?))
    }

    pub(crate) fn list_from_json(
        client: &'c AstrClient,
        value: Value,
    ) -> Result<Vec<Self>, ClientError> {
        let records: Vec<CategoryRecord> = serde_json::from_value(value)?;
        Ok(records
            .into_iter()
            .map(|record| Self::from_record(client, record))
            .collect())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Descriptor definitions embedded in the category payload, in server order.
    pub fn definitions(&self) -> &[Descriptor] {
        &self.definitions
    }

    /// Fetches the descriptors of this category from the server.
    pub fn get_descriptors(&self) -> Result<Vec<Descriptor>, ClientError> {
        let value = self
            .client
            .get_json(&api_path(&["archives", "descriptors", &self.name]))?;
        let records: Vec<DescriptorRecord> = serde_json::from_value(value)?;
        Ok(records
            .into_iter()
            .map(|record| Descriptor::new(&self.name, record))
            .collect())
    }

    /// Fetches the allowed values of one descriptor of this category.
    pub fn get_descriptor_options(&self, descriptor: &str) -> Result<Vec<String>, ClientError> {
        let value = self
            .client
            .get_json(&api_path(&["categories", "options", &self.name, descriptor]))?;
        Ok(serde_json::from_value(value)?)
    }
}
