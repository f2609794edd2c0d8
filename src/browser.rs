use std::path::Path;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::archive::{upload_form, validate_upload_files};
use crate::client::api_path;
use crate::{Archive, ArchiveQuery, AstrClient, Category, ClientError, NewArchive};

/// Search and listing entry point over the archives of one ASTR server.
///
/// Returned [`Archive`] and [`Category`] values borrow the browser's client.
#[derive(Debug)]
pub struct Browser {
    client: AstrClient,
}

impl Browser {
    pub fn new(client: AstrClient) -> Self {
        Self { client }
    }

    /// Creates a browser over a client configured from `LIBASTR_*` variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Ok(Self::new(AstrClient::from_env()?))
    }

    pub fn client(&self) -> &AstrClient {
        &self.client
    }

    pub fn get_all_archives(&self) -> Result<Vec<Archive<'_>>, ClientError> {
        Archive::list_from_json(&self.client, self.client.get_json("archives")?)
    }

    pub fn get_archive_by_id(&self, id: &str) -> Result<Archive<'_>, ClientError> {
        let value = self.client.get_json(&api_path(&["archives", "id", id]))?;
        Archive::from_json(&self.client, value)
    }

    /// Returns archives matching `query`, in server order.
    ///
    /// Sends `GET archives` with `author`, `category`, `date` and
    /// `descriptor_<name>` query parameters, so the server must accept
    /// those filters. For the server's native search with `$and` and
    /// `$elemMatch` clauses, use [`Browser::find_archives`].
    pub fn get_archives_by_args(
        &self,
        query: &ArchiveQuery,
    ) -> Result<Vec<Archive<'_>>, ClientError> {
        let pairs = query.to_pairs();
        let borrowed: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let value = self.client.get_json_with_query("archives", &borrowed)?;
        Archive::list_from_json(&self.client, value)
    }

    /// Returns archives matching a raw server-side filter document,
    /// e.g. `{"category": "MY_CAT", "author": "John DOE"}`.
    pub fn find_archives(&self, filter: Value) -> Result<Vec<Archive<'_>>, ClientError> {
        let value = self
            .client
            .request_json(Method::POST, "archives", Some(filter))?;
        Archive::list_from_json(&self.client, value)
    }

    /// Descriptors in use across all categories, as raw JSON.
    pub fn get_all_descriptors(&self) -> Result<Value, ClientError> {
        self.client.get_json("archives/descriptors")
    }

    pub fn get_all_archive_categories(&self) -> Result<Vec<Category<'_>>, ClientError> {
        Category::list_from_json(&self.client, self.client.get_json("categories")?)
    }

    pub fn get_archive_category_by_id(&self, id: &str) -> Result<Category<'_>, ClientError> {
        let value = self.client.get_json(&api_path(&["categories", "id", id]))?;
        Category::from_json(&self.client, value)
    }

    pub fn get_archive_category_by_name(&self, name: &str) -> Result<Category<'_>, ClientError> {
        let value = self
            .client
            .get_json(&api_path(&["categories", "name", name]))?;
        Category::from_json(&self.client, value)
    }

    /// Registers a new archive and uploads its files.
    ///
    /// The files are checked before any request is sent: between one and
    /// [`crate::MAX_UPLOAD_FILES`] regular files with distinct names. The
    /// author is the authenticated user.
    pub fn upload_archive<P: AsRef<Path>>(
        &self,
        archive: &NewArchive,
        files: &[P],
    ) -> Result<Archive<'_>, ClientError> {
        let files = validate_upload_files(files)?;
        let author = self.client.username()?;

        let response = self
            .client
            .post_json("archives/add", archive.to_request(&author))?;
        if response.get("name").and_then(Value::as_str) == Some("Failed") {
            return Err(ClientError::ArchiveRejected(response));
        }

        let Some(record) = response.get("archive").cloned() else {
            return Err(ClientError::ArchiveRejected(response));
        };
        let created = Archive::from_json(&self.client, record)?;
        debug!(id = created.id(), files = files.len(), "archive registered");

        self.client.upload("upload", upload_form(created.id(), &files)?)?;
        Ok(created)
    }
}
