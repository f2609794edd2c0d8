use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use reqwest::blocking::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use zip::ZipArchive;

use crate::client::{api_path, bare_file_name};
use crate::{AstrClient, ClientError};

/// Most files a single archive upload may contain.
pub const MAX_UPLOAD_FILES: usize = 50;

/// An archive as returned by the server.
///
/// This is a snapshot taken at fetch time. It borrows the client that
/// fetched it so follow-up calls reuse the same credentials.
#[derive(Clone, Debug)]
pub struct Archive<'c> {
    client: &'c AstrClient,
    record: ArchiveRecord,
}

/// Metadata of the stored archive file, when the server reports it.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: Option<String>,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ArchiveRecord {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    comments: Option<String>,
    #[serde(default)]
    descriptors: Vec<DescriptorValue>,
    #[serde(default)]
    file: Option<FileMetadata>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
struct DescriptorValue {
    name: String,
    value: String,
}

impl<'c> Archive<'c> {
    pub(crate) fn from_json(client: &'c AstrClient, value: Value) -> Result<Self, ClientError> {
        Ok(Self {
            client,
            record: serde_json::from_value(value)?,
        })
    }

    pub(crate) fn list_from_json(
        client: &'c AstrClient,
        value: Value,
    ) -> Result<Vec<Self>, ClientError> {
        let records: Vec<ArchiveRecord> = serde_json::from_value(value)?;
        Ok(records
            .into_iter()
            .map(|record| Self { client, record })
            .collect())
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn author(&self) -> &str {
        &self.record.author
    }

    pub fn date(&self) -> &str {
        &self.record.date
    }

    /// Name of the archive's category.
    pub fn category(&self) -> &str {
        &self.record.category
    }

    pub fn comments(&self) -> Option<&str> {
        self.record.comments.as_deref()
    }

    /// Descriptor values keyed by descriptor name.
    pub fn descriptors(&self) -> BTreeMap<&str, &str> {
        self.record
            .descriptors
            .iter()
            .map(|d| (d.name.as_str(), d.value.as_str()))
            .collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<&str> {
        self.record
            .descriptors
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    pub fn file(&self) -> Option<&FileMetadata> {
        self.record.file.as_ref()
    }

    /// Downloads the archive file.
    ///
    /// `local_path` may be a directory, in which case the server-declared
    /// file name is used (falling back to the stored file name, then
    /// `<id>.zip`), or a full file path. Names coming from the server never
    /// leave `local_path`. Returns the path written. A failed download
    /// leaves any partial file in place.
    pub fn download(&self, local_path: impl AsRef<Path>) -> Result<PathBuf, ClientError> {
        let fallback = self
            .file()
            .and_then(|file| file.name.as_deref())
            .and_then(bare_file_name)
            .map_or_else(|| format!("{}.zip", self.id()), str::to_owned);
        self.client.download(
            &api_path(&["download", "id", self.id()]),
            local_path.as_ref(),
            &fallback,
        )
    }

    /// Downloads the archive into `dir` and unpacks it into `dir/<id>/`.
    ///
    /// An existing `dir/<id>/` is replaced. The intermediate `<id>.zip` is
    /// removed once extraction succeeds. Returns the extraction folder.
    pub fn download_and_extract(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ClientError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ClientError::io(
                dir,
                io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }
        let stem = bare_file_name(self.id())
            .ok_or_else(|| ClientError::InvalidPath(self.id().to_owned()))?;

        let zip_name = format!("{stem}.zip");
        let zip_path = self.client.download(
            &api_path(&["download", "id", self.id()]),
            &dir.join(&zip_name),
            &zip_name,
        )?;

        let folder = dir.join(stem);
        if folder.is_dir() {
            fs::remove_dir_all(&folder).map_err(|error| ClientError::io(&folder, error))?;
        }
        fs::create_dir(&folder).map_err(|error| ClientError::io(&folder, error))?;

        let file = File::open(&zip_path).map_err(|error| ClientError::io(&zip_path, error))?;
        let extract_error = |source| ClientError::Extract {
            path: zip_path.clone(),
            source,
        };
        let mut archive = ZipArchive::new(file).map_err(extract_error)?;
        archive.extract(&folder).map_err(extract_error)?;
        fs::remove_file(&zip_path).map_err(|error| ClientError::io(&zip_path, error))?;

        debug!(id = self.id(), folder = %folder.display(), entries = archive.len(), "archive extracted");
        Ok(folder)
    }

    /// Deletes this archive on the server.
    pub fn delete(&self) -> Result<(), ClientError> {
        self.client
            .delete_json(&api_path(&["archives", "id", self.id()]))?;
        Ok(())
    }

    /// Sends the fields set in `update`. The local snapshot is not modified.
    pub fn update(&self, update: &ArchiveUpdate) -> Result<(), ClientError> {
        self.client.post_json(
            &api_path(&["archives", "id", self.id()]),
            serde_json::to_value(update)?,
        )?;
        Ok(())
    }

    /// Replaces the stored archive file with a new set of local files.
    pub fn replace_files<P: AsRef<Path>>(&self, files: &[P]) -> Result<(), ClientError> {
        let files = validate_upload_files(files)?;
        self.client.post_json(
            &api_path(&["archives", "id", self.id()]),
            json!({ "newArchive": "true" }),
        )?;
        self.client
            .upload("upload/replace-zip", upload_form(self.id(), &files)?)?;
        Ok(())
    }
}

/// Metadata for an archive that does not exist on the server yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewArchive {
    date: String,
    category: String,
    descriptors: BTreeMap<String, String>,
    comments: Option<String>,
}

impl NewArchive {
    /// `category` must already exist on the server, and every one of its
    /// descriptors needs a value.
    pub fn new(date: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            category: category.into(),
            descriptors: BTreeMap::new(),
            comments: None,
        }
    }

    #[must_use]
    pub fn descriptor(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptors.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub(crate) fn to_request(&self, author: &str) -> Value {
        let mut body = json!({
            "date": self.date,
            "category": self.category,
            "descriptors": descriptor_list(&self.descriptors),
            "author": author,
        });
        if let Some(comments) = &self.comments {
            body["comments"] = Value::String(comments.clone());
        }
        body
    }
}

/// A partial update of an existing archive. Unset fields are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comments: Option<String>,
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        serialize_with = "serialize_descriptors"
    )]
    descriptors: BTreeMap<String, String>,
}

impl ArchiveUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    #[must_use]
    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Only values of descriptors the archive already has can be changed.
    #[must_use]
    pub fn descriptor(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptors.insert(name.into(), value.into());
        self
    }
}

fn serialize_descriptors<S>(
    descriptors: &BTreeMap<String, String>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    descriptor_list(descriptors).serialize(serializer)
}

fn descriptor_list(descriptors: &BTreeMap<String, String>) -> Vec<DescriptorValue> {
    descriptors
        .iter()
        .map(|(name, value)| DescriptorValue {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Checks the upload list and pairs each path with its file name.
pub(crate) fn validate_upload_files<P: AsRef<Path>>(
    files: &[P],
) -> Result<Vec<(PathBuf, String)>, ClientError> {
    if files.is_empty() {
        return Err(ClientError::InvalidUpload("empty list of files".to_owned()));
    }
    if files.len() > MAX_UPLOAD_FILES {
        return Err(ClientError::InvalidUpload(format!(
            "too many files to upload ({}), the limit is {MAX_UPLOAD_FILES}",
            files.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut checked = Vec::with_capacity(files.len());
    for path in files {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ClientError::InvalidUpload(format!(
                "{} is not a file",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !seen.insert(name.clone()) {
            return Err(ClientError::InvalidUpload(format!(
                "cannot upload two files with the same name: {name}"
            )));
        }
        checked.push((path.to_path_buf(), name));
    }
    Ok(checked)
}

/// Builds the multipart body for the `upload` endpoints.
pub(crate) fn upload_form(
    archive_id: &str,
    files: &[(PathBuf, String)],
) -> Result<Form, ClientError> {
    let mut form = Form::new().text("archiveId", archive_id.to_owned());
    for (_, name) in files {
        form = form.text("files", name.clone());
    }
    for (path, _) in files {
        form = form
            .file("files", path)
            .map_err(|error| ClientError::io(path, error))?;
    }
    Ok(form)
}
