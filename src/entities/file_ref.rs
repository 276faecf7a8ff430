//! Attachment references.
//!
//! A file attached to an expense lives either in remote blob storage (id, name, URL)
//! or inline in the local document as a base64 data URL. Which one is decided by the
//! store that accepted the upload.

use crate::errors::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// Raw file handed over by the form before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Original file name
    pub name: String,
    /// MIME type reported by the form
    pub mime_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

/// File stored in remote blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Blob storage id
    pub id: String,
    /// File name as stored
    pub name: String,
    /// Viewer URL
    pub url: String,
}

impl RemoteFile {
    /// Builds a reference and derives the viewer URL from the id.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let url = format!("https://drive.google.com/file/d/{id}/view");
        Self {
            id,
            name: name.into(),
            url,
        }
    }
}

/// File kept inline in the local document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineFile {
    /// Original file name
    pub name: String,
    /// MIME type
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size in bytes of the decoded contents
    pub size: u64,
    /// `data:<mime>;base64,<payload>` URL
    pub data: String,
}

impl InlineFile {
    /// Encodes an upload as a data URL.
    #[must_use]
    pub fn encode(upload: &Upload) -> Self {
        Self {
            name: upload.name.clone(),
            mime_type: upload.mime_type.clone(),
            size: upload.bytes.len() as u64,
            data: format!(
                "data:{};base64,{}",
                upload.mime_type,
                STANDARD.encode(&upload.bytes)
            ),
        }
    }

    /// Decodes the data URL back into file contents.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        let (_, payload) = self
            .data
            .split_once(";base64,")
            .ok_or_else(|| Error::Store {
                message: format!("Attachment {} is not a base64 data URL", self.name),
            })?;
        Ok(STANDARD.decode(payload)?)
    }
}

/// A file attached to an expense. Exactly one representation is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileRef {
    /// Stored in remote blob storage
    Remote(RemoteFile),
    /// Stored inline in the local document
    Inline(InlineFile),
}

impl FileRef {
    /// File name regardless of where it is stored.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Remote(file) => &file.name,
            Self::Inline(file) => &file.name,
        }
    }
}
