//! Remote table client.
//!
//! [`TableClient`] is the row-level contract the remote store needs: read a range,
//! append a row, overwrite a range, delete a row, upload a file, and make sure a table
//! exists with its header. [`SheetsClient`] implements it over the Google Sheets v4
//! values API and the Drive v3 multipart upload endpoint using a bearer token.

use super::tables::header_range;
use crate::{
    config::RemoteConfig,
    entities::{RemoteFile, Upload},
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::{Client, Response, Url, multipart};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// Row-level operations against named tables.
#[async_trait]
pub trait TableClient: Send + Sync {
    /// Reads `range` (A1 notation without the table prefix) as rows of cell text.
    async fn read(&self, table: &str, range: &str) -> Result<Vec<Vec<String>>>;

    /// Appends one row after the last used row.
    async fn append(&self, table: &str, row: Vec<Value>) -> Result<()>;

    /// Overwrites the cells of `range`.
    async fn update(&self, table: &str, range: &str, values: Vec<Vec<Value>>) -> Result<()>;

    /// Deletes a row by zero-based sheet index (the header is row 0).
    async fn delete_row(&self, table: &str, index: usize) -> Result<()>;

    /// Uploads a file to blob storage.
    async fn upload_file(&self, upload: &Upload) -> Result<RemoteFile>;

    /// Creates the table if it is missing and writes its header row.
    async fn ensure_table(&self, table: &str, header: &[&str]) -> Result<()>;
}

#[async_trait]
impl<T: TableClient + ?Sized> TableClient for Arc<T> {
    async fn read(&self, table: &str, range: &str) -> Result<Vec<Vec<String>>> {
        (**self).read(table, range).await
    }

    async fn append(&self, table: &str, row: Vec<Value>) -> Result<()> {
        (**self).append(table, row).await
    }

    async fn update(&self, table: &str, range: &str, values: Vec<Vec<Value>>) -> Result<()> {
        (**self).update(table, range, values).await
    }

    async fn delete_row(&self, table: &str, index: usize) -> Result<()> {
        (**self).delete_row(table, index).await
    }

    async fn upload_file(&self, upload: &Upload) -> Result<RemoteFile> {
        (**self).upload_file(upload).await
    }

    async fn ensure_table(&self, table: &str, header: &[&str]) -> Result<()> {
        (**self).ensure_table(table, header).await
    }
}

/// Text of a cell as returned by an unformatted read.
#[must_use]
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    id: String,
    name: String,
}

/// HTTP client for the spreadsheet and upload APIs.
pub struct SheetsClient {
    client: Client,
    config: RemoteConfig,
    access_token: String,
}

impl SheetsClient {
    /// Builds a client authorised with `access_token`.
    pub fn new(config: RemoteConfig, access_token: String) -> Result<Self> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(Error::Config {
                message: "remote.spreadsheet_id must be set to use the remote store".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            access_token,
        })
    }

    /// URL of the spreadsheet with extra path segments appended.
    fn spreadsheet_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.sheets_api).map_err(|e| Error::Config {
            message: format!("Invalid sheets_api URL: {e}"),
        })?;
        url.path_segments_mut()
            .map_err(|()| Error::Config {
                message: "sheets_api URL cannot take path segments".to_string(),
            })?
            .pop_if_empty()
            .push(&self.config.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    /// Turns a non-success response into [`Error::Remote`].
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(Error::Remote {
            status: status.as_u16(),
            message,
        })
    }

    async fn sheet_id(&self, table: &str) -> Result<Option<i64>> {
        let mut url = self.spreadsheet_url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let meta: SpreadsheetMeta = Self::check(response).await?.json().await?;

        Ok(meta
            .sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == table)
            .map(|sheet| sheet.properties.sheet_id))
    }

    async fn batch_update(&self, requests: Value) -> Result<()> {
        let url = self.spreadsheet_url(&[])?;
        let url = Url::parse(&format!("{url}:batchUpdate")).map_err(|e| Error::Config {
            message: format!("Invalid batchUpdate URL: {e}"),
        })?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl TableClient for SheetsClient {
    async fn read(&self, table: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let mut url = self.spreadsheet_url(&["values", &format!("{table}!{range}")])?;
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body: ValueRange = Self::check(response).await?.json().await?;
        debug!("Read {} rows from {}!{}", body.values.len(), table, range);

        Ok(body
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn append(&self, table: &str, row: Vec<Value>) -> Result<()> {
        let mut url = self.spreadsheet_url(&["values", &format!("{table}!A:A:append")])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, table: &str, range: &str, values: Vec<Vec<Value>>) -> Result<()> {
        let mut url = self.spreadsheet_url(&["values", &format!("{table}!{range}")])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW");

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": values }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_row(&self, table: &str, index: usize) -> Result<()> {
        let sheet_id = self.sheet_id(table).await?.ok_or_else(|| Error::Store {
            message: format!("Table {table} does not exist"),
        })?;

        self.batch_update(json!([{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": index,
                    "endIndex": index + 1,
                }
            }
        }]))
        .await
    }

    async fn upload_file(&self, upload: &Upload) -> Result<RemoteFile> {
        let mut url = Url::parse(&self.config.upload_api).map_err(|e| Error::Config {
            message: format!("Invalid upload_api URL: {e}"),
        })?;
        url.query_pairs_mut()
            .append_pair("uploadType", "multipart")
            .append_pair("fields", "id,name");

        let mut metadata = json!({
            "name": upload.name,
            "mimeType": upload.mime_type,
        });
        if let Some(folder_id) = &self.config.folder_id {
            metadata["parents"] = json!([folder_id]);
        }

        let form = multipart::Form::new()
            .part(
                "metadata",
                multipart::Part::text(metadata.to_string()).mime_str("application/json")?,
            )
            .part(
                "file",
                multipart::Part::bytes(upload.bytes.clone())
                    .file_name(upload.name.clone())
                    .mime_str(&upload.mime_type)?,
            );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadedFile = Self::check(response).await?.json().await?;
        debug!("Uploaded {} as {}", uploaded.name, uploaded.id);

        Ok(RemoteFile::new(uploaded.id, uploaded.name))
    }

    async fn ensure_table(&self, table: &str, header: &[&str]) -> Result<()> {
        if self.sheet_id(table).await?.is_none() {
            self.batch_update(json!([{ "addSheet": { "properties": { "title": table } } }]))
                .await?;
            debug!("Created table {}", table);
        }

        let range = header_range(header.len());
        let header = header.iter().map(|title| json!(title)).collect();
        self.update(table, &range, vec![header]).await
    }
}
