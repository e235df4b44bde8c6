//! JSON endpoint sources
//!
//! Implementations of the page, cursor, batch and item request contracts
//! for plain JSON REST endpoints. Records are located with a dotted path
//! such as `$.data` and decoded with serde.

use super::client::{HttpClient, RequestConfig};
use crate::batch::BatchSource;
use crate::error::{Error, Result};
use crate::pagination::{CursorSource, Page, PageSource};
use crate::resource::ItemSource;
use crate::types::{CursorId, JsonValue, Key};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::marker::PhantomData;
use tracing::debug;

// ============================================================================
// Record Extraction
// ============================================================================

/// Look up a value by a simple dotted path like `$.data.items` or `data.0`
///
/// `$` or an empty path selects the whole document.
pub fn extract_path<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            JsonValue::Object(map) => map.get(part)?,
            JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Decode the record array found at `records_path` (or the whole body)
pub fn decode_records<T: DeserializeOwned>(
    body: &JsonValue,
    records_path: Option<&str>,
) -> Result<Vec<T>> {
    let path = records_path.unwrap_or("$");
    let records = match extract_path(body, path) {
        Some(JsonValue::Array(records)) => records,
        Some(JsonValue::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            return Err(Error::record_extraction(
                path,
                format!("expected an array, found {}", type_name(other)),
            ))
        }
    };

    records
        .iter()
        .map(|record| serde_json::from_value(record.clone()).map_err(Error::from))
        .collect()
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

// ============================================================================
// Page Source
// ============================================================================

/// `GET {path}?page=N&per_page=S`
pub struct JsonPageSource<T> {
    client: HttpClient,
    path: String,
    page_param: String,
    size_param: String,
    page_size: usize,
    records_path: Option<String>,
    total_pages_path: Option<String>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonPageSource<T> {
    pub fn new(client: HttpClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            page_param: "page".to_string(),
            size_param: "per_page".to_string(),
            page_size: 100,
            records_path: None,
            total_pages_path: None,
            _record: PhantomData,
        }
    }

    /// Name of the page number query parameter
    #[must_use]
    pub fn with_page_param(mut self, name: impl Into<String>) -> Self {
        self.page_param = name.into();
        self
    }

    /// Name of the page size query parameter
    #[must_use]
    pub fn with_size_param(mut self, name: impl Into<String>) -> Self {
        self.size_param = name.into();
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Where the record array sits in the response body
    #[must_use]
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = Some(path.into());
        self
    }

    /// Where the total page count sits in the response body
    #[must_use]
    pub fn with_total_pages_path(mut self, path: impl Into<String>) -> Self {
        self.total_pages_path = Some(path.into());
        self
    }
}

#[async_trait]
impl<T> PageSource<T> for JsonPageSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, page: u32) -> Result<Page<T>> {
        let request = RequestConfig::new()
            .query(&self.page_param, page.to_string())
            .query(&self.size_param, self.page_size.to_string());
        let body: JsonValue = self.client.get_json(&self.path, request).await?;

        let items = decode_records(&body, self.records_path.as_deref())?;
        let total_pages = self
            .total_pages_path
            .as_deref()
            .and_then(|path| extract_path(&body, path))
            .and_then(JsonValue::as_u64)
            .and_then(|total| u32::try_from(total).ok());

        debug!(page, items = items.len(), ?total_pages, "Decoded page");
        Ok(Page { items, total_pages })
    }
}

// ============================================================================
// Cursor Source
// ============================================================================

/// `GET {path}?max_id=ID&limit=S`, newest first
///
/// The cursor parameter is left out of the first request.
pub struct JsonCursorSource<T> {
    client: HttpClient,
    path: String,
    cursor_param: String,
    limit_param: String,
    page_size: usize,
    records_path: Option<String>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonCursorSource<T> {
    pub fn new(client: HttpClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            cursor_param: "max_id".to_string(),
            limit_param: "limit".to_string(),
            page_size: 100,
            records_path: None,
            _record: PhantomData,
        }
    }

    #[must_use]
    pub fn with_cursor_param(mut self, name: impl Into<String>) -> Self {
        self.cursor_param = name.into();
        self
    }

    #[must_use]
    pub fn with_limit_param(mut self, name: impl Into<String>) -> Self {
        self.limit_param = name.into();
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = Some(path.into());
        self
    }
}

#[async_trait]
impl<T> CursorSource<T> for JsonCursorSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_older(&self, from_id: Option<CursorId>) -> Result<Vec<T>> {
        let mut request = RequestConfig::new().query(&self.limit_param, self.page_size.to_string());
        if let Some(id) = from_id {
            request = request.query(&self.cursor_param, id.to_string());
        }
        let body: JsonValue = self.client.get_json(&self.path, request).await?;
        decode_records(&body, self.records_path.as_deref())
    }
}

// ============================================================================
// Batch Source
// ============================================================================

/// `GET {path}?ids=a,b,c`
pub struct JsonBatchSource<T> {
    client: HttpClient,
    path: String,
    ids_param: String,
    records_path: Option<String>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonBatchSource<T> {
    pub fn new(client: HttpClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            ids_param: "ids".to_string(),
            records_path: None,
            _record: PhantomData,
        }
    }

    /// Name of the comma-separated id list parameter
    #[must_use]
    pub fn with_ids_param(mut self, name: impl Into<String>) -> Self {
        self.ids_param = name.into();
        self
    }

    #[must_use]
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = Some(path.into());
        self
    }
}

#[async_trait]
impl<T, K> BatchSource<T, K> for JsonBatchSource<T>
where
    T: DeserializeOwned + Send + 'static,
    K: Key + Display,
{
    async fn fetch_batch(&self, ids: Vec<K>) -> Result<Vec<T>> {
        let joined = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let request = RequestConfig::new().query(&self.ids_param, joined);
        let body: JsonValue = self.client.get_json(&self.path, request).await?;
        decode_records(&body, self.records_path.as_deref())
    }
}

// ============================================================================
// Item Source
// ============================================================================

/// `GET {path}/{id}`, where a 404 means the id is unknown
///
/// If `path` contains `{id}` the id is substituted there instead.
pub struct JsonItemSource<T> {
    client: HttpClient,
    path: String,
    record_path: Option<String>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonItemSource<T> {
    pub fn new(client: HttpClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            record_path: None,
            _record: PhantomData,
        }
    }

    /// Where the record sits in the response body
    #[must_use]
    pub fn with_record_path(mut self, path: impl Into<String>) -> Self {
        self.record_path = Some(path.into());
        self
    }

    fn item_path(&self, id: &impl Display) -> String {
        if self.path.contains("{id}") {
            self.path.replace("{id}", &id.to_string())
        } else {
            format!("{}/{id}", self.path.trim_end_matches('/'))
        }
    }
}

#[async_trait]
impl<T, K> ItemSource<T, K> for JsonItemSource<T>
where
    T: DeserializeOwned + Send + 'static,
    K: Key + Display,
{
    async fn fetch_item(&self, id: K) -> Result<Option<T>> {
        let path = self.item_path(&id);
        let Some(body) = self
            .client
            .get_json_optional::<JsonValue>(&path, RequestConfig::new())
            .await?
        else {
            debug!(?id, "Item not found");
            return Ok(None);
        };

        let record_path = self.record_path.as_deref().unwrap_or("$");
        match extract_path(&body, record_path) {
            Some(JsonValue::Null) | None => Ok(None),
            Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
        }
    }
}
