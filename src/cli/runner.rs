//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, Endpoint, OutputFormat};
use crate::config::{load_config, AccessConfig};
use crate::error::{Error, Result};
use crate::http::{
    extract_path, HttpClient, HttpClientConfig, JsonBatchSource, JsonCursorSource,
    JsonItemSource, JsonPageSource,
};
use crate::pagination::CursorSource;
use crate::resource::Resource;
use crate::stream::Traversal;
use crate::types::{id_fn, CursorId, IdFn};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Pages {
                endpoint,
                page_size,
                max_pages,
                records_path,
                total_pages_path,
                page_param,
                size_param,
            } => {
                let mut config = self.access_config()?;
                if let Some(size) = page_size {
                    config = config.with_page_size(*size);
                }
                if let Some(max) = max_pages {
                    config = config.with_max_pages(*max);
                }

                let mut source = JsonPageSource::<Value>::new(build_client(endpoint)?, &endpoint.path)
                    .with_page_param(page_param)
                    .with_size_param(size_param)
                    .with_page_size(config.page_size)
                    .with_records_path(records_path);
                if let Some(path) = total_pages_path {
                    source = source.with_total_pages_path(path);
                }

                let resource = Resource::builder(field_key("id"))
                    .paged(source)
                    .config(&config)
                    .build()?;
                self.emit_records(resource.iterated().stream()).await
            }
            Commands::Cursor {
                endpoint,
                id_field,
                page_size,
                max_pages,
                records_path,
                cursor_param,
                limit_param,
            } => {
                let mut config = self.access_config()?;
                if let Some(size) = page_size {
                    config = config.with_page_size(*size);
                }
                if let Some(max) = max_pages {
                    config = config.with_max_pages(*max);
                }

                let source = JsonCursorSource::<Value>::new(build_client(endpoint)?, &endpoint.path)
                    .with_cursor_param(cursor_param)
                    .with_limit_param(limit_param)
                    .with_page_size(config.page_size)
                    .with_records_path(records_path);

                let source = CheckedCursorSource {
                    inner: source,
                    field: id_field.clone(),
                };

                let resource = Resource::builder(field_key(id_field))
                    .cursor(source, cursor_key(id_field))
                    .config(&config)
                    .build()?;
                self.emit_records(resource.iterated().stream()).await
            }
            Commands::Batch {
                endpoint,
                ids,
                id_field,
                batch_size,
                concurrency,
                records_path,
                ids_param,
            } => {
                let mut config = self.access_config()?;
                if let Some(size) = batch_size {
                    config = config.with_batch_size(*size);
                }
                if let Some(concurrency) = concurrency {
                    config = config.with_batch_concurrency(*concurrency);
                }

                let source = JsonBatchSource::<Value>::new(build_client(endpoint)?, &endpoint.path)
                    .with_ids_param(ids_param)
                    .with_records_path(records_path);

                let resource = Resource::builder(field_key(id_field))
                    .batch(source)
                    .config(&config)
                    .build()?;

                let started = Instant::now();
                let found = resource.mapped(ids.clone()).get().await?;
                info!(
                    requested = ids.len(),
                    found = found.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Fetched records by id"
                );

                let object: Map<String, Value> = found.into_iter().collect();
                self.output(&Value::Object(object));
                Ok(())
            }
            Commands::Get {
                endpoint,
                id,
                id_field,
                record_path,
            } => {
                let config = self.access_config()?;
                let source = JsonItemSource::<Value>::new(build_client(endpoint)?, &endpoint.path)
                    .with_record_path(record_path);

                let resource = Resource::builder(field_key(id_field))
                    .item(source)
                    .config(&config)
                    .build()?;

                match resource.single(id.clone()).get().await? {
                    Some(record) => {
                        self.output(&record);
                        Ok(())
                    }
                    None => Err(Error::Other(format!("No record with id '{id}'"))),
                }
            }
        }
    }

    /// Load the access config file, or fall back to defaults
    fn access_config(&self) -> Result<AccessConfig> {
        match &self.cli.config {
            Some(path) => load_config(path),
            None => Ok(AccessConfig::default()),
        }
    }

    /// Print every record of a traversal as it arrives
    async fn emit_records<K>(&self, mut records: Traversal<(K, Value)>) -> Result<()> {
        let started = Instant::now();
        let mut count = 0usize;
        while let Some((_, record)) = records.try_next().await? {
            self.output(&record);
            count += 1;
        }
        info!(
            records = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Traversal complete"
        );
        Ok(())
    }

    fn output(&self, value: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(value).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
        }
    }
}

/// Build the HTTP client for an endpoint
fn build_client(endpoint: &Endpoint) -> Result<HttpClient> {
    let mut builder = HttpClientConfig::builder().base_url(&endpoint.url);
    if let Some(ms) = endpoint.timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    for raw in &endpoint.headers {
        let (name, value) = parse_header(raw)?;
        builder = builder.header(name, value);
    }
    HttpClient::with_config(builder.build())
}

/// Split a `Name: value` header argument
fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw.split_once(':').ok_or_else(|| {
        Error::config(format!("Invalid header '{raw}', expected 'Name: value'"))
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::config(format!("Invalid header '{raw}', name is empty")));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Key records by the value at `field`, rendered as a string
fn field_key(field: &str) -> IdFn<Value, String> {
    let field = field.to_string();
    id_fn(move |record: &Value| match extract_path(record, &field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    })
}

/// Read the numeric cursor id at `field`; ids given as strings are parsed
fn cursor_id(record: &Value, field: &str) -> Option<CursorId> {
    extract_path(record, field).and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
}

/// Cursor id extractor for records that passed [`CheckedCursorSource`]
fn cursor_key(field: &str) -> IdFn<Value, CursorId> {
    let field = field.to_string();
    id_fn(move |record: &Value| cursor_id(record, &field).unwrap_or_default())
}

/// Cursor endpoint that rejects any response holding a record without a
/// numeric id at `field`
struct CheckedCursorSource {
    inner: JsonCursorSource<Value>,
    field: String,
}

#[async_trait]
impl CursorSource<Value> for CheckedCursorSource {
    async fn fetch_older(&self, from_id: Option<CursorId>) -> Result<Vec<Value>> {
        let records = self.inner.fetch_older(from_id).await?;
        if let Some(position) = records
            .iter()
            .position(|record| cursor_id(record, &self.field).is_none())
        {
            warn!(field = %self.field, position, "Record has no numeric cursor id");
            return Err(Error::record_extraction(
                self.field.as_str(),
                format!("record {position} has no numeric id"),
            ));
        }
        Ok(records)
    }
}
