//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Walk paginated, cursor and bulk REST endpoints
#[derive(Parser, Debug)]
#[command(name = "resource-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Access configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct Endpoint {
    /// Base URL of the API
    #[arg(long)]
    pub url: String,

    /// Endpoint path relative to the base URL
    #[arg(long)]
    pub path: String,

    /// Extra request header as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream every record of a page-numbered endpoint
    Pages {
        #[command(flatten)]
        endpoint: Endpoint,

        /// Items per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Location of the record array in the response
        #[arg(long, default_value = "$")]
        records_path: String,

        /// Location of the total page count in the response
        #[arg(long)]
        total_pages_path: Option<String>,

        /// Page number query parameter
        #[arg(long, default_value = "page")]
        page_param: String,

        /// Page size query parameter
        #[arg(long, default_value = "per_page")]
        size_param: String,
    },

    /// Stream a newest-first endpoint by walking a max-id cursor
    Cursor {
        #[command(flatten)]
        endpoint: Endpoint,

        /// Field holding the numeric record id
        #[arg(long, default_value = "id")]
        id_field: String,

        /// Items per request
        #[arg(long)]
        page_size: Option<usize>,

        /// Stop after this many requests
        #[arg(long)]
        max_pages: Option<u32>,

        /// Location of the record array in the response
        #[arg(long, default_value = "$")]
        records_path: String,

        /// Cursor query parameter
        #[arg(long, default_value = "max_id")]
        cursor_param: String,

        /// Limit query parameter
        #[arg(long, default_value = "limit")]
        limit_param: String,
    },

    /// Fetch a set of records by id through a bulk endpoint
    Batch {
        #[command(flatten)]
        endpoint: Endpoint,

        /// Ids to fetch (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,

        /// Field holding the record id
        #[arg(long, default_value = "id")]
        id_field: String,

        /// Maximum ids per request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Bulk requests in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Location of the record array in the response
        #[arg(long, default_value = "$")]
        records_path: String,

        /// Id list query parameter
        #[arg(long, default_value = "ids")]
        ids_param: String,
    },

    /// Fetch one record from `{path}/{id}`
    Get {
        #[command(flatten)]
        endpoint: Endpoint,

        /// Id of the record
        #[arg(long)]
        id: String,

        /// Field holding the record id
        #[arg(long, default_value = "id")]
        id_field: String,

        /// Location of the record in the response
        #[arg(long, default_value = "$")]
        record_path: String,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one record per line)
    Json,
    /// Human-readable output
    Pretty,
}
