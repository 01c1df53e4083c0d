pub mod commands;
pub mod config;
pub mod error;
pub mod excel;
pub mod models;
pub mod services;
pub mod types;
mod xlsx_patch;

pub use error::{ConfigError, ConsolidationError, WorkbookError};
pub use excel::{CalamineParser, CellValue, ParsedSheet, SheetParser};
pub use models::SheetLayout;
pub use services::consolidation::{ConsolidationRequest, Consolidator};
pub use services::field_extractor::{extract_file_id, FieldExtractor};
pub use types::{ConsolidationOutput, ExtractedData, SkippedDetail, SourceFile};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
