use thiserror::Error;

/// Errors raised while opening or rendering a workbook.
#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Could not open Excel file: {0}")]
    Open(String),

    #[error("No readable worksheet found")]
    NoReadableSheet,

    #[error("Could not write Excel file: {0}")]
    Render(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid xlsx package: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("Invalid workbook XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Could not read workbook part: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook part not found: {0}")]
    MissingPart(String),
}

/// Fatal outcomes of a consolidation call. Per-file problems are reported as
/// skipped details instead and never surface here.
#[derive(Error, Debug)]
pub enum ConsolidationError {
    #[error("Template is unreadable: {0}")]
    TemplateUnreadable(String),

    #[error("No records were consolidated ({skipped} of {inputs} files skipped)")]
    NothingConsolidated { inputs: usize, skipped: usize },

    #[error("Could not render consolidated workbook: {0}")]
    Render(#[source] WorkbookError),
}

impl ConsolidationError {
    /// True when the caller supplied inputs that cannot produce any output.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ConsolidationError::NothingConsolidated { .. })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("Invalid column letter: {0}")]
    InvalidColumn(String),

    #[error("Could not read layout file {path}: {source}")]
    LayoutRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid layout file {path}: {source}")]
    LayoutParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
