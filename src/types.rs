use serde::{Deserialize, Serialize};

/// First/middle/last name as printed on the account details sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
}

impl PersonName {
    pub fn is_blank(&self) -> bool {
        self.first_name.is_empty() && self.middle_name.is_empty() && self.last_name.is_empty()
    }
}

pub type LotOwner = PersonName;
pub type Farmer = PersonName;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetail {
    pub division: String,
    pub farmer: Farmer,
    pub lot_no: String,
    pub lot_owner: LotOwner,
    #[serde(rename = "nameOfIA")]
    pub name_of_ia: String,
}

/// Financial fields, each a formatted amount ("1,234.56") or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoaDetail {
    pub area: String,
    pub principal: String,
    pub penalty: String,
    pub old_account: String,
    pub total: String,
}

impl SoaDetail {
    pub fn is_blank(&self) -> bool {
        self.area.is_empty()
            && self.principal.is_empty()
            && self.penalty.is_empty()
            && self.old_account.is_empty()
            && self.total.is_empty()
    }

    pub fn has_principal_and_penalty(&self) -> bool {
        !self.principal.is_empty() && !self.penalty.is_empty()
    }
}

/// Why a section did or did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionStatus {
    Found,
    AnchorNotFound,
    /// Anchor present but every distinguishing field was blank.
    Blank,
}

/// Per-file extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub account_details: Option<AccountDetail>,
    pub file_id: Option<String>,
    pub soa_details: Option<SoaDetail>,
    pub account_status: SectionStatus,
    pub soa_status: SectionStatus,
}

/// A source document handed to the engine.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// An input that could not be merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDetail {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub reason: String,
}

/// An input that was merged, with the row it landed on (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRecord {
    pub file_name: String,
    pub file_id: String,
    pub row: u32,
    pub account_status: SectionStatus,
    pub soa_status: SectionStatus,
}

/// Values written to one destination row. `row` is 1-based.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidatedRow {
    pub row: u32,
    pub file_id: u64,
    pub lot_no: String,
    pub owner_last: String,
    pub owner_first: String,
    pub farmer_last: String,
    pub farmer_first: String,
    pub area: String,
    pub principal: String,
    pub penalty: String,
    pub old_account: String,
    pub total: String,
    pub ia: String,
    pub division: String,
}

/// Successful consolidation: the merged workbook plus the full skip report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationOutput {
    #[serde(skip)]
    pub output_buffer: Vec<u8>,
    pub output_name: String,
    pub consolidated_count: usize,
    pub skipped_details: Vec<SkippedDetail>,
    pub merged: Vec<MergedRecord>,
}
