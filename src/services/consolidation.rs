//! Folds source documents into one template workbook, one row per file ID.

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::ConsolidationError;
use crate::excel::{CalamineParser, SheetParser, TemplateWorkbook};
use crate::models::SheetLayout;
use crate::services::field_extractor::{file_sort_key, normalize_file_id, FieldExtractor};
use crate::services::row_index::{RowAssignError, RowIndex};
use crate::types::{
    ConsolidatedRow, ConsolidationOutput, ExtractedData, MergedRecord, SkippedDetail, SourceFile,
};

/// Rows of the identifier column scanned when seeding the row index.
pub const TEMPLATE_ID_SCAN_ROWS: u32 = 10_000;

/// Column holding record identifiers in the template (A).
const TEMPLATE_ID_COLUMN: u32 = 0;

pub const REASON_NO_SHEETS: &str = "no readable worksheet data found in file";
pub const REASON_NO_FILE_ID: &str = "cannot extract file ID from filename prefix";

/// Everything one consolidation call needs.
#[derive(Debug, Clone, Copy)]
pub struct ConsolidationRequest<'a> {
    pub template: &'a [u8],
    pub inputs: &'a [SourceFile],
    pub output_name: &'a str,
    pub default_division: &'a str,
    pub default_ia: &'a str,
}

pub struct Consolidator<'a, P = CalamineParser> {
    parser: P,
    layout: &'a SheetLayout,
}

impl<'a> Consolidator<'a, CalamineParser> {
    pub fn new(layout: &'a SheetLayout) -> Self {
        Self::with_parser(CalamineParser, layout)
    }
}

impl<'a, P: SheetParser> Consolidator<'a, P> {
    pub fn with_parser(parser: P, layout: &'a SheetLayout) -> Self {
        Self { parser, layout }
    }

    /// Files are processed one at a time in ascending file-ID order: row
    /// assignment reads and moves the shared frontier.
    pub fn consolidate(&self, request: ConsolidationRequest<'_>) -> Result<ConsolidationOutput, ConsolidationError> {
        let template = TemplateWorkbook::from_bytes(request.template)
            .map_err(|e| ConsolidationError::TemplateUnreadable(e.to_string()))?;
        let mut index = seed_row_index(&template);
        info!(
            inputs = request.inputs.len(),
            template_sheet = %template.target_sheet().name,
            known_ids = index.len(),
            last_template_row = index.last_template_row(),
            "consolidation started"
        );

        let mut ordered: Vec<&SourceFile> = request.inputs.iter().collect();
        ordered.sort_by_key(|file| file_sort_key(&file.file_name));

        let extractor = FieldExtractor::new(self.layout);
        let mut rows: BTreeMap<u32, ConsolidatedRow> = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut merged = Vec::new();

        for file in ordered {
            match self.merge_file(file, &extractor, &mut index, &request) {
                Ok((row, record)) => {
                    info!(file = %file.file_name, file_id = %record.file_id, row = row.row, "merged");
                    rows.insert(row.row, row);
                    merged.push(record);
                }
                Err(detail) => {
                    warn!(file = %detail.file_name, reason = %detail.reason, "skipped");
                    skipped.push(detail);
                }
            }
        }

        if merged.is_empty() {
            return Err(ConsolidationError::NothingConsolidated {
                inputs: request.inputs.len(),
                skipped: skipped.len(),
            });
        }

        let rows: Vec<ConsolidatedRow> = rows.into_values().collect();
        let output_buffer = template.render(&rows).map_err(ConsolidationError::Render)?;
        let output_name = sanitize_output_name(request.output_name);
        info!(
            output = %output_name,
            consolidated = merged.len(),
            skipped = skipped.len(),
            bytes = output_buffer.len(),
            "consolidation finished"
        );
        Ok(ConsolidationOutput {
            output_buffer,
            output_name,
            consolidated_count: merged.len(),
            skipped_details: skipped,
            merged,
        })
    }

    fn merge_file(
        &self,
        file: &SourceFile,
        extractor: &FieldExtractor<'_>,
        index: &mut RowIndex,
        request: &ConsolidationRequest<'_>,
    ) -> Result<(ConsolidatedRow, MergedRecord), SkippedDetail> {
        let skip = |file_id: Option<&str>, reason: String| SkippedDetail {
            file_name: file.file_name.clone(),
            file_id: file_id.map(str::to_string),
            reason,
        };

        let sheets = match self.parser.parse(&file.bytes) {
            Ok(sheets) if !sheets.is_empty() => sheets,
            Ok(_) => return Err(skip(None, REASON_NO_SHEETS.to_string())),
            Err(e) => {
                warn!(file = %file.file_name, error = %e, "could not parse source");
                return Err(skip(None, REASON_NO_SHEETS.to_string()));
            }
        };

        let data = extractor.extract(&file.file_name, &sheets);
        let Some(file_id) = data.file_id.clone() else {
            return Err(skip(None, REASON_NO_FILE_ID.to_string()));
        };

        let assigned = index
            .assign(&file_id)
            .and_then(|a| file_id.parse::<u64>().map(|n| (a, n)).map_err(|_| RowAssignError(file_id.clone())));
        let (assignment, numeric_id) = match assigned {
            Ok(pair) => pair,
            Err(e) => return Err(skip(Some(&file_id), e.to_string())),
        };

        let row = build_row(assignment.row(), numeric_id, &data, request);
        let record = MergedRecord {
            file_name: file.file_name.clone(),
            file_id,
            row: assignment.row(),
            account_status: data.account_status,
            soa_status: data.soa_status,
        };
        Ok((row, record))
    }
}

/// Index the template's identifier column (first `TEMPLATE_ID_SCAN_ROWS` rows).
fn seed_row_index(template: &TemplateWorkbook) -> RowIndex {
    let entries = (0..TEMPLATE_ID_SCAN_ROWS).filter_map(|row| {
        let value = template.target_value(row, TEMPLATE_ID_COLUMN);
        if value.is_blank() {
            return None;
        }
        normalize_file_id(&value.as_text()).map(|id| (id, row + 1))
    });
    RowIndex::seed(entries)
}

fn build_row(row: u32, file_id: u64, data: &ExtractedData, request: &ConsolidationRequest<'_>) -> ConsolidatedRow {
    let mut out = ConsolidatedRow {
        row,
        file_id,
        ia: request.default_ia.trim().to_string(),
        division: division_code(request.default_division),
        ..ConsolidatedRow::default()
    };
    if let Some(account) = &data.account_details {
        out.lot_no = account.lot_no.clone();
        out.owner_last = account.lot_owner.last_name.clone();
        out.owner_first = account.lot_owner.first_name.clone();
        out.farmer_last = account.farmer.last_name.clone();
        out.farmer_first = account.farmer.first_name.clone();
        if !account.name_of_ia.is_empty() {
            out.ia = account.name_of_ia.clone();
        }
        if !account.division.is_empty() {
            out.division = division_code(&account.division);
        }
    }
    if let Some(soa) = &data.soa_details {
        out.area = soa.area.clone();
        out.principal = soa.principal.clone();
        out.penalty = soa.penalty.clone();
        out.old_account = soa.old_account.clone();
        out.total = soa.total.clone();
    }
    out
}

/// The first digit run of a division label ("Division 04" -> "4"); labels
/// without digits are kept as trimmed text.
pub fn division_code(raw: &str) -> String {
    let raw = raw.trim();
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return raw.to_string();
    }
    match digits.parse::<u64>() {
        Ok(n) => n.to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Strip characters illegal in file names and force a `.xlsx` extension.
pub fn sanitize_output_name(name: &str) -> String {
    const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL.contains(c) && !c.is_control())
        .collect();
    let mut stem = cleaned.trim().trim_end_matches('.').to_string();
    let lower = stem.to_lowercase();
    for ext in [".xlsx", ".xlsm", ".xls", ".csv"] {
        if lower.ends_with(ext) {
            stem.truncate(stem.len() - ext.len());
            break;
        }
    }
    let stem = stem.trim();
    let stem = if stem.is_empty() { "consolidated" } else { stem };
    format!("{stem}.xlsx")
}

/// Render at most `max` skipped files, one per line, for size-limited surfaces.
pub fn summarize_skipped(details: &[SkippedDetail], max: usize) -> String {
    let mut lines: Vec<String> = details
        .iter()
        .take(max)
        .map(|d| match &d.file_id {
            Some(id) => format!("{} (ID {}): {}", d.file_name, id, d.reason),
            None => format!("{}: {}", d.file_name, d.reason),
        })
        .collect();
    if details.len() > max {
        lines.push(format!("... and {} more", details.len() - max));
    }
    lines.join("\n")
}
