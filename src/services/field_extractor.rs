//! Identity and financial field extraction from one source document.
//!
//! Sections are located by anchor text and read at fixed offsets. Missing
//! anchors or blank fields never fail; they only leave a section out and record
//! why in [`SectionStatus`].

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::excel::{format_amount, ParsedSheet};
use crate::models::{AccountLayout, Column, NameOffsets, SheetLayout, SoaLayout};
use crate::services::sheet_cursor::SheetCursor;
use crate::types::{AccountDetail, ExtractedData, PersonName, SectionStatus, SoaDetail};

fn file_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+) ").expect("file id regex"))
}

fn leading_digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+").expect("leading digits regex"))
}

/// Canonical form of a digit run: "007" -> "7". Runs too long for u64 keep
/// their digits minus leading zeros.
fn canonical_digits(digits: &str) -> String {
    match digits.parse::<u64>() {
        Ok(n) => n.to_string(),
        Err(_) => {
            let trimmed = digits.trim_start_matches('0');
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Record identifier from a filename: the digit run that starts the name,
/// followed by a space. `"0012 DELA CRUZ.xlsx"` -> `Some("12")`;
/// `"DELA CRUZ.xlsx"`, `" 12 X.xlsx"` and `"12\tX.xlsx"` -> `None`.
pub fn extract_file_id(file_name: &str) -> Option<String> {
    file_id_regex()
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| canonical_digits(m.as_str()))
}

/// Normalize an identifier cell's text the same way filenames are.
pub fn normalize_file_id(text: &str) -> Option<String> {
    leading_digits_regex()
        .find(text.trim())
        .map(|m| canonical_digits(m.as_str()))
}

/// Numeric sort key from a filename's leading digits; files without one sort last.
pub fn file_sort_key(file_name: &str) -> u64 {
    leading_digits_regex()
        .find(file_name)
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .unwrap_or(u64::MAX)
}

/// One way of resolving an amount; strategies are tried in order until one yields a value.
type AmountSource = fn(&SoaContext<'_>) -> Option<f64>;

const AREA_SOURCES: &[(&str, AmountSource)] = &[("direct", area_direct), ("account-window", area_window_sum)];

const PRINCIPAL_SOURCES: &[(&str, AmountSource)] = &[
    ("subtotal", principal_subtotal),
    ("subtotal-address", principal_subtotal_by_address),
    ("ifr-rows", principal_ifr_rows),
    ("computed", principal_computed),
];

const PENALTY_SOURCES: &[(&str, AmountSource)] = &[
    ("subtotal", penalty_subtotal),
    ("subtotal-address", penalty_subtotal_by_address),
    ("ifr-rows", penalty_ifr_rows),
    ("computed", penalty_computed),
];

const OLD_ACCOUNT_SOURCES: &[(&str, AmountSource)] = &[("direct", old_account_direct), ("address", old_account_by_address)];

const TOTAL_SOURCES: &[(&str, AmountSource)] = &[("direct", total_direct), ("address", total_by_address)];

/// Inputs shared by every amount strategy for one candidate SOA sheet.
struct SoaContext<'a> {
    soa: SheetCursor<'a>,
    account: Option<SheetCursor<'a>>,
    layout: &'a SoaLayout,
    account_layout: &'a AccountLayout,
}

fn area_direct(ctx: &SoaContext<'_>) -> Option<f64> {
    ctx.soa.at(ctx.layout.area_cell).as_amount()
}

/// Sum of positive entries in the account sheet's area column window.
fn area_window_sum(ctx: &SoaContext<'_>) -> Option<f64> {
    let account = ctx.account?;
    let layout = ctx.account_layout;
    let sum: f64 = (0..layout.area_window)
        .filter_map(|i| {
            account
                .at(layout.area_column.at_row(layout.area_start_row + i))
                .as_amount()
        })
        .filter(|v| *v > 0.0)
        .sum();
    (sum > 0.0).then_some(sum)
}

fn principal_subtotal(ctx: &SoaContext<'_>) -> Option<f64> {
    ctx.soa.at(ctx.layout.principal_cell).as_amount()
}

fn principal_subtotal_by_address(ctx: &SoaContext<'_>) -> Option<f64> {
    ctx.soa.by_address(ctx.layout.principal_cell).as_amount()
}

fn principal_ifr_rows(ctx: &SoaContext<'_>) -> Option<f64> {
    ifr_block_sum(ctx, ctx.layout.ifr_principal_column)
}

fn principal_computed(ctx: &SoaContext<'_>) -> Option<f64> {
    computed_totals(ctx).principal
}

fn penalty_subtotal(ctx: &SoaContext<'_>) -> Option<f64> {
    ctx.soa.at(ctx.layout.penalty_cell).as_amount()
}

fn penalty_subtotal_by_address(ctx: &SoaContext<'_>) -> Option<f64> {
    ctx.soa.by_address(ctx.layout.penalty_cell).as_amount()
}

fn penalty_ifr_rows(ctx: &SoaContext<'_>) -> Option<f64> {
    ifr_block_sum(ctx, ctx.layout.ifr_penalty_column)
}

fn penalty_computed(ctx: &SoaContext<'_>) -> Option<f64> {
    computed_totals(ctx).penalty
}

fn old_account_direct(ctx: &SoaContext<'_>) -> Option<f64> {
    ctx.soa.at(ctx.layout.old_account_cell).as_amount()
}

fn old_account_by_address(ctx: &SoaContext<'_>) -> Option<f64> {
    ctx.soa.by_address(ctx.layout.old_account_cell).as_amount()
}

fn total_direct(ctx: &SoaContext<'_>) -> Option<f64> {
    ctx.soa.at(ctx.layout.total_cell).as_amount()
}

fn total_by_address(ctx: &SoaContext<'_>) -> Option<f64> {
    ctx.soa.by_address(ctx.layout.total_cell).as_amount()
}

fn ifr_block_sum(ctx: &SoaContext<'_>, column: Column) -> Option<f64> {
    let values: Vec<f64> = (0..ctx.layout.ifr_rows)
        .filter_map(|i| ctx.soa.at(column.at_row(ctx.layout.ifr_start_row + i)).as_amount())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct ComputedTotals {
    principal: Option<f64>,
    penalty: Option<f64>,
}

/// Pair account-sheet areas with SOA rates row by row:
/// principal += area * rate, penalty += row principal * percent / 100.
fn computed_totals(ctx: &SoaContext<'_>) -> ComputedTotals {
    let Some(account) = ctx.account else {
        return ComputedTotals::default();
    };
    let layout = ctx.layout;
    let area_column = ctx.account_layout.area_column;
    let area_start = ctx.account_layout.area_start_row;
    let mut totals = ComputedTotals::default();
    for i in 0..layout.computed_rows {
        let Some(area) = account
            .at(area_column.at_row(area_start + i))
            .as_amount()
            .filter(|a| *a > 0.0)
        else {
            continue;
        };
        let soa_row = layout.computed_start_row + i;
        let Some(rate) = ctx.soa.at(layout.rate_column.at_row(soa_row)).as_amount() else {
            continue;
        };
        let row_principal = area * rate;
        *totals.principal.get_or_insert(0.0) += row_principal;
        if let Some(percent) = ctx
            .soa
            .at(layout.penalty_percent_column.at_row(soa_row))
            .as_amount()
            .filter(|p| *p > 0.0)
        {
            *totals.penalty.get_or_insert(0.0) += row_principal * (percent / 100.0);
        }
    }
    totals
}

fn first_amount(ctx: &SoaContext<'_>, field: &str, sources: &[(&str, AmountSource)]) -> String {
    for (source, resolve) in sources {
        if let Some(value) = resolve(ctx) {
            debug!(sheet = ctx.soa.name(), field, source, value, "amount resolved");
            return format_amount(value);
        }
    }
    String::new()
}

/// Extracts [`ExtractedData`] from one document's sheets using a [`SheetLayout`].
#[derive(Debug, Clone, Copy)]
pub struct FieldExtractor<'a> {
    layout: &'a SheetLayout,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(layout: &'a SheetLayout) -> Self {
        Self { layout }
    }

    pub fn extract(&self, file_name: &str, sheets: &[ParsedSheet]) -> ExtractedData {
        let (account_sheet, anchor) = self.account_sheet(sheets);
        let (account_details, account_status) = match (account_sheet, anchor) {
            (Some(sheet), Some(anchor)) => self.extract_account(SheetCursor::new(sheet), anchor),
            _ => (None, SectionStatus::AnchorNotFound),
        };
        let (soa_details, soa_status) = self.extract_soa(sheets, account_sheet);
        let file_id = extract_file_id(file_name);
        debug!(
            file = file_name,
            file_id = file_id.as_deref().unwrap_or(""),
            ?account_status,
            ?soa_status,
            "extracted"
        );
        ExtractedData {
            account_details,
            file_id,
            soa_details,
            account_status,
            soa_status,
        }
    }

    /// The sheet holding the account-details anchor, else the first sheet that is
    /// not named like a statement of account (still used for area lookups).
    fn account_sheet<'s>(&self, sheets: &'s [ParsedSheet]) -> (Option<&'s ParsedSheet>, Option<usize>) {
        for sheet in sheets {
            if let Some(anchor) = SheetCursor::new(sheet).find_anchor(&self.layout.account.anchor) {
                return (Some(sheet), Some(anchor));
            }
        }
        let companion = sheets
            .iter()
            .find(|s| !self.layout.soa.is_soa_sheet_name(&s.name))
            .or_else(|| sheets.first());
        (companion, None)
    }

    fn extract_account(&self, cursor: SheetCursor<'_>, anchor: usize) -> (Option<AccountDetail>, SectionStatus) {
        let layout = &self.layout.account;
        let col = layout.value_column;
        let lot_no = cursor.relative(anchor, layout.lot_offset, col).as_text();
        if lot_no.is_empty() {
            return (None, SectionStatus::Blank);
        }
        let read_name = |offsets: &NameOffsets| PersonName {
            first_name: cursor.relative(anchor, offsets.first, col).as_text(),
            middle_name: cursor.relative(anchor, offsets.middle, col).as_text(),
            last_name: cursor.relative(anchor, offsets.last, col).as_text(),
        };
        let lot_owner = read_name(&layout.owner);
        let farmer = read_name(&layout.farmer);
        if lot_owner.is_blank() && farmer.is_blank() {
            return (None, SectionStatus::Blank);
        }
        let detail = AccountDetail {
            division: cursor.at(layout.division_cell).as_text(),
            farmer,
            lot_no,
            lot_owner,
            name_of_ia: cursor.at(layout.ia_cell).as_text(),
        };
        (Some(detail), SectionStatus::Found)
    }

    /// Evaluate every SOA-named sheet and keep the first with both principal and
    /// penalty, else the first with anything. Unnamed sheets are never read as SOA.
    fn extract_soa(
        &self,
        sheets: &[ParsedSheet],
        account_sheet: Option<&ParsedSheet>,
    ) -> (Option<SoaDetail>, SectionStatus) {
        let layout = &self.layout.soa;
        let candidates = sheets.iter().filter(|s| layout.is_soa_sheet_name(&s.name));

        let mut anchor_seen = false;
        let mut first_partial: Option<SoaDetail> = None;
        for sheet in candidates {
            let cursor = SheetCursor::new(sheet);
            if cursor.find_anchor(&layout.anchor).is_none() {
                continue;
            }
            anchor_seen = true;
            let ctx = SoaContext {
                soa: cursor,
                account: account_sheet.map(SheetCursor::new),
                layout,
                account_layout: &self.layout.account,
            };
            let detail = resolve_soa(&ctx);
            if detail.has_principal_and_penalty() {
                return (Some(detail), SectionStatus::Found);
            }
            if first_partial.is_none() && !detail.is_blank() {
                first_partial = Some(detail);
            }
        }
        match (first_partial, anchor_seen) {
            (Some(detail), _) => (Some(detail), SectionStatus::Found),
            (None, true) => (None, SectionStatus::Blank),
            (None, false) => (None, SectionStatus::AnchorNotFound),
        }
    }
}

fn resolve_soa(ctx: &SoaContext<'_>) -> SoaDetail {
    SoaDetail {
        area: first_amount(ctx, "area", AREA_SOURCES),
        principal: first_amount(ctx, "principal", PRINCIPAL_SOURCES),
        penalty: first_amount(ctx, "penalty", PENALTY_SOURCES),
        old_account: first_amount(ctx, "oldAccount", OLD_ACCOUNT_SOURCES),
        total: first_amount(ctx, "total", TOTAL_SOURCES),
    }
}
