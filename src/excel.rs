use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;

use crate::error::{ConfigError, WorkbookError};
use crate::types::ConsolidatedRow;
use crate::xlsx_patch;

/// Excel's last addressable row (1-based).
pub const MAX_EXCEL_ROW: u32 = 1_048_576;

/// Column index to Excel letter (0→A, 1→B, 25→Z, 26→AA).
pub fn col_index_to_letter(index: u32) -> String {
    let mut n = index;
    let mut s = String::new();
    loop {
        let r = (n % 26) as u8;
        s.insert(0, (b'A' + r) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    s
}

/// Excel letter to column index (A→0, Z→25, AA→26).
pub fn letter_to_col_index(letters: &str) -> Result<u32, ConfigError> {
    let letters = letters.trim();
    if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::InvalidColumn(letters.to_string()));
    }
    let mut n: u32 = 0;
    for c in letters.chars() {
        n = n * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    Ok(n - 1)
}

/// A single cell value as seen by the extractor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    /// Empty cells and whitespace-only text count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Trimmed display text; numbers render without a trailing `.0`.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
        }
    }

    /// Numeric reading of the cell. Text is accepted when it looks like an amount
    /// (`"1,234.50"`, `"₱ 10"`, `"(25.00)"`).
    pub fn as_amount(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Number(_) | CellValue::Empty => None,
            CellValue::Text(s) => parse_amount(s),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

/// Parse an amount string: strips thousands separators, currency marks and
/// spaces; `(x)` is negative. A lone dash (accounting zero/blank) is not a value.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() || cleaned == "-" || cleaned == "." {
        return None;
    }
    if body
        .chars()
        .any(|c| c.is_alphabetic() && !matches!(c, 'P' | 'H' | 'p' | 'h'))
    {
        return None;
    }
    let n: f64 = cleaned.parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    Some(if negative { -n } else { n })
}

/// Format amount with thousands separator and two decimals (e.g. 27826.17 -> "27,826.17").
pub fn format_amount(n: f64) -> String {
    let s = format!("{:.2}", n);
    let s = if s == "-0.00" { "0.00".to_string() } else { s };
    let (int_part, dec_part) = if let Some(dot) = s.find('.') {
        (&s[..dot], &s[dot..])
    } else {
        (s.as_str(), "")
    };
    let (sign, digits) = if let Some(stripped) = int_part.strip_prefix('-') {
        ("-", stripped)
    } else {
        ("", int_part)
    };
    let mut out = String::from(sign);
    let chars: Vec<char> = digits.chars().collect();
    let len = chars.len();
    for (i, c) in chars.into_iter().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.push_str(dec_part);
    out
}

/// A 0-based absolute cell position, written and read as A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse "E25" into row 24, column 4.
    pub fn parse(address: &str) -> Result<Self, ConfigError> {
        let address = address.trim();
        let split = address
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ConfigError::InvalidAddress(address.to_string()))?;
        let (letters, digits) = address.split_at(split);
        let col = letter_to_col_index(letters).map_err(|_| ConfigError::InvalidAddress(address.to_string()))?;
        let row: u32 = digits
            .parse()
            .ok()
            .filter(|r| (1..=MAX_EXCEL_ROW).contains(r))
            .ok_or_else(|| ConfigError::InvalidAddress(address.to_string()))?;
        Ok(Self { row: row - 1, col })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_index_to_letter(self.col), self.row + 1)
    }
}

impl TryFrom<String> for CellAddress {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CellAddress::parse(&value)
    }
}

impl From<CellAddress> for String {
    fn from(value: CellAddress) -> Self {
        value.to_string()
    }
}

/// Positional grid anchored at A1: `data[row][col]`.
pub type Grid = Vec<Vec<CellValue>>;

/// One worksheet of a parsed source document.
///
/// `data` is the positional grid (trailing blank rows dropped); `handle` is the
/// underlying calamine range, read by absolute address.
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub name: String,
    pub data: Grid,
    pub handle: Range<Data>,
}

impl ParsedSheet {
    pub fn from_range(name: impl Into<String>, range: Range<Data>) -> Self {
        let data = range_to_grid(&range);
        Self {
            name: name.into(),
            data,
            handle: range,
        }
    }

    /// Read a cell from the underlying sheet by absolute address.
    pub fn cell_at(&self, address: CellAddress) -> CellValue {
        self.handle
            .get_value((address.row, address.col))
            .map(CellValue::from)
            .unwrap_or_default()
    }
}

/// Build an A1-anchored grid from a calamine range and drop trailing blank rows.
fn range_to_grid(range: &Range<Data>) -> Grid {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let mut grid: Grid = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(CellValue::from));
        grid.push(cells);
    }
    while grid
        .last()
        .map(|row| row.iter().all(CellValue::is_blank))
        .unwrap_or(false)
    {
        grid.pop();
    }
    grid
}

/// Turns document bytes into its ordered worksheets.
pub trait SheetParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<ParsedSheet>, WorkbookError>;
}

/// calamine-backed parser for xlsx/xlsm/xlsb/xls/ods bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineParser;

impl SheetParser for CalamineParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<ParsedSheet>, WorkbookError> {
        let mut workbook =
            open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| WorkbookError::Open(e.to_string()))?;
        let sheets = workbook
            .worksheets()
            .into_iter()
            .map(|(name, range)| ParsedSheet::from_range(name, range))
            .collect();
        Ok(sheets)
    }
}

/// One sheet of the destination template.
#[derive(Debug, Clone)]
pub struct TemplateSheet {
    pub name: String,
    pub values: Range<Data>,
    pub formulas: Option<Range<String>>,
}

/// Destination workbook loaded from template bytes.
#[derive(Debug, Clone)]
pub struct TemplateWorkbook {
    pub sheets: Vec<TemplateSheet>,
    /// Index into `sheets` of the sheet consolidated rows are written to.
    pub target: usize,
    /// Position of the target among all sheets of the workbook, readable or not.
    target_position: usize,
    bytes: Vec<u8>,
}

impl TemplateWorkbook {
    /// Load every readable sheet. The target is the first readable sheet among
    /// the first two positions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WorkbookError> {
        let mut workbook =
            open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| WorkbookError::Open(e.to_string()))?;
        let names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::new();
        let mut target = None;
        for (position, name) in names.iter().enumerate() {
            let Some(Ok(values)) = workbook.worksheet_range_at(position) else {
                continue;
            };
            if target.is_none() && position < 2 {
                target = Some((sheets.len(), position));
            }
            let formulas = workbook.worksheet_formula(name).ok();
            sheets.push(TemplateSheet {
                name: name.clone(),
                values,
                formulas,
            });
        }
        let (target, target_position) = target.ok_or(WorkbookError::NoReadableSheet)?;
        Ok(Self {
            sheets,
            target,
            target_position,
            bytes: bytes.to_vec(),
        })
    }

    pub fn target_sheet(&self) -> &TemplateSheet {
        &self.sheets[self.target]
    }

    /// Value of the target sheet at an absolute 0-based position.
    pub fn target_value(&self, row: u32, col: u32) -> CellValue {
        self.target_sheet()
            .values
            .get_value((row, col))
            .map(CellValue::from)
            .unwrap_or_default()
    }

    /// Lay the consolidated rows over the target sheet.
    ///
    /// xlsx templates are edited in place, so layout, styles and every other
    /// part survive untouched. Legacy formats (xls, ods) cannot be written
    /// back and are rebuilt from their values and formulas instead.
    pub fn render(&self, rows: &[ConsolidatedRow]) -> Result<Vec<u8>, WorkbookError> {
        if xlsx_patch::is_xlsx_package(&self.bytes) {
            return xlsx_patch::write_into_template(&self.bytes, self.target_position, rows);
        }
        self.rebuild(rows)
    }

    fn rebuild(&self, rows: &[ConsolidatedRow]) -> Result<Vec<u8>, WorkbookError> {
        // Cells a consolidated row owns are never copied, so blanks clear old data.
        let owned: HashSet<(u32, u16)> = rows
            .iter()
            .flat_map(|r| output_cells(r).into_iter().map(move |(col, _)| (r.row - 1, col)))
            .collect();
        let untouched = HashSet::new();
        let mut workbook = Workbook::new();
        let formats = OutputFormats::new();
        for (index, sheet) in self.sheets.iter().enumerate() {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            let skip = if index == self.target { &owned } else { &untouched };
            copy_template_sheet(worksheet, sheet, &formats, skip)?;
            if index == self.target {
                for row in rows {
                    write_consolidated_row(worksheet, row, &formats)?;
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }
}

/// Accounting display: zero renders as a dash.
pub const ACCOUNTING_FORMAT: &str = r#"_(* #,##0.00_);_(* \(#,##0.00\);_(* "-"??_);_(@_)"#;

struct OutputFormats {
    accounting: Format,
    lot_text: Format,
    date: Format,
}

impl OutputFormats {
    fn new() -> Self {
        Self {
            accounting: Format::new().set_num_format(ACCOUNTING_FORMAT),
            lot_text: Format::new().set_num_format("@").set_align(FormatAlign::Left),
            date: Format::new().set_num_format("yyyy-mm-dd"),
        }
    }
}

fn copy_template_sheet(
    worksheet: &mut Worksheet,
    sheet: &TemplateSheet,
    formats: &OutputFormats,
    skip: &HashSet<(u32, u16)>,
) -> Result<(), XlsxError> {
    if let Some((start_row, start_col)) = sheet.values.start() {
        for (r, c, data) in sheet.values.cells() {
            let row = start_row + r as u32;
            let Ok(col) = u16::try_from(start_col as usize + c) else {
                continue;
            };
            if skip.contains(&(row, col)) {
                continue;
            }
            match data {
                Data::Empty | Data::Error(_) => {}
                Data::Int(i) => {
                    worksheet.write_number(row, col, *i as f64)?;
                }
                Data::Float(f) => {
                    worksheet.write_number(row, col, *f)?;
                }
                Data::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Data::DateTime(dt) => {
                    worksheet.write_number_with_format(row, col, dt.as_f64(), &formats.date)?;
                }
                Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                    worksheet.write_string(row, col, sanitize_cell(s))?;
                }
            }
        }
    }
    if let Some(formulas) = &sheet.formulas {
        if let Some((start_row, start_col)) = formulas.start() {
            for (r, c, formula) in formulas.cells() {
                if formula.trim().is_empty() {
                    continue;
                }
                let row = start_row + r as u32;
                let Ok(col) = u16::try_from(start_col as usize + c) else {
                    continue;
                };
                if skip.contains(&(row, col)) {
                    continue;
                }
                worksheet.write_formula(row, col, formula.as_str())?;
            }
        }
    }
    Ok(())
}

/// Destination columns, 0-based. Column E (4) is reserved and never written.
pub mod template_columns {
    pub const FILE_ID: u16 = 0;
    pub const LOT_NO: u16 = 1;
    pub const OWNER_LAST: u16 = 2;
    pub const OWNER_FIRST: u16 = 3;
    pub const FARMER_LAST: u16 = 5;
    pub const FARMER_FIRST: u16 = 6;
    pub const AREA: u16 = 7;
    pub const PRINCIPAL: u16 = 8;
    pub const PENALTY: u16 = 9;
    pub const OLD_ACCOUNT: u16 = 10;
    pub const TOTAL: u16 = 11;
    pub const IA: u16 = 12;
    pub const DIVISION: u16 = 13;
}

/// What a consolidated row puts in one destination column.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputCell {
    Number(f64),
    /// Empty text clears the cell.
    Text(String),
    /// Lot number, stored as left-aligned text.
    Lot(String),
    /// Accounting-formatted amount; `None` leaves a formatted blank.
    Amount(Option<f64>),
}

/// Every owned column of a consolidated row, in column order.
pub fn output_cells(record: &ConsolidatedRow) -> Vec<(u16, OutputCell)> {
    use template_columns::*;

    let text = |value: &str| OutputCell::Text(sanitize_cell(value));
    // Formatted amount strings ("1,234.56") go back as the number they encode.
    let amount = |value: &str| OutputCell::Amount(parse_amount(value));
    let division = match record.division.parse::<i64>() {
        Ok(code) => OutputCell::Number(code as f64),
        Err(_) => text(&record.division),
    };
    vec![
        (FILE_ID, OutputCell::Number(record.file_id as f64)),
        (LOT_NO, OutputCell::Lot(sanitize_cell(&record.lot_no))),
        (OWNER_LAST, text(&record.owner_last)),
        (OWNER_FIRST, text(&record.owner_first)),
        (FARMER_LAST, text(&record.farmer_last)),
        (FARMER_FIRST, text(&record.farmer_first)),
        (AREA, amount(&record.area)),
        (PRINCIPAL, amount(&record.principal)),
        (PENALTY, amount(&record.penalty)),
        (OLD_ACCOUNT, amount(&record.old_account)),
        (TOTAL, amount(&record.total)),
        (IA, text(&record.ia)),
        (DIVISION, division),
    ]
}

fn write_consolidated_row(
    worksheet: &mut Worksheet,
    record: &ConsolidatedRow,
    formats: &OutputFormats,
) -> Result<(), XlsxError> {
    // ConsolidatedRow.row is 1-based; rust_xlsxwriter is 0-based.
    let row = record.row - 1;
    for (col, cell) in output_cells(record) {
        match cell {
            OutputCell::Number(num) => {
                worksheet.write_number(row, col, num)?;
            }
            OutputCell::Text(text) => {
                if !text.is_empty() {
                    worksheet.write_string(row, col, text)?;
                }
            }
            OutputCell::Lot(text) => {
                worksheet.write_string_with_format(row, col, text, &formats.lot_text)?;
            }
            OutputCell::Amount(Some(num)) => {
                worksheet.write_number_with_format(row, col, num, &formats.accounting)?;
            }
            OutputCell::Amount(None) => {
                worksheet.write_blank(row, col, &formats.accounting)?;
            }
        }
    }
    Ok(())
}

/// Excel's limit on the text held by one cell, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Drop characters that are invalid in sheet XML (control chars except tab,
/// newline, CR) and cut the text to what a cell can hold.
pub fn sanitize_cell(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            let u = c as u32;
            c == '\t' || c == '\n' || c == '\r' || !(u < 0x20 || u == 0x7F || u == 0xFFFE || u == 0xFFFF)
        })
        .take(MAX_CELL_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_round_trip() {
        assert_eq!(col_index_to_letter(0), "A");
        assert_eq!(col_index_to_letter(25), "Z");
        assert_eq!(col_index_to_letter(26), "AA");
        assert_eq!(letter_to_col_index("aa").unwrap(), 26);
        assert!(letter_to_col_index("A1").is_err());
    }

    #[test]
    fn parses_addresses() {
        assert_eq!(CellAddress::parse("E25").unwrap(), CellAddress::new(24, 4));
        assert_eq!(CellAddress::parse("c3").unwrap().to_string(), "C3");
        assert!(CellAddress::parse("E0").is_err());
        assert!(CellAddress::parse("25").is_err());
        assert!(CellAddress::parse("E").is_err());
    }

    #[test]
    fn formats_amounts_with_grouping() {
        assert_eq!(format_amount(27826.17), "27,826.17");
        assert_eq!(format_amount(1234567.5), "1,234,567.50");
        assert_eq!(format_amount(12.0), "12.00");
        assert_eq!(format_amount(-1500.0), "-1,500.00");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn formatted_amounts_parse_back_exactly() {
        for value in [0.0, 0.01, 1234.56, 999_999.99, 1_000_000.0, 42.1] {
            let text = format_amount(value);
            assert_eq!(parse_amount(&text), Some(value), "{text}");
        }
    }

    #[test]
    fn parses_amount_variants() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount(" ₱ 10 "), Some(10.0));
        assert_eq!(parse_amount("(25.00)"), Some(-25.0));
        assert_eq!(parse_amount("-"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("LOT-5"), None);
    }

    #[test]
    fn grid_is_anchored_at_a1_and_trims_trailing_blank_rows() {
        let mut range: Range<Data> = Range::new((2, 1), (5, 2));
        range.set_value((2, 1), Data::String("hello".into()));
        range.set_value((3, 2), Data::Float(3.5));
        range.set_value((5, 1), Data::String("   ".into()));
        let sheet = ParsedSheet::from_range("S", range);
        assert_eq!(sheet.data.len(), 4);
        assert_eq!(sheet.data[2][1], CellValue::Text("hello".into()));
        assert_eq!(sheet.data[3][2], CellValue::Number(3.5));
        assert_eq!(sheet.cell_at(CellAddress::parse("C4").unwrap()), CellValue::Number(3.5));
        assert_eq!(sheet.cell_at(CellAddress::parse("Z99").unwrap()), CellValue::Empty);
    }

    #[test]
    fn sanitize_strips_control_characters() {
        assert_eq!(sanitize_cell("a\u{1}b\tc"), "ab\tc");
    }

    #[test]
    fn sanitize_truncates_to_cell_limit() {
        let long = "é".repeat(MAX_CELL_CHARS + 10);
        let cleaned = sanitize_cell(&long);
        assert_eq!(cleaned.chars().count(), MAX_CELL_CHARS);
        assert_eq!(sanitize_cell("short"), "short");
    }

    #[test]
    fn output_cells_cover_every_owned_column() {
        let record = ConsolidatedRow {
            row: 4,
            file_id: 7,
            lot_no: "0012".into(),
            owner_last: "CRUZ".into(),
            principal: "1,234.50".into(),
            division: "3".into(),
            ia: "North IA".into(),
            ..ConsolidatedRow::default()
        };
        let cells = output_cells(&record);
        let columns: Vec<u16> = cells.iter().map(|(col, _)| *col).collect();
        assert_eq!(columns, vec![0, 1, 2, 3, 5, 6, 7, 8, 9, 10, 11, 12, 13]);
        assert_eq!(cells[0].1, OutputCell::Number(7.0));
        assert_eq!(cells[1].1, OutputCell::Lot("0012".into()));
        assert_eq!(cells[3].1, OutputCell::Text(String::new()));
        assert_eq!(cells[7].1, OutputCell::Amount(Some(1234.5)));
        assert_eq!(cells[6].1, OutputCell::Amount(None));
        assert_eq!(cells[12].1, OutputCell::Number(3.0));
    }

    #[test]
    fn rebuilt_templates_drop_stale_owned_cells() {
        let bytes = {
            let mut workbook = Workbook::new();
            let worksheet = workbook.add_worksheet();
            worksheet.set_name("Master").unwrap();
            worksheet.write_string(1, 3, "OLDFIRST").unwrap();
            worksheet.write_string(1, 6, "OLDFARMER").unwrap();
            worksheet.write_string(1, 15, "keep me").unwrap();
            workbook.save_to_buffer().unwrap()
        };
        let template = TemplateWorkbook::from_bytes(&bytes).unwrap();
        let record = ConsolidatedRow {
            row: 2,
            file_id: 3,
            lot_no: "LOT-3".into(),
            owner_last: "NEWLAST".into(),
            ..ConsolidatedRow::default()
        };
        let rebuilt = TemplateWorkbook::from_bytes(&template.rebuild(&[record]).unwrap()).unwrap();
        assert_eq!(rebuilt.target_value(1, 2), CellValue::Text("NEWLAST".into()));
        assert_eq!(rebuilt.target_value(1, 3), CellValue::Empty);
        assert_eq!(rebuilt.target_value(1, 6), CellValue::Empty);
        assert_eq!(rebuilt.target_value(1, 15), CellValue::Text("keep me".into()));
    }

    #[test]
    fn long_text_renders_instead_of_failing() {
        let bytes = {
            let mut workbook = Workbook::new();
            workbook.add_worksheet().set_name("Master").unwrap();
            workbook.save_to_buffer().unwrap()
        };
        let template = TemplateWorkbook::from_bytes(&bytes).unwrap();
        let record = ConsolidatedRow {
            row: 2,
            file_id: 1,
            owner_last: "X".repeat(40_000),
            ..ConsolidatedRow::default()
        };
        let rendered = template.render(&[record]).unwrap();
        let reread = TemplateWorkbook::from_bytes(&rendered).unwrap();
        let CellValue::Text(name) = reread.target_value(1, 2) else {
            panic!("owner name missing");
        };
        assert_eq!(name.len(), MAX_CELL_CHARS);
    }
}
