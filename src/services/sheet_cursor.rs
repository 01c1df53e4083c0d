//! Positional reads over a parsed worksheet.

use crate::excel::{CellAddress, CellValue, ParsedSheet};
use crate::models::Column;

/// Read-only view of one worksheet: anchor search over the positional grid,
/// fixed-offset reads relative to an anchor, and absolute-address reads.
#[derive(Debug, Clone, Copy)]
pub struct SheetCursor<'a> {
    sheet: &'a ParsedSheet,
}

impl<'a> SheetCursor<'a> {
    pub fn new(sheet: &'a ParsedSheet) -> Self {
        Self { sheet }
    }

    pub fn name(&self) -> &'a str {
        &self.sheet.name
    }

    /// First row (0-based) with a cell containing `marker`, case-insensitive.
    pub fn find_anchor(&self, marker: &str) -> Option<usize> {
        let marker = marker.trim().to_lowercase();
        if marker.is_empty() {
            return None;
        }
        self.sheet.data.iter().position(|row| {
            row.iter().any(|cell| match cell {
                CellValue::Text(s) => s.to_lowercase().contains(&marker),
                _ => false,
            })
        })
    }

    /// Grid cell at `anchor + row_offset` in `col`.
    pub fn relative(&self, anchor: usize, row_offset: usize, col: Column) -> CellValue {
        self.grid(anchor + row_offset, col.index())
    }

    /// Grid cell at an absolute position.
    pub fn at(&self, address: CellAddress) -> CellValue {
        self.grid(address.row as usize, address.col as usize)
    }

    /// Same position read through the sheet handle instead of the grid.
    pub fn by_address(&self, address: CellAddress) -> CellValue {
        self.sheet.cell_at(address)
    }

    fn grid(&self, row: usize, col: usize) -> CellValue {
        self.sheet
            .data
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::sheet_from_rows;

    #[test]
    fn finds_first_matching_row_case_insensitive() {
        let sheet = sheet_from_rows(
            "Details",
            &[&["", ""], &["x", "ACCOUNT DETAILS:"], &["account details", ""]],
        );
        let cursor = SheetCursor::new(&sheet);
        assert_eq!(cursor.find_anchor("account details"), Some(1));
        assert_eq!(cursor.find_anchor("statement of account"), None);
        assert_eq!(cursor.find_anchor("   "), None);
    }

    #[test]
    fn reads_relative_and_out_of_range_cells() {
        let sheet = sheet_from_rows("S", &[&["anchor", ""], &["", "LOT-1"]]);
        let cursor = SheetCursor::new(&sheet);
        assert_eq!(cursor.relative(0, 1, Column(1)), CellValue::Text("LOT-1".into()));
        assert_eq!(cursor.relative(0, 40, Column(1)), CellValue::Empty);
        assert_eq!(cursor.at(CellAddress::new(0, 9)), CellValue::Empty);
    }
}
