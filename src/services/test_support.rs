//! In-memory worksheet fixtures for extractor and engine tests.

use calamine::{Data, Range};

use crate::excel::{CellAddress, ParsedSheet};

pub fn sheet_from_rows(name: &str, rows: &[&[&str]]) -> ParsedSheet {
    let mut builder = SheetBuilder::new(name);
    for (r, row) in rows.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            if !text.is_empty() {
                builder.cells.push((CellAddress::new(r as u32, c as u32), Data::String(text.to_string())));
            }
        }
    }
    builder.build()
}

/// Builds a sheet cell by cell using A1 addresses.
pub struct SheetBuilder {
    name: String,
    cells: Vec<(CellAddress, Data)>,
    handle_only: Vec<(CellAddress, Data)>,
}

impl SheetBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: Vec::new(),
            handle_only: Vec::new(),
        }
    }

    pub fn text(mut self, address: &str, value: &str) -> Self {
        self.cells.push((addr(address), Data::String(value.to_string())));
        self
    }

    pub fn number(mut self, address: &str, value: f64) -> Self {
        self.cells.push((addr(address), Data::Float(value)));
        self
    }

    /// A value the positional grid does not see but the address lookup does.
    pub fn handle_number(mut self, address: &str, value: f64) -> Self {
        self.handle_only.push((addr(address), Data::Float(value)));
        self
    }

    pub fn build(self) -> ParsedSheet {
        let mut sheet = ParsedSheet::from_range(self.name, to_range(&self.cells));
        if !self.handle_only.is_empty() {
            let mut all = self.cells;
            all.extend(self.handle_only);
            sheet.handle = to_range(&all);
        }
        sheet
    }
}

fn addr(address: &str) -> CellAddress {
    CellAddress::parse(address).expect("test address")
}

fn to_range(cells: &[(CellAddress, Data)]) -> Range<Data> {
    if cells.is_empty() {
        return Range::empty();
    }
    let max_row = cells.iter().map(|(a, _)| a.row).max().unwrap_or(0);
    let max_col = cells.iter().map(|(a, _)| a.col).max().unwrap_or(0);
    let mut range = Range::new((0, 0), (max_row, max_col));
    for (address, value) in cells {
        range.set_value((address.row, address.col), value.clone());
    }
    range
}
