#![allow(dead_code)]

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use rust_xlsxwriter::Workbook;
use soa_consolidator_lib::excel::CellAddress;
use std::io::Cursor;

pub enum Value<'a> {
    Text(&'a str),
    Number(f64),
}

pub use Value::{Number, Text};

/// A sheet to write: name plus (A1 address, value) cells.
pub struct SheetSpec<'a> {
    pub name: &'a str,
    pub cells: Vec<(&'a str, Value<'a>)>,
}

pub fn sheet<'a>(name: &'a str, cells: Vec<(&'a str, Value<'a>)>) -> SheetSpec<'a> {
    SheetSpec { name, cells }
}

pub fn workbook(sheets: &[SheetSpec<'_>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for fixture in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(fixture.name).unwrap();
        for (address, value) in &fixture.cells {
            let a = CellAddress::parse(address).unwrap();
            let col = a.col as u16;
            match value {
                Value::Text(t) => {
                    worksheet.write_string(a.row, col, *t).unwrap();
                }
                Value::Number(n) => {
                    worksheet.write_number(a.row, col, *n).unwrap();
                }
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

pub fn empty_template() -> Vec<u8> {
    workbook(&[sheet("Consolidated", vec![])])
}

/// Account-details sheet with the anchor at A6 and the given lot and owner last name.
pub fn account_sheet<'a>(lot: &'a str, owner_last: &'a str) -> SheetSpec<'a> {
    sheet(
        "Account Details",
        vec![
            ("C3", Text("2")),
            ("C4", Text("Upper River IA")),
            ("A6", Text("ACCOUNT DETAILS")),
            ("C7", Text(lot)),
            ("C11", Text("JUAN")),
            ("C13", Text(owner_last)),
            ("C15", Text("PEDRO")),
            ("C17", Text("REYES")),
        ],
    )
}

pub fn source(lot: &str, owner_last: &str) -> Vec<u8> {
    workbook(&[account_sheet(lot, owner_last)])
}

pub fn first_sheet(bytes: &[u8]) -> Range<Data> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
    workbook.worksheet_range_at(0).unwrap().unwrap()
}

/// Value at an A1 address, `Data::Empty` when absent.
pub fn cell(range: &Range<Data>, address: &str) -> Data {
    let a = CellAddress::parse(address).unwrap();
    range.get_value((a.row, a.col)).cloned().unwrap_or(Data::Empty)
}
