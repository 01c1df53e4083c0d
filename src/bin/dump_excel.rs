//! Print every non-empty cell of a workbook with its A1 address, for
//! calibrating layouts against real source documents.

use soa_consolidator_lib::excel::{CalamineParser, CellAddress, SheetParser};

fn main() {
    soa_consolidator_lib::init_tracing();
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: dump_excel <file.xlsx>");
        std::process::exit(2);
    };
    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Could not read {}: {}", path, e);
            std::process::exit(1);
        }
    };
    let sheets = match CalamineParser.parse(&bytes) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    for sheet in sheets {
        println!("== {} ({} rows)", sheet.name, sheet.data.len());
        for (r, row) in sheet.data.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_blank() {
                    continue;
                }
                println!("{}: {}", CellAddress::new(r as u32, c as u32), cell);
            }
        }
    }
}
