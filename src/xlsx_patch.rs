//! In-place update of an xlsx template. Only the target worksheet, the
//! stylesheet and the calculation parts are rewritten; every other part of the
//! package is copied through unchanged, so merged cells, column widths,
//! drawings and defined names survive.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use std::sync::OnceLock;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive};

use crate::error::WorkbookError;
use crate::excel::{output_cells, CellAddress, OutputCell, ACCOUNTING_FORMAT};
use crate::types::ConsolidatedRow;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PART: &str = "xl/styles.xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// Built-in number format "@".
const TEXT_NUM_FMT_ID: u32 = 49;
/// Lowest id Excel accepts for a custom number format.
const FIRST_CUSTOM_NUM_FMT_ID: u32 = 164;

fn calc_chain_override_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<Override[^>]*calcChain[^>]*/>").expect("calc chain override regex"))
}

fn calc_chain_relationship_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<Relationship[^>]*calcChain[^>]*/>").expect("calc chain relationship regex"))
}

pub(crate) fn is_xlsx_package(bytes: &[u8]) -> bool {
    ZipArchive::new(Cursor::new(bytes))
        .map(|archive| archive.file_names().any(|name| name == WORKBOOK_PART))
        .unwrap_or(false)
}

/// Write `records` into the sheet at `sheet_position` of the template package.
pub(crate) fn write_into_template(
    template: &[u8],
    sheet_position: usize,
    records: &[ConsolidatedRow],
) -> Result<Vec<u8>, WorkbookError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let sheet_part = sheet_part_path(&mut archive, sheet_position)?;
    let (mut styles_xml, added) = if has_part(&archive, STYLES_PART) {
        add_styles(&read_part(&mut archive, STYLES_PART)?)?.unzip()
    } else {
        (None, None)
    };
    let mut sheet_xml = Some(patch_sheet(&read_part(&mut archive, &sheet_part)?, records, added)?);

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for name in names {
        // Cached calculation order is stale once cells change; Excel rebuilds it.
        if name == CALC_CHAIN_PART {
            continue;
        }
        let replacement = if name == sheet_part {
            sheet_xml.take()
        } else if name == STYLES_PART {
            styles_xml.take()
        } else if name == CONTENT_TYPES_PART {
            let xml = read_part(&mut archive, &name)?;
            Some(calc_chain_override_regex().replace_all(&xml, "").into_owned().into_bytes())
        } else if name == WORKBOOK_RELS_PART {
            let xml = read_part(&mut archive, &name)?;
            Some(calc_chain_relationship_regex().replace_all(&xml, "").into_owned().into_bytes())
        } else if name == WORKBOOK_PART {
            Some(force_full_calc(&read_part(&mut archive, &name)?).into_bytes())
        } else {
            None
        };
        match replacement {
            Some(content) => {
                writer.start_file(name.as_str(), options)?;
                writer.write_all(&content)?;
            }
            None => writer.raw_copy_file(archive.by_name(&name)?)?,
        }
    }
    Ok(writer.finish()?.into_inner())
}

fn has_part<R: Read + Seek>(archive: &ZipArchive<R>, name: &str) -> bool {
    archive.file_names().any(|n| n == name)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, WorkbookError> {
    let mut file = archive.by_name(name)?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(xml)
}

fn attr_value(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn is_named(element: &BytesStart<'_>, name: &[u8]) -> bool {
    element.local_name().as_ref() == name
}

fn is_end_of(element: &BytesEnd<'_>, name: &[u8]) -> bool {
    element.local_name().as_ref() == name
}

/// Copy of `element` with `key` set to `value`.
fn with_attr(element: &BytesStart<'_>, key: &str, value: &str) -> BytesStart<'static> {
    let mut out = without_attr(element, key);
    out.push_attribute((key, value));
    out
}

fn without_attr(element: &BytesStart<'_>, key: &str) -> BytesStart<'static> {
    let mut out = BytesStart::new(String::from_utf8_lossy(element.name().as_ref()).into_owned());
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() != key.as_bytes() {
            out.push_attribute(attr);
        }
    }
    out
}

/// Zip path of the nth `<sheet>` of the workbook, following its relationship.
fn sheet_part_path<R: Read + Seek>(archive: &mut ZipArchive<R>, position: usize) -> Result<String, WorkbookError> {
    let workbook = read_part(archive, WORKBOOK_PART)?;
    let mut reader = Reader::from_str(&workbook);
    let mut relationship_ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if is_named(&e, b"sheet") => {
                let id = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.local_name().as_ref() == b"id")
                    .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                relationship_ids.push(id);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let missing = || WorkbookError::MissingPart(format!("worksheet #{}", position + 1));
    let relationship_id = relationship_ids.get(position).cloned().flatten().ok_or_else(missing)?;

    let rels = read_part(archive, WORKBOOK_RELS_PART)?;
    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e)
                if is_named(&e, b"Relationship")
                    && attr_value(&e, b"Id").as_deref() == Some(relationship_id.as_str()) =>
            {
                let target = attr_value(&e, b"Target").ok_or_else(missing)?;
                return Ok(match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{target}"),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Err(missing())
}

/// Excel recomputes formulas on open; cached results may depend on new rows.
fn force_full_calc(workbook_xml: &str) -> String {
    if workbook_xml.contains("fullCalcOnLoad") {
        return workbook_xml.to_string();
    }
    if workbook_xml.contains("<calcPr") {
        return workbook_xml.replacen("<calcPr", r#"<calcPr fullCalcOnLoad="1""#, 1);
    }
    // calcPr goes right after the latest of these in schema order.
    for preceding in ["</definedNames>", "</externalReferences>", "</functionGroups>", "</sheets>"] {
        if let Some(at) = workbook_xml.find(preceding) {
            let at = at + preceding.len();
            return format!("{}<calcPr fullCalcOnLoad=\"1\"/>{}", &workbook_xml[..at], &workbook_xml[at..]);
        }
    }
    workbook_xml.to_string()
}

/// Cell style indexes appended to the template's `cellXfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AddedStyles {
    accounting: u32,
    lot_text: u32,
}

/// Append the accounting number format and the two output cell styles.
/// Returns `None` when the stylesheet has no `cellXfs` to extend.
fn add_styles(xml: &str) -> Result<Option<(Vec<u8>, AddedStyles)>, WorkbookError> {
    let mut reader = Reader::from_str(xml);
    let mut has_num_fmts = false;
    let mut in_num_fmts = false;
    let mut num_fmt_count = 0u32;
    let mut max_num_fmt_id = None::<u32>;
    let mut has_cell_xfs = false;
    let mut in_cell_xfs = false;
    let mut xf_count = 0u32;
    loop {
        let event = reader.read_event()?;
        let (element, is_start) = match &event {
            Event::Start(e) => (e, true),
            Event::Empty(e) => (e, false),
            Event::End(e) => {
                if is_end_of(e, b"cellXfs") {
                    in_cell_xfs = false;
                } else if is_end_of(e, b"numFmts") {
                    in_num_fmts = false;
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };
        match element.local_name().as_ref() {
            b"numFmts" => {
                has_num_fmts = true;
                in_num_fmts = is_start;
            }
            // Differential formats carry numFmts too; their ids still count.
            b"numFmt" => {
                if in_num_fmts {
                    num_fmt_count += 1;
                }
                if let Some(id) = attr_value(element, b"numFmtId").and_then(|v| v.parse::<u32>().ok()) {
                    max_num_fmt_id = Some(max_num_fmt_id.map_or(id, |m| m.max(id)));
                }
            }
            b"cellXfs" => {
                has_cell_xfs = true;
                in_cell_xfs = is_start;
            }
            b"xf" if in_cell_xfs => xf_count += 1,
            _ => {}
        }
    }
    if !has_cell_xfs {
        return Ok(None);
    }

    let num_fmt_id = max_num_fmt_id.map_or(FIRST_CUSTOM_NUM_FMT_ID, |id| (id + 1).max(FIRST_CUSTOM_NUM_FMT_ID));
    let added = AddedStyles {
        accounting: xf_count,
        lot_text: xf_count + 1,
    };
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) if is_named(&e, b"styleSheet") => {
                writer.write_event(Event::Start(e))?;
                if !has_num_fmts {
                    write_num_fmts(&mut writer, num_fmt_id)?;
                }
            }
            Event::Start(e) if is_named(&e, b"numFmts") => {
                writer.write_event(Event::Start(with_attr(&e, "count", &(num_fmt_count + 1).to_string())))?;
            }
            Event::Empty(e) if is_named(&e, b"numFmts") => write_num_fmts(&mut writer, num_fmt_id)?,
            Event::End(e) if is_end_of(&e, b"numFmts") => {
                writer.write_event(Event::Empty(accounting_num_fmt(num_fmt_id)))?;
                writer.write_event(Event::End(e))?;
            }
            Event::Start(e) if is_named(&e, b"cellXfs") => {
                writer.write_event(Event::Start(with_attr(&e, "count", &(xf_count + 2).to_string())))?;
            }
            Event::Empty(e) if is_named(&e, b"cellXfs") => {
                writer.write_event(Event::Start(with_attr(&e, "count", "2")))?;
                write_added_xfs(&mut writer, num_fmt_id)?;
                writer.write_event(Event::End(BytesEnd::new("cellXfs")))?;
            }
            Event::End(e) if is_end_of(&e, b"cellXfs") => {
                write_added_xfs(&mut writer, num_fmt_id)?;
                writer.write_event(Event::End(e))?;
            }
            event => writer.write_event(event)?,
        }
    }
    Ok(Some((writer.into_inner(), added)))
}

fn accounting_num_fmt(id: u32) -> BytesStart<'static> {
    BytesStart::new("numFmt").with_attributes([("numFmtId", id.to_string().as_str()), ("formatCode", ACCOUNTING_FORMAT)])
}

fn write_num_fmts(writer: &mut Writer<Vec<u8>>, id: u32) -> Result<(), WorkbookError> {
    writer.write_event(Event::Start(BytesStart::new("numFmts").with_attributes([("count", "1")])))?;
    writer.write_event(Event::Empty(accounting_num_fmt(id)))?;
    writer.write_event(Event::End(BytesEnd::new("numFmts")))?;
    Ok(())
}

fn write_added_xfs(writer: &mut Writer<Vec<u8>>, accounting_fmt_id: u32) -> Result<(), WorkbookError> {
    let xf = |num_fmt_id: u32| {
        BytesStart::new("xf").with_attributes([
            ("numFmtId", num_fmt_id.to_string().as_str()),
            ("fontId", "0"),
            ("fillId", "0"),
            ("borderId", "0"),
            ("xfId", "0"),
            ("applyNumberFormat", "1"),
        ])
    };
    writer.write_event(Event::Empty(xf(accounting_fmt_id)))?;
    writer.write_event(Event::Start(xf(TEXT_NUM_FMT_ID).with_attributes([("applyAlignment", "1")])))?;
    writer.write_event(Event::Empty(BytesStart::new("alignment").with_attributes([("horizontal", "left")])))?;
    writer.write_event(Event::End(BytesEnd::new("xf")))?;
    Ok(())
}

/// A `<row>` of the target sheet: its start tag and its `<c>` elements by
/// 0-based column.
struct SheetRow {
    start: BytesStart<'static>,
    cells: BTreeMap<u32, Vec<Event<'static>>>,
}

impl SheetRow {
    fn new(number: u32) -> Self {
        Self {
            start: BytesStart::new("row").with_attributes([("r", number.to_string().as_str())]),
            cells: BTreeMap::new(),
        }
    }
}

fn row_number(element: &BytesStart<'_>, previous: u32) -> u32 {
    attr_value(element, b"r")
        .and_then(|r| r.parse().ok())
        .unwrap_or(previous + 1)
}

fn cell_column(element: &BytesStart<'_>, previous: Option<u32>) -> u32 {
    attr_value(element, b"r")
        .and_then(|r| CellAddress::parse(&r).ok())
        .map(|address| address.col)
        .unwrap_or_else(|| previous.map_or(0, |col| col + 1))
}

/// Collect the rows of `<sheetData>`, keyed by 1-based row number.
fn read_sheet_rows(xml: &str) -> Result<BTreeMap<u32, SheetRow>, WorkbookError> {
    let mut reader = Reader::from_str(xml);
    let mut rows = BTreeMap::new();
    let mut in_sheet_data = false;
    let mut current: Option<(u32, SheetRow)> = None;
    let mut cell: Option<(u32, Vec<Event<'static>>)> = None;
    let mut last_row = 0u32;
    let mut last_col = None;
    loop {
        let event = reader.read_event()?;
        if let Some((_, events)) = cell.as_mut() {
            let closes = matches!(&event, Event::End(e) if is_end_of(e, b"c"));
            events.push(event.into_owned());
            if closes {
                if let (Some((col, events)), Some((_, row))) = (cell.take(), current.as_mut()) {
                    row.cells.insert(col, events);
                }
            }
            continue;
        }
        match event {
            Event::Eof => break,
            Event::Start(e) if is_named(&e, b"sheetData") => in_sheet_data = true,
            Event::Empty(e) if is_named(&e, b"sheetData") => break,
            Event::End(e) if is_end_of(&e, b"sheetData") => break,
            Event::Start(e) if in_sheet_data && is_named(&e, b"row") => {
                last_row = row_number(&e, last_row);
                last_col = None;
                let row = SheetRow {
                    start: e.into_owned(),
                    cells: BTreeMap::new(),
                };
                current = Some((last_row, row));
            }
            Event::Empty(e) if in_sheet_data && is_named(&e, b"row") => {
                last_row = row_number(&e, last_row);
                let row = SheetRow {
                    start: e.into_owned(),
                    cells: BTreeMap::new(),
                };
                rows.insert(last_row, row);
            }
            Event::End(e) if is_end_of(&e, b"row") => {
                if let Some((number, row)) = current.take() {
                    rows.insert(number, row);
                }
            }
            Event::Start(e) if is_named(&e, b"c") => {
                let col = cell_column(&e, last_col);
                last_col = Some(col);
                cell = Some((col, vec![Event::Start(e.into_owned())]));
            }
            Event::Empty(e) if is_named(&e, b"c") => {
                let col = cell_column(&e, last_col);
                last_col = Some(col);
                if let Some((_, row)) = current.as_mut() {
                    row.cells.insert(col, vec![Event::Empty(e.into_owned())]);
                }
            }
            _ => {}
        }
    }
    Ok(rows)
}

fn cell_style(event: &Event<'_>) -> Option<String> {
    match event {
        Event::Start(e) | Event::Empty(e) => attr_value(e, b"s"),
        _ => None,
    }
}

/// XML events of one written cell. Cells keep the template's style unless the
/// value needs one of the added formats.
fn cell_events(
    reference: &str,
    value: OutputCell,
    template_style: Option<String>,
    added: Option<AddedStyles>,
) -> Vec<Event<'static>> {
    let style = match &value {
        OutputCell::Amount(_) => added.map(|s| s.accounting.to_string()).or(template_style),
        OutputCell::Lot(_) => added.map(|s| s.lot_text.to_string()).or(template_style),
        _ => template_style,
    };
    let mut start = BytesStart::new("c").with_attributes([("r", reference)]);
    if let Some(style) = &style {
        start.push_attribute(("s", style.as_str()));
    }
    match value {
        OutputCell::Number(num) | OutputCell::Amount(Some(num)) => vec![
            Event::Start(start),
            Event::Start(BytesStart::new("v")),
            Event::Text(BytesText::new(&num.to_string()).into_owned()),
            Event::End(BytesEnd::new("v")),
            Event::End(BytesEnd::new("c")),
        ],
        OutputCell::Text(text) | OutputCell::Lot(text) if !text.is_empty() => {
            start.push_attribute(("t", "inlineStr"));
            vec![
                Event::Start(start),
                Event::Start(BytesStart::new("is")),
                Event::Start(BytesStart::new("t").with_attributes([("xml:space", "preserve")])),
                Event::Text(BytesText::new(&text).into_owned()),
                Event::End(BytesEnd::new("t")),
                Event::End(BytesEnd::new("is")),
                Event::End(BytesEnd::new("c")),
            ]
        }
        _ => vec![Event::Empty(start)],
    }
}

/// `A1:N12`-style extent of the populated cells.
fn dimension_ref(rows: &BTreeMap<u32, SheetRow>) -> Option<String> {
    let mut populated = rows.iter().filter(|(_, row)| !row.cells.is_empty());
    let first_row = *populated.next()?.0;
    let last_row = populated.last().map_or(first_row, |(number, _)| *number);
    let first_col = rows.values().filter_map(|row| row.cells.keys().next()).min()?;
    let last_col = rows.values().filter_map(|row| row.cells.keys().next_back()).max()?;
    let start = CellAddress::new(first_row.saturating_sub(1), *first_col);
    let end = CellAddress::new(last_row.saturating_sub(1), *last_col);
    Some(if start == end {
        start.to_string()
    } else {
        format!("{start}:{end}")
    })
}

fn write_rows(writer: &mut Writer<Vec<u8>>, rows: &BTreeMap<u32, SheetRow>) -> Result<(), WorkbookError> {
    for row in rows.values() {
        if row.cells.is_empty() {
            writer.write_event(Event::Empty(row.start.clone()))?;
            continue;
        }
        writer.write_event(Event::Start(row.start.clone()))?;
        for event in row.cells.values().flatten() {
            writer.write_event(event)?;
        }
        writer.write_event(Event::End(row.start.to_end()))?;
    }
    Ok(())
}

/// Merge `records` into the worksheet XML. Every owned column of a record's
/// row is rewritten, blank values included; other cells are left as they are.
fn patch_sheet(xml: &str, records: &[ConsolidatedRow], added: Option<AddedStyles>) -> Result<Vec<u8>, WorkbookError> {
    let mut rows = read_sheet_rows(xml)?;
    for record in records {
        let row = rows.entry(record.row).or_insert_with(|| SheetRow::new(record.row));
        // Spans are an optional load hint; stale ones confuse Excel.
        row.start = without_attr(&row.start, "spans");
        for (col, value) in output_cells(record) {
            let col = u32::from(col);
            let template_style = row.cells.get(&col).and_then(|events| events.first()).and_then(cell_style);
            let reference = CellAddress::new(record.row - 1, col).to_string();
            row.cells.insert(col, cell_events(&reference, value, template_style, added));
        }
    }
    let dimension = dimension_ref(&rows);

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Empty(e) if is_named(&e, b"dimension") => match &dimension {
                Some(extent) => writer.write_event(Event::Empty(with_attr(&e, "ref", extent)))?,
                None => writer.write_event(Event::Empty(e))?,
            },
            Event::Start(e) if is_named(&e, b"sheetData") => {
                let end = e.to_end().into_owned();
                reader.read_to_end(e.name())?;
                writer.write_event(Event::Start(e))?;
                write_rows(&mut writer, &rows)?;
                writer.write_event(Event::End(end))?;
            }
            Event::Empty(e) if is_named(&e, b"sheetData") => {
                let end = e.to_end().into_owned();
                writer.write_event(Event::Start(e))?;
                write_rows(&mut writer, &rows)?;
                writer.write_event(Event::End(end))?;
            }
            event => writer.write_event(event)?,
        }
    }
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/></font><font><b/><sz val="11"/></font></fonts><cellStyleXfs count="1"><xf numFmtId="0" fontId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" xfId="0"/><xf numFmtId="0" fontId="1" xfId="0" applyFont="1"/></cellXfs></styleSheet>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:P2"/><cols><col min="3" max="3" width="40" customWidth="1"/></cols><sheetData><row r="1" spans="1:16"><c r="A1" s="1" t="s"><v>0</v></c></row><row r="2" spans="1:16"><c r="A2"><v>3</v></c><c r="B2" s="1" t="s"><v>1</v></c><c r="D2" t="s"><v>2</v></c><c r="P2" t="s"><v>3</v></c></row></sheetData><mergeCells count="1"><mergeCell ref="A1:N1"/></mergeCells></worksheet>"#;

    fn record(row: u32) -> ConsolidatedRow {
        ConsolidatedRow {
            row,
            file_id: 3,
            lot_no: "LOT-3".into(),
            owner_last: "NEWLAST".into(),
            principal: "1,500.00".into(),
            ..ConsolidatedRow::default()
        }
    }

    #[test]
    fn styles_gain_accounting_and_lot_formats() {
        let (xml, added) = add_styles(STYLES).unwrap().unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert_eq!(added, AddedStyles { accounting: 2, lot_text: 3 });
        assert!(xml.contains(r#"<numFmts count="1"><numFmt numFmtId="164""#));
        assert!(xml.contains(r#"<cellXfs count="4">"#));
        assert!(xml.contains(r#"<xf numFmtId="49""#));
        assert!(xml.contains(r#"<alignment horizontal="left"/>"#));
        assert!(xml.contains("<b/>"));
    }

    #[test]
    fn custom_format_ids_do_not_collide() {
        let styles = STYLES.replace(
            "<fonts",
            r#"<numFmts count="1"><numFmt numFmtId="170" formatCode="0.0"/></numFmts><fonts"#,
        );
        let (xml, _) = add_styles(&styles).unwrap().unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert!(xml.contains(r#"<numFmts count="2">"#));
        assert!(xml.contains(r#"numFmtId="171""#));
    }

    #[test]
    fn stylesheet_without_cell_formats_is_left_alone() {
        assert!(add_styles("<styleSheet><fonts/></styleSheet>").unwrap().is_none());
    }

    #[test]
    fn reused_row_keeps_foreign_cells_and_blanks_owned_ones() {
        let added = AddedStyles { accounting: 2, lot_text: 3 };
        let xml = String::from_utf8(patch_sheet(SHEET, &[record(2)], Some(added)).unwrap()).unwrap();
        assert!(xml.contains(r#"<c r="A2"><v>3</v></c>"#));
        assert!(xml.contains(r#"<c r="B2" s="3" t="inlineStr"><is><t xml:space="preserve">LOT-3</t></is></c>"#));
        assert!(xml.contains(r#"<c r="D2"/>"#));
        assert!(xml.contains(r#"<c r="G2"/>"#));
        assert!(xml.contains(r#"<c r="I2" s="2"><v>1500</v></c>"#));
        assert!(xml.contains(r#"<c r="P2" t="s"><v>3</v></c>"#));
        assert!(xml.contains(r#"<row r="2">"#));
        assert!(xml.contains(r#"<row r="1" spans="1:16">"#));
        assert!(xml.contains(r#"<mergeCell ref="A1:N1"/>"#));
        assert!(xml.contains(r#"<col min="3" max="3" width="40" customWidth="1"/>"#));
        assert!(xml.contains(r#"<dimension ref="A1:P2"/>"#));
    }

    #[test]
    fn new_rows_are_appended_in_order() {
        let xml = String::from_utf8(patch_sheet(SHEET, &[record(5)], None).unwrap()).unwrap();
        let row2 = xml.find(r#"<row r="2""#).unwrap();
        let row5 = xml.find(r#"<row r="5">"#).unwrap();
        assert!(row2 < row5);
        assert!(xml.contains(r#"<dimension ref="A1:P5"/>"#));
        assert!(xml.contains(r#"<c r="C5" t="inlineStr"><is><t xml:space="preserve">NEWLAST</t></is></c>"#));
    }

    #[test]
    fn empty_sheet_data_is_filled() {
        let sheet = r#"<worksheet><dimension ref="A1"/><sheetData/></worksheet>"#;
        let xml = String::from_utf8(patch_sheet(sheet, &[record(2)], None).unwrap()).unwrap();
        assert!(xml.contains(r#"<sheetData><row r="2"><c r="A2"><v>3</v></c>"#));
        assert!(xml.contains(r#"<dimension ref="A2:N2"/>"#));
    }

    #[test]
    fn text_is_escaped() {
        let mut row = record(2);
        row.owner_last = "A & B <C>".into();
        let xml = String::from_utf8(patch_sheet(SHEET, &[row], None).unwrap()).unwrap();
        assert!(xml.contains("A &amp; B &lt;C&gt;"));
    }

    #[test]
    fn full_calc_is_requested_once() {
        assert_eq!(
            force_full_calc(r#"<workbook><calcPr calcId="191029"/></workbook>"#),
            r#"<workbook><calcPr fullCalcOnLoad="1" calcId="191029"/></workbook>"#
        );
        assert_eq!(
            force_full_calc("<workbook><sheets><sheet/></sheets><extLst/></workbook>"),
            r#"<workbook><sheets><sheet/></sheets><calcPr fullCalcOnLoad="1"/><extLst/></workbook>"#
        );
        assert_eq!(
            force_full_calc("<workbook><sheets/><definedNames><definedName/></definedNames></workbook>"),
            r#"<workbook><sheets/><definedNames><definedName/></definedNames><calcPr fullCalcOnLoad="1"/></workbook>"#
        );
        let already = r#"<workbook><calcPr fullCalcOnLoad="1"/></workbook>"#;
        assert_eq!(force_full_calc(already), already);
    }
}
