// ! XLSX writer functionality for filling worksheet cells and number styles

use super::{CellData, CellReference, NumberStyle, SheetEdits};
use anyhow::{Context, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;
use zip::{ZipArchive, ZipWriter, write::SimpleFileOptions};

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PATH: &str = "xl/styles.xml";

/// First id available for custom number formats
const FIRST_CUSTOM_NUM_FMT_ID: u32 = 164;
const INTEGER_NUM_FMT_ID: u32 = 1;
const CURRENCY_FORMAT_CODE: &str = r##""$"#,##0"##;
const STYLE_FONT_NAME: &str = "Calibri";
const STYLE_FONT_SIZE: &str = "10";

type StyleIds = HashMap<NumberStyle, u32>;

/// Apply cell writes and number styles to one sheet of an XLSX file
pub fn apply_sheet_edits_xlsx(
    input_path: &Path,
    output_path: &Path,
    sheet_name: Option<&str>,
    edits: &SheetEdits,
) -> Result<()> {
    if input_path == output_path {
        anyhow::bail!(
            "Input and output must differ: {}",
            input_path.display()
        );
    }

    let file = File::open(input_path)
        .with_context(|| format!("Failed to open workbook: {}", input_path.display()))?;
    let reader = BufReader::new(file);
    let mut archive = ZipArchive::new(reader)?;

    let sheet_path = resolve_sheet_path(&mut archive, sheet_name)?;

    // Register styles first so cells can reference their indices
    let (styles_xml, style_ids) = if edits.has_styles() {
        let xml = read_file_from_zip(&mut archive, STYLES_PATH)?;
        let (xml, ids) = register_number_styles(&xml)?;
        (Some(xml), ids)
    } else {
        (None, StyleIds::new())
    };

    let sheet_xml = read_file_from_zip(&mut archive, &sheet_path)?;
    let sheet_xml = rewrite_sheet_xml(&sheet_xml, edits, &style_ids)
        .with_context(|| format!("Failed to rewrite {}", sheet_path))?;

    let output_file = File::create(output_path)
        .with_context(|| format!("Failed to create output: {}", output_path.display()))?;
    let mut zip_writer = ZipWriter::new(output_file);

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();
        zip_writer.start_file(name.as_str(), SimpleFileOptions::default())?;

        if name == sheet_path {
            zip_writer.write_all(sheet_xml.as_bytes())?;
        } else if let (STYLES_PATH, Some(xml)) = (name.as_str(), &styles_xml) {
            zip_writer.write_all(xml.as_bytes())?;
        } else {
            // Copy file as is
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)?;
            zip_writer.write_all(&buffer)?;
        }
    }

    let output_file = zip_writer.finish()?;
    output_file
        .sync_all()
        .with_context(|| format!("Failed to sync output: {}", output_path.display()))?;
    Ok(())
}

// Helper functions

fn read_file_from_zip(archive: &mut ZipArchive<BufReader<File>>, filename: &str) -> Result<String> {
    let mut file = archive
        .by_name(filename)
        .with_context(|| format!("Workbook is missing {}", filename))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

fn attribute_value(element: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn element_name(element: &BytesStart) -> Result<String> {
    Ok(String::from_utf8(element.name().as_ref().to_vec())?)
}

/// Copy an element, dropping attributes listed in `skip`
fn copy_without(element: &BytesStart, skip: &[&[u8]]) -> Result<BytesStart<'static>> {
    let mut copy = BytesStart::new(element_name(element)?);
    for attr in element.attributes() {
        let attr = attr?;
        if !skip.contains(&attr.key.as_ref()) {
            copy.push_attribute(attr);
        }
    }
    Ok(copy)
}

fn with_count(element: &BytesStart, count: u32) -> Result<BytesStart<'static>> {
    let mut copy = copy_without(element, &[b"count"])?;
    copy.push_attribute(("count", count.to_string().as_str()));
    Ok(copy)
}

/// Find the archive path of a worksheet through workbook.xml and its rels
fn resolve_sheet_path(
    archive: &mut ZipArchive<BufReader<File>>,
    sheet_name: Option<&str>,
) -> Result<String> {
    let workbook_xml = read_file_from_zip(archive, WORKBOOK_PATH)?;
    let sheets = parse_sheet_relations(&workbook_xml)?;

    let (name, rel_id) = match sheet_name {
        Some(wanted) => sheets
            .iter()
            .find(|(name, _)| name == wanted)
            .with_context(|| format!("Sheet '{}' not found in workbook", wanted))?,
        None => sheets.first().context("Workbook has no sheets")?,
    };

    let rels_xml = read_file_from_zip(archive, WORKBOOK_RELS_PATH)?;
    let target = parse_relationship_target(&rels_xml, rel_id)?
        .with_context(|| format!("No relationship target for sheet '{}'", name))?;

    Ok(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    })
}

fn parse_sheet_relations(workbook_xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute_value(&e, b"name")?.unwrap_or_default();
                // r:id, matched on its local name
                if let Some(rel_id) = attribute_value(&e, b"id")? {
                    sheets.push((name, rel_id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
            _ => {}
        }
    }

    Ok(sheets)
}

fn parse_relationship_target(rels_xml: &str, rel_id: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(rels_xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attribute_value(&e, b"Id")?.as_deref() == Some(rel_id) {
                    return attribute_value(&e, b"Target");
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
            _ => {}
        }
    }
}

// Styles

#[derive(Debug, Default)]
struct StylesScan {
    num_fmt_count: u32,
    max_num_fmt_id: u32,
    has_num_fmts: bool,
    font_count: u32,
    has_fonts: bool,
    cell_xf_count: u32,
    has_cell_xfs: bool,
}

fn scan_styles(xml: &str) -> Result<StylesScan> {
    let mut reader = Reader::from_str(xml);
    let mut scan = StylesScan::default();
    let mut in_num_fmts = false;
    let mut in_fonts = false;
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"numFmts" => {
                    scan.has_num_fmts = true;
                    in_num_fmts = true;
                }
                b"fonts" => {
                    scan.has_fonts = true;
                    in_fonts = true;
                }
                b"cellXfs" => {
                    scan.has_cell_xfs = true;
                    in_cell_xfs = true;
                }
                b"font" if in_fonts => scan.font_count += 1,
                b"xf" if in_cell_xfs => scan.cell_xf_count += 1,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"numFmts" => scan.has_num_fmts = true,
                b"fonts" => scan.has_fonts = true,
                b"cellXfs" => scan.has_cell_xfs = true,
                b"numFmt" => {
                    // Ids are shared with differential formats
                    if in_num_fmts {
                        scan.num_fmt_count += 1;
                    }
                    if let Some(id) = attribute_value(&e, b"numFmtId")? {
                        if let Ok(id) = id.parse::<u32>() {
                            scan.max_num_fmt_id = scan.max_num_fmt_id.max(id);
                        }
                    }
                }
                b"font" if in_fonts => scan.font_count += 1,
                b"xf" if in_cell_xfs => scan.cell_xf_count += 1,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = false,
                b"fonts" => in_fonts = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
            _ => {}
        }
    }

    Ok(scan)
}

fn write_currency_num_fmt(writer: &mut Writer<Cursor<Vec<u8>>>, id: u32) -> Result<()> {
    let mut num_fmt = BytesStart::new("numFmt");
    num_fmt.push_attribute(("numFmtId", id.to_string().as_str()));
    num_fmt.push_attribute(("formatCode", CURRENCY_FORMAT_CODE));
    writer.write_event(Event::Empty(num_fmt))?;
    Ok(())
}

fn write_style_font(writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("font")))?;
    let mut size = BytesStart::new("sz");
    size.push_attribute(("val", STYLE_FONT_SIZE));
    writer.write_event(Event::Empty(size))?;
    let mut name = BytesStart::new("name");
    name.push_attribute(("val", STYLE_FONT_NAME));
    writer.write_event(Event::Empty(name))?;
    let mut family = BytesStart::new("family");
    family.push_attribute(("val", "2"));
    writer.write_event(Event::Empty(family))?;
    writer.write_event(Event::End(BytesEnd::new("font")))?;
    Ok(())
}

fn write_style_xfs(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    currency_fmt_id: u32,
    font_id: u32,
) -> Result<()> {
    for style in NumberStyle::ALL {
        let num_fmt_id = match style {
            NumberStyle::Integer => INTEGER_NUM_FMT_ID,
            NumberStyle::Currency => currency_fmt_id,
        };
        let mut xf = BytesStart::new("xf");
        xf.push_attribute(("numFmtId", num_fmt_id.to_string().as_str()));
        xf.push_attribute(("fontId", font_id.to_string().as_str()));
        xf.push_attribute(("fillId", "0"));
        xf.push_attribute(("borderId", "0"));
        xf.push_attribute(("xfId", "0"));
        xf.push_attribute(("applyNumberFormat", "1"));
        xf.push_attribute(("applyFont", "1"));
        writer.write_event(Event::Empty(xf))?;
    }
    Ok(())
}

/// Add a currency number format, a Calibri 10 font and one cell format per
/// [`NumberStyle`] to styles.xml. Returns the new XML and the cell format
/// index of each style.
fn register_number_styles(xml: &str) -> Result<(String, StyleIds)> {
    let scan = scan_styles(xml)?;
    if !scan.has_fonts || !scan.has_cell_xfs {
        anyhow::bail!("styles.xml has no fonts or cellXfs section");
    }

    let currency_fmt_id = (scan.max_num_fmt_id + 1).max(FIRST_CUSTOM_NUM_FMT_ID);
    let font_id = scan.font_count;
    let style_ids: StyleIds = NumberStyle::ALL
        .iter()
        .enumerate()
        .map(|(i, style)| (*style, scan.cell_xf_count + i as u32))
        .collect();
    let added_xfs = NumberStyle::ALL.len() as u32;

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut in_num_fmts = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"numFmts" => {
                    in_num_fmts = true;
                    writer.write_event(Event::Start(with_count(&e, scan.num_fmt_count + 1)?))?;
                }
                b"fonts" => {
                    if !scan.has_num_fmts {
                        writer.write_event(Event::Start(with_count(
                            &BytesStart::new("numFmts"),
                            1,
                        )?))?;
                        write_currency_num_fmt(&mut writer, currency_fmt_id)?;
                        writer.write_event(Event::End(BytesEnd::new("numFmts")))?;
                    }
                    writer.write_event(Event::Start(with_count(&e, scan.font_count + 1)?))?;
                }
                b"cellXfs" => {
                    writer.write_event(Event::Start(with_count(
                        &e,
                        scan.cell_xf_count + added_xfs,
                    )?))?;
                }
                _ => writer.write_event(Event::Start(e))?,
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"numFmts" => {
                    writer.write_event(Event::Start(with_count(&e, 1)?))?;
                    write_currency_num_fmt(&mut writer, currency_fmt_id)?;
                    writer.write_event(Event::End(BytesEnd::new(element_name(&e)?)))?;
                }
                b"fonts" => {
                    writer.write_event(Event::Start(with_count(&e, 1)?))?;
                    write_style_font(&mut writer)?;
                    writer.write_event(Event::End(BytesEnd::new(element_name(&e)?)))?;
                }
                b"cellXfs" => {
                    writer.write_event(Event::Start(with_count(&e, added_xfs)?))?;
                    write_style_xfs(&mut writer, currency_fmt_id, font_id)?;
                    writer.write_event(Event::End(BytesEnd::new(element_name(&e)?)))?;
                }
                _ => writer.write_event(Event::Empty(e))?,
            },
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"numFmts" if in_num_fmts => {
                        in_num_fmts = false;
                        write_currency_num_fmt(&mut writer, currency_fmt_id)?;
                    }
                    b"fonts" => write_style_font(&mut writer)?,
                    b"cellXfs" => write_style_xfs(&mut writer, currency_fmt_id, font_id)?,
                    _ => {}
                }
                writer.write_event(Event::End(e))?;
            }
            Ok(Event::Eof) => break,
            Ok(e) => writer.write_event(e)?,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
        }
    }

    let result = writer.into_inner().into_inner();
    Ok((String::from_utf8(result)?, style_ids))
}

// Worksheet

#[derive(Debug)]
struct RowEntry {
    start: BytesStart<'static>,
    cells: BTreeMap<u32, Vec<Event<'static>>>,
}

impl RowEntry {
    fn new() -> Self {
        Self {
            start: BytesStart::new("row"),
            cells: BTreeMap::new(),
        }
    }
}

/// A worksheet split around its sheetData
#[derive(Debug, Default)]
struct ParsedSheet {
    prefix: Vec<Event<'static>>,
    rows: BTreeMap<u32, RowEntry>,
    suffix: Vec<Event<'static>>,
}

#[derive(Clone, Copy)]
enum Section {
    Prefix,
    SheetData,
    Suffix,
}

fn parse_sheet(xml: &str) -> Result<ParsedSheet> {
    let mut reader = Reader::from_str(xml);
    let mut sheet = ParsedSheet::default();
    let mut section = Section::Prefix;

    let mut current_row: Option<(u32, RowEntry)> = None;
    let mut current_cell: Option<(u32, Vec<Event<'static>>)> = None;
    let mut next_row = 0u32;
    let mut next_col = 0u32;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event.into_owned(),
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
        };

        match section {
            Section::Prefix => match event {
                Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                    sheet.prefix.push(event);
                    section = Section::SheetData;
                }
                Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                    let end = BytesEnd::new(element_name(&e)?);
                    sheet.prefix.push(Event::Start(e));
                    sheet.suffix.push(Event::End(end));
                    section = Section::Suffix;
                }
                Event::Eof => anyhow::bail!("Worksheet has no sheetData"),
                event => sheet.prefix.push(event),
            },
            Section::SheetData => {
                if let Some((col, events)) = current_cell.as_mut() {
                    let is_cell_end =
                        matches!(&event, Event::End(e) if e.local_name().as_ref() == b"c");
                    events.push(event);
                    if is_cell_end {
                        let col = *col;
                        if let (Some((_, row)), Some((_, events))) =
                            (current_row.as_mut(), current_cell.take())
                        {
                            row.cells.insert(col, events);
                        }
                    }
                    continue;
                }

                match event {
                    Event::Start(ref e) if e.local_name().as_ref() == b"row" => {
                        let row = row_index(e)?.unwrap_or(next_row);
                        current_row = Some((row, RowEntry {
                            start: e.clone(),
                            cells: BTreeMap::new(),
                        }));
                        next_col = 0;
                    }
                    Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                        let row = row_index(&e)?.unwrap_or(next_row);
                        sheet.rows.insert(row, RowEntry {
                            start: e,
                            cells: BTreeMap::new(),
                        });
                        next_row = row + 1;
                    }
                    Event::End(ref e) if e.local_name().as_ref() == b"row" => {
                        if let Some((row, entry)) = current_row.take() {
                            sheet.rows.insert(row, entry);
                            next_row = row + 1;
                        }
                    }
                    Event::Start(ref e) if e.local_name().as_ref() == b"c" => {
                        let col = cell_column(e)?.unwrap_or(next_col);
                        next_col = col + 1;
                        current_cell = Some((col, vec![event]));
                    }
                    Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                        let col = cell_column(e)?.unwrap_or(next_col);
                        next_col = col + 1;
                        if let Some((_, row)) = current_row.as_mut() {
                            row.cells.insert(col, vec![event]);
                        }
                    }
                    Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                        sheet.suffix.push(event);
                        section = Section::Suffix;
                    }
                    Event::Eof => anyhow::bail!("Unterminated sheetData"),
                    _ => {}
                }
            }
            Section::Suffix => match event {
                Event::Eof => break,
                event => sheet.suffix.push(event),
            },
        }
    }

    Ok(sheet)
}

/// 0-based row index from a row's `r` attribute
fn row_index(row: &BytesStart) -> Result<Option<u32>> {
    Ok(attribute_value(row, b"r")?
        .and_then(|r| r.parse::<u32>().ok())
        .and_then(|r| r.checked_sub(1)))
}

/// 0-based column from a cell's `r` attribute
fn cell_column(cell: &BytesStart) -> Result<Option<u32>> {
    Ok(attribute_value(cell, b"r")?
        .and_then(|r| CellReference::parse(&r))
        .map(|cell| cell.col))
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Events for one generated cell: numbers as values, text as inline strings
fn cell_events(cell: CellReference, data: &CellData) -> Vec<Event<'static>> {
    let mut start = BytesStart::new("c");
    start.push_attribute(("r", cell.to_excel_ref().as_str()));

    match data {
        CellData::Number(value) => vec![
            Event::Start(start),
            Event::Start(BytesStart::new("v")),
            Event::Text(BytesText::new(&format_number(*value)).into_owned()),
            Event::End(BytesEnd::new("v")),
            Event::End(BytesEnd::new("c")),
        ],
        CellData::Text(text) => {
            start.push_attribute(("t", "inlineStr"));
            let mut t = BytesStart::new("t");
            if text.trim() != text {
                t.push_attribute(("xml:space", "preserve"));
            }
            vec![
                Event::Start(start),
                Event::Start(BytesStart::new("is")),
                Event::Start(t),
                Event::Text(BytesText::new(text).into_owned()),
                Event::End(BytesEnd::new("t")),
                Event::End(BytesEnd::new("is")),
                Event::End(BytesEnd::new("c")),
            ]
        }
    }
}

/// Set the `s` attribute on a cell's opening element
fn restyle_cell(events: &mut [Event<'static>], style_index: u32) -> Result<()> {
    let Some(first) = events.first_mut() else {
        return Ok(());
    };
    let (restyled, is_empty) = match &*first {
        Event::Start(e) => (copy_without(e, &[b"s"])?, false),
        Event::Empty(e) => (copy_without(e, &[b"s"])?, true),
        _ => return Ok(()),
    };
    let mut restyled = restyled;
    restyled.push_attribute(("s", style_index.to_string().as_str()));
    *first = if is_empty {
        Event::Empty(restyled)
    } else {
        Event::Start(restyled)
    };
    Ok(())
}

fn dimension_ref(rows: &BTreeMap<u32, RowEntry>) -> String {
    let mut bounds: Option<(CellReference, CellReference)> = None;
    for (&row, entry) in rows {
        for &col in entry.cells.keys() {
            bounds = Some(match bounds {
                None => (CellReference::new(row, col), CellReference::new(row, col)),
                Some((min, max)) => (
                    CellReference::new(min.row.min(row), min.col.min(col)),
                    CellReference::new(max.row.max(row), max.col.max(col)),
                ),
            });
        }
    }

    match bounds {
        Some((min, max)) if min != max => format!("{}:{}", min, max),
        Some((min, _)) => min.to_string(),
        None => "A1".to_string(),
    }
}

/// Merge `edits` into a worksheet's XML
fn rewrite_sheet_xml(xml: &str, edits: &SheetEdits, style_ids: &StyleIds) -> Result<String> {
    let mut sheet = parse_sheet(xml)?;

    for (cell, data) in edits.cells() {
        sheet
            .rows
            .entry(cell.row)
            .or_insert_with(RowEntry::new)
            .cells
            .insert(cell.col, cell_events(*cell, data));
    }

    let mut writer = Writer::new(Cursor::new(Vec::new()));

    for event in sheet.prefix.iter().cloned() {
        match event {
            Event::Empty(ref e) if e.local_name().as_ref() == b"dimension" => {
                let mut dimension = copy_without(e, &[b"ref"])?;
                dimension.push_attribute(("ref", dimension_ref(&sheet.rows).as_str()));
                writer.write_event(Event::Empty(dimension))?;
            }
            event => writer.write_event(event)?,
        }
    }

    for (row, mut entry) in sheet.rows {
        let mut start = copy_without(&entry.start, &[b"r", b"spans"])?;
        start.push_attribute(("r", (row + 1).to_string().as_str()));

        if entry.cells.is_empty() {
            writer.write_event(Event::Empty(start))?;
            continue;
        }

        let end = BytesEnd::new(element_name(&start)?);
        writer.write_event(Event::Start(start))?;
        for (col, events) in entry.cells.iter_mut() {
            if let Some(style) = edits.style_at(row, *col) {
                if let Some(index) = style_ids.get(&style) {
                    restyle_cell(events, *index)?;
                }
            }
            for event in events.iter().cloned() {
                writer.write_event(event)?;
            }
        }
        writer.write_event(Event::End(end))?;
    }

    for event in sheet.suffix {
        writer.write_event(event)?;
    }

    let result = writer.into_inner().into_inner();
    Ok(String::from_utf8(result)?)
}
