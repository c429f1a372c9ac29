// ! Writer module for populating workbook templates

mod cell_ref;
mod xlsx_writer;

pub use cell_ref::{CellRange, CellReference};
pub use xlsx_writer::apply_sheet_edits_xlsx;

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Value written into a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellData {
    Text(String),
    Number(f64),
}

impl From<&str> for CellData {
    fn from(value: &str) -> Self {
        CellData::Text(value.to_string())
    }
}

impl From<String> for CellData {
    fn from(value: String) -> Self {
        CellData::Text(value)
    }
}

impl From<i64> for CellData {
    fn from(value: i64) -> Self {
        CellData::Number(value as f64)
    }
}

impl From<f64> for CellData {
    fn from(value: f64) -> Self {
        CellData::Number(value)
    }
}

/// Number formats the writer can register in a workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumberStyle {
    /// Built-in format 1 ("0")
    Integer,
    /// US dollars without decimals
    Currency,
}

impl NumberStyle {
    pub const ALL: [NumberStyle; 2] = [NumberStyle::Integer, NumberStyle::Currency];
}

/// Cell writes and style ranges to apply to one worksheet
#[derive(Debug, Default)]
pub struct SheetEdits {
    cells: BTreeMap<CellReference, CellData>,
    styles: Vec<(CellRange, NumberStyle)>,
}

impl SheetEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cell(&mut self, cell: CellReference, value: impl Into<CellData>) {
        self.cells.insert(cell, value.into());
    }

    /// Write `values` left to right starting at column A of `row` (0-based)
    pub fn set_row<I, V>(&mut self, row: u32, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellData>,
    {
        for (col, value) in values.into_iter().enumerate() {
            self.set_cell(CellReference::new(row, col as u32), value);
        }
    }

    /// Apply a number style to every written or existing cell in `range`
    pub fn set_style(&mut self, range: CellRange, style: NumberStyle) {
        self.styles.push((range, style));
    }

    pub fn cells(&self) -> &BTreeMap<CellReference, CellData> {
        &self.cells
    }

    pub fn get(&self, cell: &CellReference) -> Option<&CellData> {
        self.cells.get(cell)
    }

    /// Style for a position; later ranges take precedence
    pub fn style_at(&self, row: u32, col: u32) -> Option<NumberStyle> {
        self.styles
            .iter()
            .rev()
            .find(|(range, _)| range.contains(row, col))
            .map(|(_, style)| *style)
    }

    pub fn has_styles(&self) -> bool {
        !self.styles.is_empty()
    }
}

/// Copy a template workbook to a working path and sync it to disk
pub fn copy_template<P: AsRef<Path>>(template_path: P, copy_path: P) -> Result<()> {
    let template_path = template_path.as_ref();
    let copy_path = copy_path.as_ref();

    if template_path == copy_path {
        anyhow::bail!(
            "Refusing to copy template onto itself: {}",
            template_path.display()
        );
    }

    let mut template = File::open(template_path)
        .with_context(|| format!("Failed to open template: {}", template_path.display()))?;

    if let Some(parent) = copy_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut copy = File::create(copy_path)
        .with_context(|| format!("Failed to create template copy: {}", copy_path.display()))?;

    io::copy(&mut template, &mut copy).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            template_path.display(),
            copy_path.display()
        )
    })?;
    copy.sync_all()
        .with_context(|| format!("Failed to sync template copy: {}", copy_path.display()))?;

    Ok(())
}

/// Write `edits` into a sheet of `input_path`, saving the result to `output_path`.
///
/// When `sheet_name` is `None` the first sheet is edited.
pub fn apply_sheet_edits<P: AsRef<Path>>(
    input_path: P,
    output_path: P,
    sheet_name: Option<&str>,
    edits: &SheetEdits,
) -> Result<()> {
    let input = input_path.as_ref();

    // Determine file type by extension
    match input.extension().and_then(|s| s.to_str()) {
        Some("xlsx") | Some("xlsm") => {
            apply_sheet_edits_xlsx(input, output_path.as_ref(), sheet_name, edits)
        }
        Some("ods") => {
            anyhow::bail!("ODS format not yet supported for modification")
        }
        _ => anyhow::bail!("Unsupported file format: {}", input.display()),
    }
}
