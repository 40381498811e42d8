//! Local file readers and writers.
//!
//! - Placement surfaces are header-less CSV grids; every non-blank cell is a
//!   candidate assembly reference. The surface is named after the file stem.
//! - Push lines are CSV with a `level,item_number,quantity` header, or a JSON
//!   array of `{"level", "item_number", "quantity"}` objects.
//! - Consolidation results are written as CSV with a `sources` column.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};

use crate::core::BomError;
use crate::models::{ConsolidatedEntry, PlacementSurface, SyncBomLine};

/// File format of a push-line file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LineFormat {
    #[default]
    Csv,
    Json,
}

impl LineFormat {
    /// Format implied by a file extension; anything but `.json` is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

/// Read a placement surface from a CSV grid file.
pub fn read_surface(path: &Path) -> Result<PlacementSurface, BomError> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    read_surface_from(name, File::open(path)?)
}

/// Read a placement surface named `name` from CSV data.
pub fn read_surface_from<R: Read>(
    name: impl Into<String>,
    reader: R,
) -> Result<PlacementSurface, BomError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(PlacementSurface::new(name, rows))
}

/// Read push lines from a CSV or JSON file, chosen by extension.
pub fn read_sync_lines(path: &Path) -> Result<Vec<SyncBomLine>, BomError> {
    let file = File::open(path)?;
    match LineFormat::from_path(path) {
        LineFormat::Json => read_sync_lines_json(file),
        LineFormat::Csv => read_sync_lines_csv(file),
    }
}

pub fn read_sync_lines_csv<R: Read>(reader: R) -> Result<Vec<SyncBomLine>, BomError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(reader);
    let mut lines = Vec::new();
    for line in rdr.deserialize::<SyncBomLine>() {
        lines.push(line?);
    }
    Ok(lines)
}

pub fn read_sync_lines_json<R: Read>(reader: R) -> Result<Vec<SyncBomLine>, BomError> {
    let mut lines: Vec<SyncBomLine> = serde_json::from_reader(reader)?;
    for line in &mut lines {
        line.item_number = line.item_number.trim().to_string();
    }
    Ok(lines)
}

/// Write push lines in `format`.
pub fn write_sync_lines<W: Write>(
    writer: W,
    lines: &[SyncBomLine],
    format: LineFormat,
) -> Result<(), BomError> {
    match format {
        LineFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, lines)?;
            writeln!(writer)?;
        }
        LineFormat::Csv => {
            let mut wtr = WriterBuilder::new().from_writer(writer);
            for line in lines {
                wtr.serialize(line)?;
            }
            if lines.is_empty() {
                wtr.write_record(["level", "item_number", "quantity"])?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

/// Write a consolidation result as CSV.
pub fn write_consolidated_csv<W: Write>(
    writer: W,
    entries: &[ConsolidatedEntry],
) -> Result<(), BomError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record([
        "level",
        "item_number",
        "name",
        "category",
        "quantity",
        "resolved",
        "sources",
    ])?;
    for entry in entries {
        let sources: Vec<&str> = entry.source_surfaces.iter().map(String::as_str).collect();
        wtr.write_record([
            entry.level.to_string(),
            entry.item.number.clone(),
            entry.item.name.clone(),
            entry.item.category.clone(),
            entry.quantity.to_string(),
            entry.resolved.to_string(),
            sources.join(";"),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
