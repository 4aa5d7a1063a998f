//! CSV ingestion and export for [`Frame`]s.
//!
//! Reading infers each column's type: a column where every non-empty cell
//! parses as a float becomes numeric (empty cells become NaN), anything else
//! stays text. Writing emits headers and no row-index column; NaN round-trips
//! as an empty cell.

use std::path::Path;

use tracing::info;

use crate::data::{Column, Frame};
use crate::error::{PipelineError, Result};

/// Read a CSV file into a typed frame.
pub fn read_frame(path: impl AsRef<Path>) -> Result<Frame> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| PipelineError::io(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::io(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|e| PipelineError::io(path, e))?;
        for (idx, value) in record.iter().enumerate() {
            if idx < cells.len() {
                cells[idx].push(value.to_string());
            }
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| infer_column(name, raw))
        .collect();
    let frame = Frame::new(columns).map_err(PipelineError::from)?;
    info!(
        path = %path.display(),
        rows = frame.n_rows(),
        cols = frame.n_cols(),
        "loaded csv"
    );
    Ok(frame)
}

/// Write a frame as CSV with headers and no index column.
pub fn write_frame(frame: &Frame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| PipelineError::io(path, e))?;
    let names = frame.column_names();
    writer
        .write_record(&names)
        .map_err(|e| PipelineError::io(path, e))?;

    for row in 0..frame.n_rows() {
        let record: Vec<String> = frame
            .columns()
            .iter()
            .map(|col| match col.values() {
                crate::data::ColumnValues::Numeric(v) => {
                    if v[row].is_nan() {
                        String::new()
                    } else {
                        format!("{}", v[row])
                    }
                }
                crate::data::ColumnValues::Text(v) => v[row].clone(),
            })
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| PipelineError::io(path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    info!(path = %path.display(), rows = frame.n_rows(), "wrote csv");
    Ok(())
}

fn infer_column(name: String, raw: Vec<String>) -> Column {
    let mut any_value = false;
    let mut all_numeric = true;
    for cell in &raw {
        if cell.is_empty() {
            continue;
        }
        any_value = true;
        if cell.trim().parse::<f32>().is_err() {
            all_numeric = false;
            break;
        }
    }

    if any_value && all_numeric {
        let values = raw
            .into_iter()
            .map(|cell| {
                if cell.is_empty() {
                    f32::NAN
                } else {
                    cell.trim().parse::<f32>().expect("checked above")
                }
            })
            .collect();
        Column::numeric(name, values)
    } else {
        Column::text(name, raw)
    }
}
