use crate::config::AppConfig;
use crate::error::{DataError, DataResult};
use crate::types::{Table, Workbook};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Which sheet to read.
#[derive(Debug, Clone, Copy)]
pub enum SheetSelector<'a> {
    First,
    Named(&'a str),
}

/// Load the primary, points and counts sheets and check their columns.
///
/// Each sheet is validated right after it is read, so a bad primary sheet
/// aborts the run before the other sheets are touched.
pub fn load_workbook(config: &AppConfig) -> DataResult<Workbook> {
    let path = &config.input.workbook;
    info!("Loading workbook {:?}", path);
    let mut workbook = open(path)?;

    let primary = load_sheet(&mut workbook, path, SheetSelector::First)?;
    require_columns(&primary, &config.columns.primary_required)?;
    info!("Loaded {} primary rows from sheet '{}'", primary.len(), primary.name);

    let points = load_sheet(&mut workbook, path, SheetSelector::Named(&config.input.points_sheet))?;
    require_columns(&points, &config.columns.points_required)?;
    info!("Loaded {} point rows from sheet '{}'", points.len(), points.name);

    let counts = load_sheet(&mut workbook, path, SheetSelector::Named(&config.input.counts_sheet))?;
    require_min_columns(&counts, 2)?;
    debug!("Loaded {} aggregate rows from sheet '{}'", counts.len(), counts.name);

    Ok(Workbook { primary, points, counts })
}

pub fn open(path: &Path) -> DataResult<Sheets<BufReader<File>>> {
    if !path.exists() {
        return Err(DataError::SourceMissing { path: path.to_path_buf() });
    }
    open_workbook_auto(path).map_err(|source| DataError::Workbook {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_sheet(
    workbook: &mut Sheets<BufReader<File>>,
    path: &Path,
    selector: SheetSelector<'_>,
) -> DataResult<Table> {
    let available = workbook.sheet_names();
    let name = match selector {
        SheetSelector::First => available
            .first()
            .cloned()
            .ok_or_else(|| DataError::EmptyWorkbook { path: path.to_path_buf() })?,
        SheetSelector::Named(name) => {
            if !available.iter().any(|s| s == name) {
                return Err(DataError::SheetMissing {
                    sheet: name.to_string(),
                    available,
                });
            }
            name.to_string()
        }
    };

    let range = workbook.worksheet_range(&name).map_err(|source| DataError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|header| header.iter().map(|cell| cell_text(cell).unwrap_or_default()).collect())
        .unwrap_or_default();
    let rows = rows.map(|row| row.to_vec()).collect();

    Ok(Table { name, headers, rows })
}

/// Fail unless every name in `required` is a header of `table`.
pub fn require_columns(table: &Table, required: &[String]) -> DataResult<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| table.column_index(name).is_none())
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::MissingColumns {
            sheet: table.name.clone(),
            required: required.to_vec(),
            missing,
        })
    }
}

/// Index of a single named column, as a one-element requirement.
pub fn column(table: &Table, name: &str) -> DataResult<usize> {
    table.column_index(name).ok_or_else(|| DataError::MissingColumns {
        sheet: table.name.clone(),
        required: vec![name.to_string()],
        missing: vec![name.to_string()],
    })
}

pub fn require_min_columns(table: &Table, needed: usize) -> DataResult<()> {
    if table.headers.len() < needed {
        return Err(DataError::TooFewColumns {
            sheet: table.name.clone(),
            needed,
            found: table.headers.len(),
        });
    }
    Ok(())
}

/// Text content of a cell, `None` when blank.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        other => Some(other.to_string()),
    }
}

/// Finite numeric content of a cell, `None` otherwise.
pub fn cell_number(cell: &Data) -> Option<f64> {
    let value = match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
