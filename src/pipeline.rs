use crate::config::AppConfig;
use crate::{data, processing, render};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Load -> validate -> filter -> render -> write. Returns the written path.
///
/// The document is fully rendered before the output file is touched, so any
/// failure leaves no file behind.
pub fn generate(config: &AppConfig) -> Result<PathBuf> {
    let workbook = data::load_workbook(config)
        .with_context(|| format!("Failed to load {:?}", config.input.workbook))?;

    let layers = processing::process_data(config, &workbook)?;

    let html = render::render_html(config, &layers).context("Failed to render map")?;

    let path = config.output.html.clone();
    render::write_html(&path, &html)?;
    info!("Map generation finished");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::{primary_row, standard_sheets, write_workbook, Cell};
    use crate::error::DataError;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, workbook: PathBuf) -> AppConfig {
        let mut config = AppConfig::default();
        config.input.workbook = workbook;
        config.output.html = dir.path().join("out").join("map.html");
        config
    }

    fn sample_rows<'a>() -> Vec<Vec<Cell<'a>>> {
        vec![
            primary_row("A", "A-1", Cell::Num(30.0), Cell::Num(70.0)),
            primary_row("B", "B-1", Cell::Num(32.0), Cell::Num(72.0)),
            primary_row("A", "A-2", Cell::Num(34.0), Cell::Num(77.0)),
            primary_row("B", "B-2", Cell::Blank, Cell::Num(72.0)),
        ]
    }

    #[test]
    fn writes_map_for_valid_workbook() {
        let dir = TempDir::new().unwrap();
        let workbook = write_workbook(&dir, &standard_sheets(sample_rows()));
        let config = config_in(&dir, workbook);

        let path = generate(&config).unwrap();
        assert_eq!(path, config.output.html);

        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("], zoom: 6 });"));
        assert!(html.contains("Primary Data - A"));
        assert!(html.contains("Primary Data - B"));
        assert!(html.contains("Schools Cluster"));
        assert!(html.contains("Govt Girls School"));
        // filtered rows never reach the page
        assert!(!html.contains("B-2"));
        assert!(!html.contains("Govt Boys School"));
    }

    #[test]
    fn missing_column_aborts_without_output() {
        let dir = TempDir::new().unwrap();
        let mut sheets = standard_sheets(sample_rows());
        sheets[0].headers.retain(|h| *h != "Female");
        for row in &mut sheets[0].rows {
            row.pop();
        }
        let workbook = write_workbook(&dir, &sheets);
        let config = config_in(&dir, workbook);

        let err = generate(&config).unwrap_err();
        let data_err = err.downcast_ref::<DataError>().unwrap();
        assert!(matches!(
            data_err,
            DataError::MissingColumns { missing, .. } if missing == &vec!["Female".to_string()]
        ));
        assert!(format!("{err:#}").contains("Female"));
        assert!(!config.output.html.exists());
    }

    #[test]
    fn missing_workbook_aborts_without_output() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir, dir.path().join("absent.xlsx"));

        let err = generate(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::SourceMissing { .. })
        ));
        assert!(!config.output.html.exists());
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let dir = TempDir::new().unwrap();
        let workbook = write_workbook(&dir, &standard_sheets(sample_rows()));
        let config = config_in(&dir, workbook);

        let first = fs::read(generate(&config).unwrap()).unwrap();
        let second = fs::read(generate(&config).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
