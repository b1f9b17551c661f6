use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{bail, Context, Result};

/// Everything the pipeline needs. `AppConfig::default()` is the built-in
/// setup used when no config file is given.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub columns: ColumnsConfig,
    pub map: MapConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub workbook: PathBuf,
    /// Sheet holding the auxiliary points. The primary records always come from the first sheet.
    pub points_sheet: String,
    /// Two-column sheet: region name, total count.
    pub counts_sheet: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from("data.xlsx"),
            points_sheet: "evs".to_string(),
            counts_sheet: "Count".to_string(),
        }
    }
}

/// Header names. They double as the labels shown in popups and tooltips.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColumnsConfig {
    pub region: String,
    pub sub_region: String,
    pub latitude: String,
    pub longitude: String,
    pub total: String,
    pub subgroup_a: String,
    pub subgroup_b: String,
    pub point_name: String,
    pub primary_required: Vec<String>,
    pub points_required: Vec<String>,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        let owned = |names: &[&str]| -> Vec<String> { names.iter().map(|s| s.to_string()).collect() };
        Self {
            region: "District".to_string(),
            sub_region: "Tehsil".to_string(),
            latitude: "Latitude".to_string(),
            longitude: "Longitude".to_string(),
            total: "Total OOSC".to_string(),
            subgroup_a: "Male".to_string(),
            subgroup_b: "Female".to_string(),
            point_name: "School Name".to_string(),
            primary_required: owned(&[
                "Tehsil", "Latitude", "Longitude", "District", "Province",
                "Total OOSC", "Male", "Female",
            ]),
            points_required: owned(&["Tehsil", "District", "School Name", "Latitude", "Longitude"]),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub zoom_start: u8,
    pub title: String,
    pub attribution_text: String,
    pub attribution_url: String,
    pub primary_layer_prefix: String,
    pub points_layer_name: String,
    pub primary_icon_color: String,
    pub points_icon_color: String,
    pub icon_glyph: String,
    pub subgroup_a_color: String,
    pub subgroup_b_color: String,
    /// Append the aggregate sheet's total to each region's layer name.
    pub show_region_totals: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom_start: 6,
            title: "Visualization of Out of School Children and Schools in Pakistan".to_string(),
            attribution_text: "Pak Alliance for Maths and Science".to_string(),
            attribution_url: "https://mathsandscience.pk/publications/the-missing-third/".to_string(),
            primary_layer_prefix: "Primary Data - ".to_string(),
            points_layer_name: "Schools Cluster".to_string(),
            primary_icon_color: "blue".to_string(),
            points_icon_color: "orange".to_string(),
            icon_glyph: "info-sign".to_string(),
            subgroup_a_color: "blue".to_string(),
            subgroup_b_color: "orange".to_string(),
            show_region_totals: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub html: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { html: PathBuf::from("out_of_school_map_with_schools.html") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Config file if one was given, built-in defaults otherwise.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.map.zoom_start > 20 {
            bail!("map.zoom_start must be between 0 and 20, got {}", self.map.zoom_start);
        }
        if self.map.primary_icon_color.eq_ignore_ascii_case(&self.map.points_icon_color) {
            bail!(
                "map.primary_icon_color and map.points_icon_color must differ (both '{}')",
                self.map.primary_icon_color
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.input.points_sheet, "evs");
        assert_eq!(config.map.zoom_start, 6);
        assert!(config.columns.primary_required.contains(&"Province".to_string()));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [map]
            zoom_start = 8
            show_region_totals = true

            [output]
            html = "site/map.html"
            "#,
        )
        .unwrap();
        assert_eq!(config.map.zoom_start, 8);
        assert!(config.map.show_region_totals);
        assert_eq!(config.map.points_layer_name, "Schools Cluster");
        assert_eq!(config.output.html, PathBuf::from("site/map.html"));
        assert_eq!(config.input.counts_sheet, "Count");
    }

    #[test]
    fn rejects_matching_icon_colors() {
        let mut config = AppConfig::default();
        config.map.points_icon_color = "Blue".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file_reports_missing_file() {
        let err = AppConfig::load_from_file(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
