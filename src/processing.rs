use crate::config::{AppConfig, ColumnsConfig};
use crate::data::{self, cell_number, cell_text};
use crate::error::DataResult;
use crate::types::{PointRecord, PrimaryRecord, RegionTotals, Table, Workbook};
use geo::{Centroid, MultiPoint, Point};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Primary records that share a region, in sheet order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCluster {
    pub region: String,
    pub records: Vec<PrimaryRecord>,
}

/// Everything the renderer needs, already filtered and grouped.
#[derive(Debug, Clone)]
pub struct MapLayers {
    pub center: Point<f64>,
    pub regions: Vec<RegionCluster>,
    pub points: Vec<PointRecord>,
    pub region_totals: RegionTotals,
}

pub fn process_data(config: &AppConfig, workbook: &Workbook) -> DataResult<MapLayers> {
    let columns = &config.columns;

    let primary = located_rows(&workbook.primary, columns)?;
    let records = primary_records(&primary, columns)?;
    let points = located_rows(&workbook.points, columns)?;
    let points = point_records(&points, columns)?;
    let region_totals = region_totals(&workbook.counts);
    debug!("Aggregate sheet lists {} regions", region_totals.len());

    let center = map_center(&records).unwrap_or_else(|| {
        warn!("No primary rows have coordinates; centering the map on (0, 0)");
        Point::new(0.0, 0.0)
    });

    let regions = cluster_by_region(records);
    info!(
        "Prepared {} region clusters and {} points",
        regions.len(),
        points.len()
    );

    Ok(MapLayers { center, regions, points, region_totals })
}

fn located_rows(table: &Table, columns: &ColumnsConfig) -> DataResult<Table> {
    let lat = data::column(table, &columns.latitude)?;
    let lon = data::column(table, &columns.longitude)?;
    let filtered = drop_missing_coordinates(table, lat, lon);
    debug!(
        "Sheet '{}': kept {} of {} rows with coordinates",
        table.name,
        filtered.len(),
        table.len()
    );
    Ok(filtered)
}

/// Copy of `table` keeping only rows whose latitude and longitude are both finite numbers.
pub fn drop_missing_coordinates(table: &Table, lat: usize, lon: usize) -> Table {
    let rows = table
        .rows
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            cell_number(table.cell(*i, lat)).is_some() && cell_number(table.cell(*i, lon)).is_some()
        })
        .map(|(_, row)| row.clone())
        .collect();

    Table {
        name: table.name.clone(),
        headers: table.headers.clone(),
        rows,
    }
}

/// Typed primary records from a coordinate-filtered table.
pub fn primary_records(table: &Table, columns: &ColumnsConfig) -> DataResult<Vec<PrimaryRecord>> {
    let region = data::column(table, &columns.region)?;
    let sub_region = data::column(table, &columns.sub_region)?;
    let lat = data::column(table, &columns.latitude)?;
    let lon = data::column(table, &columns.longitude)?;
    let total = data::column(table, &columns.total)?;
    let a = data::column(table, &columns.subgroup_a)?;
    let b = data::column(table, &columns.subgroup_b)?;

    let count = |row: usize, col: usize| cell_number(table.cell(row, col)).unwrap_or(0.0);

    Ok((0..table.len())
        .filter_map(|row| {
            let location = Point::new(
                cell_number(table.cell(row, lon))?,
                cell_number(table.cell(row, lat))?,
            );
            Some(PrimaryRecord {
                region: cell_text(table.cell(row, region)).unwrap_or_default(),
                sub_region: cell_text(table.cell(row, sub_region)),
                location,
                total: count(row, total),
                subgroup_a: count(row, a),
                subgroup_b: count(row, b),
            })
        })
        .collect())
}

pub fn point_records(table: &Table, columns: &ColumnsConfig) -> DataResult<Vec<PointRecord>> {
    let sub_region = data::column(table, &columns.sub_region)?;
    let region = data::column(table, &columns.region)?;
    let name = data::column(table, &columns.point_name)?;
    let lat = data::column(table, &columns.latitude)?;
    let lon = data::column(table, &columns.longitude)?;

    let text = |row: usize, col: usize| cell_text(table.cell(row, col)).unwrap_or_default();

    Ok((0..table.len())
        .filter_map(|row| {
            let location = Point::new(
                cell_number(table.cell(row, lon))?,
                cell_number(table.cell(row, lat))?,
            );
            Some(PointRecord {
                sub_region: text(row, sub_region),
                region: text(row, region),
                name: text(row, name),
                location,
            })
        })
        .collect())
}

/// Group records by region. Clusters appear in the order their region is first seen.
pub fn cluster_by_region(records: Vec<PrimaryRecord>) -> Vec<RegionCluster> {
    let mut clusters: Vec<RegionCluster> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let slot = *index.entry(record.region.clone()).or_insert_with(|| {
            clusters.push(RegionCluster {
                region: record.region.clone(),
                records: Vec::new(),
            });
            clusters.len() - 1
        });
        clusters[slot].records.push(record);
    }

    clusters
}

/// Mean latitude and longitude of the records, `None` when there are none.
pub fn map_center(records: &[PrimaryRecord]) -> Option<Point<f64>> {
    let points: MultiPoint<f64> = records.iter().map(|r| r.location).collect();
    points.centroid()
}

/// Region -> total from the first two columns; header row already stripped.
pub fn region_totals(table: &Table) -> RegionTotals {
    (0..table.len())
        .filter_map(|row| {
            let region = cell_text(table.cell(row, 0))?;
            let total = cell_number(table.cell(row, 1))?;
            Some((region, total))
        })
        .collect()
}
