use calamine::Data;
use geo::Point;

/// One worksheet: header row plus raw data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, col); short rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Data {
        static EMPTY: Data = Data::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryRecord {
    pub region: String,
    pub sub_region: Option<String>,
    pub location: Point<f64>,
    pub total: f64,
    pub subgroup_a: f64,
    pub subgroup_b: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub sub_region: String,
    pub region: String,
    pub name: String,
    pub location: Point<f64>,
}

/// Region name -> total count, in sheet order.
pub type RegionTotals = Vec<(String, f64)>;

/// The three sheets of one workbook, validated.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub primary: Table,
    pub points: Table,
    pub counts: Table,
}
