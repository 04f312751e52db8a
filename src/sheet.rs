use crate::error::{BudgetError, Result};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single worksheet cell, typed once at the workbook boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: &str) -> Self {
        Cell::Text(value.to_string())
    }

    /// String form of the cell, `None` for empty cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Blank, or the lone dash the exports use as a "same as above" marker.
    pub fn is_placeholder(&self) -> bool {
        self.is_blank() || self.as_str() == Some("-")
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::Error(_) => Cell::Empty,
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Inclusive, zero-based rectangle of merged cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRegion {
    pub start: (usize, usize),
    pub end: (usize, usize),
}

/// Row-major view of one worksheet. Rows may be ragged; missing cells read
/// as [`Cell::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    pub rows: Vec<Vec<Cell>>,
    pub merges: Vec<MergedRegion>,
}

impl SheetGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            rows,
            merges: Vec::new(),
        }
    }

    pub fn with_merges(mut self, merges: Vec<MergedRegion>) -> Self {
        self.merges = merges;
        self
    }

    pub fn get(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    fn set(&mut self, row: usize, col: usize, value: Cell) {
        if row >= self.rows.len() {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if col >= cells.len() {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = value;
    }

    /// Copies each merged region's anchor value into every cell it covers and
    /// forgets the merge list. Must run before header detection so that
    /// forward fills do not see blanks that are really merged labels.
    pub fn unmerge(&mut self) {
        let merges = std::mem::take(&mut self.merges);
        for region in &merges {
            let anchor = self.get(region.start.0, region.start.1).clone();
            for row in region.start.0..=region.end.0 {
                for col in region.start.1..=region.end.1 {
                    self.set(row, col, anchor.clone());
                }
            }
        }
        if !merges.is_empty() {
            debug!("Unmerged {} merged regions", merges.len());
        }
    }
}

fn grid_from_range(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((end_row, end_col)) = range.end() else {
        return Vec::new();
    };

    (0..=end_row)
        .map(|row| {
            (0..=end_col)
                .map(|col| range.get_value((row, col)).map(Cell::from).unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Reads the first worksheet of a workbook, applying merged regions when the
/// format exposes them (xlsx).
pub fn read_first_sheet<P: AsRef<Path>>(path: P) -> Result<SheetGrid> {
    let mut workbook = open_workbook_auto(path.as_ref())?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(BudgetError::EmptySheet)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(BudgetError::EmptySheet)??;

    let merges = match &mut workbook {
        Sheets::Xlsx(xlsx) => {
            xlsx.load_merged_regions()?;
            xlsx.merged_regions_by_sheet(&sheet_name)
                .into_iter()
                .map(|(_, _, dims)| MergedRegion {
                    start: (dims.start.0 as usize, dims.start.1 as usize),
                    end: (dims.end.0 as usize, dims.end.1 as usize),
                })
                .collect()
        }
        _ => Vec::new(),
    };

    let mut grid = SheetGrid::new(grid_from_range(&range)).with_merges(merges);
    info!(
        "Read sheet '{}' from {}: {} rows, {} merged regions",
        sheet_name,
        path.as_ref().display(),
        grid.rows.len(),
        grid.merges.len()
    );
    grid.unmerge();

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmerge_fills_every_covered_cell() {
        let mut grid = SheetGrid::new(vec![
            vec![Cell::text("Unidade: Saúde"), Cell::Empty, Cell::Empty],
            vec![Cell::Empty, Cell::Number(5.0)],
        ])
        .with_merges(vec![MergedRegion {
            start: (0, 0),
            end: (1, 2),
        }]);

        grid.unmerge();

        for row in 0..=1 {
            for col in 0..=2 {
                assert_eq!(grid.get(row, col), &Cell::text("Unidade: Saúde"));
            }
        }
        assert!(grid.merges.is_empty());
    }

    #[test]
    fn test_get_out_of_bounds_is_empty() {
        let grid = SheetGrid::new(vec![vec![Cell::Number(1.0)]]);
        assert_eq!(grid.get(0, 5), &Cell::Empty);
        assert_eq!(grid.get(9, 0), &Cell::Empty);
    }

    #[test]
    fn test_cell_text_forms() {
        assert_eq!(Cell::Number(1500.0).as_text().as_deref(), Some("1500"));
        assert_eq!(Cell::Number(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(Cell::Empty.as_text(), None);
        assert!(Cell::text("-").is_placeholder());
        assert!(Cell::text("").is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn test_cell_from_calamine_data() {
        assert_eq!(Cell::from(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(Cell::from(&Data::String("x".into())), Cell::text("x"));
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
    }
}
