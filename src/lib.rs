//! # Municipal Budget Projection
//!
//! A library for turning municipal expense ("Despesas") and revenue
//! ("Receitas") spreadsheet exports into typed ledger rows, and for projecting
//! year-end budget execution from weighted historical proportions.
//!
//! ## Core Concepts
//!
//! - **Extraction**: Merged, irregular worksheets are unmerged, their columns
//!   located by header text and every monetary cell normalized to integers
//! - **Category Tables**: Raw ledger codes map many-to-one onto canonical
//!   categories, falling back to the raw code
//! - **History**: Ledger rows collapse into a dense category x year x month
//!   matrix of summed actuals
//! - **Projection**: The share of December reached by the reference month in
//!   prior years, weighted by recency, extrapolates the current actual
//! - **Dashboard**: Current-period groupings plus per-category and pooled
//!   projections with an adequacy verdict
//!
//! ## Example
//!
//! ```rust,ignore
//! use municipal_budget_projection::*;
//!
//! let processor = BudgetProcessor::new(DashboardConfig::default())?;
//! let rows = processor.process_workbook("despesas_junho.xlsx", 6, 2024, TableKind::Expense)?;
//! let (expenses, _) = LedgerRow::partition(rows);
//!
//! let period = ReportingPeriod::new(6, 2024)?;
//! let dashboard = processor.build_dashboard(&expenses, &[], period);
//! for row in dashboard.expense_projection.visible_rows() {
//!     println!("{}: {:.0} ({:?})", row.category, row.projection.year_end_projection, row.projection.status);
//! }
//! ```

pub mod categories;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod history;
pub mod normalize;
pub mod projection;
pub mod schema;
pub mod sheet;
pub mod utils;

pub use categories::{
    CategoryTable, CategoryTables, Dimension, PrefixEntry, PrefixTable, OUTROS,
    UNCLASSIFIED_SOURCE,
};
pub use config::DashboardConfig;
pub use dashboard::{
    AggregateRow, Dashboard, DashboardBuilder, ExecutionSummary, Grouping, ProjectionRow,
    ProjectionTable,
};
pub use error::{BudgetError, Result};
pub use extract::{extract_table, TableExtractor, EXPENSE_COLUMNS, REVENUE_COLUMNS};
pub use history::{build_expense_history, build_history, build_revenue_history, HistoricalPoint};
pub use normalize::{expand_resource_code, normalize_number, normalize_str, trim_label};
pub use projection::{
    AdequacyBand, ExecutionStatus, ProjectionEngine, ProjectionResult, SkipRule, WeightTable,
    MAX_WEIGHTED_RANKS,
};
pub use schema::*;
pub use sheet::{read_first_sheet, Cell, MergedRegion, SheetGrid};
pub use utils::*;

use log::{debug, info};
use std::path::Path;

/// Entry point tying extraction and dashboard assembly to one validated
/// configuration.
pub struct BudgetProcessor {
    config: DashboardConfig,
}

impl BudgetProcessor {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn extract(
        &self,
        grid: &SheetGrid,
        month: u32,
        year: i32,
        kind: TableKind,
    ) -> Result<Vec<LedgerRow>> {
        TableExtractor::new(&self.config.categories.resource_prefixes)
            .extract(grid, month, year, kind)
    }

    pub fn process_workbook<P: AsRef<Path>>(
        &self,
        path: P,
        month: u32,
        year: i32,
        kind: TableKind,
    ) -> Result<Vec<LedgerRow>> {
        info!(
            "Processing {} workbook {} for {:02}/{}",
            kind.label(),
            path.as_ref().display(),
            month,
            year
        );
        let grid = read_first_sheet(path)?;
        debug!("Workbook grid has {} rows", grid.rows.len());
        self.extract(&grid, month, year, kind)
    }

    pub fn build_dashboard(
        &self,
        expenses: &[ExpenseRecord],
        revenues: &[RevenueRecord],
        period: ReportingPeriod,
    ) -> Dashboard {
        DashboardBuilder::new(&self.config).build(expenses, revenues, period)
    }
}

/// Reads and extracts one workbook with the default configuration.
pub fn process_workbook<P: AsRef<Path>>(
    path: P,
    month: u32,
    year: i32,
    kind: TableKind,
) -> Result<Vec<LedgerRow>> {
    BudgetProcessor::new(DashboardConfig::default())?.process_workbook(path, month, year, kind)
}
