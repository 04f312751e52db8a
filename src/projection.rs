//! Year-end projection from weighted historical execution ratios.
//!
//! For a reference month, each prior year contributes the fraction of its
//! December total that had already been reached by that month. A rank-based
//! weight table averages those fractions, and dividing the current partial
//! actual by the average extrapolates the full year. Projections are
//! advisory: nothing in here returns an error, and every degenerate input
//! collapses to a zero result.

use crate::error::{BudgetError, Result};
use crate::history::HistoricalPoint;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DECEMBER: usize = 11;

/// Years older than this many ranks never contribute.
pub const MAX_WEIGHTED_RANKS: usize = 5;

/// Weight per year rank, rank 0 being the most recent prior year. Ranks
/// beyond the table weigh 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(Vec<f64>);

impl WeightTable {
    pub const EXPENSE: [f64; 5] = [0.40, 0.25, 0.20, 0.10, 0.05];
    pub const REVENUE: [f64; 3] = [0.5, 0.3, 0.2];

    pub fn new(weights: Vec<f64>) -> Result<Self> {
        let table = Self(weights);
        table.validate()?;
        Ok(table)
    }

    pub fn expense_default() -> Self {
        Self(Self::EXPENSE.to_vec())
    }

    pub fn revenue_default() -> Self {
        Self(Self::REVENUE.to_vec())
    }

    pub fn weight(&self, rank: usize) -> f64 {
        self.0.get(rank).copied().unwrap_or(0.0)
    }

    pub fn ranks(&self) -> usize {
        self.0.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(BudgetError::InvalidWeightTable(
                "weight table is empty".to_string(),
            ));
        }
        if self.0.len() > MAX_WEIGHTED_RANKS {
            return Err(BudgetError::InvalidWeightTable(format!(
                "{} ranks given, at most {} are weighted",
                self.0.len(),
                MAX_WEIGHTED_RANKS
            )));
        }
        if let Some((rank, w)) = self
            .0
            .iter()
            .enumerate()
            .find(|(_, w)| !(w.is_finite() && **w > 0.0 && **w <= 1.0))
        {
            return Err(BudgetError::InvalidWeightTable(format!(
                "weight {} at rank {} is outside (0, 1]",
                w, rank
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Adequate,
    Below,
    Above,
}

/// Inclusive band of executed percentages considered on track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdequacyBand {
    pub lower: f64,
    pub upper: f64,
}

impl Default for AdequacyBand {
    fn default() -> Self {
        Self {
            lower: 95.0,
            upper: 105.0,
        }
    }
}

impl AdequacyBand {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        let band = Self { lower, upper };
        band.validate()?;
        Ok(band)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lower.is_finite() && self.upper.is_finite() && self.lower <= self.upper) {
            return Err(BudgetError::InvalidAdequacyBand {
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }

    pub fn classify(&self, executed_percent: f64) -> ExecutionStatus {
        if executed_percent < self.lower {
            ExecutionStatus::Below
        } else if executed_percent > self.upper {
            ExecutionStatus::Above
        } else {
            ExecutionStatus::Adequate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub year_end_projection: f64,
    pub executed_percent: f64,
    pub status: ExecutionStatus,
}

impl ProjectionResult {
    pub fn zero() -> Self {
        Self {
            year_end_projection: 0.0,
            executed_percent: 0.0,
            status: ExecutionStatus::Below,
        }
    }
}

/// Which historical years may supply a ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipRule {
    /// Reference-month and December actuals must both be positive.
    RequireBoth,
    /// Only December must be positive; a zero reference month counts as 0.
    RequireDecember,
}

impl SkipRule {
    fn admits(&self, reference: i64, december: i64) -> bool {
        match self {
            SkipRule::RequireBoth => reference > 0 && december > 0,
            SkipRule::RequireDecember => december > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionEngine {
    pub weights: WeightTable,
    pub band: AdequacyBand,
    pub rule: SkipRule,
}

impl ProjectionEngine {
    pub fn new(weights: WeightTable, band: AdequacyBand, rule: SkipRule) -> Self {
        Self {
            weights,
            band,
            rule,
        }
    }

    /// Five-rank expense schedule; years need both actuals positive.
    pub fn expense() -> Self {
        Self::new(
            WeightTable::expense_default(),
            AdequacyBand::default(),
            SkipRule::RequireBoth,
        )
    }

    /// Three-rank revenue schedule; only December has to be positive.
    pub fn revenue() -> Self {
        Self::new(
            WeightTable::revenue_default(),
            AdequacyBand::default(),
            SkipRule::RequireDecember,
        )
    }

    /// Weighted mean of `reference_month / December` over the years strictly
    /// before `selected_year`, or 0 when no year qualifies.
    ///
    /// Ranks are assigned before the skip rule runs, so a disqualified year
    /// still occupies its rank.
    pub fn historical_ratio(
        &self,
        history: &[HistoricalPoint],
        reference_month: u32,
        selected_year: i32,
    ) -> f64 {
        if !(1..=12).contains(&reference_month) {
            return 0.0;
        }
        let reference_idx = (reference_month - 1) as usize;

        let series = monthly_series(history);
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;

        for (rank, (year, months)) in series.range(..selected_year).rev().enumerate() {
            let weight = self.weights.weight(rank);
            if weight <= 0.0 {
                break;
            }

            match (months[reference_idx], months[DECEMBER]) {
                (Some(reference), Some(december)) if self.rule.admits(reference, december) => {
                    let ratio = reference as f64 / december as f64;
                    debug!(
                        "Year {} rank {}: ratio {:.4} weight {:.2}",
                        year, rank, ratio, weight
                    );
                    weighted_sum += ratio * weight;
                    weight_sum += weight;
                }
                _ => debug!("Year {} rank {}: skipped", year, rank),
            }
        }

        if weight_sum > 0.0 {
            weighted_sum / weight_sum
        } else {
            0.0
        }
    }

    /// Projects one series. Points from several categories are pooled by
    /// year and month.
    pub fn project(
        &self,
        history: &[HistoricalPoint],
        reference_month: u32,
        current_actual: f64,
        current_balance: f64,
        selected_year: i32,
    ) -> ProjectionResult {
        let ratio = self.historical_ratio(history, reference_month, selected_year);
        let projection = if ratio > 0.0 {
            current_actual / ratio
        } else {
            0.0
        };
        self.evaluate(projection, current_balance)
    }

    /// Projects a single category out of a mixed history.
    pub fn project_category(
        &self,
        history: &[HistoricalPoint],
        category: &str,
        reference_month: u32,
        current_actual: f64,
        current_balance: f64,
        selected_year: i32,
    ) -> ProjectionResult {
        let points: Vec<HistoricalPoint> = history
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect();
        self.project(
            &points,
            reference_month,
            current_actual,
            current_balance,
            selected_year,
        )
    }

    /// Portfolio projection: every category pooled by month first. This is
    /// not the sum of per-category projections.
    pub fn project_total(
        &self,
        history: &[HistoricalPoint],
        reference_month: u32,
        total_actual: f64,
        total_balance: f64,
        selected_year: i32,
    ) -> ProjectionResult {
        self.project(
            history,
            reference_month,
            total_actual,
            total_balance,
            selected_year,
        )
    }

    /// Executed percentage and status for an already computed projection.
    /// A zero balance gives 0%. Under [`SkipRule::RequireDecember`] a
    /// negative balance does too, as revenue sources report it.
    pub fn evaluate(&self, projection: f64, balance: f64) -> ProjectionResult {
        if !projection.is_finite() {
            return ProjectionResult::zero();
        }
        let no_balance = match self.rule {
            SkipRule::RequireBoth => balance == 0.0,
            SkipRule::RequireDecember => balance <= 0.0,
        };
        let percent = if no_balance {
            0.0
        } else {
            projection / balance * 100.0
        };
        let executed_percent = if percent.is_finite() { percent } else { 0.0 };

        ProjectionResult {
            year_end_projection: projection,
            executed_percent,
            status: self.band.classify(executed_percent),
        }
    }
}

/// Year -> monthly actuals, summed across points. `None` marks a month no
/// point covered, which is distinct from a recorded zero.
fn monthly_series(history: &[HistoricalPoint]) -> BTreeMap<i32, [Option<i64>; 12]> {
    let mut series: BTreeMap<i32, [Option<i64>; 12]> = BTreeMap::new();
    for point in history {
        if !(1..=12).contains(&point.month) {
            continue;
        }
        let slot = &mut series.entry(point.year).or_insert([None; 12])[(point.month - 1) as usize];
        *slot = Some(slot.unwrap_or(0).saturating_add(point.actual));
    }
    series
}
