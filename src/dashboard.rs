//! Current-period groupings and per-category projections for the dashboard.

use crate::categories::{Dimension, OUTROS, UNCLASSIFIED_SOURCE};
use crate::config::DashboardConfig;
use crate::history::{build_expense_history, build_revenue_history, HistoricalPoint};
use crate::projection::{ExecutionStatus, ProjectionEngine, ProjectionResult};
use crate::schema::{Amounts, ExpenseRecord, LedgerEntry, ReportingPeriod, RevenueRecord};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupOrder {
    FirstSeen,
    BudgetedDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub category: String,
    pub totals: Amounts,
}

/// Rows of one grouping plus their grand total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grouping {
    pub rows: Vec<AggregateRow>,
    pub total: Amounts,
}

impl Grouping {
    pub fn get(&self, category: &str) -> Option<&AggregateRow> {
        self.rows.iter().find(|row| row.category == category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub category: String,
    pub totals: Amounts,
    pub projection: ProjectionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub projected: f64,
    pub balance: i64,
    pub executed_percent: f64,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionTable {
    pub rows: Vec<ProjectionRow>,
    pub summary: ExecutionSummary,
    /// Pooled-history projection of the grand totals.
    pub total: ProjectionResult,
}

impl ProjectionTable {
    /// Rows worth rendering: categories with no usable projection are hidden.
    pub fn visible_rows(&self) -> impl Iterator<Item = &ProjectionRow> {
        self.rows
            .iter()
            .filter(|row| row.projection.year_end_projection != 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub period: ReportingPeriod,
    pub expenses_by_unit: Grouping,
    pub expenses_by_source: Grouping,
    pub expenses_by_element: Grouping,
    pub revenues_by_description: Grouping,
    pub revenues_by_source: Grouping,
    pub expense_projection: ProjectionTable,
    pub revenue_projection: ProjectionTable,
}

pub struct DashboardBuilder<'a> {
    config: &'a DashboardConfig,
}

impl<'a> DashboardBuilder<'a> {
    pub fn new(config: &'a DashboardConfig) -> Self {
        Self { config }
    }

    /// Assembles the dashboard for `period`. Both ledgers may span many
    /// years: rows of the selected period feed the groupings, earlier years
    /// feed the projections.
    pub fn build(
        &self,
        expenses: &[ExpenseRecord],
        revenues: &[RevenueRecord],
        period: ReportingPeriod,
    ) -> Dashboard {
        let tables = &self.config.categories;

        let current_expenses: Vec<&ExpenseRecord> =
            expenses.iter().filter(|r| in_period(*r, period)).collect();
        let current_revenues: Vec<&RevenueRecord> =
            revenues.iter().filter(|r| in_period(*r, period)).collect();

        debug!(
            "Dashboard {:02}/{}: {} current expense rows, {} current revenue rows",
            period.month,
            period.year,
            current_expenses.len(),
            current_revenues.len()
        );

        let expenses_by_unit = group(&current_expenses, GroupOrder::BudgetedDesc, |r| {
            tables.display_category(Dimension::BudgetUnit, r.budget_unit.as_deref())
        });
        let expenses_by_source = group(&current_expenses, GroupOrder::FirstSeen, |r| {
            tables.display_category(Dimension::ResourceSource, r.resource_source.as_deref())
        });
        let expenses_by_element = group(&current_expenses, GroupOrder::FirstSeen, |r| {
            tables.display_category(Dimension::ExpenseElement, r.expense_element.as_deref())
        });
        let revenues_by_description = group(&current_revenues, GroupOrder::BudgetedDesc, |r| {
            tables.display_category(Dimension::RevenueDescription, r.description.as_deref())
        });
        let revenues_by_source = group(&current_revenues, GroupOrder::BudgetedDesc, |r| {
            tables
                .categorize_revenue_source(revenue_source_code(r))
                .to_string()
        });

        let expense_history = build_expense_history(expenses, period.year, tables);
        let expense_projection = self.project_expenses(
            &current_expenses,
            &expenses_by_element,
            &expense_history,
            period,
        );

        let revenue_history = build_revenue_history(revenues, period.year, tables);
        let revenue_projection = self.project_revenues(
            &current_revenues,
            &revenues_by_source,
            &revenue_history,
            period,
        );

        info!(
            "Assembled dashboard for {:02}/{}: {} expense and {} revenue projection rows",
            period.month,
            period.year,
            expense_projection.rows.len(),
            revenue_projection.rows.len()
        );

        Dashboard {
            period,
            expenses_by_unit,
            expenses_by_source,
            expenses_by_element,
            revenues_by_description,
            revenues_by_source,
            expense_projection,
            revenue_projection,
        }
    }

    fn project_expenses(
        &self,
        current: &[&ExpenseRecord],
        by_element: &Grouping,
        history: &[HistoricalPoint],
        period: ReportingPeriod,
    ) -> ProjectionTable {
        let table = &self.config.categories.expense_element;
        let engine = self.config.expense_engine();

        // Display categories of unmapped codes are the raw codes, but their
        // history lives under the catch-all bucket.
        let mut history_keys: HashMap<String, &str> = HashMap::new();
        for record in current {
            let code = record.expense_element.as_deref();
            let display = self
                .config
                .categories
                .display_category(Dimension::ExpenseElement, code);
            let key = code.map_or(OUTROS, |c| table.category_or(c, OUTROS));
            history_keys.entry(display).or_insert(key);
        }

        let rows = project_rows(&engine, by_element, history, period, |category| {
            history_keys.get(category).copied().unwrap_or(OUTROS)
        });

        let projected: f64 = rows.iter().map(|r| r.projection.year_end_projection).sum();
        let balance = by_element.total.balance;
        let pooled = engine.evaluate(projected, balance as f64);

        ProjectionTable {
            summary: ExecutionSummary {
                projected,
                balance,
                executed_percent: pooled.executed_percent,
                status: pooled.status,
            },
            total: project_grand_total(&engine, by_element, history, period),
            rows,
        }
    }

    fn project_revenues(
        &self,
        current: &[&RevenueRecord],
        by_source: &Grouping,
        history: &[HistoricalPoint],
        period: ReportingPeriod,
    ) -> ProjectionTable {
        let tables = &self.config.categories;
        let engine = self.config.revenue_engine();

        let mut history_keys: HashMap<String, &str> = HashMap::new();
        for record in current {
            let code = revenue_source_code(record);
            let display = tables.categorize_revenue_source(code).to_string();
            history_keys
                .entry(display)
                .or_insert(tables.resource_source.category_or(code, OUTROS));
        }

        let rows = project_rows(&engine, by_source, history, period, |category| {
            history_keys.get(category).copied().unwrap_or(OUTROS)
        });

        let projected: f64 = rows.iter().map(|r| r.projection.year_end_projection).sum();
        let executed_percent = if rows.is_empty() {
            0.0
        } else {
            rows.iter()
                .map(|r| r.projection.executed_percent)
                .sum::<f64>()
                / rows.len() as f64
        };

        ProjectionTable {
            summary: ExecutionSummary {
                projected,
                balance: by_source.total.balance,
                executed_percent,
                status: engine.band.classify(executed_percent),
            },
            total: project_grand_total(&engine, by_source, history, period),
            rows,
        }
    }
}

fn revenue_source_code(record: &RevenueRecord) -> &str {
    record
        .resource_source
        .as_deref()
        .unwrap_or(UNCLASSIFIED_SOURCE)
}

fn in_period<R: LedgerEntry>(record: &R, period: ReportingPeriod) -> bool {
    record.month() == period.month && record.year() == period.year
}

fn group<R, F>(records: &[&R], order: GroupOrder, category_of: F) -> Grouping
where
    R: LedgerEntry,
    F: Fn(&R) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<AggregateRow> = Vec::new();
    let mut total = Amounts::default();

    for record in records {
        let amounts = record.amounts();
        total += amounts;

        let category = category_of(record);
        match index.get(&category) {
            Some(&idx) => rows[idx].totals += amounts,
            None => {
                index.insert(category.clone(), rows.len());
                rows.push(AggregateRow {
                    category,
                    totals: amounts,
                });
            }
        }
    }

    if order == GroupOrder::BudgetedDesc {
        rows.sort_by(|a, b| b.totals.budgeted.cmp(&a.totals.budgeted));
    }

    Grouping { rows, total }
}

fn project_rows<'k, K>(
    engine: &ProjectionEngine,
    grouping: &Grouping,
    history: &[HistoricalPoint],
    period: ReportingPeriod,
    history_key: K,
) -> Vec<ProjectionRow>
where
    K: Fn(&str) -> &'k str,
{
    grouping
        .rows
        .iter()
        .map(|row| ProjectionRow {
            category: row.category.clone(),
            totals: row.totals,
            projection: engine.project_category(
                history,
                history_key(&row.category),
                period.month,
                row.totals.actual as f64,
                row.totals.balance as f64,
                period.year,
            ),
        })
        .collect()
}

fn project_grand_total(
    engine: &ProjectionEngine,
    grouping: &Grouping,
    history: &[HistoricalPoint],
    period: ReportingPeriod,
) -> ProjectionResult {
    engine.project_total(
        history,
        period.month,
        grouping.total.actual as f64,
        grouping.total.balance as f64,
        period.year,
    )
}
