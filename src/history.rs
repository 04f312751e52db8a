use crate::categories::{CategoryTable, CategoryTables, OUTROS, UNCLASSIFIED_SOURCE};
use crate::schema::{ExpenseRecord, LedgerEntry, RevenueRecord};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One cell of the dense category x year x month matrix of summed actuals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub category: String,
    pub year: i32,
    pub month: u32,
    pub actual: i64,
}

/// Collapses ledger rows into a dense history.
///
/// Rows from years after `cutoff_year` are dropped. Each row's history code
/// is mapped through `table`; unmapped or missing codes land in [`OUTROS`].
/// Every (category, year) pair that has at least one row gets all twelve
/// months, zero-filled where nothing was recorded. Output is ordered by
/// category, year and month.
pub fn build_history<R: LedgerEntry>(
    records: &[R],
    cutoff_year: i32,
    table: &CategoryTable,
) -> Vec<HistoricalPoint> {
    aggregate(records, cutoff_year, |record| {
        record
            .history_code()
            .map_or(OUTROS, |code| table.category_or(code, OUTROS))
            .to_string()
    })
}

/// Expense history keyed on the expense-element category.
pub fn build_expense_history(
    records: &[ExpenseRecord],
    cutoff_year: i32,
    tables: &CategoryTables,
) -> Vec<HistoricalPoint> {
    build_history(records, cutoff_year, &tables.expense_element)
}

/// Revenue history keyed on the resource-source category. Rows without a
/// source are looked up as [`UNCLASSIFIED_SOURCE`] first.
pub fn build_revenue_history(
    records: &[RevenueRecord],
    cutoff_year: i32,
    tables: &CategoryTables,
) -> Vec<HistoricalPoint> {
    aggregate(records, cutoff_year, |record| {
        let code = record.history_code().unwrap_or(UNCLASSIFIED_SOURCE);
        tables.resource_source.category_or(code, OUTROS).to_string()
    })
}

fn aggregate<R, F>(records: &[R], cutoff_year: i32, category_of: F) -> Vec<HistoricalPoint>
where
    R: LedgerEntry,
    F: Fn(&R) -> String,
{
    let mut matrix: BTreeMap<(String, i32), [i64; 12]> = BTreeMap::new();
    let mut skipped = 0usize;

    for record in records {
        if record.year() > cutoff_year {
            continue;
        }
        let month = record.month();
        if !(1..=12).contains(&month) {
            skipped += 1;
            continue;
        }

        let category = category_of(record);
        let months = matrix.entry((category, record.year())).or_insert([0; 12]);
        let slot = &mut months[(month - 1) as usize];
        *slot = slot.saturating_add(record.amounts().actual);
    }

    if skipped > 0 {
        warn!("Ignored {} ledger rows with an out-of-range month", skipped);
    }
    debug!(
        "Built history for {} category-years up to {}",
        matrix.len(),
        cutoff_year
    );

    matrix
        .into_iter()
        .flat_map(|((category, year), months)| {
            months
                .into_iter()
                .enumerate()
                .map(move |(idx, actual)| HistoricalPoint {
                    category: category.clone(),
                    year,
                    month: idx as u32 + 1,
                    actual,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn expense(year: i32, month: u32, element: Option<&str>, committed: i64) -> ExpenseRecord {
        ExpenseRecord {
            month,
            year,
            budget_unit: None,
            resource_source: Some("1500".to_string()),
            expense_element: element.map(str::to_string),
            budgeted: 0,
            balance: 0,
            committed,
            user_id: None,
        }
    }

    fn revenue(year: i32, month: u32, source: Option<&str>, collected: i64) -> RevenueRecord {
        RevenueRecord {
            month,
            year,
            description: None,
            resource_source: source.map(str::to_string),
            budgeted: 0,
            balance: 0,
            collected,
            user_id: None,
        }
    }

    #[test]
    fn test_twelve_points_per_category_year() {
        let records = vec![
            expense(2022, 3, Some("3.1.90.11"), 100),
            expense(2022, 3, Some("3.1.90.13"), 50),
            expense(2023, 12, Some("3.3.90.30"), 70),
            expense(2023, 1, Some("9.9.99.99"), 5),
        ];
        let history = build_expense_history(&records, 2024, &CategoryTables::default());

        let mut seen = HashSet::new();
        for point in &history {
            assert!(seen.insert((point.category.clone(), point.year, point.month)));
        }

        let pairs: HashSet<(String, i32)> = history
            .iter()
            .map(|p| (p.category.clone(), p.year))
            .collect();
        assert_eq!(pairs.len(), 3);
        assert_eq!(history.len(), pairs.len() * 12);
    }

    #[test]
    fn test_sums_by_month_and_zero_fills() {
        let records = vec![
            expense(2022, 3, Some("3.1.90.11"), 100),
            expense(2022, 3, Some("3.1.90.13"), 50),
        ];
        let history = build_expense_history(&records, 2022, &CategoryTables::default());

        assert_eq!(history.len(), 12);
        assert!(history.iter().all(|p| p.category == "Pessoal"));
        assert_eq!(history[2].month, 3);
        assert_eq!(history[2].actual, 150);
        assert_eq!(history[11].month, 12);
        assert_eq!(history[11].actual, 0);
    }

    #[test]
    fn test_cutoff_excludes_future_years() {
        let records = vec![
            expense(2023, 6, Some("3.1.90.11"), 10),
            expense(2024, 6, Some("3.1.90.11"), 20),
            expense(2025, 6, Some("3.1.90.11"), 30),
        ];
        let history = build_expense_history(&records, 2024, &CategoryTables::default());
        assert!(history.iter().all(|p| p.year <= 2024));
        assert_eq!(history.len(), 24);
    }

    #[test]
    fn test_unmapped_codes_fall_into_outros() {
        let mut table = CategoryTable::default();
        table.insert("A", "Mapped");
        let records = vec![
            expense(2023, 1, Some("A"), 1),
            expense(2023, 1, Some("B"), 2),
            expense(2023, 1, None, 4),
        ];
        let history = build_history(&records, 2023, &table);

        let outros: Vec<_> = history.iter().filter(|p| p.category == OUTROS).collect();
        assert_eq!(outros.len(), 12);
        assert_eq!(outros[0].actual, 6);
        assert!(history.iter().any(|p| p.category == "Mapped"));
    }

    #[test]
    fn test_revenue_without_source_uses_unclassified_lookup() {
        let mut tables = CategoryTables::empty();
        tables
            .resource_source
            .insert(UNCLASSIFIED_SOURCE, "Sem Fonte");
        tables.resource_source.insert("1500", "Recursos Livres");

        let records = vec![
            revenue(2023, 2, None, 30),
            revenue(2023, 2, Some("1500"), 10),
            revenue(2023, 2, Some("1999"), 1),
        ];
        let history = build_revenue_history(&records, 2023, &tables);

        let categories: HashSet<&str> = history.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(
            categories,
            HashSet::from(["Sem Fonte", "Recursos Livres", OUTROS])
        );
    }

    #[test]
    fn test_oversized_actuals_saturate() {
        let records = vec![
            expense(2023, 6, Some("3.1.90.11"), i64::MAX),
            expense(2023, 6, Some("3.1.90.11"), i64::MAX),
        ];
        let history = build_expense_history(&records, 2023, &CategoryTables::default());
        assert_eq!(history[5].actual, i64::MAX);
    }

    #[test]
    fn test_out_of_range_month_ignored() {
        let records = vec![expense(2023, 13, Some("3.1.90.11"), 10)];
        assert!(build_expense_history(&records, 2023, &CategoryTables::default()).is_empty());
    }
}
