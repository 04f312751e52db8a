//! Turns an uploaded worksheet into typed ledger rows.
//!
//! Expense and revenue exports have unrelated layouts, so each gets its own
//! pipeline. Both locate their columns by header text and stamp every row
//! with the caller-supplied reporting period.

use crate::categories::{CategoryTables, PrefixTable};
use crate::error::{BudgetError, Result};
use crate::normalize::{expand_resource_code, normalize_number, trim_label};
use crate::schema::{ExpenseRecord, LedgerRow, ReportingPeriod, RevenueRecord, TableKind};
use crate::sheet::{Cell, SheetGrid};
use log::{debug, info};

/// Expense header tokens, matched case-sensitively, in output order:
/// unit, source, element, budgeted, balance, committed.
pub const EXPENSE_COLUMNS: [&str; 6] = [
    "Unidade Orçamentária",
    "Fonte Recurso",
    "Elemento Despesa",
    "Orçado",
    "Saldo",
    "Empenhado Até",
];

/// Revenue header tokens, matched case- and accent-insensitively, in output
/// order: description, source, budgeted, balance, collected.
pub const REVENUE_COLUMNS: [&str; 5] = [
    "descricao",
    "fonte recurso",
    "orçado",
    "saldo",
    "até o período",
];

const MIN_RECOGNIZED_TOKENS: usize = 3;

// Legacy exports put the header under a merged title row, with the
// resource source at a fixed column.
const LEGACY_HEADER_ROW: usize = 1;
const LEGACY_SOURCE_COL: usize = 7;

const ACTIVITY_COL: usize = 4;
const ACTIVITY_LABEL: &str = "Atividade/Projeto";
const UNIT_COL: usize = 2;
const UNIT_LABEL: &str = "Unidade Orçamentária";
const UNIT_GROUP_PREFIX: &str = "Unidade";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    Exact,
    Folded,
}

pub struct TableExtractor<'a> {
    resource_prefixes: &'a PrefixTable,
}

impl<'a> TableExtractor<'a> {
    pub fn new(resource_prefixes: &'a PrefixTable) -> Self {
        Self { resource_prefixes }
    }

    pub fn extract(
        &self,
        grid: &SheetGrid,
        month: u32,
        year: i32,
        kind: TableKind,
    ) -> Result<Vec<LedgerRow>> {
        let period = ReportingPeriod::new(month, year)?;

        let mut grid = grid.clone();
        grid.unmerge();

        if grid.rows.iter().all(|row| row.iter().all(Cell::is_blank)) {
            return Err(BudgetError::EmptySheet);
        }

        let rows = match kind {
            TableKind::Expense => extract_expenses(grid.rows, period)?,
            TableKind::Revenue => self.extract_revenues(grid.rows, period)?,
        };

        info!(
            "Extracted {} {} rows for {:02}/{}",
            rows.len(),
            kind.label(),
            period.month,
            period.year
        );
        Ok(rows)
    }

    fn extract_revenues(
        &self,
        mut rows: Vec<Vec<Cell>>,
        period: ReportingPeriod,
    ) -> Result<Vec<LedgerRow>> {
        if rows
            .first()
            .is_some_and(|row| row.iter().all(Cell::is_blank))
        {
            rows.remove(0);
        }

        let header = rows
            .first()
            .ok_or_else(|| BudgetError::HeaderNotFound(TableKind::Revenue.label().to_string()))?;
        let cols = locate_columns(header, &REVENUE_COLUMNS, MatchMode::Folded, TableKind::Revenue)?;

        let records = rows
            .iter()
            .skip(1)
            .filter(|row| !row.iter().all(Cell::is_blank))
            .map(|row| {
                let cell = |i: usize| row.get(cols[i]).cloned().unwrap_or_default();
                LedgerRow::Revenue(RevenueRecord {
                    month: period.month,
                    year: period.year,
                    description: text_of(&cell(0)).map(|s| trim_label(&s)),
                    resource_source: text_of(&cell(1))
                        .map(|s| expand_resource_code(&s, self.resource_prefixes)),
                    budgeted: normalize_number(&cell(2)),
                    balance: normalize_number(&cell(3)),
                    collected: normalize_number(&cell(4)),
                    user_id: None,
                })
            })
            .collect();

        Ok(records)
    }
}

/// Extracts with the built-in resource prefix table.
pub fn extract_table(
    grid: &SheetGrid,
    month: u32,
    year: i32,
    kind: TableKind,
) -> Result<Vec<LedgerRow>> {
    let tables = CategoryTables::default();
    TableExtractor::new(&tables.resource_prefixes).extract(grid, month, year, kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpenseLayout {
    Clean(usize),
    Legacy,
}

fn extract_expenses(rows: Vec<Vec<Cell>>, period: ReportingPeriod) -> Result<Vec<LedgerRow>> {
    let (header_idx, rows) = match detect_expense_layout(&rows) {
        ExpenseLayout::Clean(idx) => {
            debug!("Expense header found at row {}", idx);
            (idx, rows)
        }
        ExpenseLayout::Legacy => {
            debug!("No clean expense header found, applying legacy export transform");
            (0, legacy_expense_transform(rows))
        }
    };

    let header = rows
        .get(header_idx)
        .ok_or_else(|| BudgetError::HeaderNotFound(TableKind::Expense.label().to_string()))?;
    let cols = locate_columns(header, &EXPENSE_COLUMNS, MatchMode::Exact, TableKind::Expense)?;

    let records = rows
        .iter()
        .skip(header_idx + 1)
        .filter(|row| !row.iter().all(Cell::is_blank))
        .map(|row| {
            let cell = |i: usize| row.get(cols[i]).cloned().unwrap_or_default();
            LedgerRow::Expense(ExpenseRecord {
                month: period.month,
                year: period.year,
                budget_unit: text_of(&cell(0)),
                resource_source: text_of(&cell(1)),
                expense_element: text_of(&cell(2)),
                budgeted: normalize_number(&cell(3)),
                balance: normalize_number(&cell(4)),
                committed: normalize_number(&cell(5)),
                user_id: None,
            })
        })
        .collect();

    Ok(records)
}

/// The header is the row naming the most expense columns, earliest on ties.
/// It is legacy when it sits under the title row without the budget-unit
/// label and with the source column at its fixed legacy position; the
/// legacy transform writes that label itself. Sheets with no recognizable
/// row at all also go through the legacy transform.
fn detect_expense_layout(rows: &[Vec<Cell>]) -> ExpenseLayout {
    let mut best: Option<(usize, usize)> = None;
    for (idx, row) in rows.iter().enumerate() {
        let found = recognized_tokens(row);
        let better = match best {
            Some((_, most)) => found > most,
            None => true,
        };
        if found >= MIN_RECOGNIZED_TOKENS && better {
            best = Some((idx, found));
        }
    }

    let Some((idx, _)) = best else {
        return ExpenseLayout::Legacy;
    };
    let row = &rows[idx];
    let legacy = idx == LEGACY_HEADER_ROW
        && find_column(row, UNIT_LABEL, MatchMode::Exact).is_none()
        && find_column(row, EXPENSE_COLUMNS[1], MatchMode::Exact) == Some(LEGACY_SOURCE_COL);

    if legacy {
        ExpenseLayout::Legacy
    } else {
        ExpenseLayout::Clean(idx)
    }
}

fn recognized_tokens(row: &[Cell]) -> usize {
    EXPENSE_COLUMNS
        .iter()
        .filter(|token| find_column(row, token, MatchMode::Exact).is_some())
        .count()
}

/// Positional rewrite of the legacy report export: drops the title row,
/// relabels and forward-fills the hierarchical label columns, drops helper
/// columns and blank separator rows. Row 0 of the result is the header.
fn legacy_expense_transform(mut rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    if rows.len() < 2 {
        return Vec::new();
    }
    rows.remove(0);

    let title = rows[0].first().cloned().unwrap_or_default();
    set_cell(&mut rows[0], 6, title);

    for row in rows.iter_mut() {
        remove_col(row, 5);
    }

    set_cell(&mut rows[0], ACTIVITY_COL, Cell::text(ACTIVITY_LABEL));
    fill_activity_labels(&mut rows);

    set_cell(&mut rows[0], UNIT_COL, Cell::text(UNIT_LABEL));
    fill_unit_labels(&mut rows);

    for row in rows.iter_mut() {
        remove_col(row, 3);
        remove_col(row, 1);
        remove_col(row, 3);
        remove_col(row, 2);
    }

    let mut rows = rows.into_iter();
    let mut out: Vec<Vec<Cell>> = rows.next().into_iter().collect();
    out.extend(rows.filter(|row| row.get(2).is_some_and(|cell| !cell.is_blank())));

    for row in out.iter_mut() {
        if !row.is_empty() {
            row.remove(0);
        }
    }

    out
}

fn fill_activity_labels(rows: &mut [Vec<Cell>]) {
    let Some(start) = rows.iter().position(|row| {
        row.get(ACTIVITY_COL)
            .and_then(Cell::as_str)
            .is_some_and(|s| s.starts_with(ACTIVITY_LABEL))
    }) else {
        return;
    };

    let mut last = rows[start][ACTIVITY_COL].clone();
    for row in rows.iter_mut().skip(start + 1) {
        let current = row.get(ACTIVITY_COL).cloned().unwrap_or_default();
        if is_fill_target(&current) {
            let filled = match &last {
                Cell::Text(s) if s.contains("- ") => {
                    Cell::text(s.split("- ").nth(1).unwrap_or_default())
                }
                other => other.clone(),
            };
            set_cell(row, ACTIVITY_COL, filled);
        } else {
            last = current;
        }
    }
}

fn fill_unit_labels(rows: &mut [Vec<Cell>]) {
    let mut last: Option<String> = None;
    for row in rows.iter_mut() {
        let current = row.get(UNIT_COL).cloned().unwrap_or_default();
        match current.as_str() {
            Some(label) if label.starts_with(UNIT_GROUP_PREFIX) => {
                let name = if label.contains(": ") {
                    label.split(": ").nth(1).unwrap_or_default()
                } else {
                    label
                };
                last = Some(name.to_string());
            }
            _ if is_fill_target(&current) => {
                if let Some(name) = &last {
                    set_cell(row, UNIT_COL, Cell::text(name));
                }
            }
            _ => {}
        }
    }
}

/// Blank, "-", or a literal zero: cells the export leaves for "same as above".
fn is_fill_target(cell: &Cell) -> bool {
    cell.is_placeholder() || matches!(cell, Cell::Number(n) if *n == 0.0)
}

fn set_cell(row: &mut Vec<Cell>, col: usize, value: Cell) {
    if col >= row.len() {
        row.resize(col + 1, Cell::Empty);
    }
    row[col] = value;
}

fn remove_col(row: &mut Vec<Cell>, col: usize) {
    if col < row.len() {
        row.remove(col);
    }
}

fn text_of(cell: &Cell) -> Option<String> {
    cell.as_text().filter(|s| !s.is_empty())
}

fn locate_columns(
    header: &[Cell],
    tokens: &[&str],
    mode: MatchMode,
    table: TableKind,
) -> Result<Vec<usize>> {
    let mut cols = Vec::with_capacity(tokens.len());
    let mut missing = Vec::new();

    for token in tokens {
        match find_column(header, token, mode) {
            Some(idx) => cols.push(idx),
            None => missing.push(token.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(BudgetError::MissingColumns {
            table: table.label().to_string(),
            columns: missing,
        });
    }

    Ok(cols)
}

fn find_column(header: &[Cell], token: &str, mode: MatchMode) -> Option<usize> {
    let needle = match mode {
        MatchMode::Exact => token.to_string(),
        MatchMode::Folded => fold_header(token),
    };
    header.iter().position(|cell| {
        cell.as_text().is_some_and(|text| match mode {
            MatchMode::Exact => text.contains(&needle),
            MatchMode::Folded => fold_header(&text).contains(&needle),
        })
    })
}

/// Lowercases and strips Portuguese diacritics so "Descrição" matches
/// "descricao".
fn fold_header(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
