use crate::error::{BudgetError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[schemars(description = "Monthly expense ledger (Despesas): committed spend per unit, source and element")]
    Expense,

    #[schemars(description = "Monthly revenue ledger (Receitas): collected revenue per description and source")]
    Revenue,
}

impl TableKind {
    pub fn label(&self) -> &'static str {
        match self {
            TableKind::Expense => "expense",
            TableKind::Revenue => "revenue",
        }
    }
}

/// The month/year a spreadsheet upload reports on. The sheet itself does not
/// reliably carry it, so the caller supplies it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub struct ReportingPeriod {
    pub month: u32,
    pub year: i32,
}

impl ReportingPeriod {
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) || year <= 0 {
            return Err(BudgetError::InvalidPeriod { month, year });
        }
        Ok(Self { month, year })
    }
}

/// Budgeted / balance / actual triple in integer currency units. Sums
/// saturate, matching how oversized cells are normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Amounts {
    pub budgeted: i64,
    pub balance: i64,
    pub actual: i64,
}

impl Add for Amounts {
    type Output = Amounts;

    fn add(self, rhs: Amounts) -> Amounts {
        Amounts {
            budgeted: self.budgeted.saturating_add(rhs.budgeted),
            balance: self.balance.saturating_add(rhs.balance),
            actual: self.actual.saturating_add(rhs.actual),
        }
    }
}

impl AddAssign for Amounts {
    fn add_assign(&mut self, rhs: Amounts) {
        *self = *self + rhs;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseRecord {
    #[serde(rename = "mes")]
    #[schemars(description = "Reporting month, 1-12")]
    pub month: u32,

    #[serde(rename = "ano")]
    #[schemars(description = "Reporting year")]
    pub year: i32,

    #[serde(rename = "unidade_orcamentaria", default)]
    #[schemars(description = "Budget unit (Unidade Orçamentária) as exported")]
    pub budget_unit: Option<String>,

    #[serde(rename = "fonte_de_recurso", default)]
    #[schemars(description = "Resource source (Fonte de Recurso) code or label")]
    pub resource_source: Option<String>,

    #[serde(rename = "elemento_despesa", default)]
    #[schemars(description = "Expense element (Elemento de Despesa) code or label")]
    pub expense_element: Option<String>,

    #[serde(rename = "orcado", default)]
    pub budgeted: i64,

    #[serde(rename = "saldo", default)]
    pub balance: i64,

    #[serde(rename = "empenhado", default)]
    #[schemars(description = "Committed spend (Empenhado) through the reporting month")]
    pub committed: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RevenueRecord {
    #[serde(rename = "mes")]
    pub month: u32,

    #[serde(rename = "ano")]
    pub year: i32,

    #[serde(rename = "descricao", default)]
    #[schemars(description = "Revenue description (Descrição) as exported")]
    pub description: Option<String>,

    #[serde(rename = "fonte_de_recurso", default)]
    pub resource_source: Option<String>,

    #[serde(rename = "orcado", default)]
    pub budgeted: i64,

    #[serde(rename = "saldo", default)]
    pub balance: i64,

    #[serde(rename = "receita", default)]
    #[schemars(description = "Collected revenue (Receita) through the reporting month")]
    pub collected: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Common view over post-ETL ledger rows used by the aggregation layers.
pub trait LedgerEntry {
    fn month(&self) -> u32;
    fn year(&self) -> i32;
    fn amounts(&self) -> Amounts;
    /// Raw code the historical matrix is keyed on.
    fn history_code(&self) -> Option<&str>;
}

impl LedgerEntry for ExpenseRecord {
    fn month(&self) -> u32 {
        self.month
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn amounts(&self) -> Amounts {
        Amounts {
            budgeted: self.budgeted,
            balance: self.balance,
            actual: self.committed,
        }
    }

    fn history_code(&self) -> Option<&str> {
        self.expense_element.as_deref()
    }
}

impl LedgerEntry for RevenueRecord {
    fn month(&self) -> u32 {
        self.month
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn amounts(&self) -> Amounts {
        Amounts {
            budgeted: self.budgeted,
            balance: self.balance,
            actual: self.collected,
        }
    }

    fn history_code(&self) -> Option<&str> {
        self.resource_source.as_deref()
    }
}

/// A row emitted by the extractor. Everything past the extraction boundary
/// works with one of the two strongly typed variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerRow {
    Expense(ExpenseRecord),
    Revenue(RevenueRecord),
}

impl LedgerRow {
    pub fn kind(&self) -> TableKind {
        match self {
            LedgerRow::Expense(_) => TableKind::Expense,
            LedgerRow::Revenue(_) => TableKind::Revenue,
        }
    }

    pub fn with_user_id(self, user_id: &str) -> Self {
        match self {
            LedgerRow::Expense(mut r) => {
                r.user_id = Some(user_id.to_string());
                LedgerRow::Expense(r)
            }
            LedgerRow::Revenue(mut r) => {
                r.user_id = Some(user_id.to_string());
                LedgerRow::Revenue(r)
            }
        }
    }

    /// Splits a mixed row set into expense and revenue records.
    pub fn partition(rows: Vec<LedgerRow>) -> (Vec<ExpenseRecord>, Vec<RevenueRecord>) {
        let mut expenses = Vec::new();
        let mut revenues = Vec::new();
        for row in rows {
            match row {
                LedgerRow::Expense(r) => expenses.push(r),
                LedgerRow::Revenue(r) => revenues.push(r),
            }
        }
        (expenses, revenues)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(LedgerRow)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
