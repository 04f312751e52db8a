use thiserror::Error;

#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("Missing columns in {table} sheet: {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("No header row found in {0} sheet")]
    HeaderNotFound(String),

    #[error("Sheet has no rows")]
    EmptySheet,

    #[error("Invalid reporting period {month}/{year}: month must be 1-12 and year positive")]
    InvalidPeriod { month: u32, year: i32 },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Invalid weight table: {0}")]
    InvalidWeightTable(String),

    #[error("Invalid adequacy band [{lower}, {upper}]: lower bound must not exceed upper bound")]
    InvalidAdequacyBand { lower: f64, upper: f64 },

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Xlsx error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BudgetError>;
