use crate::domain::cart::LineItemId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartError {
    #[error("Quantity must be between 1 and 4294967295, got {0}")]
    InvalidQuantity(i64),
    #[error("Line item {item} cannot hold {current} + {added} units")]
    QuantityOverflow {
        item: LineItemId,
        current: u32,
        added: u32,
    },
    #[error("Amount too large to price: {0}")]
    AmountOverflow(&'static str),
    #[error("Unit price must not be negative, got {0}")]
    InvalidPrice(rust_decimal::Decimal),
    #[error("Line item {0} is not in the cart")]
    UnknownLineItem(LineItemId),
    #[error("Invalid tip policy: {0}")]
    InvalidTipPolicy(String),
    #[error("Tax rate must not be negative, got {0}")]
    InvalidTaxRate(rust_decimal::Decimal),
    #[error("Unknown restaurant: {0}")]
    UnknownRestaurant(String),
    #[error("Unknown dish {dish} at restaurant {restaurant}")]
    UnknownDish { restaurant: String, dish: String },
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("Command '{command}' requires the '{field}' column")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },
    #[error("Cart for session {session} changed concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        session: String,
        expected: u64,
        found: u64,
    },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for CartError {
    fn from(err: rocksdb::Error) -> Self {
        CartError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CartError>;
