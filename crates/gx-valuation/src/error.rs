use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    /// Request arrived without a ticker
    #[error("Ticker is required")]
    MissingTicker,

    /// Ticker is not part of the dataset
    #[error("Company data not found for ticker: {0}")]
    UnknownTicker(String),

    /// The data source itself failed
    #[error("data source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, ValuationError>;
