//! # Company Data
//!
//! Fixed stand-in for a market-data feed. Figures are in USD; share counts
//! are absolute.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Result, ValuationError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyData {
    pub ticker: &'static str,
    pub name: &'static str,
    pub market_cap: f64,
    pub revenue: f64,
    pub operating_income: f64,
    pub net_income: f64,
    pub total_assets: f64,
    pub total_debt: f64,
    pub cash: f64,
    pub shares_outstanding: f64,
    pub current_price: f64,
    pub capex: f64,
    pub depreciation: f64,
    pub working_capital: f64,
}

impl CompanyData {
    pub fn operating_margin(&self) -> f64 {
        self.operating_income / self.revenue
    }
}

const MOCK_COMPANIES: &[CompanyData] = &[
    CompanyData {
        ticker: "AAPL",
        name: "Apple Inc.",
        market_cap: 3_000_000_000_000.0,
        revenue: 394_328_000_000.0,
        operating_income: 114_301_000_000.0,
        net_income: 99_803_000_000.0,
        total_assets: 352_755_000_000.0,
        total_debt: 122_797_000_000.0,
        cash: 29_965_000_000.0,
        shares_outstanding: 15_550_000_000.0,
        current_price: 193.58,
        capex: 11_085_000_000.0,
        depreciation: 12_547_000_000.0,
        working_capital: 5_000_000_000.0,
    },
    CompanyData {
        ticker: "MSFT",
        name: "Microsoft Corporation",
        market_cap: 2_800_000_000_000.0,
        revenue: 211_915_000_000.0,
        operating_income: 88_383_000_000.0,
        net_income: 83_383_000_000.0,
        total_assets: 411_976_000_000.0,
        total_debt: 60_000_000_000.0,
        cash: 111_000_000_000.0,
        shares_outstanding: 7_430_000_000.0,
        current_price: 377.44,
        capex: 23_800_000_000.0,
        depreciation: 15_000_000_000.0,
        working_capital: 20_000_000_000.0,
    },
];

/// Where company fundamentals come from.
#[async_trait]
pub trait FinancialDataSource: Send + Sync {
    /// Looks a ticker up, case-insensitively.
    async fn company(&self, ticker: &str) -> Result<CompanyData>;

    async fn stock_price(&self, ticker: &str) -> Option<f64> {
        self.company(ticker).await.ok().map(|c| c.current_price)
    }
}

/// The built-in dataset.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockFinancialData;

impl MockFinancialData {
    pub fn tickers() -> impl Iterator<Item = &'static str> {
        MOCK_COMPANIES.iter().map(|c| c.ticker)
    }
}

#[async_trait]
impl FinancialDataSource for MockFinancialData {
    async fn company(&self, ticker: &str) -> Result<CompanyData> {
        let wanted = ticker.trim().to_ascii_uppercase();
        MOCK_COMPANIES
            .iter()
            .find(|c| c.ticker == wanted)
            .cloned()
            .ok_or_else(|| ValuationError::UnknownTicker(ticker.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let data = MockFinancialData.company("aapl").await.unwrap();
        assert_eq!(data.name, "Apple Inc.");
        assert_eq!(MockFinancialData.stock_price(" msft ").await, Some(377.44));
    }

    #[tokio::test]
    async fn test_unknown_ticker() {
        let err = MockFinancialData.company("TSLA").await.unwrap_err();
        assert_eq!(err, ValuationError::UnknownTicker("TSLA".into()));
        assert_eq!(MockFinancialData.stock_price("TSLA").await, None);
    }
}
