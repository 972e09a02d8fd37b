//! # Valuation Engine
//!
//! Asset value, earnings power and margin of safety. Simplified on purpose:
//! 80% of assets count as tangible, maintenance capex equals depreciation,
//! and earnings are capitalised at a flat 10%.

use serde::Serialize;

use crate::data::CompanyData;

pub const TANGIBLE_ASSET_RATIO: f64 = 0.8;
pub const DISCOUNT_RATE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Hold,
    Avoid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReproductionCost {
    pub tangible_assets: f64,
    pub working_capital: f64,
    pub net_debt: f64,
    pub reproduction_cost: f64,
    pub per_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsPower {
    pub normalized_operating_income: f64,
    pub maintenance_capex: f64,
    pub free_cash_flow: f64,
    pub discount_rate: f64,
    pub epv: f64,
    pub per_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginOfSafety {
    pub margin: f64,
    pub percentage: f64,
    pub recommendation: Recommendation,
}

/// Tangible assets plus working capital, less debt, plus cash.
pub fn reproduction_cost(company: &CompanyData) -> ReproductionCost {
    let tangible_assets = company.total_assets * TANGIBLE_ASSET_RATIO;
    let reproduction_cost =
        tangible_assets + company.working_capital - company.total_debt + company.cash;
    ReproductionCost {
        tangible_assets,
        working_capital: company.working_capital,
        net_debt: company.total_debt - company.cash,
        reproduction_cost,
        per_share: reproduction_cost / company.shares_outstanding,
    }
}

pub fn earnings_power(company: &CompanyData) -> EarningsPower {
    let normalized_operating_income = company.operating_income;
    let maintenance_capex = company.depreciation;
    let free_cash_flow = normalized_operating_income + company.depreciation - maintenance_capex;
    let epv = free_cash_flow / DISCOUNT_RATE;
    EarningsPower {
        normalized_operating_income,
        maintenance_capex,
        free_cash_flow,
        discount_rate: DISCOUNT_RATE,
        epv,
        per_share: epv / company.shares_outstanding,
    }
}

/// BUY above 20%, HOLD above 10%, AVOID otherwise.
pub fn recommend(margin: f64) -> Recommendation {
    if margin > 0.2 {
        Recommendation::Buy
    } else if margin > 0.1 {
        Recommendation::Hold
    } else {
        Recommendation::Avoid
    }
}

pub fn margin_of_safety(current_price: f64, intrinsic_value: f64) -> MarginOfSafety {
    let margin = (intrinsic_value - current_price) / current_price;
    MarginOfSafety {
        margin,
        percentage: margin * 100.0,
        recommendation: recommend(margin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FinancialDataSource, MockFinancialData};

    #[tokio::test]
    async fn test_epv_for_apple() {
        let apple = MockFinancialData.company("AAPL").await.unwrap();
        let epv = earnings_power(&apple);
        assert_eq!(epv.free_cash_flow, apple.operating_income);
        assert!((epv.epv - 1_143_010_000_000.0).abs() < 1.0);
        assert!((epv.per_share - 73.505).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_reproduction_cost_for_microsoft() {
        let msft = MockFinancialData.company("MSFT").await.unwrap();
        let cost = reproduction_cost(&msft);
        let expected = 411_976_000_000.0 * 0.8 + 20_000_000_000.0 - 60_000_000_000.0 + 111_000_000_000.0;
        assert!((cost.reproduction_cost - expected).abs() < 1.0);
        assert_eq!(cost.net_debt, -51_000_000_000.0);
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(recommend(0.21), Recommendation::Buy);
        assert_eq!(recommend(0.2), Recommendation::Hold);
        assert_eq!(recommend(0.11), Recommendation::Hold);
        assert_eq!(recommend(0.1), Recommendation::Avoid);
        assert_eq!(recommend(-0.5), Recommendation::Avoid);

        let mos = margin_of_safety(100.0, 150.0);
        assert_eq!(mos.percentage, 50.0);
        assert_eq!(mos.recommendation, Recommendation::Buy);
    }
}
