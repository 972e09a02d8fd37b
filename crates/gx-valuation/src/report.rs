//! # Analysis Report
//!
//! Runs the whole chain for one ticker and shapes the result the way the
//! `/api/analyze` endpoint returns it.

use serde::Serialize;

use crate::committee::{simulate_ic_meeting, IcMeeting};
use crate::data::FinancialDataSource;
use crate::engine::{earnings_power, margin_of_safety, reproduction_cost, Recommendation};
use crate::error::{Result, ValuationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Low above a 20% margin, Medium above 10%.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage > 20.0 {
            Self::Low
        } else if percentage > 10.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyOverview {
    pub ticker: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub revenue: f64,
    pub operating_income: f64,
}

impl CompanyOverview {
    pub fn operating_margin_pct(&self) -> f64 {
        self.operating_income / self.revenue * 100.0
    }
}

/// Per-share figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationSummary {
    pub reproduction_cost: f64,
    pub epv: f64,
    /// In percent.
    pub margin_of_safety: f64,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub intrinsic_value: f64,
    pub current_price: f64,
    /// One decimal and a `%` suffix, e.g. "-62.0%".
    pub upside: String,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub company: CompanyOverview,
    pub valuation: ValuationSummary,
    pub ic_meeting: IcMeeting,
    pub summary: Summary,
}

pub async fn analyze(source: &dyn FinancialDataSource, ticker: &str) -> Result<Analysis> {
    if ticker.trim().is_empty() {
        return Err(ValuationError::MissingTicker);
    }
    let company = source.company(ticker).await?;

    let cost = reproduction_cost(&company);
    let epv = earnings_power(&company);
    let ic_meeting = simulate_ic_meeting(&company, &epv);
    let mos = margin_of_safety(company.current_price, epv.per_share);
    let upside = (epv.per_share - company.current_price) / company.current_price * 100.0;

    log::info!(
        "analyzed {}: epv/share {:.2} vs price {:.2} -> {:?}",
        company.ticker,
        epv.per_share,
        company.current_price,
        mos.recommendation
    );

    Ok(Analysis {
        company: CompanyOverview {
            ticker: company.ticker.to_string(),
            name: company.name.to_string(),
            current_price: company.current_price,
            market_cap: company.market_cap,
            revenue: company.revenue,
            operating_income: company.operating_income,
        },
        valuation: ValuationSummary {
            reproduction_cost: cost.per_share,
            epv: epv.per_share,
            margin_of_safety: mos.percentage,
            recommendation: mos.recommendation,
        },
        ic_meeting,
        summary: Summary {
            intrinsic_value: epv.per_share,
            current_price: company.current_price,
            upside: format!("{upside:.1}%"),
            risk_level: RiskLevel::from_percentage(mos.percentage),
        },
    })
}

/// `$3.0T`, `$394.3B`, `$12.5M`, `$193.58`.
pub fn format_currency(value: f64) -> String {
    if value >= 1e12 {
        format!("${:.1}T", value / 1e12)
    } else if value >= 1e9 {
        format!("${:.1}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.1}M", value / 1e6)
    } else {
        format!("${value:.2}")
    }
}
