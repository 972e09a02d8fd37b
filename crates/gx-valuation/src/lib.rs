//! Mock value-investing analysis: asset value, earnings power, margin of
//! safety and a simulated investment-committee vote over a fixed dataset.

pub mod committee;
pub mod data;
pub mod engine;
pub mod error;
pub mod report;

pub use committee::{IcMeeting, Persona, PersonaId, Review, PERSONAS};
pub use data::{CompanyData, FinancialDataSource, MockFinancialData};
pub use engine::{EarningsPower, MarginOfSafety, Recommendation, ReproductionCost};
pub use error::{Result, ValuationError};
pub use report::{analyze, format_currency, Analysis, RiskLevel};
