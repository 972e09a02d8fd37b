//! # Investment Committee
//!
//! Three personas score a company on a fixed rubric. Scores start at 3,
//! move by persona-specific rules and are clamped to `[1, 5]`.

use serde::Serialize;

use crate::data::CompanyData;
use crate::engine::{EarningsPower, Recommendation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaId {
    Buffett,
    Munger,
    Klarman,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Persona {
    pub id: PersonaId,
    pub name: &'static str,
    pub style: &'static str,
    pub expertise: &'static [&'static str],
    pub weight: f64,
}

pub const PERSONAS: [Persona; 3] = [
    Persona {
        id: PersonaId::Buffett,
        name: "Warren Buffett",
        style: "Value investing, long-term focus, moat analysis",
        expertise: &["Consumer", "Financial", "Insurance"],
        weight: 1.2,
    },
    Persona {
        id: PersonaId::Munger,
        name: "Charlie Munger",
        style: "Mental models, quality over quantity, psychological insights",
        expertise: &["Conglomerate", "Consumer", "Real Estate"],
        weight: 1.0,
    },
    Persona {
        id: PersonaId::Klarman,
        name: "Seth Klarman",
        style: "Deep value, margin of safety, contrarian thinking",
        expertise: &["Special Situations", "Distressed", "Value"],
        weight: 1.3,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub persona: Persona,
    /// Rounded to one decimal.
    pub score: f64,
    pub comment: String,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IcMeeting {
    pub reviews: Vec<Review>,
    pub average_score: f64,
    pub consensus: Recommendation,
}

/// Unrounded, clamped rubric score.
pub fn raw_score(persona: PersonaId, company: &CompanyData, margin: f64) -> f64 {
    let adjustment: f64 = match persona {
        PersonaId::Buffett => {
            let value = if margin > 0.2 {
                1.5
            } else if margin > 0.1 {
                0.5
            } else {
                -1.0
            };
            let scale = if company.revenue > 100_000_000_000.0 { 0.5 } else { -0.5 };
            value + scale
        }
        PersonaId::Munger => {
            let quality = if company.operating_margin() > 0.2 { 1.0 } else { -0.5 };
            let value = if margin > 0.15 { 1.0 } else { 0.0 };
            quality + value
        }
        PersonaId::Klarman => {
            let value = if margin > 0.3 {
                2.0
            } else if margin > 0.2 {
                1.0
            } else {
                -1.0
            };
            let balance = if company.cash > company.total_debt { 0.5 } else { -0.5 };
            value + balance
        }
    };
    (3.0 + adjustment).clamp(1.0, 5.0)
}

/// BUY from 4, HOLD from 3.
pub fn score_recommendation(score: f64) -> Recommendation {
    if score >= 4.0 {
        Recommendation::Buy
    } else if score >= 3.0 {
        Recommendation::Hold
    } else {
        Recommendation::Avoid
    }
}

pub fn comment(persona: PersonaId, company: &CompanyData, margin: f64) -> String {
    match persona {
        PersonaId::Buffett => format!(
            "\"{} shows strong fundamentals with {:.1}% operating margin. The moat appears \
             sustainable, and at current prices, we're getting good value for a quality business.\"",
            company.name,
            company.operating_margin() * 100.0
        ),
        PersonaId::Munger => "\"This investment requires understanding the business model deeply. \
             The psychological factors favor long-term holders, and the quality metrics suggest \
             this could compound wealth over time.\""
            .to_string(),
        PersonaId::Klarman => {
            let adequate = margin > 0.2;
            format!(
                "\"The margin of safety is {:.1}%, which {}. Risk-adjusted returns look {}.\"",
                margin * 100.0,
                if adequate { "provides adequate protection" } else { "may be insufficient" },
                if adequate { "attractive" } else { "questionable" }
            )
        }
    }
}

/// BUY needs a strict plurality over both others; otherwise HOLD beats AVOID
/// only when strictly ahead.
pub fn consensus(reviews: &[Review]) -> Recommendation {
    let count = |r: Recommendation| reviews.iter().filter(|review| review.recommendation == r).count();
    let (buy, hold, avoid) = (
        count(Recommendation::Buy),
        count(Recommendation::Hold),
        count(Recommendation::Avoid),
    );
    if buy > hold && buy > avoid {
        Recommendation::Buy
    } else if hold > avoid {
        Recommendation::Hold
    } else {
        Recommendation::Avoid
    }
}

pub fn simulate_ic_meeting(company: &CompanyData, epv: &EarningsPower) -> IcMeeting {
    let margin = (epv.per_share - company.current_price) / company.current_price;
    let reviews: Vec<Review> = PERSONAS
        .iter()
        .map(|persona| {
            let score = raw_score(persona.id, company, margin);
            Review {
                persona: persona.clone(),
                score: (score * 10.0).round() / 10.0,
                comment: comment(persona.id, company, margin),
                recommendation: score_recommendation(score),
            }
        })
        .collect();

    let average_score = reviews.iter().map(|r| r.score).sum::<f64>() / reviews.len() as f64;
    let consensus = consensus(&reviews);
    log::debug!("IC meeting for {}: {consensus:?} ({average_score:.2})", company.ticker);
    IcMeeting {
        reviews,
        average_score,
        consensus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FinancialDataSource, MockFinancialData};
    use crate::engine::earnings_power;

    fn review(recommendation: Recommendation) -> Review {
        Review {
            persona: PERSONAS[0].clone(),
            score: 3.0,
            comment: String::new(),
            recommendation,
        }
    }

    #[test]
    fn test_consensus_rules() {
        use Recommendation::*;
        let of = |recs: &[Recommendation]| consensus(&recs.iter().copied().map(review).collect::<Vec<_>>());
        assert_eq!(of(&[Buy, Buy, Avoid]), Buy);
        assert_eq!(of(&[Buy, Hold, Avoid]), Avoid);
        assert_eq!(of(&[Buy, Avoid, Avoid]), Avoid);
        assert_eq!(of(&[Hold, Hold, Buy]), Hold);
        assert_eq!(of(&[]), Avoid);
    }

    #[test]
    fn test_score_is_clamped() {
        let mut company = small_company();
        company.cash = company.total_debt + 1.0;
        assert_eq!(raw_score(PersonaId::Klarman, &company, 0.5), 5.0);
        company.cash = 0.0;
        assert_eq!(raw_score(PersonaId::Klarman, &company, -1.0), 1.5);
    }

    fn small_company() -> CompanyData {
        CompanyData {
            ticker: "TEST",
            name: "Test Co",
            market_cap: 1.0,
            revenue: 10.0,
            operating_income: 1.0,
            net_income: 1.0,
            total_assets: 1.0,
            total_debt: 5.0,
            cash: 1.0,
            shares_outstanding: 1.0,
            current_price: 1.0,
            capex: 1.0,
            depreciation: 1.0,
            working_capital: 1.0,
        }
    }

    #[tokio::test]
    async fn test_apple_meeting() {
        let apple = MockFinancialData.company("AAPL").await.unwrap();
        let meeting = simulate_ic_meeting(&apple, &earnings_power(&apple));

        // margin is deeply negative: buffett 3 - 1 + 0.5, munger 3 + 1, klarman 3 - 1 - 0.5
        let scores: Vec<f64> = meeting.reviews.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![2.5, 4.0, 1.5]);
        let recs: Vec<_> = meeting.reviews.iter().map(|r| r.recommendation).collect();
        assert_eq!(
            recs,
            vec![Recommendation::Avoid, Recommendation::Buy, Recommendation::Avoid]
        );
        assert_eq!(meeting.consensus, Recommendation::Avoid);
        assert!((meeting.average_score - 8.0 / 3.0).abs() < 1e-9);
        assert!(meeting.reviews[0].comment.contains("29.0% operating margin"));
        assert!(meeting.reviews[2].comment.contains("may be insufficient"));
    }
}
