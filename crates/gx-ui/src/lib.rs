//! Server-rendered pages. Templates only print; every number is formatted
//! here so the HTML stays logic-free.

use askama::Template;
use chrono::{DateTime, Utc};
use gx_core::analysis::{AuthorCount, TopicCount};
use gx_core::dashboard::format_time_ago;
use gx_core::{AnnotationKind, AnnotationRecord, FeedSummary, KindStats};
use gx_valuation::{format_currency, Analysis, MockFinancialData};

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub ticker: String,
    pub error: Option<String>,
    pub tickers: Vec<&'static str>,
}

impl IndexTemplate {
    pub fn new(ticker: impl Into<String>, error: Option<String>) -> Self {
        Self {
            ticker: ticker.into(),
            error,
            tickers: MockFinancialData::tickers().collect(),
        }
    }
}

pub struct ReviewRow {
    pub name: &'static str,
    pub score: String,
    pub comment: String,
    pub recommendation: String,
}

#[derive(Template)]
#[template(path = "analysis.html")]
pub struct AnalysisTemplate {
    pub ticker: String,
    pub name: String,
    pub current_price: String,
    pub market_cap: String,
    pub revenue: String,
    pub operating_margin: String,
    pub reproduction_cost: String,
    pub epv: String,
    pub margin_of_safety: String,
    pub recommendation: String,
    pub reviews: Vec<ReviewRow>,
    pub average_score: String,
    pub consensus: String,
    pub intrinsic_value: String,
    pub upside: String,
    pub risk_level: String,
}

fn label<T: std::fmt::Debug>(value: T) -> String {
    format!("{value:?}").to_uppercase()
}

impl From<&Analysis> for AnalysisTemplate {
    fn from(analysis: &Analysis) -> Self {
        let company = &analysis.company;
        Self {
            ticker: company.ticker.clone(),
            name: company.name.clone(),
            current_price: format_currency(company.current_price),
            market_cap: format_currency(company.market_cap),
            revenue: format_currency(company.revenue),
            operating_margin: format!("{:.1}%", company.operating_margin_pct()),
            reproduction_cost: format_currency(analysis.valuation.reproduction_cost),
            epv: format_currency(analysis.valuation.epv),
            margin_of_safety: format!("{:.1}%", analysis.valuation.margin_of_safety),
            recommendation: label(analysis.valuation.recommendation),
            reviews: analysis
                .ic_meeting
                .reviews
                .iter()
                .map(|review| ReviewRow {
                    name: review.persona.name,
                    score: format!("{:.1}", review.score),
                    comment: review.comment.clone(),
                    recommendation: label(review.recommendation),
                })
                .collect(),
            average_score: format!("{:.1}", analysis.ic_meeting.average_score),
            consensus: label(analysis.ic_meeting.consensus),
            intrinsic_value: format_currency(analysis.summary.intrinsic_value),
            upside: analysis.summary.upside.clone(),
            risk_level: format!("{:?}", analysis.summary.risk_level),
        }
    }
}

pub struct StatCard {
    pub label: &'static str,
    pub total: usize,
    pub today: usize,
}

pub struct FeedItem {
    pub kind: &'static str,
    pub entity_id: String,
    pub author: String,
    pub group: Option<String>,
    pub text: Option<String>,
    pub ago: String,
}

pub struct SummaryPanel {
    pub total_viewed: usize,
    pub range: Option<String>,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub engagement: String,
    pub topics: Vec<TopicCount>,
    pub authors: Vec<AuthorCount>,
    pub insights: Vec<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub stats: Vec<StatCard>,
    pub feed: Vec<FeedItem>,
    pub window_hours: i64,
    pub summary: Option<SummaryPanel>,
}

fn kind_label(kind: AnnotationKind) -> &'static str {
    match kind {
        AnnotationKind::Reply => "Replies",
        AnnotationKind::Retweet => "Retweets",
        AnnotationKind::Like => "Likes",
    }
}

impl DashboardTemplate {
    /// `stats` must be in `AnnotationKind::ALL` order.
    pub fn build(
        stats: &[(AnnotationKind, KindStats)],
        feed: &[AnnotationRecord],
        summary: Option<FeedSummary>,
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            stats: stats
                .iter()
                .map(|(kind, s)| StatCard {
                    label: kind_label(*kind),
                    total: s.total,
                    today: s.today,
                })
                .collect(),
            feed: feed
                .iter()
                .map(|record| FeedItem {
                    kind: record.kind.as_str(),
                    entity_id: record.entity_id.clone(),
                    author: record.author.display_name().to_string(),
                    group: record.group_name.clone(),
                    text: record.text.clone(),
                    ago: format_time_ago(record.timestamp, now),
                })
                .collect(),
            window_hours,
            summary: summary.map(|s| SummaryPanel {
                total_viewed: s.total_viewed,
                range: s.time_range.map(|r| {
                    format!(
                        "{} to {}",
                        format_time_ago(r.start, now),
                        format_time_ago(r.end, now)
                    )
                }),
                positive: s.sentiments.positive,
                negative: s.sentiments.negative,
                neutral: s.sentiments.neutral,
                engagement: format!(
                    "{} likes, {} retweets, {} replies ({:.1} per post)",
                    s.engagement.total_likes,
                    s.engagement.total_retweets,
                    s.engagement.total_replies,
                    s.engagement.avg_engagement
                ),
                topics: s.topics,
                authors: s.top_authors,
                insights: s.insights,
            }),
        }
    }
}
