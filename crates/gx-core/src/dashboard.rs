//! # Dashboard
//!
//! Read-side aggregation over the whole store: per-kind counters, the merged
//! activity feed, detail lists, bulk clears and the viewing summary.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::analysis::{self, AuthorCount, Engagement, SentimentCounts, TimeRange, TopicCount};
use crate::error::{AppError, Result};
use crate::models::{AnnotationKind, AnnotationRecord, ViewedEntity};
use crate::store::AnnotationStore;
use crate::widget::sort_newest_first;

pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const DEFAULT_WINDOW_HOURS: i64 = 2;
pub const DEFAULT_TOP_AUTHORS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub total: usize,
    pub today: usize,
}

/// Everything the summary panel shows for one viewing window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSummary {
    pub total_viewed: usize,
    pub time_range: Option<TimeRange>,
    pub topics: Vec<TopicCount>,
    pub sentiments: SentimentCounts,
    pub insights: Vec<String>,
    pub top_authors: Vec<AuthorCount>,
    pub engagement: Engagement,
}

fn local_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

pub struct Dashboard {
    store: Arc<AnnotationStore>,
}

impl Dashboard {
    pub fn new(store: Arc<AnnotationStore>) -> Self {
        Self { store }
    }

    pub async fn compute_stats(&self, kind: AnnotationKind) -> Result<KindStats> {
        self.compute_stats_on(kind, Local::now().date_naive()).await
    }

    /// `today` counts records whose local calendar date is `today`.
    pub async fn compute_stats_on(&self, kind: AnnotationKind, today: NaiveDate) -> Result<KindStats> {
        let mut stats = KindStats { total: 0, today: 0 };
        for (_, records) in self.store.scan_kind(kind).await? {
            stats.total += records.len();
            stats.today += records
                .iter()
                .filter(|r| local_date(r.timestamp) == today)
                .count();
        }
        Ok(stats)
    }

    /// Every record of `kind`, newest first.
    pub async fn all_of_kind(&self, kind: AnnotationKind) -> Result<Vec<AnnotationRecord>> {
        let mut records: Vec<_> = self
            .store
            .scan_kind(kind)
            .await?
            .into_iter()
            .flat_map(|(_, records)| records)
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    pub async fn today_of_kind(&self, kind: AnnotationKind) -> Result<Vec<AnnotationRecord>> {
        let today = Local::now().date_naive();
        let mut records = self.all_of_kind(kind).await?;
        records.retain(|r| local_date(r.timestamp) == today);
        Ok(records)
    }

    /// Replies, retweets and likes interleaved, newest first, at most `limit`.
    pub async fn merged_feed(&self, limit: usize) -> Result<Vec<AnnotationRecord>> {
        let mut feed = Vec::new();
        for kind in AnnotationKind::ALL {
            for (_, records) in self.store.scan_kind(kind).await? {
                feed.extend(records);
            }
        }
        sort_newest_first(&mut feed);
        feed.truncate(limit);
        Ok(feed)
    }

    pub async fn clear_kind(&self, kind: AnnotationKind) -> Result<usize> {
        self.store.clear_all_of_kind(kind).await
    }

    async fn recent_views(&self, window_hours: i64) -> Result<Vec<ViewedEntity>> {
        let since = window_start(Utc::now(), window_hours)?;
        self.store.viewed_since(since).await
    }

    pub async fn topic_summary(&self, window_hours: i64) -> Result<Vec<TopicCount>> {
        Ok(analysis::topics(&self.recent_views(window_hours).await?))
    }

    pub async fn sentiment_summary(&self, window_hours: i64) -> Result<SentimentCounts> {
        Ok(analysis::sentiments(&self.recent_views(window_hours).await?))
    }

    pub async fn top_authors(&self, window_hours: i64, limit: usize) -> Result<Vec<AuthorCount>> {
        Ok(analysis::top_authors(&self.recent_views(window_hours).await?, limit))
    }

    /// `None` when nothing was viewed inside the window.
    pub async fn feed_summary(&self, window_hours: i64) -> Result<Option<FeedSummary>> {
        let views = self.recent_views(window_hours).await?;
        if views.is_empty() {
            return Ok(None);
        }
        Ok(Some(FeedSummary {
            total_viewed: views.len(),
            time_range: analysis::time_range(&views),
            topics: analysis::topics(&views),
            sentiments: analysis::sentiments(&views),
            insights: analysis::insights(&views),
            top_authors: analysis::top_authors(&views, DEFAULT_TOP_AUTHORS),
            engagement: analysis::engagement(&views),
        }))
    }
}

/// Relative age of a timestamp, e.g. "5m ago"; older than a week prints the date.
/// Start of a viewing window of `hours` ending at `now`. Rejects windows that
/// are not positive or that reach past the representable time range.
pub fn window_start(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    if hours <= 0 {
        return Err(AppError::ValidationError("hours must be positive".into()));
    }
    Duration::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| AppError::ValidationError(format!("window of {hours} hours is out of range")))
}

pub fn format_time_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - ts;
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        local_date(ts).format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::models::Author;

    fn record(kind: AnnotationKind, entity: &str, age: Duration) -> AnnotationRecord {
        let mut record = AnnotationRecord::new(
            kind,
            entity,
            (kind == AnnotationKind::Reply).then(|| "text".to_string()),
            Author::Anonymous,
            None,
        );
        record.timestamp = Utc::now() - age;
        record
    }

    async fn seeded() -> (Dashboard, Arc<AnnotationStore>) {
        let store = Arc::new(AnnotationStore::new(Arc::new(MemoryBackend::new())));
        let fixtures = [
            (AnnotationKind::Reply, "1", Duration::minutes(1)),
            (AnnotationKind::Reply, "1", Duration::days(3)),
            (AnnotationKind::Reply, "2", Duration::minutes(30)),
            (AnnotationKind::Like, "1", Duration::minutes(2)),
            (AnnotationKind::Retweet, "3", Duration::days(10)),
        ];
        for (kind, entity, age) in fixtures {
            store.append(kind, entity, record(kind, entity, age)).await.unwrap();
        }
        (Dashboard::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn test_stats_today_never_exceeds_total() {
        let (dashboard, _) = seeded().await;
        let stats = dashboard.compute_stats(AnnotationKind::Reply).await.unwrap();
        assert_eq!(stats.total, 3);
        assert!(stats.today <= stats.total);

        let far_future = NaiveDate::from_ymd_opt(2999, 1, 1).unwrap();
        let stats = dashboard.compute_stats_on(AnnotationKind::Reply, far_future).await.unwrap();
        assert_eq!(stats, KindStats { total: 3, today: 0 });

        let likes = dashboard.compute_stats(AnnotationKind::Like).await.unwrap();
        assert_eq!(likes.total, 1);
    }

    #[tokio::test]
    async fn test_merged_feed_sorted_and_limited() {
        let (dashboard, store) = seeded().await;
        for i in 0..30 {
            let id = format!("9{i}");
            store
                .append(AnnotationKind::Like, &id, record(AnnotationKind::Like, &id, Duration::hours(i + 1)))
                .await
                .unwrap();
        }

        let feed = dashboard.merged_feed(DEFAULT_FEED_LIMIT).await.unwrap();
        assert_eq!(feed.len(), DEFAULT_FEED_LIMIT);
        assert!(feed.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let small = dashboard.merged_feed(3).await.unwrap();
        assert_eq!(small[0].kind, AnnotationKind::Reply);
        assert_eq!(small[0].entity_id, "1");
    }

    #[tokio::test]
    async fn test_detail_lists_and_clear() {
        let (dashboard, _) = seeded().await;
        let replies = dashboard.all_of_kind(AnnotationKind::Reply).await.unwrap();
        assert_eq!(replies.len(), 3);
        assert!(replies.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let today = dashboard.today_of_kind(AnnotationKind::Reply).await.unwrap();
        assert!(today.len() <= replies.len());

        assert_eq!(dashboard.clear_kind(AnnotationKind::Reply).await.unwrap(), 2);
        assert!(dashboard.all_of_kind(AnnotationKind::Reply).await.unwrap().is_empty());
        assert_eq!(dashboard.all_of_kind(AnnotationKind::Like).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_respects_window() {
        let (dashboard, store) = seeded().await;
        assert!(dashboard.feed_summary(DEFAULT_WINDOW_HOURS).await.unwrap().is_none());

        let mut old = ViewedEntity {
            entity_id: "1".into(),
            text: "old news".into(),
            author: None,
            has_images: false,
            has_links: false,
            likes: 0,
            retweets: 0,
            replies: 0,
            timestamp: Utc::now() - Duration::hours(5),
            view_count: 1,
        };
        store.record_view_once(&old).await.unwrap();
        for (id, text) in [("2", "great product launch"), ("3", "great service today")] {
            old.entity_id = id.into();
            old.text = text.into();
            old.timestamp = Utc::now() - Duration::minutes(10);
            store.record_view_once(&old).await.unwrap();
        }

        let summary = dashboard.feed_summary(DEFAULT_WINDOW_HOURS).await.unwrap().unwrap();
        assert_eq!(summary.total_viewed, 2);
        assert_eq!(summary.topics[0], TopicCount { topic: "great".into(), count: 2 });
        assert!(!summary.topics.iter().any(|t| t.topic == "news"));
        assert_eq!(summary.sentiments.positive, 2);

        let topics = dashboard.topic_summary(6).await.unwrap();
        assert!(topics.iter().any(|t| t.topic == "news"));
        assert!(dashboard.top_authors(6, 5).await.unwrap().is_empty());
        assert_eq!(dashboard.sentiment_summary(6).await.unwrap().neutral, 1);
    }

    #[tokio::test]
    async fn test_oversized_window_is_rejected() {
        let (dashboard, _) = seeded().await;
        for hours in [10_000_000_000, i64::MAX, 0, -3] {
            assert!(matches!(
                dashboard.feed_summary(hours).await,
                Err(AppError::ValidationError(_))
            ));
            assert!(matches!(
                dashboard.topic_summary(hours).await,
                Err(AppError::ValidationError(_))
            ));
        }

        let now = Utc::now();
        assert_eq!(window_start(now, 2).unwrap(), now - Duration::hours(2));
    }

    #[test]
    fn test_format_time_ago() {
        let now = Utc::now();
        assert_eq!(format_time_ago(now, now), "just now");
        assert_eq!(format_time_ago(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(format_time_ago(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_time_ago(now - Duration::days(2), now), "2d ago");
        assert_eq!(format_time_ago(now - Duration::days(30), now).len(), 10);
    }
}
