//! # Annotation Widget
//!
//! Headless per-entity widget. Holds the reply draft, enforces the length
//! budget, and re-reads its lists from the store after every write.

use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{AnnotationKind, AnnotationRecord, MAX_REPLY_LEN, REPLY_WARN_LEN};
use crate::session::Session;
use crate::store::AnnotationStore;

/// Length of `text` as the feed counts it (UTF-16 code units).
pub fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Trims and hard-truncates to `MAX_REPLY_LEN` code units without splitting
/// a surrogate pair.
pub fn sanitize_reply(text: &str) -> String {
    let trimmed = text.trim();
    let mut units = 0;
    trimmed
        .chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= MAX_REPLY_LEN
        })
        .collect()
}

/// State of the draft counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CharBudget {
    Ok,
    Warning,
    Over,
}

impl CharBudget {
    pub fn for_len(len: usize) -> Self {
        if len > MAX_REPLY_LEN {
            Self::Over
        } else if len > REPLY_WARN_LEN {
            Self::Warning
        } else {
            Self::Ok
        }
    }
}

/// A displayed row together with its position in the stored bucket.
///
/// Rows are shown newest first, but deletes address the bucket in insertion
/// order, so `index` is what a client passes back to delete this row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedRecord {
    pub index: usize,
    #[serde(flatten)]
    pub record: AnnotationRecord,
}

/// Everything needed to draw one widget.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub entity_id: String,
    pub group_name: Option<String>,
    pub replies: Vec<IndexedRecord>,
    pub retweets: Vec<IndexedRecord>,
    pub likes: Vec<IndexedRecord>,
}

/// Newest first.
pub fn sort_newest_first(records: &mut [AnnotationRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Newest first, keeping each row's bucket index. Equal timestamps put the
/// later insert first.
pub fn index_newest_first(records: Vec<AnnotationRecord>) -> Vec<IndexedRecord> {
    let mut rows: Vec<IndexedRecord> = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| IndexedRecord { index, record })
        .collect();
    rows.sort_by(|a, b| {
        b.record
            .timestamp
            .cmp(&a.record.timestamp)
            .then(b.index.cmp(&a.index))
    });
    rows
}

pub struct AnnotationWidget {
    entity_id: String,
    store: Arc<AnnotationStore>,
    session: Arc<Session>,
    draft: String,
}

impl AnnotationWidget {
    pub fn new(entity_id: impl Into<String>, store: Arc<AnnotationStore>, session: Arc<Session>) -> Self {
        Self {
            entity_id: entity_id.into(),
            store,
            session,
            draft: String::new(),
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replaces the draft and reports the counter state.
    pub fn set_draft(&mut self, text: impl Into<String>) -> CharBudget {
        self.draft = text.into();
        CharBudget::for_len(text_len(&self.draft))
    }

    pub fn clear(&mut self) {
        self.draft.clear();
    }

    /// Submits the draft as a reply. On success the draft is cleared and the
    /// fresh reply list is returned; on rejection the draft is kept.
    pub async fn submit(&mut self) -> Result<Vec<IndexedRecord>> {
        let replies = self.submit_reply(&self.draft.clone()).await?;
        self.draft.clear();
        Ok(replies)
    }

    /// Validates and stores `text` as a reply; returns the reply list, newest first.
    pub async fn submit_reply(&self, text: &str) -> Result<Vec<IndexedRecord>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::ValidationError("reply text is empty".into()));
        }
        let len = text_len(trimmed);
        if len > MAX_REPLY_LEN {
            return Err(AppError::ValidationError(format!(
                "reply is {len} characters, limit is {MAX_REPLY_LEN}"
            )));
        }

        let text = sanitize_reply(trimmed);
        self.append(AnnotationKind::Reply, Some(text)).await?;
        log::info!("ghost reply saved on {}", self.entity_id);
        self.sorted(AnnotationKind::Reply).await
    }

    pub async fn retweet(&self) -> Result<Vec<IndexedRecord>> {
        self.append(AnnotationKind::Retweet, None).await?;
        self.sorted(AnnotationKind::Retweet).await
    }

    pub async fn like(&self) -> Result<Vec<IndexedRecord>> {
        self.append(AnnotationKind::Like, None).await?;
        self.sorted(AnnotationKind::Like).await
    }

    /// First step of a delete. `index` is the row's `IndexedRecord::index`,
    /// not its displayed position. Nothing happens until confirmed.
    pub fn request_delete(&self, kind: AnnotationKind, index: usize) -> PendingDelete<'_> {
        PendingDelete {
            widget: self,
            kind,
            index,
        }
    }

    pub async fn render(&self) -> Result<WidgetView> {
        Ok(WidgetView {
            entity_id: self.entity_id.clone(),
            group_name: self.session.current_group().await.map(|g| g.name),
            replies: self.sorted(AnnotationKind::Reply).await?,
            retweets: self.sorted(AnnotationKind::Retweet).await?,
            likes: self.sorted(AnnotationKind::Like).await?,
        })
    }

    async fn append(&self, kind: AnnotationKind, text: Option<String>) -> Result<usize> {
        let (author, group) = self.session.resolve_author().await;
        let record = AnnotationRecord::new(kind, &self.entity_id, text, author, group.as_ref());
        self.store.append(kind, &self.entity_id, record).await
    }

    async fn sorted(&self, kind: AnnotationKind) -> Result<Vec<IndexedRecord>> {
        let records = self.store.list(kind, &self.entity_id).await?;
        Ok(index_newest_first(records))
    }
}

/// A delete awaiting explicit confirmation. Dropping it cancels the delete.
#[must_use = "a pending delete does nothing until confirmed"]
pub struct PendingDelete<'a> {
    widget: &'a AnnotationWidget,
    kind: AnnotationKind,
    index: usize,
}

impl PendingDelete<'_> {
    /// `index` addresses the bucket in insertion order.
    pub async fn confirm(self) -> Result<AnnotationRecord> {
        let removed = self
            .widget
            .store
            .delete_at(self.kind, &self.widget.entity_id, self.index)
            .await?;
        log::info!("deleted {} #{} on {}", self.kind, self.index, self.widget.entity_id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::models::Author;
    use crate::session::tests::session_with;
    use crate::traits::KvBackend;

    async fn widget(entity_id: &str) -> AnnotationWidget {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        let store = Arc::new(AnnotationStore::new(Arc::clone(&backend)));
        let session = Arc::new(session_with(backend).await);
        AnnotationWidget::new(entity_id, store, session)
    }

    #[test]
    fn test_char_budget_thresholds() {
        assert_eq!(CharBudget::for_len(250), CharBudget::Ok);
        assert_eq!(CharBudget::for_len(251), CharBudget::Warning);
        assert_eq!(CharBudget::for_len(280), CharBudget::Warning);
        assert_eq!(CharBudget::for_len(281), CharBudget::Over);
    }

    #[test]
    fn test_sanitize_counts_utf16_units() {
        let emoji = "😀".repeat(141);
        assert_eq!(text_len(&emoji), 282);
        assert_eq!(text_len(&sanitize_reply(&emoji)), 280);
        assert_eq!(sanitize_reply("  hi  "), "hi");
    }

    #[tokio::test]
    async fn test_anonymous_reply() {
        let widget = widget("12345").await;
        let replies = widget.submit_reply("nice").await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].index, 0);
        assert_eq!(replies[0].record.text.as_deref(), Some("nice"));
        assert_eq!(replies[0].record.author, Author::Anonymous);
        assert!(replies[0].record.group_id.is_none());
    }

    #[tokio::test]
    async fn test_reply_length_boundary() {
        let widget = widget("1").await;
        let exact = "a".repeat(280);
        let replies = widget.submit_reply(&exact).await.unwrap();
        assert_eq!(replies[0].record.text.as_deref(), Some(exact.as_str()));

        let over = "a".repeat(281);
        assert!(matches!(
            widget.submit_reply(&over).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(widget.submit_reply("   ").await.is_err());
        assert_eq!(widget.render().await.unwrap().replies.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_clears_draft_only_on_success() {
        let mut widget = widget("1").await;
        assert_eq!(widget.set_draft("x".repeat(300)), CharBudget::Over);
        assert!(widget.submit().await.is_err());
        assert_eq!(text_len(widget.draft()), 300);

        widget.set_draft("  ok  ");
        widget.submit().await.unwrap();
        assert!(widget.draft().is_empty());
    }

    #[tokio::test]
    async fn test_reactions_and_confirmed_delete() {
        let widget = widget("77").await;
        widget.retweet().await.unwrap();
        widget.like().await.unwrap();
        widget.like().await.unwrap();

        let view = widget.render().await.unwrap();
        assert_eq!(view.retweets.len(), 1);
        assert_eq!(view.likes.len(), 2);
        assert!(view.likes.iter().all(|r| r.record.text.is_none()));

        drop(widget.request_delete(AnnotationKind::Like, 0));
        assert_eq!(widget.render().await.unwrap().likes.len(), 2);

        widget.request_delete(AnnotationKind::Like, 0).confirm().await.unwrap();
        assert_eq!(widget.render().await.unwrap().likes.len(), 1);

        let err = widget
            .request_delete(AnnotationKind::Retweet, 5)
            .confirm()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IndexOutOfRange { .. }));
    }

    #[tokio::test]
    async fn test_delete_top_row_removes_newest() {
        let widget = widget("42").await;
        widget.submit_reply("older").await.unwrap();
        let rows = widget.submit_reply("newer").await.unwrap();
        assert_eq!(rows[0].record.text.as_deref(), Some("newer"));
        assert_eq!(rows[0].index, 1);

        let removed = widget
            .request_delete(AnnotationKind::Reply, rows[0].index)
            .confirm()
            .await
            .unwrap();
        assert_eq!(removed.text.as_deref(), Some("newer"));

        let left = widget.render().await.unwrap().replies;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].index, 0);
        assert_eq!(left[0].record.text.as_deref(), Some("older"));
    }

    #[test]
    fn test_row_index_survives_sort() {
        let reply_aged = |text: &str, age: i64| {
            let mut record = AnnotationRecord::new(
                AnnotationKind::Reply,
                "1",
                Some(text.to_string()),
                Author::Anonymous,
                None,
            );
            record.timestamp = chrono::Utc::now() - chrono::Duration::minutes(age);
            record
        };
        let rows = index_newest_first(vec![reply_aged("a", 5), reply_aged("b", 30), reply_aged("c", 1)]);
        let order: Vec<(usize, &str)> = rows
            .iter()
            .map(|r| (r.index, r.record.text.as_deref().unwrap_or_default()))
            .collect();
        assert_eq!(order, vec![(2, "c"), (0, "a"), (1, "b")]);
    }
}
