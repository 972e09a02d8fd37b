//! # Feed Observer
//!
//! Consumes "entity discovered" batches from whatever renders the feed and
//! makes sure each card is handled exactly once: keyword filter, passive view
//! record, widget mount. The observer never looks at markup; the renderer
//! hands over an `EntityCard` and the id is recovered through an ordered chain
//! of `EntityIdStrategy` implementations.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{EntityAuthor, Settings, ViewedEntity};
use crate::session::Session;
use crate::store::AnnotationStore;

/// Renderer-side handle of a card; stable for the lifetime of the card.
pub type NodeId = u64;

/// Everything the renderer can tell us about one card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCard {
    pub node_id: NodeId,
    #[serde(default)]
    pub text: String,
    /// Every `href` found inside the card.
    #[serde(default)]
    pub links: Vec<String>,
    /// Value of an explicit entity-id attribute, if the card carries one.
    #[serde(default)]
    pub data_entity_id: Option<String>,
    /// URL of the page the card was rendered on.
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub author: Option<EntityAuthor>,
    #[serde(default)]
    pub has_images: bool,
    /// Raw labels of the engagement buttons, e.g. "12 Likes".
    #[serde(default)]
    pub like_label: Option<String>,
    #[serde(default)]
    pub retweet_label: Option<String>,
    #[serde(default)]
    pub reply_label: Option<String>,
}

impl EntityCard {
    fn to_view(&self, entity_id: &str) -> ViewedEntity {
        ViewedEntity {
            entity_id: entity_id.to_string(),
            text: self.text.clone(),
            author: self.author.clone(),
            has_images: self.has_images,
            has_links: self.links.iter().any(|href| href.starts_with("http")),
            likes: parse_engagement(self.like_label.as_deref()),
            retweets: parse_engagement(self.retweet_label.as_deref()),
            replies: parse_engagement(self.reply_label.as_deref()),
            timestamp: Utc::now(),
            view_count: 1,
        }
    }
}

/// First run of ASCII digits in an engagement label; 0 when there is none.
pub fn parse_engagement(label: Option<&str>) -> u64 {
    let Some(label) = label else { return 0 };
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Entity ids are non-empty all-digit strings.
pub fn is_valid_entity_id(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// One way of recovering an entity id from a card.
pub trait EntityIdStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    /// Returns a validated id, or `None` when this strategy does not match.
    fn extract(&self, card: &EntityCard) -> Option<String>;
}

/// `/<user>/status/<id>?...` inside any link of the card.
pub struct StatusLinkStrategy;

impl EntityIdStrategy for StatusLinkStrategy {
    fn name(&self) -> &'static str {
        "status-link"
    }

    fn extract(&self, card: &EntityCard) -> Option<String> {
        card.links
            .iter()
            .filter(|href| href.contains("/status/"))
            .find_map(|href| {
                let mut segments = href.split('/');
                segments.find(|s| *s == "status")?;
                let id = segments.next()?.split('?').next()?;
                is_valid_entity_id(id).then(|| id.to_string())
            })
    }
}

/// Explicit id attribute on the card.
pub struct DataAttributeStrategy;

impl EntityIdStrategy for DataAttributeStrategy {
    fn name(&self) -> &'static str {
        "data-attribute"
    }

    fn extract(&self, card: &EntityCard) -> Option<String> {
        let id = card.data_entity_id.as_deref()?.trim();
        is_valid_entity_id(id).then(|| id.to_string())
    }
}

/// The page itself is a single-entity view (`.../status/<id>/...`).
pub struct PageUrlStrategy;

impl EntityIdStrategy for PageUrlStrategy {
    fn name(&self) -> &'static str {
        "page-url"
    }

    fn extract(&self, card: &EntityCard) -> Option<String> {
        let url = card.page_url.as_deref()?;
        let (_, rest) = url.split_once("/status/")?;
        let id = rest.split('?').next()?.split('/').next()?;
        is_valid_entity_id(id).then(|| id.to_string())
    }
}

/// Link, then attribute, then page URL.
pub fn default_strategies() -> Vec<Box<dyn EntityIdStrategy>> {
    vec![
        Box::new(StatusLinkStrategy),
        Box::new(DataAttributeStrategy),
        Box::new(PageUrlStrategy),
    ]
}

/// What happened to one newly processed card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardOutcome {
    pub node_id: NodeId,
    pub entity_id: Option<String>,
    pub visible: bool,
    /// A widget was mounted for this card during this batch.
    pub mounted: bool,
    /// This card produced the entity's first view record.
    pub view_recorded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub node_id: NodeId,
    pub visible: bool,
}

struct ProcessedCard {
    text: String,
    mounted_entity: Option<String>,
}

pub struct FeedObserver {
    store: Arc<AnnotationStore>,
    session: Arc<Session>,
    strategies: Vec<Box<dyn EntityIdStrategy>>,
    processed: HashMap<NodeId, ProcessedCard>,
}

impl FeedObserver {
    pub fn new(store: Arc<AnnotationStore>, session: Arc<Session>) -> Self {
        Self::with_strategies(store, session, default_strategies())
    }

    pub fn with_strategies(
        store: Arc<AnnotationStore>,
        session: Arc<Session>,
        strategies: Vec<Box<dyn EntityIdStrategy>>,
    ) -> Self {
        Self {
            store,
            session,
            strategies,
            processed: HashMap::new(),
        }
    }

    pub fn extract_entity_id(&self, card: &EntityCard) -> Option<String> {
        self.strategies.iter().find_map(|strategy| {
            let id = strategy.extract(card)?;
            log::trace!("node {} resolved to {id} via {}", card.node_id, strategy.name());
            Some(id)
        })
    }

    pub fn is_mounted(&self, node_id: NodeId) -> bool {
        self.processed
            .get(&node_id)
            .is_some_and(|card| card.mounted_entity.is_some())
    }

    /// Handles one insertion batch. Cards seen before are skipped, so the
    /// returned outcomes cover only cards processed for the first time.
    ///
    /// A failed view write is logged and does not stop the batch.
    pub async fn process_batch(&mut self, cards: Vec<EntityCard>) -> Vec<CardOutcome> {
        let settings = self.session.settings().await;
        let mut outcomes = Vec::new();

        for card in cards {
            if self.processed.contains_key(&card.node_id) {
                continue;
            }
            let visible = settings.is_visible(&card.text);
            let entity_id = self.extract_entity_id(&card);

            let mut view_recorded = false;
            let mut mounted = false;
            if let Some(id) = &entity_id {
                match self.store.record_view_once(&card.to_view(id)).await {
                    Ok(wrote) => view_recorded = wrote,
                    Err(e) => log::error!("failed to record view of {id}: {e}"),
                }
                mounted = true;
            } else {
                log::debug!("no entity id for node {}, skipping widget", card.node_id);
            }

            self.processed.insert(
                card.node_id,
                ProcessedCard {
                    text: card.text,
                    mounted_entity: entity_id.clone(),
                },
            );
            outcomes.push(CardOutcome {
                node_id: card.node_id,
                entity_id,
                visible,
                mounted,
                view_recorded,
            });
        }

        log::debug!("processed {} new cards ({} tracked)", outcomes.len(), self.processed.len());
        outcomes
    }

    /// Drops nodes that left the feed. A forgotten node is treated as new if
    /// it shows up again. Returns how many were tracked.
    pub fn forget(&mut self, node_ids: &[NodeId]) -> usize {
        let forgotten = node_ids
            .iter()
            .filter(|node_id| self.processed.remove(*node_id).is_some())
            .count();
        log::debug!("forgot {forgotten} removed cards ({} tracked)", self.processed.len());
        forgotten
    }

    pub fn tracked(&self) -> usize {
        self.processed.len()
    }

    /// Applies a `settingsChanged` message: persists the settings and
    /// re-filters every card processed so far, mounted ones included.
    pub async fn apply_settings(&mut self, settings: Settings) -> Result<Vec<Visibility>> {
        self.session.update_settings(settings.clone()).await?;
        let mut visibility: Vec<Visibility> = self
            .processed
            .iter()
            .map(|(node_id, card)| Visibility {
                node_id: *node_id,
                visible: settings.is_visible(&card.text),
            })
            .collect();
        visibility.sort_by_key(|v| v.node_id);
        log::info!(
            "settings changed (ghost mode: {}), re-filtered {} cards",
            settings.ghost_mode_enabled,
            visibility.len()
        );
        Ok(visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::session::tests::session_with;
    use crate::traits::KvBackend;
    use chrono::Duration;

    fn card(node_id: NodeId, text: &str, link: &str) -> EntityCard {
        EntityCard {
            node_id,
            text: text.into(),
            links: vec![link.into()],
            ..Default::default()
        }
    }

    async fn observer() -> (FeedObserver, Arc<AnnotationStore>) {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        let store = Arc::new(AnnotationStore::new(Arc::clone(&backend)));
        let session = Arc::new(session_with(backend).await);
        (FeedObserver::new(Arc::clone(&store), session), store)
    }

    #[test]
    fn test_extraction_chain_order_and_validation() {
        let link = EntityCard {
            links: vec!["/alice/status/123?s=20".into()],
            data_entity_id: Some("456".into()),
            ..Default::default()
        };
        let attr = EntityCard {
            links: vec!["/alice/status/abc".into()],
            data_entity_id: Some("456".into()),
            ..Default::default()
        };
        let page = EntityCard {
            page_url: Some("https://x.com/bob/status/789/photo/1".into()),
            ..Default::default()
        };
        let none = EntityCard {
            links: vec!["/home".into()],
            data_entity_id: Some("12a".into()),
            page_url: Some("https://x.com/home".into()),
            ..Default::default()
        };

        let chain = default_strategies();
        let extract = |c: &EntityCard| chain.iter().find_map(|s| s.extract(c));
        assert_eq!(extract(&link).as_deref(), Some("123"));
        assert_eq!(extract(&attr).as_deref(), Some("456"));
        assert_eq!(extract(&page).as_deref(), Some("789"));
        assert_eq!(extract(&none), None);
    }

    #[test]
    fn test_parse_engagement() {
        assert_eq!(parse_engagement(Some("1,204 Likes")), 1);
        assert_eq!(parse_engagement(Some("37 replies")), 37);
        assert_eq!(parse_engagement(Some("Like")), 0);
        assert_eq!(parse_engagement(None), 0);
    }

    #[tokio::test]
    async fn test_batch_processes_each_node_once() {
        let (mut observer, store) = observer().await;
        let batch = vec![card(1, "hello", "/a/status/100"), card(2, "no id", "/explore")];

        let outcomes = observer.process_batch(batch.clone()).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].mounted && outcomes[0].view_recorded);
        assert_eq!(outcomes[1].entity_id, None);
        assert!(!outcomes[1].mounted && !outcomes[1].view_recorded);

        assert!(observer.process_batch(batch).await.is_empty());
        assert!(observer.is_mounted(1));
        assert!(!observer.is_mounted(2));

        let views = store.viewed_since(Utc::now() - Duration::hours(1)).await.unwrap();
        assert_eq!(views.len(), 1);
    }

    #[tokio::test]
    async fn test_second_card_for_same_entity_keeps_first_view() {
        let (mut observer, store) = observer().await;
        observer.process_batch(vec![card(1, "first", "/a/status/5")]).await;
        let outcomes = observer.process_batch(vec![card(2, "second", "/a/status/5")]).await;

        assert!(outcomes[0].mounted);
        assert!(!outcomes[0].view_recorded);
        let views = store.viewed_since(Utc::now() - Duration::hours(1)).await.unwrap();
        assert_eq!(views[0].text, "first");
    }

    #[tokio::test]
    async fn test_settings_change_refilters_processed_cards() {
        let (mut observer, _) = observer().await;
        observer
            .process_batch(vec![card(1, "Rust is great", "/a/status/1"), card(2, "Go is fine", "/a/status/2")])
            .await;

        let visibility = observer
            .apply_settings(Settings {
                ghost_mode_enabled: true,
                filter_keyword: "RUST".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            visibility,
            vec![
                Visibility { node_id: 1, visible: true },
                Visibility { node_id: 2, visible: false },
            ]
        );

        let outcomes = observer.process_batch(vec![card(3, "more go", "/a/status/3")]).await;
        assert!(!outcomes[0].visible);

        let visibility = observer.apply_settings(Settings::default()).await.unwrap();
        assert!(visibility.iter().all(|v| v.visible));
    }

    #[tokio::test]
    async fn test_forget_removed_nodes() {
        let (mut observer, _) = observer().await;
        let batch = vec![card(1, "one", "/a/status/10"), card(2, "two", "/a/status/20")];
        observer.process_batch(batch.clone()).await;
        assert_eq!(observer.tracked(), 2);

        assert_eq!(observer.forget(&[1, 99]), 1);
        assert_eq!(observer.tracked(), 1);
        assert!(!observer.is_mounted(1));
        assert!(observer.is_mounted(2));

        let visibility = observer.apply_settings(Settings::default()).await.unwrap();
        assert_eq!(visibility, vec![Visibility { node_id: 2, visible: true }]);

        let outcomes = observer.process_batch(batch).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].node_id, 1);
        assert!(outcomes[0].mounted);
        assert!(!outcomes[0].view_recorded);
        assert!(observer.is_mounted(1));
    }
}
