//! # Session
//!
//! Owns the client-wide state: the logged-in identity, the current group and
//! the feed settings. Components receive an `Arc<Session>` instead of reading
//! globals. Every setter writes through to the backend so a restart picks the
//! state back up.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{Author, Group, Identity, Member, MemberRole, Settings};
use crate::traits::{IdentityProvider, KvBackend};

const IDENTITY_KEY: &str = "twitterUser";
const GROUP_KEY: &str = "currentGroup";
const GHOST_MODE_KEY: &str = "ghostModeEnabled";
const KEYWORD_KEY: &str = "filterKeyword";

/// Point-in-time copy of the session, handed to renderers and the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub group: Option<Group>,
    pub settings: Settings,
}

pub struct Session {
    backend: Arc<dyn KvBackend>,
    provider: Arc<dyn IdentityProvider>,
    identity: RwLock<Option<Identity>>,
    group: RwLock<Option<Group>>,
    settings: RwLock<Settings>,
}

impl Session {
    /// Restores persisted state. Unreadable entries fall back to their defaults.
    pub async fn load(backend: Arc<dyn KvBackend>, provider: Arc<dyn IdentityProvider>) -> Self {
        let identity = read_or_default::<Option<Identity>>(&*backend, IDENTITY_KEY).await;
        let group = read_or_default::<Option<Group>>(&*backend, GROUP_KEY).await;
        let settings = Settings {
            ghost_mode_enabled: read_or_default(&*backend, GHOST_MODE_KEY).await,
            filter_keyword: read_or_default(&*backend, KEYWORD_KEY).await,
        };
        log::info!(
            "session loaded (identity: {}, group: {}, ghost mode: {})",
            identity.is_some(),
            group.is_some(),
            settings.ghost_mode_enabled
        );

        Self {
            backend,
            provider,
            identity: RwLock::new(identity),
            group: RwLock::new(group),
            settings: RwLock::new(settings),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            identity: self.identity.read().await.clone(),
            group: self.group.read().await.clone(),
            settings: self.settings.read().await.clone(),
        }
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.identity.read().await.clone()
    }

    pub async fn current_group(&self) -> Option<Group> {
        self.group.read().await.clone()
    }

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Author attribution for a new annotation: identity first, then group
    /// membership, then anonymous. The group is returned for labelling.
    pub async fn resolve_author(&self) -> (Author, Option<Group>) {
        let group = self.current_group().await;
        let author = match (self.identity().await, &group) {
            (Some(identity), _) => Author::from(&identity),
            (None, Some(_)) => Author::GroupMember,
            (None, None) => Author::Anonymous,
        };
        (author, group)
    }

    pub async fn login(&self) -> Result<Identity> {
        let identity = self
            .provider
            .login()
            .await
            .map_err(|e| AppError::Internal(format!("login failed: {e}")))?;
        self.write(IDENTITY_KEY, serde_json::to_value(&identity)?).await?;
        *self.identity.write().await = Some(identity.clone());
        log::info!("logged in as {}", identity.handle);
        Ok(identity)
    }

    pub async fn logout(&self) -> Result<()> {
        self.remove(IDENTITY_KEY).await?;
        *self.identity.write().await = None;
        Ok(())
    }

    /// Creates a group with the caller as its only (admin) member and makes it current.
    pub async fn create_group(&self, name: &str) -> Result<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("group name is required".into()));
        }
        let now = Utc::now();
        let millis = now.timestamp_millis();
        let group = Group {
            id: format!("group_{millis}"),
            name: name.to_string(),
            invite_code: self.provider.generate_invite_code(),
            created_at: now,
            members: vec![Member {
                id: format!("admin_{millis}"),
                name: "Admin".into(),
                role: MemberRole::Admin,
                joined_at: now,
            }],
        };
        self.replace_group(group).await
    }

    /// Joins the group behind `invite_code`, replacing any current group.
    pub async fn join_group(&self, invite_code: &str) -> Result<Group> {
        let code = invite_code.trim().to_uppercase();
        if code.is_empty() {
            return Err(AppError::ValidationError("invite code is required".into()));
        }
        let group = self
            .provider
            .resolve_invite(&code)
            .await
            .map_err(|e| AppError::NotFound("group".into(), format!("{code} ({e})")))?;
        self.replace_group(group).await
    }

    pub async fn leave_group(&self) -> Result<Group> {
        let current = self
            .current_group()
            .await
            .ok_or_else(|| AppError::NotFound("group".into(), "no current group".into()))?;
        self.remove(GROUP_KEY).await?;
        *self.group.write().await = None;
        log::info!("left group {}", current.id);
        Ok(current)
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        self.write(GHOST_MODE_KEY, Value::Bool(settings.ghost_mode_enabled)).await?;
        self.write(KEYWORD_KEY, Value::String(settings.filter_keyword.clone())).await?;
        *self.settings.write().await = settings;
        Ok(())
    }

    async fn replace_group(&self, group: Group) -> Result<Group> {
        self.write(GROUP_KEY, serde_json::to_value(&group)?).await?;
        *self.group.write().await = Some(group.clone());
        log::info!("current group is now {} ({})", group.name, group.invite_code);
        Ok(group)
    }

    async fn write(&self, key: &str, value: Value) -> Result<()> {
        self.backend.set(key, value).await.map_err(|e| {
            log::error!("failed to persist {key}: {e}");
            AppError::persistence(e)
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.backend
            .remove(&[key.to_string()])
            .await
            .map(|_| ())
            .map_err(AppError::persistence)
    }
}

async fn read_or_default<T>(backend: &dyn KvBackend, key: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match backend.get(key).await {
        Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
            log::warn!("ignoring malformed {key}: {e}");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("could not read {key}, using default: {e}");
            T::default()
        }
    }
}
