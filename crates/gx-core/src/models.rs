//! # Domain Models
//!
//! These structs represent the core entities of GhostX.
//! Field names serialize in camelCase so persisted values keep the layout the
//! extension has always written (`ghost-reply-<id>`, `currentGroup`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Maximum length of a ghost reply, in UTF-16 code units.
pub const MAX_REPLY_LEN: usize = 280;

/// Length past which the draft counter turns into a warning.
pub const REPLY_WARN_LEN: usize = 250;

/// The three kinds of ghost annotation a user can leave on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Reply,
    Retweet,
    Like,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 3] = [Self::Reply, Self::Retweet, Self::Like];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Retweet => "retweet",
            Self::Like => "like",
        }
    }

    /// Storage key prefix shared by every bucket of this kind.
    pub fn key_prefix(self) -> String {
        format!("ghost-{}-", self.as_str())
    }

    /// Storage key of the bucket holding this kind's records for one entity.
    pub fn bucket_key(self, entity_id: &str) -> String {
        format!("ghost-{}-{}", self.as_str(), entity_id)
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationKind {
    type Err = AppError;

    /// Accepts both the singular and the plural route form ("likes").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reply" | "replies" => Ok(Self::Reply),
            "retweet" | "retweets" => Ok(Self::Retweet),
            "like" | "likes" => Ok(Self::Like),
            _ => Err(AppError::ValidationError(format!("unknown annotation kind: {s}"))),
        }
    }
}

/// Who an annotation is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Author {
    /// No identity and no group.
    Anonymous,
    /// A logged-in identity.
    Authenticated {
        name: String,
        handle: String,
        avatar: String,
        verified: bool,
    },
    /// Placeholder used when the client belongs to a group but is not logged in.
    GroupMember,
}

impl Author {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::Authenticated { name, .. } => name,
            Self::GroupMember => "Group member",
        }
    }

    pub fn handle(&self) -> Option<&str> {
        match self {
            Self::Authenticated { handle, .. } if !handle.is_empty() => Some(handle),
            _ => None,
        }
    }

    pub fn avatar(&self) -> Option<&str> {
        match self {
            Self::Authenticated { avatar, .. } if !avatar.is_empty() => Some(avatar),
            _ => None,
        }
    }
}

impl From<&Identity> for Author {
    fn from(identity: &Identity) -> Self {
        Self::Authenticated {
            name: identity.name.clone(),
            handle: identity.handle.clone(),
            avatar: identity.avatar.clone(),
            verified: identity.verified,
        }
    }
}

/// A single locally stored reply, retweet or like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub kind: AnnotationKind,
    pub entity_id: String,
    /// Present only for replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    pub author: Author,
}

impl AnnotationRecord {
    /// Builds a record stamped with the current time.
    ///
    /// `text` is dropped for retweets and likes.
    pub fn new(
        kind: AnnotationKind,
        entity_id: impl Into<String>,
        text: Option<String>,
        author: Author,
        group: Option<&Group>,
    ) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            text: if kind == AnnotationKind::Reply { text } else { None },
            timestamp: Utc::now(),
            group_id: group.map(|g| g.id.clone()),
            group_name: group.map(|g| g.name.clone()),
            author,
        }
    }
}

/// Author block scraped from a feed card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EntityAuthor {
    pub name: String,
    pub handle: String,
}

impl EntityAuthor {
    /// Key used when ranking authors: the handle, falling back to the name.
    pub fn ranking_key(&self) -> Option<&str> {
        if !self.handle.is_empty() {
            Some(&self.handle)
        } else if !self.name.is_empty() {
            Some(&self.name)
        } else {
            None
        }
    }
}

/// Passive record of the first time an entity scrolled past.
///
/// `view_count` is always 1: only the first sighting is stored and repeat
/// views never touch the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedEntity {
    pub entity_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: Option<EntityAuthor>,
    #[serde(default)]
    pub has_images: bool,
    #[serde(default)]
    pub has_links: bool,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub retweets: u64,
    #[serde(default)]
    pub replies: u64,
    pub timestamp: DateTime<Utc>,
    pub view_count: u32,
}

impl ViewedEntity {
    pub fn storage_key(entity_id: &str) -> String {
        format!("{}{}", VIEWED_PREFIX, entity_id)
    }
}

/// Storage key prefix of passive view records.
pub const VIEWED_PREFIX: &str = "viewed-tweet-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// An ad hoc collaboration context identified by a shareable invite code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Six characters from `A-Z0-9`. Not guaranteed to be unique.
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
    pub members: Vec<Member>,
}

/// The logged-in (mock) account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub avatar: String,
    pub verified: bool,
    pub login_time: DateTime<Utc>,
}

/// Global feed settings, also the payload of the `settingsChanged` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub ghost_mode_enabled: bool,
    #[serde(default)]
    pub filter_keyword: String,
}

impl Settings {
    /// Case-insensitive keyword filter. With ghost mode off, or no keyword,
    /// every card stays visible.
    pub fn is_visible(&self, text: &str) -> bool {
        if !self.ghost_mode_enabled || self.filter_keyword.is_empty() {
            return true;
        }
        text.to_lowercase().contains(&self.filter_keyword.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keys() {
        assert_eq!(AnnotationKind::Reply.bucket_key("123"), "ghost-reply-123");
        assert_eq!(AnnotationKind::Like.key_prefix(), "ghost-like-");
        assert_eq!("likes".parse::<AnnotationKind>().unwrap(), AnnotationKind::Like);
        assert_eq!("replies".parse::<AnnotationKind>().unwrap(), AnnotationKind::Reply);
        assert!("boost".parse::<AnnotationKind>().is_err());
    }

    #[test]
    fn test_kind_accepts_one_plural_suffix() {
        assert_eq!("Retweets".parse::<AnnotationKind>().unwrap(), AnnotationKind::Retweet);
        assert_eq!("like".parse::<AnnotationKind>().unwrap(), AnnotationKind::Like);
        for raw in ["likesss", "retweetsss", "replie", "replys", ""] {
            assert!(raw.parse::<AnnotationKind>().is_err(), "{raw} parsed");
        }
    }

    #[test]
    fn test_author_serializes_with_type_tag() {
        let json = serde_json::to_value(Author::Anonymous).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "anonymous" }));

        let json = serde_json::to_value(Author::GroupMember).unwrap();
        assert_eq!(json["type"], "group-member");
    }

    #[test]
    fn test_reaction_drops_text() {
        let record = AnnotationRecord::new(
            AnnotationKind::Like,
            "42",
            Some("ignored".into()),
            Author::Anonymous,
            None,
        );
        assert!(record.text.is_none());
        assert!(record.group_id.is_none());
    }

    #[test]
    fn test_settings_visibility() {
        let mut settings = Settings::default();
        assert!(settings.is_visible("anything"));

        settings.ghost_mode_enabled = true;
        settings.filter_keyword = "Rust".into();
        assert!(settings.is_visible("I love rust"));
        assert!(!settings.is_visible("I love go"));

        settings.filter_keyword.clear();
        assert!(settings.is_visible("I love go"));
    }
}
