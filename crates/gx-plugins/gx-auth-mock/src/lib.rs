//! # gx-auth-mock
//!
//! Canned implementation of `IdentityProvider`.
//! Login picks one of three fixed accounts at random; invite codes resolve to
//! a placeholder group without contacting any server.

use async_trait::async_trait;
use chrono::Utc;
use gx_core::models::{Group, Identity, Member, MemberRole};
use gx_core::traits::IdentityProvider;
use rand::seq::SliceRandom;
use rand::Rng;

const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const INVITE_LEN: usize = 6;
const DEFAULT_AVATAR: &str =
    "https://abs.twimg.com/sticky/default_profile_images/default_profile_normal.png";

/// `(id, name, handle, verified)`
const MOCK_ACCOUNTS: [(&str, &str, &str, bool); 3] = [
    ("twitter_001", "Zhang San", "@zhangsan", true),
    ("twitter_002", "Li Si", "@lisi", false),
    ("twitter_003", "Wang Wu", "@wangwu", true),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct MockIdentityProvider;

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn login(&self) -> anyhow::Result<Identity> {
        let (id, name, handle, verified) = *MOCK_ACCOUNTS
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| anyhow::anyhow!("no mock accounts configured"))?;
        log::debug!("mock login picked {handle}");
        Ok(Identity {
            id: id.into(),
            name: name.into(),
            handle: handle.into(),
            avatar: DEFAULT_AVATAR.into(),
            verified,
            login_time: Utc::now(),
        })
    }

    fn generate_invite_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..INVITE_LEN)
            .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
            .collect()
    }

    /// Every non-empty code "exists": the group is a fixed placeholder with
    /// an owner and the caller as a new member.
    async fn resolve_invite(&self, invite_code: &str) -> anyhow::Result<Group> {
        if invite_code.is_empty() {
            anyhow::bail!("empty invite code");
        }
        let now = Utc::now();
        let millis = now.timestamp_millis();
        Ok(Group {
            id: format!("group_{millis}"),
            name: "Sample Group".into(),
            invite_code: invite_code.to_string(),
            created_at: now,
            members: vec![
                Member {
                    id: "admin_001".into(),
                    name: "Owner".into(),
                    role: MemberRole::Admin,
                    joined_at: now,
                },
                Member {
                    id: format!("member_{millis}"),
                    name: "New member".into(),
                    role: MemberRole::Member,
                    joined_at: now,
                },
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_code_shape() {
        let provider = MockIdentityProvider::new();
        for _ in 0..50 {
            let code = provider.generate_invite_code();
            assert_eq!(code.len(), INVITE_LEN);
            assert!(code.bytes().all(|b| INVITE_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_login_returns_a_canned_account() {
        let identity = MockIdentityProvider.login().await.unwrap();
        assert!(MOCK_ACCOUNTS.iter().any(|(id, _, handle, _)| *id == identity.id && *handle == identity.handle));
        assert_eq!(identity.avatar, DEFAULT_AVATAR);
    }

    #[tokio::test]
    async fn test_resolve_invite() {
        let group = MockIdentityProvider.resolve_invite("XYZ789").await.unwrap();
        assert_eq!(group.invite_code, "XYZ789");
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.members[0].role, MemberRole::Admin);
        assert!(MockIdentityProvider.resolve_invite("").await.is_err());
    }

    #[test]
    fn test_invite_codes_vary() {
        let provider = MockIdentityProvider::new();
        let codes: std::collections::HashSet<String> =
            (0..20).map(|_| provider.generate_invite_code()).collect();
        assert!(codes.len() > 1);
    }

    #[tokio::test]
    async fn test_login_reaches_every_account() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(MockIdentityProvider.login().await.unwrap().id);
        }
        assert_eq!(seen.len(), MOCK_ACCOUNTS.len());
    }
}
