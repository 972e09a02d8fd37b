//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{Group, Identity};

/// Key-value persistence contract backing the annotation store and session.
///
/// Values are JSON documents. Implementations need not be transactional:
/// callers that read-modify-write serialize themselves per key.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    /// Inserts or replaces the value under `key`.
    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;
    /// Removes the given keys; missing keys are ignored. Returns how many existed.
    async fn remove(&self, keys: &[String]) -> anyhow::Result<usize>;
    /// Lists every key starting with `prefix`, in ascending key order.
    async fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

/// Identity and invite-code contract.
///
/// The shipped implementation is a mock: login picks a canned account.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Performs a login and returns the resulting identity.
    async fn login(&self) -> anyhow::Result<Identity>;

    /// Generates a 6-character `A-Z0-9` invite code.
    fn generate_invite_code(&self) -> String;

    /// Resolves an invite code into the group it belongs to.
    async fn resolve_invite(&self, invite_code: &str) -> anyhow::Result<Group>;
}
