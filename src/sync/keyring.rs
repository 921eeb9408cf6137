use std::collections::HashMap;

use super::{SyncError, SyncResult};

pub(crate) const SERVICE_NAME: &str = "tally";

/// Secrets the app keeps in the system keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    /// Key for the report-summary model.
    AnthropicKey,
    /// Bearer token for the todos API.
    ApiToken,
}

impl SecretKind {
    fn server(&self) -> &'static str {
        match self {
            Self::AnthropicKey => "anthropic-api",
            Self::ApiToken => "todo-api",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::AnthropicKey => "Tally Anthropic API Key",
            Self::ApiToken => "Tally API Token",
        }
    }

    /// Environment variable consulted before the keyring.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::AnthropicKey => "ANTHROPIC_API_KEY",
            Self::ApiToken => "TALLY_API_TOKEN",
        }
    }
}

fn keyring_err(action: &str, e: impl std::fmt::Display) -> SyncError {
    SyncError::Keyring(format!("Failed to {}: {}", action, e))
}

/// Store a secret in the system keyring via Secret Service, replacing any
/// previous value.
pub async fn store_secret(kind: SecretKind, secret: &str) -> SyncResult<()> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| keyring_err("connect to keyring", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", kind.server());

    keyring
        .create_item(kind.label(), &attrs, secret.as_bytes(), true)
        .await
        .map_err(|e| keyring_err("store secret", e))?;

    Ok(())
}

/// Load a secret from the system keyring.
pub async fn load_secret(kind: SecretKind) -> SyncResult<Option<String>> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| keyring_err("connect to keyring", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", kind.server());

    let items = keyring
        .search_items(&attrs)
        .await
        .map_err(|e| keyring_err("search keyring", e))?;

    if let Some(item) = items.first() {
        let secret_bytes = item
            .secret()
            .await
            .map_err(|e| keyring_err("read secret", e))?;
        let secret = String::from_utf8(secret_bytes.to_vec())
            .map_err(|e| keyring_err("decode secret", e))?;
        if !secret.is_empty() {
            return Ok(Some(secret));
        }
    }

    Ok(None)
}

/// Environment first, then the keyring.
pub async fn resolve_secret(kind: SecretKind) -> SyncResult<Option<String>> {
    if let Some(value) = secret_from_env(kind) {
        return Ok(Some(value));
    }
    load_secret(kind).await
}

fn secret_from_env(kind: SecretKind) -> Option<String> {
    std::env::var(kind.env_var())
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_use_distinct_slots() {
        assert_ne!(SecretKind::AnthropicKey.server(), SecretKind::ApiToken.server());
        assert_ne!(
            SecretKind::AnthropicKey.env_var(),
            SecretKind::ApiToken.env_var()
        );
    }
}
