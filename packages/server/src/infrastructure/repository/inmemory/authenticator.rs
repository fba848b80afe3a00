//! InMemory Authenticator 実装
//!
//! トークンと Identity の対応表を保持するだけの Authenticator。
//! 資格情報の発行は外部の責務であり、ここでは検証のみを行います。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{AuthError, Authenticator, Identity};

#[derive(Default)]
pub struct InMemoryAuthenticator {
    tokens: RwLock<HashMap<String, Identity>>,
}

impl InMemoryAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: impl IntoIterator<Item = (String, Identity)>) -> Self {
        Self {
            tokens: RwLock::new(tokens.into_iter().collect()),
        }
    }

    pub async fn register(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.write().await.insert(token.into(), identity);
    }

    /// トークンを失効させる（既存の接続には影響しない）
    pub async fn revoke(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token).is_some()
    }
}

#[async_trait]
impl Authenticator for InMemoryAuthenticator {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
