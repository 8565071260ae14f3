use std::sync::Arc;

use eatery_core::store::DocumentStore;

use crate::{
    auth::TokenVerifier,
    config::{AuthConfig, ConfigError},
};

/// Shared, immutable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: DocumentStore,
    pub tokens: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(store: DocumentStore, auth: &AuthConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            store,
            tokens: Arc::new(TokenVerifier::new(auth)?),
        })
    }
}
