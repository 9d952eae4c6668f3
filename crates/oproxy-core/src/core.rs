use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use oproxy_provider_core::Provider;

use crate::handler::{chat_completions_handler, health_handler};

pub struct CoreState {
    pub provider: Arc<dyn Provider>,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            state: Arc::new(CoreState { provider }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/chat/completions", post(chat_completions_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> Arc<CoreState> {
        self.state.clone()
    }
}
