//! Authentication and navigation collaborators
//!
//! Session storage and login flows live outside the engine; only the two
//! hooks the transport needs are modeled here.

use std::sync::{Arc, RwLock};

/// Supplies the bearer token and reacts to a rejected one
pub trait AuthProvider: Send + Sync {
    fn current_token(&self) -> Option<String>;

    /// Called when the backend answers 401
    fn on_unauthorized(&self);
}

/// Navigation hook used when leaving a table or after a 401
pub trait Router: Send + Sync {
    fn go_to(&self, route: &str);
}

/// Route shown when the operator leaves the current table
pub const TABLE_SELECTION_ROUTE: &str = "/dynamic-form";
/// Route used after the token is rejected
pub const LOGIN_ROUTE: &str = "/login";

/// In-memory token holder; a 401 clears the token and sends the router to login
pub struct TokenStore {
    token: RwLock<Option<String>>,
    router: Option<Arc<dyn Router>>,
}

impl TokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
            router: None,
        }
    }

    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    /// Replace the stored token with a fresh one
    pub fn save_token(&self, token: &str) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
    }

    pub fn logout(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_token().is_some()
    }
}

impl AuthProvider for TokenStore {
    fn current_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn on_unauthorized(&self) {
        tracing::warn!("token rejected by backend, clearing session");
        self.logout();
        if let Some(router) = &self.router {
            router.go_to(LOGIN_ROUTE);
        }
    }
}

/// Router that only records the last route, for headless use
#[derive(Default)]
pub struct RecordingRouter {
    routes: RwLock<Vec<String>>,
}

impl RecordingRouter {
    pub fn last_route(&self) -> Option<String> {
        self.routes.read().ok().and_then(|r| r.last().cloned())
    }
}

impl Router for RecordingRouter {
    fn go_to(&self, route: &str) {
        tracing::debug!(route, "navigate");
        if let Ok(mut routes) = self.routes.write() {
            routes.push(route.to_string());
        }
    }
}
