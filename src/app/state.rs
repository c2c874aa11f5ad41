//! Session state - core data structures and state management
//!
//! This module contains the Session struct that ties one operator's
//! selection, form and grid together. Async operations are in the actions
//! module.

use crate::app::{FormState, ViewModel};
use crate::config::AppConfig;
use crate::db::http::ReqwestClient;
use crate::db::{
    filter_options, HttpClient, MetadataCatalog, OptionEntry, RecordRepository, RecordingRouter,
    Router, TableSnapshot, TokenStore,
};
use anyhow::Result;
use std::sync::Arc;

/// Issued when a selection starts; completions carrying an older generation
/// are discarded
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionTicket {
    pub generation: u64,
    pub schema: String,
    pub table: String,
}

/// One operator's working state
pub struct Session {
    // === Backend ===
    pub catalog: MetadataCatalog,
    pub repo: RecordRepository,
    pub router: Arc<dyn Router>,
    pub config: AppConfig,

    // === Catalog ===
    /// Known schema names
    pub schemas: Vec<String>,
    /// Tables of the schema last browsed
    pub tables: Vec<String>,
    /// Schema the `tables` list belongs to
    pub tables_schema: Option<String>,

    // === Selection ===
    /// Bumped on every selection; stale completions are dropped
    pub generation: u64,
    pub selected_schema: Option<String>,
    pub selected_table: Option<String>,
    /// Metadata of the active selection, replaced wholesale
    pub snapshot: Option<TableSnapshot>,

    // === Form ===
    pub form: FormState,
    pub is_form_ready: bool,

    // === Grid ===
    pub grid: ViewModel,

    // === UI State ===
    /// Is a load in flight?
    pub is_loading: bool,
    /// Error message
    pub error: Option<String>,
    /// Success message
    pub message: Option<String>,
}

impl Session {
    /// Create a session over any transport
    pub fn new(client: Arc<dyn HttpClient>, router: Arc<dyn Router>, config: AppConfig) -> Self {
        let grid = ViewModel {
            page_size: config.page_size.max(1),
            ..ViewModel::default()
        };
        Self {
            catalog: MetadataCatalog::new(client.clone()),
            repo: RecordRepository::new(client),
            router,
            config,
            schemas: Vec::new(),
            tables: Vec::new(),
            tables_schema: None,
            generation: 0,
            selected_schema: None,
            selected_table: None,
            snapshot: None,
            form: FormState::default(),
            is_form_ready: false,
            grid,
            is_loading: false,
            error: None,
            message: None,
        }
    }

    /// Create a session against the configured HTTP backend
    pub fn connect(config: AppConfig) -> Result<Self> {
        let router: Arc<dyn Router> = Arc::new(RecordingRouter::default());
        let auth = Arc::new(TokenStore::new(config.token.clone()).with_router(router.clone()));
        let client = ReqwestClient::new(&config, auth)?;
        Ok(Self::new(Arc::new(client), router, config))
    }

    // === Selection Helpers ===

    /// Generation is still the active one
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Options for a foreign-key or check column, narrowed by a typed prefix
    pub fn filtered_options(&self, column: &str, prefix: &str) -> Vec<&OptionEntry> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.options_for(column))
            .map(|opts| filter_options(opts, prefix))
            .unwrap_or_default()
    }

    /// Qualified name of the selected table, for status lines
    pub fn selection_label(&self) -> Option<String> {
        match (&self.selected_schema, &self.selected_table) {
            (Some(s), Some(t)) => Some(format!("{}.{}", s, t)),
            _ => None,
        }
    }

    pub(crate) fn clear_messages(&mut self) {
        self.error = None;
        self.message = None;
    }

    /// Drop everything tied to the current selection
    pub(crate) fn clear_selection(&mut self) {
        self.snapshot = None;
        self.form = FormState::default();
        self.is_form_ready = false;
        self.grid = ViewModel {
            page_size: self.config.page_size.max(1),
            ..ViewModel::default()
        };
    }
}
