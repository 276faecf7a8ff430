//! Session context - the store selected for this run and the expense id source.
//!
//! The store is chosen once, when the session opens: an access token selects the remote
//! spreadsheet store, no token selects the local fallback. Ledger operations take the
//! session explicitly instead of consulting global state.

use super::{LedgerStore, LocalStore, RemoteStore, SheetsClient, StoreKind};
use crate::{
    config::AppConfig,
    entities::ExpenseId,
    errors::Result,
};
use chrono::{DateTime, Utc};
use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};
use tracing::{info, warn};

/// Hands out millisecond-timestamp ids that never repeat within the process.
#[derive(Debug, Default)]
pub struct IdMinter {
    last: AtomicI64,
}

impl IdMinter {
    /// Id for an expense created at `now`. Bumps past the last id if the clock did not advance.
    pub fn next(&self, now: DateTime<Utc>) -> ExpenseId {
        let millis = now.timestamp_millis();
        let previous = match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(millis.max(last + 1))
            }) {
            Ok(previous) | Err(previous) => previous,
        };
        ExpenseId::new(millis.max(previous + 1).to_string())
    }
}

/// Everything a ledger operation needs for the current session.
pub struct Session {
    store: Arc<dyn LedgerStore>,
    ids: IdMinter,
}

impl Session {
    /// Opens a session, choosing the remote store when an access token is present.
    ///
    /// Header setup failures on the remote tables are logged and do not stop the session.
    pub async fn open(config: &AppConfig, access_token: Option<String>) -> Result<Self> {
        let defaults = config.budget.defaults()?;

        let store: Arc<dyn LedgerStore> = match access_token.filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                let client = SheetsClient::new(config.remote.clone(), token)?;
                let remote = RemoteStore::new(client, defaults);
                if let Err(e) = remote.ensure_tables().await {
                    warn!("Failed to prepare remote tables: {}", e);
                }
                Arc::new(remote)
            }
            None => Arc::new(LocalStore::new(config.local.document_path(), defaults)),
        };

        info!("Opened session with {} store.", store.kind());
        Ok(Self::with_store(store))
    }

    /// Session over an already constructed store.
    #[must_use]
    pub fn with_store(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            ids: IdMinter::default(),
        }
    }

    /// The active store.
    #[must_use]
    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    /// Which backend the session writes to.
    #[must_use]
    pub fn kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Mints the id for an expense created at `now`.
    pub fn next_id(&self, now: DateTime<Utc>) -> ExpenseId {
        self.ids.next(now)
    }
}
