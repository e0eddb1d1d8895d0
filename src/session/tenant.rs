//! Tenant (`cliente`) selection.
//!
//! A super admin can act on behalf of any tenant; everyone else is pinned to
//! the tenant on their profile. The selection is persisted under
//! `selected_cliente_id` and outlives sessions until explicitly cleared.
//!
//! Every change bumps a reload counter and is broadcast as a [`TenantChange`],
//! so views holding tenant-scoped data know to refetch. No network calls here.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use super::cache::SELECTED_CLIENTE_KEY;
use super::store::KeyValueStore;
use super::types::Profile;

const CHANGE_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantChange {
    pub cliente_id: Option<String>,
    pub reload: u64,
}

#[derive(Debug, Default)]
struct Selection {
    cliente_id: Option<String>,
    reload: u64,
    initialized: bool,
}

pub struct TenantScope {
    store: Arc<dyn KeyValueStore>,
    allow_override: bool,
    selection: Mutex<Selection>,
    changes: broadcast::Sender<TenantChange>,
}

impl TenantScope {
    /// `allow_override` gates whether a super admin's selection wins over the
    /// profile tenant in [`effective_cliente_id`](Self::effective_cliente_id).
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, allow_override: bool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { store, allow_override, selection: Mutex::new(Selection::default()), changes }
    }

    fn selection(&self) -> std::sync::MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the persisted selection, falling back to the profile's tenant.
    ///
    /// Runs once; later calls return the current selection unchanged. The
    /// fallback is not persisted.
    pub fn initialize(&self, profile_cliente_id: Option<&str>) -> Option<String> {
        let mut selection = self.selection();
        if selection.initialized {
            return selection.cliente_id.clone();
        }
        selection.initialized = true;
        selection.cliente_id = self
            .store
            .get(SELECTED_CLIENTE_KEY)
            .filter(|id| !id.trim().is_empty())
            .or_else(|| profile_cliente_id.map(str::to_owned));
        tracing::debug!(cliente_id = ?selection.cliente_id, "tenant scope initialized");
        selection.cliente_id.clone()
    }

    #[must_use]
    pub fn selected(&self) -> Option<String> {
        self.selection().cliente_id.clone()
    }

    #[must_use]
    pub fn reload_counter(&self) -> u64 {
        self.selection().reload
    }

    #[must_use]
    pub fn allow_override(&self) -> bool {
        self.allow_override
    }

    /// Select a tenant, or clear the selection with `None`.
    pub fn set_selected(&self, cliente_id: Option<String>) -> TenantChange {
        let persisted = match cliente_id.as_deref() {
            Some(id) => self.store.set(SELECTED_CLIENTE_KEY, id),
            None => self.store.remove(SELECTED_CLIENTE_KEY),
        };
        if let Err(e) = persisted {
            tracing::warn!(error = %e, "failed to persist tenant selection");
        }

        let change = {
            let mut selection = self.selection();
            selection.initialized = true;
            selection.cliente_id = cliente_id;
            selection.reload += 1;
            TenantChange { cliente_id: selection.cliente_id.clone(), reload: selection.reload }
        };
        tracing::info!(cliente_id = ?change.cliente_id, reload = change.reload, "tenant changed");
        // No subscribers is fine.
        let _ = self.changes.send(change.clone());
        change
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TenantChange> {
        self.changes.subscribe()
    }

    /// Tenant that requests made by `profile` should carry.
    #[must_use]
    pub fn effective_cliente_id(&self, profile: &Profile) -> Option<String> {
        if self.allow_override && profile.is_super_admin() {
            self.selected().or_else(|| profile.cliente_id.clone())
        } else {
            profile.cliente_id.clone()
        }
    }
}

#[cfg(test)]
#[path = "tenant_test.rs"]
mod tests;
