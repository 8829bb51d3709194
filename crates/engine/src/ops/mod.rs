use std::sync::Arc;

use crate::{EngineError, ResultEngine, reconcile::Reconciler, store::Store};

mod access;
mod balances;
mod summary;
mod themes;
mod transactions;
mod wallets;

pub use summary::{Summary, SummaryQuery, ThemeSpend};
pub use transactions::TransactionQuery;

/// Application facade.
///
/// Every method takes the caller's [`AuthContext`](crate::AuthContext) and
/// only exposes wallets it owns, together with their themes and
/// transactions. Transaction mutations are delegated to the
/// [`Reconciler`].
#[derive(Debug)]
pub struct Engine<S> {
    store: Arc<S>,
    reconciler: Reconciler<S>,
}

impl<S: Store> Engine<S> {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder<S> {
        EngineBuilder::default()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }
}

/// The builder for `Engine`
pub struct EngineBuilder<S> {
    store: Option<S>,
}

impl<S> Default for EngineBuilder<S> {
    fn default() -> Self {
        Self { store: None }
    }
}

impl<S: Store> EngineBuilder<S> {
    /// Pass the required store
    pub fn store(mut self, store: S) -> EngineBuilder<S> {
        self.store = Some(store);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine<S>> {
        let store = self
            .store
            .map(Arc::new)
            .ok_or_else(|| EngineError::Validation("engine requires a store".to_string()))?;
        Ok(Engine {
            reconciler: Reconciler::new(Arc::clone(&store)),
            store,
        })
    }
}
