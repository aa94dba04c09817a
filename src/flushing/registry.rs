use std::sync::Arc;

use crate::targets::LazyFlushable;

/// Flushable targets known to one coordinator.
///
/// Membership is by pointer identity, so the same target reached through
/// several loggers is registered once. Not synchronised by itself: the owning
/// coordinator guards every access.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Vec<Arc<dyn LazyFlushable>>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Inserts `client` unless already present. Returns `true` if inserted.
    pub fn add(&mut self, client: Arc<dyn LazyFlushable>) -> bool {
        if self.contains(&client) {
            return false;
        }
        self.clients.push(client);
        true
    }

    #[must_use]
    pub fn contains(&self, client: &Arc<dyn LazyFlushable>) -> bool {
        self.clients.iter().any(|c| same_client(c, client))
    }

    /// Independent copy of the current members.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<dyn LazyFlushable>> {
        self.clients.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

// Compare data pointers only; vtable pointers for one type may differ
// between codegen units.
fn same_client(a: &Arc<dyn LazyFlushable>, b: &Arc<dyn LazyFlushable>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.clients.iter().map(|c| c.client_name()))
            .finish()
    }
}
