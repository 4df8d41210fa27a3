use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::model::Project;

pub type ProjectsCallback = Box<dyn Fn(&[Project]) + Send + Sync>;

type Callbacks = Mutex<BTreeMap<u64, Arc<ProjectsCallback>>>;

/// Change listeners shared by a store and the guards it hands out.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: Mutex<u64>,
    callbacks: Arc<Callbacks>,
}

impl Subscribers {
    pub(crate) fn register(&self, callback: ProjectsCallback) -> (Subscription, Arc<ProjectsCallback>) {
        let id = {
            let mut next = lock(&self.next_id);
            *next += 1;
            *next
        };
        let callback = Arc::new(callback);
        lock(&self.callbacks).insert(id, Arc::clone(&callback));
        debug!(subscription = id, "registered project listener");
        let guard = Subscription {
            id,
            callbacks: Arc::downgrade(&self.callbacks),
        };
        (guard, callback)
    }

    /// Invokes every listener with `projects`. Listeners run outside the lock
    /// so they may subscribe or drop guards themselves.
    pub(crate) fn notify(&self, projects: &[Project]) {
        let listeners: Vec<_> = lock(&self.callbacks).values().cloned().collect();
        for listener in listeners {
            listener(projects);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.callbacks).len()
    }
}

/// Keeps a change listener registered until dropped.
pub struct Subscription {
    id: u64,
    callbacks: Weak<Callbacks>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(callbacks) = self.callbacks.upgrade() {
            lock(&callbacks).remove(&self.id);
            debug!(subscription = self.id, "removed project listener");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Poisoning only means a listener panicked; the map itself is still valid.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
