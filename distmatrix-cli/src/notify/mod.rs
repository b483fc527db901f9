//! Transient user notifications
//!
//! A small bounded queue of toasts. Each toast with a finite TTL owns a tokio
//! timer that removes it on expiry; removing a toast early aborts its timer.
//! The queue is cloned into whoever needs to raise notifications, never
//! reached through a global.

mod render;

pub use render::{TerminalRenderer, ToastRenderer};

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::NotificationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: String,
    pub kind: ToastKind,
    pub text: String,
    /// `None` means the toast stays until removed
    pub ttl: Option<Duration>,
}

struct Entry {
    toast: Toast,
    expiry: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<Entry>,
}

/// Bounded, self-expiring toast queue. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ToastQueue {
    state: Arc<Mutex<QueueState>>,
    max_toasts: usize,
    default_ttl: Duration,
    renderer: Option<Arc<dyn ToastRenderer>>,
}

impl fmt::Debug for ToastQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastQueue")
            .field("len", &self.len())
            .field("max_toasts", &self.max_toasts)
            .field("default_ttl", &self.default_ttl)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl ToastQueue {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            max_toasts: config.max_toasts.max(1),
            default_ttl: config.default_ttl(),
            renderer: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ToastRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Add a toast with the configured default TTL
    pub fn notify(&self, text: impl Into<String>, kind: ToastKind) -> String {
        self.add(text, kind, Some(self.default_ttl))
    }

    /// Add a toast and return its id. The oldest toast is evicted when full.
    pub fn add(&self, text: impl Into<String>, kind: ToastKind, ttl: Option<Duration>) -> String {
        let toast = Toast {
            id: Uuid::new_v4().to_string(),
            kind,
            text: text.into(),
            ttl,
        };

        if let Some(renderer) = &self.renderer {
            renderer.render(&toast);
        }

        let id = toast.id.clone();

        let mut state = self.lock();
        while state.entries.len() >= self.max_toasts {
            if let Some(evicted) = state.entries.pop_front() {
                log::debug!("Toast queue full, evicting '{}'", evicted.toast.text);
                if let Some(handle) = evicted.expiry {
                    handle.abort();
                }
            }
        }
        // Spawned under the lock so the timer can never run before the entry exists
        let expiry = ttl.and_then(|ttl| self.schedule_expiry(id.clone(), ttl));
        state.entries.push_back(Entry { toast, expiry });

        id
    }

    /// Remove a toast by id, cancelling its timer. Returns false if it was already gone.
    pub fn remove(&self, id: &str) -> bool {
        match self.take(id) {
            Some(entry) => {
                if let Some(handle) = entry.expiry {
                    handle.abort();
                }
                true
            }
            None => false,
        }
    }

    pub fn remove_all(&self) {
        let drained: Vec<Entry> = self.lock().entries.drain(..).collect();
        for entry in drained {
            if let Some(handle) = entry.expiry {
                handle.abort();
            }
        }
    }

    /// Current toasts, oldest first
    pub fn snapshot(&self) -> Vec<Toast> {
        self.lock().entries.iter().map(|e| e.toast.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, id: &str) -> Option<Entry> {
        let mut state = self.lock();
        let index = state.entries.iter().position(|e| e.toast.id == id)?;
        state.entries.remove(index)
    }

    /// Timers need a runtime; outside one the toast simply never expires
    fn schedule_expiry(&self, id: String, ttl: Duration) -> Option<JoinHandle<()>> {
        let handle = Handle::try_current().ok()?;
        let state: Weak<Mutex<QueueState>> = Arc::downgrade(&self.state);

        Some(handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(state) = state.upgrade() {
                let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(index) = guard.entries.iter().position(|e| e.toast.id == id) {
                    // Our own handle; dropping it only detaches
                    guard.entries.remove(index);
                    log::trace!("Toast {} expired", id);
                }
            }
        }))
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
