// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-process event dispatch.
//!
//! Handlers are registered per event name and invoked synchronously, in
//! registration order, when the event is fired. An event can be suspended,
//! in which case firing it invokes nothing.
//!
//! Registration returns a [`HandlerId`] token which is the only way to
//! remove a single handler again. Callers that need idempotent registration
//! (the same logical handler added from several code paths) use
//! [`EventManager::add_keyed_handler`].
//!
//! ```
//! use smart_factory::events::{EventManager, EventParams};
//!
//! let events = EventManager::new();
//! events.add_handler("user_saved", |_event, _params| Ok(())).unwrap();
//! assert_eq!(events.fire_event("user_saved", &EventParams::new()).unwrap(), 1);
//! ```

use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Named event parameters, in the order they were inserted.
pub type EventParams = IndexMap<String, serde_json::Value>;

type Handler = Arc<dyn Fn(&str, &EventParams) -> anyhow::Result<()> + Send + Sync>;

/// Token identifying one registration of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    key: Option<String>,
    handler: Handler,
}

#[derive(Default)]
struct EventTable {
    handlers: IndexMap<String, IndexMap<HandlerId, Registration>>,
    suspended: IndexSet<String>,
}

#[derive(Default)]
pub struct EventManager {
    table: Mutex<EventTable>,
    next_id: AtomicU64,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, EventTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_handler_id(&self) -> HandlerId {
        HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a handler for `event`.
    ///
    /// The handler receives the event name and the parameters passed to
    /// [`fire_event`](Self::fire_event).
    pub fn add_handler<F>(&self, event: &str, handler: F) -> Result<HandlerId>
    where
        F: Fn(&str, &EventParams) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        require_event(event)?;
        let id = self.next_handler_id();
        self.table()
            .handlers
            .entry(event.to_string())
            .or_default()
            .insert(
                id,
                Registration {
                    key: None,
                    handler: Arc::new(handler),
                },
            );
        tracing::debug!(event, ?id, "event handler registered");
        Ok(id)
    }

    /// Register a handler under a caller-chosen stable key.
    ///
    /// Adding a second handler with the same key for the same event is a
    /// no-op and returns the token of the existing registration.
    pub fn add_keyed_handler<F>(&self, event: &str, key: &str, handler: F) -> Result<HandlerId>
    where
        F: Fn(&str, &EventParams) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        require_event(event)?;
        if key.is_empty() {
            return Err(Error::Validation("Event handler is not valid!".to_string()));
        }

        let mut table = self.table();
        let registrations = table.handlers.entry(event.to_string()).or_default();
        if let Some((id, _)) = registrations
            .iter()
            .find(|(_, reg)| reg.key.as_deref() == Some(key))
        {
            return Ok(*id);
        }

        let id = self.next_handler_id();
        registrations.insert(
            id,
            Registration {
                key: Some(key.to_string()),
                handler: Arc::new(handler),
            },
        );
        tracing::debug!(event, key, ?id, "keyed event handler registered");
        Ok(id)
    }

    /// Remove one registration. Unknown tokens are ignored.
    pub fn delete_handler(&self, event: &str, id: HandlerId) -> Result<()> {
        require_event(event)?;
        let mut table = self.table();
        if let Some(registrations) = table.handlers.get_mut(event) {
            registrations.shift_remove(&id);
            if registrations.is_empty() {
                table.handlers.shift_remove(event);
            }
        }
        Ok(())
    }

    /// Remove every handler of `event`.
    pub fn delete_handlers(&self, event: &str) -> Result<()> {
        require_event(event)?;
        self.table().handlers.shift_remove(event);
        Ok(())
    }

    pub fn delete_all_handlers(&self) {
        self.table().handlers.clear();
    }

    /// Number of handlers currently registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.table().handlers.get(event).map_or(0, IndexMap::len)
    }

    /// While suspended, firing `event` invokes no handlers.
    pub fn suspend_event(&self, event: &str) -> Result<()> {
        require_event(event)?;
        self.table().suspended.insert(event.to_string());
        Ok(())
    }

    pub fn resume_event(&self, event: &str) -> Result<()> {
        require_event(event)?;
        self.table().suspended.shift_remove(event);
        Ok(())
    }

    pub fn resume_all_events(&self) {
        self.table().suspended.clear();
    }

    pub fn is_suspended(&self, event: &str) -> bool {
        self.table().suspended.contains(event)
    }

    /// Invoke every handler of `event` and return how many were called.
    ///
    /// A failing handler stops the dispatch; its error is returned and the
    /// handlers registered after it are not invoked.
    pub fn fire_event(&self, event: &str, params: &EventParams) -> Result<usize> {
        require_event(event)?;

        // Snapshot so handlers may register or remove handlers themselves.
        let handlers: Vec<Handler> = {
            let table = self.table();
            if table.suspended.contains(event) {
                return Ok(0);
            }
            match table.handlers.get(event) {
                Some(registrations) => registrations
                    .values()
                    .map(|reg| Arc::clone(&reg.handler))
                    .collect(),
                None => return Ok(0),
            }
        };

        let mut count = 0;
        for handler in handlers {
            count += 1;
            handler(event, params).map_err(|source| Error::Handler {
                event: event.to_string(),
                source,
            })?;
        }

        tracing::debug!(event, handlers = count, "event fired");
        Ok(count)
    }
}

fn require_event(event: &str) -> Result<()> {
    if event.is_empty() {
        return Err(Error::Validation("Event is not specified!".to_string()));
    }
    Ok(())
}
