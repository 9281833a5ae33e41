//! Single-assignment cell with blocking waiters and run-once listeners
//!
//! Each pack publishes its parsed tables through a `LoadGate`. The gate opens
//! exactly once; any number of threads may block on it, and listeners added
//! before or after it opens each run exactly once.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;

type Listener<T> = Box<dyn FnOnce(&Arc<T>) + Send>;

struct GateState<T> {
    value: Option<Arc<T>>,
    listeners: Vec<Listener<T>>,
}

/// One-shot gate carrying the loaded value
pub struct LoadGate<T> {
    state: Mutex<GateState<T>>,
    opened: Condvar,
}

impl<T> LoadGate<T> {
    /// Closed gate
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                value: None,
                listeners: Vec::new(),
            }),
            opened: Condvar::new(),
        }
    }

    /// Open the gate with `value`
    ///
    /// Returns `false` and drops `value` if the gate was already open.
    pub fn complete(&self, value: T) -> bool {
        let value = Arc::new(value);
        let listeners = {
            let mut state = self.state.lock();
            if state.value.is_some() {
                return false;
            }
            state.value = Some(Arc::clone(&value));
            std::mem::take(&mut state.listeners)
        };
        self.opened.notify_all();
        for listener in listeners {
            listener(&value);
        }
        true
    }

    /// Value if the gate is open
    pub fn get(&self) -> Option<Arc<T>> {
        self.state.lock().value.clone()
    }

    /// Whether the gate is open
    pub fn is_complete(&self) -> bool {
        self.state.lock().value.is_some()
    }

    /// Block until the gate opens
    pub fn wait(&self) -> Arc<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(value) = &state.value {
                return Arc::clone(value);
            }
            self.opened.wait(&mut state);
        }
    }

    /// Run `listener` once the gate is open, immediately if it already is
    pub fn on_complete(&self, listener: impl FnOnce(&Arc<T>) + Send + 'static) {
        let value = {
            let mut state = self.state.lock();
            match &state.value {
                Some(value) => Arc::clone(value),
                None => {
                    state.listeners.push(Box::new(listener));
                    return;
                }
            }
        };
        listener(&value);
    }
}

impl<T> Default for LoadGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LoadGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadGate")
            .field("complete", &self.is_complete())
            .finish_non_exhaustive()
    }
}
