//! One-shot loading gate: loading until media metadata arrives, then ready
//! for the rest of the controller's life.

use std::cell::{Cell, RefCell};

type ReadyListener = Box<dyn FnMut()>;

pub struct LoadingGate {
    loading: Cell<bool>,
    listeners: RefCell<Vec<ReadyListener>>,
}

impl LoadingGate {
    pub fn new() -> Self {
        LoadingGate {
            loading: Cell::new(true),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Register a callback fired once on the loading -> ready transition.
    /// Callbacks registered after the transition are dropped unfired.
    pub fn on_ready<F>(&self, cb: F)
    where
        F: FnMut() + 'static,
    {
        if self.loading.get() {
            self.listeners.borrow_mut().push(Box::new(cb));
        }
    }

    /// Flip to ready. Returns `true` only for the call that made the
    /// transition.
    pub fn mark_ready(&self) -> bool {
        if !self.loading.replace(false) {
            return false;
        }
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for mut cb in listeners {
            cb();
        }
        true
    }
}

impl Default for LoadingGate {
    fn default() -> Self {
        Self::new()
    }
}
