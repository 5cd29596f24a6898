use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

/// Shared handle to the widget counter.
///
/// Clones point at the same value. The ticker is the only writer; everything
/// else reads.
#[derive(Debug, Clone, Default)]
pub struct Widget {
    value: Arc<AtomicI64>,
}

impl Widget {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one, returning the new value.
    pub fn increment(&self) -> i64 {
        self.value.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current value.
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}
