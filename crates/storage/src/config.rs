//! Engine configuration.

/// Default number of updates between forced flushes.
pub const DEFAULT_FLUSH_INTERVAL: u64 = 1000;

/// Configuration for opening a [`crate::Database`].
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Flush the engine every time the store-wide update counter reaches a
    /// multiple of this value. Zero disables the periodic flush.
    pub flush_interval: u64,
    /// Page cache size in bytes.
    pub cache_capacity: u64,
    /// Background flush period of the engine itself. `None` leaves durability
    /// entirely to the update-count policy and explicit flushes.
    pub flush_every_ms: Option<u64>,
    /// Discard the store when it is dropped (tests and scratch stores).
    pub temporary: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            cache_capacity: 64 * 1024 * 1024, // 64 MB
            flush_every_ms: None,
            temporary: false,
        }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn flush_interval(mut self, updates: u64) -> Self {
        self.flush_interval = updates;
        self
    }

    #[must_use]
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    #[must_use]
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }

    #[must_use]
    pub fn temporary(mut self, value: bool) -> Self {
        self.temporary = value;
        self
    }

    /// Whether the update counter value `count` should trigger a flush.
    pub fn should_flush(&self, count: u64) -> bool {
        self.flush_interval != 0 && count != 0 && count % self.flush_interval == 0
    }
}
