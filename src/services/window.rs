//! Bounded rolling window of closing prices.

/// Default window capacity: enough history for SMA(200).
pub const MAX_WINDOW: usize = 200;

/// Time-ordered closing prices, oldest first, with FIFO eviction.
///
/// Repeated prices are stored as-is. There is no deduplication, so overlapping candle
/// batches put the same close in the window more than once.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    closes: Vec<f64>,
    capacity: usize,
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(MAX_WINDOW)
    }
}

impl RollingWindow {
    /// Create an empty window. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            closes: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a close, evicting from the head once over capacity.
    pub fn push(&mut self, close: f64) {
        self.closes.push(close);
        self.evict();
    }

    /// Append closes in order.
    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, closes: I) {
        self.closes.extend(closes);
        self.evict();
    }

    fn evict(&mut self) {
        if self.closes.len() > self.capacity {
            let excess = self.closes.len() - self.capacity;
            self.closes.drain(..excess);
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.closes
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.closes.len() == self.capacity
    }

    /// Most recent close.
    pub fn last(&self) -> Option<f64> {
        self.closes.last().copied()
    }
}
