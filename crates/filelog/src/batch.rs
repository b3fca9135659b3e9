//! In-memory batching of appended text ahead of the write path.

/// Accumulated text flushes once it grows past this many bytes.
pub const DEFAULT_SOFT_THRESHOLD: usize = 4 * 1024;

/// Accumulated text is discarded if it grows past this many bytes and
/// cannot be flushed.
pub const DEFAULT_HARD_CEILING: usize = 1024 * 1024;

/// Text waiting to be handed to the write path in one piece.
#[derive(Debug, Clone)]
pub struct LineBatch {
    text: String,
    soft_threshold: usize,
    hard_ceiling: usize,
}

impl Default for LineBatch {
    fn default() -> Self {
        Self::new(DEFAULT_SOFT_THRESHOLD, DEFAULT_HARD_CEILING)
    }
}

impl LineBatch {
    /// Creates an empty batch. A ceiling below the threshold is raised to it.
    #[must_use]
    pub fn new(soft_threshold: usize, hard_ceiling: usize) -> Self {
        Self {
            text: String::new(),
            soft_threshold,
            hard_ceiling: hard_ceiling.max(soft_threshold),
        }
    }

    /// Appends text.
    pub fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Whether the accumulated text is past the soft threshold.
    #[must_use]
    pub fn should_flush(&self) -> bool {
        self.text.len() > self.soft_threshold
    }

    /// Whether the accumulated text is past the hard ceiling.
    #[must_use]
    pub fn exceeds_hard_ceiling(&self) -> bool {
        self.text.len() > self.hard_ceiling
    }

    /// Takes the accumulated text, leaving the batch empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    /// Puts back text whose flush failed, ahead of anything pushed since.
    ///
    /// If that leaves the batch past the hard ceiling, everything is
    /// discarded. Returns the number of bytes discarded.
    pub fn restore(&mut self, mut text: String) -> usize {
        text.push_str(&self.text);
        self.text = text;

        if self.exceeds_hard_ceiling() {
            let discarded = self.text.len();
            self.text.clear();
            discarded
        } else {
            0
        }
    }

    /// Discards the accumulated text.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Accumulated length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether nothing is accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_only_past_threshold() {
        let mut batch = LineBatch::new(8, 64);

        batch.push("12345678");
        assert!(!batch.should_flush());

        batch.push("9");
        assert!(batch.should_flush());
        assert_eq!(batch.take(), "123456789");
        assert!(batch.is_empty());
    }

    #[test]
    fn test_restore_keeps_order() {
        let mut batch = LineBatch::new(4, 64);
        batch.push("first ");
        let taken = batch.take();
        batch.push("second");

        assert_eq!(batch.restore(taken), 0);
        assert_eq!(batch.take(), "first second");
    }

    #[test]
    fn test_restore_past_ceiling_discards() {
        let mut batch = LineBatch::new(4, 10);
        batch.push("0123456789");
        let taken = batch.take();
        batch.push("x");

        assert_eq!(batch.restore(taken), 11);
        assert!(batch.is_empty());
    }
}
