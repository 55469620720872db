/// Append-only log of human-readable match events.
///
/// Every entry is kept for the lifetime of the session; only the most recent
/// few are ever sent to clients.
#[derive(Debug, Default, Clone)]
pub struct StatusLog {
    entries: Vec<String>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// The last `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> &[String] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_is_bounded_but_history_kept() {
        let mut log = StatusLog::new();
        for i in 0..8 {
            log.push(format!("event {i}"));
        }
        assert_eq!(log.tail(usize::MAX).len(), 8);
        assert_eq!(
            log.tail(5),
            &["event 3", "event 4", "event 5", "event 6", "event 7"]
        );
    }

    #[test]
    fn tail_of_short_log_is_everything() {
        let mut log = StatusLog::new();
        log.push("only");
        assert_eq!(log.tail(5), &["only"]);
        assert!(StatusLog::new().tail(5).is_empty());
    }
}
