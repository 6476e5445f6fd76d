use std::time::Instant;

/// Running message counters; the rate is averaged since tracking started.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statistics {
    pub total_messages: u64,
    pub binary_messages: u64,
    pub text_messages: u64,
    pub parse_errors: u64,
    pub last_message_type: String,
    pub messages_per_second: f64,
}

#[derive(Debug)]
pub struct StatsTracker {
    started: Instant,
    counters: Statistics,
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(started: Instant) -> Self {
        Self {
            started,
            counters: Statistics::default(),
        }
    }

    pub fn record_binary(&mut self, label: &str) {
        self.counters.binary_messages += 1;
        self.record(label);
    }

    pub fn record_text(&mut self, label: &str) {
        self.counters.text_messages += 1;
        self.record(label);
    }

    fn record(&mut self, label: &str) {
        self.counters.total_messages += 1;
        if self.counters.last_message_type != label {
            self.counters.last_message_type.clear();
            self.counters.last_message_type.push_str(label);
        }
    }

    pub fn record_parse_errors(&mut self, count: u64) {
        self.counters.parse_errors += count;
    }

    pub fn snapshot(&self) -> Statistics {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> Statistics {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let mut stats = self.counters.clone();
        stats.messages_per_second = if elapsed > 0.0 {
            stats.total_messages as f64 / elapsed
        } else {
            0.0
        };
        stats
    }
}
