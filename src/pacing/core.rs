//! The pure pacing queue state machine.
//!
//! [`PacerCore`] holds all queue state and mutation logic with no timers
//! attached, so every property is unit-testable synchronously. The actor
//! in `pacer` drives it on a tokio interval.

use std::collections::VecDeque;
use std::time::Duration;

use super::tokenizer::tokenize;

/// `flush_now` drains with this multiple of the per-tick budget per pass.
const BURST_MULTIPLIER: usize = 4;

/// Granularity of queued units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingMode {
    /// Queue each arriving fragment as one unit.
    Fragment,
    /// Split fragments into word/punctuation/CJK-character units first.
    Token,
}

/// Configuration for the pacing queue.
#[derive(Debug, Clone)]
pub struct PacerConfig {
    pub mode: PacingMode,
    /// Cadence of the flush timer.
    pub flush_interval: Duration,
    /// Per-tick budget in characters (Unicode scalar values).
    pub max_chars_per_flush: usize,
    /// Per-tick budget in units. Effectively unbounded in fragment mode.
    pub max_units_per_flush: usize,
    /// Bound on total queued characters; oldest backlog is evicted beyond
    /// it.
    pub max_queue_chars: usize,
}

impl PacerConfig {
    /// Fragment-mode defaults: 33 ms cadence, 1200 chars per tick.
    pub fn fragment() -> Self {
        Self {
            mode: PacingMode::Fragment,
            flush_interval: Duration::from_millis(33),
            max_chars_per_flush: 1200,
            max_units_per_flush: usize::MAX,
            max_queue_chars: 200_000,
        }
    }

    /// Token-mode defaults: 33 ms cadence, 8 units and 80 chars per tick,
    /// jointly.
    pub fn token() -> Self {
        Self {
            mode: PacingMode::Token,
            flush_interval: Duration::from_millis(33),
            max_chars_per_flush: 80,
            max_units_per_flush: 8,
            max_queue_chars: 200_000,
        }
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_max_chars_per_flush(mut self, max_chars: usize) -> Self {
        self.max_chars_per_flush = max_chars;
        self
    }

    pub fn with_max_units_per_flush(mut self, max_units: usize) -> Self {
        self.max_units_per_flush = max_units;
        self
    }

    pub fn with_max_queue_chars(mut self, max_queue_chars: usize) -> Self {
        self.max_queue_chars = max_queue_chars;
        self
    }
}

/// Snapshot delivered to the render callback after each flush.
#[derive(Debug)]
pub struct FlushUpdate<'a> {
    /// All text ever flushed. Owned by the queue; read-only to consumers.
    pub full_text: &'a str,
    /// The text appended by this flush.
    pub appended: &'a str,
    /// Units still queued after this flush.
    pub queue_len: usize,
    /// Characters still queued after this flush.
    pub queue_chars: usize,
}

/// Bounded, order-preserving pacing queue.
///
/// Invariant: `queue_chars` equals the sum of queued unit lengths after
/// every mutation, and `full_text` grows by exactly the bytes delivered in
/// each flush.
#[derive(Debug)]
pub struct PacerCore {
    config: PacerConfig,
    queue: VecDeque<String>,
    queue_chars: usize,
    full_text: String,
    paused: bool,
    stopped: bool,
}

impl PacerCore {
    pub fn new(config: PacerConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            queue_chars: 0,
            full_text: String::new(),
            paused: false,
            stopped: false,
        }
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    /// Queue a fragment. Ignored when stopped or empty. Token mode splits
    /// it into units first; fragment mode queues it whole.
    pub fn enqueue(&mut self, fragment: &str) {
        if self.stopped || fragment.is_empty() {
            return;
        }
        match self.config.mode {
            PacingMode::Token => {
                for unit in tokenize(fragment) {
                    self.push_unit(unit);
                }
            }
            PacingMode::Fragment => self.push_unit(fragment.to_string()),
        }
    }

    fn push_unit(&mut self, unit: String) {
        let unit_chars = unit.chars().count();
        if unit_chars == 0 {
            return;
        }
        // Bound check: evict oldest-first until the incoming unit fits.
        // The incoming unit itself is never rejected, only older backlog
        // is sacrificed.
        while !self.queue.is_empty() && self.queue_chars + unit_chars > self.config.max_queue_chars
        {
            if let Some(old) = self.queue.pop_front() {
                self.queue_chars -= old.chars().count();
            }
        }
        self.queue.push_back(unit);
        self.queue_chars += unit_chars;
    }

    /// One tick's flush. Returns the byte offset in `full_text` where this
    /// flush's output begins, or `None` if nothing was flushed.
    pub fn flush_once(&mut self) -> Option<usize> {
        if self.stopped || self.paused {
            return None;
        }
        self.drain(
            self.config.max_units_per_flush,
            self.config.max_chars_per_flush,
        )
    }

    /// One enlarged drain pass for `flush_now`.
    pub fn flush_burst(&mut self) -> Option<usize> {
        if self.stopped || self.paused {
            return None;
        }
        self.drain(
            self.config.max_units_per_flush.saturating_mul(BURST_MULTIPLIER),
            self.config.max_chars_per_flush.saturating_mul(BURST_MULTIPLIER),
        )
    }

    fn drain(&mut self, max_units: usize, max_chars: usize) -> Option<usize> {
        let start = self.full_text.len();
        let mut units_taken = 0;
        let mut chars_taken = 0;

        while units_taken < max_units && chars_taken < max_chars {
            let Some(front) = self.queue.front_mut() else {
                break;
            };
            let room = max_chars - chars_taken;
            let front_chars = front.chars().count();

            if front_chars <= room {
                chars_taken += front_chars;
                units_taken += 1;
                self.queue_chars -= front_chars;
                if let Some(unit) = self.queue.pop_front() {
                    self.full_text.push_str(&unit);
                }
            } else {
                // The unit is larger than the remaining budget: the
                // portion that fits is taken and the remainder goes back
                // to the front for the next tick. Never reordered, never
                // duplicated, never dropped. Split on a char boundary.
                let split_at = front
                    .char_indices()
                    .nth(room)
                    .map(|(index, _)| index)
                    .unwrap_or(front.len());
                let rest = front.split_off(split_at);
                let taken = std::mem::replace(front, rest);
                self.queue_chars -= room;
                self.full_text.push_str(&taken);
                break;
            }
        }

        (self.full_text.len() > start).then_some(start)
    }

    /// Build the render-callback snapshot for a flush that began at byte
    /// offset `start`.
    pub fn update_from(&self, start: usize) -> FlushUpdate<'_> {
        FlushUpdate {
            full_text: &self.full_text,
            appended: &self.full_text[start..],
            queue_len: self.queue.len(),
            queue_chars: self.queue_chars,
        }
    }

    /// Halt flushing without discarding queued data.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Restart flushing. Already-flushed output is never replayed.
    pub fn resume(&mut self) {
        if !self.stopped {
            self.paused = false;
        }
    }

    /// Terminal: discard queued data and reject further enqueues.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.paused = true;
        self.queue.clear();
        self.queue_chars = 0;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_chars(&self) -> usize {
        self.queue_chars
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(core: &PacerCore) {
        let sum: usize = core.queue.iter().map(|unit| unit.chars().count()).sum();
        assert_eq!(core.queue_chars(), sum, "queue_chars invariant violated");
    }

    fn drain_all(core: &mut PacerCore) -> String {
        let mut out = String::new();
        while let Some(start) = core.flush_once() {
            out.push_str(core.update_from(start).appended);
            assert_invariant(core);
        }
        out
    }

    #[test]
    fn test_fragment_enqueue_and_flush() {
        let mut core = PacerCore::new(PacerConfig::fragment());
        core.enqueue("hello ");
        core.enqueue("world");
        assert_invariant(&core);
        assert_eq!(core.queue_len(), 2);
        assert_eq!(core.queue_chars(), 11);

        let start = core.flush_once().unwrap();
        let update = core.update_from(start);
        assert_eq!(update.full_text, "hello world");
        assert_eq!(update.appended, "hello world");
        assert_eq!(update.queue_len, 0);
        assert_eq!(update.queue_chars, 0);
    }

    #[test]
    fn test_empty_fragment_ignored() {
        let mut core = PacerCore::new(PacerConfig::fragment());
        core.enqueue("");
        assert_eq!(core.queue_len(), 0);
    }

    #[test]
    fn test_flush_on_empty_queue_is_none() {
        let mut core = PacerCore::new(PacerConfig::fragment());
        assert_eq!(core.flush_once(), None);
    }

    #[test]
    fn test_per_tick_char_budget() {
        let config = PacerConfig::fragment().with_max_chars_per_flush(4);
        let mut core = PacerCore::new(config);
        core.enqueue("abcdefghij");

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "abcd");
        assert_invariant(&core);

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "efgh");

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "ij");
        assert_eq!(core.full_text(), "abcdefghij");
        assert_eq!(core.flush_once(), None);
    }

    #[test]
    fn test_oversized_unit_split_never_reordered() {
        let config = PacerConfig::fragment().with_max_chars_per_flush(3);
        let mut core = PacerCore::new(config);
        core.enqueue("abcde");
        core.enqueue("fg");

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "abc");
        // Remainder went back to the front; the later unit stays behind it.
        assert_eq!(core.queue_len(), 2);
        assert_invariant(&core);

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "def");

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "g");
        assert_eq!(core.full_text(), "abcdefg");
    }

    #[test]
    fn test_split_on_char_boundary() {
        let config = PacerConfig::fragment().with_max_chars_per_flush(2);
        let mut core = PacerCore::new(config);
        core.enqueue("你好世界");

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "你好");
        assert_invariant(&core);

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "世界");
    }

    #[test]
    fn test_token_mode_unit_budget() {
        let config = PacerConfig::token()
            .with_max_units_per_flush(2)
            .with_max_chars_per_flush(100);
        let mut core = PacerCore::new(config);
        core.enqueue("one two three");
        // Units: "one", " ", "two", " ", "three".
        assert_eq!(core.queue_len(), 5);

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "one ");

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "two ");

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "three");
    }

    #[test]
    fn test_token_mode_joint_char_budget() {
        let config = PacerConfig::token()
            .with_max_units_per_flush(10)
            .with_max_chars_per_flush(5);
        let mut core = PacerCore::new(config);
        core.enqueue("abc def");

        // "abc" (3) fits; " " (1) fits; "def" would exceed 5 and is split.
        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "abc d");
        assert_invariant(&core);

        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "ef");
    }

    #[test]
    fn test_flushed_output_is_prefix_of_input() {
        // Across assorted budgets, flushed output must always be a prefix
        // of the enqueued concatenation: no reorder, no dup, no loss.
        let inputs = ["hello ", "world, ", "你好", "x", "longer fragment here"];
        let expected: String = inputs.concat();

        for max_chars in [1, 2, 3, 5, 7, 100] {
            let config = PacerConfig::fragment().with_max_chars_per_flush(max_chars);
            let mut core = PacerCore::new(config);
            for input in &inputs {
                core.enqueue(input);
                assert_invariant(&core);
            }
            let mut flushed = String::new();
            while let Some(start) = core.flush_once() {
                flushed.push_str(core.update_from(start).appended);
                assert!(
                    expected.starts_with(&flushed),
                    "not a prefix at budget {}",
                    max_chars
                );
            }
            assert_eq!(flushed, expected);
            assert_eq!(core.full_text(), expected);
        }
    }

    #[test]
    fn test_eviction_oldest_first() {
        let config = PacerConfig::fragment().with_max_queue_chars(10);
        let mut core = PacerCore::new(config);
        core.enqueue("aaaa");
        core.enqueue("bbbb");
        core.enqueue("cccc");
        assert_invariant(&core);
        // "aaaa" was evicted to admit "cccc".
        assert_eq!(core.queue_chars(), 8);
        assert_eq!(drain_all(&mut core), "bbbbcccc");
    }

    #[test]
    fn test_newest_unit_never_evicted_by_its_own_bound_check() {
        let config = PacerConfig::fragment().with_max_queue_chars(4);
        let mut core = PacerCore::new(config);
        core.enqueue("aa");
        // Larger than the whole bound: all backlog goes, the newcomer
        // stays.
        core.enqueue("zzzzzzzz");
        assert_invariant(&core);
        assert_eq!(core.queue_len(), 1);
        assert_eq!(drain_all(&mut core), "zzzzzzzz");
    }

    #[test]
    fn test_eviction_counts_chars_not_bytes() {
        let config = PacerConfig::fragment().with_max_queue_chars(4);
        let mut core = PacerCore::new(config);
        core.enqueue("你好"); // 2 chars, 6 bytes
        core.enqueue("世界"); // still fits: 4 chars total
        assert_invariant(&core);
        assert_eq!(core.queue_len(), 2);
        assert_eq!(core.queue_chars(), 4);
    }

    #[test]
    fn test_pause_halts_resume_restarts() {
        let mut core = PacerCore::new(PacerConfig::fragment());
        core.enqueue("text");
        core.pause();
        assert_eq!(core.flush_once(), None);
        assert_eq!(core.queue_len(), 1);

        core.resume();
        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "text");
        // No replay after resume.
        assert_eq!(core.flush_once(), None);
    }

    #[test]
    fn test_stop_discards_and_rejects() {
        let mut core = PacerCore::new(PacerConfig::fragment());
        core.enqueue("pending");
        core.stop();
        assert_eq!(core.queue_len(), 0);
        assert_eq!(core.queue_chars(), 0);
        assert_eq!(core.flush_once(), None);

        core.enqueue("after stop");
        assert_eq!(core.queue_len(), 0);

        // Resume cannot revive a stopped queue.
        core.resume();
        assert_eq!(core.flush_once(), None);
        assert!(core.is_stopped());
    }

    #[test]
    fn test_stop_keeps_full_text() {
        let mut core = PacerCore::new(PacerConfig::fragment());
        core.enqueue("kept");
        let start = core.flush_once().unwrap();
        assert_eq!(core.update_from(start).appended, "kept");
        core.stop();
        assert_eq!(core.full_text(), "kept");
    }

    #[test]
    fn test_flush_burst_uses_enlarged_budget() {
        let config = PacerConfig::fragment().with_max_chars_per_flush(2);
        let mut core = PacerCore::new(config);
        core.enqueue("abcdefgh");

        // Burst budget is 4x: all eight chars in one pass.
        let start = core.flush_burst().unwrap();
        assert_eq!(core.update_from(start).appended, "abcdefgh");
        assert_eq!(core.flush_burst(), None);
    }

    #[test]
    fn test_flush_burst_respects_pause() {
        let mut core = PacerCore::new(PacerConfig::fragment());
        core.enqueue("text");
        core.pause();
        assert_eq!(core.flush_burst(), None);
    }

    #[test]
    fn test_token_mode_enqueue_tokenizes() {
        let mut core = PacerCore::new(PacerConfig::token());
        core.enqueue("Hello, World!");
        // "Hello", ",", " ", "World", "!"
        assert_eq!(core.queue_len(), 5);
        assert_invariant(&core);
    }
}
