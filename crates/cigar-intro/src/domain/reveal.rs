//! Progressive ("typewriter") text reveal.
//!
//! One state machine per scene activation: a line cursor, a character cursor
//! and the instant of the next step. One character appears every
//! `char_interval`; each line then holds for `line_pause`. The reveal is done
//! when the final line's hold elapses, and reports that exactly once.

use chrono::{DateTime, TimeDelta, Utc};

/// Reveal pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealConfig {
    /// Delay between two typed characters.
    pub char_interval: TimeDelta,
    /// Hold after the last character of each line.
    pub line_pause: TimeDelta,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            char_interval: TimeDelta::milliseconds(50),
            line_pause: TimeDelta::milliseconds(1000),
        }
    }
}

/// Outcome of polling a reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    /// Still typing or holding (or already reported done).
    Pending,
    /// The reveal just finished; returned once.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Typing,
    Holding,
    Done,
}

/// Reveal progress for one scene's text.
#[derive(Debug, Clone)]
pub struct TextReveal {
    line_lengths: Vec<usize>,
    config: RevealConfig,
    line: usize,
    chars: usize,
    phase: Phase,
    next_at: DateTime<Utc>,
    reported: bool,
}

impl TextReveal {
    /// Starts revealing lines of the given visible lengths at `now`.
    #[must_use]
    pub fn start(line_lengths: Vec<usize>, config: RevealConfig, now: DateTime<Utc>) -> Self {
        let mut reveal = Self {
            line_lengths,
            config,
            line: 0,
            chars: 0,
            phase: Phase::Typing,
            next_at: now,
            reported: false,
        };
        reveal.enter_line(now);
        reveal
    }

    fn enter_line(&mut self, at: DateTime<Utc>) {
        self.chars = 0;
        match self.line_lengths.get(self.line) {
            None => {
                self.phase = Phase::Done;
                self.next_at = at;
            }
            Some(0) => {
                self.phase = Phase::Holding;
                self.next_at = at + self.config.line_pause;
            }
            Some(_) => {
                self.phase = Phase::Typing;
                self.next_at = at + self.config.char_interval;
            }
        }
    }

    /// Applies every step due at or before `now`.
    pub fn poll(&mut self, now: DateTime<Utc>) -> RevealStep {
        while self.phase != Phase::Done && self.next_at <= now {
            let at = self.next_at;
            match self.phase {
                Phase::Typing => {
                    self.chars += 1;
                    if self.chars >= self.line_lengths[self.line] {
                        self.phase = Phase::Holding;
                        self.next_at = at + self.config.line_pause;
                    } else {
                        self.next_at = at + self.config.char_interval;
                    }
                }
                Phase::Holding => {
                    self.line += 1;
                    self.enter_line(at);
                }
                Phase::Done => {}
            }
        }
        if self.phase == Phase::Done && !self.reported {
            self.reported = true;
            return RevealStep::Completed;
        }
        RevealStep::Pending
    }

    /// When the next step is due, or `None` once completion was reported.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        (!self.reported).then_some(self.next_at)
    }

    /// True once the final hold has elapsed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// True once every character of every line is visible.
    #[must_use]
    pub fn all_chars_typed(&self) -> bool {
        self.line + 1 >= self.line_lengths.len() && self.phase != Phase::Typing
    }

    /// Number of characters of `line` currently visible.
    #[must_use]
    pub fn revealed_chars(&self, line: usize) -> usize {
        let Some(&len) = self.line_lengths.get(line) else {
            return 0;
        };
        match line.cmp(&self.line) {
            std::cmp::Ordering::Less => len,
            std::cmp::Ordering::Equal => self.chars,
            std::cmp::Ordering::Greater => 0,
        }
    }

    /// Total time from start until the reveal is done.
    #[must_use]
    pub fn total_duration(line_lengths: &[usize], config: RevealConfig) -> TimeDelta {
        line_lengths.iter().fold(TimeDelta::zero(), |acc, &len| {
            acc + config.char_interval * i32::try_from(len).unwrap_or(i32::MAX) + config.line_pause
        })
    }
}
