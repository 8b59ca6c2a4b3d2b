//! Cycle lifecycle management on top of the framer, decoder, stats, and
//! message assembler.
//!
//! A cycle is one message-accumulation lifecycle: it starts on the first
//! packet after a reset and ends when the configured [`Policy`] says so.
//! The two policies share every code path except the termination decision.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use crate::{FreqStats, FreqSummary, MessageAssembler, Sample};

/// Decode-and-report after every fixed number of packets.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct FixedWindow {
    /// Packets per cycle.
    #[builder(default = 96)]
    pub window: u64,
}

/// Count occurrences of an expected message, classifying each attempt as
/// matched, timed out, or overflowed.
#[derive(Debug, Clone, TypedBuilder)]
pub struct TargetMatch {
    /// The message to look for.
    #[builder(setter(into))]
    pub target: String,
    /// Wall time allowed for one attempt, measured monotonically from the
    /// first packet of the attempt.
    #[builder(default = Duration::from_secs(4))]
    pub timeout: Duration,
    /// Resolved attempts (matched + incorrect) after which
    /// [`CycleController::done`] reports true. The controller itself never
    /// stops; the caller does.
    #[builder(default = 1000)]
    pub max_attempts: u64,
}

/// Termination policy for a [`CycleController`], selected at construction.
#[derive(Debug, Clone)]
pub enum Policy {
    FixedWindow(FixedWindow),
    TargetMatch(TargetMatch),
}

/// How a target-match attempt resolved.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The target appeared in the accumulated text.
    Matched,
    /// The attempt exceeded the configured timeout. Expected and counted,
    /// not a fault.
    Timeout,
    /// The accumulated text grew past twice the target length without a
    /// match. Expected and counted, not a fault.
    Overflow,
}

/// Report for one completed fixed-window cycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WindowReport {
    /// 1-based index of the completed cycle.
    pub cycle: u64,
    /// Decoded message, including the zero-padded final character if the
    /// window ended mid-byte.
    pub text: String,
    pub freq: FreqSummary,
    pub completed: DateTime<Utc>,
}

/// Report for one resolved target-match attempt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttemptReport {
    pub outcome: Outcome,
    /// Text accumulated when the attempt resolved. Pending sub-byte bits
    /// are discarded, never flushed, in this mode.
    pub text: String,
    pub completed: DateTime<Utc>,
}

/// Emitted by [`CycleController`] whenever a cycle or attempt resolves.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum CycleEvent {
    Window(WindowReport),
    Attempt(AttemptReport),
}

/// Non-destructive view of controller state, independent of any reset.
/// Lets a caller report partial results on forced shutdown without
/// disturbing an in-progress cycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Total packets handled since construction.
    pub packets: u64,
    /// Completed fixed-window cycles.
    pub cycles: u64,
    /// Resolved target-match attempts by class.
    pub correct: u64,
    pub incorrect: u64,
    /// Materialized text of the in-progress cycle.
    pub text: String,
    /// Buffered bits (0-7) not yet forming a character.
    pub pending_bits: u8,
    /// Frequency aggregates for the in-progress cycle, `None` before the
    /// first packet.
    pub freq: Option<FreqSummary>,
}

impl Snapshot {
    /// Fraction of resolved attempts that matched, or `None` when nothing
    /// has resolved yet.
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.correct + self.incorrect;
        if total == 0 {
            return None;
        }
        Some(self.correct as f64 / total as f64)
    }
}

enum Decision {
    Continue,
    Window,
    Attempt(Outcome),
}

/// Orchestrates cycle lifecycle: decides per packet whether to keep
/// collecting, emit a result, or flag a failed attempt.
///
/// There are two states, idle and collecting, tracked by the presence of a
/// start instant. The controller has no terminal state; it runs until the
/// caller stops feeding it (see [`CycleController::done`]).
///
/// Single logical writer by construction: all mutation happens through
/// `&mut self` on the poll thread, so no packet's effects ever interleave
/// with another's.
#[derive(Debug)]
pub struct CycleController {
    policy: Policy,
    stats: FreqStats,
    message: MessageAssembler,
    /// Set while collecting; monotonic so timeout measurement is immune to
    /// system clock adjustments.
    started: Option<Instant>,
    packets: u64,
    window_count: u64,
    cycles: u64,
    correct: u64,
    incorrect: u64,
}

impl CycleController {
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        CycleController {
            policy,
            stats: FreqStats::new(),
            message: MessageAssembler::new(),
            started: None,
            packets: 0,
            window_count: 0,
            cycles: 0,
            correct: 0,
            incorrect: 0,
        }
    }

    /// Handle one decoded packet: start a cycle if idle, fold the frequency
    /// sample into the stats, append the MOSI bit, and evaluate the policy's
    /// termination condition. Returns the resolved cycle or attempt, if any.
    pub fn handle(&mut self, sample: &Sample) -> Option<CycleEvent> {
        // An attempt may have expired while the stream stalled; resolve it
        // first so this packet starts the next attempt.
        let expired = self.check_timeout();

        if self.started.is_none() {
            self.started = Some(Instant::now());
            trace!(packets = self.packets, "collection started");
        }
        self.packets += 1;
        self.window_count += 1;
        self.stats.update(sample.freq_hz);
        let completed = self.message.push_bit(sample.mosi);

        let decision = match &self.policy {
            Policy::FixedWindow(cfg) => {
                if self.window_count >= cfg.window {
                    Decision::Window
                } else {
                    Decision::Continue
                }
            }
            Policy::TargetMatch(cfg) => match completed {
                // Only a completed character can change the text.
                None => Decision::Continue,
                Some(_) => {
                    if self.message.contains(&cfg.target) {
                        Decision::Attempt(Outcome::Matched)
                    } else if self.message.text().len() > 2 * cfg.target.len() {
                        Decision::Attempt(Outcome::Overflow)
                    } else {
                        Decision::Continue
                    }
                }
            },
        };

        match decision {
            Decision::Continue => expired,
            Decision::Window => self.finish_window(),
            Decision::Attempt(outcome) => Some(self.finish_attempt(outcome)),
        }
    }

    /// Expire a stalled target-match attempt. Called by the poll loop each
    /// iteration so a timeout fires even when no packets arrive; a no-op
    /// for the fixed-window policy and while idle.
    pub fn check_timeout(&mut self) -> Option<CycleEvent> {
        let timeout = match &self.policy {
            Policy::TargetMatch(cfg) => cfg.timeout,
            Policy::FixedWindow(_) => return None,
        };
        let started = self.started?;
        if started.elapsed() <= timeout {
            return None;
        }
        // Bits that never materialized a character do not count as an
        // attempt, but the timer and buffers clear either way.
        if self.message.text().is_empty() {
            trace!("timeout with empty text, not counted");
            self.reset_cycle();
            return None;
        }
        Some(self.finish_attempt(Outcome::Timeout))
    }

    fn finish_window(&mut self) -> Option<CycleEvent> {
        // The window may end mid-byte; the trailing bits are zero-padded
        // into one final character.
        self.message.flush();
        self.cycles += 1;
        // at least one sample went in this window, so the summary exists
        let freq = self.stats.summary()?;
        let report = WindowReport {
            cycle: self.cycles,
            text: self.message.text().to_owned(),
            freq,
            completed: Utc::now(),
        };
        debug!(cycle = self.cycles, text = %report.text, "window complete");
        self.reset_cycle();
        Some(CycleEvent::Window(report))
    }

    fn finish_attempt(&mut self, outcome: Outcome) -> CycleEvent {
        match outcome {
            Outcome::Matched => self.correct += 1,
            Outcome::Timeout | Outcome::Overflow => self.incorrect += 1,
        }
        let report = AttemptReport {
            outcome,
            text: self.message.text().to_owned(),
            completed: Utc::now(),
        };
        debug!(
            ?outcome,
            correct = self.correct,
            incorrect = self.incorrect,
            text = %report.text,
            "attempt resolved"
        );
        self.reset_cycle();
        CycleEvent::Attempt(report)
    }

    /// Clear all cycle-scoped state and return to idle. The stats and the
    /// message buffer are reset together.
    fn reset_cycle(&mut self) {
        self.stats.reset();
        self.message.reset();
        self.window_count = 0;
        self.started = None;
    }

    /// True once the target-match attempt goal is reached. Always false for
    /// the fixed-window policy, which runs until externally cancelled.
    #[must_use]
    pub fn done(&self) -> bool {
        match &self.policy {
            Policy::FixedWindow(_) => false,
            Policy::TargetMatch(cfg) => self.correct + self.incorrect >= cfg.max_attempts,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            packets: self.packets,
            cycles: self.cycles,
            correct: self.correct,
            incorrect: self.incorrect,
            text: self.message.text().to_owned(),
            pending_bits: self.message.pending_bits(),
            freq: self.stats.summary(),
        }
    }
}
