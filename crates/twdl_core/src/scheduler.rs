use std::time::{Duration, Instant};

use crate::config::EmptyManifestPolicy;
use crate::outcome::{Manifest, ProbeOutcome};
use crate::session::LookupSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupState {
    Scheduled,
    Probing,
    Rescheduled,
    Resolved,
    Aborted,
    TimedOut,
}

impl LookupState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LookupState::Resolved | LookupState::Aborted | LookupState::TimedOut
        )
    }
}

/// How a resolved lookup ended for the current URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Manifest),
    /// The page reported an error that will not go away; skip the URL.
    Skipped { message: String },
}

/// Terminal result of one lookup, reported exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Resolved(Resolution),
    Aborted { reason: String },
    TimedOut { elapsed: Duration },
}

/// What the driver has to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Sleep(Duration),
    Probe,
    Done(LookupOutcome),
    /// Nothing to do: waiting for an outcome, or the result was already taken.
    Idle,
}

/// Immediate effect of feeding an outcome into the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Resolved,
    Rescheduled { after: Duration },
    Aborted,
    TimedOut,
    /// The scheduler was not waiting for an outcome.
    Ignored,
}

/// Polling state machine for one [`LookupSession`].
///
/// Time is an input: the caller passes `now` on every step, so the machine
/// itself never reads a clock. The timeout is measured from the session epoch
/// and is checked both before issuing a probe and when an outcome arrives.
#[derive(Debug)]
pub struct RetryScheduler {
    session: LookupSession,
    initial_delay: Duration,
    policy: EmptyManifestPolicy,
    state: LookupState,
    slept: bool,
    probes: u32,
    report: Option<LookupOutcome>,
}

impl RetryScheduler {
    pub fn new(
        session: LookupSession,
        initial_delay: Duration,
        policy: EmptyManifestPolicy,
    ) -> Self {
        Self {
            session,
            initial_delay,
            policy,
            state: LookupState::Scheduled,
            slept: false,
            probes: 0,
            report: None,
        }
    }

    pub fn session(&self) -> &LookupSession {
        &self.session
    }

    pub fn state(&self) -> LookupState {
        self.state
    }

    /// Number of probes issued so far.
    pub fn probes(&self) -> u32 {
        self.probes
    }

    pub fn poll(&mut self, now: Instant) -> Tick {
        match self.state {
            LookupState::Scheduled | LookupState::Rescheduled if !self.slept => {
                self.slept = true;
                let delay = if self.probes == 0 {
                    self.initial_delay
                } else {
                    self.session.period
                };
                Tick::Sleep(delay)
            }
            LookupState::Scheduled | LookupState::Rescheduled => {
                if self.session.is_expired(now) {
                    self.time_out(now);
                    return self.take_report();
                }
                self.state = LookupState::Probing;
                self.slept = false;
                self.probes += 1;
                Tick::Probe
            }
            LookupState::Probing => Tick::Idle,
            LookupState::Resolved | LookupState::Aborted | LookupState::TimedOut => {
                self.take_report()
            }
        }
    }

    pub fn on_outcome(&mut self, outcome: ProbeOutcome, now: Instant) -> Verdict {
        if self.state != LookupState::Probing {
            return Verdict::Ignored;
        }
        if self.session.is_expired(now) {
            self.time_out(now);
            return Verdict::TimedOut;
        }
        match outcome {
            ProbeOutcome::Abort { reason } => {
                self.finish(LookupState::Aborted, LookupOutcome::Aborted { reason });
                Verdict::Aborted
            }
            ProbeOutcome::Error {
                message,
                retry_later: false,
            } => {
                self.finish(
                    LookupState::Resolved,
                    LookupOutcome::Resolved(Resolution::Skipped { message }),
                );
                Verdict::Resolved
            }
            ProbeOutcome::Error {
                retry_later: true, ..
            }
            | ProbeOutcome::RetryLater { .. } => self.reschedule(),
            ProbeOutcome::Found(manifest)
                if manifest.is_empty() && self.policy == EmptyManifestPolicy::Retry =>
            {
                self.reschedule()
            }
            ProbeOutcome::Found(manifest) => {
                self.finish(
                    LookupState::Resolved,
                    LookupOutcome::Resolved(Resolution::Found(manifest)),
                );
                Verdict::Resolved
            }
        }
    }

    /// The probe produced no usable answer (lost or stale response).
    pub fn on_no_answer(&mut self, now: Instant) -> Verdict {
        if self.state != LookupState::Probing {
            return Verdict::Ignored;
        }
        if self.session.is_expired(now) {
            self.time_out(now);
            return Verdict::TimedOut;
        }
        self.reschedule()
    }

    fn reschedule(&mut self) -> Verdict {
        self.state = LookupState::Rescheduled;
        self.slept = false;
        Verdict::Rescheduled {
            after: self.session.period,
        }
    }

    fn time_out(&mut self, now: Instant) {
        let elapsed = self.session.elapsed(now);
        self.finish(LookupState::TimedOut, LookupOutcome::TimedOut { elapsed });
    }

    fn finish(&mut self, state: LookupState, outcome: LookupOutcome) {
        self.state = state;
        self.report = Some(outcome);
    }

    fn take_report(&mut self) -> Tick {
        match self.report.take() {
            Some(outcome) => Tick::Done(outcome),
            None => Tick::Idle,
        }
    }
}
