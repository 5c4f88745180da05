use std::time::Duration;

use twdl_core::{EmptyManifestPolicy, LookupOutcome, LookupSession, RetryScheduler, Tick, Verdict};
use twdl_logging::{twdl_debug, twdl_warn};

use crate::bridge::{BridgeClient, BridgeError};
use crate::clock::Clock;

/// Poll the content view until the session resolves, aborts or times out.
///
/// Only a lost content view is an error; a probe the view could not answer
/// counts as "not settled yet".
pub async fn lookup(
    bridge: &BridgeClient,
    clock: &dyn Clock,
    session: LookupSession,
    initial_delay: Duration,
    policy: EmptyManifestPolicy,
) -> Result<LookupOutcome, BridgeError> {
    let mut scheduler = RetryScheduler::new(session, initial_delay, policy);
    loop {
        match scheduler.poll(clock.now()) {
            Tick::Sleep(delay) => clock.sleep(delay).await,
            Tick::Probe => {
                let answer = bridge.lookup_images(session.token).await;
                let now = clock.now();
                let verdict = match answer {
                    Ok((outcome, echoed)) if echoed == session.token => {
                        twdl_debug!("probe #{}: {}", scheduler.probes(), outcome);
                        scheduler.on_outcome(outcome, now)
                    }
                    Ok((_, echoed)) => {
                        twdl_warn!(
                            "ignoring stale probe answer for {:?} (current {:?})",
                            echoed,
                            session.token
                        );
                        scheduler.on_no_answer(now)
                    }
                    Err(BridgeError::View(message)) => {
                        twdl_warn!("probe #{} failed: {}", scheduler.probes(), message);
                        scheduler.on_no_answer(now)
                    }
                    Err(err) => return Err(err),
                };
                if let Verdict::Rescheduled { after } = verdict {
                    twdl_debug!("retrying in {:?}", after);
                }
            }
            Tick::Done(outcome) => return Ok(outcome),
            Tick::Idle => {
                scheduler.on_no_answer(clock.now());
            }
        }
    }
}
