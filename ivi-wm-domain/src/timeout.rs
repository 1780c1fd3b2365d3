//! Single re-armable deadline for the in-flight transition request.
//!
//! One background task owns one `tokio::time::Sleep`. Arming and disarming
//! are messages to that task, and re-arming resets the same `Sleep`. When
//! the deadline passes, the request number it was armed for is sent on the
//! expiry channel; the receiver decides whether that request is still
//! current.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::types::RequestId;

#[derive(Debug)]
enum TimerCommand {
    Arm { request: RequestId, deadline: Instant },
    Disarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Timeout supervisor needs a running tokio runtime")]
pub struct NoRuntime;

#[derive(Debug)]
pub struct TimeoutSupervisor {
    commands: mpsc::UnboundedSender<TimerCommand>,
    armed: Option<RequestId>,
}

impl TimeoutSupervisor {
    /// Starts the timer task on the current runtime and returns the
    /// supervisor with the receiving end of its expiry channel.
    pub fn spawn() -> Result<(Self, mpsc::UnboundedReceiver<RequestId>), NoRuntime> {
        let handle = Handle::try_current().map_err(|_| NoRuntime)?;
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        handle.spawn(run_timer(command_rx, expired_tx));
        Ok((Self { commands, armed: None }, expired_rx))
    }

    /// Schedules expiry of `request` at `deadline`.
    pub fn arm(&mut self, request: RequestId, deadline: Instant) {
        debug!(req = request, "Arming transition timer");
        self.send(TimerCommand::Arm { request, deadline });
        self.armed = Some(request);
    }

    /// Moves the pending deadline, reusing the running timer.
    pub fn rearm(&mut self, request: RequestId, deadline: Instant) {
        debug!(req = request, previous = ?self.armed, "Re-arming transition timer");
        self.send(TimerCommand::Arm { request, deadline });
        self.armed = Some(request);
    }

    /// Convenience for `arm(request, now + after)`.
    pub fn arm_after(&mut self, request: RequestId, after: Duration) {
        let deadline = Instant::now() + after;
        if self.armed.is_some() {
            self.rearm(request, deadline);
        } else {
            self.arm(request, deadline);
        }
    }

    pub fn disarm(&mut self) {
        if let Some(request) = self.armed.take() {
            debug!(req = request, "Disarming transition timer");
            self.send(TimerCommand::Disarm);
        }
    }

    /// Request the timer was last armed for, unless disarmed since.
    pub fn armed_for(&self) -> Option<RequestId> {
        self.armed
    }

    fn send(&self, command: TimerCommand) {
        if self.commands.send(command).is_err() {
            debug!("Timer task has stopped; command dropped");
        }
    }
}

async fn run_timer(mut commands: mpsc::UnboundedReceiver<TimerCommand>, expired: mpsc::UnboundedSender<RequestId>) {
    let sleep = tokio::time::sleep_until(Instant::now());
    tokio::pin!(sleep);
    let mut armed: Option<RequestId> = None;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(TimerCommand::Arm { request, deadline }) => {
                    sleep.as_mut().reset(deadline);
                    armed = Some(request);
                }
                Some(TimerCommand::Disarm) => armed = None,
                None => break,
            },
            () = &mut sleep, if armed.is_some() => {
                if let Some(request) = armed.take() {
                    trace!(req = request, "Transition timer expired");
                    if expired.send(request).is_err() {
                        break;
                    }
                }
            }
        }
    }
    trace!("Timer task finished");
}
