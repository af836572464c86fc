use super::command::Command;
use super::timer::{TimerEntry, TimerQueue};

use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Cloneable handle used to send commands to the reactor thread.
#[derive(Clone)]
pub(crate) struct ReactorHandle {
    transmitter: Sender<Command>,
}

impl ReactorHandle {
    /// Sends a command to the reactor.
    ///
    /// Returns `false` if the reactor has already shut down.
    pub(crate) fn send(&self, command: Command) -> bool {
        self.transmitter.send(command).is_ok()
    }
}

/// The timer reactor.
///
/// Commands arrive over a channel; between commands the reactor blocks
/// until the earliest pending deadline.
pub(crate) struct Reactor {
    receiver: Receiver<Command>,
    timers: TimerQueue,
}

impl Reactor {
    pub(crate) fn new() -> (Self, ReactorHandle) {
        let (transmitter, receiver) = channel();

        (
            Self {
                receiver,
                timers: TimerQueue::new(),
            },
            ReactorHandle { transmitter },
        )
    }

    /// Spawns the reactor on a dedicated thread.
    pub(crate) fn start(name: String) -> io::Result<(ReactorHandle, JoinHandle<()>)> {
        let (mut reactor, handle) = Self::new();

        let thread = thread::Builder::new().name(name).spawn(move || {
            reactor.run();
        })?;

        Ok((handle, thread))
    }

    /// Runs the reactor loop until shutdown or until every handle is gone.
    pub(crate) fn run(&mut self) {
        loop {
            let command = match self.timers.next_deadline() {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    match self.receiver.recv_timeout(timeout) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                None => match self.receiver.recv() {
                    Ok(command) => Some(command),
                    Err(_) => return,
                },
            };

            match command {
                Some(Command::SetTimer {
                    deadline,
                    waker,
                    cancelled,
                }) => {
                    self.timers.push(TimerEntry {
                        deadline,
                        waker,
                        cancelled,
                    });
                }
                Some(Command::Shutdown) => {
                    tracing::debug!(pending = self.timers.len(), "reactor shutting down");
                    return;
                }
                None => {}
            }

            let fired = self.timers.expire(Instant::now());
            if !fired.is_empty() {
                tracing::trace!(count = fired.len(), "timers expired");
            }

            for waker in fired {
                waker.wake();
            }
        }
    }
}
