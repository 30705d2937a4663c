//! Single-shot timer that restarts on every trigger.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use tracing::debug;

use crate::{Error, Result};

enum Command {
    Schedule,
    Stop,
}

/// Runs `action` once `delay` has passed since the last [`schedule`] call.
///
/// [`schedule`]: DebounceTimer::schedule
pub struct DebounceTimer {
    name: String,
    delay: Duration,
    commands: Sender<Command>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceTimer {
    pub fn new(name: impl Into<String>, delay: Duration, action: impl Fn() + Send + 'static) -> Result<Self> {
        let name = name.into();
        let (commands, rx) = unbounded();
        let thread = std::thread::Builder::new()
            .name(format!("codemodel-{name}"))
            .spawn(move || run(rx, delay, action))
            .map_err(|source| Error::Thread {
                name: name.clone(),
                source,
            })?;
        Ok(Self {
            name,
            delay,
            commands,
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Start the timer, or restart it if it is already pending.
    pub fn schedule(&self) {
        if self.commands.send(Command::Schedule).is_err() {
            debug!(timer = %self.name, "schedule on stopped timer");
        }
    }

    /// Drop any pending run and end the timer thread.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
        if let Some(thread) = self.thread.lock().take()
            && thread.join().is_err()
        {
            tracing::warn!(timer = %self.name, "timer thread panicked");
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Stop);
    }
}

fn run(commands: Receiver<Command>, delay: Duration, action: impl Fn()) {
    let mut deadline: Option<Instant> = None;
    loop {
        let received = match deadline {
            Some(at) => commands.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Command::Schedule) => deadline = Some(Instant::now() + delay),
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {
                deadline = None;
                action();
            }
        }
    }
}
