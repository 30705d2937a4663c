//! Cancellable, pausable background tasks.
//!
//! Workers check [`TaskControl::wait_for_resume`] between files; cancellation
//! is never observed in the middle of a file.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Wake-up interval for blocked waits, so cancellation is noticed even
/// without a notification.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    Queued,
    Running,
    Completed,
    Canceled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Canceled)
    }
}

/// Shared state of one background task.
pub struct TaskControl {
    id: Uuid,
    name: String,
    cancel: CancellationToken,
    state: Mutex<TaskState>,
    state_changed: Condvar,
    paused: Mutex<bool>,
    resumed: Condvar,
    progress_value: AtomicUsize,
    progress_maximum: AtomicUsize,
    progress_visible: AtomicBool,
}

impl fmt::Debug for TaskControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskControl")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("progress", &self.progress())
            .finish()
    }
}

impl TaskControl {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cancel: CancellationToken::new(),
            state: Mutex::new(TaskState::Queued),
            state_changed: Condvar::new(),
            paused: Mutex::new(false),
            resumed: Condvar::new(),
            progress_value: AtomicUsize::new(0),
            progress_maximum: AtomicUsize::new(0),
            progress_visible: AtomicBool::new(true),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token for code that only needs to observe cancellation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation. A queued task never starts; a running one stops
    /// after its current file.
    pub fn cancel(&self) {
        self.cancel.cancel();
        let _guard = self.paused.lock();
        self.resumed.notify_all();
        let mut state = self.state.lock();
        if *state == TaskState::Queued {
            *state = TaskState::Canceled;
            self.state_changed.notify_all();
        }
    }

    pub fn pause(&self) {
        *self.paused.lock() = true;
    }

    pub fn resume(&self) {
        *self.paused.lock() = false;
        self.resumed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Block while paused. Returns `false` if the task was canceled.
    pub fn wait_for_resume(&self) -> bool {
        let mut paused = self.paused.lock();
        while *paused && !self.is_canceled() {
            self.resumed.wait_for(&mut paused, POLL_INTERVAL);
        }
        !self.is_canceled()
    }

    /// Queued → Running. Returns `false` if the task was canceled first.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        if self.is_canceled() || *state != TaskState::Queued {
            if !state.is_terminal() {
                *state = TaskState::Canceled;
                self.state_changed.notify_all();
            }
            return false;
        }
        *state = TaskState::Running;
        true
    }

    /// Enter the terminal state: canceled if cancellation was requested,
    /// completed otherwise.
    pub fn finish(&self) -> TaskState {
        let mut state = self.state.lock();
        if !state.is_terminal() {
            *state = if self.is_canceled() {
                TaskState::Canceled
            } else {
                TaskState::Completed
            };
            self.state_changed.notify_all();
        }
        *state
    }

    pub fn set_progress_range(&self, maximum: usize) {
        self.progress_maximum.store(maximum, Ordering::Relaxed);
        self.progress_value.store(0, Ordering::Relaxed);
    }

    pub fn advance(&self, by: usize) {
        self.progress_value.fetch_add(by, Ordering::Relaxed);
    }

    /// `(value, maximum)`.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_value.load(Ordering::Relaxed),
            self.progress_maximum.load(Ordering::Relaxed),
        )
    }

    pub fn set_progress_visible(&self, visible: bool) {
        self.progress_visible.store(visible, Ordering::Relaxed);
    }

    pub fn is_progress_visible(&self) -> bool {
        self.progress_visible.load(Ordering::Relaxed)
    }

    /// Block until the task is completed or canceled.
    ///
    /// On a pool thread this keeps executing other pool work while waiting,
    /// so waiting for a batch issued from a worker cannot starve the pool.
    pub fn wait(&self) -> TaskState {
        if rayon::current_thread_index().is_some() {
            loop {
                let state = self.state();
                if state.is_terminal() {
                    return state;
                }
                if !matches!(rayon::yield_now(), Some(rayon::Yield::Executed)) {
                    let mut state = self.state.lock();
                    if !state.is_terminal() {
                        self.state_changed
                            .wait_for(&mut state, Duration::from_millis(1));
                    }
                }
            }
        }
        let mut state = self.state.lock();
        while !state.is_terminal() {
            self.state_changed.wait_for(&mut state, POLL_INTERVAL);
        }
        *state
    }

    /// Like [`TaskControl::wait`], giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TaskState> {
        let mut state = self.state.lock();
        if !state.is_terminal() {
            self.state_changed.wait_for(&mut state, timeout);
        }
        state.is_terminal().then_some(*state)
    }
}

/// What collaborators hold for a running task.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    control: Arc<TaskControl>,
}

impl TaskHandle {
    pub fn new(control: Arc<TaskControl>) -> Self {
        Self { control }
    }

    /// A handle for work that is already done.
    pub fn completed(name: &str) -> Self {
        let control = TaskControl::new(name);
        control.start();
        control.finish();
        Self { control }
    }

    pub fn control(&self) -> &Arc<TaskControl> {
        &self.control
    }

    pub fn ptr_eq(&self, other: &TaskHandle) -> bool {
        Arc::ptr_eq(&self.control, &other.control)
    }
}

impl Deref for TaskHandle {
    type Target = TaskControl;

    fn deref(&self) -> &TaskControl {
        &self.control
    }
}

/// A task whose results stream back over a bounded channel.
#[derive(Debug)]
pub struct SearchHandle<T> {
    task: TaskHandle,
    results: Receiver<T>,
}

impl<T> SearchHandle<T> {
    pub fn new(task: TaskHandle, results: Receiver<T>) -> Self {
        Self { task, results }
    }

    pub fn task(&self) -> &TaskHandle {
        &self.task
    }

    pub fn receiver(&self) -> &Receiver<T> {
        &self.results
    }

    /// Next result; `None` once the search finished and everything was read.
    pub fn next_result(&self) -> Option<T> {
        loop {
            match self.results.recv_timeout(POLL_INTERVAL) {
                Ok(item) => return Some(item),
                Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    /// Drain every result until the search finishes.
    pub fn collect(self) -> (Vec<T>, TaskState) {
        let mut out = Vec::new();
        while let Some(item) = self.next_result() {
            out.push(item);
        }
        (out, self.task.wait())
    }

    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn pause(&self) {
        self.task.pause();
    }

    pub fn resume(&self) {
        self.task.resume();
    }
}

/// In-flight batches, pruned once more than [`FutureSynchronizer::PRUNE_ABOVE`]
/// are tracked.
#[derive(Debug, Default)]
pub struct FutureSynchronizer {
    handles: Vec<TaskHandle>,
    cancel_on_wait: bool,
}

impl FutureSynchronizer {
    pub const PRUNE_ABOVE: usize = 10;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cancel_on_wait(&mut self, cancel: bool) {
        self.cancel_on_wait = cancel;
    }

    pub fn add(&mut self, handle: TaskHandle) {
        if self.handles.len() >= Self::PRUNE_ABOVE {
            self.handles.retain(|h| !h.is_finished());
        }
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[TaskHandle] {
        &self.handles
    }

    pub fn cancel_all(&self) {
        for handle in &self.handles {
            handle.cancel();
        }
    }

    /// Wait for every tracked batch, canceling them first if configured to.
    pub fn wait_for_all(&mut self) {
        if self.cancel_on_wait {
            self.cancel_all();
        }
        for handle in self.handles.drain(..) {
            handle.wait();
        }
    }
}
