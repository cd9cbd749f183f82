use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use snafu::location;

use crate::error::{Error, Result};

use super::queue::TaskQueue;
use super::shutdown::Shutdown;

pub type TimerAction = Box<dyn FnOnce() + Send + 'static>;

/// One-shot timer that runs an action on its own thread after a delay unless it is
/// cancelled first. Cancelling is idempotent, and a timer cancelled before it is
/// started never fires. Dropping the timer cancels it and joins its thread.
#[derive(Debug, Default)]
pub struct SimpleTimer {
    token: Shutdown,
    fired: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SimpleTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<F>(&self, delay: Duration, action: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Err(Error::Internal {
                message: "timer already started".to_string(),
                location: location!(),
            });
        }

        let token = self.token.clone();
        let fired = self.fired.clone();
        *handle = Some(
            thread::Builder::new()
                .name("timer".to_string())
                .spawn(move || {
                    if token.wait_timeout(delay) {
                        tracing::trace!("timer cancelled");
                        return;
                    }
                    fired.store(true, Ordering::SeqCst);
                    action();
                })?,
        );

        Ok(())
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// `true` once the timer thread has exited, whether it fired or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.lock().as_ref().is_some_and(JoinHandle::is_finished)
    }
}

impl Drop for SimpleTimer {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.get_mut().take() {
            if handle.join().is_err() {
                tracing::error!("timer action panicked");
            }
        }
    }
}

enum Task {
    Create {
        key: String,
        delay: Duration,
        action: TimerAction,
    },
    Cancel {
        key: String,
    },
    Stop,
}

/// Keeps at most one pending [`SimpleTimer`] per key.
///
/// Requests are pushed onto a [`TaskQueue`] and applied in order by a single
/// dispatcher thread, which is the only owner of the timers. Creating a timer for a
/// key that already has one cancels and replaces the old timer.
pub struct TimerManager {
    tasks: Arc<TaskQueue<Task>>,
    scheduled: Arc<DashMap<String, u64>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(TaskQueue::new()),
            scheduled: Arc::new(DashMap::new()),
            dispatcher: Mutex::new(None),
        }
    }

    /// Spawns the dispatcher thread. Starting twice is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.is_some() {
            return Ok(());
        }

        let tasks = self.tasks.clone();
        let scheduled = self.scheduled.clone();
        *dispatcher = Some(
            thread::Builder::new()
                .name("timer-manager".to_string())
                .spawn(move || Dispatcher::new(scheduled).run(&tasks))?,
        );

        Ok(())
    }

    pub fn create<F>(&self, key: impl Into<String>, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.tasks.push(Task::Create {
            key: key.into(),
            delay,
            action: Box::new(action),
        });
    }

    pub fn cancel(&self, key: impl Into<String>) {
        self.tasks.push(Task::Cancel { key: key.into() });
    }

    /// Cancels every pending timer and joins the dispatcher.
    pub fn stop(&self) {
        let Some(handle) = self.dispatcher.lock().take() else {
            return;
        };

        self.tasks.push(Task::Stop);
        if handle.join().is_err() {
            tracing::error!("timer dispatcher panicked");
        }
    }

    /// `true` while a timer for `key` is pending, as last applied by the dispatcher.
    pub fn is_scheduled(&self, key: impl AsRef<str>) -> bool {
        self.scheduled.contains_key(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Dispatcher {
    timers: HashMap<String, SimpleTimer>,
    scheduled: Arc<DashMap<String, u64>>,
    generation: u64,
}

impl Dispatcher {
    fn new(scheduled: Arc<DashMap<String, u64>>) -> Self {
        Self {
            timers: HashMap::new(),
            scheduled,
            generation: 0,
        }
    }

    fn run(mut self, tasks: &TaskQueue<Task>) {
        loop {
            match tasks.pop() {
                Task::Create { key, delay, action } => self.create(key, delay, action),
                Task::Cancel { key } => self.cancel(&key),
                Task::Stop => break,
            }
            self.timers.retain(|_, timer| !timer.is_finished());
        }

        for timer in self.timers.values() {
            timer.cancel();
        }
        self.timers.clear();
        self.scheduled.clear();
    }

    fn create(&mut self, key: String, delay: Duration, action: TimerAction) {
        self.generation += 1;
        let generation = self.generation;

        if let Some(previous) = self.timers.remove(&key) {
            previous.cancel();
        }

        // Registered before the thread starts so an immediate fire can clear it.
        self.scheduled.insert(key.clone(), generation);

        let scheduled = self.scheduled.clone();
        let fired_key = key.clone();
        let timer = SimpleTimer::new();
        let started = timer.start(delay, move || {
            scheduled.remove_if(&fired_key, |_, g| *g == generation);
            action();
        });

        match started {
            Ok(()) => {
                self.timers.insert(key, timer);
            }
            Err(e) => {
                self.scheduled.remove(&key);
                tracing::error!("failed to start timer {key}: {e}");
            }
        }
    }

    fn cancel(&mut self, key: &str) {
        self.scheduled.remove(key);
        if let Some(timer) = self.timers.remove(key) {
            timer.cancel();
        }
    }
}
