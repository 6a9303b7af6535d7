//! Periodic ticker

use crate::bindings::{Controllable, MethodArgs, MethodBindingRegistry};
use crate::error::{ActionError, Result};
use serde_json::Value;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Counts ticks on a background task
///
/// The tick count is published on a `watch` channel so listeners can react
/// to each tick. Dropping the controller stops the task.
pub struct TimerController {
    period: Duration,
    max_ticks: Option<u64>,
    ticks: Arc<watch::Sender<u64>>,
    paused: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TimerController {
    pub const CATEGORY: &'static str = "timer";

    pub fn new(period: Duration) -> Self {
        let (ticks, _) = watch::channel(0);
        Self {
            period,
            max_ticks: None,
            ticks: Arc::new(ticks),
            paused: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Stop on its own after `max_ticks` ticks
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn ticks(&self) -> u64 {
        *self.ticks.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.ticks.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Start ticking; returns false if already running
    ///
    /// Needs a Tokio runtime on the calling thread and a non-zero period.
    pub fn start(&self) -> Result<bool> {
        if self.period.is_zero() {
            return Err(ActionError::InvalidParameters(
                "timer period must be greater than zero".to_string(),
            ));
        }
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(false);
        }
        let handle = Handle::try_current()
            .map_err(|e| ActionError::ExecutionFailed(format!("timer needs a runtime: {e}")))?;

        let period = self.period;
        let max_ticks = self.max_ticks;
        let ticks = self.ticks.clone();
        let paused = self.paused.clone();
        paused.store(false, Ordering::SeqCst);

        *task = Some(handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if paused.load(Ordering::SeqCst) {
                    continue;
                }
                let mut done = false;
                ticks.send_modify(|count| {
                    *count += 1;
                    done = max_ticks.is_some_and(|max| *count >= max);
                });
                if done {
                    debug!(ticks = *ticks.borrow(), "Timer reached its tick limit");
                    break;
                }
            }
        }));
        Ok(true)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Zero the tick count without stopping
    pub fn reset(&self) {
        self.ticks.send_replace(0);
    }

    /// Stop the task; returns whether one was running
    pub fn cancel(&self) -> bool {
        match self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(task) => {
                let running = !task.is_finished();
                task.abort();
                running
            }
            None => false,
        }
    }
}

impl Drop for TimerController {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TimerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerController")
            .field("period", &self.period)
            .field("ticks", &self.ticks())
            .field("running", &self.is_running())
            .field("paused", &self.is_paused())
            .finish()
    }
}

impl Controllable for TimerController {
    fn category(&self) -> &str {
        Self::CATEGORY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn start(timer: &TimerController, _args: &MethodArgs) -> Result<Value> {
    timer.start().map(Value::Bool)
}

fn pause(timer: &TimerController, _args: &MethodArgs) -> Result<Value> {
    timer.pause();
    Ok(Value::Null)
}

fn resume(timer: &TimerController, _args: &MethodArgs) -> Result<Value> {
    timer.resume();
    Ok(Value::Null)
}

fn reset(timer: &TimerController, _args: &MethodArgs) -> Result<Value> {
    timer.reset();
    Ok(Value::Null)
}

fn cancel(timer: &TimerController, _args: &MethodArgs) -> Result<Value> {
    Ok(Value::Bool(timer.cancel()))
}

pub(super) fn register(registry: &mut MethodBindingRegistry) {
    let methods: [(&'static str, fn(&TimerController, &MethodArgs) -> Result<Value>); 5] = [
        ("start", start),
        ("pause", pause),
        ("resume", resume),
        ("reset", reset),
        ("cancel", cancel),
    ];
    registry.register_methods(TimerController::CATEGORY, methods);
}
