// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Task scheduler for timed operations

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

struct ScheduledTask {
    interval: Duration,
    enabled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Runs named callbacks on fixed intervals.
///
/// The first run happens one full interval after scheduling. Tasks are
/// aborted when removed or when the scheduler is dropped.
pub struct Scheduler {
    tasks: HashMap<String, ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Schedule `task`, replacing any task with the same name. Must be called
    /// from inside a tokio runtime.
    pub fn add_task<F>(&mut self, name: &str, interval: Duration, task: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let enabled = Arc::new(AtomicBool::new(true));
        let flag = enabled.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    task();
                }
            }
        });

        if let Some(old) = self.tasks.insert(
            name.to_string(),
            ScheduledTask {
                interval,
                enabled,
                handle,
            },
        ) {
            old.handle.abort();
        }
        debug!("Scheduled task '{}' with interval {:?}", name, interval);
    }

    pub fn remove_task(&mut self, name: &str) -> bool {
        match self.tasks.remove(name) {
            Some(task) => {
                task.handle.abort();
                debug!("Removed task '{}'", name);
                true
            }
            None => false,
        }
    }

    /// Pause or resume a task without losing its cadence
    pub fn enable_task(&self, name: &str, enabled: bool) {
        if let Some(task) = self.tasks.get(name) {
            task.enabled.store(enabled, Ordering::Release);
        }
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.tasks.get(name).map(|t| t.interval)
    }

    /// Abort every task
    pub fn shutdown(&mut self) {
        for (name, task) in self.tasks.drain() {
            task.handle.abort();
            debug!("Stopped task '{}'", name);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_each_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let mut scheduler = Scheduler::new();
        scheduler.add_task("tick", Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_and_remove() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let mut scheduler = Scheduler::new();
        scheduler.add_task("tick", Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.enable_task("tick", false);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        scheduler.enable_task("tick", true);
        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(scheduler.remove_task("tick"));
        assert!(!scheduler.is_scheduled("tick"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
