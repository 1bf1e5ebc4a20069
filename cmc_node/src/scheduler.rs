//! Priority-ordered periodic task scheduler for the timer thread.
//!
//! Deadlines are absolute: each task's next deadline advances by exactly
//! one period per run, so pacing does not drift with execution time. When
//! several tasks are due at once they run in descending priority. A task
//! that falls more than a period behind is realigned to `now + period`
//! and the skipped periods are counted as overruns; it never runs in a
//! catch-up burst.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest single sleep, so shutdown is noticed promptly.
const MAX_SLEEP: Duration = Duration::from_millis(50);

/// Per-task counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub runs: u64,
    pub overruns: u64,
}

struct PeriodicTask {
    name: &'static str,
    period: Duration,
    priority: u8,
    next_due: Instant,
    stats: TaskStats,
    action: Box<dyn FnMut() + Send>,
}

/// Fixed set of periodic tasks.
#[derive(Default)]
pub struct Scheduler {
    /// Sorted by descending priority.
    tasks: Vec<PeriodicTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task first due at `start + period`. Higher `priority` runs
    /// first; equal priorities keep insertion order.
    pub fn add(
        &mut self,
        name: &'static str,
        period: Duration,
        priority: u8,
        start: Instant,
        action: impl FnMut() + Send + 'static,
    ) {
        let task = PeriodicTask {
            name,
            period,
            priority,
            next_due: start + period,
            stats: TaskStats::default(),
            action: Box::new(action),
        };
        let at = self
            .tasks
            .iter()
            .position(|t| t.priority < priority)
            .unwrap_or(self.tasks.len());
        self.tasks.insert(at, task);
        debug!(task = name, period_ms = period.as_millis() as u64, priority, "Task scheduled");
    }

    /// Run every task due at `now` once, in priority order. Returns the
    /// number of tasks run.
    pub fn run_due(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        for task in self.tasks.iter_mut().filter(|t| t.next_due <= now) {
            (task.action)();
            task.stats.runs += 1;
            ran += 1;

            task.next_due += task.period;
            if task.next_due <= now {
                let behind = now.duration_since(task.next_due);
                let skipped = (behind.as_nanos() / task.period.as_nanos().max(1)) as u64 + 1;
                task.stats.overruns += skipped;
                task.next_due = now + task.period;
                warn!(task = task.name, skipped, "Periodic task fell behind, realigned");
            }
        }
        ran
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.iter().map(|t| t.next_due).min()
    }

    pub fn stats(&self, name: &str) -> Option<TaskStats> {
        self.tasks.iter().find(|t| t.name == name).map(|t| t.stats)
    }

    /// Run until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::Acquire) {
            let now = Instant::now();
            let wait = self
                .next_deadline()
                .map_or(MAX_SLEEP, |due| due.saturating_duration_since(now))
                .min(MAX_SLEEP);
            if !wait.is_zero() {
                std::thread::sleep(wait);
                continue;
            }
            self.run_due(now);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnMut() + Send>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let make = move |name: &'static str| {
            let log = log2.clone();
            Box::new(move || log.lock().push(name)) as Box<dyn FnMut() + Send>
        };
        (log, make)
    }

    #[test]
    fn nothing_runs_before_first_period() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.add("tick", Duration::from_secs(1), 10, t0, || {});
        assert_eq!(s.run_due(t0 + Duration::from_millis(999)), 0);
        assert_eq!(s.run_due(t0 + Duration::from_secs(1)), 1);
        assert_eq!(s.stats("tick"), Some(TaskStats { runs: 1, overruns: 0 }));
    }

    #[test]
    fn due_tasks_run_in_priority_order() {
        let t0 = Instant::now();
        let (log, make) = recorder();
        let mut s = Scheduler::new();
        s.add("acquire", Duration::from_millis(250), 1, t0, make("acquire"));
        s.add("second", Duration::from_secs(1), 10, t0, make("second"));

        s.run_due(t0 + Duration::from_millis(250));
        s.run_due(t0 + Duration::from_millis(500));
        s.run_due(t0 + Duration::from_millis(750));
        s.run_due(t0 + Duration::from_secs(1));
        assert_eq!(*log.lock(), vec!["acquire", "acquire", "acquire", "second", "acquire"]);
    }

    #[test]
    fn deadlines_are_absolute() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.add("tick", Duration::from_millis(100), 0, t0, || {});
        // Late by 30 ms: the next deadline stays on the 100 ms grid.
        s.run_due(t0 + Duration::from_millis(130));
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn falling_behind_realigns_without_burst() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.add("tick", Duration::from_millis(100), 0, t0, || {});
        assert_eq!(s.run_due(t0 + Duration::from_millis(450)), 1);
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(550)));
        assert_eq!(s.stats("tick").unwrap().overruns, 3);
        assert_eq!(s.run_due(t0 + Duration::from_millis(500)), 0);
    }

    #[test]
    fn run_returns_when_flag_cleared() {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let mut s = Scheduler::new();
        s.add("stop", Duration::from_millis(1), 0, Instant::now(), move || {
            flag.store(false, Ordering::Release)
        });
        s.run(&running);
        assert_eq!(s.stats("stop").unwrap().runs, 1);
    }
}
