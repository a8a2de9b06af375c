//! Task state normalization and the task-completion poller.
//!
//! Long-running FortiManager operations (policy installation, script
//! execution, device registration) return a task id which has to be polled
//! until the task reaches a terminal state. The appliance reports the
//! `state` field inconsistently as either a string label or an integer
//! code; both forms are normalized into [`TaskState`] at this boundary and
//! the raw representation never propagates further.
//!
//! [`wait_for_task`] is a bounded cooperative loop: fetch, check, sleep.
//! Status fetches for one wait are strictly sequential, a timeout is an
//! ordinary outcome rather than an error, and a transport failure during a
//! fetch propagates immediately without internal retries.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{FmgError, Result};

/// Canonical task states.
///
/// The integer table (0=pending, 1=running, 3=cancelled, 4=done, 5=error)
/// applies to the `/task/task` `state` field only. Device status fields
/// elsewhere in the API use their own encodings and are not decoded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Done,
    Error,
    Cancelled,
}

impl TaskState {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Error | TaskState::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Done => "done",
            TaskState::Error => "error",
            TaskState::Cancelled => "cancelled",
        }
    }

    /// Normalize the raw `state` field.
    ///
    /// Unknown labels and codes decode to `None` and are treated as
    /// non-terminal by the poller, so an unrecognized state keeps being
    /// polled instead of being misreported as finished.
    pub fn decode(value: &Value) -> Option<TaskState> {
        match value {
            Value::String(label) => match label.to_ascii_lowercase().as_str() {
                "pending" => Some(TaskState::Pending),
                "running" => Some(TaskState::Running),
                "done" => Some(TaskState::Done),
                "error" => Some(TaskState::Error),
                "cancelled" => Some(TaskState::Cancelled),
                _ => None,
            },
            Value::Number(code) => match code.as_i64()? {
                0 => Some(TaskState::Pending),
                1 => Some(TaskState::Running),
                3 => Some(TaskState::Cancelled),
                4 => Some(TaskState::Done),
                5 => Some(TaskState::Error),
                _ => None,
            },
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one capability the poller consumes: fetch the current status record
/// of a task by identifier. Implemented by the API client; tests supply
/// scripted fakes.
#[async_trait]
pub trait TaskSource {
    async fn fetch_task(&self, task_id: i64) -> Result<Value>;
}

/// Polling budget for one wait.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Wall-clock budget for the whole wait.
    pub timeout: Duration,
    /// Suspension between consecutive status fetches.
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Final outcome of one wait.
///
/// `completed` distinguishes "the task reached a terminal state" from "the
/// polling budget ran out"; `success` is true only for the `done` state.
/// Transport failures never produce an outcome, they propagate as errors.
#[derive(Debug, Clone, Serialize)]
pub struct WaitOutcome {
    pub success: bool,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TaskState>,
    /// Last observed task record; absent if no fetch succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Value>,
    pub message: String,
}

/// Poll `source` until task `task_id` reaches a terminal state or the
/// timeout elapses.
///
/// The timeout is measured against a monotonic clock sampled before each
/// iteration; it is a cooperative budget, so a single slow fetch can
/// overrun it by one fetch latency. The poller performs at most
/// `ceil(timeout / poll_interval) + 1` fetches.
pub async fn wait_for_task<S>(source: &S, task_id: i64, options: WaitOptions) -> Result<WaitOutcome>
where
    S: TaskSource + ?Sized,
{
    if task_id <= 0 {
        return Err(FmgError::Validation(format!(
            "task id must be positive, got {task_id}"
        )));
    }
    if options.timeout.is_zero() {
        return Err(FmgError::Validation("timeout must be > 0".to_string()));
    }
    if options.poll_interval.is_zero() {
        return Err(FmgError::Validation("poll interval must be > 0".to_string()));
    }

    let started = Instant::now();
    let mut last_task: Option<Value> = None;

    loop {
        if started.elapsed() > options.timeout {
            tracing::warn!(
                task_id,
                timeout_secs = options.timeout.as_secs(),
                "task wait timed out before reaching a terminal state"
            );
            return Ok(WaitOutcome {
                success: false,
                completed: false,
                state: None,
                task: last_task,
                message: format!(
                    "task {task_id} timed out after {} seconds",
                    options.timeout.as_secs()
                ),
            });
        }

        let task = source.fetch_task(task_id).await?;
        let state = task.get("state").and_then(TaskState::decode);

        if let Some(state) = state
            && state.is_terminal()
        {
            tracing::debug!(task_id, state = state.as_str(), "task reached terminal state");
            return Ok(WaitOutcome {
                success: state == TaskState::Done,
                completed: true,
                state: Some(state),
                task: Some(task),
                message: format!("task {task_id} completed with state: {}", state.as_str()),
            });
        }

        last_task = Some(task);
        tokio::time::sleep(options.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a scripted sequence of fetch results; the last entry repeats
    /// once the script is exhausted.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Value>>>,
        repeat: Value,
        fetches: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Value>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                repeat: json!({"id": 0, "state": "running"}),
                fetches: AtomicUsize::new(0),
            }
        }

        fn repeating(state: Value) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                repeat: json!({"id": 0, "state": state, "percent": 40}),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskSource for ScriptedSource {
        async fn fetch_task(&self, _task_id: i64) -> Result<Value> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().expect("script lock");
            match script.pop_front() {
                Some(entry) => entry,
                None => Ok(self.repeat.clone()),
            }
        }
    }

    fn options(timeout_secs: u64, interval_secs: u64) -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_secs(timeout_secs),
            poll_interval: Duration::from_secs(interval_secs),
        }
    }

    #[test]
    fn decode_normalizes_labels_and_codes() {
        assert_eq!(TaskState::decode(&json!("done")), Some(TaskState::Done));
        assert_eq!(TaskState::decode(&json!("DONE")), Some(TaskState::Done));
        assert_eq!(TaskState::decode(&json!(4)), Some(TaskState::Done));
        assert_eq!(TaskState::decode(&json!(5)), Some(TaskState::Error));
        assert_eq!(TaskState::decode(&json!(3)), Some(TaskState::Cancelled));
        assert_eq!(TaskState::decode(&json!(0)), Some(TaskState::Pending));
        assert_eq!(TaskState::decode(&json!(1)), Some(TaskState::Running));
        assert_eq!(TaskState::decode(&json!("aborting")), None);
        assert_eq!(TaskState::decode(&json!(42)), None);
        assert_eq!(TaskState::decode(&Value::Null), None);
    }

    #[test]
    fn terminal_states_are_exactly_done_error_cancelled() {
        assert!(TaskState::Done.is_terminal());
        assert!(TaskState::Error.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Running.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_two_polls() {
        // task 123: running, running, done; 1s interval, 300s budget.
        let source = ScriptedSource::new(vec![
            Ok(json!({"id": 123, "state": "running", "percent": 10})),
            Ok(json!({"id": 123, "state": "running", "percent": 60})),
            Ok(json!({"id": 123, "state": "done", "percent": 100})),
        ]);
        let started = Instant::now();

        let outcome = wait_for_task(&source, 123, options(300, 1))
            .await
            .expect("no transport failure");

        assert!(outcome.success);
        assert!(outcome.completed);
        assert_eq!(outcome.state, Some(TaskState::Done));
        assert_eq!(outcome.task.as_ref().and_then(|t| t["percent"].as_i64()), Some(100));
        assert_eq!(source.fetch_count(), 3);
        // Two inter-poll suspensions on the paused clock.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn numeric_terminal_state_matches_string_form() {
        let by_label = ScriptedSource::new(vec![Ok(json!({"id": 9, "state": "done"}))]);
        let by_code = ScriptedSource::new(vec![Ok(json!({"id": 9, "state": 4}))]);

        let label_outcome = wait_for_task(&by_label, 9, options(30, 1)).await.expect("ok");
        let code_outcome = wait_for_task(&by_code, 9, options(30, 1)).await.expect("ok");

        assert_eq!(label_outcome.state, code_outcome.state);
        assert_eq!(label_outcome.success, code_outcome.success);
        assert!(code_outcome.success && code_outcome.completed);
    }

    #[tokio::test(start_paused = true)]
    async fn error_state_is_completed_but_not_successful() {
        // task 789: integer state 5 maps to "error".
        let source = ScriptedSource::new(vec![Ok(json!({"id": 789, "state": 5}))]);

        let outcome = wait_for_task(&source, 789, options(60, 5)).await.expect("ok");

        assert!(outcome.completed);
        assert!(!outcome.success);
        assert_eq!(outcome.state, Some(TaskState::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_state_is_completed_but_not_successful() {
        let source = ScriptedSource::new(vec![Ok(json!({"id": 11, "state": "cancelled"}))]);

        let outcome = wait_for_task(&source, 11, options(60, 5)).await.expect("ok");

        assert!(outcome.completed);
        assert!(!outcome.success);
        assert_eq!(outcome.state, Some(TaskState::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_raising() {
        // task 456: always running, 5s interval, 10s budget.
        let source = ScriptedSource::repeating(json!("running"));
        let started = Instant::now();

        let outcome = wait_for_task(&source, 456, options(10, 5)).await.expect("timeout is Ok");

        assert!(!outcome.completed);
        assert!(!outcome.success);
        assert!(outcome.message.contains("timed out"), "message: {}", outcome.message);
        // Last observed payload is retained on timeout.
        assert!(outcome.task.is_some());
        // Bounded fetch count: ceil(10 / 5) + 1.
        assert!(source.fetch_count() <= 3, "fetched {} times", source.fetch_count());
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_state_keeps_polling_until_timeout() {
        let source = ScriptedSource::repeating(json!(42));

        let outcome = wait_for_task(&source, 7, options(10, 5)).await.expect("ok");

        assert!(!outcome.completed);
        assert!(outcome.message.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_propagates_instead_of_timing_out() {
        let source = ScriptedSource::new(vec![Err(FmgError::Connection(
            "connection reset by peer".to_string(),
        ))]);

        let err = wait_for_task(&source, 5, options(300, 5))
            .await
            .expect_err("fetch failure must propagate");

        assert!(matches!(err, FmgError::Connection(_)));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_mid_poll_propagates() {
        let source = ScriptedSource::new(vec![
            Ok(json!({"id": 6, "state": "running"})),
            Err(FmgError::Connection("gateway went away".to_string())),
        ]);

        let err = wait_for_task(&source, 6, options(300, 5)).await.expect_err("propagates");
        assert!(matches!(err, FmgError::Connection(_)));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn rejects_non_positive_task_id_and_zero_budgets() {
        let source = ScriptedSource::repeating(json!("running"));

        let err = wait_for_task(&source, 0, WaitOptions::default()).await.expect_err("id");
        assert!(matches!(err, FmgError::Validation(_)));

        let err = wait_for_task(&source, 1, options(0, 5)).await.expect_err("timeout");
        assert!(matches!(err, FmgError::Validation(_)));

        let err = wait_for_task(&source, 1, options(10, 0)).await.expect_err("interval");
        assert!(matches!(err, FmgError::Validation(_)));

        // None of the rejected calls may have touched the source.
        assert_eq!(source.fetch_count(), 0);
    }
}
