//! Resilient aggregation of independent fetch tasks.
//!
//! A set of tasks is polled concurrently on the current runtime and joined
//! into one result with exactly one value per task, in input order. Tasks
//! that fail (or exceed their own timeout) are replaced by a fallback value
//! keyed by the task identifier. Failures are reported to an [`Observer`]
//! and exposed on the result; they are never returned as an error.
//!
//! Dropping the future returned by [`aggregate`] drops every outstanding
//! task with it, so cancellation is all-or-nothing.

use futures::future::{join_all, BoxFuture};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised before any task is launched.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// One independent unit of asynchronous work.
pub struct Task<'a, T> {
    id: String,
    timeout: Option<Duration>,
    future: BoxFuture<'a, anyhow::Result<T>>,
}

impl<'a, T> Task<'a, T> {
    /// Create a task from an identifier and the future producing its value.
    pub fn new<F>(id: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        Self {
            id: id.into(),
            timeout: None,
            future: Box::pin(future),
        }
    }

    /// Bound this task by its own deadline. Timing out counts as a failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn run(self, observer: &dyn Observer) -> Outcome<T> {
        let Task { id, timeout, future } = self;

        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, future).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("timed out after {}ms", limit.as_millis())),
            },
            None => future.await,
        };

        match result {
            Ok(value) => {
                observer.on_settled(&id, true);
                Outcome::Success(value)
            }
            Err(error) => {
                observer.on_failure(&id, &error);
                observer.on_settled(&id, false);
                Outcome::Failure { id, error }
            }
        }
    }
}

impl<T> std::fmt::Debug for Task<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Terminal state of a single task.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Failure { id: String, error: anyhow::Error },
}

/// A task that fell back, with its input position.
#[derive(Debug)]
pub struct TaskFailure {
    pub position: usize,
    pub id: String,
    pub error: anyhow::Error,
}

/// Joined output of one aggregation run.
#[derive(Debug)]
pub struct AggregateResult<T> {
    values: Vec<T>,
    failures: Vec<TaskFailure>,
}

impl<T> AggregateResult<T> {
    /// One value per input task, in input order.
    #[allow(dead_code)] // Callers take ownership through `into_values`
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[allow(dead_code)] // Never true for a result built by `aggregate`
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Failed tasks, ordered by input position.
    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn any_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    /// True when every slot holds a fallback value.
    pub fn all_failed(&self) -> bool {
        self.failures.len() == self.values.len()
    }
}

/// Receives task completion events as they happen.
pub trait Observer: Send + Sync {
    /// Called once for every task that failed or timed out.
    fn on_failure(&self, id: &str, error: &anyhow::Error);

    /// Called once for every task when it leaves the pending state.
    fn on_settled(&self, _id: &str, _succeeded: bool) {}
}

/// Observer that logs failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_failure(&self, id: &str, error: &anyhow::Error) {
        warn!("{} failed, using fallback: {:#}", id, error);
    }
}

/// Run `tasks` concurrently, logging failures with [`TracingObserver`].
#[allow(dead_code)] // The clients always pass their own observer
pub async fn aggregate<T, F>(
    tasks: Vec<Task<'_, T>>,
    fallback: F,
) -> Result<AggregateResult<T>, AggregateError>
where
    F: Fn(&str) -> T,
{
    aggregate_with(tasks, fallback, &TracingObserver).await
}

/// Run `tasks` concurrently and report each failure to `observer`.
///
/// The returned values line up with `tasks` by position no matter in which
/// order the tasks complete. An empty task list is rejected before anything
/// runs.
pub async fn aggregate_with<T, F>(
    tasks: Vec<Task<'_, T>>,
    fallback: F,
    observer: &dyn Observer,
) -> Result<AggregateResult<T>, AggregateError>
where
    F: Fn(&str) -> T,
{
    if tasks.is_empty() {
        return Err(AggregateError::InvalidArgument(
            "at least one task is required".to_string(),
        ));
    }

    let total = tasks.len();
    debug!("Aggregating {} tasks", total);

    // join_all yields outcomes in input order, not completion order
    let outcomes = join_all(tasks.into_iter().map(|task| task.run(observer))).await;

    let mut values = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (position, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Outcome::Success(value) => values.push(value),
            Outcome::Failure { id, error } => {
                values.push(fallback(&id));
                failures.push(TaskFailure {
                    position,
                    id,
                    error,
                });
            }
        }
    }

    debug!(
        "Aggregation complete: {} succeeded, {} fell back",
        total - failures.len(),
        failures.len()
    );

    Ok(AggregateResult { values, failures })
}
