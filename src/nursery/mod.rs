//! Structured concurrency scope.
//!
//! A [`Nursery`] runs a group of tasks that share one cancellation token.
//! The first task to fail cancels the others and becomes the result of
//! [`block`], which only returns once every task spawned into the scope has
//! returned.

use anyhow::anyhow;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};


/// Handle used to spawn tasks into a running scope. Cheap to clone.
#[derive(Clone)]
pub struct Nursery {
    token: CancellationToken,
    tracker: TaskTracker,
    first_error: Arc<Mutex<Option<anyhow::Error>>>,
}

impl Nursery {
    fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            tracker: TaskTracker::new(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawns a task into the scope. Tasks spawned after cancellation still
    /// start and are expected to observe the cancelled token right away.
    pub fn spawn<F>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let scope = self.clone();
        self.tracker.spawn(async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => {
                    debug!(component = "nursery", event = "task_done", task = %name, "task returned");
                }
                Ok(Err(err)) => scope.fail(&name, err),
                Err(panic) => {
                    let err = anyhow!("task {name} panicked: {}", panic_message(&*panic));
                    scope.fail(&name, err);
                }
            }
        });
    }

    /// Cancels every task of the scope.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Scope token, for handing to components that take a `CancellationToken`.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn fail(&self, name: &str, err: anyhow::Error) {
        {
            let mut first = self.first_error.lock();
            if first.is_none() {
                error!(
                    component = "nursery",
                    event = "task_failed",
                    task = %name,
                    error = %format!("{err:#}"),
                    "task failed, cancelling scope"
                );
                *first = Some(err);
            } else {
                debug!(
                    component = "nursery",
                    event = "task_failed",
                    task = %name,
                    error = %format!("{err:#}"),
                    "task failed after scope error"
                );
            }
        }
        self.token.cancel();
    }
}

/// Runs `body` with a fresh nursery and blocks until every spawned task has
/// returned. Cancelling `parent` cancels the scope. Returns the first error
/// raised by `body` or any task.
pub async fn block<F, Fut>(parent: &CancellationToken, body: F) -> anyhow::Result<()>
where
    F: FnOnce(Nursery) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let nursery = Nursery::new(parent);

    if let Err(err) = body(nursery.clone()).await {
        nursery.fail("body", err);
    }

    nursery.tracker.close();
    nursery.tracker.wait().await;
    nursery.token.cancel();

    let first = nursery.first_error.lock().take();
    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
