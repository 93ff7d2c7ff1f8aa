use std::future::Future;
use std::sync::Arc;

use exn::ResultExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{ErrorKind, Result};

/// Run `task` for every item on its own task, with at most as many running at
/// once as `semaphore` has permits. Results come back in completion order.
///
/// Dropping the returned future aborts every task that hasn't finished.
pub(crate) async fn for_each_bounded<T, R, F, Fut>(
    items: impl IntoIterator<Item = T>,
    semaphore: &Arc<Semaphore>,
    task: F,
) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let mut tasks = JoinSet::new();
    for item in items {
        let semaphore = Arc::clone(semaphore);
        let future = task(item);
        tasks.spawn(async move {
            // The semaphore is never closed, so a permit always arrives.
            let _permit = semaphore.acquire_owned().await.ok();
            future.await
        });
    }
    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.or_raise(|| ErrorKind::Interrupted)?);
    }
    Ok(results)
}
