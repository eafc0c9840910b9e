use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};

/// Drive a set of tasks to completion under an optional deadline.
///
/// Tasks run concurrently within the calling task. Results come back in
/// completion order together with a flag telling whether the deadline cut
/// the run short; tasks still pending at that point are dropped and absent
/// from the results, so callers keep whatever finished in time.
pub async fn join_with_deadline<I, F, T>(tasks: I, deadline: Option<Duration>) -> (Vec<T>, bool)
where
    I: IntoIterator<Item = F>,
    F: core::future::Future<Output = T>,
{
    let mut pending: FuturesUnordered<F> = tasks.into_iter().collect();
    let mut done: Vec<T> = Vec::with_capacity(pending.len());
    let drain = async {
        while let Some(v) = pending.next().await {
            done.push(v);
        }
    };
    let expired = match deadline {
        Some(d) => tokio::time::timeout(d, drain).await.is_err(),
        None => {
            drain.await;
            false
        }
    };
    (done, expired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_keeps_finished_tasks() {
        let tasks = [10u64, 20, 5_000].map(|ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        });
        let (mut done, expired) = join_with_deadline(tasks, Some(Duration::from_millis(100))).await;
        done.sort_unstable();
        assert!(expired);
        assert_eq!(done, vec![10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_deadline_waits_for_everything() {
        let tasks = [30u64, 10].map(|ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        });
        let (done, expired) = join_with_deadline(tasks, None).await;
        assert!(!expired);
        assert_eq!(done, vec![10, 30]);
    }
}
