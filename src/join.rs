//! Fan-out/fan-in of independent async branches.

use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Error, Debug)]
pub enum BranchError<E> {
    #[error(transparent)]
    Failed(E),

    /// The branch panicked or was aborted before signalling completion
    #[error("branch {0} ended without completing")]
    Lost(usize),
}

/// Run every branch as its own task and wait for all of them to settle.
///
/// Results come back in branch order, whatever the completion order.
/// The completion channel holds one slot per branch and branches signal with `try_send`,
/// so a branch never waits for the collector. When the collecting future is dropped,
/// the branches still run to completion and their results are discarded.
/// There is no sibling cancellation: a failing branch does not stop the others.
pub async fn join_settled<T, E, F>(branches: Vec<F>) -> Vec<Result<T, BranchError<E>>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let width = branches.len();
    if width == 0 {
        return vec![];
    }

    let (tx, mut rx) = mpsc::channel::<(usize, Result<T, E>)>(width);

    for (index, branch) in branches.into_iter().enumerate() {
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = branch.await;
            if tx.try_send((index, result)).is_err() {
                trace!(index, "fan-in abandoned, discarding branch result");
            }
        });
    }

    // only the branches hold senders now, so `recv` ends once all of them are gone
    drop(tx);

    let mut slots: Vec<Option<Result<T, E>>> = (0..width).map(|_| None).collect();
    let mut settled = 0;

    while settled < width {
        let Some((index, result)) = rx.recv().await else {
            break;
        };
        slots[index] = Some(result);
        settled += 1;
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(BranchError::Failed(err)),
            None => Err(BranchError::Lost(index)),
        })
        .collect()
}
