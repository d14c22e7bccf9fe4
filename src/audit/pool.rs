//! Bounded-concurrency fan-out
//!
//! Runs one future per input item with at most `width` in flight. All items
//! are attempted; if any fail, the whole batch fails with a single error
//! carrying every worker failure, and nothing is returned to the caller.

use anyhow::{anyhow, Result};
use futures::stream::StreamExt;
use std::future::Future;

/// Apply `f` to every item with bounded concurrency.
///
/// Results are collected in completion order; callers that care about
/// identity must key their results, not rely on position.
pub async fn for_each<I, T, F, Fut, R>(width: usize, items: I, f: F) -> Result<Vec<R>>
where
    I: IntoIterator<Item = T>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let mut pending = futures::stream::iter(items.into_iter().map(f)).buffer_unordered(width);

    let mut results = Vec::new();
    let mut failures = Vec::new();
    while let Some(result) = pending.next().await {
        match result {
            Ok(value) => results.push(value),
            Err(err) => failures.push(err),
        }
    }

    if failures.is_empty() {
        Ok(results)
    } else {
        let summary = failures
            .iter()
            .map(|e| format!("{e:#}"))
            .collect::<Vec<_>>()
            .join("; ");
        Err(anyhow!(
            "{} of {} pooled tasks failed: {summary}",
            failures.len(),
            failures.len() + results.len()
        ))
    }
}
