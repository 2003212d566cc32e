// src/core/invoker.rs

//! The invocation adapter: the single point where the two operation
//! completion styles collapse into one. Callers always observe a plain
//! awaited result, whether the handler finished before returning or handed
//! back deferred work.

use anyhow::Result;

use crate::models::{BagInstance, BoundValue, Completion, OperationSpec};

/// Invokes `operation` on `instance` with an already-bound argument list.
///
/// An immediate completion returns without touching the scheduler; a
/// deferred completion is awaited until the handler's work finishes. There
/// is no cancellation or timeout here: a handler that never completes hangs
/// the dispatch indefinitely.
///
/// Whatever the handler body fails with propagates out unchanged.
pub async fn invoke(
    operation: &OperationSpec,
    instance: BagInstance,
    values: Vec<BoundValue>,
) -> Result<()> {
    match operation.call(instance, values) {
        Completion::Ready(result) => result,
        Completion::Deferred(future) => {
            log::debug!(
                "Operation '{}' deferred its completion; awaiting.",
                operation.method()
            );
            future.await
        }
    }
}
