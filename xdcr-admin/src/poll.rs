// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded polling for a condition that will eventually become true.

use std::future::Future;
use std::time::Duration;
use std::time::Instant;
use thiserror::Error;

/// Why [`wait_for_condition`] gave up.
#[derive(Debug, Error)]
pub enum Error<E> {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("failed permanently")]
    PermanentError(#[source] E),
}

/// Result of one check of the condition.
#[derive(Debug, Error)]
pub enum CondCheckError<E> {
    #[error("condition not yet true")]
    NotYet,
    #[error("condition check failed")]
    Failed(#[from] E),
}

/// Invoke `cond` every `poll_interval` until it succeeds or fails
/// permanently, giving up with [`Error::TimedOut`] once `poll_max` has
/// elapsed. The condition is always checked at least once.
pub async fn wait_for_condition<T, E, Func, Fut>(
    mut cond: Func,
    poll_interval: &Duration,
    poll_max: &Duration,
) -> Result<T, Error<E>>
where
    Func: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CondCheckError<E>>>,
{
    let poll_start = Instant::now();
    loop {
        match cond().await {
            Ok(value) => return Ok(value),
            Err(CondCheckError::NotYet) => (),
            Err(CondCheckError::Failed(error)) => {
                return Err(Error::PermanentError(error));
            }
        }
        let elapsed = poll_start.elapsed();
        if elapsed > *poll_max {
            return Err(Error::TimedOut(elapsed));
        }
        tokio::time::sleep(*poll_interval).await;
    }
}
