// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-backoff retry raced against a cancellation token.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run `operation` until it succeeds, sleeping `backoff` after each failure.
///
/// `on_failure` sees every failed attempt. Returns `None` once `token` is
/// cancelled, whether during an attempt or during the backoff sleep.
pub async fn retry_with_backoff<T, E, F, Fut, N>(
    backoff: Duration,
    token: &CancellationToken,
    mut operation: F,
    mut on_failure: N,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    N: FnMut(&E),
{
    loop {
        if token.is_cancelled() {
            return None;
        }
        let result = tokio::select! {
            _ = token.cancelled() => return None,
            result = operation() => result,
        };
        match result {
            Ok(value) => return Some(value),
            Err(e) => {
                on_failure(&e);
                tokio::select! {
                    _ = token.cancelled() => return None,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }
}
