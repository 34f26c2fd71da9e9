// Copyright the Airport authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Every handler entrypoint is wrapped so a panicking user callback
//! becomes an `Internal` status instead of tearing down the connection
//! (or the process, under a single-threaded executor).

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

use crate::error::AirportError;

/// Runs `fut` to completion, catching any panic and turning it into
/// `AirportError::InternalPanic`. The `AssertUnwindSafe` wrapper is sound
/// here because a caught panic always results in an error response; we
/// never observe or rely on `fut`'s state after unwinding past it.
pub async fn guard<F, T>(fut: F) -> Result<T, AirportError>
where
    F: Future<Output = Result<T, AirportError>> + Send,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(&panic);
            error!(panic = %message, "handler panicked");
            Err(AirportError::InternalPanic { message })
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
