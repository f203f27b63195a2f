//! Panic containment for module phases.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::AuthenticationError;

/// Awaits a module phase, turning a panic into an [`AuthenticationError`].
pub(crate) async fn guarded<T, F>(phase: F) -> Result<T, AuthenticationError>
where
    F: Future<Output = Result<T, AuthenticationError>>,
{
    match AssertUnwindSafe(phase).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(AuthenticationError::new(format!(
            "authentication module panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
