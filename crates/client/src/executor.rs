//! Time-budgeted execution of player callbacks.

use crate::error::ClientError;
use crate::metrics::{increment_callback_timeouts, CallbackTimer};
use crate::player::Player;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{error, warn};
use wolf_protocol::Request;

/// Runs each callback on a blocking worker and races it against the budget.
///
/// An elapsed budget never cancels the callback. The executor logs the
/// overrun and keeps waiting, so the reply is always the value the player
/// actually produced. In strict mode the overrun is returned as
/// `ResponseTimeout` once the callback has finished.
#[derive(Debug, Clone, Copy)]
pub struct CallbackExecutor {
    budget: Duration,
    strict: bool,
}

impl CallbackExecutor {
    pub fn new(budget: Duration, strict: bool) -> Self {
        Self { budget, strict }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Run a reply-producing callback under the response budget.
    ///
    /// # Errors
    /// `PlayerPanicked` if the callback panics; `ResponseTimeout` in strict
    /// mode when the budget elapsed.
    pub async fn run<P, T, F>(
        &self,
        player: &Arc<Mutex<P>>,
        request: Request,
        callback: F,
    ) -> Result<T, ClientError>
    where
        P: Player,
        T: Send + 'static,
        F: FnOnce(&mut P) -> T + Send + 'static,
    {
        let timer = CallbackTimer::new(request);
        let player = Arc::clone(player);
        let mut handle = tokio::task::spawn_blocking(move || {
            let mut player = player.lock();
            callback(&mut player)
        });

        match timeout(self.budget, &mut handle).await {
            Ok(joined) => joined.map_err(|e| panicked(request, e)),
            Err(_) => {
                let budget_ms = duration_ms(self.budget);
                warn!(
                    "Player callback for {} exceeded {}ms budget, waiting for completion",
                    request, budget_ms
                );
                increment_callback_timeouts(request);

                let value = handle.await.map_err(|e| panicked(request, e))?;
                let elapsed_ms = timer.elapsed_ms();
                if self.strict {
                    return Err(ClientError::ResponseTimeout {
                        request,
                        elapsed_ms,
                        budget_ms,
                    });
                }
                warn!(
                    "Player callback for {} completed late after {}ms",
                    request, elapsed_ms
                );
                Ok(value)
            }
        }
    }

    /// Run a notification callback that produces no reply. No budget applies.
    ///
    /// # Errors
    /// `PlayerPanicked` if the callback panics.
    pub async fn notify<P, F>(
        &self,
        player: &Arc<Mutex<P>>,
        request: Request,
        callback: F,
    ) -> Result<(), ClientError>
    where
        P: Player,
        F: FnOnce(&mut P) + Send + 'static,
    {
        let _timer = CallbackTimer::new(request);
        let player = Arc::clone(player);
        tokio::task::spawn_blocking(move || {
            let mut player = player.lock();
            callback(&mut player)
        })
        .await
        .map_err(|e| panicked(request, e))
    }
}

fn panicked(request: Request, err: JoinError) -> ClientError {
    if err.is_panic() {
        error!("Player callback for {} panicked", request);
    } else {
        error!("Player callback for {} was cancelled", request);
    }
    ClientError::PlayerPanicked(request)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
