//! Bounded retry of transient transport failures with linear backoff

use async_trait::async_trait;
use std::time::Duration;
use log::{debug, warn, error};

use crate::providers::{GeminiRequest, RawResponse, Transport};

/// Retry policy for transport failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy
{   /// Total attempts, the first one included
    pub max_attempts: u32
  , /// Backoff unit; the wait after attempt n is n units
    pub backoff_step: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_attempts: u32
    , backoff_step: Duration
    ) -> Self
    {   RetryPolicy
        {   max_attempts: max_attempts.max(1)
          , backoff_step
        }
    }

    /// Wait before the attempt following `attempt` (1-based)
    pub fn backoff_for_attempt(
      &self
    , attempt: u32
    ) -> Duration
    {   debug!("Calculating backoff for attempt {}", attempt);
        self.backoff_step.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(3, Duration::from_secs(1))
    }
}

impl From<&crate::config::RetryConfig> for RetryPolicy
{   fn from(config: &crate::config::RetryConfig) -> Self
    {   RetryPolicy::new(
          config.max_attempts,
          Duration::from_secs(config.backoff_step_secs)
        )
    }
}

/// Delay primitive used between attempts
#[async_trait]
pub trait Sleeper: Send + Sync
{   async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer; dropping the caller's future cancels it
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper
{   async fn sleep(&self, duration: Duration)
    {   tokio::time::sleep(duration).await
    }
}

#[async_trait]
impl<S> Sleeper for std::sync::Arc<S>
  where S: Sleeper + ?Sized
{   async fn sleep(&self, duration: Duration)
    {   (**self).sleep(duration).await
    }
}

/// Send `body`, retrying transient failures up to the policy's cap.
///
/// Permanent failures return `NetworkError` after one call; running out
/// of attempts on transient failures returns `NetworkTimeout`. Any
/// response that arrives is returned as-is, whatever its status.
pub async fn send_with_retry<T, S>(
  transport: &T
, sleeper: &S
, policy: &RetryPolicy
, body: &GeminiRequest
) -> Result<RawResponse, crate::error::Error>
  where T: Transport + ?Sized
      , S: Sleeper + ?Sized
{   let mut attempt: u32 = 1;
    loop
    {   debug!("Sending attempt {}/{}", attempt, policy.max_attempts);
        match transport.send(body).await
        {   Ok(response) => {
              debug!(
                "Attempt {} got status {}",
                attempt, response.status
              );
              return Ok(response);
            }
          , Err(e) if e.is_transient() => {
              if attempt >= policy.max_attempts
              {   error!(
                    "Giving up after {} attempts: {}",
                    attempt, e
                  );
                  return Err(crate::error::Error::NetworkTimeout);
              }
              let delay = policy.backoff_for_attempt(attempt);
              warn!(
                "Attempt {} failed transiently ({}), retrying in {:?}",
                attempt, e, delay
              );
              sleeper.sleep(delay).await;
              attempt += 1;
            }
          , Err(e) => {
              error!("Permanent transport failure: {}", e);
              return Err(crate::error::Error::NetworkError(e.message));
            }
        }
    }
}
