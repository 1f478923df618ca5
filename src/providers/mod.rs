//! LLM provider implementations and the transport seam

pub mod gemini;

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

// Re-export for convenience
pub use gemini::{GeminiRequest, GeminiTransport};

/// Status and body of a response that made it back over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse
{   pub status: u16
  , pub body: String
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind
{   /// Request exceeded its timeout
    Timeout
  , /// Could not establish a connection
    Connect
  , /// Anything else the transport reported
    Other
}

/// Failure before any response arrived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError
{   pub kind: TransportErrorKind
  , pub message: String
}

fn transient_message_pattern() -> &'static Regex
{   static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
      Regex::new(
        r"(?i)timed out|connection reset"
      ).expect("valid transient pattern")
    })
}

impl TransportError
{   pub fn new(
      kind: TransportErrorKind
    , message: impl Into<String>
    ) -> Self
    {   TransportError
        {   kind
          , message: message.into()
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self
    {   TransportError::new(TransportErrorKind::Timeout, message)
    }

    pub fn other(message: impl Into<String>) -> Self
    {   TransportError::new(TransportErrorKind::Other, message)
    }

    /// Timeouts and connection resets; worth another attempt
    pub fn is_transient(&self) -> bool
    {   self.kind == TransportErrorKind::Timeout
          || transient_message_pattern().is_match(&self.message)
    }
}

impl std::fmt::Display for TransportError
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

/// One network round trip to a provider
#[async_trait]
pub trait Transport: Send + Sync
{   async fn send(
      &self
    , body: &GeminiRequest
    ) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T> Transport for std::sync::Arc<T>
  where T: Transport + ?Sized
{   async fn send(
      &self
    , body: &GeminiRequest
    ) -> Result<RawResponse, TransportError>
    {   (**self).send(body).await
    }
}
