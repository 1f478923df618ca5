use std::fmt;

/// Custom error type for draftgen operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// No API key configured for the provider
    MissingApiKey(String)
  , /// Transient transport failures outlasted every attempt
    NetworkTimeout
  , /// Transport failed in a way retrying will not fix
    NetworkError(String)
  , /// Provider answered, but not with usable candidate text
    ProviderError
    {   status: u16
      , message: String
    }
  , /// No JSON object could be recovered from the response text
    InvalidJson
  , /// A brief is missing a field the flow cannot do without
    MissingField(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Request body could not be serialized
    Serialization(String)
  , /// Backend task is gone
    BackendClosed
  , /// Generic error
    Other(String)
}

impl Error
{   /// Provider status code, when the failure came from a response
    pub fn status(&self) -> Option<u16>
    {   match self
        {   Error::ProviderError { status, .. } => Some(*status)
          , _ => None
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(provider) => {
              write!(f, "Missing API key for: {}", provider)
            }
          , Error::NetworkTimeout => {
              write!(f, "Request timed out after retries")
            }
          , Error::NetworkError(msg) => {
              write!(f, "Network error: {}", msg)
            }
          , Error::ProviderError { status, message } => {
              write!(f, "Provider error ({}): {}", status, message)
            }
          , Error::InvalidJson => {
              write!(f, "Invalid response: no JSON object found")
            }
          , Error::MissingField(field) => {
              write!(f, "Missing required field: {}", field)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Serialization(msg) => {
              write!(f, "Serialization error: {}", msg)
            }
          , Error::BackendClosed => {
              write!(f, "Generator backend disconnected")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::Serialization(e.to_string())
    }
}
