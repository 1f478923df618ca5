//! Configuration for the generator, its retry policy and the site voice

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use log::{debug, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const DEFAULT_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_PERSONA: &str
  = "You are an assistant writing for the site 'Tony Reviews Things'. \
     The voice blends The Verge, Engadget, and Android Police: modern tech \
     journalism, concise, confident, and never cheesy. Use strong but not \
     gimmicky intros, clear H2/H3 sectioning, and avoid keyword stuffing. \
     Default to US English. Ensure responses are production-ready and \
     factual. Apply this tone consistently across reviews, guides, deals, \
     and social content.";

pub const DEFAULT_RESPONSE_CONTRACT: &str
  = "Respond with structured JSON as requested. Include HTML fragments \
     inside the JSON when asked. Avoid markdown unless explicitly \
     requested. Ensure the JSON is valid and includes all required keys.";

/// Largest accepted backoff unit, one hour
pub const MAX_BACKOFF_STEP_SECS: u64 = 3600;

/// Retry behaviour for transient transport failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Total attempts, the first one included
    pub max_attempts: u32
  , /// Linear backoff unit; retry n waits n of these
    pub backoff_step_secs: u64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_attempts: 3
          , backoff_step_secs: 1
        }
    }
}

/// Brand and voice metadata sent with every request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig
{   pub brand: String
  , pub site_voice: String
  , /// Fixed system preamble every instruction is appended to
    pub persona: String
  , /// Output contract placed in the user envelope
    pub response_contract: String
}

impl Default for VoiceConfig
{   fn default() -> Self
    {   VoiceConfig
        {   brand: "Tony Reviews Things".to_string()
          , site_voice: "Verge/Engadget/Android Police hybrid".to_string()
          , persona: DEFAULT_PERSONA.to_string()
          , response_contract: DEFAULT_RESPONSE_CONTRACT.to_string()
        }
    }
}

/// Generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig
{   /// Provider API key
    pub api_key: Option<String>
  , /// Model name
    pub model: String
  , /// API base URL
    pub api_base: String
  , /// Per-attempt request timeout in seconds
    pub timeout_secs: u64
  , pub retry: RetryConfig
  , pub voice: VoiceConfig
  , /// Amazon associates tag applied to deal links
    pub amazon_tag: Option<String>
}

impl Default for GeneratorConfig
{   fn default() -> Self
    {   GeneratorConfig
        {   api_key: None
          , model: DEFAULT_MODEL.to_string()
          , api_base: DEFAULT_API_BASE.to_string()
          , timeout_secs: 30
          , retry: RetryConfig::default()
          , voice: VoiceConfig::default()
          , amazon_tag: None
        }
    }
}

impl GeneratorConfig
{   /// Defaults overlaid with GEMINI_* / AMAZON_TAG environment variables
    pub fn from_env() -> Result<Self, crate::error::Error>
    {   let mut config = GeneratorConfig::default();

        if let Some(key) = env_value("GEMINI_API_KEY")
        {   config.api_key = Some(key);
        }
        if let Some(model) = env_value("GEMINI_MODEL")
        {   config.model = model;
        }
        if let Some(base) = env_value("GEMINI_API_BASE")
        {   config.api_base = base;
        }
        if let Some(raw) = env_value("GEMINI_TIMEOUT_SECS")
        {   config.timeout_secs = raw.parse().map_err(|_| {
              crate::error::Error::InvalidConfiguration(
                format!("GEMINI_TIMEOUT_SECS is not a number: {}", raw)
              )
            })?;
        }
        if let Some(tag) = env_value("AMAZON_TAG")
        {   config.amazon_tag = Some(tag);
        }

        debug!(
          "Loaded config from env (model: {}, key set: {})",
          config.model,
          config.api_key.is_some()
        );
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file; absent fields take defaults
    pub fn from_json_file(
      path: impl AsRef<Path>
    ) -> Result<Self, crate::error::Error>
    {   let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })?;
        let config: GeneratorConfig = serde_json::from_str(&raw)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.model.trim().is_empty()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "model name is empty".to_string()
            ));
        }
        if self.timeout_secs == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "timeout_secs must be positive".to_string()
            ));
        }
        if self.retry.max_attempts == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "retry.max_attempts must be at least 1".to_string()
            ));
        }
        if self.retry.backoff_step_secs > MAX_BACKOFF_STEP_SECS
        {   return Err(crate::error::Error::InvalidConfiguration(
              format!(
                "retry.backoff_step_secs must be at most {}",
                MAX_BACKOFF_STEP_SECS
              )
            ));
        }
        Ok(())
    }

    /// API key, if one is configured and non-blank
    pub fn api_key(&self) -> Option<&str>
    {   self.api_key
          .as_deref()
          .map(str::trim)
          .filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration
    {   Duration::from_secs(self.timeout_secs)
    }
}

fn env_value(name: &str) -> Option<String>
{   match std::env::var(name)
    {   Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string())
      , Ok(_) => None
      , Err(std::env::VarError::NotPresent) => None
      , Err(e) => {
          warn!("Ignoring {}: {}", name, e);
          None
        }
    }
}
