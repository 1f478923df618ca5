//! Provider-agnostic request and result types, and the request builder

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use log::{debug, trace};

/// Default sampling temperature, overridable per call
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Caller directives appended to the persona preamble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction
{   /// Free text, appended on its own line
    Text(String)
  , /// Rendered as a bulleted "Additional directives" block
    Directives(Vec<String>)
}

impl Instruction
{   fn is_empty(&self) -> bool
    {   match self
        {   Instruction::Text(text) => text.is_empty()
          , Instruction::Directives(items) => items.is_empty()
        }
    }

    fn stripped(&self) -> Instruction
    {   match self
        {   Instruction::Text(text) => {
              Instruction::Text(strip_markup(text))
            }
          , Instruction::Directives(items) => {
              Instruction::Directives(
                items.iter().map(|i| strip_markup(i)).collect()
              )
            }
        }
    }
}

impl From<&str> for Instruction
{   fn from(s: &str) -> Self
    {   Instruction::Text(s.to_string())
    }
}

impl From<String> for Instruction
{   fn from(s: String) -> Self
    {   Instruction::Text(s)
    }
}

impl From<Vec<String>> for Instruction
{   fn from(items: Vec<String>) -> Self
    {   Instruction::Directives(items)
    }
}

impl From<Vec<&str>> for Instruction
{   fn from(items: Vec<&str>) -> Self
    {   Instruction::Directives(
          items.into_iter().map(str::to_string).collect()
        )
    }
}

/// Envelope wrapped around every user payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEnvelope
{   pub brand: String
  , pub site_voice: String
  , pub instructions: String
  , pub payload: Value
}

/// Fully built generation request; immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest
{   persona_preamble: String
  , extra_directives: Option<Instruction>
  , user_payload: UserEnvelope
  , generation_params: Map<String, Value>
}

impl GenerationRequest
{   pub fn persona_preamble(&self) -> &str
    {   &self.persona_preamble
    }

    pub fn extra_directives(&self) -> Option<&Instruction>
    {   self.extra_directives.as_ref()
    }

    pub fn user_payload(&self) -> &UserEnvelope
    {   &self.user_payload
    }

    pub fn generation_params(&self) -> &Map<String, Value>
    {   &self.generation_params
    }

    /// Persona preamble followed by the caller's directives
    pub fn system_instruction(&self) -> String
    {   let mut out = self.persona_preamble.clone();
        match &self.extra_directives
        {   Some(Instruction::Directives(items)) => {
              out.push_str("\nAdditional directives:");
              for item in items
              {   out.push_str("\n- ");
                  out.push_str(item);
              }
            }
          , Some(Instruction::Text(text)) => {
              out.push('\n');
              out.push_str(text);
            }
          , None => {}
        }
        out
    }

    /// The user message text. Serialization happens here, at send time.
    pub fn user_message(&self) -> Result<String, crate::error::Error>
    {   Ok(serde_json::to_string(&self.user_payload)?)
    }
}

/// Build a request from the configured voice and the caller's inputs.
/// Never fails; caller params win over the default temperature.
pub fn build_request(
  voice: &crate::config::VoiceConfig
, instruction: Option<Instruction>
, user_payload: Value
, generation_params: Option<Map<String, Value>>
) -> GenerationRequest
{   let extra_directives = instruction
      .filter(|i| !i.is_empty())
      .map(|i| i.stripped());

    let mut params = Map::new();
    params.insert(
      "temperature".to_string(),
      Value::from(DEFAULT_TEMPERATURE)
    );
    if let Some(overrides) = generation_params
    {   for (key, value) in overrides
        {   params.insert(key, value);
        }
    }

    let request = GenerationRequest
    {   persona_preamble: voice.persona.clone()
      , extra_directives
      , user_payload: UserEnvelope
        {   brand: voice.brand.clone()
          , site_voice: voice.site_voice.clone()
          , instructions: voice.response_contract.clone()
          , payload: user_payload
        }
      , generation_params: params
    };

    debug!(
      "Built generation request ({} params, directives: {})",
      request.generation_params.len(),
      request.extra_directives.is_some()
    );
    trace!("Generation request: {:?}", request);
    request
}

/// Successful generation; `text` is never empty
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult
{   /// Provider response body as received
    pub raw: Value
  , /// Candidate text
    pub text: String
  , /// Object or array recovered from `text`, if any
    pub parsed: Option<Value>
}

impl GenerationResult
{   /// Parsed JSON object, or `InvalidJson` when none was recovered
    pub fn require_object(
      &self
    ) -> Result<&Map<String, Value>, crate::error::Error>
    {   self.parsed
          .as_ref()
          .and_then(Value::as_object)
          .ok_or(crate::error::Error::InvalidJson)
    }
}

fn script_style_pattern() -> &'static Regex
{   static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
      Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>")
        .expect("valid script/style pattern")
    })
}

fn tag_pattern() -> &'static Regex
{   static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
      Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern")
    })
}

/// Remove script/style elements with their content, drop all other
/// tags, and trim.
pub fn strip_markup(text: &str) -> String
{   let without_code = script_style_pattern().replace_all(text, "");
    tag_pattern()
      .replace_all(&without_code, "")
      .trim()
      .to_string()
}
