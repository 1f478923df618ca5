//! Recovery of a JSON object (or array) from free-form model text

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use log::{debug, trace};

/// Extraction strategies, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy
{   /// Whole text is JSON
    Direct
  , /// Whole trimmed text is one fenced code block
    Fenced
  , /// First `{...}` in the text
    FirstObject
  , /// First `[...]` in the text
    FirstArray
}

fn fence_pattern() -> &'static Regex
{   static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
      Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$")
        .expect("valid fence pattern")
    })
}

fn object_pattern() -> &'static Regex
{   static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
      Regex::new(r"(?s)\{.*?\}").expect("valid object pattern")
    })
}

fn array_pattern() -> &'static Regex
{   static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
      Regex::new(r"(?s)\[.*?\]").expect("valid array pattern")
    })
}

/// Run the fallback chain; first strategy to yield an object or array wins
pub fn extract_json(text: &str) -> Option<Value>
{   extract_json_observed(text, |_| {})
}

/// Same as [`extract_json`], calling `on_attempt` before each strategy runs
pub fn extract_json_observed<F>(
  text: &str
, mut on_attempt: F
) -> Option<Value>
  where F: FnMut(Strategy)
{   if text.is_empty()
    {   return None;
    }

    on_attempt(Strategy::Direct);
    if let Some(value) = parse_structured(text)
    {   debug!("Parsed response as raw JSON");
        return Some(value);
    }

    on_attempt(Strategy::Fenced);
    if let Some(caps) = fence_pattern().captures(text.trim())
    {   if let Some(value) = caps.get(1)
          .and_then(|inner| parse_structured(inner.as_str()))
        {   debug!("Parsed response from fenced block");
            return Some(value);
        }
    }

    on_attempt(Strategy::FirstObject);
    if let Some(value) = scan_first(text, object_pattern())
    {   debug!("Parsed first embedded object");
        return Some(value);
    }

    on_attempt(Strategy::FirstArray);
    if let Some(value) = scan_first(text, array_pattern())
    {   debug!("Parsed first embedded array");
        return Some(value);
    }

    trace!("No JSON found in {} bytes of text", text.len());
    None
}

/// Only objects and arrays count; bare scalars are not structured output
fn parse_structured(candidate: &str) -> Option<Value>
{   match serde_json::from_str::<Value>(candidate)
    {   Ok(value) if value.is_object() || value.is_array() => Some(value)
      , _ => None
    }
}

/// Parse the first complete value starting at the non-greedy match, so
/// nested values still parse. One pass over the text.
fn scan_first(
  text: &str
, pattern: &Regex
) -> Option<Value>
{   let found = pattern.find(text)?;
    let tail = &text[found.start()..];

    let mut values = serde_json::Deserializer::from_str(tail)
      .into_iter::<Value>();
    match values.next()
    {   Some(Ok(value)) if value.is_object() || value.is_array() => {
          trace!("Candidate spans {} bytes", values.byte_offset());
          Some(value)
        }
      , Some(Err(e)) => {
          trace!("Candidate at byte {} did not parse: {}", found.start(), e);
          None
        }
      , _ => None
    }
}
