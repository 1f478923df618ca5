//! Turning a generation result into a draft article

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use log::{debug, warn};

use crate::briefs::{Brief, BriefKind};
use crate::config::GeneratorConfig;
use crate::request::GenerationResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialCaptions
{   pub threads: Option<String>
  , pub facebook: Option<String>
  , pub generic: Option<String>
}

impl SocialCaptions
{   fn from_value(value: &Value) -> Option<Self>
    {   let map = value.as_object()?;
        Some(SocialCaptions
        {   threads: map.get("threads").and_then(text_of)
          , facebook: map.get("facebook").and_then(text_of)
          , generic: map.get("generic").and_then(text_of)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry
{   pub question: String
  , pub answer: String
}

/// Outcome of checking the JSON Schema a review response carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaStatus
{   /// Has `$schema`, `type` and `properties`
    Valid
  , /// An object, but missing one of the above
    Incomplete
  , Missing
  , NotAnObject
}

/// Draft article built from a model response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft
{   pub kind: BriefKind
  , pub title: String
  , pub slug: Option<String>
  , pub meta_description: Option<String>
  , pub focus_keyphrase: Option<String>
  , pub excerpt: String
  , /// HTML, passed through untouched
    pub content_html: String
  , pub social_captions: Option<SocialCaptions>
  , pub pros: Vec<String>
  , pub cons: Vec<String>
  , pub faq: Vec<FaqEntry>
  , pub schema: Option<Value>
  , /// Set for reviews only
    pub schema_status: Option<SchemaStatus>
  , /// Keys the instruction asked for that the response lacks
    pub missing_keys: Vec<String>
  , /// Full response object after brief enrichment
    pub data: Map<String, Value>
}

impl Draft
{   /// Build a draft; fails with `InvalidJson` when the result carries
    /// no JSON object.
    pub fn from_result<B>(
      brief: &B
    , config: &GeneratorConfig
    , result: &GenerationResult
    ) -> Result<Self, crate::error::Error>
      where B: Brief + ?Sized
    {   let mut data = result.require_object()?.clone();

        let missing_keys: Vec<String> = brief.required_keys()
          .into_iter()
          .filter(|k| !data.contains_key(*k))
          .map(str::to_string)
          .collect();
        if !missing_keys.is_empty()
        {   warn!(
              "{} response missing keys: {}",
              brief.kind().as_str(),
              missing_keys.join(", ")
            );
        }

        brief.enrich(&mut data, config);

        let title = data.get("title")
          .and_then(text_of)
          .map(|t| sanitize_text(&t))
          .filter(|t| !t.is_empty())
          .unwrap_or_else(|| brief.fallback_title());

        let (schema_status, schema) = if brief.kind() == BriefKind::Review
        {   let (status, schema) = check_schema(data.get("schema"));
            if status != SchemaStatus::Valid
            {   warn!(
                  "review schema issue: {:?} (payload: {})",
                  status,
                  schema.as_ref().map(Value::to_string).unwrap_or_default()
                );
            }
            (Some(status), schema)
        } else
        {   (None, data.get("schema").cloned())
        };

        let draft = Draft
        {   kind: brief.kind()
          , title
          , slug: sanitized_field(&data, "slug")
          , meta_description: sanitized_field(&data, "meta_description")
          , focus_keyphrase: sanitized_field(&data, "focus_keyphrase")
          , excerpt: sanitized_field(&data, "excerpt").unwrap_or_default()
          , content_html: data.get("content_html")
              .and_then(text_of)
              .unwrap_or_default()
          , social_captions: data.get("social_captions")
              .and_then(SocialCaptions::from_value)
          , pros: string_list(data.get("pros"))
          , cons: string_list(data.get("cons"))
          , faq: faq_entries(data.get("faq"))
          , schema
          , schema_status
          , missing_keys
          , data
        };

        debug!(
          "Built {} draft: {}",
          draft.kind.as_str(), draft.title
        );
        Ok(draft)
    }
}

/// Validate a response's `schema` field, decoding it first when the model
/// sent it as a JSON string.
pub fn check_schema(
  schema: Option<&Value>
) -> (SchemaStatus, Option<Value>)
{   let schema = match schema
    {   Some(value) if !is_blank(value) => value.clone()
      , _ => return (SchemaStatus::Missing, None)
    };

    let schema = match schema
    {   Value::String(raw) => {
          match serde_json::from_str::<Value>(&raw)
          {   Ok(decoded) => decoded
            , Err(_) => Value::String(raw)
          }
        }
      , other => other
    };

    let status = match schema.as_object()
    {   None => SchemaStatus::NotAnObject
      , Some(map) => {
          let has = |key: &str| map.get(key).map(|v| !is_blank(v))
            .unwrap_or(false);
          if has("$schema") && has("type") && has("properties")
          {   SchemaStatus::Valid
          } else
          {   SchemaStatus::Incomplete
          }
        }
    };
    (status, Some(schema))
}

/// Generic caption from stored captions, if it has any text
pub fn stored_generic_caption(
  stored: Option<&SocialCaptions>
) -> Option<String>
{   stored
      .and_then(|c| c.generic.as_deref())
      .map(sanitize_text)
      .filter(|c| !c.is_empty())
}

fn whitespace_pattern() -> &'static Regex
{   static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
      Regex::new(r"\s+").expect("valid whitespace pattern")
    })
}

/// Plain single-line text: markup removed, whitespace collapsed
pub fn sanitize_text(text: &str) -> String
{   let stripped = crate::request::strip_markup(text);
    whitespace_pattern()
      .replace_all(&stripped, " ")
      .trim()
      .to_string()
}

fn text_of(value: &Value) -> Option<String>
{   match value
    {   Value::String(s) => Some(s.clone())
      , Value::Number(n) => Some(n.to_string())
      , Value::Bool(b) => Some(b.to_string())
      , _ => None
    }
}

fn sanitized_field(
  data: &Map<String, Value>
, key: &str
) -> Option<String>
{   data.get(key)
      .and_then(text_of)
      .map(|t| sanitize_text(&t))
      .filter(|t| !t.is_empty())
}

fn string_list(value: Option<&Value>) -> Vec<String>
{   value
      .and_then(Value::as_array)
      .map(|items| items.iter().filter_map(text_of).collect())
      .unwrap_or_default()
}

fn faq_entries(value: Option<&Value>) -> Vec<FaqEntry>
{   value
      .and_then(Value::as_array)
      .map(|items| {
        items.iter()
          .filter_map(|item| {
            let question = item.get("question").and_then(text_of)?;
            let answer = item.get("answer").and_then(text_of)?;
            Some(FaqEntry { question, answer })
          })
          .collect()
      })
      .unwrap_or_default()
}

fn is_blank(value: &Value) -> bool
{   match value
    {   Value::Null => true
      , Value::Bool(b) => !b
      , Value::String(s) => s.is_empty() || s == "0"
      , Value::Array(a) => a.is_empty()
      , Value::Object(o) => o.is_empty()
      , Value::Number(n) => n.as_f64() == Some(0.0)
    }
}
