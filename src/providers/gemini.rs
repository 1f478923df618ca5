use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use log::{debug, trace, error};

use super::{RawResponse, Transport, TransportError, TransportErrorKind};

const UNEXPECTED_RESPONSE: &str = "Unexpected response from Gemini.";

// ===== Wire Types =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part
{   pub text: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , pub parts: Vec<Part>
}

/// Body of a generateContent call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiRequest
{   pub system_instruction: Content
  , pub contents: Vec<Content>
  , #[serde(rename = "generationConfig")]
    pub generation_config: Map<String, Value>
}

impl GeminiRequest
{   /// Encode a built request; the user envelope is serialized here
    pub fn from_request(
      request: &crate::request::GenerationRequest
    ) -> Result<Self, crate::error::Error>
    {   let user_text = request.user_message()?;
        Ok(GeminiRequest
        {   system_instruction: Content
            {   role: None
              , parts: vec![Part { text: request.system_instruction() }]
            }
          , contents: vec![
              Content
              {   role: Some("user".to_string())
                , parts: vec![Part { text: user_text }]
              }
            ]
          , generation_config: request.generation_params().clone()
        })
    }
}

// ===== HTTP Transport =====

/// reqwest transport for the generateContent endpoint
pub struct GeminiTransport
{   endpoint: Url
  , api_key: String
  , http_client: reqwest::Client
}

impl GeminiTransport
{   /// Fails fast when no API key is configured
    pub fn new(
      config: &crate::config::GeneratorConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating GeminiTransport for model: {}", config.model);
        let api_key = config.api_key()
          .ok_or_else(|| {
            error!("No API key for model: {}", config.model);
            crate::error::Error::MissingApiKey(
              format!("Gemini:{}", config.model)
            )
          })?
          .to_string();

        let endpoint = endpoint_for(&config.api_base, &config.model)?;

        let http_client = reqwest::Client::builder()
          .timeout(config.timeout())
          .build()
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(e.to_string())
          })?;

        Ok(GeminiTransport
        {   endpoint
          , api_key
          , http_client
        })
    }

    /// Endpoint without the key query parameter
    pub fn endpoint(&self) -> &Url
    {   &self.endpoint
    }
}

#[async_trait]
impl Transport for GeminiTransport
{   async fn send(
      &self
    , body: &GeminiRequest
    ) -> Result<RawResponse, TransportError>
    {   trace!("Gemini request: {:?}", body);

        let response = self.http_client
          .post(self.endpoint.clone())
          .query(&[("key", self.api_key.as_str())])
          .header("Content-Type", "application/json")
          .json(body)
          .send()
          .await
          .map_err(classify)?;

        let status = response.status().as_u16();
        trace!("Gemini response status: {}", status);

        let body = response.text().await.map_err(classify)?;
        Ok(RawResponse { status, body })
    }
}

fn endpoint_for(
  api_base: &str
, model: &str
) -> Result<Url, crate::error::Error>
{   let invalid = |msg: String| {
      crate::error::Error::InvalidConfiguration(msg)
    };
    let mut url = Url::parse(api_base.trim_end_matches('/'))
      .map_err(|e| invalid(format!("api_base {}: {}", api_base, e)))?;
    {   let mut segments = url.path_segments_mut()
          .map_err(|_| invalid(format!("api_base {} has no path", api_base)))?;
        segments
          .pop_if_empty()
          .push("models")
          .push(&format!("{}:generateContent", model));
    }
    Ok(url)
}

/// Map a reqwest failure onto the transport taxonomy. The URL is dropped
/// so the key never ends up in a message.
fn classify(err: reqwest::Error) -> TransportError
{   let err = err.without_url();
    let kind = if err.is_timeout()
    {   TransportErrorKind::Timeout
    } else if err.is_connect()
    {   TransportErrorKind::Connect
    } else
    {   TransportErrorKind::Other
    };

    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source
    {   message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }

    debug!("Transport error ({:?}): {}", kind, message);
    TransportError::new(kind, message)
}

// ===== Response Handling =====

/// Pull the candidate text out of a response. Anything but a 200 with
/// non-empty text is a provider error, carrying the provider's own
/// message when it sent one.
pub fn interpret_response(
  response: RawResponse
) -> Result<(Value, String), crate::error::Error>
{   let data: Value = serde_json::from_str(&response.body)
      .unwrap_or(Value::Null);

    let text = data
      .pointer("/candidates/0/content/parts/0/text")
      .and_then(Value::as_str)
      .filter(|t| !t.is_empty())
      .map(str::to_string);

    match text
    {   Some(text) if response.status == 200 => Ok((data, text))
      , _ => {
          let message = data
            .pointer("/error/message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(UNEXPECTED_RESPONSE)
            .to_string();
          error!(
            "Gemini error (status {}): {}",
            response.status, message
          );
          Err(crate::error::Error::ProviderError
          {   status: response.status
            , message
          })
        }
    }
}
