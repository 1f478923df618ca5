#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use draftgen::providers::{GeminiRequest, RawResponse, Transport, TransportError};
use draftgen::retry::Sleeper;

pub fn init_logging()
{   let _ = env_logger::builder().is_test(true).try_init();
}

/// Transport replaying a fixed script of outcomes
pub struct ScriptedTransport
{   script: Mutex<VecDeque<Result<RawResponse, TransportError>>>
  , sent: Mutex<Vec<GeminiRequest>>
}

impl ScriptedTransport
{   pub fn new(
      script: Vec<Result<RawResponse, TransportError>>
    ) -> Self
    {   ScriptedTransport
        {   script: Mutex::new(script.into())
          , sent: Mutex::new(vec![])
        }
    }

    pub fn calls(&self) -> usize
    {   self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<GeminiRequest>
    {   self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport
{   async fn send(
      &self
    , body: &GeminiRequest
    ) -> Result<RawResponse, TransportError>
    {   self.sent.lock().unwrap().push(body.clone());
        self.script.lock().unwrap()
          .pop_front()
          .unwrap_or_else(|| Err(TransportError::other("script exhausted")))
    }
}

/// Sleeper that records requested delays and returns at once
#[derive(Default)]
pub struct RecordingSleeper
{   slept: Mutex<Vec<Duration>>
}

impl RecordingSleeper
{   pub fn slept(&self) -> Vec<Duration>
    {   self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper
{   async fn sleep(&self, duration: Duration)
    {   self.slept.lock().unwrap().push(duration);
    }
}

/// Successful generateContent body carrying `text`
pub fn gemini_body(text: &str) -> String
{   json!({
      "candidates": [
        { "content": { "role": "model", "parts": [ { "text": text } ] } }
      ]
    }).to_string()
}

pub fn ok_response(text: &str) -> Result<RawResponse, TransportError>
{   Ok(RawResponse { status: 200, body: gemini_body(text) })
}

pub fn timeout() -> Result<RawResponse, TransportError>
{   Err(TransportError::timeout("operation timed out"))
}

pub fn secs(values: &[u64]) -> Vec<Duration>
{   values.iter().map(|s| Duration::from_secs(*s)).collect()
}
