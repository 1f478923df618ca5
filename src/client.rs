use serde_json::{Map, Value};
use tokio::sync::mpsc;
use log::{debug, error, info, warn};

use crate::briefs::{AnyBrief, Brief, CaptionBrief};
use crate::config::GeneratorConfig;
use crate::draft::{Draft, SocialCaptions};
use crate::extract::extract_json;
use crate::providers::gemini::interpret_response;
use crate::providers::{GeminiRequest, GeminiTransport, Transport};
use crate::request::{build_request, GenerationRequest, GenerationResult, Instruction};
use crate::retry::{send_with_retry, RetryPolicy, Sleeper, TokioSleeper};
use crate::DraftgenFoot;

/// Builds requests, sends them with retry and recovers JSON from the reply
pub struct Generator<T = GeminiTransport, S = TokioSleeper>
{   config: GeneratorConfig
  , policy: RetryPolicy
  , transport: T
  , sleeper: S
}

impl Generator<GeminiTransport, TokioSleeper>
{   /// Generator on the Gemini HTTP transport. Fails fast without an API key.
    pub fn from_config(
      config: GeneratorConfig
    ) -> Result<Self, crate::error::Error>
    {   config.validate()?;
        let transport = GeminiTransport::new(&config)?;
        Ok(Generator::with_transport(config, transport, TokioSleeper))
    }
}

impl<T, S> Generator<T, S>
  where T: Transport
      , S: Sleeper
{   pub fn with_transport(
      config: GeneratorConfig
    , transport: T
    , sleeper: S
    ) -> Self
    {   debug!("Creating Generator for model: {}", config.model);
        let policy = RetryPolicy::from(&config.retry);
        Generator
        {   config
          , policy
          , transport
          , sleeper
        }
    }

    pub fn config(&self) -> &GeneratorConfig
    {   &self.config
    }

    pub fn policy(&self) -> &RetryPolicy
    {   &self.policy
    }

    /// Build and execute a request from raw caller inputs
    pub async fn generate(
      &self
    , instruction: Option<Instruction>
    , user_payload: Value
    , generation_params: Option<Map<String, Value>>
    ) -> Result<GenerationResult, crate::error::Error>
    {   let request = build_request(
          &self.config.voice,
          instruction,
          user_payload,
          generation_params
        );
        self.execute(&request).await
    }

    /// Send a built request and extract JSON from the candidate text.
    /// A missing parsed object is not an error here.
    pub async fn execute(
      &self
    , request: &GenerationRequest
    ) -> Result<GenerationResult, crate::error::Error>
    {   let body = GeminiRequest::from_request(request)?;
        let response = send_with_retry(
          &self.transport,
          &self.sleeper,
          &self.policy,
          &body
        ).await?;
        let (raw, text) = interpret_response(response)?;

        let parsed = extract_json(&text);
        if parsed.is_none()
        {   warn!("No JSON recovered from {} bytes of text", text.len());
        }

        Ok(GenerationResult
        {   raw
          , text
          , parsed
        })
    }

    /// Run one brief through the model and build its draft
    pub async fn draft<B>(
      &self
    , brief: &B
    ) -> Result<Draft, crate::error::Error>
      where B: Brief + Sync + ?Sized
    {   debug!("Drafting {}", brief.kind().as_str());
        brief.validate(&self.config)?;
        let payload = brief.payload(&self.config)?;
        let result = self.generate(
          Some(brief.instruction()),
          payload,
          brief.generation_params()
        ).await?;
        Draft::from_result(brief, &self.config, &result)
    }

    /// Caption for sharing a post: the stored generic caption if there is
    /// one, else a fresh one, else the post title.
    pub async fn social_caption(
      &self
    , brief: &CaptionBrief
    , stored: Option<&SocialCaptions>
    ) -> String
    {   if let Some(caption) = crate::draft::stored_generic_caption(stored)
        {   debug!("Using stored generic caption");
            return caption;
        }

        match self.draft(brief).await
        {   Ok(draft) => {
              let caption = draft.data.get("caption")
                .and_then(Value::as_str)
                .map(crate::draft::sanitize_text)
                .filter(|c| !c.is_empty());
              match caption
              {   Some(caption) => caption
                , None => {
                    warn!("Caption response had no caption, using title");
                    brief.fallback_title()
                  }
              }
            }
          , Err(e) => {
              warn!("Caption generation failed ({}), using title", e);
              brief.fallback_title()
            }
        }
    }
}

/// Public API for the generator backend - owns the task
pub struct GeneratorBackend
{   hand: crate::DraftgenHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl GeneratorBackend
{   /// Spawn a backend owning `generator`.
    /// Returns immediately - spawns background task
    pub fn spawn<T, S>(generator: Generator<T, S>) -> Self
      where T: Transport + 'static
          , S: Sleeper + 'static
    {   debug!("Creating GeneratorBackend with task ownership");

        let (generate_tx, generate_rx)
          = mpsc::unbounded_channel();
        let (draft_tx, draft_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::DraftgenHand
        {   generate_tx
          , draft_tx
          , kill_process_tx
        };

        let foot = crate::DraftgenFoot
        {   generate_rx
          , draft_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, generator).await
        });

        GeneratorBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a built request - returns almost immediately
    pub fn generate(
      &self
    , request: GenerationRequest
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateReply>,
        crate::error::Error
      >
    {   debug!("generate queuing request");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.generate_tx
          .send(crate::GenerateArgs { request, reply: reply_tx })
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::BackendClosed
          })?;

        Ok(reply_rx)
    }

    /// Queue a brief - returns almost immediately
    pub fn draft(
      &self
    , brief: AnyBrief
    ) -> Result<
        mpsc::UnboundedReceiver<crate::DraftReply>,
        crate::error::Error
      >
    {   debug!("draft queuing {} brief", brief.kind().as_str());
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.draft_tx
          .send(crate::DraftArgs { brief, reply: reply_tx })
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::BackendClosed
          })?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down GeneratorBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.hand.kill_process_tx
          .send(crate::KillProcessArgs { reply: reply_tx })
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::BackendClosed
          })?;

        match reply_rx.recv().await
        {   Some(result) => {
              debug!("Backend shutdown confirmed");
              result
            }
          , None => {
              error!("Backend exited without confirming shutdown");
              Err(crate::error::Error::BackendClosed)
            }
        }
    }
}

/// Main backend event loop. Commands run one at a time; the generator
/// never has two calls in flight.
async fn run_backend_loop<T, S>(
  foot: DraftgenFoot
, generator: Generator<T, S>
)
  where T: Transport
      , S: Sleeper
{   debug!("Starting GeneratorBackend event loop");
    let DraftgenFoot
    {   mut generate_rx
      , mut draft_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = generate_rx.recv() => {
          debug!("Received Generate");
          let result = generator.execute(&cmd.request).await;
          let _ = cmd.reply.send(result);
        }
      , Some(cmd) = draft_rx.recv() => {
          debug!("Received Draft for {}", cmd.brief.kind().as_str());
          let result = generator.draft(&cmd.brief).await;
          let _ = cmd.reply.send(result);
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("GeneratorBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
