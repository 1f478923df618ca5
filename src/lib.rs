pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod retry;
pub mod extract;
pub mod affiliate;
pub mod briefs;
pub mod draft;
pub mod client;

/*

draftgen turns short admin briefs (product facts, deal terms, guide
topics) into AI-written draft articles. Each call is
build_request -> send_with_retry -> extract_json, and every stage can
be driven on its own.

draftgen/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and backend channel types
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # Generator, retry and voice configuration
│   ├── request.rs      # Request builder, request/result types
│   ├── retry.rs        # Linear-backoff retry over a Transport
│   ├── extract.rs      # JSON recovery from model text
│   ├── providers/      # Provider wire formats and transports
│   │   ├── mod.rs      # Transport trait, transport errors
│   │   └── gemini.rs   # generateContent over reqwest
│   ├── briefs.rs       # Review / deal / guide / caption briefs
│   ├── draft.rs        # Draft articles from parsed responses
│   ├── affiliate.rs    # Amazon link tagging
│   ├── client.rs       # Generator and its backend task
│   └── bin/draftgen.rs # Command line front end
└── tests/

*/

pub use client::{Generator, GeneratorBackend};
pub use config::GeneratorConfig;
pub use error::Error;
pub use extract::extract_json;
pub use request::{build_request, GenerationRequest, GenerationResult, Instruction};
pub use retry::send_with_retry;

/// DRAFTGEN BACKEND INTERFACE:

// ===== Generate =====

pub type GenerateReply = Result<GenerationResult, crate::error::Error>;
pub type GenerateReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateReply>;

pub struct GenerateArgs
{   pub request: GenerationRequest
  , pub reply: GenerateReplySender
}

// ===== Draft =====

pub type DraftReply = Result<draft::Draft, crate::error::Error>;
pub type DraftReplySender
  = tokio::sync::mpsc::UnboundedSender<DraftReply>;

pub struct DraftArgs
{   pub brief: briefs::AnyBrief
  , pub reply: DraftReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== DraftgenHand (sender side) =====

pub struct DraftgenHand
{   pub generate_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateArgs>
  , pub draft_tx
      : tokio::sync::mpsc::UnboundedSender<DraftArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== DraftgenFoot (receiver side) =====

pub struct DraftgenFoot
{   pub generate_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateArgs>
  , pub draft_rx
      : tokio::sync::mpsc::UnboundedReceiver<DraftArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
