use std::process::ExitCode;
use log::{debug, error};

use draftgen::briefs::{AnyBrief, BriefKind};
use draftgen::{Generator, GeneratorConfig};

const USAGE: &str = "usage: draftgen <review|deal|guide|caption> <brief.json>";

async fn run(
  kind: &str
, brief_path: &str
) -> Result<String, draftgen::Error>
{   let kind: BriefKind = kind.parse()?;
    let raw = std::fs::read_to_string(brief_path)
      .map_err(|e| format!("{}: {}", brief_path, e))?;
    let brief = AnyBrief::from_json(kind, &raw)?;

    let config = GeneratorConfig::from_env()?;
    let generator = Generator::from_config(config)?;
    debug!("Generating {} from {}", kind.as_str(), brief_path);

    let draft = generator.draft(&brief).await?;
    Ok(serde_json::to_string_pretty(&draft)?)
}

#[tokio::main]
async fn main() -> ExitCode
{   env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (kind, path) = match args.as_slice()
    {   [kind, path] => (kind.as_str(), path.as_str())
      , _ => {
          eprintln!("{}", USAGE);
          return ExitCode::from(2);
        }
    };

    match run(kind, path).await
    {   Ok(output) => {
          println!("{}", output);
          ExitCode::SUCCESS
        }
      , Err(e) => {
          error!("draftgen failed: {}", e);
          eprintln!("{}", e);
          ExitCode::FAILURE
        }
    }
}
