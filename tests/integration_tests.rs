mod common;

use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use draftgen::briefs::{AnyBrief, Brief, BriefKind, GuideBrief, Topic};
use draftgen::config::RetryConfig;
use draftgen::providers::{GeminiTransport, TransportErrorKind};
use draftgen::{build_request, Error, Generator, GeneratorBackend, GeneratorConfig};

const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

fn config_for(server: &MockServer) -> GeneratorConfig
{   GeneratorConfig
    {   api_key: Some("test-key".to_string())
      , api_base: server.uri()
      , timeout_secs: 1
      , ..GeneratorConfig::default()
    }
}

#[test]
fn test_config_defaults()
{   let config = GeneratorConfig::default();
    assert_eq!(config.model, "gemini-2.5-flash");
    assert_eq!(config.timeout(), Duration::from_secs(30));
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.backoff_step_secs, 1);
    assert!(config.api_key().is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_json_file()
{   let path = std::env::temp_dir().join(
      format!("draftgen-config-{}.json", std::process::id())
    );
    fs::write(
      &path,
      r#"{ "api_key": "abc", "model": "gemini-2.5-pro",
           "retry": { "max_attempts": 5 }, "amazon_tag": "trt-20" }"#
    ).unwrap();

    let config = GeneratorConfig::from_json_file(&path).unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(config.api_key(), Some("abc"));
    assert_eq!(config.model, "gemini-2.5-pro");
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.backoff_step_secs, 1);
    assert_eq!(config.amazon_tag.as_deref(), Some("trt-20"));
    assert_eq!(config.voice.brand, "Tony Reviews Things");
}

#[test]
fn test_config_from_missing_file()
{   let err = GeneratorConfig::from_json_file("/nonexistent/draftgen.json")
      .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[test]
fn test_config_validation()
{   let mut config = GeneratorConfig::default();
    config.retry = RetryConfig { max_attempts: 0, backoff_step_secs: 1 };
    assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));

    let mut config = GeneratorConfig::default();
    config.model = "  ".to_string();
    assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));

    let mut config = GeneratorConfig::default();
    config.timeout_secs = 0;
    assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
}

#[test]
fn test_config_from_env()
{   std::env::set_var("GEMINI_API_KEY", " env-key ");
    std::env::set_var("GEMINI_MODEL", "gemini-2.0-flash");
    std::env::set_var("GEMINI_TIMEOUT_SECS", "45");
    std::env::set_var("AMAZON_TAG", "trt-20");

    let config = GeneratorConfig::from_env().unwrap();
    assert_eq!(config.api_key(), Some("env-key"));
    assert_eq!(config.model, "gemini-2.0-flash");
    assert_eq!(config.timeout_secs, 45);
    assert_eq!(config.amazon_tag.as_deref(), Some("trt-20"));

    std::env::set_var("GEMINI_TIMEOUT_SECS", "soon");
    assert!(matches!(
      GeneratorConfig::from_env(),
      Err(Error::InvalidConfiguration(_))
    ));

    for name in ["GEMINI_API_KEY", "GEMINI_MODEL", "GEMINI_TIMEOUT_SECS", "AMAZON_TAG"]
    {   std::env::remove_var(name);
    }
}

#[test]
fn test_missing_api_key_fails_fast()
{   let err = Generator::from_config(GeneratorConfig::default())
      .err()
      .unwrap();
    assert_eq!(err, Error::MissingApiKey("Gemini:gemini-2.5-flash".to_string()));

    let config = GeneratorConfig
    {   api_key: Some("   ".to_string())
      , ..GeneratorConfig::default()
    };
    assert!(matches!(
      GeminiTransport::new(&config),
      Err(Error::MissingApiKey(_))
    ));
}

#[test]
fn test_endpoint_layout()
{   let config = GeneratorConfig
    {   api_key: Some("secret".to_string())
      , ..GeneratorConfig::default()
    };
    let transport = GeminiTransport::new(&config).unwrap();
    assert_eq!(
      transport.endpoint().as_str(),
      "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
    );
}

#[tokio::test]
async fn test_gemini_generate_over_http()
{   init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path(GENERATE_PATH))
      .and(query_param("key", "test-key"))
      .and(body_partial_json(json!({
        "generationConfig": { "temperature": 0.7 }
      })))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_string(gemini_body("```json\n{\"title\":\"Hello\"}\n```"))
      )
      .expect(1)
      .mount(&server)
      .await;

    let generator = Generator::from_config(config_for(&server)).unwrap();
    let result = generator
      .generate(Some("Say hello".into()), json!({"name": "Pixel"}), None)
      .await
      .unwrap();

    assert_eq!(result.parsed, Some(json!({"title": "Hello"})));
    assert_eq!(
      result.raw["candidates"][0]["content"]["parts"][0]["text"],
      json!(result.text)
    );
}

#[tokio::test]
async fn test_gemini_error_envelope_over_http()
{   init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path(GENERATE_PATH))
      .respond_with(
        ResponseTemplate::new(429).set_body_json(json!({
          "error": {
            "code": 429,
            "message": "Resource has been exhausted.",
            "status": "RESOURCE_EXHAUSTED"
          }
        }))
      )
      .expect(1)
      .mount(&server)
      .await;

    let generator = Generator::from_config(config_for(&server)).unwrap();
    let err = generator.generate(None, json!({}), None).await.unwrap_err();

    assert_eq!(
      err,
      Error::ProviderError
      {   status: 429
        , message: "Resource has been exhausted.".to_string()
      }
    );
}

#[tokio::test]
async fn test_gemini_timeout_is_retried_then_surfaced()
{   init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path(GENERATE_PATH))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_string(gemini_body("{}"))
          .set_delay(Duration::from_secs(3))
      )
      .expect(3)
      .mount(&server)
      .await;

    let config = config_for(&server);
    let transport = GeminiTransport::new(&config).unwrap();
    let sleeper = Arc::new(RecordingSleeper::default());
    let generator = Generator::with_transport(
      config, transport, sleeper.clone()
    );

    let err = generator.generate(None, json!({}), None).await.unwrap_err();

    assert_eq!(err, Error::NetworkTimeout);
    assert_eq!(sleeper.slept(), secs(&[1, 2]));
}

#[tokio::test]
async fn test_connection_refused_is_permanent()
{   init_logging();
    let config = GeneratorConfig
    {   api_key: Some("test-key".to_string())
      , api_base: "http://127.0.0.1:9".to_string()
      , timeout_secs: 5
      , ..GeneratorConfig::default()
    };

    let transport = GeminiTransport::new(&config).unwrap();
    let request = build_request(&config.voice, None, json!({}), None);
    let body = draftgen::providers::GeminiRequest::from_request(&request)
      .unwrap();
    let err = draftgen::providers::Transport::send(&transport, &body)
      .await
      .unwrap_err();

    assert_eq!(err.kind, TransportErrorKind::Connect);
    assert!(!err.message.contains("test-key"));
}

#[tokio::test]
async fn test_backend_initialization()
{   init_logging();
    let transport = ScriptedTransport::new(vec![]);
    let generator = Generator::with_transport(
      GeneratorConfig::default(),
      transport,
      RecordingSleeper::default()
    );
    let backend = GeneratorBackend::spawn(generator);

    assert!(backend.shutdown().await.is_ok());
}

#[tokio::test]
async fn test_backend_generate()
{   init_logging();
    let transport = Arc::new(ScriptedTransport::new(vec![
      ok_response("{\"caption\":\"hi\"}"),
    ]));
    let generator = Generator::with_transport(
      GeneratorConfig::default(),
      transport.clone(),
      RecordingSleeper::default()
    );
    let backend = GeneratorBackend::spawn(generator);

    let request = build_request(
      &GeneratorConfig::default().voice, None, json!({}), None
    );
    let mut rx = backend.generate(request).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
      .await
      .unwrap()
      .unwrap()
      .unwrap();

    assert_eq!(result.parsed, Some(json!({"caption": "hi"})));
    assert_eq!(transport.calls(), 1);
    backend.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_backend_draft()
{   init_logging();
    let transport = ScriptedTransport::new(vec![
      ok_response(&json!({
        "title": "How to set up a new Pixel",
        "content_html": "<h2>Start</h2>",
        "faq": [ { "question": "Q?", "answer": "A." } ]
      }).to_string()),
    ]);
    let generator = Generator::with_transport(
      GeneratorConfig::default(),
      transport,
      RecordingSleeper::default()
    );
    let backend = GeneratorBackend::spawn(generator);

    let brief = AnyBrief::Guide(GuideBrief
    {   topic: Topic
        {   title: "Pixel setup".to_string()
          , ..Topic::default()
        }
      , ..GuideBrief::default()
    });
    assert_eq!(brief.kind(), BriefKind::Guide);

    let mut rx = backend.draft(brief).unwrap();
    let draft = rx.recv().await.unwrap().unwrap();

    assert_eq!(draft.title, "How to set up a new Pixel");
    assert_eq!(draft.faq.len(), 1);
    backend.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_backend_reports_failures()
{   init_logging();
    let transport = ScriptedTransport::new(vec![]);
    let generator = Generator::with_transport(
      GeneratorConfig::default(),
      transport,
      RecordingSleeper::default()
    );
    let backend = GeneratorBackend::spawn(generator);

    let mut rx = backend.draft(AnyBrief::Guide(GuideBrief::default())).unwrap();
    let result = rx.recv().await.unwrap();

    assert_eq!(result, Err(Error::MissingField("topic.title".to_string())));
    backend.shutdown().await.unwrap();
}
