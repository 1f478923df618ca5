use serde_json::{json, Map, Value};

use draftgen::config::{VoiceConfig, DEFAULT_PERSONA};
use draftgen::providers::GeminiRequest;
use draftgen::request::strip_markup;
use draftgen::{build_request, Instruction};

#[test]
fn test_no_instruction_keeps_bare_preamble()
{   let voice = VoiceConfig::default();
    let request = build_request(&voice, None, json!({}), None);
    assert_eq!(request.system_instruction(), DEFAULT_PERSONA);
    assert!(request.extra_directives().is_none());
}

#[test]
fn test_empty_instructions_are_ignored()
{   let voice = VoiceConfig::default();
    let text = build_request(&voice, Some("".into()), json!({}), None);
    let list = build_request(
      &voice,
      Some(Instruction::Directives(vec![])),
      json!({}),
      None
    );
    assert_eq!(text.system_instruction(), DEFAULT_PERSONA);
    assert_eq!(list.system_instruction(), DEFAULT_PERSONA);
}

#[test]
fn test_single_instruction_is_stripped_and_appended()
{   let voice = VoiceConfig::default();
    let request = build_request(
      &voice,
      Some("  Return <b>strict</b> JSON.<script>alert(1)</script> ".into()),
      json!({}),
      None
    );
    assert_eq!(
      request.system_instruction(),
      format!("{}\nReturn strict JSON.", DEFAULT_PERSONA)
    );
}

#[test]
fn test_directive_list_becomes_bulleted_block()
{   let voice = VoiceConfig::default();
    let request = build_request(
      &voice,
      Some(vec!["Keep it <em>short</em>", "Use US English"].into()),
      json!({}),
      None
    );
    assert_eq!(
      request.system_instruction(),
      format!(
        "{}\nAdditional directives:\n- Keep it short\n- Use US English",
        DEFAULT_PERSONA
      )
    );
}

#[test]
fn test_temperature_defaults_and_caller_wins()
{   let voice = VoiceConfig::default();
    let defaults = build_request(&voice, None, json!({}), None);
    assert_eq!(defaults.generation_params().get("temperature"), Some(&json!(0.7)));

    let mut params = Map::new();
    params.insert("temperature".to_string(), json!(0.2));
    params.insert("maxOutputTokens".to_string(), json!(2048));
    let custom = build_request(&voice, None, json!({}), Some(params));
    assert_eq!(custom.generation_params().get("temperature"), Some(&json!(0.2)));
    assert_eq!(custom.generation_params().get("maxOutputTokens"), Some(&json!(2048)));
    assert_eq!(custom.generation_params().len(), 2);
}

#[test]
fn test_payload_is_wrapped_in_envelope()
{   let voice = VoiceConfig::default();
    let request = build_request(
      &voice,
      None,
      json!({"product": {"name": "Pixel 9"}}),
      None
    );

    let message: Value = serde_json::from_str(&request.user_message().unwrap())
      .unwrap();
    assert_eq!(message["brand"], json!("Tony Reviews Things"));
    assert_eq!(message["site_voice"], json!("Verge/Engadget/Android Police hybrid"));
    assert_eq!(message["instructions"], json!(voice.response_contract));
    assert_eq!(message["payload"], json!({"product": {"name": "Pixel 9"}}));
}

#[test]
fn test_builder_is_deterministic()
{   let voice = VoiceConfig::default();
    let build = || build_request(
      &voice,
      Some("Go".into()),
      json!({"a": [1, 2]}),
      None
    );
    assert_eq!(build(), build());
}

#[test]
fn test_gemini_wire_shape()
{   let voice = VoiceConfig::default();
    let request = build_request(&voice, Some("Go".into()), json!({"a": 1}), None);
    let wire = serde_json::to_value(
      GeminiRequest::from_request(&request).unwrap()
    ).unwrap();

    assert_eq!(
      wire["system_instruction"]["parts"][0]["text"],
      json!(request.system_instruction())
    );
    assert!(wire["system_instruction"].get("role").is_none());
    assert_eq!(wire["contents"][0]["role"], json!("user"));
    assert_eq!(
      wire["contents"][0]["parts"][0]["text"],
      json!(request.user_message().unwrap())
    );
    assert_eq!(wire["generationConfig"], json!({"temperature": 0.7}));
}

#[test]
fn test_strip_markup()
{   assert_eq!(strip_markup("<p>Hello <a href=\"#\">there</a></p>"), "Hello there");
    assert_eq!(strip_markup("<style>p { color: red }</style>Text"), "Text");
    assert_eq!(strip_markup("  plain  "), "plain");
    assert_eq!(strip_markup("line one\nline two"), "line one\nline two");
}
