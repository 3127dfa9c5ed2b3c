use std::cell::RefCell;
use std::collections::VecDeque;

use tsd::completion::{CompletionClient, CompletionResponse};
use tsd::error::Stage;
use tsd::merge::MISSING_CONTENT_PLACEHOLDER;
use tsd::pipeline::{Pipeline, PipelineSettings};
use tsd::prompt::Prompts;
use tsd::{DigestError, Result};

/// Replays canned responses in order and records every request.
#[derive(Default)]
struct ScriptedClient {
    responses: RefCell<VecDeque<Result<CompletionResponse>>>,
    calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedClient {
    fn with(responses: Vec<Result<CompletionResponse>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::default(),
        }
    }

    fn reply(content: &str) -> Result<CompletionResponse> {
        Ok(CompletionResponse::from_contents([Some(content)]))
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }
}

impl CompletionClient for ScriptedClient {
    fn complete(&self, system_prompt: &str, user_content: &str) -> Result<CompletionResponse> {
        self.calls
            .borrow_mut()
            .push((system_prompt.to_string(), user_content.to_string()));
        self.responses
            .borrow_mut()
            .pop_front()
            .expect("unexpected completion call")
    }
}

fn prompts() -> Prompts {
    Prompts {
        preprocess: "PRE".to_string(),
        summary: "SUM".to_string(),
        introduction: "INTRO".to_string(),
    }
}

fn pipeline(client: &ScriptedClient, settings: PipelineSettings) -> Pipeline<&ScriptedClient> {
    Pipeline::new(client, prompts(), settings)
}

const MEETING: &str = "日期：2024-01-01\n00:05 发言人1: hello\n00:50 发言人2: world\n31:10 发言人1: bye\n";

#[test]
fn test_preprocess_calls_once_per_chunk_in_order() {
    let client = ScriptedClient::with(vec![
        ScriptedClient::reply("clean a\n\nclean b"),
        Ok(CompletionResponse::from_contents([None, Some(""), Some("clean c")])),
        Ok(CompletionResponse::default()),
    ]);
    let settings = PipelineSettings {
        chunk_size: 2,
        ..Default::default()
    };

    let result = pipeline(&client, settings).preprocess("a\nb\nc\nd\ne").unwrap();
    assert_eq!(
        result,
        format!("clean a\nclean b\nclean c\n{MISSING_CONTENT_PLACEHOLDER}")
    );

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(system, _)| system == "PRE"));
    let users: Vec<&str> = calls.iter().map(|(_, u)| u.as_str()).collect();
    assert_eq!(users, vec!["a\nb", "c\nd", "e"]);
}

#[test]
fn test_preprocess_rejects_empty_input() {
    let client = ScriptedClient::default();
    let err = pipeline(&client, PipelineSettings::default())
        .preprocess("")
        .unwrap_err();
    assert!(matches!(err, DigestError::EmptyInput));
    assert!(client.calls().is_empty());
}

#[test]
fn test_preprocess_propagates_external_failure() {
    let client = ScriptedClient::with(vec![
        ScriptedClient::reply("ok"),
        Err(DigestError::ExternalCall {
            status: 500,
            body: "boom".to_string(),
        }),
    ]);
    let settings = PipelineSettings {
        chunk_size: 1,
        ..Default::default()
    };
    let err = pipeline(&client, settings).preprocess("a\nb\nc").unwrap_err();
    assert!(matches!(err, DigestError::ExternalCall { status: 500, .. }));
    // No retry, no further chunks.
    assert_eq!(client.calls().len(), 2);
}

#[test]
fn test_summary_parses_json_content() {
    let client = ScriptedClient::with(vec![ScriptedClient::reply(r#"{"topics": ["预算"]}"#)]);
    let result = pipeline(&client, PipelineSettings::default())
        .summarize(MEETING)
        .unwrap();
    assert_eq!(result, serde_json::json!({ "topics": ["预算"] }));

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    let (system, user) = &calls[0];
    assert_eq!(system, "SUM");
    assert!(user.starts_with("以下是按30分钟区间划分的会议内容，请据此生成议题：\n"));
    assert!(user.contains("\"time_range\": \"00:05-00:50\""));
    assert!(user.contains("\"time_range\": \"31:10-31:10\""));
    assert!(user.ends_with(&format!("原始完整记录：\n{MEETING}")));
}

#[test]
fn test_summary_falls_back_to_text() {
    let client = ScriptedClient::with(vec![ScriptedClient::reply("not json at all")]);
    let result = pipeline(&client, PipelineSettings::default())
        .summarize(MEETING)
        .unwrap();
    assert_eq!(result, serde_json::json!({ "summary": "not json at all" }));
}

#[test]
fn test_summary_uses_first_nonempty_choice() {
    let client = ScriptedClient::with(vec![Ok(CompletionResponse::from_contents([
        Some(""),
        Some("{\"ok\": true}"),
    ]))]);
    let result = pipeline(&client, PipelineSettings::default())
        .summarize(MEETING)
        .unwrap();
    assert_eq!(result["ok"], true);
}

#[test]
fn test_summary_missing_content_is_fatal() {
    let client = ScriptedClient::with(vec![Ok(CompletionResponse::default())]);
    let err = pipeline(&client, PipelineSettings::default())
        .summarize(MEETING)
        .unwrap_err();
    assert!(matches!(
        err,
        DigestError::ContentMissing {
            stage: Stage::Summary
        }
    ));
}

#[test]
fn test_summary_without_date_header_is_segmentation_error() {
    let client = ScriptedClient::default();
    let err = pipeline(&client, PipelineSettings::default())
        .summarize("00:05 发言人1: hello")
        .unwrap_err();
    assert!(matches!(err, DigestError::Segmentation));
    assert!(client.calls().is_empty());
}

#[test]
fn test_unparseable_transcript_is_parse_error() {
    let client = ScriptedClient::default();
    let p = pipeline(&client, PipelineSettings::default());
    assert!(matches!(p.summarize("hello"), Err(DigestError::Parse)));
    assert!(matches!(p.introduce("hello"), Err(DigestError::Parse)));
}

#[test]
fn test_introduction_spliced_text_must_be_json() {
    // After the splice the overview heading and time-stamped blocks are
    // plain text, so the document no longer parses; there is no fallback.
    let content = "{\"chapters\": [\n### 章节速览\n1. 开场\n2. 收尾\n3. 多余\n### 要点回顾\n\"done\"]}";
    let client = ScriptedClient::with(vec![ScriptedClient::reply(content)]);
    let settings = PipelineSettings {
        intro_interval_minutes: 30,
        ..Default::default()
    };

    let err = pipeline(&client, settings).introduce(MEETING).unwrap_err();
    assert!(matches!(err, DigestError::MalformedStructuredOutput(_)));
    assert_eq!(client.calls()[0], ("INTRO".to_string(), MEETING.to_string()));
}

#[test]
fn test_introduction_without_overview_returns_json() {
    let client = ScriptedClient::with(vec![ScriptedClient::reply(r#"{"title": "周会"}"#)]);
    let result = pipeline(&client, PipelineSettings::default())
        .introduce(MEETING)
        .unwrap();
    assert_eq!(result, serde_json::json!({ "title": "周会" }));
}

#[test]
fn test_introduction_only_reads_first_choice() {
    let client = ScriptedClient::with(vec![Ok(CompletionResponse::from_contents([
        Some(""),
        Some("{}"),
    ]))]);
    let err = pipeline(&client, PipelineSettings::default())
        .introduce(MEETING)
        .unwrap_err();
    assert!(matches!(
        err,
        DigestError::ContentMissing {
            stage: Stage::Introduction
        }
    ));
}
