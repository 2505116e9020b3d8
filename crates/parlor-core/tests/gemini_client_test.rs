use parlor_core::core_types::{permissive_safety_settings, ChatOptions, Role, Turn};
use parlor_core::errors::RelayError;
use parlor_core::llm::{ChatModel, GeminiClient, TextGenerator};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/models/gemini-2.5-flash:generateContent";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::with_base_url(
        "test-key".to_string(),
        "gemini-2.5-flash".to_string(),
        server.uri(),
    )
}

fn chat_options() -> ChatOptions {
    ChatOptions {
        system_instruction: "You are a helpful shop assistant.".to_string(),
        safety_settings: permissive_safety_settings(),
        temperature: 0.2,
        max_output_tokens: 800,
    }
}

fn candidate(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3, "totalTokenCount": 15}
    })
}

#[tokio::test]
async fn test_chat_send_posts_full_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("Hello!")))
        .expect(1)
        .mount(&server)
        .await;

    let seed = vec![Turn::user("Hi"), Turn::model("Hey.")];
    let mut chat = client(&server)
        .start_chat(&chat_options(), seed.clone())
        .await
        .unwrap();
    let reply = chat.send("What do you sell?").await.unwrap();

    assert_eq!(reply.text, "Hello!");
    assert_eq!(reply.usage.unwrap().total_tokens, 15);
    assert_eq!(
        reply.updated_history,
        vec![
            Turn::user("Hi"),
            Turn::model("Hey."),
            Turn::user("What do you sell?"),
            Turn::model("Hello!"),
        ]
    );

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(
        body["systemInstruction"]["parts"][0]["text"],
        "You are a helpful shop assistant."
    );
    assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
    assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_NONE");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 800);
    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[2]["role"], "user");
    assert_eq!(contents[2]["parts"][0]["text"], "What do you sell?");
}

#[tokio::test]
async fn test_chat_session_accumulates_turns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("ok")))
        .expect(2)
        .mount(&server)
        .await;

    let mut chat = client(&server)
        .start_chat(&chat_options(), Vec::new())
        .await
        .unwrap();
    chat.send("one").await.unwrap();
    let reply = chat.send("two").await.unwrap();

    assert_eq!(reply.updated_history.len(), 4);
    assert_eq!(reply.updated_history[3].role, Role::Model);

    let requests = server.received_requests().await.unwrap();
    let second: Value = requests[1].body_json().unwrap();
    assert_eq!(second["contents"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_error_status_is_generation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("ok")))
        .mount(&server)
        .await;

    let mut chat = client(&server)
        .start_chat(&chat_options(), Vec::new())
        .await
        .unwrap();
    let err = chat.send("Hi").await.unwrap_err();

    match err {
        RelayError::GenerationError(message) => assert!(message.contains("API key not valid")),
        other => panic!("expected generation error, got {:?}", other),
    }

    // A failed exchange does not advance the transcript.
    let reply = chat.send("Hi again").await.unwrap();
    assert_eq!(reply.updated_history, vec![Turn::user("Hi again"), Turn::model("ok")]);
    let requests = server.received_requests().await.unwrap();
    let retry: Value = requests[1].body_json().unwrap();
    assert_eq!(retry["contents"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_generate_once_sends_bare_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("A short summary.")))
        .mount(&server)
        .await;

    let summary = client(&server)
        .generate_once("Summarize the following conversation")
        .await
        .unwrap();
    assert_eq!(summary, "A short summary.");

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert!(body.get("systemInstruction").is_none());
    assert!(body.get("safetySettings").is_none());
    assert_eq!(body["contents"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_generate_once_failure_is_summarization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = client(&server).generate_once("Summarize").await.unwrap_err();
    assert!(matches!(err, RelayError::SummarizationError(_)));
}
