#![cfg(feature = "http")]

use std::sync::Arc;
use std::time::Duration;

use insightflow::invoker::{FallbackInvoker, SAFE_MODE_TEXT};
use insightflow::providers::{
    ChatMessage, ClientSettings, ClientTable, CredentialRef, EscalationLadder, HuggingFaceClient,
    LadderEntry, LadderPosition, LocalModelClient, OpenAiCompatibleClient, ProviderClient,
    ProviderKind,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> ClientSettings {
    ClientSettings {
        timeout: Duration::from_secs(5),
        ..ClientSettings::default()
    }
}

fn messages() -> Vec<ChatMessage> {
    vec![ChatMessage::system("Be brief."), ChatMessage::user("hi")]
}

fn keyed(env_var: &str) -> CredentialRef {
    std::env::set_var(env_var, "test-key");
    CredentialRef::env(env_var)
}

#[tokio::test]
async fn chat_completions_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "llama-3.3-70b-versatile" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": " hello " } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(
        ProviderKind::Groq,
        server.uri(),
        keyed("INSIGHTFLOW_TEST_GROQ_KEY"),
        &settings(),
    )
    .unwrap();

    let text = client.call("llama-3.3-70b-versatile", &messages()).await.unwrap();
    assert_eq!(text, "hello");
}

#[tokio::test]
async fn chat_completions_rate_limit_is_a_call_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(
        ProviderKind::OpenRouter,
        server.uri(),
        keyed("INSIGHTFLOW_TEST_OPENROUTER_KEY"),
        &settings(),
    )
    .unwrap();

    let err = client.call("some/model:free", &messages()).await.unwrap_err();
    assert_eq!(err.provider, ProviderKind::OpenRouter);
    assert_eq!(err.model, "some/model:free");
    assert!(err.message.contains("429"));
}

#[tokio::test]
async fn missing_credential_fails_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(
        ProviderKind::Groq,
        server.uri(),
        CredentialRef::env("INSIGHTFLOW_TEST_UNSET_KEY"),
        &settings(),
    )
    .unwrap();

    let err = client.call("m", &messages()).await.unwrap_err();
    assert!(err.message.contains("INSIGHTFLOW_TEST_UNSET_KEY"));
}

#[tokio::test]
async fn huggingface_reads_generated_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/mistralai/Mistral-7B-Instruct-v0.2"))
        .and(body_partial_json(json!({ "inputs": "Be brief.\n\nhi" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "generated_text": "a summary" }
        ])))
        .mount(&server)
        .await;

    let client =
        HuggingFaceClient::new(server.uri(), keyed("INSIGHTFLOW_TEST_HF_KEY"), &settings()).unwrap();

    let text = client.call("mistralai/Mistral-7B-Instruct-v0.2", &messages()).await.unwrap();
    assert_eq!(text, "a summary");
}

#[tokio::test]
async fn huggingface_error_body_is_a_call_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Model is currently loading"
        })))
        .mount(&server)
        .await;

    let client =
        HuggingFaceClient::new(server.uri(), keyed("INSIGHTFLOW_TEST_HF_KEY_2"), &settings()).unwrap();

    let err = client.call("m", &messages()).await.unwrap_err();
    assert_eq!(err.message, "Model is currently loading");
}

#[tokio::test]
async fn local_model_reads_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "qwen2.5:7b", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "offline answer" }
        })))
        .mount(&server)
        .await;

    let client = LocalModelClient::new(server.uri(), &settings()).unwrap();

    let text = client.call("qwen2.5:7b", &messages()).await.unwrap();
    assert_eq!(text, "offline answer");
}

#[tokio::test]
async fn cascade_falls_through_http_failures_to_local_model() {
    let cloud = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&cloud)
        .await;
    let local = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "content": "from local" }
        })))
        .mount(&local)
        .await;

    let ladder = EscalationLadder::from_entries(vec![
        LadderEntry { provider: ProviderKind::Groq, model: "g".to_string() },
        LadderEntry { provider: ProviderKind::LocalModel, model: "qwen2.5:7b".to_string() },
    ]);
    let groq = OpenAiCompatibleClient::new(
        ProviderKind::Groq,
        cloud.uri(),
        keyed("INSIGHTFLOW_TEST_GROQ_KEY_2"),
        &settings(),
    )
    .unwrap();
    let clients = ClientTable::new()
        .with_client(Arc::new(groq))
        .with_client(Arc::new(LocalModelClient::new(local.uri(), &settings()).unwrap()));
    let invoker = FallbackInvoker::new(ladder, clients);

    let invocation = invoker.invoke(&messages(), LadderPosition::START).await;
    assert_eq!(invocation.text, "from local");
    assert_eq!(invocation.position, LadderPosition::Entry(1));
    assert_ne!(invocation.text, SAFE_MODE_TEXT);
}
