use std::future::Future;
use std::pin::Pin;

use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Minimal config for an Ollama-style `POST /api/chat` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Full endpoint URL, e.g. `http://127.0.0.1:11434/api/chat`.
    pub endpoint: String,
    pub model: String,
}

/// One role-tagged prompt segment.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Sends role-tagged messages to an Ollama-style chat endpoint and
/// returns the generated reply text.
pub async fn query_chat(messages: Vec<ChatMessage>, cfg: &ChatConfig) -> anyhow::Result<String> {
    let client = Client::new();
    let request = ChatRequest {
        model: cfg.model.clone(),
        messages,
        stream: false,
    };

    let res = client
        .post(&cfg.endpoint)
        .json(&request)
        .send()
        .await
        .context("chat request failed")?
        .error_for_status()
        .context("chat non-2xx response")?
        .json::<ChatResponse>()
        .await
        .context("chat response decode failed")?;

    Ok(res.message.content)
}

/// Trait seam so the dispatch loop can run against a mock in tests.
pub trait LlmClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        messages: Vec<ChatMessage>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}

/// Production client backed by [`query_chat`].
pub struct OllamaChat {
    pub cfg: ChatConfig,
}

impl LlmClient for OllamaChat {
    fn complete<'a>(
        &'a self,
        messages: Vec<ChatMessage>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move { query_chat(messages, &self.cfg).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_role_tagged_messages() {
        let request = ChatRequest {
            model: "llama3".to_string(),
            messages: vec![
                ChatMessage::system("You are a bot."),
                ChatMessage::user("hello"),
            ],
            stream: false,
        };
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["model"], "llama3");
        assert_eq!(v["stream"], false);
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["messages"][1]["content"], "hello");
    }

    #[test]
    fn chat_response_decodes_reply_content() {
        let raw = r#"{"model":"llama3","message":{"role":"assistant","content":"Greetings, mortal."},"done":true}"#;
        let res: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(res.message.content, "Greetings, mortal.");
    }
}
