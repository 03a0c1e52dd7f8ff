// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat backend implementations behind a common capability trait.
//!
//! Two variants exist: the real Gemini API backend and a deterministic
//! in-memory one for local testing. Which one runs is an explicit
//! configuration choice made at startup, never an exception-driven fallback.

use crate::error::AppError;
use crate::models::Message;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::json;

/// Capability set the gateway needs from a chat backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a prompt on a user's behalf and return the reply text.
    async fn send_message(
        &self,
        user_id: &str,
        api_key: &str,
        message: &str,
    ) -> Result<String, AppError>;

    /// Conversation history for a user, oldest first.
    fn history(&self, user_id: &str) -> Vec<Message>;

    /// Drop a user's conversation; returns whether anything existed.
    fn clear_history(&self, user_id: &str) -> bool;
}

/// In-memory per-user conversation log, insertion-ordered.
///
/// No persistence is promised; the log lives as long as the process.
#[derive(Debug, Default)]
pub struct ConversationLog {
    conversations: DashMap<String, Vec<Message>>,
}

impl ConversationLog {
    pub fn record_turn(&self, user_id: &str, prompt: &str, reply: &str) {
        let mut entry = self.conversations.entry(user_id.to_string()).or_default();
        entry.push(Message::user(prompt));
        entry.push(Message::assistant(reply));
    }

    pub fn history(&self, user_id: &str) -> Vec<Message> {
        self.conversations
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn clear(&self, user_id: &str) -> bool {
        self.conversations.remove(user_id).is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gemini backend
// ─────────────────────────────────────────────────────────────────────────────

/// Response shape of the generateContent endpoint, reduced to what we read.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

/// Real backend calling the Gemini generateContent API with per-user keys.
pub struct GeminiBackend {
    http: reqwest::Client,
    api_url: String,
    log: ConversationLog,
}

impl GeminiBackend {
    pub fn new(api_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            log: ConversationLog::default(),
        }
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn send_message(
        &self,
        user_id: &str,
        api_key: &str,
        message: &str,
    ) -> Result<String, AppError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": message }] }]
        });

        let response = self
            .http
            .post(&self.api_url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Gemini API returned error");
            return Err(AppError::Backend(format!("HTTP {}: {}", status, text)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))?;

        let reply = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| AppError::Backend("Empty response from Gemini".to_string()))?;

        self.log.record_turn(user_id, message, &reply);
        Ok(reply)
    }

    fn history(&self, user_id: &str) -> Vec<Message> {
        self.log.history(user_id)
    }

    fn clear_history(&self, user_id: &str) -> bool {
        self.log.clear(user_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock backend
// ─────────────────────────────────────────────────────────────────────────────

/// Deterministic in-memory backend for local testing.
#[derive(Debug, Default)]
pub struct MockBackend {
    log: ConversationLog,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn send_message(
        &self,
        user_id: &str,
        _api_key: &str,
        message: &str,
    ) -> Result<String, AppError> {
        let reply = format!("Mock response to: {}", message);
        self.log.record_turn(user_id, message, &reply);
        Ok(reply)
    }

    fn history(&self, user_id: &str) -> Vec<Message> {
        self.log.history(user_id)
    }

    fn clear_history(&self, user_id: &str) -> bool {
        self.log.clear(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_round_trip() {
        let backend = MockBackend::new();

        let reply = backend.send_message("alice", "key", "hi").await.unwrap();
        assert_eq!(reply, "Mock response to: hi");

        let history = backend.history("alice");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], Message::user("hi"));
        assert_eq!(history[1], Message::assistant("Mock response to: hi"));
    }

    #[tokio::test]
    async fn test_histories_are_isolated_per_user() {
        let backend = MockBackend::new();
        backend.send_message("alice", "key", "hi").await.unwrap();

        assert!(backend.history("bob").is_empty());
        assert_eq!(backend.history("alice").len(), 2);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let backend = MockBackend::new();
        backend.send_message("alice", "key", "hi").await.unwrap();

        assert!(backend.clear_history("alice"));
        assert!(backend.history("alice").is_empty());
        assert!(!backend.clear_history("alice"));
    }
}
