//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use spider_select::{
    CompletionOptions, CompletionResponse, ElementSnapshot, Message, ModelProvider, RawElement,
    Role, SelectError, SelectResult, TokenUsage, Viewport,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted model reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Error(String),
    Hang(Duration),
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }
}

/// Model double that plays back scripted replies and records prompts.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    finished: AtomicUsize,
    window: usize,
}

impl ScriptedModel {
    pub fn new<I: IntoIterator<Item = Reply>>(replies: I) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            window: 4096,
        }
    }

    pub fn with_context_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Calls started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to completion.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedModel {
    async fn complete(
        &self,
        messages: &[Message],
        _options: &CompletionOptions,
    ) -> SelectResult<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(user) = messages.iter().rev().find(|m| m.role == "user") {
            self.prompts.lock().unwrap().push(user.content.clone());
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::text("I am not sure."));

        let out = match reply {
            Reply::Text(text) => Ok(CompletionResponse::new(text, TokenUsage::new(100, 20))),
            Reply::Error(msg) => Err(SelectError::Model(msg)),
            Reply::Hang(d) => {
                tokio::time::sleep(d).await;
                Ok(CompletionResponse::new(r#"{"id": 0}"#, TokenUsage::new(100, 20)))
            }
        };
        self.finished.fetch_add(1, Ordering::SeqCst);
        out
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn context_window(&self) -> usize {
        self.window
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn snapshot(elements: Vec<RawElement>) -> ElementSnapshot {
    ElementSnapshot::new(
        "https://www.google.com/search?q=japan+travel",
        Viewport::new(1280, 800),
        elements,
    )
}

/// A search results page: search box, navigation, an ad and organic results.
pub fn search_results_page() -> ElementSnapshot {
    snapshot(vec![
        RawElement::new(1, Role::Combobox, "Search")
            .with_bbox(180.0, 20.0, 600.0, 44.0)
            .with_importance(0.95),
        RawElement::new(2, Role::Link, "Images")
            .with_bbox(200.0, 80.0, 60.0, 20.0)
            .with_importance(0.4),
        RawElement::new(3, Role::Link, "Sponsored · Buy now")
            .with_bbox(180.0, 150.0, 500.0, 24.0)
            .with_importance(0.9)
            .with_attribute("href", "https://ads.example.com"),
        RawElement::new(4, Role::Link, "Official guide to Japan travel")
            .with_bbox(180.0, 260.0, 500.0, 24.0)
            .with_importance(0.85)
            .with_attribute("href", "https://www.japan.travel/en/"),
        RawElement::new(5, Role::Link, "Japan travel forum")
            .with_bbox(180.0, 340.0, 500.0, 24.0)
            .with_importance(0.7),
        RawElement::new(6, Role::Button, "Google Search")
            .with_bbox(400.0, 90.0, 120.0, 36.0)
            .with_importance(0.6),
        RawElement::new(7, Role::Link, "Page 2")
            .with_in_viewport(false)
            .with_bbox(600.0, 1900.0, 40.0, 20.0)
            .with_importance(0.2),
    ])
}
