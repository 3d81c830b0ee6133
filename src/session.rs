//! Page session lifecycle.
//!
//! A `PageSession` binds one browser tab to one target document URL for the
//! duration of a single batch row. It is owned exclusively by the pipeline
//! invocation that created it and is closed on every exit path, success or
//! failure, so browser processes never leak across a batch run.

use crate::renderer::{NavigationResult, RenderContext};
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Lifecycle state of a page session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Active,
    Closing,
}

/// One browser tab bound to one target document URL.
pub struct PageSession {
    context: Box<dyn RenderContext>,
    url: String,
    state: SessionState,
    /// Viewport dimensions the browser was launched with.
    pub viewport: (u32, u32),
}

impl PageSession {
    /// Wrap a fresh browser context. The session starts in `Opening` and
    /// becomes `Active` after the first successful navigation.
    pub fn new(context: Box<dyn RenderContext>) -> Self {
        Self {
            context,
            url: String::new(),
            state: SessionState::Opening,
            viewport: (1920, 1080),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The URL this session is bound to (empty before first navigation).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Navigate and bind the session to `url`.
    pub async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let nav = self.context.navigate(url, timeout_ms).await?;
        self.url = url.to_string();
        self.state = SessionState::Active;
        Ok(nav)
    }

    /// Execute JavaScript, returning the raw JSON value.
    pub async fn eval(&self, script: &str) -> Result<serde_json::Value> {
        self.context.execute_js(script).await
    }

    /// Execute JavaScript and deserialize the result.
    pub async fn eval_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let value = self.context.execute_js(script).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Execute JavaScript for effect, swallowing any error.
    ///
    /// Used on paths where a failed page-side mutation must not abort the
    /// pipeline (suppression sweeps, scroll nudges).
    pub async fn eval_quiet(&self, script: &str) -> Option<serde_json::Value> {
        match self.context.execute_js(script).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!("swallowed JS error: {e:#}");
                None
            }
        }
    }

    /// Settle delay: bounded pause after a DOM-affecting action so
    /// asynchronous rendering can catch up before the next read.
    pub async fn settle(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Borrow the underlying render context.
    pub fn context(&self) -> &dyn RenderContext {
        self.context.as_ref()
    }

    /// Close the session and release the browser tab.
    pub async fn close(mut self) -> Result<()> {
        self.state = SessionState::Closing;
        self.context.close().await
    }
}
