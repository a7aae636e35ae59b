//! HTTP tools.

use crate::error::ToolError;
use crate::tools::constants::http;
use crate::tools::{Tool, ToolArgs, failed};
use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;

/// Longest body returned to the model, in characters.
const MAX_BODY_CHARS: usize = 20_000;

fn truncate_body(body: String) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => format!("{}\n[truncated]", &body[..cut]),
        None => body,
    }
}

async fn read_response(tool: &str, response: reqwest::Response) -> Result<String, ToolError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| failed(tool, e))?;
    if status.is_success() {
        Ok(truncate_body(body))
    } else {
        Err(failed(tool, format!("HTTP {status}: {}", truncate_body(body))))
    }
}

/// Fetches a URL with GET and returns the body.
pub struct FetchUrlTool {
    client: reqwest::Client,
}

impl FetchUrlTool {
    /// Creates the tool around a shared client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(http::FETCH_URL)
    }

    fn doc(&self) -> Cow<'static, str> {
        Cow::Borrowed("Fetches a URL and returns the response body. Parameters: {\"url\": string}.")
    }

    async fn call(&self, args: ToolArgs) -> Result<String, ToolError> {
        let url = args.required_str(http::FETCH_URL, "url", 0)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(http::FETCH_URL, e))?;
        read_response(http::FETCH_URL, response).await
    }
}

/// Posts JSON to a URL and returns the response body.
pub struct HttpPostTool {
    client: reqwest::Client,
}

impl HttpPostTool {
    /// Creates the tool around a shared client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for HttpPostTool {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(http::POST_DATA)
    }

    fn doc(&self) -> Cow<'static, str> {
        Cow::Borrowed(
            "Sends a JSON POST request and returns the response body. Parameters: {\"url\": string, \"data\": any JSON}.",
        )
    }

    async fn call(&self, args: ToolArgs) -> Result<String, ToolError> {
        let url = args.required_str(http::POST_DATA, "url", 0)?;
        let data = args.get("data", 1).cloned().unwrap_or(Value::Null);
        let response = self
            .client
            .post(url)
            .json(&data)
            .send()
            .await
            .map_err(|e| failed(http::POST_DATA, e))?;
        read_response(http::POST_DATA, response).await
    }
}
