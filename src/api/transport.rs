use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::stream::{self, ByteStream, FormDataStream};
use crate::error::ProviderError;

/// Body of an outgoing request
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Multipart(FormDataStream),
}

/// A single HTTP call to the remote API
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        ApiRequest {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn multipart(mut self, form: FormDataStream) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }
}

/// Status plus a streaming body
pub struct ApiResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl ApiResponse {
    pub fn new(status: u16, body: ByteStream) -> Self {
        ApiResponse {
            status,
            content_length: None,
            body,
        }
    }

    /// Drain the body and parse it as JSON. An empty body parses as `null`.
    pub async fn json(self) -> crate::Result<Value> {
        let bytes = stream::collect(self.body)
            .await
            .map_err(|e| ProviderError::Transport(e.into()))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Drain the body as (lossy) UTF-8 text
    pub async fn text(self) -> String {
        match stream::collect(self.body).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => format!("<unreadable body: {e}>"),
        }
    }
}

impl std::fmt::Debug for ApiResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// HTTP plumbing the provider issues its calls through.
///
/// Implementations own retries, timeouts and connection reuse; the
/// provider only checks the returned status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Transport backed by a shared `reqwest` client
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .query(&request.query);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        if let RequestBody::Multipart(form) = request.body {
            let (attributes, file_name, file) = form.into_parts();
            let part = Part::stream(reqwest::Body::wrap_stream(file)).file_name(file_name);
            builder = builder.multipart(Form::new().text("attributes", attributes).part("file", part));
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("{} {} failed", request.method, request.url))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed();

        Ok(ApiResponse {
            status,
            content_length,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let response = ApiResponse::new(204, stream::once(Vec::<u8>::new()));
        assert_eq!(response.json().await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_json_is_error() {
        let response = ApiResponse::new(200, stream::once("not json"));
        let err = response.json().await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::new(Method::GET, "https://api.box.com/2.0/folders/0/items")
            .query("limit", 1000)
            .header("Authorization", "Bearer t");
        assert_eq!(request.query, vec![("limit".to_string(), "1000".to_string())]);
        assert_eq!(request.headers.len(), 1);
        assert!(matches!(request.body, RequestBody::Empty));
    }
}
