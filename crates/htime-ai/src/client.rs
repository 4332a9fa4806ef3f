//! Chat-completion endpoint client

use std::collections::HashMap;
use std::pin::Pin;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use crate::{
    decoder::{SseDecoder, SseFrame},
    error::{Error, Result},
    types::ChatRequest,
};

/// Events produced while a reply streams in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// One incremental content fragment
    Delta { content: String },
    /// The reply finished normally
    Done,
    /// The transport failed part way through
    Error { message: String },
}

impl StreamEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}

/// A stream of reply events
pub type ChatStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Something that can answer a chat request with a streamed reply
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Issue the request; the returned stream ends after a terminal event
    async fn stream(&self, request: &ChatRequest) -> Result<ChatStream>;
}

/// Decode a raw body byte stream into reply events.
///
/// Every fragment is yielded in arrival order; the stream always ends with
/// exactly one terminal event.
pub fn decode_stream<S, B, E>(body: S) -> ChatStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    let mut body = Box::pin(body);

    Box::pin(stream! {
        let mut decoder = SseDecoder::new();

        while let Some(item) = body.next().await {
            let bytes = match item {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield StreamEvent::Error {
                        message: Error::Sse(e.to_string()).to_string(),
                    };
                    return;
                }
            };

            for frame in decoder.feed(bytes.as_ref()) {
                match frame {
                    SseFrame::Chunk(chunk) => {
                        if let Some(content) = chunk.delta_content() {
                            yield StreamEvent::Delta { content: content.to_string() };
                        }
                    }
                    SseFrame::Done => {
                        yield StreamEvent::Done;
                        return;
                    }
                }
            }
        }

        for frame in decoder.finish() {
            if let SseFrame::Chunk(chunk) = frame {
                if let Some(content) = chunk.delta_content() {
                    yield StreamEvent::Delta { content: content.to_string() };
                }
            }
        }

        tracing::debug!("Chat stream ended without sentinel");
        yield StreamEvent::Done;
    })
}

/// HTTP client for the hosted chat endpoint
pub struct HttpChatEndpoint {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    headers: HashMap<String, String>,
}

impl HttpChatEndpoint {
    /// Create a client posting to `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: None,
            headers: HashMap::new(),
        }
    }

    /// Create from `HTIME_CHAT_URL` and the optional `HTIME_API_KEY`
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("HTIME_CHAT_URL")
            .map_err(|_| Error::InvalidConfig("HTIME_CHAT_URL is not set".into()))?;
        let endpoint = Self::new(url);
        Ok(match std::env::var("HTIME_API_KEY") {
            Ok(key) => endpoint.with_api_key(key),
            Err(_) => endpoint,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Add an extra header to every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        if let Some(ref key) = self.api_key {
            if let Ok(value) = format!("Bearer {}", key).parse() {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }

        for (key, value) in &self.headers {
            if let (Ok(name), Ok(val)) = (
                key.parse::<reqwest::header::HeaderName>(),
                value.parse::<reqwest::header::HeaderValue>(),
            ) {
                headers.insert(name, val);
            } else {
                tracing::warn!("Skipping invalid header '{}'", key);
            }
        }

        headers
    }
}

#[async_trait]
impl ChatEndpoint for HttpChatEndpoint {
    async fn stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidConfig("chat endpoint URL is empty".into()));
        }

        tracing::debug!(
            "Posting {} messages to {}",
            request.messages.len(),
            self.url
        );

        let response = self
            .client
            .post(&self.url)
            .headers(self.build_headers())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), text));
        }

        if status == reqwest::StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Err(Error::MissingBody);
        }

        Ok(decode_stream(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(chunks: Vec<&'static str>) -> Vec<StreamEvent> {
        let body = futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, std::io::Error>(c.as_bytes().to_vec())),
        );
        decode_stream(body).collect().await
    }

    fn text(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Delta { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_decode_split_payload() {
        let events = collect(vec![
            r#"data: {"choices":[{"delta":{"content":"Hel"#,
            "lo\"}}]}\n\ndata: [DONE]\n",
        ])
        .await;
        assert_eq!(text(&events), "Hello");
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }

    #[tokio::test]
    async fn test_decode_ends_with_done_without_sentinel() {
        let events = collect(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            r#"data: {"choices":[{"delta":{"content":"b"}}]}"#,
        ])
        .await;
        assert_eq!(text(&events), "ab");
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn test_decode_transport_error() {
        let body = futures::stream::iter(vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n".to_vec()),
            Err(std::io::Error::other("connection reset")),
        ]);
        let events: Vec<_> = decode_stream(body).collect().await;
        assert_eq!(text(&events), "a");
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error { message })
                if message.starts_with("SSE error:") && message.contains("connection reset")
        ));
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let endpoint = HttpChatEndpoint::new("  ");
        let request = ChatRequest::new(vec![], serde_json::Value::Null);
        let err = endpoint.stream(&request).await.err().unwrap();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_headers() {
        let endpoint = HttpChatEndpoint::new("http://localhost/chat")
            .with_api_key("secret")
            .with_header("x-profile", "alice")
            .with_header("bad header", "x");
        let headers = endpoint.build_headers();
        assert_eq!(headers["authorization"], "Bearer secret");
        assert_eq!(headers["x-profile"], "alice");
        assert_eq!(headers.len(), 3);
    }
}
