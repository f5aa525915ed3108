//! Shared test harness: mock pipeline, app construction, request and SSE
//! helpers.

// Each integration test binary compiles this module independently and
// uses a different subset of it.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use recap_common::types::{Timestamp, TranscriptItem};
use recap_server::auth::UserInfo;
use recap_server::config::{Config, LlmConfig};
use recap_server::jobs::Job;
use recap_server::pipeline::{JobError, PipelineOutput, Summarize};
use recap_server::server::{build_app, AppState};
use recap_server::services::key_policy::{KeyPolicy, PolicyMode};

/// Configurable stand-in for the production pipeline.
pub struct MockPipeline {
    pub title: String,
    pub summary: String,
    pub delay: Duration,
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
}

impl MockPipeline {
    pub fn succeeding(title: &str, summary: &str, delay: Duration) -> Self {
        Self {
            title: title.to_string(),
            summary: summary.to_string(),
            delay,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            title: String::new(),
            summary: String::new(),
            delay: Duration::from_millis(10),
            fail_with: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarize for MockPipeline {
    async fn summarize(&self, job: &Job) -> Result<PipelineOutput, JobError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if let Some(message) = &self.fail_with {
            return Err(JobError::Failed(message.clone()));
        }

        Ok(PipelineOutput {
            title: self.title.clone(),
            summary: self.summary.clone(),
            timestamps: vec![Timestamp {
                time: 0,
                text: "Start.".to_string(),
            }],
            transcript: vec![TranscriptItem {
                text: format!("transcript of {}", job.video_id),
                start: 0.0,
                duration: 2.0,
            }],
        })
    }

    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<TranscriptItem>, JobError> {
        Ok(vec![TranscriptItem {
            text: format!("fresh transcript of {video_id}"),
            start: 0.0,
            duration: 2.0,
        }])
    }
}

/// A fully wired application over temp directories.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pipeline: Arc<MockPipeline>,
    _cache_dir: TempDir,
    _users_dir: TempDir,
}

pub struct TestAppOptions {
    pub pipeline: MockPipeline,
    pub queue_capacity: usize,
    pub num_workers: usize,
    pub policy_mode: PolicyMode,
    pub designated_users: Vec<String>,
    pub server_key: Option<String>,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            pipeline: MockPipeline::succeeding("T", "S", Duration::from_millis(50)),
            queue_capacity: 100,
            num_workers: 3,
            policy_mode: PolicyMode::All,
            designated_users: Vec::new(),
            server_key: Some("sk-server-key".to_string()),
        }
    }
}

pub fn spawn_app(options: TestAppOptions) -> TestApp {
    let cache_dir = TempDir::new().expect("create cache dir");
    let users_dir = TempDir::new().expect("create users dir");

    let config = Config {
        port: 0,
        cache_dir: cache_dir.path().to_path_buf(),
        users_dir: users_dir.path().to_path_buf(),
        num_workers: options.num_workers,
        queue_capacity: options.queue_capacity,
        chunk_seconds: 400.0,
        merge_interval_seconds: 15.0,
        max_history: 50,
        subtitle_langs: "ko".to_string(),
        key_policy_mode: options.policy_mode,
        designated_users: options.designated_users.clone(),
        llm: LlmConfig {
            url: "http://127.0.0.1:9/unused".to_string(),
            model: "test-model".to_string(),
            max_tokens: 1500,
            temperature: 0.2,
            api_key: options.server_key.clone(),
            http_timeout_secs: 5,
            prompt: "test prompt".to_string(),
        },
    };

    let key_policy = Arc::new(KeyPolicy::new(
        options.policy_mode,
        options.designated_users.iter().cloned(),
    ));
    let pipeline = Arc::new(options.pipeline);
    let summarizer: Arc<dyn Summarize> = Arc::clone(&pipeline) as Arc<dyn Summarize>;

    let (router, state) = build_app(config, key_policy, summarizer).expect("build app");

    TestApp {
        router,
        state,
        pipeline,
        _cache_dir: cache_dir,
        _users_dir: users_dir,
    }
}

impl TestApp {
    /// Create a session for `user_id` and return the cookie header value.
    pub fn login(&self, user_id: &str) -> String {
        let session_id = self.state.sessions.insert(UserInfo {
            id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            name: user_id.to_string(),
            picture: String::new(),
        });
        format!("session_id={session_id}")
    }

    pub async fn post_summary(&self, cookie: &str, url: &str) -> (StatusCode, Value) {
        self.post_summary_with_key(cookie, url, None).await
    }

    pub async fn post_summary_with_key(
        &self,
        cookie: &str,
        url: &str,
        bearer_key: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/api/summary")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, cookie);
        if let Some(key) = bearer_key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }

        let body = serde_json::json!({ "url": url }).to_string();
        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::from(body)).expect("build request"))
            .await
            .expect("send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse response body")
        };
        (status, value)
    }

    pub async fn get_json(&self, cookie: Option<&str>, path: &str) -> (StatusCode, Value) {
        let mut request = Request::builder().method(Method::GET).uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::empty()).expect("build request"))
            .await
            .expect("send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse response body")
        };
        (status, value)
    }

    /// Open the SSE stream for `cookie` and consume the `connected`
    /// handshake, returning a reader for subsequent events.
    pub async fn open_events(&self, cookie: &str) -> SseReader {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/summary/events")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("send request");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/event-stream")
        );

        let mut reader = SseReader {
            body: response.into_body(),
            buffer: String::new(),
        };

        let connected = reader
            .next_event(Duration::from_secs(2))
            .await
            .expect("connected handshake");
        assert_eq!(connected.0, "connected");

        reader
    }
}

/// Incremental SSE frame reader over a response body.
pub struct SseReader {
    body: Body,
    buffer: String,
}

impl SseReader {
    /// Read the next `(event, data)` frame, skipping comments, or `None`
    /// when the stream ends or `timeout` elapses.
    pub async fn next_event(&mut self, timeout: Duration) -> Option<(String, Value)> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(frame) = self.take_buffered_frame() {
                return Some(frame);
            }

            let remaining = deadline.checked_duration_since(tokio::time::Instant::now())?;
            let chunk = tokio::time::timeout(remaining, self.body.frame())
                .await
                .ok()??
                .ok()?;

            if let Some(data) = chunk.data_ref() {
                self.buffer.push_str(&String::from_utf8_lossy(data));
            }
        }
    }

    /// True when the stream has ended (no further frames).
    pub async fn ended(&mut self, timeout: Duration) -> bool {
        self.next_event(timeout).await.is_none()
    }

    fn take_buffered_frame(&mut self) -> Option<(String, Value)> {
        while let Some(boundary) = self.buffer.find("\n\n") {
            let raw: String = self.buffer.drain(..boundary + 2).collect();

            let mut event_name = None;
            let mut data = None;
            for line in raw.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    event_name = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data = Some(rest.trim().to_string());
                }
                // Comment lines (keep-alives) are skipped.
            }

            if let (Some(event_name), Some(data)) = (event_name, data) {
                let value = serde_json::from_str(&data).unwrap_or(Value::String(data));
                return Some((event_name, value));
            }
        }
        None
    }
}
