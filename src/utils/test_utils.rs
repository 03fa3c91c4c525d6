//! Test doubles: a scripted [`ModelProvider`] and a loopback HTTP responder
//! for exercising the Gemini client.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::core::providers::{Dialogue, ModelProvider, ProviderError};

/// Scripted result of one provider call.
#[derive(Debug, Clone)]
pub enum Outcome {
    Reply(String),
    AuthFailure,
    ServerFailure,
    NetworkFailure,
    /// Never resolves.
    Hang,
}

impl Outcome {
    async fn resolve(self) -> Result<String, ProviderError> {
        match self {
            Outcome::Reply(text) => Ok(text),
            Outcome::AuthFailure => Err(ProviderError::Auth {
                status: 403,
                message: "API key not valid".to_string(),
            }),
            Outcome::ServerFailure => Err(ProviderError::Api {
                status: 503,
                message: "The model is overloaded".to_string(),
            }),
            Outcome::NetworkFailure => {
                Err(ProviderError::Transport("connection reset by peer".to_string()))
            }
            Outcome::Hang => std::future::pending().await,
        }
    }
}

/// Provider whose replies come from a script, recording every call.
#[derive(Default)]
pub struct FakeProvider {
    completions: Mutex<VecDeque<Outcome>>,
    completion_prompts: Mutex<Vec<String>>,
    open_failure: Option<Outcome>,
    opened: Mutex<Vec<(String, String)>>,
    replies: Arc<Mutex<VecDeque<Outcome>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl FakeProvider {
    pub fn with_completions(completions: Vec<Outcome>) -> Self {
        Self {
            completions: Mutex::new(completions.into()),
            ..Default::default()
        }
    }

    /// Dialogues opened from this provider answer with `replies`, in order.
    pub fn with_replies(replies: Vec<Outcome>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Default::default()
        }
    }

    pub fn failing_open(outcome: Outcome) -> Self {
        Self {
            open_failure: Some(outcome),
            ..Default::default()
        }
    }

    pub fn completion_prompts(&self) -> Vec<String> {
        self.completion_prompts.lock().unwrap().clone()
    }

    /// `(credential, system_prompt)` of every dialogue opened.
    pub fn opened(&self) -> Vec<(String, String)> {
        self.opened.lock().unwrap().clone()
    }

    /// Every user turn handed to a dialogue.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for FakeProvider {
    async fn open_dialogue(
        &self,
        credential: &str,
        system_prompt: &str,
    ) -> Result<Box<dyn Dialogue>, ProviderError> {
        if let Some(outcome) = self.open_failure.clone() {
            outcome.resolve().await?;
        }
        self.opened
            .lock()
            .unwrap()
            .push((credential.to_string(), system_prompt.to_string()));
        Ok(Box::new(FakeDialogue {
            replies: Arc::clone(&self.replies),
            sent: Arc::clone(&self.sent),
        }))
    }

    async fn complete(&self, _credential: &str, prompt: &str) -> Result<String, ProviderError> {
        self.completion_prompts
            .lock()
            .unwrap()
            .push(prompt.to_string());
        let outcome = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::NetworkFailure);
        outcome.resolve().await
    }
}

struct FakeDialogue {
    replies: Arc<Mutex<VecDeque<Outcome>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Dialogue for FakeDialogue {
    async fn send(&mut self, text: &str) -> Result<String, ProviderError> {
        self.sent.lock().unwrap().push(text.to_string());
        let outcome = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::NetworkFailure);
        outcome.resolve().await
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub type CapturedRequests = Arc<Mutex<Vec<CapturedRequest>>>;

/// Serve the canned `(status, body)` responses in order, one connection each.
pub async fn spawn_responder(
    responses: Vec<(u16, String)>,
) -> (String, CapturedRequests, JoinHandle<Result<(), String>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let captured: CapturedRequests = Arc::new(Mutex::new(Vec::new()));
    let captured_for_server = Arc::clone(&captured);

    let server_task = tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
            let (request_line, headers, raw_body) = read_http_request(&mut stream).await?;
            let body_json = serde_json::from_slice(&raw_body).unwrap_or(serde_json::Value::Null);
            captured_for_server
                .lock()
                .map_err(|err| err.to_string())?
                .push(CapturedRequest {
                    request_line,
                    headers,
                    body: body_json,
                });

            let response = format!(
                "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\nconnection: close\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            stream
                .write_all(response.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            stream.shutdown().await.map_err(|err| err.to_string())?;
        }
        Ok(())
    });

    (format!("http://{addr}/v1beta"), captured, server_task)
}

async fn read_http_request(
    stream: &mut TcpStream,
) -> Result<(String, Vec<(String, String)>, Vec<u8>), String> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.ok_or_else(|| "header end should exist".to_string())?;
    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing HTTP request line".to_string())?
        .to_string();

    let mut headers = Vec::new();
    let mut content_length = 0_usize;
    for line in lines {
        let mut parts = line.splitn(2, ':');
        let Some(name) = parts.next() else {
            continue;
        };
        let value = parts.next().unwrap_or_default().trim().to_string();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().map_err(|err| err.to_string())?;
        }
        headers.push((name.to_string(), value));
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok((request_line, headers, body))
}
