#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub const API_KEY: &str = "stub-key";

/// Base64 of a 1x1 PNG.
pub const PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mP8/xcAAgMBgG7cGQAAAABJRU5ErkJggg==";

#[derive(Debug, Clone)]
pub struct GeminiStubConfig {
    pub scenes: usize,
    /// Video submissions (0-based, in arrival order) answered with a 404
    /// NOT_FOUND error.
    pub video_not_found_at: Option<usize>,
    /// Video submissions answered with a 500 INTERNAL error.
    pub video_internal_error_at: Option<usize>,
    /// Polls answered with `done: false` before an operation finishes.
    pub pending_polls: u32,
}

impl Default for GeminiStubConfig {
    fn default() -> Self {
        Self {
            scenes: 3,
            video_not_found_at: None,
            video_internal_error_at: None,
            pending_polls: 1,
        }
    }
}

/// `METHOD path` of every request the stub accepted, in order.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

pub struct GeminiStub {
    pub base_url: String,
    pub requests: RequestLog,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl GeminiStub {
    pub fn spawn(config: GeminiStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start gemini stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1beta");
        let requests: RequestLog = Arc::default();
        let log = Arc::clone(&requests);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let mut submissions = 0usize;
            let mut polls: HashMap<String, u32> = HashMap::new();

            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let method = request.method().clone();
                let path = request.url().to_string();

                let key = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("x-goog-api-key"))
                    .map(|h| h.value.as_str().to_owned());
                if key.as_deref() != Some(API_KEY) {
                    let _ = request.respond(json_response(
                        401,
                        &rpc_error(401, "API key not valid.", "UNAUTHENTICATED"),
                    ));
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                log.lock().unwrap().push(format!("{method} {path}"));

                let (status, payload) = match (&method, path.as_str()) {
                    (tiny_http::Method::Post, p) if p.ends_with(":generateContent") => {
                        match serde_json::from_str::<Value>(&body) {
                            Ok(parsed) if prompt_of(&parsed, "/contents/0/parts/0/text")
                                .is_some_and(|p| p.contains("BEGIN_BOOK_TEXT")) =>
                            {
                                (200, analysis_response(config.scenes))
                            }
                            _ => (400, rpc_error(400, "missing book prompt", "INVALID_ARGUMENT")),
                        }
                    }
                    (tiny_http::Method::Post, p) if p.ends_with(":predict") => (
                        200,
                        serde_json::json!({
                            "predictions": [
                                { "bytesBase64Encoded": PNG_BASE64, "mimeType": "image/png" }
                            ]
                        }),
                    ),
                    (tiny_http::Method::Post, p) if p.ends_with(":predictLongRunning") => {
                        let n = submissions;
                        submissions += 1;
                        if config.video_not_found_at == Some(n) {
                            (
                                404,
                                rpc_error(404, "Requested entity was not found.", "NOT_FOUND"),
                            )
                        } else if config.video_internal_error_at == Some(n) {
                            (500, rpc_error(500, "Internal error encountered.", "INTERNAL"))
                        } else {
                            let model = p
                                .trim_start_matches("/v1beta/models/")
                                .trim_end_matches(":predictLongRunning");
                            (
                                200,
                                serde_json::json!({
                                    "name": format!("models/{model}/operations/op-{n}")
                                }),
                            )
                        }
                    }
                    (tiny_http::Method::Get, p) if p.contains("/operations/") => {
                        let name = p.trim_start_matches("/v1beta/").to_owned();
                        let seen = polls.entry(name.clone()).or_insert(0);
                        *seen += 1;
                        if *seen <= config.pending_polls {
                            (200, serde_json::json!({ "name": name, "done": false }))
                        } else {
                            let id = name.rsplit('/').next().unwrap_or_default().to_owned();
                            (
                                200,
                                serde_json::json!({
                                    "name": name,
                                    "done": true,
                                    "response": { "generateVideoResponse": { "generatedSamples": [
                                        { "video": { "uri": format!("https://files.example/{id}.mp4") } }
                                    ] } }
                                }),
                            )
                        }
                    }
                    _ => (404, rpc_error(404, "unknown route", "NOT_FOUND")),
                };

                let _ = request.respond(json_response(status, &payload));
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for GeminiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn prompt_of<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(|v| v.as_str())
}

fn rpc_error(code: u16, message: &str, status: &str) -> Value {
    serde_json::json!({ "error": { "code": code, "message": message, "status": status } })
}

fn json_response(status: u16, body: &Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header)
}

fn analysis_response(scenes: usize) -> Value {
    let scenes = (0..scenes)
        .map(|idx| {
            serde_json::json!({
                "title": format!("Stub Scene {}", idx + 1),
                "description": format!("Something happens in scene {}.", idx + 1),
                "foreshadowing": "A hint of what comes next.",
                "visualPrompt": format!("Stub visual prompt {}", idx + 1),
            })
        })
        .collect::<Vec<_>>();
    let analysis = serde_json::json!({
        "title": "Stub Book",
        "author": "Stub Author",
        "summary": "A book served by the stub.",
        "themes": ["testing"],
        "scenes": scenes,
    });

    // Fenced like real model output sometimes is.
    let text = format!("```json\n{analysis}\n```");
    serde_json::json!({
        "candidates": [
            { "content": { "role": "model", "parts": [{ "text": text }] } }
        ]
    })
}
