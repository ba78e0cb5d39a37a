//! Fake rendering engine for integration tests: a stub "browser" executable
//! that announces a DevTools endpoint served by an in-test WebSocket server.
//! Lets the real session/manager code run end-to-end, with failure injection
//! and surface accounting, without a Chromium installation.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use vellum_engine::EngineConfig;

pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n%fake vellum document\n%%EOF\n";

#[derive(Debug, Clone, Copy, Default)]
pub struct FakeEngineOptions {
    /// Reply to `Page.setDocumentContent` with a protocol error.
    pub fail_set_content: bool,
    /// Start a resource load after the document is set and never finish it,
    /// so the surface never quiesces.
    pub stall_network: bool,
    /// Reply to `Page.printToPDF` with a protocol error.
    pub fail_print: bool,
}

#[derive(Default)]
pub struct FakeState {
    options: FakeEngineOptions,
    connections: AtomicUsize,
    created_targets: AtomicUsize,
    open_targets: AtomicUsize,
    last_document: Mutex<Option<String>>,
}

pub struct FakeEngine {
    pub binary: PathBuf,
    state: Arc<FakeState>,
    _dir: TempDir,
}

impl FakeEngine {
    pub async fn start(options: FakeEngineOptions) -> FakeEngine {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let state = Arc::new(FakeState {
            options,
            ..FakeState::default()
        });

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_state.connections.fetch_add(1, Ordering::SeqCst);
                let state = accept_state.clone();
                tokio::spawn(async move {
                    serve_connection(stream, state).await;
                });
            }
        });

        // Stub "browser": announces the endpoint like Chromium does, then
        // idles until the manager kills it.
        let dir = TempDir::new().expect("dir");
        let binary = dir.path().join("fake-engine.sh");
        std::fs::write(
            &binary,
            format!(
                "#!/bin/sh\n\
                 echo 'DevTools listening on ws://127.0.0.1:{port}/devtools/browser/fake' >&2\n\
                 exec sleep 600\n"
            ),
        )
        .expect("write stub");
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        FakeEngine {
            binary,
            state,
            _dir: dir,
        }
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            binary: Some(self.binary.clone()),
            ..EngineConfig::default()
        }
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn created_targets(&self) -> usize {
        self.state.created_targets.load(Ordering::SeqCst)
    }

    pub fn open_targets(&self) -> usize {
        self.state.open_targets.load(Ordering::SeqCst)
    }

    pub fn last_document(&self) -> Option<String> {
        self.state.last_document.lock().expect("lock").clone()
    }
}

async fn serve_connection(stream: TcpStream, state: Arc<FakeState>) {
    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(_) => return,
    };

    while let Some(Ok(msg)) = ws.next().await {
        let Message::Text(text) = msg else { continue };
        let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        let id = frame.get("id").and_then(Value::as_u64).unwrap_or(0);
        let method = frame.get("method").and_then(Value::as_str).unwrap_or("");
        let session_id = frame.get("sessionId").and_then(Value::as_str);
        let params = frame.get("params").cloned().unwrap_or(Value::Null);

        let reply = match method {
            "Target.createTarget" => {
                let n = state.created_targets.fetch_add(1, Ordering::SeqCst) + 1;
                state.open_targets.fetch_add(1, Ordering::SeqCst);
                ok(id, session_id, json!({ "targetId": format!("target-{n}") }))
            }
            "Target.attachToTarget" => {
                let target = params["targetId"].as_str().unwrap_or("target-0");
                ok(id, session_id, json!({ "sessionId": format!("sess-{target}") }))
            }
            "Target.closeTarget" => {
                state.open_targets.fetch_sub(1, Ordering::SeqCst);
                ok(id, session_id, json!({ "success": true }))
            }
            "Page.setDocumentContent" => {
                if state.options.fail_set_content {
                    error(id, session_id, "navigation failed: net::ERR_ABORTED")
                } else {
                    *state.last_document.lock().expect("lock") =
                        params["html"].as_str().map(str::to_owned);
                    let _ = ws.send(ok(id, session_id, json!({}))).await;
                    // Simulate the styling runtime's asynchronous fetch.
                    let started = json!({
                        "method": "Network.requestWillBeSent",
                        "sessionId": session_id,
                        "params": { "requestId": "req-style-runtime" },
                    });
                    let _ = ws.send(Message::text(started.to_string())).await;
                    if !state.options.stall_network {
                        let finished = json!({
                            "method": "Network.loadingFinished",
                            "sessionId": session_id,
                            "params": { "requestId": "req-style-runtime" },
                        });
                        let _ = ws.send(Message::text(finished.to_string())).await;
                    }
                    continue;
                }
            }
            "Page.printToPDF" => {
                if state.options.fail_print {
                    error(id, session_id, "printing failed")
                } else {
                    use base64::engine::general_purpose::STANDARD;
                    use base64::Engine as _;
                    ok(id, session_id, json!({ "data": STANDARD.encode(FAKE_PDF) }))
                }
            }
            "Page.getFrameTree" => ok(
                id,
                session_id,
                json!({ "frameTree": { "frame": { "id": "frame-main" } } }),
            ),
            // Page.enable, Network.enable and friends just acknowledge.
            _ => ok(id, session_id, json!({})),
        };

        if ws.send(reply).await.is_err() {
            break;
        }
    }
}

fn ok(id: u64, session_id: Option<&str>, result: Value) -> Message {
    let mut frame = json!({ "id": id, "result": result });
    if let Some(session) = session_id {
        frame["sessionId"] = Value::String(session.to_string());
    }
    Message::text(frame.to_string())
}

fn error(id: u64, session_id: Option<&str>, message: &str) -> Message {
    let mut frame = json!({ "id": id, "error": { "code": -32000, "message": message } });
    if let Some(session) = session_id {
        frame["sessionId"] = Value::String(session.to_string());
    }
    Message::text(frame.to_string())
}
