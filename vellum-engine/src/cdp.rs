//! Minimal DevTools-protocol client: one WebSocket to the engine, commands
//! multiplexed from concurrent renders through a driver task.
//!
//! Callers enqueue a command with a `oneshot` reply slot; the driver assigns
//! message ids, matches replies back to slots, and fans protocol events out
//! on a `broadcast` channel. When the socket drops (engine death or
//! shutdown), everything still in flight fails instead of hanging.

use std::collections::HashMap;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::EngineError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A protocol event (no `id`), e.g. `Network.requestWillBeSent`.
#[derive(Debug, Clone)]
pub(crate) struct CdpEvent {
    pub method: String,
    pub session_id: Option<String>,
    pub params: Value,
}

struct PendingCommand {
    method: String,
    params: Value,
    session_id: Option<String>,
    respond_to: oneshot::Sender<Result<Value, EngineError>>,
}

/// Handle to the engine connection. Cheap to share by reference; the
/// underlying socket lives in the driver task.
pub(crate) struct Connection {
    cmd_tx: mpsc::Sender<PendingCommand>,
    event_tx: broadcast::Sender<CdpEvent>,
    shutdown_tx: broadcast::Sender<()>,
    closed_rx: watch::Receiver<bool>,
}

impl Connection {
    /// Connect to a `ws://` DevTools endpoint and start the driver.
    pub(crate) async fn open(url: &str) -> Result<Self, EngineError> {
        let (ws, _response) = connect_async(url).await.map_err(|err| {
            EngineError::unavailable(format!("failed to connect to devtools endpoint {url}: {err}"))
        })?;
        Ok(Self::start(ws))
    }

    fn start(ws: WsStream) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PendingCommand>(64);
        let (event_tx, _) = broadcast::channel::<CdpEvent>(256);
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(4);
        let (closed_tx, closed_rx) = watch::channel(false);
        tokio::spawn(drive(ws, cmd_rx, event_tx.clone(), shutdown_rx, closed_tx));
        Connection {
            cmd_tx,
            event_tx,
            shutdown_tx,
            closed_rx,
        }
    }

    /// Subscribe to protocol events. Subscribe *before* triggering the
    /// activity whose event you wait for, or it can slip past.
    pub(crate) fn events(&self) -> broadcast::Receiver<CdpEvent> {
        self.event_tx.subscribe()
    }

    /// Resolves once the driver has exited, so event waiters can fail fast
    /// instead of running out their deadlines.
    pub(crate) fn closed(&self) -> watch::Receiver<bool> {
        self.closed_rx.clone()
    }

    /// Send one command and await its reply.
    pub(crate) async fn command(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(PendingCommand {
                method: method.to_string(),
                params,
                session_id: session_id.map(str::to_owned),
                respond_to: tx,
            })
            .await
            .map_err(|_| EngineError::failed("devtools connection closed"))?;
        rx.await
            .map_err(|_| EngineError::failed("devtools connection closed before reply"))?
    }

    /// Tear the connection down. In-flight commands fail; idempotent.
    pub(crate) fn close(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn drive(
    mut ws: WsStream,
    mut cmd_rx: mpsc::Receiver<PendingCommand>,
    event_tx: broadcast::Sender<CdpEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
    closed_tx: watch::Sender<bool>,
) {
    let mut next_id: u64 = 1;
    let mut pending: HashMap<u64, oneshot::Sender<Result<Value, EngineError>>> = HashMap::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_cmd = cmd_rx.recv() => {
                let Some(cmd) = maybe_cmd else { break };
                let id = next_id;
                next_id += 1;

                let mut frame = serde_json::json!({
                    "id": id,
                    "method": cmd.method,
                    "params": cmd.params,
                });
                if let Some(session) = &cmd.session_id {
                    frame["sessionId"] = Value::String(session.clone());
                }

                if let Err(err) = ws.send(Message::text(frame.to_string())).await {
                    let _ = cmd
                        .respond_to
                        .send(Err(EngineError::failed(format!("devtools send failed: {err}"))));
                    break;
                }
                pending.insert(id, cmd.respond_to);
            }
            maybe_msg = ws.next() => {
                let Some(msg) = maybe_msg else { break };
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(err) => {
                        tracing::warn!(error = %err, "devtools socket error");
                        break;
                    }
                };
                let text = match msg {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let frame: Value = match serde_json::from_str(text.as_str()) {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::warn!(error = %err, "unparseable devtools frame");
                        continue;
                    }
                };
                dispatch_frame(frame, &mut pending, &event_tx);
            }
        }
    }

    // The engine is gone or shutting down; fail anything still in flight.
    let _ = closed_tx.send(true);
    for (_, respond_to) in pending.drain() {
        let _ = respond_to.send(Err(EngineError::failed("devtools connection closed")));
    }
    let _ = ws.close(None).await;
}

fn dispatch_frame(
    frame: Value,
    pending: &mut HashMap<u64, oneshot::Sender<Result<Value, EngineError>>>,
    event_tx: &broadcast::Sender<CdpEvent>,
) {
    if let Some(id) = frame.get("id").and_then(Value::as_u64) {
        let Some(respond_to) = pending.remove(&id) else {
            tracing::debug!(id, "devtools reply for unknown command id");
            return;
        };
        let outcome = if let Some(error) = frame.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown devtools error");
            Err(EngineError::failed(format!("devtools command error: {message}")))
        } else {
            Ok(frame.get("result").cloned().unwrap_or(Value::Null))
        };
        let _ = respond_to.send(outcome);
        return;
    }

    if let Some(method) = frame.get("method").and_then(Value::as_str) {
        let event = CdpEvent {
            method: method.to_string(),
            session_id: frame
                .get("sessionId")
                .and_then(Value::as_str)
                .map(str::to_owned),
            params: frame.get("params").cloned().unwrap_or(Value::Null),
        };
        // Send fails only when no surface is listening; that is fine.
        let _ = event_tx.send(event);
    }
}
