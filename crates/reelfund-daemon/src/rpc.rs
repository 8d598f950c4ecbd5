//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! JSON-RPC method calls to the appropriate command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::events::{Event, EventFilter};
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC success response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Domain errors

    /// A campaign, entry, distribution, or royalty was not found (-32020).
    pub fn not_found(detail: &str) -> Self {
        Self {
            code: -32020,
            message: "NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// A proposed split is invalid (-32021).
    pub fn invalid_split(detail: &str) -> Self {
        Self {
            code: -32021,
            message: "INVALID_SPLIT".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// A raw revenue payload failed to parse (-32022).
    pub fn malformed_payload(detail: &str) -> Self {
        Self {
            code: -32022,
            message: "MALFORMED_PAYLOAD".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// A royalty cannot be claimed by this investor right now (-32023).
    pub fn not_claimable(detail: &str) -> Self {
        Self {
            code: -32023,
            message: "NOT_CLAIMABLE".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
///
/// A connection that calls `subscribe_events` keeps receiving matching
/// events as JSON-RPC notifications, interleaved with normal
/// request/response traffic, until it disconnects.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut subscription: Option<(EventFilter, broadcast::Receiver<Event>)> = None;

    loop {
        tokio::select! {
            maybe_line = lines.next_line() => {
                let Some(line) = maybe_line? else {
                    break; // EOF
                };
                let response = match serde_json::from_str::<RpcRequest>(&line) {
                    Ok(request) if request.method == "subscribe_events" => {
                        subscribe(&state, request, &mut subscription)
                    }
                    Ok(request) => dispatch_request(state.clone(), request).await,
                    Err(_) => {
                        RpcResponse::error(serde_json::Value::Null, RpcError::parse_error())
                    }
                };
                write_line(&mut writer, &serde_json::to_string(&response)?).await?;
            }
            event = next_event(&mut subscription) => {
                match event {
                    Ok(event) => {
                        let matched = subscription
                            .as_ref()
                            .is_some_and(|(filter, _)| filter.matches(&event));
                        if matched {
                            let notification = serde_json::json!({
                                "jsonrpc": "2.0",
                                "method": "event",
                                "params": event,
                            });
                            write_line(&mut writer, &notification.to_string()).await?;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Event subscriber lagged; {skipped} events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        subscription = None;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Register an event subscription for this connection.
fn subscribe(
    state: &Arc<DaemonState>,
    request: RpcRequest,
    subscription: &mut Option<(EventFilter, broadcast::Receiver<Event>)>,
) -> RpcResponse {
    let id = request.id;
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }
    match commands::admin::subscribe_events(&request.params) {
        Ok((filter, result)) => {
            *subscription = Some((filter, state.event_bus.subscribe()));
            RpcResponse::success(id, result)
        }
        Err(err) => RpcResponse::error(id, err),
    }
}

/// Next event for a subscribed connection; pends forever when the
/// connection has no subscription.
async fn next_event(
    subscription: &mut Option<(EventFilter, broadcast::Receiver<Event>)>,
) -> std::result::Result<Event, broadcast::error::RecvError> {
    match subscription {
        Some((_, rx)) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn write_line(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    payload: &str,
) -> anyhow::Result<()> {
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Campaign commands
        "create_campaign" => commands::campaigns::create_campaign(&state, &request.params).await,
        "get_campaign" => commands::campaigns::get_campaign(&state, &request.params).await,
        "list_campaigns" => commands::campaigns::list_campaigns(&state).await,
        "fund_campaign" => commands::campaigns::fund_campaign(&state, &request.params).await,
        "record_investment" => {
            commands::campaigns::record_investment(&state, &request.params).await
        }
        "list_investments" => commands::campaigns::list_investments(&state, &request.params).await,
        "propose_split_change" => {
            commands::campaigns::propose_split_change(&state, &request.params).await
        }
        "get_split" => commands::campaigns::get_split(&state, &request.params).await,
        "get_campaign_summary" => {
            commands::campaigns::get_campaign_summary(&state, &request.params).await
        }

        // Revenue commands
        "ingest_revenue" => commands::revenue::ingest_revenue(&state, &request.params).await,
        "get_revenue_entry" => commands::revenue::get_revenue_entry(&state, &request.params).await,
        "list_revenue_entries" => {
            commands::revenue::list_revenue_entries(&state, &request.params).await
        }
        "verify_revenue" => commands::revenue::verify_revenue(&state).await,

        // Distribution commands
        "run_distribution" => {
            commands::distributions::run_distribution(&state, &request.params).await
        }
        "get_distribution" => {
            commands::distributions::get_distribution(&state, &request.params).await
        }
        "list_distributions" => {
            commands::distributions::list_distributions(&state, &request.params).await
        }

        // Royalty commands
        "get_royalty" => commands::royalties::get_royalty(&state, &request.params).await,
        "list_investor_royalties" => {
            commands::royalties::list_investor_royalties(&state, &request.params).await
        }
        "list_distribution_royalties" => {
            commands::royalties::list_distribution_royalties(&state, &request.params).await
        }
        "claim_royalty" => commands::royalties::claim_royalty(&state, &request.params).await,
        "get_claimable_balance" => {
            commands::royalties::get_claimable_balance(&state, &request.params).await
        }

        // Admin commands
        "get_status" => commands::admin::get_status(&state).await,
        "get_setting" => commands::admin::get_setting(&state, &request.params).await,
        "set_setting" => commands::admin::set_setting(&state, &request.params).await,
        "run_cycle" => commands::admin::run_cycle(&state).await,
        // subscribe_events is handled at the connection level

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
