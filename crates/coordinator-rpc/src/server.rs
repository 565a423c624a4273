//! RPC inbound listener: accepts connections, reads one `Route` request per
//! line, dispatches to a [`RouteHandler`], and writes the response back.
//!
//! Independently bound from the HTTP listener (§4.H) — the two protocols
//! share only the application layer (`RoutingEngine`/`Dispatcher`) via this
//! trait, never the transport.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::protocol::{RouteParams, RouteResult, RpcRequest, RpcResponse};

#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle_route(&self, params: RouteParams) -> Result<RouteResult, coordinator_core::CoordinatorError>;
}

pub async fn serve(addr: &str, handler: Arc<dyn RouteHandler>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "rpc listener bound");

    loop {
        let (socket, peer) = listener.accept().await?;
        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, handler).await {
                debug!(%peer, error = %e, "rpc connection ended");
            }
        });
    }
}

async fn handle_connection(
    socket: tokio::net::TcpStream,
    handler: Arc<dyn RouteHandler>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(());
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(RpcRequest::Route { id, params }) => match handler.handle_route(params).await {
                Ok(result) => RpcResponse::RouteResult { id, result },
                Err(e) => RpcResponse::error(id, e.error_code(), e.to_string()),
            },
            Ok(RpcRequest::Process { id, .. }) => {
                RpcResponse::error(id, "UNSUPPORTED_METHOD", "this listener only serves route requests")
            }
            Err(e) => {
                warn!(error = %e, "failed to parse rpc request");
                RpcResponse::error("unknown", "ENVELOPE_MALFORMED", e.to_string())
            }
        };

        let mut out = serde_json::to_string(&response).expect("RpcResponse always serializes");
        out.push('\n');
        write_half.write_all(out.as_bytes()).await?;
        write_half.flush().await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::io::AsyncReadExt;

    struct EchoHandler;

    #[async_trait]
    impl RouteHandler for EchoHandler {
        async fn handle_route(&self, params: RouteParams) -> Result<RouteResult, coordinator_core::CoordinatorError> {
            Ok(RouteResult {
                target_services: vec!["svc-a".to_string()],
                normalized_fields: HashMap::new(),
                envelope_json: format!("{{\"query\":\"{}\"}}", params.query_text),
                routing_metadata_json: "{}".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn serves_route_requests() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let handler: Arc<dyn RouteHandler> = Arc::new(EchoHandler);
        let addr_string = addr.to_string();
        tokio::spawn(async move {
            let _ = serve(&addr_string, handler).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = RpcRequest::Route {
            id: "1".into(),
            params: RouteParams {
                tenant_id: "t".into(),
                user_id: "u".into(),
                query_text: "hello".into(),
                metadata: HashMap::new(),
            },
        };
        let mut line = serde_json::to_string(&request).unwrap();
        line.push('\n');
        stream.write_all(line.as_bytes()).await.unwrap();

        let mut buf = vec![0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        let response: RpcResponse = serde_json::from_slice(&buf[..n - 1]).unwrap();
        match response {
            RpcResponse::RouteResult { result, .. } => assert_eq!(result.target_services, vec!["svc-a"]),
            _ => panic!("expected route_result"),
        }
    }
}
