//! Line-delimited JSON-RPC transports.
//!
//! One request per line in, one response per line out. Logging must never
//! write to stdout while the stdio transport is active.

use super::router::MessageRouter;
use crate::config::{ServerConfig, TransportKind};
use crate::error::ApiError;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Serve requests from `reader` until EOF, writing responses to `writer`.
///
/// Returns the number of requests answered.
pub async fn serve_lines<R, W>(
    router: Arc<MessageRouter>,
    reader: R,
    mut writer: W,
) -> Result<usize, ApiError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = router.route_raw(line).await;
        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;
        answered += 1;
    }

    debug!(answered, "Transport reached end of input");
    Ok(answered)
}

/// Serve over the process's stdin/stdout
pub async fn serve_stdio(router: Arc<MessageRouter>) -> Result<usize, ApiError> {
    info!("Serving JSON-RPC over stdio");
    serve_lines(
        router,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Accept TCP connections forever, one task per connection
pub async fn serve_tcp(router: Arc<MessageRouter>, addr: &str) -> Result<usize, ApiError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::Transport(format!("Failed to bind {}: {}", addr, e)))?;
    info!(addr, "Serving JSON-RPC over tcp");

    loop {
        let (stream, peer) = listener.accept().await?;
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            debug!(%peer, "Connection opened");
            let (read_half, write_half) = stream.into_split();
            match serve_lines(router, BufReader::new(read_half), write_half).await {
                Ok(answered) => debug!(%peer, answered, "Connection closed"),
                Err(e) => warn!(%peer, error = %e, "Connection failed"),
            }
        });
    }
}

/// Serve using the configured transport
pub async fn serve(router: Arc<MessageRouter>, config: &ServerConfig) -> Result<usize, ApiError> {
    match config.transport {
        TransportKind::Stdio => serve_stdio(router).await,
        TransportKind::Tcp => serve_tcp(router, &config.bind_addr()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{codes, JsonRpcResponse};
    use serde_json::json;

    #[tokio::test]
    async fn test_serve_lines_answers_every_request() {
        let router = Arc::new(MessageRouter::new());
        router.route("echo", |params| async move { Ok(params) });

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"echo","params":{"a":1}}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"nope"}"#,
            "\n",
            "garbage\n",
        );
        let mut output = Vec::new();
        let answered = serve_lines(router, input.as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(answered, 3);

        let responses: Vec<JsonRpcResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses[0].result, Some(json!({"a": 1})));
        assert_eq!(responses[1].id, json!(2));
        assert_eq!(responses[1].error_code(), Some(codes::METHOD_NOT_FOUND));
        assert_eq!(responses[2].error_code(), Some(codes::PARSE_ERROR));
    }

    #[tokio::test]
    async fn test_serve_tcp_round_trip() {
        let router = Arc::new(MessageRouter::new());
        router.route("ping", |_| async move { Ok(json!("pong")) });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let server = tokio::spawn({
            let router = Arc::clone(&router);
            let addr = addr.clone();
            async move { serve_tcp(router, &addr).await }
        });

        let mut stream = None;
        for _ in 0..50 {
            match tokio::net::TcpStream::connect(&addr).await {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
            }
        }
        let stream = stream.expect("server did not start");
        let (read_half, mut write_half) = stream.into_split();
        write_half
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .await
            .unwrap();

        let mut lines = BufReader::new(read_half).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let response: JsonRpcResponse = serde_json::from_str(&line).unwrap();
        assert_eq!(response.result, Some(json!("pong")));

        server.abort();
    }
}
