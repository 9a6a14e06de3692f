//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! Stdout is exclusively reserved for the protocol; all diagnostic output
//! (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use super::protocol::{INTERNAL_ERROR, JsonRpcResponse, PARSE_ERROR};
use super::server::McpServer;
use crate::error::{EventKitError, Result};

/// Serve MCP on the process's stdin/stdout until stdin closes.
pub async fn run_stdio_server(server: Arc<McpServer>) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = BufWriter::new(tokio::io::stdout());
    serve(server, reader, writer).await
}

/// Serve MCP over any line reader and writer until the reader hits EOF.
///
/// Requests are handled one at a time. Each is dispatched on the blocking
/// thread pool, since tool calls wait on the store lock and on native
/// callbacks.
pub async fn serve<R, W>(server: Arc<McpServer>, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let bytes_read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| EventKitError::Protocol(format!("failed to read from stdin: {e}")))?;

        // EOF
        if bytes_read == 0 {
            tracing::info!("stdin closed (EOF); shutting down MCP server");
            break;
        }

        let line = match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, bytes = bytes_read, "non-UTF-8 line on stdin");
                let response = JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                );
                if let Ok(json) = serde_json::to_string(&response) {
                    write_line(&mut writer, &json).await?;
                }
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let handler = Arc::clone(&server);
        let request = line.clone();
        let reply = match tokio::task::spawn_blocking(move || handler.handle_line(&request)).await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "request handler panicked");
                let response = JsonRpcResponse::error(
                    request_id(&line),
                    INTERNAL_ERROR,
                    format!("Internal error: {e}"),
                );
                serde_json::to_string(&response).ok()
            }
        };

        if let Some(json) = reply {
            write_line(&mut writer, &json).await?;
        }
    }

    Ok(())
}

fn request_id(line: &str) -> Value {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .unwrap_or(Value::Null)
}

/// Write a single JSON line to the writer and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| EventKitError::Protocol(format!("failed to write to stdout: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| EventKitError::Protocol(format!("failed to write newline to stdout: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| EventKitError::Protocol(format!("failed to flush stdout: {e}")))?;
    Ok(())
}
