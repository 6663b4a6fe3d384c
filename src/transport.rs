//! Newline-delimited framing in front of the MCP service. A line that is not
//! UTF-8 JSON is answered with a parse error here and never reaches the
//! service, so one bad line does not end the session.

use rmcp::model::ErrorCode;
use serde_json::{Value, json};
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
    DuplexStream,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Service-side reader and writer.
pub type ServiceIo = (DuplexStream, DuplexStream);

/// Puts `input` and `output` behind line framing. The returned handle
/// resolves once every reply has been written to `output`.
pub fn frame<R, W>(input: R, output: W) -> (ServiceIo, JoinHandle<io::Result<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (feed, service_in) = io::duplex(PIPE_CAPACITY);
    let (service_out, drain) = io::duplex(PIPE_CAPACITY);
    let (replies, outgoing) = mpsc::unbounded_channel();

    tokio::spawn(read_lines(BufReader::new(input), feed, replies.clone()));
    tokio::spawn(relay(BufReader::new(drain), replies));
    let writer = tokio::spawn(write_lines(output, outgoing));
    ((service_in, service_out), writer)
}

async fn read_lines<R, W>(
    mut input: R,
    mut service: W,
    replies: UnboundedSender<Vec<u8>>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line).await? == 0 {
            debug!("input closed");
            return Ok(());
        }
        let message = line.trim_ascii();
        if message.is_empty() {
            continue;
        }
        match check(message) {
            Ok(()) => {
                service.write_all(message).await?;
                service.write_all(b"\n").await?;
                service.flush().await?;
            }
            Err(reason) => {
                warn!(%reason, "unparseable message");
                if replies.send(parse_error(&reason)).is_err() {
                    return Ok(());
                }
            }
        }
    }
}

fn check(message: &[u8]) -> Result<(), String> {
    let text = std::str::from_utf8(message)
        .map_err(|err| format!("invalid UTF-8: {err}"))?;
    serde_json::from_str::<Value>(text)
        .map(|_| ())
        .map_err(|err| err.to_string())
}

fn parse_error(reason: &str) -> Vec<u8> {
    let reply = json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": {
            "code": ErrorCode::PARSE_ERROR.0,
            "message": format!("Parse error: {reason}")
        }
    });
    reply.to_string().into_bytes()
}

async fn relay<R: AsyncBufRead + Unpin>(
    mut service: R,
    replies: UnboundedSender<Vec<u8>>,
) -> io::Result<()> {
    let mut line = Vec::new();
    while service.read_until(b'\n', &mut line).await? > 0 {
        if replies.send(std::mem::take(&mut line)).is_err() {
            break;
        }
    }
    Ok(())
}

async fn write_lines<W: AsyncWrite + Unpin>(
    mut output: W,
    mut replies: UnboundedReceiver<Vec<u8>>,
) -> io::Result<()> {
    while let Some(mut line) = replies.recv().await {
        if !line.ends_with(b"\n") {
            line.push(b'\n');
        }
        output.write_all(&line).await?;
        output.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PING: &[u8] = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;

    #[tokio::test]
    async fn undecodable_lines_are_answered_and_skipped() {
        let mut input = b"\xff\n\n".to_vec();
        input.extend_from_slice(PING);
        input.extend_from_slice(b"\r\n{oops\n");

        let mut forwarded = Vec::new();
        let (replies, mut received) = mpsc::unbounded_channel();
        read_lines(input.as_slice(), &mut forwarded, replies)
            .await
            .unwrap();

        let mut expected = PING.to_vec();
        expected.push(b'\n');
        assert_eq!(forwarded, expected);

        let reply = received.recv().await.unwrap();
        let utf8: Value = serde_json::from_slice(&reply).unwrap();
        assert_eq!(utf8["id"], Value::Null);
        assert_eq!(utf8["error"]["code"], -32700);
        let message = utf8["error"]["message"].as_str().unwrap();
        assert!(message.contains("invalid UTF-8"));

        let reply = received.recv().await.unwrap();
        let json: Value = serde_json::from_slice(&reply).unwrap();
        assert_eq!(json["error"]["code"], -32700);
        assert!(received.recv().await.is_none());
    }

    #[tokio::test]
    async fn last_line_without_newline_is_still_read() {
        let mut forwarded = Vec::new();
        let (replies, _received) = mpsc::unbounded_channel();
        read_lines(PING, &mut forwarded, replies).await.unwrap();
        assert!(forwarded.starts_with(PING));
    }

    #[tokio::test]
    async fn replies_are_written_one_per_line() {
        let (replies, outgoing) = mpsc::unbounded_channel();
        replies.send(b"{\"id\":1}\n".to_vec()).unwrap();
        replies.send(b"{\"id\":2}".to_vec()).unwrap();
        drop(replies);

        let mut output = Vec::new();
        write_lines(&mut output, outgoing).await.unwrap();
        assert_eq!(output, b"{\"id\":1}\n{\"id\":2}\n");
    }

    #[tokio::test]
    async fn service_output_is_relayed_line_by_line() {
        let (replies, mut outgoing) = mpsc::unbounded_channel();
        relay(&b"{\"id\":1}\n{\"id\":2}\n"[..], replies).await.unwrap();
        assert_eq!(outgoing.recv().await.unwrap(), b"{\"id\":1}\n");
        assert_eq!(outgoing.recv().await.unwrap(), b"{\"id\":2}\n");
        assert!(outgoing.recv().await.is_none());
    }
}
