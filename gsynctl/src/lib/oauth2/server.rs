//! Just enough HTTP/1.1 to receive the OAuth2 redirection on the loopback interface

use std::str;

use anyhow::Context;
use chrono::Utc;
use http::{Method, Uri};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};

/// Reads the head of a request and returns its method and URI.
/// Headers are read and discarded. Bodies are not expected.
pub async fn read_request<R>(reader: R) -> anyhow::Result<(Method, Uri)>
where
    R: io::AsyncBufRead,
{
    tokio::pin!(reader);

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    if line.is_empty() {
        anyhow::bail!("Empty HTTP request");
    }
    let command = parse_command(&line)?;

    loop {
        let mut header = String::new();
        let sz = reader.read_line(&mut header).await?;
        if sz == 0 || header.trim_end().is_empty() {
            break;
        }
    }
    Ok(command)
}

pub(super) fn parse_command(line: &str) -> anyhow::Result<(Method, Uri)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut parts = line.split(' ');

    let method = parts
        .next()
        .filter(|m| !m.is_empty())
        .with_context(|| format!("no method in HTTP header {line}"))?;
    let method = Method::from_bytes(method.as_bytes())
        .with_context(|| format!("Unrecognized method: {method}"))?;

    let uri = parts
        .next()
        .with_context(|| format!("no path in HTTP header {line}"))?;
    let uri: Uri = uri.parse()?;

    let protocol = parts
        .next()
        .with_context(|| format!("no protocol in HTTP header {line}"))?;
    if protocol != "HTTP/1.1" {
        anyhow::bail!("unsupported HTTP protocol in header {line}");
    }
    Ok((method, uri))
}

pub async fn write_response<W, B>(resp: http::Response<B>, writer: W) -> anyhow::Result<()>
where
    W: io::AsyncWrite,
    B: AsRef<[u8]>,
{
    let (parts, body) = resp.into_parts();
    let body = body.as_ref();

    tokio::pin!(writer);
    let mut head = format!("{:?} {}\r\n", parts.version, parts.status);
    if !parts.headers.contains_key(http::header::DATE) {
        head.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));
    }
    if !parts.headers.contains_key(http::header::CONTENT_LENGTH) {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    for (name, value) in parts.headers.iter() {
        head.push_str(&format!("{name}: {}\r\n", value.to_str()?));
    }
    head.push_str("\r\n");

    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}
