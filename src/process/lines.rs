// Line forwarding for child output.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Copies `reader` to `writer` line by line, prefixing every line.
/// Bytes are forwarded as-is; only a trailing `\r` is dropped.
/// Returns the number of forwarded lines once the reader hits EOF.
pub async fn forward_lines<R, W>(reader: R, mut writer: W, prefix: &str) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut segments = reader.split(b'\n');
    let mut count = 0;

    while let Some(mut line) = segments.next_segment().await? {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        let mut buf = Vec::with_capacity(prefix.len() + line.len() + 1);
        buf.extend_from_slice(prefix.as_bytes());
        buf.extend_from_slice(&line);
        buf.push(b'\n');
        writer.write_all(&buf).await?;
        writer.flush().await?;
        count += 1;
    }

    Ok(count)
}
