//! The framing used on an ephemeral exchange connection.
//!
//! The listener side writes one header line, `Filename: <name>\n`, followed
//! by the raw file bytes. Closing the connection marks the end of the file;
//! there is no length field and no acknowledgement.

use crate::constants;
use crate::detect;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Renders the header line announcing `file_name`.
pub fn encode_header(file_name: &str) -> String {
    format!("{}{}\n", constants::TRANSFER_HEADER_PREFIX, file_name)
}

pub async fn write_header<W>(writer: &mut W, file_name: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(encode_header(file_name).as_bytes()).await
}

/// Reads the header line and returns the announced file name.
///
/// Reading stops after the first `\n`, leaving the file bytes unread in
/// `reader`. A line that does not have the expected shape yields the
/// fallback name `downloaded-file`.
pub async fn read_header<R>(reader: &mut R) -> crate::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut limited = AsyncReadExt::take(&mut *reader, constants::MAX_TRANSFER_HEADER_LEN);
    limited.read_until(b'\n', &mut line).await?;

    if line.last() != Some(&b'\n') && line.len() as u64 == constants::MAX_TRANSFER_HEADER_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "transfer header line too long").into());
    }

    Ok(parse_header(&line))
}

/// Extracts the file name from a header line, with or without its `\n`.
pub fn parse_header(line: &[u8]) -> String {
    let line = String::from_utf8_lossy(line);

    line.trim()
        .strip_prefix(constants::TRANSFER_HEADER_PREFIX)
        .and_then(detect::sanitize_file_name)
        .unwrap_or_else(|| constants::FALLBACK_FILE_NAME.to_owned())
}
