use crate::constants;
use crate::exchange;
use crate::transfer;
use std::io::SeekFrom;
use std::net::IpAddr;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio_util::io::ReaderStream;

/// A file fully received from an exchange listener, ready to be relayed.
///
/// The bytes are spooled to an anonymous temporary file, which the OS removes
/// once the last handle to it is dropped, whether or not the relay finished.
#[derive(Debug)]
pub struct Download {
    file_name: String,
    len: u64,
    file: File,
}

impl Download {
    /// The file name announced by the listener.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Length of the received content in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `Content-Disposition` value offering the file as an attachment.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name.replace('"', "_"))
    }

    /// Streams the content in 8 KiB chunks from the start.
    pub fn into_stream(self) -> ReaderStream<File> {
        ReaderStream::with_capacity(self.file, constants::CHUNK_SIZE)
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

/// Connects to the exchange listener for `code` on `host` and receives the
/// file it offers.
pub async fn fetch(host: IpAddr, code: u16) -> crate::Result<Download> {
    let stream = exchange::connect(host, code).await?;
    let mut reader = BufReader::new(stream);

    let file_name = transfer::read_header(&mut reader).await?;
    log::debug!("receiving {:?} from port {}", file_name, code);

    let mut file = File::from_std(tempfile::tempfile()?);
    let len = tokio::io::copy_buf(&mut reader, &mut file).await?;
    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;

    log::info!("received {:?} ({} bytes) from port {}", file_name, len, code);

    Ok(Download { file_name, len, file })
}
