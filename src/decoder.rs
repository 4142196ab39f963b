use crate::buffer::PatternRingBuffer;
use crate::constants;
use crate::detect;
use crate::part::{PartHeaders, ParseResult};
use crate::size_limit::SizeLimit;
use crate::state::DecodeState;
use bytes::{BufMut, Bytes, BytesMut};
use futures_util::stream::{Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;

/// What a call to [`MultipartDecoder::feed`] achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The part is not delimited yet; feed more input.
    NeedMore,
    /// The part content is complete. The last `trailing` bytes emitted so far
    /// belong to the delimiter and must be cut from the content.
    Delimited { trailing: u64 },
}

/// A streaming decoder for a `multipart/form-data` body carrying exactly one
/// file part.
///
/// Input is examined one byte at a time. A small ring of the latest bytes is
/// tested for the header terminator and the boundary delimiters, so memory
/// use stays bounded by the read size plus the delimiter length however the
/// body is chunked and however large the file is.
///
/// # Examples
///
/// ```
/// use portdrop::MultipartDecoder;
/// use bytes::Bytes;
/// use std::convert::Infallible;
/// use futures_util::stream::once;
///
/// # async fn run() {
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(data)) });
/// let dir = tempfile::tempdir().unwrap();
///
/// let result = MultipartDecoder::new("X-BOUNDARY").decode(stream, dir.path()).await.unwrap();
/// assert_eq!(result.file_name(), "a.txt");
/// assert_eq!(result.size(), 4);
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
pub struct MultipartDecoder {
    boundary: String,
    delimiter: Vec<u8>,
    close_delimiter: Vec<u8>,
    limits: SizeLimit,
    state: DecodeState,
    ring: PatternRingBuffer,
    header_buf: BytesMut,
    part: Option<PartHeaders>,
    file_name: Option<String>,
    written: u64,
    content_len: Option<u64>,
}

impl MultipartDecoder {
    /// Construct a new decoder for the given boundary with default size limits.
    pub fn new<B: Into<String>>(boundary: B) -> MultipartDecoder {
        MultipartDecoder::with_limits(boundary, SizeLimit::default())
    }

    /// Construct a new decoder for the given boundary and size limits.
    pub fn with_limits<B: Into<String>>(boundary: B, limits: SizeLimit) -> MultipartDecoder {
        let boundary = boundary.into();
        let delimiter = format!("{}{}{}", constants::CRLF, constants::BOUNDARY_EXT, boundary).into_bytes();
        let close_delimiter = format!(
            "{}{}{}{}",
            constants::CRLF,
            constants::BOUNDARY_EXT,
            boundary,
            constants::BOUNDARY_EXT
        )
        .into_bytes();
        let ring = PatternRingBuffer::for_patterns(&[delimiter.as_slice(), close_delimiter.as_slice()]);

        MultipartDecoder {
            boundary,
            delimiter,
            close_delimiter,
            limits,
            state: DecodeState::ReadingHeaders,
            ring,
            header_buf: BytesMut::new(),
            part: None,
            file_name: None,
            written: 0,
            content_len: None,
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// The part headers, once they have been read.
    pub fn part_headers(&self) -> Option<&PartHeaders> {
        self.part.as_ref()
    }

    /// The content length, once the part has been delimited.
    pub fn content_len(&self) -> Option<u64> {
        self.content_len
    }

    /// Advances the state machine over `chunk`, appending content bytes to
    /// `out`.
    ///
    /// Bytes that may start a delimiter are emitted before the match is
    /// known; [`Progress::Delimited`] reports how many of them to cut. Input
    /// after the delimiter is ignored.
    pub fn feed(&mut self, chunk: &[u8], out: &mut BytesMut) -> crate::Result<Progress> {
        if self.state.is_finished() {
            return Ok(Progress::NeedMore);
        }

        // Up to this many emitted bytes may still turn out to be delimiter.
        let pending = (self.delimiter.len() - 1) as u64;

        for &byte in chunk {
            match self.state {
                DecodeState::ReadingHeaders => {
                    self.ring.push(byte);
                    self.read_header_byte(byte)?;
                }
                DecodeState::ReadingContent => {
                    self.ring.push(byte);

                    // Byte by byte, `\r\n--B` completes before `\r\n--B--`, so this
                    // branch is only a guard and a well-formed body ends in
                    // `FoundBoundary`.
                    if self.ring.ends_with(&self.close_delimiter) {
                        return Ok(self.delimit(DecodeState::Done));
                    } else if self.ring.ends_with(&self.delimiter) {
                        return Ok(self.delimit(DecodeState::FoundBoundary));
                    }

                    out.put_u8(byte);
                    self.written += 1;

                    if self.written > self.limits.content.saturating_add(pending) {
                        return Err(crate::Error::ContentSizeExceeded {
                            limit: self.limits.content,
                        });
                    }
                }
                DecodeState::FoundBoundary | DecodeState::Done => break,
            }
        }

        Ok(Progress::NeedMore)
    }

    fn read_header_byte(&mut self, byte: u8) -> crate::Result<()> {
        self.header_buf.put_u8(byte);

        if self.ring.ends_with(constants::CRLF_CRLF.as_bytes()) {
            let part = PartHeaders::parse(&self.header_buf, &self.boundary)?;
            let file_name = detect::sanitize_file_name(part.file_name())
                .ok_or(crate::Error::MalformedFileName("no usable file name"))?;

            log::debug!("part headers read, file name: {:?}", file_name);

            self.file_name = Some(file_name);
            self.part = Some(part);
            self.header_buf = BytesMut::new();
            self.ring.clear();
            self.state = DecodeState::ReadingContent;
        } else if self.header_buf.len() > self.limits.headers {
            return Err(crate::Error::HeadersSizeExceeded {
                limit: self.limits.headers,
            });
        }

        Ok(())
    }

    // The byte completing the match is never emitted, the rest of the
    // delimiter already is.
    fn delimit(&mut self, state: DecodeState) -> Progress {
        let matched = match state {
            DecodeState::Done => self.close_delimiter.len(),
            _ => self.delimiter.len(),
        };
        let trailing = (matched - 1) as u64;

        self.state = state;
        self.content_len = Some(self.written.saturating_sub(trailing));

        Progress::Delimited { trailing }
    }

    /// Decodes the body `stream` and stores the part content under `sink_dir`.
    ///
    /// The content is first written to a temporary file in `sink_dir`, which
    /// is removed on any failure. On success it is moved to a fresh
    /// sub-directory, named after the uploaded file with its extension
    /// adjusted to the sniffed content type.
    pub async fn decode<S, O, E, P>(mut self, stream: S, sink_dir: P) -> crate::Result<ParseResult>
    where
        S: Stream<Item = Result<O, E>>,
        O: Into<Bytes>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        P: AsRef<Path>,
    {
        let sink_dir = sink_dir.as_ref();
        let temp = tempfile::Builder::new()
            .prefix("upload_")
            .suffix(".tmp")
            .tempfile_in(sink_dir)?;

        log::debug!("decoding upload into {}", temp.path().display());

        let mut sink = File::from_std(temp.as_file().try_clone()?);
        let content_len = self.write_content(stream, &mut sink).await?;
        drop(sink);

        let file_name = self.file_name.take().ok_or(crate::Error::IncompleteHeaders)?;
        let content_type = self.part.take().and_then(|part| part.content_type().cloned());
        let content_path = store(temp, sink_dir.to_path_buf(), file_name.clone()).await?;

        log::info!(
            "stored upload {:?} ({} bytes) at {}",
            file_name,
            content_len,
            content_path.display()
        );

        Ok(ParseResult::new(file_name, content_type, content_path, content_len))
    }

    /// Decodes a body read from `reader` in 8 KiB chunks.
    ///
    /// See [`decode`](MultipartDecoder::decode).
    pub async fn decode_reader<R, P>(self, reader: R, sink_dir: P) -> crate::Result<ParseResult>
    where
        R: AsyncRead,
        P: AsRef<Path>,
    {
        let stream = ReaderStream::with_capacity(reader, constants::CHUNK_SIZE);
        self.decode(stream, sink_dir).await
    }

    async fn write_content<S, O, E>(&mut self, stream: S, sink: &mut File) -> crate::Result<u64>
    where
        S: Stream<Item = Result<O, E>>,
        O: Into<Bytes>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        futures_util::pin_mut!(stream);
        let mut out = BytesMut::with_capacity(constants::CHUNK_SIZE);

        while let Some(data) = stream.next().await {
            let data: Bytes = data.map_err(|err| crate::Error::StreamReadFailed(err.into()))?.into();

            for chunk in data.chunks(constants::CHUNK_SIZE) {
                let progress = self.feed(chunk, &mut out)?;

                sink.write_all(&out).await?;
                out.clear();

                if let Progress::Delimited { trailing } = progress {
                    sink.flush().await?;
                    let content_len = self.written - trailing;
                    sink.set_len(content_len).await?;
                    return Ok(content_len);
                }
            }
        }

        log::debug!("upload stream ended in state {:?}", self.state);
        Err(crate::Error::IncompleteStream)
    }
}

async fn store(temp: NamedTempFile, sink_dir: PathBuf, file_name: String) -> crate::Result<PathBuf> {
    let stored = tokio::task::spawn_blocking(move || -> io::Result<PathBuf> {
        let detected = detect::detect_extension(temp.path())?;
        let dir = sink_dir.join(format!("share_{:016x}", rand::random::<u64>()));
        std::fs::create_dir(&dir)?;

        let content_path = dir.join(detect::adjust_extension(&file_name, detected));
        if let Err(err) = temp.persist(&content_path) {
            let _ = std::fs::remove_dir(&dir);
            return Err(err.error);
        }

        Ok(content_path)
    })
    .await
    .map_err(|err| io::Error::new(io::ErrorKind::Other, err))??;

    Ok(stored)
}
