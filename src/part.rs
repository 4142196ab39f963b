use crate::constants;
use crate::content_disposition::ContentDisposition;
use crate::helpers;
use http::header::{self, HeaderMap};
use std::path::{Path, PathBuf};

/// The header block of the single part carried by an upload.
#[derive(Debug)]
pub struct PartHeaders {
    headers: HeaderMap,
    name: Option<String>,
    file_name: String,
    content_type: Option<mime::Mime>,
}

impl PartHeaders {
    /// Parses the raw bytes received up to and including `\r\n\r\n`.
    ///
    /// Anything up to the opening `--boundary` line is skipped. A block with
    /// no opening line is parsed as headers from its first byte.
    pub(crate) fn parse(raw: &[u8], boundary: &str) -> crate::Result<PartHeaders> {
        let opening = format!("{}{}{}", constants::BOUNDARY_EXT, boundary, constants::CRLF);
        let header_bytes = match memchr::memmem::find(raw, opening.as_bytes()) {
            Some(idx) => &raw[idx + opening.len()..],
            None => raw,
        };

        let mut headers = [httparse::EMPTY_HEADER; constants::MAX_HEADERS];

        let headers = match httparse::parse_headers(header_bytes, &mut headers) {
            Ok(httparse::Status::Complete((_, raw_headers))) => helpers::convert_raw_headers_to_header_map(raw_headers)?,
            Ok(httparse::Status::Partial) => return Err(crate::Error::IncompleteHeaders),
            Err(err) => return Err(crate::Error::ReadHeaderFailed(err)),
        };

        let content_disposition = ContentDisposition::parse(&headers)?;
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<mime::Mime>().ok());

        Ok(PartHeaders {
            headers,
            name: content_disposition.field_name,
            file_name: content_disposition.file_name,
            content_type,
        })
    }

    /// The form field name, if `Content-Disposition` carries one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The file name exactly as sent by the client.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The part `Content-Type` as declared by the client.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.content_type.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// The outcome of a successful decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    file_name: String,
    content_type: Option<mime::Mime>,
    content_path: PathBuf,
    size: u64,
}

impl ParseResult {
    pub(crate) fn new(file_name: String, content_type: Option<mime::Mime>, content_path: PathBuf, size: u64) -> Self {
        ParseResult {
            file_name,
            content_type,
            content_path,
            size,
        }
    }

    /// The file name as sent by the client.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The `Content-Type` the client declared for the part, if any.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.content_type.as_ref()
    }

    /// Where the part content was stored, after extension adjustment.
    pub fn content_path(&self) -> &Path {
        &self.content_path
    }

    /// Content length in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn into_content_path(self) -> PathBuf {
        self.content_path
    }
}
