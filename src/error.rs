use std::fmt::{self, Debug, Display, Formatter};

use derive_more::Display;
use http::StatusCode;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while decoding an upload, exchanging a file
/// or relaying it back out.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// The `Content-Type` header is not `multipart/form-data`.
    #[display(fmt = "Content-Type is not multipart/form-data")]
    NoMultipart,

    /// Failed to convert the `Content-Type` to [`mime::Mime`] type.
    #[display(fmt = "Failed to convert Content-Type to `mime::Mime` type: {}", _0)]
    DecodeContentType(mime::FromStrError),

    /// No boundary found in `Content-Type` header.
    #[display(fmt = "multipart boundary not found in Content-Type")]
    NoBoundary,

    /// Couldn't read the part headers completely.
    #[display(fmt = "failed to read part complete headers")]
    IncompleteHeaders,

    /// Failed to read headers.
    #[display(fmt = "failed to read headers: {}", _0)]
    ReadHeaderFailed(httparse::Error),

    /// Failed to decode the part's raw header name to
    /// [`HeaderName`](http::header::HeaderName) type.
    #[display(fmt = "failed to decode part's raw header name: {:?} {}", name, cause)]
    DecodeHeaderName { name: String, cause: BoxError },

    /// Failed to decode the part's raw header value to
    /// [`HeaderValue`](http::header::HeaderValue) type.
    #[display(fmt = "failed to decode part's raw header value: {}", cause)]
    DecodeHeaderValue { value: Vec<u8>, cause: BoxError },

    /// The part headers grew past the limit before `\r\n\r\n` was seen.
    #[display(fmt = "part headers exceeded the maximum size limit: {} bytes", limit)]
    HeadersSizeExceeded { limit: usize },

    /// The part has no `filename="..."` token.
    #[display(fmt = "no filename found in part headers")]
    NoFileName,

    /// The `filename` token is present but unusable.
    #[display(fmt = "malformed filename in part headers: {}", _0)]
    MalformedFileName(&'static str),

    /// The part content grew past the limit.
    #[display(fmt = "part content exceeded the maximum size limit: {} bytes", limit)]
    ContentSizeExceeded { limit: u64 },

    /// The stream ended before the closing boundary.
    #[display(fmt = "incomplete multipart stream")]
    IncompleteStream,

    /// Stream read failed.
    #[display(fmt = "stream read failed: {}", _0)]
    StreamReadFailed(BoxError),

    /// The download code in the request path is not a number in port range,
    /// so no file can be offered under it.
    #[display(fmt = "invalid exchange code: {:?}", _0)]
    InvalidCode(String),

    /// No free code was found within the attempt bound.
    #[display(fmt = "no free exchange code found after {} attempts", attempts)]
    CodesExhausted { attempts: usize },

    /// The code has no registered file, or its listener was already consumed.
    #[display(fmt = "no file is offered under code {}", _0)]
    UnknownCode(u16),

    /// The one-shot listener could not bind its port.
    #[display(fmt = "failed to bind exchange port {}: {}", code, cause)]
    BindFailed { code: u16, cause: std::io::Error },

    /// The relay could not reach the one-shot listener.
    #[display(fmt = "failed to connect to exchange port {}: {}", code, cause)]
    ConnectFailed { code: u16, cause: std::io::Error },

    /// Unexpected I/O failure on a local file or socket.
    #[display(fmt = "i/o failure: {}", _0)]
    Io(std::io::Error),

    /// Failed to lock the registry for any changes.
    #[display(fmt = "failed to lock exchange registry: {}", _0)]
    LockFailure(BoxError),

    /// A configuration value could not be parsed.
    #[display(fmt = "invalid value for {}: {:?}", key, value)]
    InvalidConfig { key: &'static str, value: String },
}

/// Broad classes of [`Error`], each answering with one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad multipart structure or a bad request parameter.
    MalformedInput,
    /// No free exchange code.
    ResourceExhausted,
    /// Download for a code that was never issued or is already used.
    UnknownCode,
    /// Socket failure around the ephemeral exchange.
    Transport,
    /// Anything else that went wrong locally.
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::MalformedInput => StatusCode::BAD_REQUEST,
            ErrorKind::ResourceExhausted
            | ErrorKind::UnknownCode
            | ErrorKind::Transport
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Error {
    /// Returns the class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoMultipart
            | Error::DecodeContentType(_)
            | Error::NoBoundary
            | Error::IncompleteHeaders
            | Error::ReadHeaderFailed(_)
            | Error::DecodeHeaderName { .. }
            | Error::DecodeHeaderValue { .. }
            | Error::HeadersSizeExceeded { .. }
            | Error::NoFileName
            | Error::MalformedFileName(_)
            | Error::ContentSizeExceeded { .. }
            | Error::IncompleteStream => ErrorKind::MalformedInput,
            Error::CodesExhausted { .. } => ErrorKind::ResourceExhausted,
            Error::UnknownCode(_) | Error::InvalidCode(_) => ErrorKind::UnknownCode,
            Error::BindFailed { .. } | Error::ConnectFailed { .. } | Error::StreamReadFailed(_) => {
                ErrorKind::Transport
            }
            Error::Io(_) | Error::LockFailure(_) | Error::InvalidConfig { .. } => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind().status_code()`.
    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::BindFailed { cause, .. } | Error::ConnectFailed { cause, .. } => Some(cause),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}
