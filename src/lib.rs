//! Share a file through a numeric code.
//!
//! A client uploads one file as `multipart/form-data`. The body is decoded as
//! it streams in and the file is stored on disk; the caller then gets back a
//! random code in the dynamic port range. A one-shot TCP listener on the port
//! equal to that code hands the file, prefixed by a `Filename: <name>\n`
//! line, to the first peer that connects. A download request for the code
//! connects to that listener and relays the bytes back as an attachment.
//!
//! The pieces can be used on their own:
//!
//! - [`MultipartDecoder`] turns a body stream into a stored file,
//! - [`Registry`] hands out codes,
//! - [`Exchange`] serves a registered file once,
//! - [`fetch`] receives it,
//!
//! and, with the `server` feature (on by default), [`Service`] and [`run`]
//! put them behind HTTP.
//!
//! # Examples
//!
//! ```
//! use portdrop::{fetch, Exchange, MultipartDecoder, Registry};
//! use bytes::Bytes;
//! use futures_util::stream::once;
//! use std::convert::Infallible;
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let body = "--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nhello\r\n--XYZ--\r\n";
//! let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(body)) });
//! let dir = tempfile::tempdir().unwrap();
//!
//! let stored = MultipartDecoder::new("XYZ").decode(stream, dir.path()).await.unwrap();
//!
//! let registry = Arc::new(Registry::default());
//! let code = registry.register(stored.into_content_path()).unwrap();
//!
//! let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
//! let exchange = Exchange::new(Arc::clone(&registry), localhost, None);
//! exchange.start(code).await.unwrap();
//!
//! let download = fetch(localhost, code).await.unwrap();
//! assert_eq!(download.file_name(), "a.txt");
//! assert_eq!(download.len(), 5);
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(run());
//! ```

pub use buffer::PatternRingBuffer;
pub use config::Config;
pub use decoder::{MultipartDecoder, Progress};
pub use error::{Error, ErrorKind};
pub use exchange::{send_file, Exchange};
pub use part::{ParseResult, PartHeaders};
pub use registry::{CodeRange, Registry};
pub use relay::{fetch, Download};
#[cfg(feature = "server")]
pub use server::{run, ResponseBody, Service};
pub use size_limit::SizeLimit;
pub use state::DecodeState;

mod buffer;
mod config;
mod constants;
mod content_disposition;
mod decoder;
pub mod detect;
mod error;
mod exchange;
mod helpers;
mod part;
mod registry;
mod relay;
#[cfg(feature = "server")]
mod server;
mod size_limit;
mod state;
pub mod transfer;

/// A Result type often returned from methods that can have `portdrop` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses the `Content-Type` header to extract the boundary value.
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> crate::Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(crate::Error::DecodeContentType)?;

    if !(m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA) {
        return Err(crate::Error::NoMultipart);
    }

    m.get_param(mime::BOUNDARY)
        .map(|name| name.as_str().to_owned())
        .filter(|boundary| !boundary.is_empty())
        .ok_or(crate::Error::NoBoundary)
}
