use lazy_static::lazy_static;
use regex::bytes::Regex;

pub(crate) const CHUNK_SIZE: usize = 8 * 1024;

pub(crate) const DEFAULT_HEADERS_SIZE_LIMIT: usize = 16 * 1024;
pub(crate) const DEFAULT_CONTENT_SIZE_LIMIT: u64 = 100 * 1024 * 1024;

pub(crate) const MAX_HEADERS: usize = 32;
pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CRLF: &str = "\r\n";
pub(crate) const CRLF_CRLF: &str = "\r\n\r\n";

pub(crate) const DYNAMIC_PORT_START: u16 = 49152;
pub(crate) const DYNAMIC_PORT_END: u16 = 65535;
pub(crate) const MAX_CODE_ATTEMPTS: usize = 10_000;

pub(crate) const TRANSFER_HEADER_PREFIX: &str = "Filename: ";
pub(crate) const MAX_TRANSFER_HEADER_LEN: u64 = 4 * 1024;
pub(crate) const FALLBACK_FILE_NAME: &str = "downloaded-file";

lazy_static! {
    pub(crate) static ref CONTENT_DISPOSITION_FIELD_NAME_RE: Regex = Regex::new(r#"(?-u)\bname="([^"]*)""#).unwrap();
    pub(crate) static ref CONTENT_DISPOSITION_FILE_NAME_RE: Regex = Regex::new(r#"(?-u)\bfilename="([^"]*)(")?"#).unwrap();
}
