use crate::constants;

/// Size caps applied while decoding an upload, to keep a hostile or broken
/// client from running the server out of memory or disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimit {
    pub(crate) headers: usize,
    pub(crate) content: u64,
}

impl SizeLimit {
    /// Creates the default limits: 16 KiB of part headers and 100 MiB of
    /// part content.
    pub fn new() -> SizeLimit {
        SizeLimit::default()
    }

    /// Sets the size limit for the part header block, opening boundary
    /// included.
    pub fn headers(mut self, limit: usize) -> SizeLimit {
        self.headers = limit;
        self
    }

    /// Sets the size limit for the part content as written to disk.
    pub fn content(mut self, limit: u64) -> SizeLimit {
        self.content = limit;
        self
    }

    pub fn headers_limit(&self) -> usize {
        self.headers
    }

    pub fn content_limit(&self) -> u64 {
        self.content
    }
}

impl Default for SizeLimit {
    fn default() -> Self {
        SizeLimit {
            headers: constants::DEFAULT_HEADERS_SIZE_LIMIT,
            content: constants::DEFAULT_CONTENT_SIZE_LIMIT,
        }
    }
}
