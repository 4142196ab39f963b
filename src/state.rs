/// Where a [`MultipartDecoder`](crate::MultipartDecoder) is within its single
/// part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    ReadingHeaders,
    ReadingContent,
    /// A `--boundary` delimiter ended the part.
    FoundBoundary,
    /// The closing `--boundary--` delimiter ended the part.
    Done,
}

impl DecodeState {
    /// Returns `true` once the part content has been delimited.
    pub fn is_finished(self) -> bool {
        matches!(self, DecodeState::FoundBoundary | DecodeState::Done)
    }
}
