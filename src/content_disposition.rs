use crate::constants;
use http::header::{self, HeaderMap};

pub(crate) struct ContentDisposition {
    pub(crate) field_name: Option<String>,
    pub(crate) file_name: String,
}

impl ContentDisposition {
    /// Extracts the field name and the mandatory `filename="..."` token.
    pub fn parse(headers: &HeaderMap) -> crate::Result<ContentDisposition> {
        let content_disposition = headers.get(header::CONTENT_DISPOSITION).map(|val| val.as_bytes());

        let field_name = content_disposition
            .and_then(|val| constants::CONTENT_DISPOSITION_FIELD_NAME_RE.captures(val))
            .and_then(|cap| cap.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned());

        let cap = content_disposition
            .and_then(|val| constants::CONTENT_DISPOSITION_FILE_NAME_RE.captures(val))
            .ok_or(crate::Error::NoFileName)?;

        if cap.get(2).is_none() {
            return Err(crate::Error::MalformedFileName("missing closing quote"));
        }

        let file_name = cap.get(1).map(|m| m.as_bytes()).unwrap_or_default();
        if file_name.is_empty() {
            return Err(crate::Error::MalformedFileName("empty value"));
        }

        Ok(ContentDisposition {
            field_name,
            file_name: String::from_utf8_lossy(file_name).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers_with(value: &'static [u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_bytes(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_file_name() {
        let cd = ContentDisposition::parse(&headers_with(b"form-data; name=\"upload\"; filename=\"a b.txt\"")).unwrap();
        assert_eq!(cd.field_name.as_deref(), Some("upload"));
        assert_eq!(cd.file_name, "a b.txt");
    }

    #[test]
    fn test_parse_non_ascii_file_name() {
        let cd = ContentDisposition::parse(&headers_with("form-data; filename=\"你好.txt\"".as_bytes())).unwrap();
        assert_eq!(cd.field_name, None);
        assert_eq!(cd.file_name, "你好.txt");
    }

    #[test]
    fn test_missing_file_name() {
        let err = ContentDisposition::parse(&headers_with(b"form-data; name=\"upload\"")).err();
        assert_eq!(err, Some(crate::Error::NoFileName));

        let err = ContentDisposition::parse(&HeaderMap::new()).err();
        assert_eq!(err, Some(crate::Error::NoFileName));
    }

    #[test]
    fn test_malformed_file_name() {
        let err = ContentDisposition::parse(&headers_with(b"form-data; filename=\"a.txt")).err();
        assert_eq!(err, Some(crate::Error::MalformedFileName("missing closing quote")));

        let err = ContentDisposition::parse(&headers_with(b"form-data; filename=\"\"")).err();
        assert_eq!(err, Some(crate::Error::MalformedFileName("empty value")));
    }
}
