use http::header::{HeaderMap, HeaderName, HeaderValue};
use httparse::Header;
use std::convert::TryFrom;

pub(crate) fn convert_raw_headers_to_header_map(raw_headers: &[Header]) -> crate::Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(raw_headers.len());

    for raw_header in raw_headers {
        let name = HeaderName::try_from(raw_header.name).map_err(|err| crate::Error::DecodeHeaderName {
            name: raw_header.name.to_owned(),
            cause: err.into(),
        })?;

        let value = HeaderValue::try_from(raw_header.value).map_err(|err| crate::Error::DecodeHeaderValue {
            value: raw_header.value.to_owned(),
            cause: err.into(),
        })?;

        headers.append(name, value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;

    #[test]
    fn test_convert_raw_headers() {
        let raw = [
            Header {
                name: "Content-Disposition",
                value: b"form-data; name=\"f\"; filename=\"a.txt\"",
            },
            Header {
                name: "Content-Type",
                value: b"text/plain",
            },
        ];

        let headers = convert_raw_headers_to_header_map(&raw).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_convert_raw_headers_bad_value() {
        let raw = [Header {
            name: "Content-Type",
            value: b"text/\x7fplain",
        }];

        let err = convert_raw_headers_to_header_map(&raw).unwrap_err();
        assert!(matches!(err, crate::Error::DecodeHeaderValue { .. }));
    }
}
