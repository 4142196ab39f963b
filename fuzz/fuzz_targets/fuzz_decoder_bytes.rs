#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use portdrop::{MultipartDecoder, Progress, SizeLimit};

fuzz_target!(|data: &[u8]| {
    let (split, body) = match data.split_first() {
        Some((split, body)) => (*split as usize, body),
        None => return,
    };

    let mut decoder = MultipartDecoder::with_limits("X-BOUNDARY", SizeLimit::new().headers(4096).content(1 << 20));
    let mut out = BytesMut::new();

    for chunk in body.chunks(split.max(1)) {
        match decoder.feed(chunk, &mut out) {
            Ok(Progress::NeedMore) => assert_eq!(decoder.content_len(), None),
            Ok(Progress::Delimited { trailing }) => {
                let len = out.len() as u64;
                assert!(trailing <= len);
                assert_eq!(decoder.content_len(), Some(len - trailing));
                break;
            }
            Err(_) => break,
        }
    }
});
