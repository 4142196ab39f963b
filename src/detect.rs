//! Content sniffing and the naming of stored uploads.

use std::io;
use std::path::Path;

/// Sniffs the file's leading bytes and returns the usual extension for the
/// detected type, without the leading dot.
///
/// `None` means the content was not recognized, plain text included.
pub fn detect_extension<P: AsRef<Path>>(path: P) -> io::Result<Option<&'static str>> {
    Ok(infer::get_from_path(path)?.map(|kind| kind.extension()))
}

/// Gives `file_name` the `detected` extension when it carries a different one.
pub fn adjust_extension(file_name: &str, detected: Option<&str>) -> String {
    let detected = match detected {
        Some(ext) => ext,
        None => return file_name.to_owned(),
    };

    let stem = match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(idx) => {
            if file_name[idx + 1..].eq_ignore_ascii_case(detected) {
                return file_name.to_owned();
            }
            &file_name[..idx]
        }
    };

    format!("{}.{}", stem, detected)
}

/// Reduces a client-supplied name to a bare file name.
///
/// Directory components from either separator style are dropped. Returns
/// `None` when nothing usable is left.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(raw).trim();

    if name.is_empty() || name == "." || name == ".." || name.chars().any(char::is_control) {
        return None;
    }

    Some(name.to_owned())
}
