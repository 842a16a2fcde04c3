//! services/client/src/session/multipart.rs
//!
//! Hand-built `multipart/form-data` body for file submissions.

use bytes::{BufMut, Bytes, BytesMut};

pub const BOUNDARY: &str = "----BiroFormBoundaryq8ZdXv3oTc1LkR7w";

const CRLF: &[u8] = b"\r\n";

/// The `Content-Type` header value matching [`submission_body`].
pub fn content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Builds the three-part submission body: an empty `submissionName`, a
/// `postDeadlineConfirmed` flag set to `false`, and the file itself.
pub fn submission_body(filename: &str, content: &[u8]) -> Bytes {
    let mut body = BytesMut::with_capacity(content.len() + 512);

    put_part_header(&mut body, "Content-Disposition: form-data; name=\"submissionName\"");
    body.put_slice(CRLF);
    body.put_slice(CRLF);

    put_part_header(
        &mut body,
        "Content-Disposition: form-data; name=\"postDeadlineConfirmed\"",
    );
    body.put_slice(CRLF);
    body.put_slice(b"false");
    body.put_slice(CRLF);

    put_part_header(
        &mut body,
        &format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"",
            escape_filename(filename)
        ),
    );
    put_line(&mut body, "Content-Type: application/octet-stream");
    body.put_slice(CRLF);
    body.put_slice(content);
    body.put_slice(CRLF);

    put_line(&mut body, &format!("--{BOUNDARY}--"));
    body.freeze()
}

fn put_part_header(body: &mut BytesMut, disposition: &str) {
    put_line(body, &format!("--{BOUNDARY}"));
    put_line(body, disposition);
}

fn put_line(body: &mut BytesMut, line: &str) {
    body.put_slice(line.as_bytes());
    body.put_slice(CRLF);
}

fn escape_filename(filename: &str) -> String {
    filename
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], "")
}
