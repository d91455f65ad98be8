//! Request builders and sample payloads.

use axum::body::Body;
use axum::http::Request;

/// Boundary used by [`multipart_request`].
pub const BOUNDARY: &str = "shrink-test-boundary-7d1f";

/// Smallest useful PNG prefix: signature plus an IHDR chunk header.
#[allow(dead_code)]
pub fn png_bytes() -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
    data.extend_from_slice(&[0, 0, 0, 13]);
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0]);
    data.extend_from_slice(&[0x1f, 0x15, 0xc4, 0x89]);
    data
}

/// JPEG start-of-image and JFIF header.
#[allow(dead_code)]
pub fn jpeg_bytes() -> Vec<u8> {
    let mut data = vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    data
}

/// One part of a multipart body.
#[allow(dead_code)]
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

/// Encode parts as `multipart/form-data` with [`BOUNDARY`].
#[allow(dead_code)]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart form to `uri` with optional extra headers.
#[allow(dead_code)]
pub fn multipart_request(uri: &str, parts: &[Part<'_>], headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

/// POST a single `file` part to `/upload`.
#[allow(dead_code)]
pub fn upload_request(filename: &str, data: &[u8], headers: &[(&str, &str)]) -> Request<Body> {
    multipart_request(
        "/upload",
        &[Part {
            name: "file",
            filename: Some(filename),
            data,
        }],
        headers,
    )
}

/// POST an urlencoded `url=` form to `/shorten`.
#[allow(dead_code)]
pub fn shorten_request(url: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/shorten")
        .header("Content-Type", "application/x-www-form-urlencoded");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = format!("url={}", encode_form_value(url));
    builder.body(Body::from(body)).unwrap()
}

/// Minimal `application/x-www-form-urlencoded` value encoding.
#[allow(dead_code)]
fn encode_form_value(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}
