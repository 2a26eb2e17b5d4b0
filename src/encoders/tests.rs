use super::{base64_roundtrip, encode, multipart, raw_dump, structured};
use crate::CaptureError;
use crate::capture::CapturedRequest;
use crate::headers::RawHeaders;
use crate::request::RequestDescriptor;
use crate::response::{CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};
use crate::routing::Route;
use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use http::{Method, StatusCode};
use serde_json::{Value, json};

fn descriptor(target: &str, tokens: &[&str], body: Option<&[u8]>) -> RequestDescriptor {
    RequestDescriptor::from_captured(CapturedRequest {
        method: Method::POST,
        target: target.to_string(),
        version: 1,
        headers: RawHeaders::from_tokens(tokens),
        body: body.map(Bytes::copy_from_slice),
    })
    .unwrap()
}

fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[test]
fn test_structured_echo_fields() {
    let descriptor = descriptor(
        "/json?q=a%20b",
        &["Host", "localhost", "X-Dup", "first", "X-Dup", "last"],
        Some(b"hello"),
    );

    let response = structured::encode(&descriptor).unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type, Some(CONTENT_TYPE_JSON));
    assert_eq!(
        json_body(&response.body),
        json!({
            "url": "/json?q=a%20b",
            "url_decoded": "/json?q=a b",
            "headers": {"Host": "localhost", "X-Dup": "last"},
            "body": "hello",
        })
    );
}

#[test]
fn test_structured_echo_omits_missing_body() {
    let descriptor = descriptor("/", &["Host", "h"], None);
    let response = structured::encode(&descriptor).unwrap();

    let value = json_body(&response.body);
    assert!(value.get("body").is_none());
}

#[test]
fn test_structured_echo_keeps_empty_body() {
    let descriptor = descriptor("/", &["Content-Length", "0"], Some(b""));
    let response = structured::encode(&descriptor).unwrap();

    assert_eq!(json_body(&response.body)["body"], json!(""));
}

#[test]
fn test_structured_echo_is_deterministic() {
    let tokens = ["B", "2", "A", "1", "B", "3"];
    let first = structured::encode(&descriptor("/", &tokens, Some(b"x"))).unwrap();
    let second = structured::encode(&descriptor("/", &tokens, Some(b"x"))).unwrap();

    assert_eq!(first.to_bytes(), second.to_bytes());
    assert_eq!(
        first.body,
        Bytes::from_static(br#"{"url":"/","url_decoded":"/","headers":{"B":"3","A":"1"},"body":"x"}"#)
    );
}

#[test]
fn test_raw_dump_preserves_duplicates_in_order() {
    let descriptor = descriptor(
        "/echo",
        &["Host", "h", "Cookie", "a=1", "cookie", "b=2", "Cookie", "a=1"],
        Some(b"raw\x00bytes\n"),
    );

    let response = raw_dump::encode(&descriptor);

    assert_eq!(response.content_type, Some(CONTENT_TYPE_TEXT));
    assert_eq!(
        response.body,
        Bytes::from_static(
            b"HEADERS:\nHost: h\nCookie: a=1\ncookie: b=2\nCookie: a=1\nBODY:\nraw\x00bytes\n"
        )
    );
}

#[test]
fn test_raw_dump_without_body() {
    let descriptor = descriptor("/echo", &[], None);
    let response = raw_dump::encode(&descriptor);
    assert_eq!(response.body, Bytes::from_static(b"HEADERS:\nBODY:\n"));
}

#[test]
fn test_base64_roundtrip_template() {
    let encoded = base64_roundtrip::roundtrip(b"aGVsbG8=").unwrap();

    assert_eq!(encoded, "UmVjZWl2ZWQgaW4gYmFzZTY0OgotLS0tLQpoZWxsbwotLS0tLQ==");
    assert_eq!(
        STANDARD.decode(encoded).unwrap(),
        b"Received in base64:\n-----\nhello\n-----"
    );
}

#[test]
fn test_base64_roundtrip_ignores_trailing_newline() {
    assert_eq!(
        base64_roundtrip::roundtrip(b"aGVsbG8=\n").unwrap(),
        base64_roundtrip::roundtrip(b"aGVsbG8=").unwrap()
    );
}

#[test]
fn test_base64_roundtrip_accepts_line_wrapped_input() {
    let plaintext = vec![b'z'; 120];
    let encoded = STANDARD.encode(&plaintext);
    let wrapped: Vec<u8> = encoded
        .as_bytes()
        .chunks(76)
        .flat_map(|line| [line, b"\r\n".as_slice()].concat())
        .collect();

    let output = base64_roundtrip::roundtrip(&wrapped).unwrap();
    assert_eq!(
        STANDARD.decode(output).unwrap(),
        base64_roundtrip::wrap(&plaintext)
    );
}

#[test]
fn test_base64_roundtrip_rejects_invalid_input() {
    let descriptor = descriptor("/base64", &[], Some(b"not base64!"));
    assert!(matches!(
        base64_roundtrip::encode(&descriptor),
        Err(CaptureError::InvalidBase64(_))
    ));
}

#[test]
fn test_upload_form_names_two_file_fields() {
    let response = multipart::form();

    assert_eq!(response.content_type, Some(CONTENT_TYPE_HTML));
    let html = String::from_utf8_lossy(&response.body);
    assert!(html.contains(r#"enctype="multipart/form-data""#));
    assert!(html.contains(r#"name="file1""#));
    assert!(html.contains(r#"name="file2""#));
}

const MULTIPART_BODY: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"file1\"; filename=\"a.txt\"\r\n\
Content-Type: text/plain\r\n\
\r\n\
first file\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"file2\"; filename=\"b.bin\"\r\n\
Content-Type: application/octet-stream\r\n\
\r\n\
second\r\nfile\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"note\"\r\n\
\r\n\
plain field\r\n\
--XyZ--\r\n";

#[test]
fn test_multipart_parse() {
    let envelope = multipart::parse(MULTIPART_BODY, "XyZ").unwrap();

    assert_eq!(envelope.parts.len(), 3);

    let file1 = envelope.part("file1").unwrap();
    assert_eq!(file1.filename.as_deref(), Some("a.txt"));
    assert_eq!(file1.content_type.as_deref(), Some("text/plain"));
    assert_eq!(file1.content, "first file");

    let file2 = envelope.part("file2").unwrap();
    assert_eq!(file2.content, "second\r\nfile");
    assert_eq!(file2.size, 12);

    let note = envelope.part("note").unwrap();
    assert!(note.filename.is_none());
    assert_eq!(note.content, "plain field");
}

#[test]
fn test_multipart_quoted_filename_with_separator() {
    let body = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"file1\"; filename=\"a;b \\\"c\\\".txt\"\r\n\
\r\n\
data\r\n\
--XyZ--\r\n";

    let envelope = multipart::parse(body, "XyZ").unwrap();
    let part = envelope.part("file1").unwrap();

    assert_eq!(part.filename.as_deref(), Some("a;b \"c\".txt"));
    assert_eq!(part.content, "data");
}

#[test]
fn test_multipart_boundary() {
    assert_eq!(
        multipart::boundary(b"multipart/form-data; boundary=XyZ").as_deref(),
        Some("XyZ")
    );
    assert_eq!(
        multipart::boundary(b"Multipart/Form-Data; charset=utf-8; boundary=\"a b\"").as_deref(),
        Some("a b")
    );
    assert!(multipart::boundary(b"application/json; boundary=x").is_none());
    assert!(multipart::boundary(b"multipart/form-data").is_none());
}

#[test]
fn test_multipart_rejects_unterminated_part() {
    let body = b"--XyZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nno end";
    assert!(matches!(
        multipart::parse(body, "XyZ"),
        Err(CaptureError::InvalidMultipart(_))
    ));
}

#[test]
fn test_upload_submit_echoes_envelope() {
    let descriptor = descriptor(
        "/upload",
        &["Content-Type", "multipart/form-data; boundary=XyZ"],
        Some(MULTIPART_BODY),
    );

    let response = encode(Route::UploadSubmit, &descriptor).unwrap();
    let value = json_body(&response.body);

    assert_eq!(value["url"], json!("/upload"));
    let parts = value["body"]["parts"].as_array().unwrap();
    let names: Vec<_> = parts.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["file1", "file2", "note"]);
    assert_eq!(parts[0]["filename"], json!("a.txt"));
    assert_eq!(parts[1]["filename"], json!("b.bin"));
}

#[test]
fn test_upload_submit_without_boundary() {
    let descriptor = descriptor("/upload", &["Content-Type", "text/plain"], Some(b"x"));
    assert!(matches!(
        encode(Route::UploadSubmit, &descriptor),
        Err(CaptureError::InvalidMultipart(_))
    ));
}
