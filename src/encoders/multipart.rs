use super::structured;
use crate::request::RequestDescriptor;
use crate::response::Response;
use crate::{CaptureError, Result};
use httparse::Status;
use serde::Serialize;

/// Most header lines accepted in a single part
const MAX_PART_HEADERS: usize = 16;

/// Upload page served on `GET /upload`
pub const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html>
<head><title>Upload</title></head>
<body>
<form action="/upload" method="post" enctype="multipart/form-data">
  <input type="file" name="file1"><br>
  <input type="file" name="file2"><br>
  <input type="submit" value="Upload">
</form>
</body>
</html>
"#;

/// Parsed multipart submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultipartEnvelope {
    pub parts: Vec<FormPart>,
}

impl MultipartEnvelope {
    /// First part submitted under `name`
    pub fn part(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|part| part.name == name)
    }
}

/// One `form-data` part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormPart {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size: usize,
    /// Part content as text, invalid UTF-8 replaced
    pub content: String,
}

pub fn form() -> Response {
    Response::html(UPLOAD_FORM)
}

/// Parses the submission and echoes it with the envelope as `body`
pub fn encode(descriptor: &RequestDescriptor) -> Result<Response> {
    let content_type = descriptor
        .raw_headers
        .get_ignore_case("content-type")
        .ok_or_else(|| CaptureError::InvalidMultipart("missing Content-Type".to_string()))?;
    let boundary = boundary(content_type)
        .ok_or_else(|| CaptureError::InvalidMultipart("missing boundary".to_string()))?;

    let envelope = parse(descriptor.body.as_deref().unwrap_or_default(), &boundary)?;
    structured::encode_with_body(descriptor, Some(&envelope))
}

/// Boundary parameter of a `multipart/*` content type
pub fn boundary(content_type: &[u8]) -> Option<String> {
    let content_type = std::str::from_utf8(content_type).ok()?;
    let media_type = content_type.split(';').next()?.trim();
    if !media_type
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
    {
        return None;
    }

    header_param(content_type, "boundary").filter(|boundary| !boundary.is_empty())
}

/// Splits a multipart body on `boundary` into its parts
pub fn parse(body: &[u8], boundary: &str) -> Result<MultipartEnvelope> {
    let delimiter = format!("--{boundary}").into_bytes();
    let separator = [b"\r\n".as_slice(), &delimiter].concat();

    let start = find(body, &delimiter)
        .ok_or_else(|| CaptureError::InvalidMultipart("missing opening boundary".to_string()))?;
    let mut rest = &body[start + delimiter.len()..];
    let mut parts = Vec::new();

    loop {
        if rest.starts_with(b"--") {
            break;
        }
        rest = rest.strip_prefix(b"\r\n").ok_or_else(|| {
            CaptureError::InvalidMultipart("expected CRLF after boundary".to_string())
        })?;

        let mut header_buf = [httparse::EMPTY_HEADER; MAX_PART_HEADERS];
        let (consumed, headers) = match httparse::parse_headers(rest, &mut header_buf) {
            Ok(Status::Complete(parsed)) => parsed,
            Ok(Status::Partial) => {
                return Err(CaptureError::InvalidMultipart(
                    "truncated part headers".to_string(),
                ));
            }
            Err(e) => return Err(CaptureError::InvalidMultipart(format!("part headers: {e}"))),
        };

        let header = |name: &str| {
            headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| String::from_utf8_lossy(h.value).into_owned())
        };
        let disposition = header("content-disposition").ok_or_else(|| {
            CaptureError::InvalidMultipart("part without Content-Disposition".to_string())
        })?;
        let name = header_param(&disposition, "name")
            .ok_or_else(|| CaptureError::InvalidMultipart("part without name".to_string()))?;
        let filename = header_param(&disposition, "filename");
        let content_type = header("content-type");

        rest = &rest[consumed..];
        let end = find(rest, &separator)
            .ok_or_else(|| CaptureError::InvalidMultipart("unterminated part".to_string()))?;
        let content = &rest[..end];
        rest = &rest[end + separator.len()..];

        parts.push(FormPart {
            name,
            filename,
            content_type,
            size: content.len(),
            content: String::from_utf8_lossy(content).into_owned(),
        });
    }

    Ok(MultipartEnvelope { parts })
}

/// Value of a `key=value` parameter in a header such as `Content-Disposition`
fn header_param(value: &str, key: &str) -> Option<String> {
    header_params(value)
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}

/// Parameters following the leading token of `type; a=b; c="d;e"`.
///
/// Quoted values may contain `;` and backslash escapes.
fn header_params(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = value.chars().peekable();

    // Leading token (media type or disposition type)
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    while chars.peek().is_some() {
        let mut name = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ';') {
            name.push(c);
        }

        let mut param = String::new();
        if chars.next_if_eq(&'=').is_some() {
            while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}

            if chars.next_if_eq(&'"').is_some() {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => param.extend(chars.next()),
                        '"' => break,
                        c => param.push(c),
                    }
                }
                // Anything between the closing quote and the next `;` is dropped
                while chars.next_if(|c| *c != ';').is_some() {}
            } else {
                while let Some(c) = chars.next_if(|c| *c != ';') {
                    param.push(c);
                }
                param = param.trim().to_string();
            }
        }
        chars.next();

        let name = name.trim();
        if !name.is_empty() {
            params.push((name.to_string(), param));
        }
    }

    params
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
