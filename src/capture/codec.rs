use super::config::CaptureConfig;
use crate::headers::RawHeaders;
use crate::response::Response;
use crate::{CaptureError, Result};
use bytes::{Buf, Bytes, BytesMut};
use http::Method;
use httparse::Status;
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound on header lines in a request head
const MAX_HEADERS: usize = 128;
/// Largest single reservation made while waiting for a fixed-length body
const MAX_RESERVE: usize = 1024 * 1024;
/// Longest accepted chunk-size or trailer line
const MAX_LINE: usize = 8 * 1024;

/// A request read off the wire, before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    /// Request method
    pub method: Method,
    /// Request-target exactly as sent (still percent-encoded)
    pub target: String,
    /// HTTP minor version (`0` for HTTP/1.0, `1` for HTTP/1.1)
    pub version: u8,
    /// Header occurrences in wire order
    pub headers: RawHeaders,
    /// Body bytes; `None` when the request declared no body at all
    pub body: Option<Bytes>,
}

impl CapturedRequest {
    /// Whether the connection may carry another request after this one
    pub fn keep_alive(&self) -> bool {
        let has_token = |token: &str| {
            self.headers
                .get_all_ignore_case("connection")
                .flat_map(|value| value.split(|&b| b == b','))
                .any(|t| t.trim_ascii().eq_ignore_ascii_case(token.as_bytes()))
        };

        match self.version {
            0 => has_token("keep-alive"),
            _ => !has_token("close"),
        }
    }

    /// Number of captured body bytes
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Bytes::len)
    }
}

/// Items produced by [`HttpCodec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The client sent `Expect: 100-continue` and waits before sending the body
    ContinueRequested,
    /// A fully captured request
    Request(CapturedRequest),
}

/// Interim `100 Continue` response
#[derive(Debug, Clone, Copy)]
pub struct Continue;

#[derive(Debug)]
struct Head {
    method: Method,
    target: String,
    version: u8,
    headers: RawHeaders,
}

impl Head {
    fn expects_continue(&self) -> bool {
        self.version == 1
            && self
                .headers
                .get_ignore_case("expect")
                .is_some_and(|value| value.trim_ascii().eq_ignore_ascii_case(b"100-continue"))
    }

    fn into_request(self, body: Option<Bytes>) -> CapturedRequest {
        CapturedRequest {
            method: self.method,
            target: self.target,
            version: self.version,
            headers: self.headers,
            body,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Framing {
    None,
    Length(u64),
    Chunked,
}

impl Framing {
    fn from_headers(headers: &RawHeaders) -> Result<Self> {
        // Transfer-Encoding wins over Content-Length; only chunked is understood
        if let Some(last) = headers.get_all_ignore_case("transfer-encoding").last() {
            let coding = last.rsplit(|&b| b == b',').next().unwrap_or_default();
            return if coding.trim_ascii().eq_ignore_ascii_case(b"chunked") {
                Ok(Framing::Chunked)
            } else {
                Err(CaptureError::HttpParse(
                    "unsupported transfer coding".to_string(),
                ))
            };
        }

        let mut length = None;
        for value in headers.get_all_ignore_case("content-length") {
            let parsed = parse_content_length(value)
                .ok_or_else(|| CaptureError::HttpParse("invalid Content-Length".to_string()))?;

            match length {
                Some(existing) if existing != parsed => {
                    return Err(CaptureError::HttpParse(
                        "conflicting Content-Length headers".to_string(),
                    ));
                }
                _ => length = Some(parsed),
            }
        }

        Ok(length.map_or(Framing::None, Framing::Length))
    }
}

/// `Content-Length` is `1*DIGIT`; signs and inner whitespace are rejected
fn parse_content_length(value: &[u8]) -> Option<u64> {
    let digits = value.trim_ascii();
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[derive(Debug, Clone, Copy)]
enum ChunkPhase {
    Size,
    Data(u64),
    DataEnd,
    Trailers,
}

#[derive(Debug)]
enum BodyState {
    Length(usize),
    Chunked { body: BytesMut, phase: ChunkPhase },
}

impl BodyState {
    fn decode(&mut self, src: &mut BytesMut, limit: Option<u64>) -> Result<Option<Bytes>> {
        match self {
            BodyState::Length(length) => {
                let length = *length;
                if src.len() < length {
                    src.reserve((length - src.len()).min(MAX_RESERVE));
                    return Ok(None);
                }
                Ok(Some(src.split_to(length).freeze()))
            }
            BodyState::Chunked { body, phase } => decode_chunked(body, phase, src, limit),
        }
    }
}

fn decode_chunked(
    body: &mut BytesMut,
    phase: &mut ChunkPhase,
    src: &mut BytesMut,
    limit: Option<u64>,
) -> Result<Option<Bytes>> {
    loop {
        match *phase {
            ChunkPhase::Size => match httparse::parse_chunk_size(&src[..]) {
                Ok(Status::Complete((consumed, 0))) => {
                    src.advance(consumed);
                    *phase = ChunkPhase::Trailers;
                }
                Ok(Status::Complete((consumed, size))) => {
                    check_body_size((body.len() as u64).saturating_add(size), limit)?;
                    src.advance(consumed);
                    *phase = ChunkPhase::Data(size);
                }
                Ok(Status::Partial) if src.len() > MAX_LINE => {
                    return Err(CaptureError::HttpParse("chunk size line too long".to_string()));
                }
                Ok(Status::Partial) => return Ok(None),
                Err(_) => return Err(CaptureError::HttpParse("invalid chunk size".to_string())),
            },
            ChunkPhase::Data(remaining) => {
                if src.is_empty() {
                    return Ok(None);
                }
                let take = usize::try_from(remaining)
                    .unwrap_or(usize::MAX)
                    .min(src.len());
                body.extend_from_slice(&src.split_to(take));

                let left = remaining - take as u64;
                *phase = if left == 0 {
                    ChunkPhase::DataEnd
                } else {
                    ChunkPhase::Data(left)
                };
            }
            ChunkPhase::DataEnd => {
                if src.len() < 2 {
                    return Ok(None);
                }
                if !src.starts_with(b"\r\n") {
                    return Err(CaptureError::HttpParse(
                        "missing CRLF after chunk data".to_string(),
                    ));
                }
                src.advance(2);
                *phase = ChunkPhase::Size;
            }
            ChunkPhase::Trailers => {
                let Some(end) = src.windows(2).position(|w| w == b"\r\n") else {
                    if src.len() > MAX_LINE {
                        return Err(CaptureError::HttpParse("trailer line too long".to_string()));
                    }
                    return Ok(None);
                };
                src.advance(end + 2);

                // Trailer fields are consumed and dropped
                if end == 0 {
                    return Ok(Some(std::mem::take(body).freeze()));
                }
            }
        }
    }
}

fn check_body_size(size: u64, limit: Option<u64>) -> Result<()> {
    match limit {
        Some(limit) if size > limit => Err(CaptureError::PayloadTooLarge { size, limit }),
        _ => Ok(()),
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Head,
    Body {
        head: Head,
        body: BodyState,
    },
}

/// HTTP/1.1 framing for the capture server
///
/// Decodes complete requests (head plus opaque body) and encodes
/// [`Response`]s and interim [`Continue`] responses.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use capturesrv::capture::{CaptureConfig, HttpCodec, Inbound};
/// use tokio_util::codec::Decoder;
///
/// let mut codec = HttpCodec::new(CaptureConfig::default());
/// let mut buf = BytesMut::from(&b"POST /echo HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi"[..]);
///
/// match codec.decode(&mut buf).unwrap() {
///     Some(Inbound::Request(request)) => assert_eq!(request.body.as_deref(), Some(&b"hi"[..])),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
#[derive(Debug)]
pub struct HttpCodec {
    config: CaptureConfig,
    state: State,
}

impl HttpCodec {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            state: State::Head,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    fn parse_head(&self, src: &mut BytesMut) -> Result<Option<Head>> {
        let limit = self.config.max_head_size;
        let mut header_buf = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut request = httparse::Request::new(&mut header_buf);

        let parsed = match request.parse(&src[..]) {
            Ok(Status::Complete(parsed)) => parsed,
            Ok(Status::Partial) if src.len() > limit => {
                return Err(CaptureError::HeadTooLarge { limit });
            }
            Ok(Status::Partial) => return Ok(None),
            Err(httparse::Error::TooManyHeaders) => {
                return Err(CaptureError::HeadTooLarge { limit });
            }
            Err(e) => return Err(CaptureError::HttpParse(e.to_string())),
        };

        if parsed > limit {
            return Err(CaptureError::HeadTooLarge { limit });
        }

        let method = request
            .method
            .ok_or_else(|| CaptureError::HttpParse("missing method".to_string()))?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| CaptureError::HttpParse(e.to_string()))?;

        let mut headers = RawHeaders::new();
        for header in request.headers.iter() {
            headers.push(header.name, Bytes::copy_from_slice(header.value));
        }

        let head = Head {
            method,
            target: request.path.unwrap_or("/").to_string(),
            version: request.version.unwrap_or(1),
            headers,
        };

        src.advance(parsed);
        Ok(Some(head))
    }

    fn admit_length(&self, length: u64) -> Result<usize> {
        check_body_size(length, self.config.max_body_size)?;
        usize::try_from(length).map_err(|_| CaptureError::PayloadTooLarge {
            size: length,
            limit: usize::MAX as u64,
        })
    }
}

impl Decoder for HttpCodec {
    type Item = Inbound;
    type Error = CaptureError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>> {
        match std::mem::take(&mut self.state) {
            State::Head => {
                let Some(head) = self.parse_head(src)? else {
                    return Ok(None);
                };

                let body = match Framing::from_headers(&head.headers)? {
                    Framing::None => return Ok(Some(Inbound::Request(head.into_request(None)))),
                    Framing::Length(length) => BodyState::Length(self.admit_length(length)?),
                    Framing::Chunked => BodyState::Chunked {
                        body: BytesMut::new(),
                        phase: ChunkPhase::Size,
                    },
                };

                let expects_continue = head.expects_continue();
                self.state = State::Body { head, body };

                if expects_continue {
                    Ok(Some(Inbound::ContinueRequested))
                } else {
                    self.decode(src)
                }
            }
            State::Body { head, mut body } => {
                match body.decode(src, self.config.max_body_size)? {
                    Some(captured) => Ok(Some(Inbound::Request(head.into_request(Some(captured))))),
                    None => {
                        self.state = State::Body { head, body };
                        Ok(None)
                    }
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() && matches!(self.state, State::Head) => Ok(None),
            None => Err(CaptureError::IncompleteBody),
        }
    }
}

impl Encoder<Response> for HttpCodec {
    type Error = CaptureError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<()> {
        item.write_to(dst);
        Ok(())
    }
}

impl Encoder<Continue> for HttpCodec {
    type Error = CaptureError;

    fn encode(&mut self, _item: Continue, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(b"HTTP/1.1 100 Continue\r\n\r\n");
        Ok(())
    }
}
