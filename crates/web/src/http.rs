#![forbid(unsafe_code)]

//! Just enough HTTP/1.1 for a form wizard and a few plain-text files: one request per
//! connection, `Content-Length` bodies, `application/x-www-form-urlencoded` forms.

use std::io::{Read, Write};

const MAX_HEADER_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 256 * 1024;
const MAX_TARGET_LEN: usize = 16 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Raw request target: path plus optional `?query`.
    pub target: String,
    pub host: Option<String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn get(target: &str) -> Self {
        Self {
            method: "GET".to_string(),
            target: target.to_string(),
            host: None,
            body: Vec::new(),
        }
    }

    pub fn post_form(target: &str, fields: &[(&str, &str)]) -> Self {
        Self {
            method: "POST".to_string(),
            target: target.to_string(),
            host: None,
            body: encode_form(fields).into_bytes(),
        }
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("/")
    }

    pub fn query(&self) -> &str {
        self.target.split_once('?').map(|(_, q)| q).unwrap_or("")
    }

    /// All values of a repeated query parameter, in order.
    pub fn query_values(&self, key: &str) -> Vec<String> {
        form_values(self.query(), key)
    }

    /// All values of a repeated form field from a urlencoded body, in order.
    pub fn form_values(&self, key: &str) -> Vec<String> {
        form_values(&String::from_utf8_lossy(&self.body), key)
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    Found,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Found => 302,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::InternalServerError => 500,
        }
    }

    pub fn line(self) -> &'static str {
        match self {
            Self::Ok => "200 OK",
            Self::Found => "302 Found",
            Self::NotFound => "404 Not Found",
            Self::MethodNotAllowed => "405 Method Not Allowed",
            Self::InternalServerError => "500 Internal Server Error",
        }
    }
}

pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: Status,
    pub content_type: &'static str,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn html(status: Status, body: String) -> Self {
        Self {
            status,
            content_type: TEXT_HTML,
            location: None,
            body: body.into_bytes(),
        }
    }

    pub fn text(body: String) -> Self {
        Self {
            status: Status::Ok,
            content_type: TEXT_PLAIN,
            location: None,
            body: body.into_bytes(),
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: Status::Found,
            content_type: TEXT_PLAIN,
            location: Some(location.into()),
            body: Vec::new(),
        }
    }

    pub fn plain(status: Status, message: &str) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            location: None,
            body: message.as_bytes().to_vec(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Reads one request: the head up to the blank line, then at most `Content-Length` body
/// bytes. A peer that times out mid-request gets whatever arrived.
pub fn read_request(stream: &mut impl Read) -> std::io::Result<Option<HttpRequest>> {
    let mut data = Vec::<u8>::new();
    let head_end = loop {
        if let Some(pos) = find_head_end(&data) {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES || read_chunk(stream, &mut data, usize::MAX)? == 0 {
            break data.len();
        }
    };
    if data.is_empty() {
        return Ok(None);
    }
    let mut body = data.split_off(head_end);

    let Some(head) = RequestHead::parse(&String::from_utf8_lossy(&data)) else {
        return Ok(None);
    };
    let content_length = head.content_length.min(MAX_BODY_BYTES);
    while body.len() < content_length {
        let remaining = content_length - body.len();
        if read_chunk(stream, &mut body, remaining)? == 0 {
            break;
        }
    }
    body.truncate(content_length);

    Ok(Some(HttpRequest {
        method: head.method,
        target: head.target,
        host: head.host,
        body,
    }))
}

struct RequestHead {
    method: String,
    target: String,
    host: Option<String>,
    content_length: usize,
}

impl RequestHead {
    fn parse(text: &str) -> Option<Self> {
        let mut lines = text.split("\r\n");
        let mut parts = lines.next()?.split_whitespace();
        let method = parts.next()?.to_string();
        let target = parts.next().unwrap_or("/").to_string();
        if target.len() > MAX_TARGET_LEN {
            return None;
        }

        let mut head = Self {
            method,
            target,
            host: None,
            content_length: 0,
        };
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());
            if name.eq_ignore_ascii_case("content-length") {
                head.content_length = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("host") && !value.is_empty() {
                head.host = Some(value.to_string());
            }
        }
        Some(head)
    }
}

fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Appends up to `limit` bytes. Returns 0 at end of stream or when the read timed out.
fn read_chunk(stream: &mut impl Read, out: &mut Vec<u8>, limit: usize) -> std::io::Result<usize> {
    let mut buf = [0u8; 4096];
    let cap = limit.min(buf.len());
    match stream.read(&mut buf[..cap]) {
        Ok(read) => {
            out.extend_from_slice(&buf[..read]);
            Ok(read)
        }
        Err(err)
            if matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ) =>
        {
            Ok(0)
        }
        Err(err) => Err(err),
    }
}

pub fn write_response(
    stream: &mut impl Write,
    response: &HttpResponse,
    head_only: bool,
) -> std::io::Result<()> {
    let mut headers = String::new();
    headers.push_str("HTTP/1.1 ");
    headers.push_str(response.status.line());
    headers.push_str("\r\n");
    headers.push_str("Content-Type: ");
    headers.push_str(response.content_type);
    headers.push_str("\r\n");
    if let Some(location) = response.location.as_deref() {
        headers.push_str("Location: ");
        headers.push_str(location);
        headers.push_str("\r\n");
    }
    headers.push_str("Cache-Control: no-store\r\n");
    headers.push_str("X-Content-Type-Options: nosniff\r\n");
    headers.push_str("Connection: close\r\n");
    headers.push_str("Content-Length: ");
    headers.push_str(&response.body.len().to_string());
    headers.push_str("\r\n\r\n");

    stream.write_all(headers.as_bytes())?;
    if !head_only {
        stream.write_all(&response.body)?;
    }
    stream.flush()
}

/// Values of `key` in a `a=1&b=2&a=3` string, percent-decoded. Pairs that fail to decode
/// are skipped; empty values are dropped.
pub fn form_values(raw: &str, key: &str) -> Vec<String> {
    let mut out = Vec::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        if decode_component(name).as_deref() != Some(key) {
            continue;
        }
        let Some(value) = decode_component(value) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        out.push(value);
    }
    out
}

pub fn decode_component(value: &str) -> Option<String> {
    let mut out: Vec<u8> = Vec::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut idx = 0usize;
    while idx < bytes.len() {
        match bytes[idx] {
            b'+' => {
                out.push(b' ');
                idx += 1;
            }
            b'%' => {
                let hi = hex_value(*bytes.get(idx + 1)?)?;
                let lo = hex_value(*bytes.get(idx + 2)?)?;
                out.push((hi << 4) | lo);
                idx += 3;
            }
            byte => {
                out.push(byte);
                idx += 1;
            }
        }
    }

    String::from_utf8(out).ok()
}

/// Percent-decodes a path segment; `+` stays literal.
pub fn decode_path_segment(value: &str) -> Option<String> {
    decode_component(&value.replace('+', "%2B"))
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Form encoding: a space becomes `+`.
pub fn encode_component(value: &str) -> String {
    percent_encode(value, "+")
}

/// Path encoding: a space becomes `%20`, so [`decode_path_segment`] reads it back.
pub fn encode_path_segment(value: &str) -> String {
    percent_encode(value, "%20")
}

fn percent_encode(value: &str, space: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push_str(space),
            _ => {
                out.push('%');
                out.push(HEX[(byte >> 4) as usize] as char);
                out.push(HEX[(byte & 0x0f) as usize] as char);
            }
        }
    }
    out
}

pub fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", encode_component(name), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}
