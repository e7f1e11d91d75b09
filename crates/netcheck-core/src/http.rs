//! Parsing of raw HTTP probe output.
//!
//! HTTP probes capture `curl --include` output: one or more header blocks
//! (proxies add a `CONNECT` response, servers may send `100 Continue`)
//! followed by the body. All text scraping of probe output lives here.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// MIME types served for proxy auto-config files.
pub const PAC_MIME_TYPES: &[&str] = &[
    "application/x-ns-proxy-autoconfig",
    "application/x-javascript-config",
];

/// Errors parsing probe output as an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseParseError {
    #[error("no HTTP status line in response")]
    NoStatusLine,

    #[error("malformed HTTP status line: {0}")]
    MalformedStatusLine(String),
}

/// A parsed HTTP response (final header block plus body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Protocol version, e.g. `HTTP/1.1` or `HTTP/2`.
    pub version: String,

    /// Status code.
    pub status: u16,

    /// Reason phrase (may be empty, always empty for HTTP/2).
    pub reason: String,

    /// Headers in received order.
    pub headers: Vec<(String, String)>,

    /// Body text.
    pub body: String,
}

impl HttpResponse {
    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Content type without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Whether the content type is a proxy auto-config type.
    pub fn is_pac(&self) -> bool {
        self.content_type()
            .map(|ct| PAC_MIME_TYPES.contains(&ct.as_str()))
            .unwrap_or(false)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Network time from the `Date` header, if present and valid.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header("date").and_then(parse_http_date)
    }

    /// Release number carried in the body, if the body is a bare number.
    pub fn release(&self) -> Option<u64> {
        parse_release(&self.body)
    }

    /// `HTTP/1.1 200 OK` style status line.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            format!("{} {}", self.version, self.status)
        } else {
            format!("{} {} {}", self.version, self.status, self.reason)
        }
    }
}

fn status_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(HTTP/\d(?:\.\d)?)\s+(\d{3})(?:\s+(.*))?$").expect("static regex is valid")
    })
}

/// Parse `curl --include` output into the final response.
pub fn parse_response(raw: &str) -> Result<HttpResponse, ResponseParseError> {
    let normalized = raw.replace("\r\n", "\n");
    let mut rest = normalized.trim_start_matches('\n');

    if !rest.starts_with("HTTP/") {
        return Err(ResponseParseError::NoStatusLine);
    }

    loop {
        let (head, after) = match rest.split_once("\n\n") {
            Some((head, after)) => (head, after),
            None => (rest, ""),
        };

        // An intermediate block (proxy CONNECT, 1xx) is followed by another.
        if after.starts_with("HTTP/") {
            rest = after;
            continue;
        }

        let mut lines = head.lines();
        let status_line = lines.next().unwrap_or_default().trim();
        let caps = status_line_regex()
            .captures(status_line)
            .ok_or_else(|| ResponseParseError::MalformedStatusLine(status_line.to_string()))?;

        let status = caps[2]
            .parse::<u16>()
            .map_err(|_| ResponseParseError::MalformedStatusLine(status_line.to_string()))?;

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        return Ok(HttpResponse {
            version: caps[1].to_string(),
            status,
            reason: caps.get(3).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
            headers,
            body: after.to_string(),
        });
    }
}

/// A body consisting only of a release number (surrounding whitespace allowed).
pub fn parse_release(body: &str) -> Option<u64> {
    let trimmed = body.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Parse an HTTP `Date` header (IMF-fixdate or RFC 2822).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%a, %d %b %Y %H:%M:%S GMT")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
