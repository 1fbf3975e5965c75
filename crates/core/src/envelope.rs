//! Response envelope protocol.
//!
//! Every endpoint answers with
//! `{ "platform": .., "api": .., "data": .., "ret": ["<CODE>::<message>", ..], "v": .. }`.
//! The first `ret` line is the authoritative success/failure signal and takes
//! precedence over the HTTP status code. Classification is a total, tagged
//! parse: binary passthrough, then envelope success, then envelope failure,
//! then HTTP-status fallback.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApplicationError};

const SUCCESS_CODE: &str = "SUCCESS";
const SEPARATOR: &str = "::";

/// Decoded response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub api: String,
    #[serde(default)]
    pub data: Value,
    /// Status lines; never empty once decoded.
    pub ret: Vec<String>,
    #[serde(default)]
    pub v: i64,
}

impl Envelope {
    /// Decode an envelope from an arbitrary JSON value.
    ///
    /// Only `ret` is mandatory: it must be a non-empty array of strings.
    /// `platform` and `api` are informational and tolerated when missing or
    /// mistyped.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut map) = value else {
            return Err("response body is not an object".to_string());
        };

        let ret = match map.remove("ret") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(line) => Ok(line),
                    other => Err(format!("`ret` entry is not a string: {other}")),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err("`ret` is not an array".to_string()),
            None => return Err("missing `ret`".to_string()),
        };

        if ret.is_empty() {
            return Err("`ret` is empty".to_string());
        }

        Ok(Self {
            platform: take_string(&mut map, "platform"),
            api: take_string(&mut map, "api"),
            data: map.remove("data").unwrap_or(Value::Null),
            ret,
            v: map.get("v").and_then(Value::as_i64).unwrap_or_default(),
        })
    }

    /// Parsed first status line.
    pub fn status_line(&self) -> RetLine<'_> {
        // `from_value` guarantees at least one line.
        RetLine::parse(self.ret.first().map(String::as_str).unwrap_or_default())
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> String {
    match map.remove(key) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

/// One `ret` status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetLine<'a> {
    Success { message: &'a str },
    Failure { code: &'a str, message: &'a str },
}

impl<'a> RetLine<'a> {
    /// Parse `<CODE>::<message>`.
    ///
    /// A line without a separator is a failure with code `UNKNOWN` and the
    /// whole line as message.
    pub fn parse(line: &'a str) -> Self {
        match line.split_once(SEPARATOR) {
            Some((SUCCESS_CODE, message)) => RetLine::Success { message },
            Some((code, message)) => RetLine::Failure { code, message },
            None => RetLine::Failure {
                code: "UNKNOWN",
                message: line,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetLine::Success { .. })
    }
}

/// Result of parsing a response body against the envelope rule.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyClass {
    Success(Envelope),
    Failure(Box<ApplicationError>),
    Invalid(String),
}

impl BodyClass {
    pub fn parse(body: &[u8]) -> Self {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => return BodyClass::Invalid(format!("body is not JSON: {e}")),
        };

        let envelope = match Envelope::from_value(value) {
            Ok(envelope) => envelope,
            Err(reason) => return BodyClass::Invalid(reason),
        };

        match envelope.status_line() {
            RetLine::Success { .. } => BodyClass::Success(envelope),
            RetLine::Failure { code, message } => {
                let code = code.to_string();
                let message = message.to_string();
                let raw = serde_json::to_value(&envelope).unwrap_or(Value::Null);
                BodyClass::Failure(Box::new(ApplicationError {
                    code,
                    message,
                    api: envelope.api,
                    platform: envelope.platform,
                    envelope: raw,
                }))
            }
        }
    }
}

/// Outcome of the inbound classification step.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Opaque payload returned verbatim.
    Binary {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// Envelope success; the caller only ever sees `data`.
    Data(Value),
    /// Resolved as a protocol or application failure. No side effects apply.
    Rejected(ApiError),
    /// No usable envelope on a non-success status: handle by HTTP status.
    Fallback { status: u16, detail: Option<String> },
}

/// Classify a raw HTTP response.
///
/// Precedence: binary passthrough (successful status only), envelope success,
/// envelope failure, then either `InvalidResponse` (successful status) or
/// HTTP-status fallback (any other status). A non-success status carrying a
/// `SUCCESS::` envelope resolves as success.
pub fn classify(
    status: u16,
    content_type: Option<&str>,
    body: Vec<u8>,
    expect_binary: bool,
) -> Inbound {
    let ok = (200..300).contains(&status);

    if ok && (expect_binary || content_type.is_some_and(is_binary_content_type)) {
        return Inbound::Binary {
            content_type: content_type.map(str::to_string),
            bytes: body,
        };
    }

    match BodyClass::parse(&body) {
        BodyClass::Success(envelope) => {
            if !ok {
                tracing::debug!(status, api = %envelope.api, "success envelope on non-success status");
            }
            Inbound::Data(envelope.data)
        }
        BodyClass::Failure(err) => Inbound::Rejected(ApiError::Application(err)),
        BodyClass::Invalid(reason) if ok => Inbound::Rejected(ApiError::InvalidResponse(reason)),
        BodyClass::Invalid(_) => Inbound::Fallback {
            status,
            detail: error_detail(&body),
        },
    }
}

/// `true` for content types that must bypass envelope parsing.
pub fn is_binary_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("image/")
        || essence == "application/octet-stream"
        || essence == "application/pdf"
}

/// Extract a `detail` message from a non-envelope error body, if any.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
