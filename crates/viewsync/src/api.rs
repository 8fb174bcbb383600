//! Request/response and push types exchanged with the transport layer.
//!
//! The transport itself is outside this crate. It hands requests to
//! [`ListViewController::handle_request`](crate::ListViewController::handle_request)
//! and carries push messages through the [`Transport`] trait.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    Ok = 200,
    NoContent = 204,
}

impl StatusCode {
    /// The numeric HTTP status.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// A request addressed to one view.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Request method.
    pub method: Method,
    /// Path segments below the view name.
    pub path: Vec<String>,
    /// JSON body (`Value::Null` when absent).
    pub body: Value,
}

impl ApiRequest {
    /// Creates a request without a body.
    pub fn new(method: Method, path: &[&str]) -> Self {
        Self {
            method,
            path: path.iter().map(|s| s.to_string()).collect(),
            body: Value::Null,
        }
    }

    /// Attaches a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

/// The response to an [`ApiRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ApiResponse {
    /// `204 No Content`.
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NoContent,
            body: None,
        }
    }

    /// `200 OK` without a body.
    pub fn ok() -> Self {
        Self {
            status: StatusCode::Ok,
            body: None,
        }
    }

    /// `200 OK` with a JSON body.
    pub fn json(body: Value) -> Self {
        Self {
            status: StatusCode::Ok,
            body: Some(body),
        }
    }
}

/// Outbound channel for push messages.
pub trait Transport: Send + Sync {
    /// Sends one push message, e.g. `"queue_view_updated"`.
    fn send(&self, event: &str, payload: Value);
}

/// Body of `POST <view>`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SettingsRequest {
    pub range_start: Option<i64>,
    pub max_count: Option<i64>,
    pub sort_property: Option<String>,
    pub sort_ascending: Option<bool>,
    pub paused: Option<bool>,
}

/// Body of `POST <view>/filter`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    pub pattern: String,
    pub method: u8,
    pub property: Option<String>,
}
