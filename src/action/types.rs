//! `Action` and `ActionResult` — spec.md §3. `HTTPResult`-style derived
//! accessors (`content_type`, `compression`, `size`, decoded `data`) are
//! generalized into `ActionResult::derived_timings()`/`body_as_str()`,
//! grounded on `hedra/core/engines/types/http/result.py`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::hooks::types::HookBundle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
    Grpc,
    Udp,
}

/// A protocol-agnostic action definition. Protocol-specific behavior (HTTP/2
/// framing, TLS handshakes, DNS) lives behind `ActionClient`, out of scope
/// per spec.md §1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    #[serde(with = "serde_bytes_vec")]
    pub payload: Vec<u8>,
    pub stage_name: String,
    pub setup: bool,
    #[serde(skip)]
    pub hooks: HookBundle,
}

impl Action {
    pub fn url(&self) -> String {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
            Scheme::Grpc => "grpc",
            Scheme::Udp => "udp",
        };
        format!("{scheme}://{}:{}{}", self.host, self.port, self.path)
    }

    pub fn is_secure(&self) -> bool {
        matches!(self.scheme, Scheme::Https | Scheme::Wss)
    }
}

/// Timestamps taken during one action execution, all monotonic. Any stage
/// skipped by failure propagates as `None` and is excluded from aggregates
/// (spec.md §4.6 "Timing semantics").
#[derive(Debug, Clone, Default)]
pub struct Timings {
    pub wait_start: Option<Instant>,
    pub start: Option<Instant>,
    pub connect_end: Option<Instant>,
    pub write_end: Option<Instant>,
    pub read_end: Option<Instant>,
}

impl Timings {
    pub fn waiting(&self) -> Option<Duration> {
        Some(self.start?.saturating_duration_since(self.wait_start?))
    }

    pub fn connecting(&self) -> Option<Duration> {
        Some(self.connect_end?.saturating_duration_since(self.start?))
    }

    pub fn writing(&self) -> Option<Duration> {
        Some(self.write_end?.saturating_duration_since(self.connect_end?))
    }

    pub fn reading(&self) -> Option<Duration> {
        Some(self.read_end?.saturating_duration_since(self.write_end?))
    }

    pub fn total(&self) -> Option<Duration> {
        Some(self.read_end?.saturating_duration_since(self.wait_start?))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActionResult {
    pub action_name: String,
    pub timings: Timings,
    pub status: Option<u16>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub error: Option<String>,
}

impl ActionResult {
    pub fn new(action_name: impl Into<String>) -> Self {
        ActionResult {
            action_name: action_name.into(),
            ..Default::default()
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }

    /// Content-Length header, falling back to the decoded body length —
    /// grounded on `HTTPResult.size`.
    pub fn size(&self) -> usize {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(self.body.len())
    }

    pub fn body_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && matches!(self.status, Some(200..=299))
    }
}

mod serde_bytes_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        Vec::<u8>::deserialize(d)
    }
}
