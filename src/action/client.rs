//! `ActionClient` — the external protocol-client seam (spec.md §6). Real
//! protocol internals (HTTP/2 framing, TLS, DNS) are out of scope per
//! spec.md §1; `ReferenceClient` is a bundled in-process double used only by
//! integration tests, implementing just enough of spec.md §4.6 step 7's
//! chunked-transfer parsing to exercise the executor end to end.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::action::types::{Action, ActionResult};
use crate::error::{GraphError, GraphResult};

#[async_trait]
pub trait ActionClient: Send + Sync {
    /// Resolve host/socket config, attach SSL context, cache for reuse.
    async fn prepare(&self, action: Action) -> GraphResult<Action>;
    /// Execute a prepared action end to end, stamping every timing field.
    async fn execute(&self, action: &Action) -> GraphResult<ActionResult>;
    async fn close(&self) -> GraphResult<()>;
}

/// Canned response body, either a flat byte string or a sequence of chunks
/// to be encoded with `Transfer-Encoding: chunked` framing and then decoded
/// by `execute`, proving the parser round-trips scenario 3 from spec.md §8.
#[derive(Clone)]
pub enum CannedBody {
    Plain(Vec<u8>),
    Chunked(Vec<Vec<u8>>),
}

#[derive(Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: CannedBody,
    /// When set, `execute` returns this error instead of a response — used
    /// to drive scenario 4 (connection reset on failure).
    pub fail_with: Option<String>,
}

/// In-process reference client: no real sockets, just canned responses
/// keyed by action name, with real chunked-transfer decoding.
#[derive(Default)]
pub struct ReferenceClient {
    responses: Mutex<FxHashMap<String, CannedResponse>>,
}

impl ReferenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, action_name: impl Into<String>, response: CannedResponse) {
        self.responses.lock().unwrap().insert(action_name.into(), response);
    }
}

#[async_trait]
impl ActionClient for ReferenceClient {
    async fn prepare(&self, action: Action) -> GraphResult<Action> {
        Ok(action)
    }

    async fn execute(&self, action: &Action) -> GraphResult<ActionResult> {
        let mut result = ActionResult::new(action.name.clone());
        result.timings.wait_start = Some(Instant::now());
        result.timings.start = Some(Instant::now());

        let response = {
            let responses = self.responses.lock().unwrap();
            responses.get(&action.name).cloned()
        };

        let Some(response) = response else {
            result.timings.read_end = Some(Instant::now());
            result.error = Some(format!("no canned response registered for '{}'", action.name));
            return Ok(result);
        };

        result.timings.connect_end = Some(Instant::now());
        result.timings.write_end = Some(Instant::now());

        if let Some(reason) = response.fail_with {
            result.timings.read_end = Some(Instant::now());
            result.error = Some(reason);
            return Ok(result);
        }

        result.status = Some(response.status);
        result.headers = response.headers;
        result.body = match response.body {
            CannedBody::Plain(bytes) => bytes,
            CannedBody::Chunked(chunks) => decode_chunked(&encode_chunked(&chunks))?,
        };
        result.timings.read_end = Some(Instant::now());
        Ok(result)
    }

    async fn close(&self) -> GraphResult<()> {
        Ok(())
    }
}

impl Clone for CannedResponse {
    fn clone(&self) -> Self {
        CannedResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            fail_with: self.fail_with.clone(),
        }
    }
}

/// Encode chunks into wire format: `<size-hex>\r\n<data>\r\n` per chunk,
/// terminated by a zero-length chunk `0\r\n\r\n`.
fn encode_chunked(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut wire = Vec::new();
    for chunk in chunks {
        wire.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        wire.extend_from_slice(chunk);
        wire.extend_from_slice(b"\r\n");
    }
    wire.extend_from_slice(b"0\r\n\r\n");
    wire
}

/// Parse chunked transfer-encoding exactly per spec.md §4.6 step 7: a
/// size line in hex, that many bytes of data, a trailing CRLF, repeated
/// until a zero-length chunk followed by CRLF.
pub fn decode_chunked(wire: &[u8]) -> GraphResult<Vec<u8>> {
    let mut body = Vec::new();
    let mut cursor = 0usize;

    loop {
        let line_end = find_crlf(wire, cursor)
            .ok_or_else(|| GraphError::other("chunked body: missing size line terminator"))?;
        let size_line = std::str::from_utf8(&wire[cursor..line_end])
            .map_err(|_| GraphError::other("chunked body: non-utf8 size line"))?;
        let size = usize::from_str_radix(size_line.trim(), 16)
            .map_err(|_| GraphError::other("chunked body: invalid hex size"))?;
        cursor = line_end + 2;

        if size == 0 {
            break;
        }

        if cursor + size > wire.len() {
            return Err(GraphError::other("chunked body: truncated chunk data"));
        }
        body.extend_from_slice(&wire[cursor..cursor + size]);
        cursor += size;

        if wire.get(cursor..cursor + 2) != Some(b"\r\n") {
            return Err(GraphError::other("chunked body: missing chunk trailer CRLF"));
        }
        cursor += 2;
    }

    Ok(body)
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|p| from + p)
}
