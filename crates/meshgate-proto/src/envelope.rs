// Response envelope and single-record normalization.
//
// The registry wraps a single-device result as `{"devices":[{...}]}`.
// Every caller of the read capabilities wants the bare record, so the
// unwrap happens once here rather than at each call site.

use serde_json::Value;

use crate::error::Error;

/// Field under which the registry wraps a single-device result.
const WRAPPER_FIELD: &str = "devices";

/// An owned response body.
///
/// Filled by the executor for one exchange and handed to the caller,
/// which fully consumes it before the next exchange; the buffer is
/// released on drop, error paths included. An empty envelope means the
/// exchange produced no body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Envelope {
    buf: Vec<u8>,
}

impl Envelope {
    pub fn new(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Parse the body as JSON.
    pub fn to_value(&self) -> Result<Value, Error> {
        serde_json::from_slice(&self.buf)
            .map_err(|e| Error::MalformedEnvelope(format!("not valid JSON: {e}")))
    }
}

impl From<Vec<u8>> for Envelope {
    fn from(buf: Vec<u8>) -> Self {
        Self::new(buf)
    }
}

/// Validate a wrapped single-record response and return the bare record.
///
/// Requires the body to be a JSON object whose `"devices"` field is an
/// array of exactly one element; the element is re-serialized standalone
/// into a fresh envelope. On failure the input is untouched and nothing
/// partial is produced. The parse tree is scope-bound — nothing survives
/// the call.
pub fn validate_single(raw: &Envelope) -> Result<Envelope, Error> {
    let root: Value = raw.to_value()?;

    let Value::Object(fields) = root else {
        return Err(Error::MalformedEnvelope(
            "top-level value is not an object".into(),
        ));
    };

    let Some(wrapped) = fields.get(WRAPPER_FIELD) else {
        return Err(Error::MalformedEnvelope(format!(
            "missing {WRAPPER_FIELD:?} field"
        )));
    };

    let Value::Array(records) = wrapped else {
        return Err(Error::MalformedEnvelope(format!(
            "{WRAPPER_FIELD:?} is not an array"
        )));
    };

    if records.len() != 1 {
        return Err(Error::MalformedEnvelope(format!(
            "expected exactly one record, got {}",
            records.len()
        )));
    }

    let body = serde_json::to_vec(&records[0])
        .map_err(|e| Error::MalformedEnvelope(format!("record re-serialization failed: {e}")))?;

    Ok(Envelope::new(body))
}
