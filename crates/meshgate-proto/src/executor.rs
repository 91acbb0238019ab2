// Request executor — one HTTP exchange against the registry.
//
// Verb normalization, auth and content headers, bounded body capture,
// and the status-to-outcome mapping all live here; the capability
// implementations are thin wrappers choosing a target URL.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::credential::Credential;
use crate::envelope::Envelope;
use crate::error::Error;

/// Auth header carrying the device identifier. Wire contract — the
/// registry matches these names verbatim.
pub const HEADER_AUTH_UUID: &str = "meshblu_auth_uuid";

/// Auth header carrying the device token.
pub const HEADER_AUTH_TOKEN: &str = "meshblu_auth_token";

/// Hard cap on response body growth per exchange.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Perform one exchange and return the captured body.
///
/// `method` is case-normalized; anything outside GET/POST/PUT/DELETE is
/// rejected as a caller error. When `credential` is present the auth
/// header pair is attached; when `body` is present the JSON content
/// headers are attached and the body transmitted. The supplied `client`
/// is used as-is — when it belongs to a caller-owned
/// [`Connection`](crate::Connection) its pooled socket is reused and
/// never closed here.
///
/// The mapped status decides the outcome before any body is captured,
/// so error outcomes never hand back an envelope.
pub async fn execute(
    client: &reqwest::Client,
    method: &str,
    target: Url,
    body: Option<&Value>,
    credential: Option<&Credential>,
) -> Result<Envelope, Error> {
    let method = normalize_method(method)?;
    debug!(%method, %target, "registry exchange");

    let mut request = client.request(method, target);

    if let Some(cred) = credential {
        request = request
            .header(HEADER_AUTH_UUID, cred.uuid())
            .header(HEADER_AUTH_TOKEN, cred.token());
    }

    if let Some(body) = body {
        let payload = serde_json::to_vec(body)
            .map_err(|e| Error::InvalidArgument(format!("unserializable body: {e}")))?;
        trace!(bytes = payload.len(), "request body attached");
        request = request
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header("charsets", "utf-8")
            .body(payload);
    }

    let response = request.send().await.map_err(Error::Transport)?;
    let status = response.status();
    debug!(status = status.as_u16(), "registry response");

    map_status(status)?;

    let body = read_capped(response).await?;
    Ok(Envelope::new(body))
}

/// Upper-case and validate the request verb.
fn normalize_method(raw: &str) -> Result<Method, Error> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        other => Err(Error::InvalidArgument(format!(
            "unsupported request method {other:?}"
        ))),
    }
}

/// The exhaustive status mapping. Every caller branches on the resulting
/// kinds — extending this table means revisiting all of them.
fn map_status(status: StatusCode) -> Result<(), Error> {
    match status.as_u16() {
        200 | 201 => Ok(()),
        s @ (401 | 403) => Err(Error::AuthRejected { status: s }),
        404 => Err(Error::NotFound),
        s => Err(Error::Remote { status: s }),
    }
}

/// Accumulate the response body in chunks against [`MAX_BODY_BYTES`].
async fn read_capped(mut response: reqwest::Response) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(Error::Transport)? {
        if buf.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(Error::BodyTooLarge {
                limit: MAX_BODY_BYTES,
            });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verbs_are_case_normalized() {
        assert_eq!(normalize_method("get").unwrap(), Method::GET);
        assert_eq!(normalize_method("GET").unwrap(), Method::GET);
        assert_eq!(normalize_method("pOsT").unwrap(), Method::POST);
        assert_eq!(normalize_method("put").unwrap(), Method::PUT);
        assert_eq!(normalize_method("Delete").unwrap(), Method::DELETE);
    }

    #[test]
    fn unknown_verb_is_a_caller_error() {
        for verb in ["PATCH", "HEAD", "OPTIONS", ""] {
            assert!(
                matches!(normalize_method(verb), Err(Error::InvalidArgument(_))),
                "{verb:?} should be rejected"
            );
        }
    }

    #[test]
    fn status_mapping_is_total_and_exact() {
        assert!(map_status(StatusCode::OK).is_ok());
        assert!(map_status(StatusCode::CREATED).is_ok());

        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED),
            Err(Error::AuthRejected { status: 401 })
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN),
            Err(Error::AuthRejected { status: 403 })
        ));
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND),
            Err(Error::NotFound)
        ));

        // Everything else — including other 2xx — is a remote error.
        for code in [202, 204, 301, 400, 409, 418, 500, 502, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(
                matches!(map_status(status), Err(Error::Remote { status: s }) if s == code),
                "HTTP {code} should map to a remote error"
            );
        }
    }
}
