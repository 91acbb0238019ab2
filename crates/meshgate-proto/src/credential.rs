use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Device identifier width on the wire: UUID text form,
/// `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
pub const DEVICE_UUID_LEN: usize = 36;

/// Device secret token width on the wire.
pub const DEVICE_TOKEN_LEN: usize = 40;

/// The identifier/token pair authenticating one device to the registry.
///
/// Immutable once issued — the registry hands these out at node creation
/// and the gateway stores them in its configuration; this crate never
/// generates them. Both fields are fixed-width on the wire, so the
/// constructor rejects anything else rather than letting a short value
/// reach the auth headers.
///
/// The token is held as a [`SecretString`] and never appears in `Debug`
/// output or logs.
#[derive(Debug, Clone)]
pub struct Credential {
    uuid: String,
    token: SecretString,
}

impl Credential {
    /// Validate widths and build a credential.
    pub fn new(uuid: impl Into<String>, token: impl Into<String>) -> Result<Self, Error> {
        let uuid = uuid.into();
        let token = token.into();

        check_width("device uuid", &uuid, DEVICE_UUID_LEN)?;
        check_width("device token", &token, DEVICE_TOKEN_LEN)?;

        Ok(Self {
            uuid,
            token: SecretString::from(token),
        })
    }

    /// The device identifier (UUID text form).
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Expose the secret token for wire authentication.
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

fn check_width(what: &str, value: &str, expected: usize) -> Result<(), Error> {
    if value.len() != expected {
        return Err(Error::InvalidArgument(format!(
            "{what} must be exactly {expected} characters, got {}",
            value.len()
        )));
    }
    if !value.chars().all(|c| c.is_ascii_graphic()) {
        return Err(Error::InvalidArgument(format!(
            "{what} contains non-printable characters"
        )));
    }
    Ok(())
}
