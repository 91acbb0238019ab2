// Endpoint derivation for the device registry.
//
// Built exactly once by `HttpTransport::probe` and read-only afterwards:
// base host URL plus the two collection URLs every capability targets.

use tokio::net::lookup_host;
use url::Url;

use crate::error::Error;

/// The three registry URLs derived from a host and port.
///
/// `devices` is the device-collection root (`{base}/devices`), `data` the
/// data-collection root (`{base}/data`). Nothing mutates the set after
/// construction; concurrent capability calls read it freely.
#[derive(Debug, Clone)]
pub struct EndpointSet {
    host: String,
    port: u16,
    base: Url,
    devices: Url,
    data: Url,
}

impl EndpointSet {
    /// Resolve `host` and derive the endpoint set.
    ///
    /// `host` may be a bare name (`registry.example.com`) or carry an
    /// explicit scheme; bare names default to `http`. Fails with
    /// [`Error::Unreachable`] when the name does not resolve — the probe
    /// step is the one place a bad host is caught early instead of on the
    /// first exchange.
    pub async fn resolve(host: &str, port: u16) -> Result<Self, Error> {
        let raw = if host.contains("://") {
            host.to_owned()
        } else {
            format!("http://{host}")
        };

        let mut base = Url::parse(&raw)
            .map_err(|e| Error::InvalidArgument(format!("invalid host {host:?}: {e}")))?;
        let name = base
            .host_str()
            .ok_or_else(|| Error::InvalidArgument(format!("host {host:?} has no host part")))?
            .to_owned();
        if base.set_port(Some(port)).is_err() {
            return Err(Error::InvalidArgument(format!(
                "cannot apply port {port} to {host:?}"
            )));
        }

        let mut addrs =
            lookup_host((name.as_str(), port))
                .await
                .map_err(|e| Error::Unreachable {
                    host: name.clone(),
                    reason: e.to_string(),
                })?;
        if addrs.next().is_none() {
            return Err(Error::Unreachable {
                host: name.clone(),
                reason: "no addresses returned".into(),
            });
        }

        let devices = join_segment(&base, "devices")?;
        let data = join_segment(&base, "data")?;

        Ok(Self {
            host: name,
            port,
            base,
            devices,
            data,
        })
    }

    /// The resolved host name (no scheme, no port).
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The base registry URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The device-collection URL.
    pub fn devices(&self) -> Url {
        self.devices.clone()
    }

    /// `{base}/devices/{uuid}` — one device's record.
    pub fn device(&self, uuid: &str) -> Url {
        push_segment(&self.devices, uuid)
    }

    /// `{base}/data/{uuid}` — one device's data collection.
    pub fn data(&self, uuid: &str) -> Url {
        push_segment(&self.data, uuid)
    }
}

fn join_segment(base: &Url, segment: &str) -> Result<Url, Error> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::InvalidArgument(format!("{base} cannot carry a path")))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

fn push_segment(base: &Url, segment: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.push(segment);
    }
    url
}
