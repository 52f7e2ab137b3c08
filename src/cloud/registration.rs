//! One-shot device registration against the fleet API.
//!
//! `POST {base}{fleet_key}/registerMote` with an empty body. A 200 answer
//! carries `{"uuid": "...", "secret": "..."}`; anything else fails and is not
//! retried.

use super::credentials::Credentials;
use super::error::Error;
use crate::network::Connect;
use crate::network::application::http::{Connector, Response};
use core::fmt::Write as _;
use heapless::String;
use serde::Deserialize;

/// Longest registration URL that can be built.
pub const MAX_URL_LEN: usize = 256;

/// Issues the registration `POST`.
///
/// [`Connector`] is the bundled implementation; tests and alternative stacks
/// provide their own.
pub trait HttpPost {
    /// Transport failure reported by the implementation.
    type Error: core::fmt::Debug;

    /// `POST`s an empty body to `url` and returns the response whatever its status.
    fn post(&mut self, url: &str) -> Result<Response, Self::Error>;
}

impl<N: Connect> HttpPost for Connector<N> {
    type Error = crate::network::error::Error;

    fn post(&mut self, url: &str) -> Result<Response, Self::Error> {
        Connector::post(self, url, None)
    }
}

impl<T: HttpPost + ?Sized> HttpPost for &mut T {
    type Error = T::Error;

    fn post(&mut self, url: &str) -> Result<Response, Self::Error> {
        (**self).post(url)
    }
}

#[derive(Deserialize)]
struct RegistrationResponse<'a> {
    uuid: &'a str,
    secret: &'a str,
}

/// Builds `{base_url}{fleet_key}/registerMote`.
pub fn registration_url(base_url: &str, fleet_key: &str) -> Result<String<MAX_URL_LEN>, Error> {
    let mut url = String::new();
    write!(url, "{}{}/registerMote", base_url, fleet_key).map_err(|_| Error::ConfigTooLong)?;
    Ok(url)
}

/// Registers a device of `fleet_key` and returns the credentials it was given.
pub fn register<H: HttpPost + ?Sized>(
    http: &mut H,
    base_url: &str,
    fleet_key: &str,
) -> Result<Credentials, Error> {
    let url = registration_url(base_url, fleet_key)?;
    info!("registration: POST {}", url.as_str());

    let response = http.post(&url).map_err(|_| {
        error!("registration: transport failure");
        Error::Transport
    })?;
    if response.status_code != 200 {
        warn!("registration: rejected with status {}", response.status_code);
        return Err(Error::Http(response.status_code));
    }

    let credentials = parse_response(&response.body)?;
    info!(
        "registration: registered as {}",
        credentials.identity().unwrap_or_default()
    );
    Ok(credentials)
}

/// Extracts `uuid` and `secret` from a registration answer.
///
/// Extra fields are ignored. Missing or non-string fields, escaped strings
/// and values too long to store are all reported as
/// [`Error::InvalidResponse`].
pub fn parse_response(body: &[u8]) -> Result<Credentials, Error> {
    let (parsed, _) =
        serde_json_core::from_slice::<RegistrationResponse>(body).map_err(|_| {
            warn!("registration: body is not a registration answer");
            Error::InvalidResponse
        })?;
    let mut credentials = Credentials::new();
    credentials
        .set(parsed.uuid, parsed.secret)
        .map_err(|_| Error::InvalidResponse)?;
    Ok(credentials)
}
