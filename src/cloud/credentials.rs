//! Device identity and secret.
//!
//! Both start unset. They are filled by registration or by the application
//! (e.g. values provisioned at the factory), and can be persisted so a device
//! registers once rather than on every boot.
//!
//! Persisted record layout, little endian:
//!
//! ```text
//! | "KNT1" | id_len u8 | secret_len u8 | identity | secret | crc32 u32 |
//! ```

use super::error::Error;
use crate::storage::{BlockingErase, ReadStorage, Storage};
use core::fmt;
use heapless::{String, Vec};

/// Longest identity (`uuid`) accepted.
pub const MAX_IDENTITY_LEN: usize = 64;
/// Longest secret accepted.
pub const MAX_SECRET_LEN: usize = 128;

const RECORD_MAGIC: &[u8; 4] = b"KNT1";
const HEADER_LEN: usize = RECORD_MAGIC.len() + 2;
const CRC_LEN: usize = 4;
/// Bytes reserved in storage for the credential record.
pub const RECORD_LEN: usize = HEADER_LEN + MAX_IDENTITY_LEN + MAX_SECRET_LEN + CRC_LEN;

/// Identity/secret pair used as MQTT username/password.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    identity: Option<String<MAX_IDENTITY_LEN>>,
    secret: Option<String<MAX_SECRET_LEN>>,
}

impl Credentials {
    /// Unset credentials.
    pub const fn new() -> Self {
        Self {
            identity: None,
            secret: None,
        }
    }

    /// Replaces both values.
    ///
    /// Either both are stored or, when one does not fit, neither is and the
    /// previous values are kept.
    pub fn set(&mut self, identity: &str, secret: &str) -> Result<(), Error> {
        let identity = String::try_from(identity).map_err(|_| Error::CredentialTooLong)?;
        let secret = String::try_from(secret).map_err(|_| Error::CredentialTooLong)?;
        self.identity = Some(identity);
        self.secret = Some(secret);
        Ok(())
    }

    /// The identity, if set.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// The secret, if set.
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Whether both identity and secret are set.
    pub fn is_complete(&self) -> bool {
        self.identity.is_some() && self.secret.is_some()
    }

    /// Forgets both values.
    pub fn clear(&mut self) {
        self.identity = None;
        self.secret = None;
    }

    /// Writes the record at `offset`, erasing [`RECORD_LEN`] bytes first.
    pub fn save<S: Storage + BlockingErase>(&self, storage: &mut S, offset: u32) -> Result<(), Error> {
        let (Some(identity), Some(secret)) = (&self.identity, &self.secret) else {
            return Err(Error::MissingCredentials);
        };
        let end = offset
            .checked_add(RECORD_LEN as u32)
            .ok_or(Error::Storage)?;

        let mut record: Vec<u8, RECORD_LEN> = Vec::new();
        let mut put = |bytes: &[u8]| record.extend_from_slice(bytes).map_err(|_| Error::Storage);
        put(RECORD_MAGIC)?;
        put(&[identity.len() as u8, secret.len() as u8])?;
        put(identity.as_bytes())?;
        put(secret.as_bytes())?;
        let crc = crc32fast::hash(&record);
        record
            .extend_from_slice(&crc.to_le_bytes())
            .map_err(|_| Error::Storage)?;

        storage
            .erase(offset, end)
            .map_err(|_| Error::Storage)?;
        storage.write(offset, &record).map_err(|_| Error::Storage)?;
        info!("credentials: saved {} byte record", record.len());
        Ok(())
    }

    /// Reads a record written by [`save`](Self::save).
    pub fn load<S: ReadStorage>(storage: &mut S, offset: u32) -> Result<Self, Error> {
        let mut buf = [0u8; RECORD_LEN];
        let (header, rest) = buf.split_at_mut(HEADER_LEN);
        storage.read(offset, header).map_err(|_| Error::Storage)?;
        if &header[..RECORD_MAGIC.len()] != RECORD_MAGIC {
            return Err(Error::CorruptCredentials);
        }
        let identity_len = header[4] as usize;
        let secret_len = header[5] as usize;
        if identity_len > MAX_IDENTITY_LEN || secret_len > MAX_SECRET_LEN {
            return Err(Error::CorruptCredentials);
        }

        let body_len = identity_len + secret_len;
        let body_offset = offset
            .checked_add(HEADER_LEN as u32)
            .ok_or(Error::Storage)?;
        storage
            .read(body_offset, &mut rest[..body_len + CRC_LEN])
            .map_err(|_| Error::Storage)?;

        let signed_len = HEADER_LEN + body_len;
        let stored_crc = u32::from_le_bytes(
            buf[signed_len..signed_len + CRC_LEN]
                .try_into()
                .map_err(|_| Error::CorruptCredentials)?,
        );
        if crc32fast::hash(&buf[..signed_len]) != stored_crc {
            warn!("credentials: stored record fails checksum");
            return Err(Error::CorruptCredentials);
        }

        let identity = core::str::from_utf8(&buf[HEADER_LEN..HEADER_LEN + identity_len])
            .map_err(|_| Error::CorruptCredentials)?;
        let secret = core::str::from_utf8(&buf[HEADER_LEN + identity_len..signed_len])
            .map_err(|_| Error::CorruptCredentials)?;

        let mut credentials = Self::new();
        credentials.set(identity, secret)?;
        Ok(credentials)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity())
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
