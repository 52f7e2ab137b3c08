//! # Non-volatile storage for device state
//!
//! The device keeps exactly one thing across reboots: the credentials obtained
//! at registration. These traits are the seam between that record and the
//! board's flash, EEPROM or FRAM driver.
//!
//! ```rust,no_run
//! use kinton::storage::{BlockingErase, Storage};
//!
//! fn rewrite<S: Storage + BlockingErase>(
//!     storage: &mut S,
//!     start: u32,
//!     record: &[u8],
//! ) -> Result<(), S::Error> {
//!     // Flash must be erased before it can be programmed again.
//!     storage.erase(start, start + record.len() as u32)?;
//!     storage.write(start, record)
//! }
//! ```

#![deny(unsafe_code)]

/// Common error types for storage operations
pub mod error;

/// Re-exports of common traits for convenient importing
pub mod prelude {
    pub use super::{BlockingErase, ReadStorage, Storage};
}

/// Trait for reading data from storage devices.
pub trait ReadStorage {
    /// Associated error type for read operations
    type Error: core::fmt::Debug;

    /// Fill `bytes` from `offset`.
    ///
    /// Fails when the range runs past [`capacity`](Self::capacity) or the
    /// device itself reports an error.
    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error>;

    /// Total capacity of the device in bytes.
    fn capacity(&self) -> usize;
}

/// Trait for storage devices that support both read and write operations.
pub trait Storage: ReadStorage {
    /// Write `bytes` at `offset`.
    ///
    /// Whether an unerased location can be overwritten depends on the
    /// technology; flash callers pair this with [`BlockingErase`].
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Trait for storage devices that need an explicit erase before writing.
///
/// Erased bytes read back as `0xFF`. Devices with erase granularity
/// requirements expect `from`/`to` to be aligned accordingly.
pub trait BlockingErase: Storage {
    /// Erase `from..to`.
    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error>;
}

/// Value of an erased byte.
pub const ERASED_BYTE: u8 = 0xFF;

/// RAM-backed storage with flash semantics, for hosts and tests.
#[derive(Debug, Clone)]
pub struct MemoryStorage<const N: usize> {
    memory: [u8; N],
}

impl<const N: usize> MemoryStorage<N> {
    /// A fully erased device.
    pub fn new() -> Self {
        Self {
            memory: [ERASED_BYTE; N],
        }
    }

    /// Raw contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.memory
    }

    /// Raw contents, for fault injection.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, error::Error> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(error::Error::OutOfBounds)?;
        if end > N {
            return Err(error::Error::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl<const N: usize> Default for MemoryStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ReadStorage for MemoryStorage<N> {
    type Error = error::Error;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.memory[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Storage for MemoryStorage<N> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        self.memory[range].copy_from_slice(bytes);
        Ok(())
    }
}

impl<const N: usize> BlockingErase for MemoryStorage<N> {
    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from > to {
            return Err(error::Error::OutOfBounds);
        }
        let range = self.range(from, (to - from) as usize)?;
        self.memory[range].fill(ERASED_BYTE);
        Ok(())
    }
}
