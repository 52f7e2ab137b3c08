//! # kinton - device-side helper for the Kinton IoT cloud
//!
//! A mote registers once with its fleet over HTTP, receiving an identity and
//! a secret, then keeps an MQTT session to the broker alive and routes every
//! inbound message to the callback bound to its topic. Everything runs from
//! the caller's loop with fixed-size buffers and no allocator.
//!
//! ## Modules
//!
//! - [`cloud`]: the [`Device`](cloud::Device) facade, credentials, the topic
//!   registry, registration and the connection manager
//! - [`network`]: transport traits plus the bundled HTTP and MQTT clients
//! - [`storage`]: flash-style storage traits used to persist credentials
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! kinton = "0.1.0"
//! ```
//!
//! ```rust
//! use core::cell::Cell;
//! use kinton::cloud::TopicRegistry;
//!
//! let last = Cell::new(0u8);
//! let mut on_level = |payload: &[u8]| last.set(payload.first().copied().unwrap_or(0));
//!
//! let mut registry: TopicRegistry<'_, 8> = TopicRegistry::new();
//! registry.on("tank/level", &mut on_level).unwrap();
//! registry.dispatch("tank/level", &[42]);
//! drop(registry);
//! assert_eq!(last.get(), 42);
//! ```
//!
//! ## Optional Features
//!
//! - `std`: build against the standard library (default: disabled)
//! - `defmt`: log through `defmt` and derive `defmt::Format` on error types
//! - `log`: log through the `log` facade

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Transport traits and the HTTP and MQTT clients built on them.
pub mod network;

/// Storage traits for persisting device state.
pub mod storage;

/// The Kinton device context.
pub mod cloud;
