//! Bus adapter for the PCA9555 I2C GPIO expander
//!
//! A thin adaptation layer over a command-link I2C controller: bus
//! bring-up, framed byte-stream send, and framed byte-stream receive.
//! Register semantics (pin direction, polarity, interrupt masks) stay
//! with the caller, who supplies register addresses and payloads.
//!
//! The adapter owns the controller it was initialized with, so the bus
//! instance and its lifecycle travel with the [`Pca9555Bus`] handle
//! instead of living in ambient global state. `&mut self` on every
//! transaction enforces the single-owner access the bus requires.
//!
//! ```ignore
//! let config = BusConfig::standard(0, 21, 22);
//! let mut bus = Pca9555Bus::new(controller, config)?;
//! bus.send(0x20, &[0x02, 0xFF, 0x00])?;
//! let mut input = [0u8; 2];
//! bus.receive(0x20, &mut input)?;
//! ```

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

mod bus;
mod compat;
mod error;

pub use bus::{Pca9555Bus, READ_TIMEOUT_MS, WRITE_TIMEOUT_MS};
pub use error::BusError;

pub use pca9555_hal as hal;
