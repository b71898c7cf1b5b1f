//! Controller abstraction for the PCA9555 bus adapter
//!
//! This crate defines the seam between the bus adapter and whatever
//! vendor I2C controller stack it runs on. The adapter only depends on
//! the capabilities expressed here, never on a concrete controller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  pca9555 (bus adapter)                  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pca9555-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ vendor I2C    │       │ mock (tests)  │
//! │ controller    │       │               │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::I2cController`] - bus configuration, installation, and
//!   transaction submission
//! - [`i2c::CommandLink`] - framing of one transaction (start, address,
//!   data, stop)

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;
#[cfg(feature = "mock")]
pub mod mock;

// Re-export key types at crate root for convenience
pub use i2c::{Ack, BusConfig, BusParams, CommandLink, I2cController, Mode};
