//! Adapter error types

use core::fmt;

/// Errors surfaced by the bus adapter
///
/// Every failure carries the underlying controller error so callers
/// can distinguish, for instance, a timeout from a rejected parameter
/// set. Nothing is retried internally and no failure is fatal: the
/// caller decides whether to retry, abort, or escalate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E> {
    /// Bus parameter configuration was rejected by the controller
    ConfigFailed(E),
    /// Controller activation failed after successful configuration
    InstallFailed(E),
    /// A framing step or the submission of a transaction failed
    TransactionFailed(E),
    /// A read was requested with an empty buffer
    InvalidLength,
}

impl<E: fmt::Debug> fmt::Display for BusError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::ConfigFailed(e) => write!(f, "bus parameter config failed: {:?}", e),
            BusError::InstallFailed(e) => write!(f, "controller install failed: {:?}", e),
            BusError::TransactionFailed(e) => write!(f, "bus transaction failed: {:?}", e),
            BusError::InvalidLength => write!(f, "zero-length read requested"),
        }
    }
}
