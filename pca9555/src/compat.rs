//! `embedded-hal` I2C integration
//!
//! Lets register-level expander crates drive the adapter through the
//! standard blocking [`embedded_hal::i2c::I2c`] trait. Each operation
//! is framed with its own (repeated) start and address byte; the whole
//! list runs as one command link with a single stop, so a
//! write-then-read becomes the usual repeated-start register access.

use core::fmt;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};
use pca9555_hal::{CommandLink, I2cController};

use crate::bus::{Pca9555Bus, READ_TIMEOUT_MS, WRITE_TIMEOUT_MS};
use crate::error::BusError;

impl<E: fmt::Debug> embedded_hal::i2c::Error for BusError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            BusError::InvalidLength => ErrorKind::Other,
            // The controller error is opaque at this level; callers
            // needing the detail match on BusError directly.
            BusError::ConfigFailed(_)
            | BusError::InstallFailed(_)
            | BusError::TransactionFailed(_) => ErrorKind::Other,
        }
    }
}

impl<C> ErrorType for Pca9555Bus<C>
where
    C: I2cController,
    C::Error: fmt::Debug,
{
    type Error = BusError<C::Error>;
}

impl<C> I2c<SevenBitAddress> for Pca9555Bus<C>
where
    C: I2cController + 'static,
    C::Error: fmt::Debug,
{
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if operations.is_empty() {
            return Ok(());
        }
        let timeout_ms = if operations
            .iter()
            .any(|op| matches!(op, Operation::Read(_)))
        {
            READ_TIMEOUT_MS
        } else {
            WRITE_TIMEOUT_MS
        };
        let interface = self.config.interface;
        let mut link = self.controller.begin().map_err(BusError::TransactionFailed)?;
        let mut outcome = Ok(());
        for op in operations.iter_mut() {
            if outcome.is_err() {
                break;
            }
            outcome = match op {
                Operation::Write(bytes) => {
                    Self::frame_write_segment(&mut link, address, *bytes)
                }
                Operation::Read(buf) => {
                    if buf.is_empty() {
                        // Nothing to frame for an empty read.
                        Ok(())
                    } else {
                        let mid = buf.len() - 1;
                        let (head, tail) = buf.split_at_mut(mid);
                        Self::frame_read_segment(&mut link, address, head, &mut tail[0])
                    }
                }
            };
        }
        if outcome.is_ok() {
            outcome = link.stop();
        }
        if outcome.is_ok() {
            outcome = self.controller.submit(interface, &mut link, timeout_ms);
        }
        self.controller.release(link);
        outcome.map_err(|e| {
            error!("i2c transaction on {=u8:x} failed", address);
            BusError::TransactionFailed(e)
        })
    }
}
