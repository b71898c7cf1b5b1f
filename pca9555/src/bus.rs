//! The bus adapter: initialization and framed transactions

use pca9555_hal::{Ack, BusConfig, BusParams, CommandLink, I2cController, Mode};

use crate::error::BusError;

/// Submit timeout for write transactions, in milliseconds.
pub const WRITE_TIMEOUT_MS: u32 = 2;

/// Submit timeout for read transactions, in milliseconds.
pub const READ_TIMEOUT_MS: u32 = 5;

/// Direction bit OR'd into the shifted device address.
const WRITE_BIT: u8 = 0;
const READ_BIT: u8 = 1;

/// Every outgoing byte expects a device acknowledge.
const ACK_CHECK: bool = true;

pub(crate) fn write_address(device_addr: u8) -> u8 {
    (device_addr << 1) | WRITE_BIT
}

pub(crate) fn read_address(device_addr: u8) -> u8 {
    (device_addr << 1) | READ_BIT
}

/// Handle to an initialized I2C bus instance
///
/// Owns the controller and the configuration it was brought up with,
/// so every transaction targets the configured instance. Transactions
/// are synchronous and blocking; exactly one command link is live per
/// call and it is released before the call returns, on every path.
pub struct Pca9555Bus<C: I2cController> {
    pub(crate) controller: C,
    pub(crate) config: BusConfig,
}

impl<C: I2cController> Pca9555Bus<C> {
    /// Bring up the configured bus instance in master mode
    ///
    /// Applies a master-mode parameter set derived from `config` (both
    /// pull-ups enabled), then installs the controller for the
    /// instance. Configuration failure aborts before any installation
    /// is attempted.
    ///
    /// Re-initializing an instance that is already up is not
    /// guaranteed to succeed; a second install may fail cleanly with
    /// [`BusError::InstallFailed`].
    pub fn new(mut controller: C, config: BusConfig) -> Result<Self, BusError<C::Error>> {
        let params = BusParams {
            mode: Mode::Master,
            sda_pin: config.sda_pin,
            scl_pin: config.scl_pin,
            sda_pullup: true,
            scl_pullup: true,
            clock_hz: config.clock_hz,
        };
        if let Err(e) = controller.configure(config.interface, &params) {
            error!("i2c param config failed on bus {=u8}", config.interface);
            return Err(BusError::ConfigFailed(e));
        }
        if let Err(e) = controller.install(config.interface, Mode::Master) {
            error!("i2c driver install failed on bus {=u8}", config.interface);
            return Err(BusError::InstallFailed(e));
        }
        debug!(
            "i2c bus {=u8} up: sda {=u8} scl {=u8} at {=u32} Hz",
            config.interface,
            config.sda_pin,
            config.scl_pin,
            config.clock_hz
        );
        Ok(Self { controller, config })
    }

    /// The configuration this bus was brought up with.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Tear down the handle and hand the controller back.
    pub fn free(self) -> C {
        self.controller
    }

    /// Send `payload` to the device at `device_addr`
    ///
    /// Frames start, address with the write bit, the payload, and stop
    /// into one atomic transaction and submits it with a fixed
    /// [`WRITE_TIMEOUT_MS`] timeout. An empty payload frames the
    /// address handshake alone. There is no chunking and no partial
    /// retry: the whole payload goes through or the call fails.
    pub fn send<'a>(&mut self, device_addr: u8, payload: &'a [u8]) -> Result<(), BusError<C::Error>>
    where
        C: 'a,
    {
        let interface = self.config.interface;
        let mut link = self.controller.begin().map_err(BusError::TransactionFailed)?;
        let mut outcome = Self::frame_write_segment(&mut link, device_addr, payload);
        if outcome.is_ok() {
            outcome = link.stop();
        }
        if outcome.is_ok() {
            outcome = self
                .controller
                .submit(interface, &mut link, WRITE_TIMEOUT_MS);
        }
        self.controller.release(link);
        outcome.map_err(|e| {
            error!("i2c send to {=u8:x} failed", device_addr);
            BusError::TransactionFailed(e)
        })
    }

    /// Receive `buf.len()` bytes from the device at `device_addr`
    ///
    /// Frames start and address with the read bit, acknowledges every
    /// byte but the last, answers the final byte with no-acknowledge
    /// to end the read, then stop; submits with a fixed
    /// [`READ_TIMEOUT_MS`] timeout.
    ///
    /// An empty buffer is rejected with [`BusError::InvalidLength`]
    /// before the controller is touched.
    pub fn receive<'a>(
        &mut self,
        device_addr: u8,
        buf: &'a mut [u8],
    ) -> Result<(), BusError<C::Error>>
    where
        C: 'a,
    {
        if buf.is_empty() {
            error!("zero-length i2c receive from {=u8:x} rejected", device_addr);
            return Err(BusError::InvalidLength);
        }
        let interface = self.config.interface;
        let mid = buf.len() - 1;
        let (head, tail) = buf.split_at_mut(mid);
        let mut link = self.controller.begin().map_err(BusError::TransactionFailed)?;
        let mut outcome = Self::frame_read_segment(&mut link, device_addr, head, &mut tail[0]);
        if outcome.is_ok() {
            outcome = link.stop();
        }
        if outcome.is_ok() {
            outcome = self.controller.submit(interface, &mut link, READ_TIMEOUT_MS);
        }
        self.controller.release(link);
        outcome.map_err(|e| {
            error!("i2c receive from {=u8:x} failed", device_addr);
            BusError::TransactionFailed(e)
        })
    }

    /// Write `bytes`, then read into `buf`, in one transaction
    ///
    /// The usual register-read shape: address with the write bit and
    /// the register bytes, a repeated start, then the framed read.
    /// Submits with the [`READ_TIMEOUT_MS`] timeout. Rejects an empty
    /// read buffer with [`BusError::InvalidLength`].
    pub fn send_then_receive<'a>(
        &mut self,
        device_addr: u8,
        bytes: &'a [u8],
        buf: &'a mut [u8],
    ) -> Result<(), BusError<C::Error>>
    where
        C: 'a,
    {
        if buf.is_empty() {
            error!("zero-length i2c receive from {=u8:x} rejected", device_addr);
            return Err(BusError::InvalidLength);
        }
        let interface = self.config.interface;
        let mid = buf.len() - 1;
        let (head, tail) = buf.split_at_mut(mid);
        let mut link = self.controller.begin().map_err(BusError::TransactionFailed)?;
        let mut outcome = Self::frame_write_segment(&mut link, device_addr, bytes);
        if outcome.is_ok() {
            outcome = Self::frame_read_segment(&mut link, device_addr, head, &mut tail[0]);
        }
        if outcome.is_ok() {
            outcome = link.stop();
        }
        if outcome.is_ok() {
            outcome = self.controller.submit(interface, &mut link, READ_TIMEOUT_MS);
        }
        self.controller.release(link);
        outcome.map_err(|e| {
            error!("i2c write-read on {=u8:x} failed", device_addr);
            BusError::TransactionFailed(e)
        })
    }

    /// Frame start, address+W, and the outgoing bytes. No stop.
    pub(crate) fn frame_write_segment<'b>(
        link: &mut C::Link<'b>,
        device_addr: u8,
        bytes: &'b [u8],
    ) -> Result<(), C::Error>
    where
        C: 'b,
    {
        link.start()?;
        link.write_byte(write_address(device_addr), ACK_CHECK)?;
        link.write(bytes, ACK_CHECK)
    }

    /// Frame start, address+R, ack-reads for all but the final byte,
    /// and a nack-read for the final byte. No stop.
    pub(crate) fn frame_read_segment<'b>(
        link: &mut C::Link<'b>,
        device_addr: u8,
        head: &'b mut [u8],
        last: &'b mut u8,
    ) -> Result<(), C::Error>
    where
        C: 'b,
    {
        link.start()?;
        link.write_byte(read_address(device_addr), ACK_CHECK)?;
        if !head.is_empty() {
            link.read(head, Ack::Ack)?;
        }
        link.read_byte(last, Ack::Nack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;
    use pca9555_hal::mock::{FailPoint, LinkOp, MockController, MockError};
    use proptest::prelude::*;

    fn cfg() -> BusConfig {
        BusConfig::standard(0, 21, 22)
    }

    fn write_op(bytes: &[u8]) -> LinkOp {
        LinkOp::Write {
            bytes: Vec::from_slice(bytes).unwrap(),
            ack_check: true,
        }
    }

    #[test]
    fn init_configures_then_installs() {
        let mut ctrl = MockController::new();
        {
            let bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
            assert_eq!(bus.config().clock_hz, BusConfig::STANDARD_MODE_HZ);
        }

        assert_eq!(ctrl.installed(), &[0]);
        let (bus, params) = &ctrl.configured()[0];
        assert_eq!(*bus, 0);
        assert_eq!(
            *params,
            BusParams {
                mode: Mode::Master,
                sda_pin: 21,
                scl_pin: 22,
                sda_pullup: true,
                scl_pullup: true,
                clock_hz: 100_000,
            }
        );
    }

    #[test]
    fn config_failure_skips_install() {
        let mut ctrl = MockController::new();
        ctrl.fail_at(FailPoint::Configure);

        let err = Pca9555Bus::new(&mut ctrl, cfg()).err().unwrap();
        assert_eq!(err, BusError::ConfigFailed(MockError));
        assert!(ctrl.installed().is_empty());
    }

    #[test]
    fn install_failure_is_reported() {
        let mut ctrl = MockController::new();
        ctrl.fail_at(FailPoint::Install);

        let err = Pca9555Bus::new(&mut ctrl, cfg()).err().unwrap();
        assert_eq!(err, BusError::InstallFailed(MockError));
    }

    #[test]
    fn second_init_fails_cleanly() {
        let mut ctrl = MockController::new();
        {
            Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
        }

        // The mock rejects a second install on the same instance, as a
        // vendor stack may. The handle reports it as InstallFailed and
        // the controller stays usable.
        let err = Pca9555Bus::new(&mut ctrl, cfg()).err().unwrap();
        assert_eq!(err, BusError::InstallFailed(MockError));
        assert_eq!(ctrl.installed(), &[0]);
    }

    #[test]
    fn send_frames_start_address_payload_stop() {
        let mut ctrl = MockController::new();
        {
            let mut bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
            bus.send(0x20, &[0x01, 0x02, 0x03]).unwrap();
        }

        let expected = [
            LinkOp::Start,
            LinkOp::WriteByte {
                byte: 0x40,
                ack_check: true,
            },
            write_op(&[0x01, 0x02, 0x03]),
            LinkOp::Stop,
            LinkOp::Submit {
                bus: 0,
                timeout_ms: WRITE_TIMEOUT_MS,
            },
        ];
        assert_eq!(ctrl.ops(), expected.as_slice());
        assert_eq!(ctrl.released(), 1);
    }

    #[test]
    fn send_empty_payload_frames_address_alone() {
        let mut ctrl = MockController::new();
        {
            let mut bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
            bus.send(0x20, &[]).unwrap();
        }

        let expected = [
            LinkOp::Start,
            LinkOp::WriteByte {
                byte: 0x40,
                ack_check: true,
            },
            write_op(&[]),
            LinkOp::Stop,
            LinkOp::Submit {
                bus: 0,
                timeout_ms: WRITE_TIMEOUT_MS,
            },
        ];
        assert_eq!(ctrl.ops(), expected.as_slice());
    }

    #[test]
    fn receive_acks_all_but_final_byte() {
        let mut ctrl = MockController::new();
        ctrl.set_read_script(&[0xAA, 0xBB, 0xCC]);

        let mut buf = [0u8; 3];
        {
            let mut bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
            bus.receive(0x21, &mut buf).unwrap();
        }

        assert_eq!(buf, [0xAA, 0xBB, 0xCC]);
        let expected = [
            LinkOp::Start,
            LinkOp::WriteByte {
                byte: 0x43,
                ack_check: true,
            },
            LinkOp::Read {
                len: 2,
                ack: Ack::Ack,
            },
            LinkOp::ReadByte { ack: Ack::Nack },
            LinkOp::Stop,
            LinkOp::Submit {
                bus: 0,
                timeout_ms: READ_TIMEOUT_MS,
            },
        ];
        assert_eq!(ctrl.ops(), expected.as_slice());
    }

    #[test]
    fn single_byte_receive_nacks_immediately() {
        let mut ctrl = MockController::new();
        ctrl.set_read_script(&[0x5A]);

        let mut buf = [0u8; 1];
        {
            let mut bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
            bus.receive(0x21, &mut buf).unwrap();
        }

        assert_eq!(buf, [0x5A]);
        let expected = [
            LinkOp::Start,
            LinkOp::WriteByte {
                byte: 0x43,
                ack_check: true,
            },
            LinkOp::ReadByte { ack: Ack::Nack },
            LinkOp::Stop,
            LinkOp::Submit {
                bus: 0,
                timeout_ms: READ_TIMEOUT_MS,
            },
        ];
        assert_eq!(ctrl.ops(), expected.as_slice());
    }

    #[test]
    fn zero_length_receive_never_touches_the_bus() {
        let mut ctrl = MockController::new();
        {
            let mut bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
            let err = bus.receive(0x21, &mut []).err().unwrap();
            assert_eq!(err, BusError::InvalidLength);
        }

        assert!(ctrl.ops().is_empty());
        assert_eq!(ctrl.released(), 0);
    }

    #[test]
    fn link_released_once_when_submit_fails() {
        let mut ctrl = MockController::new();
        ctrl.fail_at(FailPoint::Submit);
        {
            let mut bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
            let err = bus.send(0x20, &[0x01]).err().unwrap();
            assert_eq!(err, BusError::TransactionFailed(MockError));
        }

        assert_eq!(ctrl.released(), 1);
    }

    #[test]
    fn framing_failure_short_circuits_and_releases() {
        let mut ctrl = MockController::new();
        ctrl.fail_at(FailPoint::WriteByte);
        {
            let mut bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
            let err = bus.send(0x20, &[0x01, 0x02]).err().unwrap();
            assert_eq!(err, BusError::TransactionFailed(MockError));
        }

        // Only the start made it in: the failed address byte aborted
        // the remaining framing steps and the submission.
        assert_eq!(ctrl.ops(), [LinkOp::Start].as_slice());
        assert_eq!(ctrl.released(), 1);
    }

    #[test]
    fn send_then_receive_uses_a_repeated_start() {
        let mut ctrl = MockController::new();
        ctrl.set_read_script(&[0x12, 0x34]);

        let mut buf = [0u8; 2];
        {
            let mut bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
            bus.send_then_receive(0x20, &[0x00], &mut buf).unwrap();
        }

        assert_eq!(buf, [0x12, 0x34]);
        let expected = [
            LinkOp::Start,
            LinkOp::WriteByte {
                byte: 0x40,
                ack_check: true,
            },
            write_op(&[0x00]),
            LinkOp::Start,
            LinkOp::WriteByte {
                byte: 0x41,
                ack_check: true,
            },
            LinkOp::Read {
                len: 1,
                ack: Ack::Ack,
            },
            LinkOp::ReadByte { ack: Ack::Nack },
            LinkOp::Stop,
            LinkOp::Submit {
                bus: 0,
                timeout_ms: READ_TIMEOUT_MS,
            },
        ];
        assert_eq!(ctrl.ops(), expected.as_slice());
        assert_eq!(ctrl.released(), 1);
    }

    #[test]
    fn transactions_target_the_configured_instance() {
        let mut ctrl = MockController::new();
        let mut buf = [0u8; 1];
        {
            let mut bus =
                Pca9555Bus::new(&mut ctrl, BusConfig::fast(1, 4, 5)).unwrap();
            bus.send(0x20, &[0xFF]).unwrap();
            bus.receive(0x20, &mut buf).unwrap();
        }

        let submits: std::vec::Vec<(u8, u32)> = ctrl
            .ops()
            .iter()
            .filter_map(|op| match op {
                LinkOp::Submit { bus, timeout_ms } => Some((*bus, *timeout_ms)),
                _ => None,
            })
            .collect();
        assert_eq!(
            submits,
            std::vec![(1, WRITE_TIMEOUT_MS), (1, READ_TIMEOUT_MS)]
        );
    }

    #[test]
    fn address_bytes_carry_the_direction_bit() {
        assert_eq!(write_address(0x20), 0x40);
        assert_eq!(read_address(0x21), 0x43);
    }

    proptest! {
        #[test]
        fn send_framing_holds_for_any_payload(
            addr in 0u8..0x80,
            payload in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let mut ctrl = MockController::new();
            {
                let mut bus = Pca9555Bus::new(&mut ctrl, cfg()).unwrap();
                bus.send(addr, &payload).unwrap();
            }

            let ops = ctrl.ops();
            prop_assert_eq!(ops.len(), 5);
            prop_assert_eq!(&ops[0], &LinkOp::Start);
            prop_assert_eq!(
                &ops[1],
                &LinkOp::WriteByte { byte: addr << 1, ack_check: true }
            );
            prop_assert_eq!(&ops[2], &write_op(&payload));
            prop_assert_eq!(&ops[3], &LinkOp::Stop);
            prop_assert_eq!(
                &ops[4],
                &LinkOp::Submit { bus: 0, timeout_ms: WRITE_TIMEOUT_MS }
            );
            prop_assert_eq!(ctrl.released(), 1);
        }
    }
}
