//! I2C controller abstractions
//!
//! Provides traits for a command-link style I2C master controller:
//! parameters are applied to a numbered bus instance, a driver is
//! installed for it, and each transaction is framed into an ephemeral
//! command link that is submitted and then released.

/// Per-byte handshake for read operations.
///
/// [`Ack::Ack`] requests more bytes from the device; [`Ack::Nack`]
/// signals the final byte of the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// Acknowledge the byte, more data expected
    Ack,
    /// Do not acknowledge, ends the read
    Nack,
}

/// Bus operating mode.
///
/// Only master mode is supported: the adapter initiates every
/// transaction and never acts as a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// The controller initiates all transactions
    Master,
}

/// Caller-facing bus configuration
///
/// Owned by the caller and immutable once handed to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Identifier of the physical bus instance
    pub interface: u8,
    /// GPIO number of the SDA line
    pub sda_pin: u8,
    /// GPIO number of the SCL line
    pub scl_pin: u8,
    /// Target bus clock frequency in Hz
    pub clock_hz: u32,
}

impl BusConfig {
    /// Standard mode bus clock (100 kHz)
    pub const STANDARD_MODE_HZ: u32 = 100_000;

    /// Fast mode bus clock (400 kHz)
    pub const FAST_MODE_HZ: u32 = 400_000;

    /// Standard mode (100 kHz) configuration
    pub const fn standard(interface: u8, sda_pin: u8, scl_pin: u8) -> Self {
        Self {
            interface,
            sda_pin,
            scl_pin,
            clock_hz: Self::STANDARD_MODE_HZ,
        }
    }

    /// Fast mode (400 kHz) configuration
    pub const fn fast(interface: u8, sda_pin: u8, scl_pin: u8) -> Self {
        Self {
            interface,
            sda_pin,
            scl_pin,
            clock_hz: Self::FAST_MODE_HZ,
        }
    }
}

/// Parameter set applied to a bus instance during initialization
///
/// Derived from a [`BusConfig`] by the adapter; pull-ups are always
/// enabled on both lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusParams {
    /// Operating mode
    pub mode: Mode,
    /// GPIO number of the SDA line
    pub sda_pin: u8,
    /// GPIO number of the SCL line
    pub scl_pin: u8,
    /// Internal pull-up on SDA
    pub sda_pullup: bool,
    /// Internal pull-up on SCL
    pub scl_pullup: bool,
    /// Bus clock frequency in Hz
    pub clock_hz: u32,
}

/// One transaction being framed
///
/// A command link is ephemeral: it is created by
/// [`I2cController::begin`], filled with framing steps, submitted at
/// most once, and handed back to [`I2cController::release`] regardless
/// of the outcome.
///
/// Buffers passed to [`read`](CommandLink::read) and
/// [`read_byte`](CommandLink::read_byte) are borrowed for the life of
/// the link and hold the received bytes once the controller's
/// `submit` has returned `Ok`.
pub trait CommandLink<'buf> {
    /// Error type for framing operations
    type Error;

    /// Queue a start (or repeated start) condition
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Queue a single outgoing byte
    ///
    /// `ack_check` requests verification of the device acknowledge.
    fn write_byte(&mut self, byte: u8, ack_check: bool) -> Result<(), Self::Error>;

    /// Queue a sequence of outgoing bytes
    fn write(&mut self, bytes: &'buf [u8], ack_check: bool) -> Result<(), Self::Error>;

    /// Queue a read into `buf`, answering every byte with `ack`
    fn read(&mut self, buf: &'buf mut [u8], ack: Ack) -> Result<(), Self::Error>;

    /// Queue a read of a single byte, answered with `ack`
    fn read_byte(&mut self, byte: &'buf mut u8, ack: Ack) -> Result<(), Self::Error>;

    /// Queue a stop condition
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// I2C master controller
///
/// The vendor stack behind the bus adapter. Implementations are
/// synchronous and blocking; `submit` returns once the transaction
/// completed or the timeout expired.
///
/// # Safety Invariants
///
/// - A bus instance must be configured and installed before use
/// - Only one owner per bus instance; concurrent access from multiple
///   execution contexts requires external serialization
/// - Device addresses are 7-bit (`0x00..=0x7F`)
pub trait I2cController {
    /// Error type shared by all controller operations
    type Error;

    /// Command link type produced by [`begin`](I2cController::begin)
    type Link<'buf>: CommandLink<'buf, Error = Self::Error>
    where
        Self: 'buf;

    /// Apply a master-mode parameter set to a bus instance
    fn configure(&mut self, bus: u8, params: &BusParams) -> Result<(), Self::Error>;

    /// Install and activate the driver for a bus instance
    ///
    /// Installation is queue-less: transactions are synchronous and
    /// blocking. Installing an already-installed instance is allowed to
    /// fail but must leave the instance usable.
    fn install(&mut self, bus: u8, mode: Mode) -> Result<(), Self::Error>;

    /// Create an empty command link
    fn begin<'buf>(&mut self) -> Result<Self::Link<'buf>, Self::Error>
    where
        Self: 'buf;

    /// Execute a framed link on `bus`, blocking up to `timeout_ms`
    fn submit<'buf>(
        &mut self,
        bus: u8,
        link: &mut Self::Link<'buf>,
        timeout_ms: u32,
    ) -> Result<(), Self::Error>
    where
        Self: 'buf;

    /// Tear down a command link and reclaim its resources
    ///
    /// Must be called exactly once for every link obtained from
    /// [`begin`](I2cController::begin), on success and failure paths
    /// alike.
    fn release<'buf>(&mut self, link: Self::Link<'buf>)
    where
        Self: 'buf;
}

impl<T: I2cController> I2cController for &mut T {
    type Error = T::Error;
    type Link<'buf>
        = T::Link<'buf>
    where
        Self: 'buf;

    fn configure(&mut self, bus: u8, params: &BusParams) -> Result<(), Self::Error> {
        (**self).configure(bus, params)
    }

    fn install(&mut self, bus: u8, mode: Mode) -> Result<(), Self::Error> {
        (**self).install(bus, mode)
    }

    fn begin<'buf>(&mut self) -> Result<Self::Link<'buf>, Self::Error>
    where
        Self: 'buf,
    {
        (**self).begin()
    }

    fn submit<'buf>(
        &mut self,
        bus: u8,
        link: &mut Self::Link<'buf>,
        timeout_ms: u32,
    ) -> Result<(), Self::Error>
    where
        Self: 'buf,
    {
        (**self).submit(bus, link, timeout_ms)
    }

    fn release<'buf>(&mut self, link: Self::Link<'buf>)
    where
        Self: 'buf,
    {
        (**self).release(link)
    }
}
