//! Recording mock controller for host-side tests
//!
//! Captures every framing operation and submission in order, counts
//! link releases, and serves scripted bytes to read buffers. A single
//! failure point can be injected to exercise error paths.

use heapless::Vec;

use crate::i2c::{Ack, BusParams, CommandLink, I2cController, Mode};

/// Capacity of the operation log and of recorded write payloads.
pub const LOG_CAPACITY: usize = 32;

/// One recorded controller operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOp {
    /// Start (or repeated start) condition
    Start,
    /// Single outgoing byte
    WriteByte {
        /// The queued byte
        byte: u8,
        /// Acknowledge verification requested
        ack_check: bool,
    },
    /// Outgoing byte sequence (truncated at [`LOG_CAPACITY`] bytes)
    Write {
        /// The queued bytes
        bytes: Vec<u8, LOG_CAPACITY>,
        /// Acknowledge verification requested
        ack_check: bool,
    },
    /// Multi-byte read
    Read {
        /// Number of bytes requested
        len: usize,
        /// Handshake answered for each byte
        ack: Ack,
    },
    /// Single-byte read
    ReadByte {
        /// Handshake answered for the byte
        ack: Ack,
    },
    /// Stop condition
    Stop,
    /// Link submission
    Submit {
        /// Targeted bus instance
        bus: u8,
        /// Timeout handed to the controller
        timeout_ms: u32,
    },
}

/// Controller operation that should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// `configure` fails
    Configure,
    /// `install` fails
    Install,
    /// `begin` fails
    Begin,
    /// `start` fails
    Start,
    /// `write_byte` fails
    WriteByte,
    /// `write` fails
    Write,
    /// `read` fails
    Read,
    /// `read_byte` fails
    ReadByte,
    /// `stop` fails
    Stop,
    /// `submit` fails
    Submit,
}

/// Error produced by the mock controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

/// Byte served to read buffers once the script is exhausted.
const IDLE_BYTE: u8 = 0xFF;

/// Mock I2C controller
///
/// Records configuration, installation, and the framing sequence of
/// every released link for test verification. Read data is served from
/// a pre-programmed script when a link is submitted.
#[derive(Debug, Default)]
pub struct MockController {
    ops: Vec<LinkOp, LOG_CAPACITY>,
    configured: Vec<(u8, BusParams), 4>,
    installed: Vec<u8, 4>,
    read_script: Vec<u8, LOG_CAPACITY>,
    script_pos: usize,
    released: usize,
    fail: Option<FailPoint>,
}

impl MockController {
    /// Create a mock with an empty log and no failure injection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the given operation fail with [`MockError`].
    pub fn fail_at(&mut self, point: FailPoint) {
        self.fail = Some(point);
    }

    /// Pre-program the bytes served to read buffers.
    pub fn set_read_script(&mut self, bytes: &[u8]) {
        self.read_script.clear();
        self.read_script.extend_from_slice(bytes).ok();
        self.script_pos = 0;
    }

    /// Framing operations of all released links, in emission order.
    pub fn ops(&self) -> &[LinkOp] {
        &self.ops
    }

    /// Parameter sets applied via `configure`, per bus instance.
    pub fn configured(&self) -> &[(u8, BusParams)] {
        &self.configured
    }

    /// Bus instances a driver was installed for.
    pub fn installed(&self) -> &[u8] {
        &self.installed
    }

    /// Number of links handed back via `release`.
    pub fn released(&self) -> usize {
        self.released
    }

    fn trip(&self, point: FailPoint) -> Result<(), MockError> {
        if self.fail == Some(point) {
            Err(MockError)
        } else {
            Ok(())
        }
    }

    fn next_script_byte(&mut self) -> u8 {
        let byte = self
            .read_script
            .get(self.script_pos)
            .copied()
            .unwrap_or(IDLE_BYTE);
        self.script_pos += 1;
        byte
    }
}

/// Command link recorded by [`MockController`].
#[derive(Debug)]
pub struct MockLink<'buf> {
    ops: Vec<LinkOp, LOG_CAPACITY>,
    reads: Vec<&'buf mut [u8], 8>,
    fail: Option<FailPoint>,
}

impl MockLink<'_> {
    fn trip(&self, point: FailPoint) -> Result<(), MockError> {
        if self.fail == Some(point) {
            Err(MockError)
        } else {
            Ok(())
        }
    }
}

impl<'buf> CommandLink<'buf> for MockLink<'buf> {
    type Error = MockError;

    fn start(&mut self) -> Result<(), MockError> {
        self.trip(FailPoint::Start)?;
        self.ops.push(LinkOp::Start).ok();
        Ok(())
    }

    fn write_byte(&mut self, byte: u8, ack_check: bool) -> Result<(), MockError> {
        self.trip(FailPoint::WriteByte)?;
        self.ops.push(LinkOp::WriteByte { byte, ack_check }).ok();
        Ok(())
    }

    fn write(&mut self, bytes: &'buf [u8], ack_check: bool) -> Result<(), MockError> {
        self.trip(FailPoint::Write)?;
        let mut recorded = Vec::new();
        recorded.extend_from_slice(bytes).ok();
        self.ops
            .push(LinkOp::Write {
                bytes: recorded,
                ack_check,
            })
            .ok();
        Ok(())
    }

    fn read(&mut self, buf: &'buf mut [u8], ack: Ack) -> Result<(), MockError> {
        self.trip(FailPoint::Read)?;
        self.ops.push(LinkOp::Read { len: buf.len(), ack }).ok();
        self.reads.push(buf).ok();
        Ok(())
    }

    fn read_byte(&mut self, byte: &'buf mut u8, ack: Ack) -> Result<(), MockError> {
        self.trip(FailPoint::ReadByte)?;
        self.ops.push(LinkOp::ReadByte { ack }).ok();
        self.reads.push(core::slice::from_mut(byte)).ok();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MockError> {
        self.trip(FailPoint::Stop)?;
        self.ops.push(LinkOp::Stop).ok();
        Ok(())
    }
}

impl I2cController for MockController {
    type Error = MockError;
    type Link<'buf>
        = MockLink<'buf>
    where
        Self: 'buf;

    fn configure(&mut self, bus: u8, params: &BusParams) -> Result<(), MockError> {
        self.trip(FailPoint::Configure)?;
        self.configured.push((bus, *params)).ok();
        Ok(())
    }

    fn install(&mut self, bus: u8, _mode: Mode) -> Result<(), MockError> {
        self.trip(FailPoint::Install)?;
        // A second install on the same instance fails cleanly, mirroring
        // vendor stacks that reject re-installation.
        if self.installed.contains(&bus) {
            return Err(MockError);
        }
        self.installed.push(bus).ok();
        Ok(())
    }

    fn begin<'buf>(&mut self) -> Result<MockLink<'buf>, MockError>
    where
        Self: 'buf,
    {
        self.trip(FailPoint::Begin)?;
        Ok(MockLink {
            ops: Vec::new(),
            reads: Vec::new(),
            fail: self.fail,
        })
    }

    fn submit<'buf>(
        &mut self,
        bus: u8,
        link: &mut MockLink<'buf>,
        timeout_ms: u32,
    ) -> Result<(), MockError>
    where
        Self: 'buf,
    {
        // The submission is recorded even when it fails: the vendor
        // stack consumed the link either way.
        link.ops.push(LinkOp::Submit { bus, timeout_ms }).ok();
        if self.fail == Some(FailPoint::Submit) {
            return Err(MockError);
        }
        for slot in link.reads.iter_mut() {
            for byte in slot.iter_mut() {
                *byte = self.next_script_byte();
            }
        }
        Ok(())
    }

    fn release<'buf>(&mut self, link: MockLink<'buf>)
    where
        Self: 'buf,
    {
        self.released += 1;
        for op in link.ops {
            self.ops.push(op).ok();
        }
    }
}
