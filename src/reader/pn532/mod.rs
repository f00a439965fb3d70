// src/reader/pn532/mod.rs

//! NXP PN532 backend over its high-speed UART (HSU).

pub mod frame;

use self::frame::{command, FrameBuf, PassiveTarget, ACK_FRAME, MAX_FRAME_LEN, NACK_FRAME, START_CODE};
use crate::common::{
    blocking::block_with_timeout,
    error::TagError,
    hal_traits::{Sensed, StdTimer, TagReader, Timer},
    tag::TagId,
    timing,
};
use core::time::Duration;
use std::io;
use tracing::{debug, trace};

/// Wake-up preamble for a PN532 sleeping in HSU mode.
const HSU_WAKEUP: [u8; 16] = [
    0x55, 0x55, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Byte transport underneath the PN532 protocol.
pub trait Pn532Link {
    /// Attempts to read a single byte.
    ///
    /// Returns `Err(nb::Error::WouldBlock)` if nothing has arrived yet.
    fn read_byte(&mut self) -> nb::Result<u8, io::Error>;

    /// Writes all of `bytes`.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Drops anything buffered on the receive side.
    fn discard_input(&mut self) -> io::Result<()>;
}

/// Protocol driver for one open PN532.
#[derive(Debug)]
pub struct Pn532<L, T> {
    link: L,
    timer: T,
}

impl<L, T> Pn532<L, T>
where
    L: Pn532Link,
    T: Timer,
{
    pub fn new(link: L, timer: T) -> Self {
        Pn532 { link, timer }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Sends the HSU wake-up preamble and drops whatever the chip echoed.
    pub fn wake_up(&mut self) -> Result<(), TagError> {
        self.link.write_all(&HSU_WAKEUP).map_err(TagError::Io)?;
        self.timer.delay(timing::PN532_WAKEUP_SETTLE);
        self.link.discard_input().map_err(TagError::Io)
    }

    /// Returns `(IC, Ver, Rev, Support)`.
    pub fn firmware_version(&mut self) -> Result<[u8; 4], TagError> {
        let data = self.transceive(command::GET_FIRMWARE_VERSION, &[])?;
        match data.as_slice() {
            [ic, ver, rev, support] => Ok([*ic, *ver, *rev, *support]),
            _ => Err(TagError::Frame),
        }
    }

    /// Normal mode, no secure access module, IRQ line enabled.
    pub fn sam_configuration(&mut self) -> Result<(), TagError> {
        self.transceive(command::SAM_CONFIGURATION, &[0x01, 0x14, 0x01])
            .map(|_| ())
    }

    /// Sets `MxRtyPassiveActivation`, the number of activation retries per
    /// `InListPassiveTarget`. `0xFF` retries forever.
    pub fn set_passive_activation_retries(&mut self, retries: u8) -> Result<(), TagError> {
        // CfgItem 5: MxRtyATR, MxRtyPSL, MxRtyPassiveActivation
        self.transceive(command::RF_CONFIGURATION, &[0x05, 0xFF, 0x01, retries])
            .map(|_| ())
    }

    /// Polls once for a single 106 kbps type A target.
    pub fn list_passive_target(&mut self) -> Result<Option<PassiveTarget>, TagError> {
        let data = self.transceive(command::IN_LIST_PASSIVE_TARGET, &[0x01, frame::BRTY_106A])?;
        frame::parse_passive_target(&data)
    }

    // --- Transaction helpers ---

    fn transceive(&mut self, command: u8, params: &[u8]) -> Result<FrameBuf, TagError> {
        let request = frame::encode_command::<io::Error>(command, params)?;

        self.link.discard_input().map_err(TagError::Io)?;
        self.link.write_all(&request).map_err(TagError::Io)?;
        trace!(command, frame = ?request.as_slice(), "pn532 write");

        let ack = self.read_frame(timing::PN532_ACK_TIMEOUT)?;
        if ack.as_slice() == NACK_FRAME {
            return Err(TagError::Nack(command));
        }
        if ack.as_slice() != ACK_FRAME {
            return Err(TagError::Frame);
        }

        let response = self.read_frame(timing::PN532_RESPONSE_TIMEOUT)?;
        trace!(command, frame = ?response.as_slice(), "pn532 read");
        let data = frame::decode_response::<io::Error>(&response, command)?;

        let mut out = FrameBuf::new();
        out.extend(data.iter().copied());
        Ok(out)
    }

    /// Reads one frame, skipping anything before the start code.
    fn read_frame(&mut self, timeout: Duration) -> Result<FrameBuf, TagError> {
        let mut skipped = 0usize;
        let mut previous = self.read_byte(timeout)?;
        loop {
            let byte = self.read_byte(timeout)?;
            if previous == 0x00 && byte == 0xFF {
                break;
            }
            skipped += 1;
            if skipped > MAX_FRAME_LEN {
                return Err(TagError::Frame);
            }
            previous = byte;
        }

        let mut frame = FrameBuf::new();
        frame.extend(START_CODE);
        let len = self.read_byte(timeout)?;
        let lcs = self.read_byte(timeout)?;
        frame.push(len);
        frame.push(lcs);

        // ACK and NACK carry no body, just the postamble.
        let remaining = match (len, lcs) {
            (0x00, 0xFF) | (0xFF, 0x00) => 1,
            _ => len as usize + 2,
        };
        for _ in 0..remaining {
            let byte = self.read_byte(timeout)?;
            frame.try_push(byte).map_err(|_| TagError::BufferOverflow {
                needed: MAX_FRAME_LEN + 1,
                got: MAX_FRAME_LEN,
            })?;
        }
        Ok(frame)
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TagError> {
        let link = &mut self.link;
        block_with_timeout(&mut self.timer, timeout, timing::PN532_BYTE_POLL, || {
            link.read_byte()
        })
        .map_err(TagError::from)
    }
}

/// [`Pn532Link`] over a `serial2` port.
pub struct SerialLink(serial2::SerialPort);

impl SerialLink {
    pub fn open(path: &str, baud: u32) -> io::Result<Self> {
        let mut port = serial2::SerialPort::open(path, baud)?;
        port.set_read_timeout(timing::PN532_BYTE_READ_TIMEOUT)?;
        Ok(SerialLink(port))
    }
}

impl Pn532Link for SerialLink {
    fn read_byte(&mut self) -> nb::Result<u8, io::Error> {
        let mut byte = [0u8; 1];
        match self.0.read(&mut byte) {
            Ok(1) => Ok(byte[0]),
            Ok(_) => Err(nb::Error::WouldBlock),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Err(nb::Error::WouldBlock)
            }
            Err(e) => Err(nb::Error::Other(e)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.0.write_all(bytes)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.0.discard_input_buffer()
    }
}

fn sensed_from(target: Option<PassiveTarget>) -> Sensed {
    match target {
        Some(target) if target.nfcid.is_empty() => {
            debug!(sens_res = target.sens_res, sel_res = target.sel_res, "target without NFCID");
            Sensed::Unsupported
        }
        Some(target) => Sensed::Tag(TagId::new(target.nfcid)),
        None => Sensed::Empty,
    }
}

/// [`TagReader`] for a PN532 on a serial port. Opened lazily by `reconnect`.
pub struct Pn532Reader {
    port: String,
    baud: u32,
    device: Option<Pn532<SerialLink, StdTimer>>,
}

impl Pn532Reader {
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Pn532Reader {
            port: port.into(),
            baud,
            device: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn open_device(&self) -> Result<Pn532<SerialLink, StdTimer>, TagError> {
        let link = SerialLink::open(&self.port, self.baud).map_err(TagError::Io)?;
        let mut device = Pn532::new(link, StdTimer::new());
        device.wake_up()?;
        device.sam_configuration()?;
        // One activation attempt per sense, so an empty field answers promptly.
        device.set_passive_activation_retries(0x01)?;
        if let Ok([ic, ver, rev, _]) = device.firmware_version() {
            debug!(ic, ver, rev, "pn532 firmware");
        }
        Ok(device)
    }
}

impl TagReader for Pn532Reader {
    type Error = TagError;

    fn sense(&mut self) -> Result<Sensed, TagError> {
        let device = self.device.as_mut().ok_or(TagError::NotConnected)?;
        Ok(sensed_from(device.list_passive_target()?))
    }

    fn reconnect(&mut self) -> Result<(), TagError> {
        self.device = None;
        self.device = Some(self.open_device()?);
        Ok(())
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            debug!(port = %self.port, "pn532 closed");
        }
    }

    fn label(&self) -> String {
        format!("pn532 reader on {}", self.port)
    }
}
