// src/reader/pn532/frame.rs

//! PN532 normal information frames.
//!
//! Layout: `00 00 FF LEN LCS TFI PD0 .. PDn DCS 00`, where `LEN` counts the TFI
//! and data bytes, `LEN + LCS == 0` and `TFI + PD0 + .. + PDn + DCS == 0`
//! (all modulo 256).

use crate::common::error::TagError;
use arrayvec::ArrayVec;
use core::fmt::Debug;

/// Start of every frame (preamble byte plus start code).
pub const START_CODE: [u8; 3] = [0x00, 0x00, 0xFF];
pub const POSTAMBLE: u8 = 0x00;

pub const ACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];
pub const NACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00];

/// Frame identifier for host → PN532.
pub const TFI_HOST: u8 = 0xD4;
/// Frame identifier for PN532 → host.
pub const TFI_PN532: u8 = 0xD5;
/// Frame identifier of the application error frame.
pub const TFI_ERROR: u8 = 0x7F;

/// Largest normal frame: header (5) + LEN (255) + DCS + postamble.
pub const MAX_FRAME_LEN: usize = 262;

pub type FrameBuf = ArrayVec<u8, MAX_FRAME_LEN>;

/// Command codes used by the reader backend.
pub mod command {
    pub const GET_FIRMWARE_VERSION: u8 = 0x02;
    pub const SAM_CONFIGURATION: u8 = 0x14;
    pub const RF_CONFIGURATION: u8 = 0x32;
    pub const IN_LIST_PASSIVE_TARGET: u8 = 0x4A;
}

/// Baud rate / modulation selector for `InListPassiveTarget`: 106 kbps type A.
pub const BRTY_106A: u8 = 0x00;

/// Two's-complement checksum: the byte that makes `bytes` sum to zero.
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
        .wrapping_neg()
}

/// Builds the host → PN532 frame for `command` with `params`.
pub fn encode_command<E: Debug>(command: u8, params: &[u8]) -> Result<FrameBuf, TagError<E>> {
    // TFI + command code
    let len = params.len() + 2;
    if len > u8::MAX as usize {
        return Err(TagError::BufferOverflow {
            needed: len + 7,
            got: MAX_FRAME_LEN,
        });
    }

    let mut frame = FrameBuf::new();
    frame.extend(START_CODE);
    frame.push(len as u8);
    frame.push((len as u8).wrapping_neg());
    frame.push(TFI_HOST);
    frame.push(command);
    frame.extend(params.iter().copied());
    let dcs = checksum(&frame[5..]);
    frame.push(dcs);
    frame.push(POSTAMBLE);
    Ok(frame)
}

/// Validates a complete response frame and returns the data following the
/// response code (`command + 1`).
pub fn decode_response<E: Debug>(frame: &[u8], command: u8) -> Result<&[u8], TagError<E>> {
    if frame.len() < 7 || frame[..3] != START_CODE {
        return Err(TagError::Frame);
    }

    let len = frame[3];
    let lcs = frame[4];
    if len.wrapping_add(lcs) != 0 {
        return Err(TagError::Checksum {
            expected: lcs,
            calculated: len.wrapping_neg(),
        });
    }

    let len = len as usize;
    if len == 0 || frame.len() != 5 + len + 2 {
        return Err(TagError::Frame);
    }

    let body = &frame[5..5 + len];
    let dcs = frame[5 + len];
    let calculated = checksum(body);
    if calculated != dcs {
        return Err(TagError::Checksum {
            expected: dcs,
            calculated,
        });
    }
    if frame[6 + len] != POSTAMBLE {
        return Err(TagError::Frame);
    }

    if body[0] == TFI_ERROR {
        return Err(TagError::ErrorFrame);
    }
    if body[0] != TFI_PN532 || body.len() < 2 {
        return Err(TagError::Frame);
    }

    let expected = command.wrapping_add(1);
    if body[1] != expected {
        return Err(TagError::UnexpectedResponse {
            expected,
            got: body[1],
        });
    }

    Ok(&body[2..])
}

/// A type A target reported by `InListPassiveTarget`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveTarget {
    pub sens_res: u16,
    pub sel_res: u8,
    /// NFCID1; empty if the target did not report one.
    pub nfcid: Vec<u8>,
}

/// Parses `InListPassiveTarget` response data for a 106 kbps type A poll.
///
/// Layout: `NbTg [Tg SENS_RES(2) SEL_RES NFCIDLength NFCID1.. (ATS..)]`.
pub fn parse_passive_target<E: Debug>(data: &[u8]) -> Result<Option<PassiveTarget>, TagError<E>> {
    let (&count, rest) = data.split_first().ok_or(TagError::Frame)?;
    if count == 0 {
        return Ok(None);
    }
    if rest.len() < 5 {
        return Err(TagError::Frame);
    }

    let sens_res = u16::from_be_bytes([rest[1], rest[2]]);
    let sel_res = rest[3];
    let id_len = rest[4] as usize;
    let id = rest.get(5..5 + id_len).ok_or(TagError::Frame)?;

    Ok(Some(PassiveTarget {
        sens_res,
        sel_res,
        nfcid: id.to_vec(),
    }))
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    type TestErr = TagError<()>;

    /// Wraps `body` (TFI + data) into a complete frame.
    fn frame_of(body: &[u8]) -> Vec<u8> {
        let mut frame = START_CODE.to_vec();
        frame.push(body.len() as u8);
        frame.push((body.len() as u8).wrapping_neg());
        frame.extend_from_slice(body);
        frame.push(checksum(body));
        frame.push(POSTAMBLE);
        frame
    }

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0x04]), 0xFC);
        assert_eq!(checksum(&[0xD4, 0x4A, 0x01, 0x00]), 0xE1);
    }

    #[test]
    fn test_encode_in_list_passive_target() {
        let frame = encode_command::<()>(command::IN_LIST_PASSIVE_TARGET, &[0x01, BRTY_106A]).unwrap();
        assert_eq!(
            frame.as_slice(),
            &[0x00, 0x00, 0xFF, 0x04, 0xFC, 0xD4, 0x4A, 0x01, 0x00, 0xE1, 0x00]
        );
    }

    #[test]
    fn test_encode_sam_configuration() {
        let frame = encode_command::<()>(command::SAM_CONFIGURATION, &[0x01, 0x14, 0x01]).unwrap();
        assert_eq!(
            frame.as_slice(),
            &[0x00, 0x00, 0xFF, 0x05, 0xFB, 0xD4, 0x14, 0x01, 0x14, 0x01, 0x02, 0x00]
        );
    }

    #[test]
    fn test_encode_rejects_oversized_params() {
        let params = [0u8; 254];
        let result = encode_command::<()>(command::RF_CONFIGURATION, &params);
        assert!(matches!(result, Err(TagError::BufferOverflow { needed: 263, got: 262 })));
    }

    #[test]
    fn test_decode_target_response() {
        let frame = [
            0x00, 0x00, 0xFF, 0x0C, 0xF4, 0xD5, 0x4B, 0x01, 0x01, 0x00, 0x04, 0x08, 0x04, 0xDE,
            0xAD, 0xBE, 0xEF, 0x96, 0x00,
        ];
        let data = decode_response::<()>(&frame, command::IN_LIST_PASSIVE_TARGET).unwrap();
        let target = parse_passive_target::<()>(data).unwrap().unwrap();
        assert_eq!(target.sens_res, 0x0004);
        assert_eq!(target.sel_res, 0x08);
        assert_eq!(target.nfcid, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_decode_no_target() {
        let frame = frame_of(&[TFI_PN532, 0x4B, 0x00]);
        let data = decode_response::<()>(&frame, command::IN_LIST_PASSIVE_TARGET).unwrap();
        assert_eq!(parse_passive_target::<()>(data).unwrap(), None);
    }

    #[test]
    fn test_decode_bad_checksums() {
        let mut frame = frame_of(&[TFI_PN532, 0x15]);
        frame[4] = frame[4].wrapping_add(1);
        let result: Result<_, TestErr> = decode_response(&frame, command::SAM_CONFIGURATION);
        assert!(matches!(result, Err(TagError::Checksum { .. })));

        let mut frame = frame_of(&[TFI_PN532, 0x15]);
        let dcs = frame.len() - 2;
        frame[dcs] ^= 0xFF;
        let result: Result<_, TestErr> = decode_response(&frame, command::SAM_CONFIGURATION);
        assert!(matches!(result, Err(TagError::Checksum { .. })));
    }

    #[test]
    fn test_decode_error_and_unexpected_frames() {
        let error_frame = [0x00, 0x00, 0xFF, 0x01, 0xFF, 0x7F, 0x81, 0x00];
        let result: Result<_, TestErr> = decode_response(&error_frame, command::SAM_CONFIGURATION);
        assert!(matches!(result, Err(TagError::ErrorFrame)));

        let frame = frame_of(&[TFI_PN532, 0x33]);
        let result: Result<_, TestErr> = decode_response(&frame, command::SAM_CONFIGURATION);
        assert!(matches!(
            result,
            Err(TagError::UnexpectedResponse { expected: 0x15, got: 0x33 })
        ));

        let frame = frame_of(&[TFI_HOST, 0x15]);
        let result: Result<_, TestErr> = decode_response(&frame, command::SAM_CONFIGURATION);
        assert!(matches!(result, Err(TagError::Frame)));

        let result: Result<_, TestErr> = decode_response(&ACK_FRAME, command::SAM_CONFIGURATION);
        assert!(matches!(result, Err(TagError::Frame)));
    }

    #[test]
    fn test_parse_truncated_target() {
        assert!(matches!(parse_passive_target::<()>(&[]), Err(TagError::Frame)));
        assert!(matches!(
            parse_passive_target::<()>(&[0x01, 0x01, 0x00, 0x04]),
            Err(TagError::Frame)
        ));
        // NFCID length claims 7 bytes, only 4 present
        assert!(matches!(
            parse_passive_target::<()>(&[0x01, 0x01, 0x00, 0x44, 0x00, 0x07, 1, 2, 3, 4]),
            Err(TagError::Frame)
        ));
    }

    #[test]
    fn test_parse_target_without_nfcid() {
        let target = parse_passive_target::<()>(&[0x01, 0x01, 0x00, 0x04, 0x20, 0x00])
            .unwrap()
            .unwrap();
        assert!(target.nfcid.is_empty());
    }
}
