// Codec module - MAVLink v1/v2 framing for HEARTBEAT and SERIAL_CONTROL
//
// Only the two messages the shell needs are understood. Anything else is
// skipped whole since its CRC_EXTRA is unknown.
use super::{ControlFlags, SerialControlFrame, FRAME_PAYLOAD_CAPACITY};
use crate::domain::error::{ShellError, ShellResult};

pub const STX_V1: u8 = 0xFE;
pub const STX_V2: u8 = 0xFD;

pub const MSG_ID_HEARTBEAT: u32 = 0;
pub const MSG_ID_SERIAL_CONTROL: u32 = 126;

const CRC_EXTRA_HEARTBEAT: u8 = 50;
const CRC_EXTRA_SERIAL_CONTROL: u8 = 220;

const HEARTBEAT_LEN: usize = 9;
/// SERIAL_CONTROL without the v2 target extension fields
pub const SERIAL_CONTROL_LEN: usize = 79;
const SERIAL_CONTROL_EXT_LEN: usize = 81;

const V1_HEADER_LEN: usize = 6;
const V2_HEADER_LEN: usize = 10;
const CHECKSUM_LEN: usize = 2;
const SIGNATURE_LEN: usize = 13;
const IFLAG_SIGNED: u8 = 0x01;

/// Wire protocol version of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MavVersion {
    V1,
    V2,
}

/// A checksummed frame pulled off the byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub version: MavVersion,
    pub sequence: u8,
    pub system_id: u8,
    pub component_id: u8,
    pub message_id: u32,
    /// Payload, zero-extended to the message's full length
    pub payload: Vec<u8>,
}

/// Decoded HEARTBEAT fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub custom_mode: u32,
    pub mav_type: u8,
    pub autopilot: u8,
    pub base_mode: u8,
    pub system_status: u8,
    pub mavlink_version: u8,
}

/// Accumulate one byte into an X.25 (CRC-16/MCRF4XX) checksum
pub fn crc_accumulate(byte: u8, crc: u16) -> u16 {
    let mut tmp = byte ^ (crc & 0xFF) as u8;
    tmp ^= tmp << 4;
    let tmp = tmp as u16;
    (crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4)
}

pub fn x25_crc(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |crc, byte| crc_accumulate(*byte, crc))
}

fn frame_crc(covered: &[u8], crc_extra: u8) -> u16 {
    crc_accumulate(crc_extra, x25_crc(covered))
}

/// CRC_EXTRA and maximum payload length of the messages we understand
fn message_info(message_id: u32) -> Option<(u8, usize)> {
    match message_id {
        MSG_ID_HEARTBEAT => Some((CRC_EXTRA_HEARTBEAT, HEARTBEAT_LEN)),
        MSG_ID_SERIAL_CONTROL => Some((CRC_EXTRA_SERIAL_CONTROL, SERIAL_CONTROL_EXT_LEN)),
        _ => None,
    }
}

enum Parse {
    Incomplete,
    Frame(RawFrame, usize),
    Skip(usize),
    Invalid,
}

/// Incremental decoder turning a byte stream into frames
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes read from the transport
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes held back waiting for the rest of a frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Pop the next valid frame, discarding noise and unknown messages
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        loop {
            match self.buffer.iter().position(|b| *b == STX_V1 || *b == STX_V2) {
                Some(start) => {
                    self.buffer.drain(..start);
                }
                None => {
                    self.buffer.clear();
                    return None;
                }
            }

            match self.parse_front() {
                Parse::Incomplete => return None,
                Parse::Frame(frame, used) => {
                    self.buffer.drain(..used);
                    return Some(frame);
                }
                Parse::Skip(used) => {
                    self.buffer.drain(..used);
                }
                Parse::Invalid => {
                    // Drop the false start byte and hunt for the next one
                    self.buffer.drain(..1);
                }
            }
        }
    }

    fn parse_front(&self) -> Parse {
        let buf = &self.buffer;
        if buf.len() < 2 {
            return Parse::Incomplete;
        }
        let payload_len = buf[1] as usize;

        let (version, header_len, signature_len) = if buf[0] == STX_V2 {
            if buf.len() < 3 {
                return Parse::Incomplete;
            }
            let signature_len = if buf[2] & IFLAG_SIGNED != 0 { SIGNATURE_LEN } else { 0 };
            (MavVersion::V2, V2_HEADER_LEN, signature_len)
        } else {
            (MavVersion::V1, V1_HEADER_LEN, 0)
        };

        let total = header_len + payload_len + CHECKSUM_LEN + signature_len;
        if buf.len() < total {
            return Parse::Incomplete;
        }

        let (sequence, system_id, component_id, message_id) = match version {
            MavVersion::V1 => (buf[2], buf[3], buf[4], buf[5] as u32),
            MavVersion::V2 => (
                buf[4],
                buf[5],
                buf[6],
                u32::from_le_bytes([buf[7], buf[8], buf[9], 0]),
            ),
        };

        let Some((crc_extra, max_len)) = message_info(message_id) else {
            return Parse::Skip(total);
        };
        if payload_len > max_len {
            return Parse::Invalid;
        }

        let crc_at = header_len + payload_len;
        let received = u16::from_le_bytes([buf[crc_at], buf[crc_at + 1]]);
        if frame_crc(&buf[1..crc_at], crc_extra) != received {
            return Parse::Invalid;
        }

        // v2 senders strip trailing zero bytes from the payload
        let mut payload = buf[header_len..crc_at].to_vec();
        payload.resize(max_len, 0);

        Parse::Frame(
            RawFrame {
                version,
                sequence,
                system_id,
                component_id,
                message_id,
                payload,
            },
            total,
        )
    }
}

/// Frame builder holding our identity and the outgoing sequence counter
#[derive(Debug)]
pub struct FrameEncoder {
    system_id: u8,
    component_id: u8,
    sequence: u8,
}

impl FrameEncoder {
    pub fn new(system_id: u8, component_id: u8) -> Self {
        Self {
            system_id,
            component_id,
            sequence: 0,
        }
    }

    pub fn encode(
        &mut self,
        version: MavVersion,
        message_id: u32,
        payload: &[u8],
    ) -> ShellResult<Vec<u8>> {
        let (crc_extra, _) = message_info(message_id).ok_or_else(|| {
            ShellError::Protocol(format!("cannot encode unknown message id {}", message_id))
        })?;

        let mut frame = match version {
            MavVersion::V1 => {
                let mut frame = Vec::with_capacity(V1_HEADER_LEN + payload.len() + CHECKSUM_LEN);
                frame.extend_from_slice(&[
                    STX_V1,
                    payload.len() as u8,
                    self.sequence,
                    self.system_id,
                    self.component_id,
                    message_id as u8,
                ]);
                frame.extend_from_slice(payload);
                frame
            }
            MavVersion::V2 => {
                let trimmed = payload
                    .iter()
                    .rposition(|b| *b != 0)
                    .map_or(1, |last| last + 1)
                    .min(payload.len());
                let id = message_id.to_le_bytes();
                let mut frame = Vec::with_capacity(V2_HEADER_LEN + trimmed + CHECKSUM_LEN);
                frame.extend_from_slice(&[
                    STX_V2,
                    trimmed as u8,
                    0,
                    0,
                    self.sequence,
                    self.system_id,
                    self.component_id,
                    id[0],
                    id[1],
                    id[2],
                ]);
                frame.extend_from_slice(&payload[..trimmed]);
                frame
            }
        };

        let crc = frame_crc(&frame[1..], crc_extra);
        frame.extend_from_slice(&crc.to_le_bytes());
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }
}

pub fn decode_heartbeat(payload: &[u8]) -> ShellResult<Heartbeat> {
    if payload.len() < HEARTBEAT_LEN {
        return Err(ShellError::Protocol(format!(
            "HEARTBEAT payload too short: {} bytes",
            payload.len()
        )));
    }

    Ok(Heartbeat {
        custom_mode: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
        mav_type: payload[4],
        autopilot: payload[5],
        base_mode: payload[6],
        system_status: payload[7],
        mavlink_version: payload[8],
    })
}

/// Serialize a SERIAL_CONTROL payload in wire field order.
///
/// `target` appends the v2 extension fields (target system and component).
pub fn encode_serial_control(frame: &SerialControlFrame, target: Option<(u8, u8)>) -> Vec<u8> {
    let mut payload = Vec::with_capacity(SERIAL_CONTROL_EXT_LEN);
    payload.extend_from_slice(&frame.baudrate.to_le_bytes());
    payload.extend_from_slice(&frame.timeout.to_le_bytes());
    payload.push(frame.device);
    payload.push(frame.flags.bits());
    payload.push(frame.count);
    payload.extend_from_slice(&frame.data);
    if let Some((system, component)) = target {
        payload.push(system);
        payload.push(component);
    }
    payload
}

pub fn decode_serial_control(payload: &[u8]) -> ShellResult<SerialControlFrame> {
    if payload.len() < SERIAL_CONTROL_LEN {
        return Err(ShellError::Protocol(format!(
            "SERIAL_CONTROL payload too short: {} bytes",
            payload.len()
        )));
    }

    let mut data = [0u8; FRAME_PAYLOAD_CAPACITY];
    data.copy_from_slice(&payload[9..9 + FRAME_PAYLOAD_CAPACITY]);

    Ok(SerialControlFrame {
        baudrate: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
        timeout: u16::from_le_bytes([payload[4], payload[5]]),
        device: payload[6],
        flags: ControlFlags::from_bits(payload[7]),
        count: payload[8],
        data,
    })
}
