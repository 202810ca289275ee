//! Frame encoding and decoding for the turret serial link.
//!
//! Frame format:
//! - START (1 byte): 0xAA synchronization byte
//! - LENGTH (1 byte): payload length (0-250)
//! - KIND (1 byte): message kind identifier
//! - PAYLOAD (0-250 bytes): postcard-encoded message body
//! - CHECKSUM (1 byte): XOR of LENGTH, KIND, and all PAYLOAD bytes

use heapless::Vec;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0xAA;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 250;

/// Framing overhead: START + LENGTH + KIND + CHECKSUM
pub const FRAME_OVERHEAD: usize = 4;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + FRAME_OVERHEAD;

/// Errors that can occur during frame parsing, encoding or message decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch
    InvalidChecksum,
    /// LENGTH byte larger than the maximum payload
    InvalidLength,
    /// Output buffer too small for encoding
    BufferTooSmall,
    /// Frame kind is not valid in this direction
    UnknownKind(u8),
    /// Payload could not be decoded into the message body
    Malformed,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message kind identifier
    pub kind: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a frame with the given kind and payload
    pub fn new(kind: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { kind, payload })
    }

    /// Create a frame with no payload
    pub fn empty(kind: u8) -> Self {
        Self {
            kind,
            payload: Vec::new(),
        }
    }

    /// Total encoded length of this frame
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }

    fn checksum(length: u8, kind: u8, payload: &[u8]) -> u8 {
        payload.iter().fold(length ^ kind, |acc, b| acc ^ b)
    }

    /// Encode this frame into `buffer`, returning the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let total = self.encoded_len();
        let out = buffer.get_mut(..total).ok_or(FrameError::BufferTooSmall)?;

        let length = self.payload.len() as u8;
        let (header, rest) = out.split_at_mut(3);
        header.copy_from_slice(&[FRAME_START, length, self.kind]);

        let (body, tail) = rest.split_at_mut(self.payload.len());
        body.copy_from_slice(&self.payload);
        tail[0] = Self::checksum(length, self.kind, &self.payload);

        Ok(total)
    }
}

/// Where the parser is inside the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Sync,
    Length,
    Kind { length: u8 },
    Payload { length: u8, kind: u8 },
    Checksum { length: u8, kind: u8 },
}

/// Incremental frame parser fed one byte at a time from the UART
#[derive(Debug, Clone)]
pub struct FrameParser {
    stage: Stage,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new parser waiting for a START byte
    pub const fn new() -> Self {
        Self {
            stage: Stage::Sync,
            payload: Vec::new(),
        }
    }

    /// Drop any partial frame and wait for the next START byte
    pub fn reset(&mut self) {
        self.stage = Stage::Sync;
        self.payload.clear();
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on a framing error.
    /// The parser resynchronizes on the next START byte after an error.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.stage {
            Stage::Sync => {
                // Bytes between frames are line noise
                if byte == FRAME_START {
                    self.stage = Stage::Length;
                }
                Ok(None)
            }
            Stage::Length => {
                if byte as usize > MAX_PAYLOAD_SIZE {
                    self.reset();
                    return Err(FrameError::InvalidLength);
                }
                self.stage = Stage::Kind { length: byte };
                Ok(None)
            }
            Stage::Kind { length } => {
                self.payload.clear();
                self.stage = if length == 0 {
                    Stage::Checksum { length, kind: byte }
                } else {
                    Stage::Payload { length, kind: byte }
                };
                Ok(None)
            }
            Stage::Payload { length, kind } => {
                // Capacity is guaranteed by the LENGTH check above
                let _ = self.payload.push(byte);
                if self.payload.len() == length as usize {
                    self.stage = Stage::Checksum { length, kind };
                }
                Ok(None)
            }
            Stage::Checksum { length, kind } => {
                let expected = Frame::checksum(length, kind, &self.payload);
                let frame = (byte == expected).then(|| Frame {
                    kind,
                    payload: self.payload.clone(),
                });
                self.reset();
                frame.map(Some).ok_or(FrameError::InvalidChecksum)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode(frame: &Frame) -> std::vec::Vec<u8> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = frame.encode(&mut buffer).unwrap();
        buffer[..len].to_vec()
    }

    fn parse_all(parser: &mut FrameParser, bytes: &[u8]) -> std::vec::Vec<Result<Frame, FrameError>> {
        bytes
            .iter()
            .filter_map(|&b| parser.feed(b).transpose())
            .collect()
    }

    #[test]
    fn test_empty_frame_layout() {
        let bytes = encode(&Frame::empty(0x02));
        assert_eq!(bytes, [FRAME_START, 0, 0x02, 0x02]);
    }

    #[test]
    fn test_payload_checksum_covers_length_and_kind() {
        let bytes = encode(&Frame::new(0x01, &[0x10, 0x01]).unwrap());
        assert_eq!(bytes.len(), 6);
        assert_eq!(bytes[5], 2 ^ 0x01 ^ 0x10 ^ 0x01);
    }

    #[test]
    fn test_encode_into_short_buffer() {
        let frame = Frame::new(0x20, &[1, 2, 3]).unwrap();
        let mut buffer = [0u8; 6];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_corrupt_checksum_rejected_then_recovers() {
        let good = encode(&Frame::new(0x01, &[7, 8]).unwrap());
        let mut bad = good.clone();
        let last = bad.len() - 1;
        bad[last] ^= 0x55;

        let mut stream = bad;
        stream.extend_from_slice(&good);

        let mut parser = FrameParser::new();
        let results = parse_all(&mut parser, &stream);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Err(FrameError::InvalidChecksum));
        assert_eq!(results[1].as_ref().unwrap().payload.as_slice(), &[7, 8]);
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed(FRAME_START), Ok(None));
        assert_eq!(parser.feed(251), Err(FrameError::InvalidLength));
    }

    #[test]
    fn test_payload_too_large() {
        let large = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(Frame::new(0x20, &large), Err(FrameError::PayloadTooLarge));
    }

    proptest! {
        #[test]
        fn prop_frames_survive_leading_noise(
            noise in proptest::collection::vec(any::<u8>().prop_filter("not start", |b| *b != FRAME_START), 0..16),
            kind in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..MAX_PAYLOAD_SIZE),
        ) {
            let frame = Frame::new(kind, &payload).unwrap();
            let mut stream = noise;
            stream.extend_from_slice(&encode(&frame));

            let mut parser = FrameParser::new();
            let results = parse_all(&mut parser, &stream);
            prop_assert_eq!(results, std::vec![Ok(frame)]);
        }
    }
}
