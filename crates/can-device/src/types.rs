use bitflags::bitflags;
use core::fmt;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Largest payload of a classic CAN frame.
pub const CLASSIC_MAX_LEN: usize = 8;

/// Payload sizes an FD frame may carry.
const FD_LENGTHS: [usize; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

/// 11-bit or 29-bit CAN identifier
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CanId {
    raw: u32,
    extended: bool,
}

impl CanId {
    pub fn standard(id11: u16) -> Option<Self> {
        if id11 <= 0x7FF {
            Some(Self {
                raw: id11 as u32,
                extended: false,
            })
        } else {
            None
        }
    }

    pub fn extended(id29: u32) -> Option<Self> {
        if id29 <= 0x1FFF_FFFF {
            Some(Self {
                raw: id29,
                extended: true,
            })
        } else {
            None
        }
    }

    /// Builds an id from a raw value and the format it was received with.
    pub fn from_raw(raw: u32, extended: bool) -> Option<Self> {
        if extended {
            Self::extended(raw)
        } else {
            u16::try_from(raw).ok().and_then(Self::standard)
        }
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }
    pub fn is_extended(&self) -> bool {
        self.extended
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "0x{raw:08X}", raw = self.raw)
        } else {
            write!(f, "0x{raw:03X}", raw = self.raw)
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Data,
    RemoteRequest,
    Error,
}

bitflags! {
    /// Error categories carried by an error frame.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct FrameErrors: u32 {
        const TRANSMISSION_TIMEOUT = 1 << 0;
        /// Bit position in payload byte 0.
        const LOST_ARBITRATION = 1 << 1;
        const CONTROLLER = 1 << 2;
        const PROTOCOL_VIOLATION = 1 << 3;
        const TRANSCEIVER = 1 << 4;
        const MISSING_ACKNOWLEDGMENT = 1 << 5;
        const BUS_OFF = 1 << 6;
        const BUS = 1 << 7;
        const CONTROLLER_RESTART = 1 << 8;
        const UNKNOWN = 1 << 9;
    }
}

/// A transport-neutral CAN frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CanFrame {
    pub id: CanId,
    pub frame_type: FrameType,
    pub payload: Vec<u8>,
    /// Flexible data rate format.
    pub fd: bool,
    /// Only meaningful for [`FrameType::Error`].
    pub errors: FrameErrors,
    pub timestamp: Option<Timestamp>,
}

impl CanFrame {
    /// Classic data frame; `None` when `data` exceeds 8 bytes.
    pub fn new(id: CanId, data: &[u8]) -> Option<Self> {
        if data.len() > CLASSIC_MAX_LEN {
            return None;
        }
        Some(Self {
            id,
            frame_type: FrameType::Data,
            payload: data.to_vec(),
            fd: false,
            errors: FrameErrors::empty(),
            timestamp: None,
        })
    }

    pub fn remote(id: CanId) -> Self {
        Self {
            id,
            frame_type: FrameType::RemoteRequest,
            payload: Vec::new(),
            fd: false,
            errors: FrameErrors::empty(),
            timestamp: None,
        }
    }

    /// Error frame; the payload holds category details (e.g. the arbitration bit).
    pub fn error(id: CanId, errors: FrameErrors, detail: &[u8]) -> Option<Self> {
        if detail.len() > CLASSIC_MAX_LEN {
            return None;
        }
        Some(Self {
            id,
            frame_type: FrameType::Error,
            payload: detail.to_vec(),
            fd: false,
            errors,
            timestamp: None,
        })
    }

    /// FD data frame. Built for completeness; the VCI adapter refuses to send it.
    pub fn fd(id: CanId, data: &[u8]) -> Option<Self> {
        if !FD_LENGTHS.contains(&data.len()) {
            return None;
        }
        Some(Self {
            id,
            frame_type: FrameType::Data,
            payload: data.to_vec(),
            fd: true,
            errors: FrameErrors::empty(),
            timestamp: None,
        })
    }

    pub fn is_extended(&self) -> bool {
        self.id.is_extended()
    }

    /// Checks payload length against the frame format.
    pub fn is_valid(&self) -> bool {
        if self.fd {
            self.frame_type != FrameType::RemoteRequest && FD_LENGTHS.contains(&self.payload.len())
        } else {
            self.payload.len() <= CLASSIC_MAX_LEN
        }
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, self.payload.len())?;
        match self.frame_type {
            FrameType::RemoteRequest => write!(f, " remote"),
            FrameType::Error => {
                write!(f, " error=0x{:X}", self.errors.bits())?;
                for b in &self.payload {
                    write!(f, " {b:02X}")?;
                }
                Ok(())
            }
            FrameType::Data => {
                for b in &self.payload {
                    write!(f, " {b:02X}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timestamp(pub OffsetDateTime);

impl Timestamp {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }
}

/// Descriptor of a controller a device can be opened on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub plugin: String,
    pub name: String,
    pub description: String,
    pub channel: u32,
    pub is_virtual: bool,
    pub has_flexible_data_rate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ranges() {
        assert!(CanId::standard(0x7FF).is_some());
        assert!(CanId::standard(0x800).is_none());
        assert!(CanId::extended(0x1FFF_FFFF).is_some());
        assert!(CanId::extended(0x2000_0000).is_none());
        assert_eq!(CanId::from_raw(0x123, false), CanId::standard(0x123));
        assert!(CanId::from_raw(0x1_0000, false).is_none());
    }

    #[test]
    fn test_classic_validity() {
        let id = CanId::standard(0x10).unwrap();
        assert!(CanFrame::new(id, &[0; 9]).is_none());
        let mut frame = CanFrame::new(id, &[1, 2, 3]).unwrap();
        assert!(frame.is_valid());
        frame.payload = vec![0; 12];
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_fd_validity() {
        let id = CanId::extended(0x1234).unwrap();
        assert!(CanFrame::fd(id, &[0; 10]).is_none());
        let mut frame = CanFrame::fd(id, &[0; 12]).unwrap();
        assert!(frame.is_valid());
        frame.frame_type = FrameType::RemoteRequest;
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_display() {
        let id = CanId::standard(0x123).unwrap();
        let frame = CanFrame::new(id, &[0x01, 0xAB]).unwrap();
        assert_eq!(frame.to_string(), "0x123 [2] 01 AB");
        assert_eq!(CanFrame::remote(id).to_string(), "0x123 [0] remote");
    }
}
