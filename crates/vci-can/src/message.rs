use crate::DriverError;
use bitflags::bitflags;
use can_device::{CanFrame, CanId, FrameErrors, FrameType, CLASSIC_MAX_LEN};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MessageKind {
    #[default]
    Data,
    Error,
}

bitflags! {
    /// Per-message flag byte, laid out like the controller's `bFlags`.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct MessageFlags: u8 {
        /// Extended data length (FD); never produced by this adapter.
        const FD = 0x08;
        const REMOTE = 0x40;
        const EXTENDED = 0x80;
    }
}

/// Native message exchanged with the VCI driver.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DriverMessage {
    pub id: u32,
    pub kind: MessageKind,
    pub flags: MessageFlags,
    pub dlc: u8,
    pub data: [u8; 8],
    /// Error categories, set for [`MessageKind::Error`].
    pub error: u32,
    /// Controller timestamp ticks.
    pub time: u32,
}

impl DriverMessage {
    pub fn payload(&self) -> &[u8] {
        let len = usize::from(self.dlc).min(self.data.len());
        &self.data[..len]
    }
}

impl TryFrom<&CanFrame> for DriverMessage {
    type Error = DriverError;

    fn try_from(frame: &CanFrame) -> Result<Self, Self::Error> {
        if frame.fd {
            return Err(DriverError::Unsupported("flexible data rate frames"));
        }
        if frame.payload.len() > CLASSIC_MAX_LEN {
            return Err(DriverError::InvalidMessage("payload exceeds 8 bytes"));
        }
        let mut msg = DriverMessage {
            id: frame.id.raw(),
            ..Default::default()
        };
        if frame.id.is_extended() {
            msg.flags |= MessageFlags::EXTENDED;
        }
        match frame.frame_type {
            FrameType::Data => {}
            FrameType::RemoteRequest => msg.flags |= MessageFlags::REMOTE,
            FrameType::Error => {
                msg.kind = MessageKind::Error;
                msg.error = frame.errors.bits();
            }
        }
        if frame.frame_type != FrameType::RemoteRequest {
            msg.dlc = frame.payload.len() as u8;
            msg.data[..frame.payload.len()].copy_from_slice(&frame.payload);
        }
        Ok(msg)
    }
}

impl TryFrom<&DriverMessage> for CanFrame {
    type Error = DriverError;

    fn try_from(msg: &DriverMessage) -> Result<Self, Self::Error> {
        if msg.flags.contains(MessageFlags::FD) {
            return Err(DriverError::Unsupported("flexible data rate frames"));
        }
        if usize::from(msg.dlc) > CLASSIC_MAX_LEN {
            return Err(DriverError::InvalidMessage("dlc exceeds 8"));
        }
        let id = CanId::from_raw(msg.id, msg.flags.contains(MessageFlags::EXTENDED))
            .ok_or(DriverError::InvalidMessage("id out of range"))?;
        let (frame_type, payload, errors) = match msg.kind {
            MessageKind::Error => (
                FrameType::Error,
                msg.payload().to_vec(),
                FrameErrors::from_bits_retain(msg.error),
            ),
            MessageKind::Data if msg.flags.contains(MessageFlags::REMOTE) => {
                (FrameType::RemoteRequest, Vec::new(), FrameErrors::empty())
            }
            MessageKind::Data => (FrameType::Data, msg.payload().to_vec(), FrameErrors::empty()),
        };
        Ok(CanFrame {
            id,
            frame_type,
            payload,
            fd: false,
            errors,
            timestamp: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_frame_round_trip() -> anyhow::Result<()> {
        let id = CanId::extended(0x18FF_0102).unwrap();
        let frame = CanFrame::new(id, &[1, 2, 3, 4, 5]).unwrap();
        let msg = DriverMessage::try_from(&frame)?;
        assert_eq!(msg.id, 0x18FF_0102);
        assert_eq!(msg.dlc, 5);
        assert!(msg.flags.contains(MessageFlags::EXTENDED));
        let back = CanFrame::try_from(&msg)?;
        assert_eq!(back, frame);
        Ok(())
    }

    #[test]
    fn test_remote_and_error_round_trip() -> anyhow::Result<()> {
        let id = CanId::standard(0x321).unwrap();
        let remote = CanFrame::remote(id);
        let msg = DriverMessage::try_from(&remote)?;
        assert!(msg.flags.contains(MessageFlags::REMOTE));
        assert!(!msg.flags.contains(MessageFlags::EXTENDED));
        assert_eq!(CanFrame::try_from(&msg)?, remote);

        let errors = FrameErrors::LOST_ARBITRATION | FrameErrors::BUS;
        let error = CanFrame::error(id, errors, &[0x0A]).unwrap();
        let msg = DriverMessage::try_from(&error)?;
        assert_eq!(msg.kind, MessageKind::Error);
        assert_eq!(msg.id, 0x321);
        assert_eq!(msg.error, errors.bits());
        assert_eq!(CanFrame::try_from(&msg)?, error);
        Ok(())
    }

    #[test]
    fn test_fd_frame_rejected() {
        let id = CanId::standard(0x10).unwrap();
        let frame = CanFrame::fd(id, &[0; 16]).unwrap();
        assert!(matches!(
            DriverMessage::try_from(&frame),
            Err(DriverError::Unsupported(_))
        ));
    }

    #[test]
    fn test_malformed_inbound_rejected() {
        let msg = DriverMessage {
            id: 0x10,
            dlc: 9,
            ..Default::default()
        };
        assert!(CanFrame::try_from(&msg).is_err());

        let msg = DriverMessage {
            id: 0x800,
            ..Default::default()
        };
        assert!(CanFrame::try_from(&msg).is_err());

        let msg = DriverMessage {
            id: 0x10,
            flags: MessageFlags::FD,
            ..Default::default()
        };
        assert!(CanFrame::try_from(&msg).is_err());
    }
}
