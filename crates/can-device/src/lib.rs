//! can-device: transport-neutral CAN device abstractions
//!
//! This crate defines the frame model, configuration keys and the host-side
//! contract that CAN backends are written against. Backends implement
//! [`CanBusDevice`] and are composed with a [`DeviceServices`] handle that
//! owns state, the receive queue and notifications; [`DeviceCore`] is the
//! stock implementation of those services.

mod types;
pub use types::{CanFrame, CanId, DeviceInfo, FrameErrors, FrameType, Timestamp, CLASSIC_MAX_LEN};

mod config;
pub use config::{ConfigurationKey, ConfigurationValue, Filter, FilterFormat, FilterFrameType};

mod error;
pub use error::{DeviceError, ErrorKind, Result};

mod traits;
pub use traits::{CanBusDevice, DeviceServices};

mod device;
pub use device::{DeviceCore, DeviceEvent, DeviceState, DEFAULT_EVENT_CAPACITY};
