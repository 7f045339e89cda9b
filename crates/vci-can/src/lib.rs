//! vci-can: CAN device backend for VCI controller drivers
//!
//! [`VciCanBackend`] implements the `can-device` host contract on top of a
//! [`VciDriver`]. It translates abstract filter rules into hardware filter
//! rows, converts frames to and from [`DriverMessage`], and decodes error
//! frames into readable text. CAN FD is not supported. The default build
//! enables a `mock` driver so that hosts without a VCI installation can
//! still exercise the backend.

mod error;
pub use error::{DriverError, Result};

mod message;
pub use message::{DriverMessage, MessageFlags, MessageKind};

mod filter;
pub use filter::{append_filters, FilterEntry, FormatSelector};

mod options;
pub use options::{DriverOptions, DEFAULT_BIT_RATE};

mod decode;
pub use decode::interpret_error_frame;

mod driver;
pub use driver::{ControllerList, DriverFactory, MessageReceiver, VciDriver};

mod backend;
pub use backend::{VciCanBackend, PLUGIN_NAME};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockControllers, MockDriver, MockHandle};
