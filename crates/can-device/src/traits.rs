use crate::{CanFrame, ConfigurationKey, ConfigurationValue, DeviceState, ErrorKind, Result};

/// Host-side services a backend is composed with.
///
/// A backend never owns device state or the receive queue; it reads and
/// updates them through this trait. Implementations must tolerate calls
/// from the driver's notification context.
pub trait DeviceServices: Send + Sync {
    fn state(&self) -> DeviceState;

    fn set_state(&self, state: DeviceState);

    /// Append a batch of received frames to the host queue, keeping order.
    fn enqueue_received_frames(&self, frames: Vec<CanFrame>);

    /// Number of frames a successful write handed to the driver.
    fn frames_written(&self, count: u64);

    /// A configuration parameter was accepted.
    fn configuration_changed(&self, key: ConfigurationKey, value: ConfigurationValue);

    fn set_error(&self, kind: ErrorKind, message: String);
}

/// The uniform device API a CAN backend exposes to applications.
pub trait CanBusDevice {
    /// Connect to the bus with the current configuration.
    fn open(&mut self) -> Result<()>;

    /// Disconnect. Safe to call when not connected.
    fn close(&mut self);

    fn state(&self) -> DeviceState;

    /// Submit one frame.
    fn write_frame(&mut self, frame: &CanFrame) -> Result<()>;

    /// Apply a configuration parameter. Unknown keys are ignored.
    fn set_configuration_parameter(
        &mut self,
        key: ConfigurationKey,
        value: ConfigurationValue,
    ) -> Result<()>;

    /// Human readable description of an error frame; empty for other frames.
    fn interpret_error_frame(&self, frame: &CanFrame) -> String;
}
