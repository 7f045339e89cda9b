use crate::{DriverMessage, DriverOptions, Result};

/// Callback the driver invokes for every received message, one at a time.
pub type MessageReceiver = Box<dyn FnMut(DriverMessage) + Send>;

/// Session-level interface of a VCI controller driver.
pub trait VciDriver: Send {
    /// Register the inbound receiver. Called before `init`.
    fn set_receiver(&mut self, receiver: MessageReceiver);

    /// Open the controller with the given options and start receiving.
    fn init(&mut self, options: &DriverOptions) -> Result<()>;

    /// Submit one message for transmission.
    fn send(&mut self, message: DriverMessage) -> Result<()>;

    /// Stop the session. Further `send` calls fail.
    fn stop(&mut self);
}

/// Source of the controller names a VCI installation exposes.
pub trait ControllerList {
    /// Re-scan the installed controllers.
    fn refresh(&mut self) -> Result<()>;

    fn controllers(&self) -> Vec<String>;
}

/// Builds a fresh driver instance for each `open`.
pub type DriverFactory = Box<dyn Fn() -> Box<dyn VciDriver> + Send>;
