use crate::{
    append_filters, decode, ControllerList, DriverError, DriverFactory, DriverMessage,
    DriverOptions, MessageReceiver, VciDriver,
};
use can_device::{
    CanBusDevice, CanFrame, ConfigurationKey, ConfigurationValue, DeviceError, DeviceInfo,
    DeviceServices, DeviceState, ErrorKind, Result, Timestamp,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PLUGIN_NAME: &str = "vci";

/// CAN device backed by a VCI controller driver.
///
/// Options collected through [`CanBusDevice::set_configuration_parameter`]
/// are handed to a freshly built driver on every `open`; changes made while
/// connected apply to the next session only.
///
/// The device only reports `Connected` once the driver's `init` returns, so
/// messages a driver delivers from inside `init` are dropped with a warning.
pub struct VciCanBackend {
    services: Arc<dyn DeviceServices>,
    options: DriverOptions,
    factory: DriverFactory,
    driver: Option<Box<dyn VciDriver>>,
}

impl VciCanBackend {
    pub fn new(name: &str, services: Arc<dyn DeviceServices>, factory: DriverFactory) -> Self {
        debug!(device = name, "creating VCI backend");
        Self {
            services,
            options: DriverOptions::new(name),
            factory,
            driver: None,
        }
    }

    /// List the controllers the installation currently exposes.
    pub fn interfaces(controllers: &mut dyn ControllerList) -> crate::Result<Vec<DeviceInfo>> {
        controllers.refresh()?;
        let infos: Vec<DeviceInfo> = controllers
            .controllers()
            .iter()
            .map(|name| device_info(name))
            .collect();
        debug!(count = infos.len(), "enumerated VCI controllers");
        Ok(infos)
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Drop every hardware filter row collected so far.
    pub fn clear_filters(&mut self) {
        self.options.filters.clear();
    }

    fn report(&self, err: DeviceError) -> DeviceError {
        self.services.set_error(err.kind(), err.to_string());
        err
    }

    fn receiver(services: Arc<dyn DeviceServices>) -> MessageReceiver {
        Box::new(move |message: DriverMessage| {
            if services.state() != DeviceState::Connected {
                warn!(id = message.id, "dropping message received while unconnected");
                return;
            }
            match CanFrame::try_from(&message) {
                Ok(mut frame) => {
                    frame.timestamp = Some(Timestamp::now());
                    services.enqueue_received_frames(vec![frame]);
                }
                Err(e) => {
                    warn!(id = message.id, error = %e, "dropping malformed message");
                    services.set_error(
                        ErrorKind::ReadError,
                        format!("dropped inbound message 0x{:X}: {e}", message.id),
                    );
                }
            }
        })
    }
}

fn device_info(controller: &str) -> DeviceInfo {
    let prefix = controller.trim_end_matches(|c: char| c.is_ascii_digit());
    let channel = controller[prefix.len()..].parse().unwrap_or(0);
    DeviceInfo {
        plugin: PLUGIN_NAME.to_string(),
        name: controller.to_string(),
        description: format!("VCI CAN controller {controller}"),
        channel,
        is_virtual: false,
        has_flexible_data_rate: false,
    }
}

fn write_error(err: DriverError) -> DeviceError {
    match err {
        DriverError::Unsupported(what) => DeviceError::Unsupported(what),
        DriverError::InvalidMessage(what) => DeviceError::InvalidFrame(what),
        other => DeviceError::Rejected(other.to_string()),
    }
}

impl CanBusDevice for VciCanBackend {
    fn open(&mut self) -> Result<()> {
        if self.driver.is_some() {
            if self.services.state() == DeviceState::Connected {
                debug!(controller = %self.options.controller, "already open");
                return Ok(());
            }
            self.close();
        }
        let mut driver = (self.factory)();
        driver.set_receiver(Self::receiver(Arc::clone(&self.services)));
        if let Err(e) = driver.init(&self.options) {
            return Err(self.report(DeviceError::Connection(e.to_string())));
        }
        self.driver = Some(driver);
        self.services.set_state(DeviceState::Connected);
        info!(
            controller = %self.options.controller,
            bit_rate = self.options.bit_rate,
            filters = self.options.filters.len(),
            "VCI session opened"
        );
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.stop();
            info!(controller = %self.options.controller, "VCI session closed");
        }
        self.services.set_state(DeviceState::Unconnected);
    }

    fn state(&self) -> DeviceState {
        self.services.state()
    }

    fn write_frame(&mut self, frame: &CanFrame) -> Result<()> {
        if self.services.state() != DeviceState::Connected {
            return Err(self.report(DeviceError::NotConnected));
        }
        if !frame.is_valid() {
            return Err(self.report(DeviceError::InvalidFrame("cannot write invalid frame")));
        }
        let message = match DriverMessage::try_from(frame) {
            Ok(m) => m,
            Err(e) => return Err(self.report(write_error(e))),
        };
        let sent = match self.driver.as_mut() {
            Some(driver) => driver.send(message),
            None => Err(DriverError::NotRunning),
        };
        if let Err(e) = sent {
            return Err(self.report(write_error(e)));
        }
        self.services.frames_written(1);
        Ok(())
    }

    fn set_configuration_parameter(
        &mut self,
        key: ConfigurationKey,
        value: ConfigurationValue,
    ) -> Result<()> {
        debug!(?key, ?value, "set configuration parameter");
        match key {
            ConfigurationKey::RawFilter => {
                let Some(rules) = value.as_filters() else {
                    return Err(self.report(DeviceError::Configuration(
                        "raw filter expects a list of filters".into(),
                    )));
                };
                append_filters(&mut self.options.filters, rules);
            }
            ConfigurationKey::CanFd => match value.as_bool() {
                Some(false) => {}
                Some(true) => {
                    return Err(self.report(DeviceError::Configuration(
                        "CAN-FD not managed!".into(),
                    )));
                }
                None => {
                    return Err(self.report(DeviceError::Configuration(
                        "CAN FD flag expects a boolean".into(),
                    )));
                }
            },
            ConfigurationKey::BitRate => {
                let Some(rate) = value.as_integer() else {
                    return Err(self.report(DeviceError::Configuration(
                        "bit rate expects an integer".into(),
                    )));
                };
                self.options.bit_rate = rate;
            }
            ConfigurationKey::DataBitRate => {
                return Err(self.report(DeviceError::Configuration(
                    "data bit rate requires CAN FD, which the VCI backend does not support".into(),
                )));
            }
            other => {
                debug!(key = ?other, "ignoring unsupported configuration key");
                return Ok(());
            }
        }
        if self.driver.is_some() {
            warn!(?key, "configuration change applies at next open");
        }
        self.services.configuration_changed(key, value);
        Ok(())
    }

    fn interpret_error_frame(&self, frame: &CanFrame) -> String {
        decode::interpret_error_frame(frame)
    }
}

impl Drop for VciCanBackend {
    fn drop(&mut self) {
        if self.services.state() == DeviceState::Connected {
            self.close();
        }
    }
}
