use crate::{CanFrame, ConfigurationKey, ConfigurationValue, DeviceServices, ErrorKind};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Notifications kept by [`DeviceCore`] before the oldest are discarded.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum DeviceState {
    #[default]
    Unconnected,
    Connected,
}

/// Notification raised by a device, in the order it happened.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent {
    StateChanged(DeviceState),
    FramesReceived(usize),
    FramesWritten(u64),
    ConfigurationChanged(ConfigurationKey),
    Error(ErrorKind, String),
}

struct Inner {
    state: DeviceState,
    rx_queue: VecDeque<CanFrame>,
    parameters: HashMap<ConfigurationKey, ConfigurationValue>,
    events: VecDeque<DeviceEvent>,
    event_capacity: usize,
    dropped_events: u64,
    last_error: Option<(ErrorKind, String)>,
}

impl Inner {
    fn record(&mut self, event: DeviceEvent) {
        if self.event_capacity == 0 {
            self.dropped_events += 1;
            return;
        }
        if self.events.len() == self.event_capacity {
            self.events.pop_front();
            self.dropped_events += 1;
        }
        self.events.push_back(event);
    }
}

/// Host-side device core: state, receive queue, parameters and notifications.
///
/// Backends hold it behind an `Arc<dyn DeviceServices>`; applications keep
/// another handle to read frames and drain events. The event log is
/// bounded; once full, the oldest notification is discarded.
pub struct DeviceCore {
    inner: Mutex<Inner>,
}

impl Default for DeviceCore {
    fn default() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl DeviceCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Core keeping at most `capacity` undrained events. Zero disables the log.
    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: DeviceState::default(),
                rx_queue: VecDeque::new(),
                parameters: HashMap::new(),
                events: VecDeque::new(),
                event_capacity: capacity,
                dropped_events: 0,
                last_error: None,
            }),
        }
    }

    /// Pop the oldest received frame.
    pub fn read_frame(&self) -> Option<CanFrame> {
        self.inner.lock().rx_queue.pop_front()
    }

    pub fn read_all_frames(&self) -> Vec<CanFrame> {
        self.inner.lock().rx_queue.drain(..).collect()
    }

    pub fn frames_available(&self) -> usize {
        self.inner.lock().rx_queue.len()
    }

    /// Last value accepted for `key`, if any.
    pub fn configuration_parameter(&self, key: ConfigurationKey) -> Option<ConfigurationValue> {
        self.inner.lock().parameters.get(&key).cloned()
    }

    pub fn configuration_keys(&self) -> Vec<ConfigurationKey> {
        self.inner.lock().parameters.keys().copied().collect()
    }

    pub fn last_error(&self) -> Option<(ErrorKind, String)> {
        self.inner.lock().last_error.clone()
    }

    /// Drain the notifications raised since the last call.
    pub fn take_events(&self) -> Vec<DeviceEvent> {
        self.inner.lock().events.drain(..).collect()
    }

    /// Events discarded because the log was full.
    pub fn dropped_events(&self) -> u64 {
        self.inner.lock().dropped_events
    }
}

impl DeviceServices for DeviceCore {
    fn state(&self) -> DeviceState {
        self.inner.lock().state
    }

    fn set_state(&self, state: DeviceState) {
        let mut inner = self.inner.lock();
        if inner.state != state {
            debug!(?state, "device state changed");
            inner.state = state;
            inner.record(DeviceEvent::StateChanged(state));
        }
    }

    fn enqueue_received_frames(&self, frames: Vec<CanFrame>) {
        if frames.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        let count = frames.len();
        inner.rx_queue.extend(frames);
        inner.record(DeviceEvent::FramesReceived(count));
    }

    fn frames_written(&self, count: u64) {
        self.inner.lock().record(DeviceEvent::FramesWritten(count));
    }

    fn configuration_changed(&self, key: ConfigurationKey, value: ConfigurationValue) {
        let mut inner = self.inner.lock();
        inner.parameters.insert(key, value);
        inner.record(DeviceEvent::ConfigurationChanged(key));
    }

    fn set_error(&self, kind: ErrorKind, message: String) {
        warn!(?kind, %message, "device error");
        let mut inner = self.inner.lock();
        inner.record(DeviceEvent::Error(kind, message.clone()));
        inner.last_error = Some((kind, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CanId;

    fn frame(id: u16) -> CanFrame {
        CanFrame::new(CanId::standard(id).unwrap(), &[id as u8]).unwrap()
    }

    #[test]
    fn test_queue_is_fifo() {
        let core = DeviceCore::new();
        core.enqueue_received_frames(vec![frame(1)]);
        core.enqueue_received_frames(vec![frame(2), frame(3)]);
        assert_eq!(core.frames_available(), 3);
        assert_eq!(core.read_frame().unwrap().id.raw(), 1);
        let rest: Vec<u32> = core.read_all_frames().iter().map(|f| f.id.raw()).collect();
        assert_eq!(rest, vec![2, 3]);
        assert!(core.read_frame().is_none());
    }

    #[test]
    fn test_state_change_recorded_once() {
        let core = DeviceCore::new();
        core.set_state(DeviceState::Unconnected);
        core.set_state(DeviceState::Connected);
        core.set_state(DeviceState::Connected);
        assert_eq!(
            core.take_events(),
            vec![DeviceEvent::StateChanged(DeviceState::Connected)]
        );
        assert!(core.take_events().is_empty());
    }

    #[test]
    fn test_parameters_and_errors() {
        let core = DeviceCore::new();
        core.configuration_changed(ConfigurationKey::BitRate, ConfigurationValue::Integer(125_000));
        assert_eq!(
            core.configuration_parameter(ConfigurationKey::BitRate),
            Some(ConfigurationValue::Integer(125_000))
        );
        core.set_error(ErrorKind::WriteError, "boom".into());
        assert_eq!(core.last_error(), Some((ErrorKind::WriteError, "boom".into())));
        let events = core.take_events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            DeviceEvent::ConfigurationChanged(ConfigurationKey::BitRate)
        );
    }

    #[test]
    fn test_event_log_is_bounded() {
        let core = DeviceCore::with_event_capacity(4);
        for n in 0..10_000u64 {
            core.frames_written(1);
            core.enqueue_received_frames(vec![frame((n % 0x7FF) as u16)]);
            assert!(core.read_frame().is_some());
        }
        assert_eq!(core.dropped_events(), 20_000 - 4);
        let events = core.take_events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[3], DeviceEvent::FramesReceived(1));
        assert!(core.take_events().is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_no_events() {
        let core = DeviceCore::with_event_capacity(0);
        core.set_state(DeviceState::Connected);
        core.set_error(ErrorKind::ReadError, "lost".into());
        assert!(core.take_events().is_empty());
        assert_eq!(core.dropped_events(), 2);
        assert_eq!(core.state(), DeviceState::Connected);
        assert_eq!(core.last_error(), Some((ErrorKind::ReadError, "lost".into())));
    }
}
