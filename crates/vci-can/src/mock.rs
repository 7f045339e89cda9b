use crate::{
    ControllerList, DriverError, DriverFactory, DriverMessage, DriverOptions, MessageReceiver,
    Result, VciDriver,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct MockShared {
    receiver: Option<MessageReceiver>,
    running: bool,
    sent: Vec<DriverMessage>,
    init_options: Option<DriverOptions>,
    instances: usize,
    stop_calls: usize,
    reject_sends: bool,
    fail_init: bool,
    loopback: bool,
    during_init: Vec<DriverMessage>,
}

/// Hand a message to the registered receiver without holding the lock
/// while it runs.
fn dispatch(shared: &Mutex<MockShared>, message: DriverMessage) -> bool {
    let receiver = {
        let mut s = shared.lock();
        if !s.running {
            return false;
        }
        s.receiver.take()
    };
    match receiver {
        Some(mut receiver) => {
            receiver(message);
            let mut s = shared.lock();
            if s.running && s.receiver.is_none() {
                s.receiver = Some(receiver);
            }
            true
        }
        None => false,
    }
}

/// In-process VCI driver. Every instance built from one [`MockHandle`]
/// shares the handle's state, so tests can inspect and drive it.
pub struct MockDriver {
    shared: Arc<Mutex<MockShared>>,
}

impl VciDriver for MockDriver {
    fn set_receiver(&mut self, receiver: MessageReceiver) {
        self.shared.lock().receiver = Some(receiver);
    }

    fn init(&mut self, options: &DriverOptions) -> Result<()> {
        let early = {
            let mut s = self.shared.lock();
            if s.fail_init {
                return Err(DriverError::ControllerNotFound(options.controller.clone()));
            }
            debug!(
                controller = %options.controller,
                bit_rate = options.bit_rate,
                "mock driver init"
            );
            s.init_options = Some(options.clone());
            s.running = true;
            std::mem::take(&mut s.during_init)
        };
        for message in early {
            dispatch(&self.shared, message);
        }
        Ok(())
    }

    fn send(&mut self, message: DriverMessage) -> Result<()> {
        let loopback = {
            let mut s = self.shared.lock();
            if !s.running {
                return Err(DriverError::NotRunning);
            }
            if s.reject_sends {
                return Err(DriverError::Rejected("transmit fifo full".into()));
            }
            s.sent.push(message);
            s.loopback
        };
        if loopback {
            dispatch(&self.shared, message);
        }
        Ok(())
    }

    fn stop(&mut self) {
        let mut s = self.shared.lock();
        s.running = false;
        s.receiver = None;
        s.stop_calls += 1;
    }
}

/// Control side of the mock driver.
#[derive(Clone, Default)]
pub struct MockHandle {
    shared: Arc<Mutex<MockShared>>,
}

impl MockHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory producing drivers bound to this handle.
    pub fn factory(&self) -> DriverFactory {
        let shared = Arc::clone(&self.shared);
        Box::new(move || -> Box<dyn VciDriver> {
            shared.lock().instances += 1;
            Box::new(MockDriver {
                shared: Arc::clone(&shared),
            })
        })
    }

    /// Deliver an inbound message as the controller would. Returns false
    /// when no session is running.
    pub fn deliver(&self, message: DriverMessage) -> bool {
        dispatch(&self.shared, message)
    }

    pub fn sent(&self) -> Vec<DriverMessage> {
        self.shared.lock().sent.clone()
    }

    /// Options passed to the most recent `init`.
    pub fn init_options(&self) -> Option<DriverOptions> {
        self.shared.lock().init_options.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    pub fn instances(&self) -> usize {
        self.shared.lock().instances
    }

    pub fn stop_calls(&self) -> usize {
        self.shared.lock().stop_calls
    }

    pub fn reject_sends(&self, reject: bool) {
        self.shared.lock().reject_sends = reject;
    }

    pub fn fail_init(&self, fail: bool) {
        self.shared.lock().fail_init = fail;
    }

    /// Deliver `message` from inside the next `init`, before it returns.
    pub fn deliver_during_init(&self, message: DriverMessage) {
        self.shared.lock().during_init.push(message);
    }

    /// Echo every accepted message back through the receiver.
    pub fn set_loopback(&self, loopback: bool) {
        self.shared.lock().loopback = loopback;
    }
}

/// Fixed controller list for hosts without a VCI installation.
pub struct MockControllers {
    names: Vec<String>,
    refreshes: usize,
}

impl MockControllers {
    pub fn new(names: Vec<String>) -> Self {
        Self { names, refreshes: 0 }
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl Default for MockControllers {
    fn default() -> Self {
        Self::new(vec!["mock0".to_string(), "mock1".to_string()])
    }
}

impl ControllerList for MockControllers {
    fn refresh(&mut self) -> Result<()> {
        self.refreshes += 1;
        Ok(())
    }

    fn controllers(&self) -> Vec<String> {
        self.names.clone()
    }
}
