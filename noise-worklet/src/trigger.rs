use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error};

use crate::error::{LoadError, UnitError};
use crate::message::{
    HostPort, InboundMessage, LoadFailedMessage, TriggerMessage, UnitFailedMessage,
};

/// Bidirectional, non-blocking message channel between the host and the node.
///
/// Inbound messages toggle the manual override or hand over a unit binary.
/// Outbound, every trigger flip reported by the unit is posted straight
/// away through one reused [`TriggerMessage`].
pub struct TriggerChannel<P: HostPort> {
    port: Arc<P>,
    manual_override: Arc<AtomicBool>,
    outbound: Arc<Mutex<TriggerMessage>>,
}

impl<P: HostPort> Clone for TriggerChannel<P> {
    fn clone(&self) -> Self {
        Self {
            port: self.port.clone(),
            manual_override: self.manual_override.clone(),
            outbound: self.outbound.clone(),
        }
    }
}

impl<P: HostPort + 'static> TriggerChannel<P> {
    /// Creates a channel posting to `port`.
    pub fn new(port: P) -> Self {
        Self {
            port: Arc::new(port),
            manual_override: Arc::new(AtomicBool::new(false)),
            outbound: Arc::new(Mutex::new(TriggerMessage { value: false })),
        }
    }

    /// Applies an inbound message. Returns the binary to load, if any.
    pub fn receive(&self, message: InboundMessage) -> Option<Vec<u8>> {
        match message {
            InboundMessage::ManualTrigger { value } => {
                debug!("manual trigger {}", if value { "on" } else { "off" });
                self.manual_override.store(value, Ordering::Release);
                None
            }
            InboundMessage::ModuleBinary { payload } => Some(payload),
        }
    }

    /// Whether the host is currently holding the trigger high.
    pub fn manual_override(&self) -> bool {
        self.manual_override.load(Ordering::Acquire)
    }

    /// Posts exactly one trigger change notification.
    pub fn notify(&self, active: bool) {
        let mut message = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        message.value = active;
        self.port.post_trigger(&message);
    }

    /// Builds the `change` capability handed to the unit.
    pub fn change_callback(&self) -> Arc<dyn Fn(bool)> {
        let channel = self.clone();
        Arc::new(move |active| channel.notify(active))
    }

    /// Tells the host a load did not complete.
    pub fn report_load_failure(&self, err: &LoadError) {
        error!("{err}");
        self.port.post_load_failed(&LoadFailedMessage {
            cause: err.to_string(),
        });
    }

    /// Tells the host a running unit was taken out of service.
    pub fn report_unit_failure(&self, err: &UnitError) {
        error!("{err}");
        self.port.post_unit_failed(&UnitFailedMessage {
            cause: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingPort {
        triggers: RefCell<Vec<TriggerMessage>>,
        failures: RefCell<Vec<LoadFailedMessage>>,
        unit_failures: RefCell<Vec<UnitFailedMessage>>,
    }

    impl HostPort for RecordingPort {
        fn post_trigger(&self, message: &TriggerMessage) {
            self.triggers.borrow_mut().push(*message);
        }

        fn post_load_failed(&self, message: &LoadFailedMessage) {
            self.failures.borrow_mut().push(message.clone());
        }

        fn post_unit_failed(&self, message: &UnitFailedMessage) {
            self.unit_failures.borrow_mut().push(message.clone());
        }
    }

    #[test]
    fn manual_trigger_sets_override() {
        let channel = TriggerChannel::new(RecordingPort::default());
        assert!(!channel.manual_override());

        assert_eq!(channel.receive(InboundMessage::ManualTrigger { value: true }), None);
        assert!(channel.manual_override());

        channel.receive(InboundMessage::ManualTrigger { value: false });
        assert!(!channel.manual_override());
    }

    #[test]
    fn binary_is_handed_back_for_loading() {
        let channel = TriggerChannel::new(RecordingPort::default());
        let binary = channel.receive(InboundMessage::ModuleBinary {
            payload: vec![1, 2, 3],
        });
        assert_eq!(binary, Some(vec![1, 2, 3]));
        assert!(!channel.manual_override());
    }

    #[test]
    fn each_change_posts_one_message() {
        let channel = TriggerChannel::new(RecordingPort::default());
        let change = channel.change_callback();

        change(true);
        change(false);
        change(true);

        let posted = channel.port.triggers.borrow();
        assert_eq!(
            *posted,
            vec![
                TriggerMessage { value: true },
                TriggerMessage { value: false },
                TriggerMessage { value: true },
            ]
        );
    }

    #[test]
    fn load_failure_is_posted() {
        let channel = TriggerChannel::new(RecordingPort::default());
        channel.report_load_failure(&LoadError::MissingExport("init"));

        assert_eq!(
            *channel.port.failures.borrow(),
            vec![LoadFailedMessage {
                cause: "unit is missing export `init`".to_string()
            }]
        );
    }

    #[test]
    fn unit_failure_is_posted() {
        let channel = TriggerChannel::new(RecordingPort::default());
        channel.report_unit_failure(&UnitError::InvalidReturn("process_quantum"));

        assert!(channel.port.failures.borrow().is_empty());
        assert_eq!(
            *channel.port.unit_failures.borrow(),
            vec![UnitFailedMessage {
                cause: "unit export `process_quantum` returned a non-integer value".to_string()
            }]
        );
    }
}
