use std::sync::Arc;

use futures::future::LocalBoxFuture;

use crate::config::NodeConfig;
use crate::error::LoadError;
use crate::lifecycle::{UnitLifecycle, UnitStatus};
use crate::message::{HostPort, InboundMessage};
use crate::parameter::QuantumParameters;
use crate::processor::{Quantum, QuantumProcessor};
use crate::trigger::TriggerChannel;
use crate::unit::{UnitImports, UnitLoader};

/// The processing node: lifecycle, message channel and block processor wired together.
///
/// Clones share the same unit, override flag and port.
pub struct NoiseNode<L: UnitLoader, P: HostPort> {
    lifecycle: UnitLifecycle<L>,
    channel: TriggerChannel<P>,
    processor: QuantumProcessor<L, P>,
    random: Arc<dyn Fn() -> f64>,
}

impl<L: UnitLoader, P: HostPort> Clone for NoiseNode<L, P> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            channel: self.channel.clone(),
            processor: self.processor.clone(),
            random: self.random.clone(),
        }
    }
}

impl<L: UnitLoader, P: HostPort + 'static> NoiseNode<L, P> {
    /// Creates a node with no unit loaded.
    ///
    /// `random` is handed to every unit instance as its random source.
    pub fn new(loader: L, port: P, config: &NodeConfig, random: Arc<dyn Fn() -> f64>) -> Self {
        let lifecycle = UnitLifecycle::new(loader, config.capacity_hint);
        let channel = TriggerChannel::new(port);
        let processor = QuantumProcessor::new(lifecycle.clone(), channel.clone());
        Self {
            lifecycle,
            channel,
            processor,
            random,
        }
    }

    /// Handles a message from the host.
    ///
    /// Returns the load to drive when the message carried a unit binary.
    pub fn handle_message(
        &self,
        message: InboundMessage,
    ) -> Option<LocalBoxFuture<'static, Result<(), LoadError>>> {
        self.channel.receive(message).map(|binary| self.load(binary))
    }

    /// Starts loading a unit binary. Failures are also reported to the host.
    pub fn load(&self, binary: Vec<u8>) -> LocalBoxFuture<'static, Result<(), LoadError>> {
        let imports = UnitImports {
            change: self.channel.change_callback(),
            random: self.random.clone(),
        };
        let pending = self.lifecycle.load(binary, imports);
        let channel = self.channel.clone();
        Box::pin(async move {
            let result = pending.await;
            if let Err(err) = &result {
                channel.report_load_failure(err);
            }
            result
        })
    }

    /// Processes one block. See [`QuantumProcessor::process`].
    pub fn process(
        &self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        params: &QuantumParameters<'_>,
    ) -> Quantum {
        self.processor.process(inputs, outputs, params)
    }

    /// Current lifecycle status of the unit.
    pub fn status(&self) -> UnitStatus {
        self.lifecycle.status()
    }

    /// Whether the host is holding the trigger high.
    pub fn manual_override(&self) -> bool {
        self.channel.manual_override()
    }
}
