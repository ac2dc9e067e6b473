use crate::bridge::write_parameters;
use crate::error::UnitError;
use crate::lifecycle::{LoadedUnit, UnitLifecycle};
use crate::memory::MemoryView;
use crate::message::HostPort;
use crate::parameter::QuantumParameters;
use crate::trigger::TriggerChannel;
use crate::unit::{ComputeUnit, UnitLoader};

/// What happened to the output buffers during a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantum {
    /// The unit rendered the block into every output channel.
    Rendered,
    /// No unit was available; outputs were left untouched.
    Passthrough,
}

impl Quantum {
    /// Value to return from `process`. The node stays alive either way.
    pub fn keep_alive(self) -> bool {
        true
    }
}

/// Drives one block through the unit: parameters in, compute, samples out.
///
/// A unit that traps or breaks its memory contract is taken out of service
/// and the host is told through `channel`.
pub struct QuantumProcessor<L: UnitLoader, P: HostPort> {
    lifecycle: UnitLifecycle<L>,
    channel: TriggerChannel<P>,
}

impl<L: UnitLoader, P: HostPort> Clone for QuantumProcessor<L, P> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            channel: self.channel.clone(),
        }
    }
}

impl<L: UnitLoader, P: HostPort + 'static> QuantumProcessor<L, P> {
    /// Creates a processor serving blocks from `lifecycle`'s unit.
    pub fn new(lifecycle: UnitLifecycle<L>, channel: TriggerChannel<P>) -> Self {
        Self { lifecycle, channel }
    }

    /// Processes one block.
    ///
    /// Inputs are ignored; the unit is a generator. Every output channel
    /// receives the same mono signal.
    pub fn process(
        &self,
        _inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        params: &QuantumParameters<'_>,
    ) -> Quantum {
        let manual_override = self.channel.manual_override();
        let rendered = self
            .lifecycle
            .with_unit(|loaded| render(loaded, params, manual_override, outputs));

        match rendered {
            None => Quantum::Passthrough,
            Some(Ok(())) => Quantum::Rendered,
            Some(Err(err)) => {
                if cfg!(debug_assertions) && err.is_contract_violation() {
                    panic!("unit violated its memory contract: {err}");
                }
                self.lifecycle.fail(err.to_string());
                self.channel.report_unit_failure(&err);
                Quantum::Passthrough
            }
        }
    }
}

fn render<U: ComputeUnit>(
    loaded: &mut LoadedUnit<U>,
    params: &QuantumParameters<'_>,
    manual_override: bool,
    outputs: &mut [&mut [f32]],
) -> Result<(), UnitError> {
    let LoadedUnit { unit, handle } = loaded;
    let lengths = write_parameters(unit, *handle, params, manual_override)?;
    let output_offset = unit.process_quantum(*handle, &lengths)?;
    MemoryView::new(unit.memory()).fan_out(output_offset, outputs)
}
