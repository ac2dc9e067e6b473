//! Audio worklet host for a sandboxed noise generator unit.
//!
//! Each render quantum the node writes the block's parameter automation
//! into the unit's linear memory, runs the unit, and copies the samples it
//! produced to every output channel. Units arrive as binaries posted by the
//! host and are loaded asynchronously; until one is ready the node passes
//! blocks through untouched.
#![warn(missing_docs)]

/// Block-rate parameter exchange with the unit.
pub mod bridge;

/// Node options supplied by the host.
pub mod config;

/// Error types for loading and calling units.
pub mod error;

/// Unit loading and readiness gating.
pub mod lifecycle;

/// Float-slot views over a unit's linear memory.
pub mod memory;

/// Host message shapes and the outbound port.
pub mod message;

/// The processing node tying the pieces together.
pub mod node;

/// Parameter descriptors and per-block parameter arrays.
pub mod parameter;

/// Per-block orchestration.
pub mod processor;

/// Manual trigger and trigger change messaging.
pub mod trigger;

/// The computation unit contract.
pub mod unit;

/// Browser bindings: WebAssembly units and the worklet entry point.
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::NodeConfig;
pub use error::{LoadError, UnitError};
pub use lifecycle::{UnitLifecycle, UnitStatus};
pub use memory::{LinearMemory, MemoryView};
pub use message::{
    HostPort, InboundMessage, LoadFailedMessage, TriggerMessage, UnitFailedMessage,
};
pub use node::NoiseNode;
pub use parameter::{
    parameter_descriptors, AutomationRate, NoiseParam, ParameterDescriptor, QuantumParameters,
};
pub use processor::{Quantum, QuantumProcessor};
pub use trigger::TriggerChannel;
pub use unit::{ComputeUnit, QuantumLengths, UnitHandle, UnitImports, UnitLoader};
