use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use enum_map::EnumMap;
use futures::future::LocalBoxFuture;

use crate::error::{LoadError, UnitError};
use crate::memory::LinearMemory;
use crate::parameter::NoiseParam;

/// Opaque per-instance state pointer returned by the unit's `init`.
///
/// Only meaningful to the unit instance that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHandle(u32);

impl UnitHandle {
    /// Wraps a raw handle returned by a unit.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw value to pass back to the unit.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Logical length of each parameter array handed to `process_quantum`.
pub type QuantumLengths = EnumMap<NoiseParam, u32>;

/// The low-level contract exposed by a loaded computation unit.
///
/// Offsets are byte offsets into [`ComputeUnit::memory`].
pub trait ComputeUnit {
    /// The unit's linear memory.
    type Memory: LinearMemory + ?Sized;

    /// Allocates per-instance state sized for blocks of up to `capacity_hint` samples.
    fn init(&mut self, capacity_hint: u32) -> Result<UnitHandle, UnitError>;

    /// Returns the current byte offset of `param`'s input buffer.
    fn parameter_offset(&mut self, handle: UnitHandle, param: NoiseParam) -> Result<u32, UnitError>;

    /// Runs one block over the parameter buffers and returns the byte offset of the output region.
    fn process_quantum(
        &mut self,
        handle: UnitHandle,
        lengths: &QuantumLengths,
    ) -> Result<u32, UnitError>;

    /// Borrows the unit's memory as it is right now.
    fn memory(&mut self) -> &mut Self::Memory;
}

/// Host capabilities handed to a unit at instantiation.
#[derive(Clone)]
pub struct UnitImports {
    /// Called by the unit whenever its trigger-active state flips.
    pub change: Arc<dyn Fn(bool)>,
    /// Uniform random source in `[0, 1)`.
    pub random: Arc<dyn Fn() -> f64>,
}

impl Debug for UnitImports {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitImports").finish_non_exhaustive()
    }
}

/// Compiles and instantiates units from binaries supplied by the host.
pub trait UnitLoader {
    /// The instantiated unit.
    type Unit: ComputeUnit + 'static;

    /// Starts compiling `binary`, wiring `imports` into the new instance.
    fn instantiate(
        &self,
        binary: Vec<u8>,
        imports: UnitImports,
    ) -> LocalBoxFuture<'static, Result<Self::Unit, LoadError>>;
}

/// Order in which parameter lengths are passed to `process_quantum`.
pub const PROCESS_ARGUMENT_ORDER: [NoiseParam; 4] = [
    NoiseParam::StepMin,
    NoiseParam::StepMax,
    NoiseParam::SampleHold,
    NoiseParam::NextValueTrigger,
];
