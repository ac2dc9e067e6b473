//! Browser bindings.
//!
//! [`worklet::NoiseGeneratorWorklet`] is exported to JS and driven by the
//! processor class in `js/noise-generator.worklet.js`; units are compiled
//! with the browser's `WebAssembly` API.

/// Output and parameter buffers shared with JS.
pub mod buffer;

/// The node's `MessagePort`.
pub mod port;

/// WebAssembly-backed units.
pub mod unit;

/// The exported processor object.
pub mod worklet;

pub use port::WorkletPort;
pub use unit::{WasmLoader, WasmMemory, WasmUnit};
pub use worklet::NoiseGeneratorWorklet;
