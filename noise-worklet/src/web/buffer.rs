use enum_map::EnumMap;
use js_sys::{Array, Float32Array, Object, Reflect};
use rsor::Slice;
use wasm_bindgen::{JsCast, JsValue};

use crate::parameter::{NoiseParam, QuantumParameters};

/// Holds the output channels of the node's first output while a block is rendered.
///
/// Rust storage is only copied back to JS once the unit actually rendered,
/// so skipped blocks leave the JS buffers untouched.
pub struct OutputBuffer {
    /// JS Float32Array objects for each output channel.
    js_arrays: Vec<Float32Array>,
    /// Storage for each channel's audio data.
    storage: Vec<Vec<f32>>,
    /// Reusable slice of channel references handed to the processor.
    slice: Slice<[f32]>,
}

impl OutputBuffer {
    /// Creates an empty buffer; channels are sized on the first block.
    pub fn new() -> Self {
        Self {
            js_arrays: Vec::new(),
            storage: Vec::new(),
            slice: Slice::new(),
        }
    }

    /// Binds to the channels of `outputs[0]`, resizing storage to match.
    pub fn bind(&mut self, outputs: &Array) {
        self.js_arrays.clear();
        let channels = outputs.get(0);
        if channels.is_undefined() {
            self.storage.clear();
            return;
        }
        let channels: Array = channels.unchecked_into();

        self.storage.resize_with(channels.length() as usize, Vec::new);
        for (index, storage) in self.storage.iter_mut().enumerate() {
            let js_array: Float32Array = channels.get(index as u32).unchecked_into();
            storage.resize(js_array.length() as usize, 0.0);
            self.js_arrays.push(js_array);
        }
    }

    /// Returns mutable references to all output channels' audio data.
    #[inline]
    pub fn get_mut_refs(&mut self) -> &mut [&mut [f32]] {
        self.slice.from_muts(&mut self.storage)
    }

    /// Copies all data from Rust storage back to the corresponding JS Float32Arrays.
    pub fn copy_to_js(&self) {
        for (js_array, storage) in self.js_arrays.iter().zip(self.storage.iter()) {
            js_array.copy_from(storage);
        }
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies of the block's parameter arrays, keyed by parameter.
pub struct ParameterBuffer {
    keys: EnumMap<NoiseParam, JsValue>,
    storage: EnumMap<NoiseParam, Vec<f32>>,
}

impl ParameterBuffer {
    /// Creates a buffer holding every parameter's default value.
    pub fn new() -> Self {
        Self {
            keys: EnumMap::from_fn(|param: NoiseParam| JsValue::from_str(param.name())),
            storage: EnumMap::from_fn(|param: NoiseParam| vec![param.descriptor().default_value]),
        }
    }

    /// Copies each parameter array out of the JS `parameters` record.
    ///
    /// Arrays keep the length the host delivered: one value per sample, or a
    /// single value when the parameter is constant over the block.
    pub fn fill_from_js(&mut self, parameters: &Object) {
        for (param, storage) in self.storage.iter_mut() {
            let array = Reflect::get(parameters, &self.keys[param])
                .ok()
                .and_then(|value| value.dyn_into::<Float32Array>().ok());
            match array {
                Some(array) => {
                    storage.resize(array.length() as usize, 0.0);
                    array.copy_to(storage);
                }
                None => {
                    storage.clear();
                    storage.push(param.descriptor().default_value);
                }
            }
        }
    }

    /// Borrows the arrays as a parameter set for the processor.
    pub fn get_ref(&self) -> QuantumParameters<'_> {
        QuantumParameters::new(EnumMap::from_fn(|param: NoiseParam| {
            self.storage[param].as_slice()
        }))
    }
}

impl Default for ParameterBuffer {
    fn default() -> Self {
        Self::new()
    }
}
