//! Units compiled from WebAssembly binaries with the browser's `WebAssembly` API.

use enum_map::EnumMap;
use futures::future::LocalBoxFuture;
use js_sys::{Array, Float32Array, Function, Object, Reflect, WebAssembly};
use log::{debug, trace};
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::error::{LoadError, UnitError};
use crate::memory::LinearMemory;
use crate::parameter::NoiseParam;
use crate::unit::{
    ComputeUnit, QuantumLengths, UnitHandle, UnitImports, UnitLoader, PROCESS_ARGUMENT_ORDER,
};

/// Import namespaces the capabilities are published under.
const IMPORT_MODULES: [&str; 2] = ["imports", "trigger"];

/// Best effort readable text for a thrown JS value.
pub(crate) fn describe(err: &JsValue) -> String {
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

/// Host closures backing the unit's imports. Kept alive as long as the instance.
struct ImportClosures {
    change: Closure<dyn Fn(JsValue)>,
    random: Closure<dyn Fn() -> f64>,
    log: Closure<dyn Fn(i32)>,
}

impl ImportClosures {
    fn new(imports: UnitImports) -> Self {
        let UnitImports { change, random } = imports;
        Self {
            // wasm passes booleans as i32
            change: Closure::wrap(Box::new(move |active: JsValue| {
                let active = active
                    .as_bool()
                    .or_else(|| active.as_f64().map(|value| value != 0.0))
                    .unwrap_or(false);
                change(active)
            }) as Box<dyn Fn(JsValue)>),
            random: Closure::wrap(Box::new(move || random()) as Box<dyn Fn() -> f64>),
            log: Closure::wrap(Box::new(|point: i32| trace!("unit trace point {point}"))
                as Box<dyn Fn(i32)>),
        }
    }

    fn import_object(&self) -> Result<Object, JsValue> {
        let namespace = Object::new();
        Reflect::set(&namespace, &"change".into(), self.change.as_ref())?;
        Reflect::set(&namespace, &"random".into(), self.random.as_ref())?;
        Reflect::set(&namespace, &"log".into(), self.log.as_ref())?;

        let imports = Object::new();
        for module in IMPORT_MODULES {
            Reflect::set(&imports, &module.into(), &namespace)?;
        }
        Ok(imports)
    }
}

/// Float32 view over an instance's exported memory.
pub struct WasmMemory {
    memory: WebAssembly::Memory,
    buffer: JsValue,
    view: Float32Array,
}

impl WasmMemory {
    fn new(memory: WebAssembly::Memory) -> Self {
        let buffer = memory.buffer();
        let view = Float32Array::new(&buffer);
        Self {
            memory,
            buffer,
            view,
        }
    }

    /// Growing the memory detaches the old buffer; rebind to the new one.
    fn refresh(&mut self) {
        let buffer = self.memory.buffer();
        if !Object::is(&buffer, &self.buffer) {
            debug!("unit memory grew, rebinding view");
            self.view = Float32Array::new(&buffer);
            self.buffer = buffer;
        }
    }
}

impl LinearMemory for WasmMemory {
    fn slot_count(&self) -> usize {
        self.view.length() as usize
    }

    fn write_slots(&mut self, start: usize, values: &[f32]) {
        let end = start + values.len();
        self.view
            .subarray(start as u32, end as u32)
            .copy_from(values);
    }

    fn read_slots(&self, start: usize, out: &mut [f32]) {
        let end = start + out.len();
        self.view.subarray(start as u32, end as u32).copy_to(out);
    }
}

struct Exports {
    init: Function,
    process_quantum: Function,
    pointers: EnumMap<NoiseParam, Function>,
}

fn function_export(exports: &Object, name: &'static str) -> Result<Function, LoadError> {
    Reflect::get(exports, &name.into())
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
        .ok_or(LoadError::MissingExport(name))
}

fn pointer_export(exports: &Object, param: NoiseParam) -> Result<Function, LoadError> {
    function_export(exports, param.pointer_export()).or_else(|err| {
        match param.legacy_pointer_export() {
            Some(legacy) => function_export(exports, legacy).map_err(|_| err),
            None => Err(err),
        }
    })
}

impl Exports {
    fn resolve(exports: &Object) -> Result<Self, LoadError> {
        let [step_max, step_min, sample_hold, next_value_trigger] =
            NoiseParam::ALL.map(|param| pointer_export(exports, param));
        Ok(Self {
            init: function_export(exports, "init")?,
            process_quantum: function_export(exports, "process_quantum")?,
            pointers: EnumMap::from_array([
                step_max?,
                step_min?,
                sample_hold?,
                next_value_trigger?,
            ]),
        })
    }
}

/// Converts a returned wasm `i32` pointer into an unsigned offset.
fn as_offset(value: JsValue, export: &'static str) -> Result<u32, UnitError> {
    match value.as_f64() {
        Some(number) if number.fract() == 0.0 => Ok(number as i64 as u32),
        _ => Err(UnitError::InvalidReturn(export)),
    }
}

fn trap(export: &'static str) -> impl Fn(JsValue) -> UnitError {
    move |err| UnitError::Trap {
        export,
        message: describe(&err),
    }
}

/// A unit running as a `WebAssembly.Instance`.
pub struct WasmUnit {
    exports: Exports,
    memory: WasmMemory,
    /// Reused argument list for `process_quantum`.
    arguments: Array,
    _imports: ImportClosures,
}

impl WasmUnit {
    fn new(instance: WebAssembly::Instance, imports: ImportClosures) -> Result<Self, LoadError> {
        let exports = instance.exports();
        let memory = Reflect::get(&exports, &"memory".into())
            .ok()
            .and_then(|value| value.dyn_into::<WebAssembly::Memory>().ok())
            .ok_or(LoadError::MissingExport("memory"))?;

        Ok(Self {
            exports: Exports::resolve(&exports)?,
            memory: WasmMemory::new(memory),
            arguments: Array::new_with_length(5),
            _imports: imports,
        })
    }
}

impl ComputeUnit for WasmUnit {
    type Memory = WasmMemory;

    fn init(&mut self, capacity_hint: u32) -> Result<UnitHandle, UnitError> {
        let handle = self
            .exports
            .init
            .call1(&JsValue::UNDEFINED, &capacity_hint.into())
            .map_err(trap("init"))?;
        as_offset(handle, "init").map(UnitHandle::from_raw)
    }

    fn parameter_offset(
        &mut self,
        handle: UnitHandle,
        param: NoiseParam,
    ) -> Result<u32, UnitError> {
        let export = param.pointer_export();
        let offset = self.exports.pointers[param]
            .call1(&JsValue::UNDEFINED, &handle.raw().into())
            .map_err(trap(export))?;
        as_offset(offset, export)
    }

    fn process_quantum(
        &mut self,
        handle: UnitHandle,
        lengths: &QuantumLengths,
    ) -> Result<u32, UnitError> {
        self.arguments.set(0, handle.raw().into());
        for (index, param) in PROCESS_ARGUMENT_ORDER.into_iter().enumerate() {
            self.arguments.set(index as u32 + 1, lengths[param].into());
        }
        let output = self
            .exports
            .process_quantum
            .apply(&JsValue::UNDEFINED, &self.arguments)
            .map_err(trap("process_quantum"))?;
        as_offset(output, "process_quantum")
    }

    fn memory(&mut self) -> &mut WasmMemory {
        self.memory.refresh();
        &mut self.memory
    }
}

/// Loads units with `WebAssembly.instantiate`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmLoader;

impl UnitLoader for WasmLoader {
    type Unit = WasmUnit;

    fn instantiate(
        &self,
        binary: Vec<u8>,
        imports: UnitImports,
    ) -> LocalBoxFuture<'static, Result<WasmUnit, LoadError>> {
        let closures = ImportClosures::new(imports);
        let promise = closures
            .import_object()
            .map(|imports| WebAssembly::instantiate_buffer(&binary, &imports));

        Box::pin(async move {
            let promise = promise.map_err(|err| LoadError::Instantiate(describe(&err)))?;
            let source = JsFuture::from(promise)
                .await
                .map_err(|err| LoadError::Instantiate(describe(&err)))?;
            let instance = Reflect::get(&source, &"instance".into())
                .and_then(|value| value.dyn_into::<WebAssembly::Instance>())
                .map_err(|err| LoadError::Instantiate(describe(&err)))?;
            WasmUnit::new(instance, closures)
        })
    }
}
