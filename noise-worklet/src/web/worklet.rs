use std::sync::Arc;

use js_sys::{Array, Math, Object};
use log::{debug, error, info};
use wasm_bindgen::{
    prelude::{wasm_bindgen, Closure},
    JsCast, JsValue,
};
use wasm_bindgen_futures::spawn_local;
use web_sys::{MessageEvent, MessagePort};

use crate::config::{parse_level, NodeConfig};
use crate::node::NoiseNode;
use crate::parameter::parameter_descriptors;
use crate::processor::Quantum;
use crate::web::buffer::{OutputBuffer, ParameterBuffer};
use crate::web::port::{inbound_from_js, WorkletPort};
use crate::web::unit::WasmLoader;

/// Returns the `parameterDescriptors` for the processor class.
#[wasm_bindgen(js_name = parameterDescriptors)]
pub fn parameter_descriptors_js() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&parameter_descriptors()).map_err(JsValue::from)
}

/// Installs the console logger at `level` (`error` through `trace`).
///
/// Unrecognised levels fall back to `info`. Only the first call in a global
/// scope takes effect.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) {
    // Another processor in this scope may already have installed the logger.
    console_log::init_with_level(parse_level(level)).ok();
}

/// Rust side of the noise generator `AudioWorkletProcessor`.
///
/// The JS processor class constructs one of these with its `port` and
/// `processorOptions` and forwards every `process` call to it.
#[wasm_bindgen]
pub struct NoiseGeneratorWorklet {
    node: NoiseNode<WasmLoader, WorkletPort>,
    port: MessagePort,
    outputs: OutputBuffer,
    params: ParameterBuffer,
    message_callback: Option<Closure<dyn Fn(MessageEvent)>>,
}

#[wasm_bindgen]
impl NoiseGeneratorWorklet {
    /// Creates the processor and starts listening on `port`.
    #[wasm_bindgen(constructor)]
    pub fn new(port: MessagePort, options: JsValue) -> Result<NoiseGeneratorWorklet, JsValue> {
        let config: NodeConfig = if options.is_undefined() || options.is_null() {
            NodeConfig::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        init_logging(&config.log_level);

        let node = NoiseNode::new(
            WasmLoader,
            WorkletPort::new(port.clone())?,
            &config,
            Arc::new(Math::random),
        );
        info!("noise generator created, capacity {}", config.capacity_hint);

        let mut worklet = NoiseGeneratorWorklet {
            node,
            port,
            outputs: OutputBuffer::new(),
            params: ParameterBuffer::new(),
            message_callback: None,
        };
        worklet.connect()?;
        Ok(worklet)
    }

    /// Wrapper to convert JS process args into Rust structs.
    pub fn process(&mut self, _inputs: &Array, outputs: &Array, parameters: &Object) -> bool {
        self.outputs.bind(outputs);
        self.params.fill_from_js(parameters);

        let params = self.params.get_ref();
        let quantum = self.node.process(&[], self.outputs.get_mut_refs(), &params);

        if quantum == Quantum::Rendered {
            self.outputs.copy_to_js();
        }
        quantum.keep_alive()
    }

    /// Lifecycle status of the unit: `unloaded`, `loading`, `reloading`, `ready` or `failed`.
    #[wasm_bindgen(getter)]
    pub fn status(&self) -> String {
        self.node.status().to_string()
    }

    /// Whether the manual trigger is currently held.
    #[wasm_bindgen(getter, js_name = manualTrigger)]
    pub fn manual_trigger(&self) -> bool {
        self.node.manual_override()
    }
}

impl NoiseGeneratorWorklet {
    /// Initialise inbound messaging from the node.
    fn connect(&mut self) -> Result<(), JsValue> {
        let node = self.node.clone();
        let callback = Closure::wrap(Box::new(move |event: MessageEvent| {
            let Some(message) = inbound_from_js(&event.data()) else {
                debug!("ignoring unrecognised message");
                return;
            };
            if let Some(load) = node.handle_message(message) {
                spawn_local(async move {
                    // Failures are already reported to the host by the node.
                    load.await.ok();
                });
            }
        }) as Box<dyn Fn(MessageEvent)>);

        self.port
            .add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())?;
        self.message_callback = Some(callback);
        self.port.start();
        Ok(())
    }
}

impl Drop for NoiseGeneratorWorklet {
    fn drop(&mut self) {
        if let Some(callback) = self.message_callback.take() {
            if let Err(err) = self
                .port
                .remove_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
            {
                error!("failed to detach message listener: {:?}", err);
            }
        }
    }
}
