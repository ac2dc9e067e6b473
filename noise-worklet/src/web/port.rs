use js_sys::{ArrayBuffer, Object, Reflect, Uint8Array};
use log::warn;
use wasm_bindgen::JsValue;
use web_sys::MessagePort;

use crate::message::{
    HostPort, InboundMessage, LoadFailedMessage, TriggerMessage, UnitFailedMessage,
};

/// Field names a unit binary may be sent under.
const BINARY_FIELDS: [&str; 2] = ["payload", "wasmBinary"];

/// Posts outbound messages to the node's `MessagePort`.
///
/// Trigger changes reuse one JS object so posting from the audio thread does
/// not allocate.
pub struct WorkletPort {
    port: MessagePort,
    trigger_change: Object,
    value_key: JsValue,
}

impl WorkletPort {
    /// Wraps the processor side of the node's port.
    pub fn new(port: MessagePort) -> Result<Self, JsValue> {
        let trigger_change = Object::new();
        let value_key = JsValue::from_str("value");
        Reflect::set(&trigger_change, &"type".into(), &"trigger-change".into())?;
        Reflect::set(&trigger_change, &value_key, &JsValue::FALSE)?;
        Ok(Self {
            port,
            trigger_change,
            value_key,
        })
    }
}

impl HostPort for WorkletPort {
    fn post_trigger(&self, message: &TriggerMessage) {
        let posted = Reflect::set(
            &self.trigger_change,
            &self.value_key,
            &JsValue::from_bool(message.value),
        )
        .and_then(|_| self.port.post_message(&self.trigger_change));
        if let Err(err) = posted {
            warn!("failed to post trigger change: {:?}", err);
        }
    }

    fn post_load_failed(&self, message: &LoadFailedMessage) {
        if let Err(err) = self.post_serialized(message) {
            warn!("failed to post load failure: {:?}", err);
        }
    }

    fn post_unit_failed(&self, message: &UnitFailedMessage) {
        if let Err(err) = self.post_serialized(message) {
            warn!("failed to post unit failure: {:?}", err);
        }
    }
}

impl WorkletPort {
    fn post_serialized<T: serde::Serialize>(&self, message: &T) -> Result<(), JsValue> {
        let value = serde_wasm_bindgen::to_value(message)?;
        self.port.post_message(&value)
    }
}

/// Reads an inbound message from a `MessageEvent`'s data.
///
/// Returns `None` for anything that is not a recognised message.
pub fn inbound_from_js(data: &JsValue) -> Option<InboundMessage> {
    if !data.is_object() {
        return None;
    }
    let kind = Reflect::get(data, &"type".into()).ok()?.as_string()?;
    match kind.as_str() {
        // Binaries arrive as ArrayBuffers or typed arrays, not as serde sequences.
        "wasm" | "module-binary" => {
            let payload = BINARY_FIELDS.iter().find_map(|field| {
                Reflect::get(data, &(*field).into())
                    .ok()
                    .filter(|value| value.is_object())
            })?;
            Some(InboundMessage::ModuleBinary {
                payload: binary_bytes(&payload)?,
            })
        }
        _ => serde_wasm_bindgen::from_value(data.clone()).ok(),
    }
}

/// Copies the bytes of an `ArrayBuffer` or of any view onto one.
///
/// Views are read through their byte window, so a `Float32Array` or
/// `DataView` yields its raw bytes rather than converted element values.
fn binary_bytes(payload: &JsValue) -> Option<Vec<u8>> {
    if !ArrayBuffer::is_view(payload) {
        return Some(Uint8Array::new(payload).to_vec());
    }
    let field = |name: &str| Reflect::get(payload, &name.into()).ok();
    let buffer = field("buffer")?;
    let byte_offset = field("byteOffset")?.as_f64()? as u32;
    let byte_length = field("byteLength")?.as_f64()? as u32;
    Some(Uint8Array::new_with_byte_offset_and_length(&buffer, byte_offset, byte_length).to_vec())
}
