use serde::{Deserialize, Serialize};

/// Messages posted by the host to the worklet's port.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Forces the trigger parameter high while `value` is true.
    #[serde(rename = "manual-trigger")]
    ManualTrigger {
        /// New manual override state.
        value: bool,
    },
    /// A compiled unit to (re)load.
    #[serde(rename = "module-binary", alias = "wasm")]
    ModuleBinary {
        /// Raw unit binary.
        #[serde(alias = "wasmBinary")]
        payload: Vec<u8>,
    },
}

/// Sent to the host whenever the unit's trigger-active state flips.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", rename = "trigger-change")]
pub struct TriggerMessage {
    /// The unit's new trigger-active state.
    pub value: bool,
}

/// Sent to the host when a unit could not be loaded.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename = "load-failed")]
pub struct LoadFailedMessage {
    /// Human readable reason.
    pub cause: String,
}

/// Sent to the host when a running unit was taken out of service.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename = "unit-failed")]
pub struct UnitFailedMessage {
    /// Human readable reason.
    pub cause: String,
}

/// Outbound half of the host message channel.
///
/// Implementations must not block: posts happen on the audio thread while
/// the unit is computing a block.
pub trait HostPort {
    /// Posts a trigger change notification.
    fn post_trigger(&self, message: &TriggerMessage);

    /// Posts a load failure notification.
    fn post_load_failed(&self, message: &LoadFailedMessage);

    /// Posts a runtime failure notification.
    fn post_unit_failed(&self, message: &UnitFailedMessage);
}
