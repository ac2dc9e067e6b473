use enum_map::{Enum, EnumMap};
use serde::Serialize;

/// The automation rate of an AudioParam.
///
/// The automation rate can be selected by setting the `automationRate` attribute
/// with one of the following values.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationRate {
    /// Audio-rate automation. The parameter is updated for every sample frame.
    #[serde(rename = "a-rate")]
    ARate,
    /// Control-rate automation. The parameter is updated for every render quantum.
    #[serde(rename = "k-rate")]
    KRate,
}

/// Parameter descriptor for the Web Audio API.
///
/// Serializes to the `AudioParamDescriptor` dictionary shape expected by
/// `AudioWorkletProcessor.parameterDescriptors`. Bounds left as `None` fall
/// back to the host's defaults.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    /// The name of the parameter.
    pub name: &'static str,
    /// The default value of the parameter.
    pub default_value: f32,
    /// The minimum value the parameter can take.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f32>,
    /// The maximum value the parameter can take.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f32>,
    /// The rate at which the parameter is automated.
    pub automation_rate: AutomationRate,
}

/// The four block-automated parameters fed to the noise generator unit.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseParam {
    /// Upper bound of the random step taken when re-sampling.
    StepMax,
    /// Lower bound of the random step taken when re-sampling.
    StepMin,
    /// Number of samples a value is held before re-sampling.
    SampleHold,
    /// A rising edge requests a new sample immediately.
    NextValueTrigger,
}

impl NoiseParam {
    /// All parameters in declaration order.
    pub const ALL: [NoiseParam; 4] = [
        NoiseParam::StepMax,
        NoiseParam::StepMin,
        NoiseParam::SampleHold,
        NoiseParam::NextValueTrigger,
    ];

    /// Name of the AudioParam as seen by the host.
    pub fn name(self) -> &'static str {
        match self {
            NoiseParam::StepMax => "stepMax",
            NoiseParam::StepMin => "stepMin",
            NoiseParam::SampleHold => "sampleHold",
            NoiseParam::NextValueTrigger => "nextValueTrigger",
        }
    }

    /// Name of the unit export returning this parameter's buffer offset.
    pub fn pointer_export(self) -> &'static str {
        match self {
            NoiseParam::StepMax => "get_step_max_ptr",
            NoiseParam::StepMin => "get_step_min_ptr",
            NoiseParam::SampleHold => "get_sample_hold_ptr",
            NoiseParam::NextValueTrigger => "get_next_value_trigger_ptr",
        }
    }

    /// Older unit builds spell the step exports out in full.
    pub fn legacy_pointer_export(self) -> Option<&'static str> {
        match self {
            NoiseParam::StepMax => Some("get_step_maximum_ptr"),
            NoiseParam::StepMin => Some("get_step_minimum_ptr"),
            NoiseParam::SampleHold | NoiseParam::NextValueTrigger => None,
        }
    }

    /// Returns the descriptor registered with the audio graph.
    pub fn descriptor(self) -> ParameterDescriptor {
        let (default_value, min_value, max_value) = match self {
            NoiseParam::StepMax => (1.0, Some(0.0), Some(1.0)),
            NoiseParam::StepMin => (0.0, Some(0.0), Some(1.0)),
            NoiseParam::SampleHold => (1.0, Some(0.0), Some(1_000_000.0)),
            NoiseParam::NextValueTrigger => (0.0, None, None),
        };
        ParameterDescriptor {
            name: self.name(),
            default_value,
            min_value,
            max_value,
            automation_rate: AutomationRate::ARate,
        }
    }

}

/// Descriptors for every parameter, in declaration order.
pub fn parameter_descriptors() -> Vec<ParameterDescriptor> {
    NoiseParam::ALL.iter().map(|param| param.descriptor()).collect()
}

/// Per-block parameter arrays, one slice per [`NoiseParam`].
///
/// Each slice holds either one value per sample in the block or a single
/// value when the parameter is constant over the block.
pub struct QuantumParameters<'a> {
    values: EnumMap<NoiseParam, &'a [f32]>,
}

impl<'a> QuantumParameters<'a> {
    /// Builds the parameter set from one slice per parameter.
    pub fn new(values: EnumMap<NoiseParam, &'a [f32]>) -> Self {
        Self { values }
    }

    /// Uses each parameter's default value as a constant over the block.
    pub fn defaults() -> Self {
        static DEFAULTS: [[f32; 1]; 4] = [[1.0], [0.0], [1.0], [0.0]];
        Self {
            values: EnumMap::from_fn(|param: NoiseParam| &DEFAULTS[param.into_usize()][..]),
        }
    }

    /// Returns the block array for `param`.
    pub fn get(&self, param: NoiseParam) -> &'a [f32] {
        self.values[param]
    }

    /// Replaces the block array for `param`.
    pub fn set(&mut self, param: NoiseParam, values: &'a [f32]) {
        self.values[param] = values;
    }
}
