use crate::error::UnitError;
use crate::memory::MemoryView;
use crate::parameter::{NoiseParam, QuantumParameters};
use crate::unit::{ComputeUnit, QuantumLengths, UnitHandle};

/// Written in place of the automated trigger while the host holds it high.
const MANUAL_TRIGGER: [f32; 1] = [1.0];

/// Copies one block of parameter arrays into the unit's memory.
///
/// Offsets are asked for afresh on every call since the unit may move its
/// buffers between blocks. Returns the logical length of each array as
/// `process_quantum` expects it.
pub fn write_parameters<U: ComputeUnit>(
    unit: &mut U,
    handle: UnitHandle,
    params: &QuantumParameters<'_>,
    manual_override: bool,
) -> Result<QuantumLengths, UnitError> {
    let mut lengths = QuantumLengths::default();
    for param in NoiseParam::ALL {
        let values = match param {
            NoiseParam::NextValueTrigger if manual_override => &MANUAL_TRIGGER[..],
            _ => params.get(param),
        };
        let offset = unit.parameter_offset(handle, param)?;
        MemoryView::new(unit.memory()).write(offset, values)?;
        lengths[param] = values.len() as u32;
    }
    Ok(lengths)
}
