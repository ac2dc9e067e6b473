//! Float-slot access to a unit's linear memory.
//!
//! The unit reports byte offsets into its memory; the host addresses that
//! memory as 32-bit float slots. A [`MemoryView`] is only ever borrowed from
//! the live unit for the duration of one block, so a view can never outlive a
//! reload.

use crate::error::UnitError;

/// Size of one float slot in bytes.
pub const BYTES_PER_SLOT: usize = std::mem::size_of::<f32>();

/// Backing storage of a unit, addressed in float slots.
///
/// Implementations may assume every access is within `0..slot_count()`;
/// [`MemoryView`] performs the bounds checks.
pub trait LinearMemory {
    /// Number of whole float slots in the memory.
    fn slot_count(&self) -> usize;

    /// Copies `values` into the slots starting at `start`.
    fn write_slots(&mut self, start: usize, values: &[f32]);

    /// Copies the slots starting at `start` into `out`.
    fn read_slots(&self, start: usize, out: &mut [f32]);
}

impl LinearMemory for Vec<f32> {
    fn slot_count(&self) -> usize {
        self.len()
    }

    fn write_slots(&mut self, start: usize, values: &[f32]) {
        self[start..start + values.len()].copy_from_slice(values);
    }

    fn read_slots(&self, start: usize, out: &mut [f32]) {
        out.copy_from_slice(&self[start..start + out.len()]);
    }
}

/// Bounds-checked window over a unit's memory for a single block.
pub struct MemoryView<'m, M: LinearMemory + ?Sized> {
    memory: &'m mut M,
}

impl<'m, M: LinearMemory + ?Sized> MemoryView<'m, M> {
    /// Binds a view to the unit's current memory.
    pub fn new(memory: &'m mut M) -> Self {
        Self { memory }
    }

    /// Converts a unit-reported byte offset into a slot index.
    pub fn slot_index(offset: u32) -> Result<usize, UnitError> {
        let offset_bytes = offset as usize;
        if offset_bytes % BYTES_PER_SLOT != 0 {
            return Err(UnitError::MisalignedOffset {
                offset,
                align: BYTES_PER_SLOT,
            });
        }
        Ok(offset_bytes / BYTES_PER_SLOT)
    }

    fn check_range(&self, start: usize, count: usize) -> Result<(), UnitError> {
        let len = self.memory.slot_count();
        match start.checked_add(count) {
            Some(end) if end <= len => Ok(()),
            end => Err(UnitError::OutOfBounds {
                start,
                end: end.unwrap_or(usize::MAX),
                len,
            }),
        }
    }

    /// Writes `values` at the byte offset reported by the unit.
    pub fn write(&mut self, offset: u32, values: &[f32]) -> Result<(), UnitError> {
        let start = Self::slot_index(offset)?;
        self.check_range(start, values.len())?;
        self.memory.write_slots(start, values);
        Ok(())
    }

    /// Copies the region at `offset` into every channel.
    ///
    /// The unit generates a single channel; each output channel receives the
    /// same samples, as many as the channel is long.
    pub fn fan_out(&self, offset: u32, channels: &mut [&mut [f32]]) -> Result<(), UnitError> {
        let start = Self::slot_index(offset)?;
        let longest = channels.iter().map(|channel| channel.len()).max().unwrap_or(0);
        self.check_range(start, longest)?;
        for channel in channels.iter_mut() {
            self.memory.read_slots(start, channel);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_land_at_slot_of_byte_offset() {
        for len in [1usize, 128, 256] {
            let mut memory = vec![0.0f32; 512];
            let values: Vec<f32> = (0..len).map(|i| i as f32 * 0.5 - 3.25).collect();

            MemoryView::new(&mut memory).write(64, &values).unwrap();

            assert_eq!(
                memory[16..16 + len].iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                values.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
            );
            assert_eq!(memory[15], 0.0);
            assert_eq!(memory[16 + len], 0.0);
        }
    }

    #[test]
    fn misaligned_offset_is_rejected() {
        let mut memory = vec![0.0f32; 8];
        let mut view = MemoryView::new(&mut memory);

        assert_eq!(
            view.write(6, &[1.0]),
            Err(UnitError::MisalignedOffset { offset: 6, align: 4 })
        );
        assert_eq!(memory, vec![0.0; 8]);
    }

    #[test]
    fn out_of_bounds_access_is_rejected() {
        let mut memory = vec![0.0f32; 8];
        let mut view = MemoryView::new(&mut memory);

        assert_eq!(
            view.write(24, &[1.0, 2.0, 3.0]),
            Err(UnitError::OutOfBounds { start: 6, end: 9, len: 8 })
        );
        let mut out = [0.0; 2];
        assert_eq!(
            view.fan_out(28, &mut [&mut out[..]]),
            Err(UnitError::OutOfBounds { start: 7, end: 9, len: 8 })
        );
    }

    #[test]
    fn fan_out_copies_same_region_to_every_channel() {
        let mut memory = vec![0.0, 0.1, 0.2, 0.3, 0.0];
        let view = MemoryView::new(&mut memory);
        let mut left = [9.0; 3];
        let mut right = [9.0; 3];

        view.fan_out(4, &mut [&mut left[..], &mut right[..]]).unwrap();

        assert_eq!(left, [0.1, 0.2, 0.3]);
        assert_eq!(right, [0.1, 0.2, 0.3]);
    }
}
