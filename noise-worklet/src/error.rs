use thiserror::Error;

/// Reasons a unit could not be brought to the ready state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The binary could not be compiled or instantiated.
    #[error("failed to instantiate unit: {0}")]
    Instantiate(String),

    /// The instance lacks an export the protocol depends on.
    #[error("unit is missing export `{0}`")]
    MissingExport(&'static str),

    /// The unit's `init` entry point failed.
    #[error("unit init failed: {0}")]
    Init(#[from] UnitError),
}

/// Errors raised while calling into a loaded unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    /// The unit threw while executing an export.
    #[error("unit trapped in `{export}`: {message}")]
    Trap {
        /// Export that was being called.
        export: &'static str,
        /// Message reported by the runtime.
        message: String,
    },

    /// An export returned something other than a pointer-sized integer.
    #[error("unit export `{0}` returned a non-integer value")]
    InvalidReturn(&'static str),

    /// A reported byte offset is not a multiple of the float slot size.
    #[error("offset {offset} is not aligned to {align}-byte float slots")]
    MisalignedOffset {
        /// Offending byte offset.
        offset: u32,
        /// Required alignment in bytes.
        align: usize,
    },

    /// A slot range falls outside the unit's linear memory.
    #[error("slots {start}..{end} exceed memory of {len} slots")]
    OutOfBounds {
        /// First slot of the access.
        start: usize,
        /// One past the last slot of the access.
        end: usize,
        /// Number of slots in the memory.
        len: usize,
    },
}

impl UnitError {
    /// Pointer arithmetic errors mean the unit broke its memory contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            UnitError::MisalignedOffset { .. } | UnitError::OutOfBounds { .. }
        )
    }
}
