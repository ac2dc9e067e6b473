//! Loading and readiness of the computation unit.
//!
//! A load runs off the audio thread and, once the unit is instantiated and
//! initialised, installs an immutable snapshot (unit plus handle) and flips
//! the readiness flag. Block processing checks the flag and then only *tries*
//! to take the snapshot; it never waits for a load.

use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::LocalBoxFuture;
use log::{debug, info, warn};

use crate::error::LoadError;
use crate::unit::{ComputeUnit, UnitHandle, UnitImports, UnitLoader};

/// Where the unit is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// No binary has been received yet.
    Unloaded,
    /// A binary is being compiled and instantiated.
    Loading,
    /// A replacement is loading while the previous unit keeps serving blocks.
    Reloading,
    /// The unit is serving blocks.
    Ready,
    /// The last load failed or the unit broke at runtime.
    Failed(String),
}

impl Display for UnitStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Unloaded => f.write_str("unloaded"),
            UnitStatus::Loading => f.write_str("loading"),
            UnitStatus::Reloading => f.write_str("reloading"),
            UnitStatus::Ready => f.write_str("ready"),
            UnitStatus::Failed(_) => f.write_str("failed"),
        }
    }
}

/// An initialised unit together with the handle its `init` returned.
pub struct LoadedUnit<U> {
    /// The instantiated unit.
    pub unit: U,
    /// Handle for the per-instance state inside `unit`.
    pub handle: UnitHandle,
}

struct Shared<U> {
    ready: AtomicBool,
    generation: AtomicU64,
    status: Mutex<UnitStatus>,
    snapshot: Mutex<Option<LoadedUnit<U>>>,
}

impl<U> Shared<U> {
    fn set_status(&self, status: UnitStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn install(&self, loaded: LoadedUnit<U>) {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        // Dropping the previous unit also drops its handle and memory.
        *snapshot = Some(loaded);
        self.set_status(UnitStatus::Ready);
        self.ready.store(true, Ordering::Release);
    }

    fn clear(&self, cause: String) {
        self.ready.store(false, Ordering::Release);
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.set_status(UnitStatus::Failed(cause));
    }
}

/// Owns the loaded unit and gates access to it.
pub struct UnitLifecycle<L: UnitLoader> {
    loader: Arc<L>,
    capacity_hint: u32,
    shared: Arc<Shared<L::Unit>>,
}

impl<L: UnitLoader> Clone for UnitLifecycle<L> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            capacity_hint: self.capacity_hint,
            shared: self.shared.clone(),
        }
    }
}

impl<L: UnitLoader> UnitLifecycle<L> {
    /// Creates an unloaded lifecycle.
    ///
    /// Units are initialised for blocks of up to `capacity_hint` samples.
    pub fn new(loader: L, capacity_hint: u32) -> Self {
        Self {
            loader: Arc::new(loader),
            capacity_hint,
            shared: Arc::new(Shared {
                ready: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                status: Mutex::new(UnitStatus::Unloaded),
                snapshot: Mutex::new(None),
            }),
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> UnitStatus {
        self.shared
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether blocks are currently being served by a unit.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Starts loading `binary`.
    ///
    /// The previously loaded unit, if any, keeps serving blocks until the new
    /// one is ready. When several loads overlap, the last one started wins and
    /// the others resolve to `Ok(())` without touching the node.
    pub fn load(
        &self,
        binary: Vec<u8>,
        imports: UnitImports,
    ) -> LocalBoxFuture<'static, Result<(), LoadError>> {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!("loading unit ({} bytes)", binary.len());
        self.shared.set_status(if self.is_ready() {
            UnitStatus::Reloading
        } else {
            UnitStatus::Loading
        });

        let pending = self.loader.instantiate(binary, imports);
        let shared = self.shared.clone();
        let capacity_hint = self.capacity_hint;

        Box::pin(async move {
            let loaded = match pending.await {
                Ok(mut unit) => unit
                    .init(capacity_hint)
                    .map(|handle| LoadedUnit { unit, handle })
                    .map_err(LoadError::from),
                Err(err) => Err(err),
            };

            if shared.generation.load(Ordering::Acquire) != generation {
                debug!("discarding superseded unit load");
                return Ok(());
            }

            match loaded {
                Ok(loaded) => {
                    shared.install(loaded);
                    info!("unit ready");
                    Ok(())
                }
                Err(err) => {
                    shared.clear(err.to_string());
                    Err(err)
                }
            }
        })
    }

    /// Runs `f` against the loaded unit.
    ///
    /// Returns `None` without waiting when no unit is ready or the snapshot is
    /// being swapped.
    pub fn with_unit<R>(&self, f: impl FnOnce(&mut LoadedUnit<L::Unit>) -> R) -> Option<R> {
        if !self.is_ready() {
            return None;
        }
        let mut snapshot = self.shared.snapshot.try_lock().ok()?;
        snapshot.as_mut().map(f)
    }

    /// Takes the unit out of service after it misbehaved.
    pub fn fail(&self, cause: String) {
        warn!("unit taken out of service: {cause}");
        self.shared.clear(cause);
    }
}
