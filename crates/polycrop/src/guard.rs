//! Device-conditional serialization of the drawing step.
//!
//! A known set of device models exhibits unsafe behavior when bitmap
//! drawing runs concurrently. On those devices the mask rasterization and
//! composite write must be serialized process-wide; everywhere else the
//! guard must cost nothing and never block.
//!
//! The choice is made once, at construction, from an explicit flag (or the
//! device model via [`DrawGuard::for_device`]) and injected into
//! [`PolygonCrop`](crate::PolygonCrop). Hosts that want a single
//! process-wide guard share one `Arc<DrawGuard>` across transformations.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Device models whose drivers require serialized bitmap drawing:
/// Moto X gen 2, Moto G gen 1 and gen 2.
pub const SERIALIZED_DRAWING_MODELS: &[&str] = &[
    // Moto X gen 2
    "XT1085", "XT1092", "XT1093", "XT1094", "XT1095", "XT1096", "XT1097", "XT1098",
    // Moto G gen 1
    "XT1031", "XT1028", "XT937C", "XT1032", "XT1008", "XT1033", "XT1035", "XT1034", "XT939G",
    "XT1039", "XT1040", "XT1042", "XT1045",
    // Moto G gen 2
    "XT1063", "XT1064", "XT1068", "XT1069", "XT1072", "XT1077", "XT1078", "XT1079",
];

/// Whether `model` is on the known list requiring serialized drawing.
#[must_use]
pub fn requires_serialized_drawing(model: &str) -> bool {
    SERIALIZED_DRAWING_MODELS.contains(&model)
}

/// Mutual-exclusion guard around the drawing step.
///
/// Two variants behind one acquire/release contract: a real mutex when
/// drawing must be serialized, and a lockless no-op whose acquisition
/// never blocks. [`acquire`](Self::acquire) returns an RAII permit;
/// dropping it (on any path, including unwind) releases the guard.
#[derive(Debug, Default)]
pub struct DrawGuard {
    lock: Option<Mutex<()>>,
}

impl DrawGuard {
    /// Create a guard; serialized when the flag is set, lockless otherwise.
    #[must_use]
    pub fn new(requires_serialized_drawing: bool) -> Self {
        Self {
            lock: requires_serialized_drawing.then(|| Mutex::new(())),
        }
    }

    /// Create the guard appropriate for the given device model.
    #[must_use]
    pub fn for_device(model: &str) -> Self {
        Self::new(requires_serialized_drawing(model))
    }

    /// Whether this guard actually serializes.
    #[must_use]
    pub const fn is_serialized(&self) -> bool {
        self.lock.is_some()
    }

    /// Acquire the guard, blocking only for the serialized variant while
    /// another thread is drawing.
    pub fn acquire(&self) -> DrawPermit<'_> {
        DrawPermit {
            _held: self
                .lock
                .as_ref()
                .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner)),
        }
    }
}

/// Scoped proof of guard acquisition; released on drop.
#[must_use = "the guard is released as soon as the permit is dropped"]
pub struct DrawPermit<'a> {
    _held: Option<MutexGuard<'a, ()>>,
}
