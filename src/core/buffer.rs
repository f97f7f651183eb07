// src/core/buffer.rs

//! Owned contiguous storage underlying every data representation, with
//! explicit copy-vs-adopt construction and ownership hand-off on view export.
//!
//! A `Buffer` has exactly one owner at any time. Ownership transfers on move
//! and never duplicates; copies are explicit and deep (`deep_copy`). The one
//! sanctioned exception is the export-view operation: on first export the
//! storage is handed off to a reference-counted store so that destruction of
//! the owning representation can never free memory still reachable through a
//! live view. The buffer keeps a strong handle to that store, so repeated
//! exports return the same backing memory instead of re-transferring.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config;
use super::error::DataError;

/// Reference-counted store holding storage after its ownership has been
/// handed off to exported views. The lock exists for the opt-in writable
/// view mode; with the default read-only views it is only ever read-locked.
#[derive(Debug)]
pub struct ViewStore<T> {
    cells: RwLock<Vec<T>>,
}

/// An external window onto a `Buffer`'s storage.
///
/// Views are read-only by default. A writable view can be produced only when
/// the process settings permit it (`Settings::writable_views`); mutation
/// through such a view bypasses any invariants the owning representation
/// expects (cached norms, sorted sparse indices) and is an accepted risk of
/// that mode, not something the buffer can police.
#[derive(Debug, Clone)]
pub struct ExportedView<T> {
    store: Arc<ViewStore<T>>,
    writable: bool,
}

impl<T> ExportedView<T> {
    /// Read access to the viewed storage.
    pub fn read(&self) -> ViewReadGuard<'_, T> {
        ViewReadGuard {
            guard: read_lock(&self.store.cells),
        }
    }

    /// Write access to the viewed storage.
    ///
    /// Fails with [`DataError::ViewAccess`] when this view was exported
    /// read-only.
    pub fn write(&self) -> Result<ViewWriteGuard<'_, T>, DataError> {
        if !self.writable {
            return Err(DataError::ViewAccess {
                message: "view was exported read-only; in-place mutation requires a writable export".to_string(),
            });
        }
        Ok(ViewWriteGuard {
            guard: write_lock(&self.store.cells),
        })
    }

    /// Number of elements reachable through this view.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True when the view contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `self` and `other` are windows onto the identical backing
    /// store (not merely equal contents).
    pub fn same_store(&self, other: &ExportedView<T>) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

/// RAII guard for read access to an exported view.
pub struct ViewReadGuard<'a, T> {
    guard: RwLockReadGuard<'a, Vec<T>>,
}

impl<T> Deref for ViewReadGuard<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.guard
    }
}

/// RAII guard for write access to a writable exported view.
pub struct ViewWriteGuard<'a, T> {
    guard: RwLockWriteGuard<'a, Vec<T>>,
}

impl<T> Deref for ViewWriteGuard<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.guard
    }
}

impl<T> DerefMut for ViewWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.guard
    }
}

/// Where a buffer's storage currently lives.
#[derive(Debug)]
enum Storage<T> {
    /// The buffer is the sole owner; storage is freed on drop.
    Owned(Vec<T>),
    /// Ownership has been handed off to exported views. The cached handle is
    /// a strong reference: it keeps the first export's backing store alive
    /// and authoritative, so later exports alias it instead of re-exporting.
    Exported(Arc<ViewStore<T>>),
}

/// An exclusively-owned block of contiguous numeric storage.
///
/// Constructed either by copying caller data in (`copied`) or by adopting
/// caller-owned storage directly (`adopted`); the caller chooses at
/// construction. Single-owner discipline is enforced by the API shape
/// (adoption consumes the `Vec`), not by runtime checks.
#[derive(Debug)]
pub struct Buffer<T> {
    storage: Storage<T>,
    len: usize,
}

impl<T: Clone> Buffer<T> {
    /// Allocates fresh storage and copies `data` into it.
    ///
    /// `declared_len` is the element count the owning representation expects
    /// for its shape; a mismatch fails with [`DataError::InvalidBuffer`].
    pub fn copied(data: &[T], declared_len: usize) -> Result<Self, DataError> {
        check_declared_len(data.len(), declared_len)?;
        Ok(Self {
            storage: Storage::Owned(data.to_vec()),
            len: declared_len,
        })
    }

    /// Adopts caller-owned storage directly, taking responsibility for
    /// freeing it later.
    ///
    /// Adopting empty storage against a non-zero `declared_len` is the
    /// canonical invalid-buffer construction and fails accordingly.
    pub fn adopted(data: Vec<T>, declared_len: usize) -> Result<Self, DataError> {
        check_declared_len(data.len(), declared_len)?;
        Ok(Self {
            storage: Storage::Owned(data),
            len: declared_len,
        })
    }

    /// Wraps storage produced inside the crate, whose length is already
    /// consistent with the owning representation's layout.
    pub(crate) fn owned(data: Vec<T>) -> Self {
        let len = data.len();
        Self {
            storage: Storage::Owned(data),
            len,
        }
    }

    /// Deep copy of the buffer contents into a fresh, un-exported buffer.
    /// The copy owns its storage outright even when `self` has been exported.
    pub fn deep_copy(&self) -> Self {
        Self {
            storage: Storage::Owned(self.read().to_vec()),
            len: self.len,
        }
    }

    /// Copies the contents out into a plain vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.read().to_vec()
    }
}

impl<T> Buffer<T> {
    /// Number of elements held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once ownership has been handed off to exported views.
    pub fn is_exported(&self) -> bool {
        matches!(self.storage, Storage::Exported(_))
    }

    /// Read access to the storage, uniform over both ownership states.
    pub fn read(&self) -> BufferRead<'_, T> {
        match &self.storage {
            Storage::Owned(cells) => BufferRead::Direct(cells),
            Storage::Exported(store) => BufferRead::Shared(read_lock(&store.cells)),
        }
    }

    /// Exports an external window onto this buffer's storage.
    ///
    /// On first export, ownership of the storage transfers to the
    /// reference-counted view store; the buffer retains a strong handle and
    /// treats the store as authoritative thereafter. Every later export,
    /// read-only or writable, returns a window onto that same store.
    ///
    /// Views are read-only unless `writable` is requested *and* the process
    /// settings permit writable views ([`DataError::ViewAccess`] otherwise).
    pub fn export_view(&mut self, writable: bool) -> Result<ExportedView<T>, DataError> {
        if writable && !config::current().writable_views {
            return Err(DataError::ViewAccess {
                message: "writable views are disabled; enable Settings::writable_views to permit in-place mutation".to_string(),
            });
        }
        let store = match &mut self.storage {
            Storage::Exported(store) => Arc::clone(store),
            Storage::Owned(cells) => {
                let cells = std::mem::take(cells);
                let store = Arc::new(ViewStore {
                    cells: RwLock::new(cells),
                });
                self.storage = Storage::Exported(Arc::clone(&store));
                store
            }
        };
        Ok(ExportedView { store, writable })
    }
}

/// Read guard over buffer storage. Dereferences to a slice regardless of
/// whether the storage is still owned directly or lives in a view store.
pub enum BufferRead<'a, T> {
    /// Storage still directly owned by the buffer.
    Direct(&'a [T]),
    /// Storage handed off to a view store; held under a read lock.
    Shared(RwLockReadGuard<'a, Vec<T>>),
}

impl<T> Deref for BufferRead<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match self {
            BufferRead::Direct(cells) => cells,
            BufferRead::Shared(guard) => guard,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Buffer(len={}, {})",
            self.len,
            if self.is_exported() { "exported" } else { "owned" }
        )
    }
}

fn check_declared_len(actual: usize, declared: usize) -> Result<(), DataError> {
    if actual != declared {
        return Err(DataError::InvalidBuffer {
            message: format!(
                "storage holds {} element(s) but the declared layout requires {}",
                actual, declared
            ),
        });
    }
    Ok(())
}

// Lock poisoning can only arise from a panic in another holder; the data is
// plain numeric storage, so recover it rather than propagate the panic.
fn read_lock<T>(lock: &RwLock<Vec<T>>) -> RwLockReadGuard<'_, Vec<T>> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<Vec<T>>) -> RwLockWriteGuard<'_, Vec<T>> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    fn payload(n: usize) -> Vec<Complex<f64>> {
        (0..n).map(|i| Complex::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn adopt_empty_against_nonzero_len_fails() {
        let result = Buffer::<Complex<f64>>::adopted(Vec::new(), 4);
        assert!(matches!(result, Err(DataError::InvalidBuffer { .. })));
    }

    #[test]
    fn copy_length_mismatch_fails() {
        let data = payload(3);
        let result = Buffer::copied(&data, 9);
        assert!(matches!(result, Err(DataError::InvalidBuffer { .. })));
    }

    #[test]
    fn repeated_export_returns_same_backing_store() -> Result<(), DataError> {
        let mut buffer = Buffer::adopted(payload(4), 4)?;
        assert!(!buffer.is_exported());

        let first = buffer.export_view(false)?;
        assert!(buffer.is_exported());
        let second = buffer.export_view(false)?;

        assert!(first.same_store(&second), "exports must alias one store");
        assert_eq!(&first.read()[..], &payload(4)[..]);
        Ok(())
    }

    #[test]
    fn buffer_reads_through_exported_store() -> Result<(), DataError> {
        let mut buffer = Buffer::adopted(payload(3), 3)?;
        let _view = buffer.export_view(false)?;
        // The buffer still reads its contents after the hand-off.
        assert_eq!(&buffer.read()[..], &payload(3)[..]);
        assert_eq!(buffer.to_vec(), payload(3));
        Ok(())
    }

    #[test]
    fn read_only_view_rejects_writes() -> Result<(), DataError> {
        let mut buffer = Buffer::adopted(payload(2), 2)?;
        let view = buffer.export_view(false)?;
        assert!(matches!(view.write(), Err(DataError::ViewAccess { .. })));
        Ok(())
    }

    #[test]
    fn deep_copy_is_independent_of_exports() -> Result<(), DataError> {
        let mut buffer = Buffer::adopted(payload(2), 2)?;
        let _view = buffer.export_view(false)?;
        let copy = buffer.deep_copy();
        assert!(!copy.is_exported());
        assert_eq!(copy.to_vec(), payload(2));
        Ok(())
    }
}
