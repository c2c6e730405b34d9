use alloc::vec::Vec;

use super::handle::Handle;
use crate::error::AllocError;

/// Slab of node slots with a free list.
///
/// Freed slots are recycled by later allocations. An optional limit caps the number
/// of live slots; allocation past it fails instead of growing.
#[derive(Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<Handle>,
    limit: usize,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            limit: Handle::MAX,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity.min(Handle::MAX)),
            free: Vec::new(),
            limit: Handle::MAX,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) const fn len(&self) -> usize {
        self.slots.len().saturating_sub(self.free.len())
    }

    pub(crate) const fn limit(&self) -> usize {
        self.limit
    }

    /// Caps the number of live slots. Values above `Handle::MAX` are clamped.
    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.limit = limit.min(Handle::MAX);
    }

    /// Reserves room for `additional` more slots without exceeding the limit.
    pub(crate) fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let wanted = additional.min(self.limit).saturating_sub(self.free.len());
        self.slots.try_reserve(wanted).map_err(|_| {
            log::warn!("node store could not reserve {wanted} slots");
            AllocError::OutOfMemory
        })
    }

    /// Stores `element` in a free slot, growing the slab if needed.
    ///
    /// On failure nothing is stored and `element` is dropped.
    pub(crate) fn try_alloc(&mut self, element: T) -> Result<Handle, AllocError> {
        if self.len() >= self.limit {
            log::warn!("node store limit of {} nodes reached", self.limit);
            return Err(AllocError::NodeLimit { limit: self.limit });
        }

        if let Some(h) = self.free.pop() {
            self.slots[h.to_index()] = Some(element);
            return Ok(h);
        }

        // `len() < limit <= Handle::MAX` and the free list is empty, so the new index fits.
        if self.slots.try_reserve(1).is_err() {
            log::warn!("node store could not grow past {} slots", self.slots.len());
            return Err(AllocError::OutOfMemory);
        }
        self.slots.push(Some(element));
        Ok(Handle::from_index(self.slots.len() - 1))
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.slots[handle.to_index()].as_ref().expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.slots[handle.to_index()].as_mut().expect("`Arena::get_mut()` - `handle` is invalid!")
    }

    /// Returns `true` if `handle` names a live slot.
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.slots.get(handle.to_index()).is_some_and(Option::is_some)
    }

    /// Releases the slot and hands its element back.
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let element = self.slots[handle.to_index()].take().expect("`Arena::take()` - `handle` is invalid!");
        self.free.push(handle);
        element
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}
