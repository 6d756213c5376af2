use crate::context::ContextId;
use crate::errors::Status;
use crate::runtime::value::JsValue;

/// Opaque token naming one rooted value. Valid until its owning scope
/// closes, or until it is escaped into the enclosing scope, and only in the
/// context that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    context: ContextId,
    slot: u32,
    generation: u32,
}

struct HandleSlot {
    generation: u32,
    value: Option<JsValue>,
}

/// Backing storage for handles, with a free list and per-slot generations
/// so that stale tokens are detected instead of aliasing a reused slot.
pub(crate) struct HandleArena {
    owner: ContextId,
    slots: Vec<HandleSlot>,
    free: Vec<u32>,
    live: usize,
}

impl HandleArena {
    pub fn new(owner: ContextId) -> Self {
        Self {
            owner,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn insert(&mut self, value: JsValue) -> Result<Handle, Status> {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize].value = Some(value);
                slot
            }
            None => {
                let slot = u32::try_from(self.slots.len()).map_err(|_| Status::OutOfMemory)?;
                self.slots
                    .try_reserve(1)
                    .map_err(|_| Status::OutOfMemory)?;
                self.slots.push(HandleSlot {
                    generation: 0,
                    value: Some(value),
                });
                slot
            }
        };
        self.live += 1;
        Ok(Handle {
            context: self.owner,
            slot,
            generation: self.slots[slot as usize].generation,
        })
    }

    pub fn get(&self, handle: Handle) -> Option<&JsValue> {
        if handle.context != self.owner {
            return None;
        }
        self.slots
            .get(handle.slot as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Frees the slot and hands back its value without releasing it.
    pub fn take(&mut self, handle: Handle) -> Option<JsValue> {
        if handle.context != self.owner {
            return None;
        }
        let slot = self
            .slots
            .get_mut(handle.slot as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.slot);
        self.live -= 1;
        Some(value)
    }

    pub fn reserve(&mut self, additional: usize) -> Result<(), Status> {
        let spare = self.free.len();
        if additional > spare {
            self.slots
                .try_reserve(additional - spare)
                .map_err(|_| Status::OutOfMemory)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.live
    }
}
