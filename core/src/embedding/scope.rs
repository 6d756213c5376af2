use crate::context::ContextId;
use crate::embedding::handle::{Handle, HandleArena};
use crate::errors::Status;
use crate::runtime::value::JsValue;

/// Identity of a scope frame: the issuing context plus a serial number, so
/// a token from a sibling context never matches a local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScopeId {
    context: ContextId,
    serial: u64,
}

/// Token for an open rooting scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleScope {
    id: ScopeId,
}

/// Token for an open rooting scope that may promote one handle to the scope
/// below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EscapableHandleScope {
    id: ScopeId,
}

impl HandleScope {
    pub(crate) fn id(&self) -> ScopeId {
        self.id
    }
}

impl EscapableHandleScope {
    pub(crate) fn id(&self) -> ScopeId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscapeState {
    NotEscapable,
    Available,
    Used,
}

struct ScopeFrame {
    id: ScopeId,
    handles: Vec<Handle>,
    escape: EscapeState,
}

/// Result of an escape. A handle owned by the escaping scope is moved; a
/// handle owned elsewhere is shared and the caller must take an extra
/// reference on the value.
pub(crate) enum Escaped {
    Moved(Handle),
    Shared(Handle, JsValue),
}

/// Per-context LIFO stack of rooting scopes.
pub(crate) struct ScopeStack {
    owner: ContextId,
    frames: Vec<ScopeFrame>,
    arena: HandleArena,
    next_serial: u64,
}

impl ScopeStack {
    pub fn new(owner: ContextId) -> Self {
        Self {
            owner,
            frames: Vec::new(),
            arena: HandleArena::new(owner),
            next_serial: 0,
        }
    }

    pub fn open(&mut self) -> Result<HandleScope, Status> {
        self.push(EscapeState::NotEscapable)
            .map(|id| HandleScope { id })
    }

    pub fn open_escapable(&mut self) -> Result<EscapableHandleScope, Status> {
        self.push(EscapeState::Available)
            .map(|id| EscapableHandleScope { id })
    }

    fn push(&mut self, escape: EscapeState) -> Result<ScopeId, Status> {
        self.frames
            .try_reserve(1)
            .map_err(|_| Status::OutOfMemory)?;
        let id = ScopeId {
            context: self.owner,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.frames.push(ScopeFrame {
            id,
            handles: Vec::new(),
            escape,
        });
        Ok(id)
    }

    /// Links `value` into the innermost scope. The value is stored as is;
    /// rooting never changes its reference count.
    pub fn root(&mut self, value: JsValue) -> Result<Handle, Status> {
        let frame = self.frames.last_mut().ok_or(Status::ScopeMismatch)?;
        frame
            .handles
            .try_reserve(1)
            .map_err(|_| Status::OutOfMemory)?;
        let handle = self.arena.insert(value)?;
        frame.handles.push(handle);
        Ok(handle)
    }

    /// Pops the innermost scope if it is `id`, handing back the values it
    /// rooted so the caller can release them.
    pub fn close(&mut self, id: ScopeId) -> Result<Vec<JsValue>, Status> {
        if self.frames.last().map(|frame| frame.id) != Some(id) {
            return Err(Status::ScopeMismatch);
        }
        let Some(frame) = self.frames.pop() else {
            return Err(Status::ScopeMismatch);
        };
        Ok(self.free_frame(frame))
    }

    pub fn escape(&mut self, id: ScopeId, handle: Handle) -> Result<Escaped, Status> {
        let position = self
            .frames
            .iter()
            .rposition(|frame| frame.id == id)
            .ok_or(Status::ScopeMismatch)?;
        match self.frames[position].escape {
            EscapeState::Used => return Err(Status::EscapeCalledTwice),
            EscapeState::NotEscapable => return Err(Status::ScopeMismatch),
            EscapeState::Available => {}
        }
        if position == 0 {
            return Err(Status::ScopeMismatch);
        }
        let value = self
            .arena
            .get(handle)
            .cloned()
            .ok_or(Status::InvalidArgument)?;
        self.frames[position - 1]
            .handles
            .try_reserve(1)
            .map_err(|_| Status::OutOfMemory)?;
        self.arena.reserve(1)?;

        let owned = self.frames[position]
            .handles
            .iter()
            .position(|candidate| *candidate == handle);
        let escaped = match owned {
            Some(index) => {
                self.frames[position].handles.swap_remove(index);
                self.arena.take(handle);
                Escaped::Moved(self.arena.insert(value)?)
            }
            None => Escaped::Shared(self.arena.insert(value.clone())?, value),
        };
        let new_handle = match &escaped {
            Escaped::Moved(handle) | Escaped::Shared(handle, _) => *handle,
        };
        self.frames[position - 1].handles.push(new_handle);
        self.frames[position].escape = EscapeState::Used;
        Ok(escaped)
    }

    pub fn value(&self, handle: Handle) -> Result<&JsValue, Status> {
        self.arena.get(handle).ok_or(Status::InvalidArgument)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn live_handles(&self) -> usize {
        self.arena.len()
    }

    /// Pops every scope opened after `id`. Returns `None` if `id` is not
    /// open at all.
    pub fn unwind_above(&mut self, id: ScopeId) -> Option<Vec<JsValue>> {
        let position = self.frames.iter().rposition(|frame| frame.id == id)?;
        let mut values = Vec::new();
        while self.frames.len() > position + 1 {
            if let Some(frame) = self.frames.pop() {
                values.extend(self.free_frame(frame));
            }
        }
        Some(values)
    }

    /// Pops every scope, innermost first.
    pub fn drain(&mut self) -> Vec<JsValue> {
        let mut values = Vec::new();
        while let Some(frame) = self.frames.pop() {
            values.extend(self.free_frame(frame));
        }
        values
    }

    fn free_frame(&mut self, frame: ScopeFrame) -> Vec<JsValue> {
        frame
            .handles
            .into_iter()
            .filter_map(|handle| self.arena.take(handle))
            .collect()
    }
}
