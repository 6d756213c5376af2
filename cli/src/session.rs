use std::cell::RefCell;
use std::rc::Rc;

use napibridge::{
    Context, Engine, EscapableHandleScope, FinalizeCallback, Handle, HandleScope, HeapStats,
    HostData, Reference, Status, ValueType,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("no handle {0}")]
    NoHandle(String),
    #[error("no reference {0}")]
    NoReference(String),
    #[error("no scope is open")]
    NoScope,
    #[error("the innermost scope is not escapable")]
    NotEscapable,
    #[error(transparent)]
    Engine(#[from] Status),
}

pub const COMMANDS: [(&str, &str); 21] = [
    ("open", "open"),
    ("open-esc", "open-esc"),
    ("close", "close"),
    ("escape", "escape $handle"),
    ("num", "num <number>"),
    ("str", "str <text>"),
    ("obj", "obj"),
    ("global", "global"),
    ("set", "set $object <key> $value"),
    ("get", "get $object <key>"),
    ("show", "show $handle"),
    ("ref", "ref $handle [count] | ref &reference"),
    ("unref", "unref &reference"),
    ("delref", "delref &reference"),
    ("getref", "getref &reference"),
    ("external", "external <label>"),
    ("throw", "throw <message>"),
    ("catch", "catch"),
    ("gc", "gc"),
    ("stats", "stats"),
    ("help", "help"),
];

enum OpenScope {
    Plain(HandleScope),
    Escapable(EscapableHandleScope),
}

/// Drives one context from textual commands. Handles are named `$N` and
/// references `&N`, in creation order.
pub struct Session {
    ctx: Context,
    scopes: Vec<OpenScope>,
    handles: Vec<Handle>,
    references: Vec<Reference>,
    finalized: Rc<RefCell<Vec<String>>>,
    _engine: Engine,
}

impl Session {
    pub fn new(engine: Engine) -> Result<Self, CommandError> {
        let ctx = engine.new_context()?;
        Ok(Self {
            ctx,
            scopes: Vec::new(),
            handles: Vec::new(),
            references: Vec::new(),
            finalized: Rc::new(RefCell::new(Vec::new())),
            _engine: engine,
        })
    }

    pub fn stats(&self) -> HeapStats {
        self.ctx.heap_stats()
    }

    /// Labels of externals finalized since the last call.
    pub fn take_finalized(&self) -> Vec<String> {
        std::mem::take(&mut *self.finalized.borrow_mut())
    }

    pub fn execute(&mut self, line: &str) -> Result<String, CommandError> {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();
        tracing::debug!(command, ?args, "executing command");

        match command {
            "open" => {
                let scope = self.ctx.open_handle_scope()?;
                self.scopes.push(OpenScope::Plain(scope));
                Ok(format!("scope depth {}", self.ctx.scope_depth()))
            }
            "open-esc" => {
                let scope = self.ctx.open_escapable_handle_scope()?;
                self.scopes.push(OpenScope::Escapable(scope));
                Ok(format!("escapable scope depth {}", self.ctx.scope_depth()))
            }
            "close" => {
                let scope = self.scopes.pop().ok_or(CommandError::NoScope)?;
                let closed = match &scope {
                    OpenScope::Plain(inner) => self.ctx.close_handle_scope(*inner),
                    OpenScope::Escapable(inner) => self.ctx.close_escapable_handle_scope(*inner),
                };
                if let Err(status) = closed {
                    self.scopes.push(scope);
                    return Err(status.into());
                }
                Ok(format!("scope depth {}", self.ctx.scope_depth()))
            }
            "escape" => {
                let [name] = args[..] else {
                    return Err(CommandError::Usage("escape $handle"));
                };
                let handle = self.handle(name)?;
                let Some(OpenScope::Escapable(scope)) = self.scopes.last() else {
                    return Err(CommandError::NotEscapable);
                };
                let escaped = self.ctx.escape_handle(scope, handle)?;
                Ok(self.bind(escaped))
            }
            "num" => {
                let number = rest
                    .parse::<f64>()
                    .map_err(|_| CommandError::Usage("num <number>"))?;
                let handle = self.ctx.create_double(number)?;
                Ok(self.bind(handle))
            }
            "str" => {
                let handle = self.ctx.create_string_utf8(rest)?;
                Ok(self.bind(handle))
            }
            "obj" => {
                let handle = self.ctx.create_object()?;
                Ok(self.bind(handle))
            }
            "global" => {
                let handle = self.ctx.get_global()?;
                Ok(self.bind(handle))
            }
            "set" => {
                let [object, key, value] = args[..] else {
                    return Err(CommandError::Usage("set $object <key> $value"));
                };
                let object = self.handle(object)?;
                let value = self.handle(value)?;
                self.ctx.set_named_property(object, key, value)?;
                Ok("ok".to_string())
            }
            "get" => {
                let [object, key] = args[..] else {
                    return Err(CommandError::Usage("get $object <key>"));
                };
                let object = self.handle(object)?;
                let value = self.ctx.get_named_property(object, key)?;
                Ok(self.bind(value))
            }
            "show" => {
                let [name] = args[..] else {
                    return Err(CommandError::Usage("show $handle"));
                };
                let handle = self.handle(name)?;
                self.describe(handle)
            }
            "ref" => match args[..] {
                [name] if name.starts_with('&') => {
                    let reference = self.reference(name)?;
                    let count = self.ctx.reference_ref(reference)?;
                    Ok(format!("{name} count {count}"))
                }
                [name] => self.create_reference(name, 1),
                [name, count] => {
                    let count = count
                        .parse::<u32>()
                        .map_err(|_| CommandError::Usage("ref $handle [count]"))?;
                    self.create_reference(name, count)
                }
                _ => Err(CommandError::Usage("ref $handle [count] | ref &reference")),
            },
            "unref" => {
                let [name] = args[..] else {
                    return Err(CommandError::Usage("unref &reference"));
                };
                let reference = self.reference(name)?;
                let count = self.ctx.reference_unref(reference)?;
                Ok(format!("{name} count {count}"))
            }
            "delref" => {
                let [name] = args[..] else {
                    return Err(CommandError::Usage("delref &reference"));
                };
                let reference = self.reference(name)?;
                self.ctx.delete_reference(reference)?;
                Ok(format!("{name} deleted"))
            }
            "getref" => {
                let [name] = args[..] else {
                    return Err(CommandError::Usage("getref &reference"));
                };
                let reference = self.reference(name)?;
                match self.ctx.get_reference_value(reference)? {
                    Some(handle) => Ok(self.bind(handle)),
                    None => Ok(format!("{name} is empty (target collected)")),
                }
            }
            "external" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("external <label>"));
                }
                let data: HostData = Rc::new(rest.to_string());
                let handle = self
                    .ctx
                    .create_external(data, Some(self.finalizer()), None)?;
                Ok(self.bind(handle))
            }
            "throw" => {
                self.ctx.throw_error(rest)?;
                Ok("exception pending".to_string())
            }
            "catch" => {
                let exception = self.ctx.get_and_clear_last_exception()?;
                Ok(self.bind(exception))
            }
            "gc" => {
                let stats = self.ctx.collect_garbage();
                Ok(format!(
                    "collected {} ({} -> {} live)",
                    stats.collected, stats.before, stats.after
                ))
            }
            "stats" => {
                let stats = self.ctx.heap_stats();
                Ok(format!(
                    "live {} allocated {} freed {} collections {} | scopes {} handles {} references {}",
                    stats.live_objects,
                    stats.total_allocated,
                    stats.total_freed,
                    stats.collections,
                    self.ctx.scope_depth(),
                    self.ctx.live_handles(),
                    self.ctx.live_references(),
                ))
            }
            "help" => Ok(COMMANDS
                .iter()
                .map(|(_, usage)| *usage)
                .collect::<Vec<_>>()
                .join("\n")),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    fn create_reference(&mut self, name: &str, count: u32) -> Result<String, CommandError> {
        let handle = self.handle(name)?;
        let reference = self.ctx.create_reference(handle, count)?;
        self.references.push(reference);
        Ok(format!("&{} count {count}", self.references.len() - 1))
    }

    fn finalizer(&self) -> FinalizeCallback {
        let log = Rc::clone(&self.finalized);
        Box::new(move |data: HostData, _hint: Option<HostData>| {
            let label = data
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_default();
            log.borrow_mut().push(label);
        })
    }

    fn bind(&mut self, handle: Handle) -> String {
        self.handles.push(handle);
        let name = format!("${}", self.handles.len() - 1);
        match self.describe(handle) {
            Ok(description) => format!("{name} = {description}"),
            Err(_) => name,
        }
    }

    fn describe(&self, handle: Handle) -> Result<String, CommandError> {
        let kind = self.ctx.type_of(handle)?;
        let text = match kind {
            ValueType::String => {
                let mut buf = vec![0u8; self.ctx.get_value_string_utf8(handle, None)? + 1];
                let written = self.ctx.get_value_string_utf8(handle, Some(buf.as_mut_slice()))?;
                format!("{:?}", String::from_utf8_lossy(&buf[..written]))
            }
            ValueType::Number => self.ctx.get_value_double(handle)?.to_string(),
            ValueType::Boolean => self.ctx.get_value_bool(handle)?.to_string(),
            ValueType::Undefined => "undefined".to_string(),
            ValueType::Null => "null".to_string(),
            ValueType::Object | ValueType::Function | ValueType::External => {
                let refcount = self.ctx.refcount(handle)?.unwrap_or_default();
                format!("{kind:?} (refcount {refcount})").to_lowercase()
            }
        };
        Ok(text)
    }

    fn handle(&self, name: &str) -> Result<Handle, CommandError> {
        name.strip_prefix('$')
            .and_then(|index| index.parse::<usize>().ok())
            .and_then(|index| self.handles.get(index).copied())
            .ok_or_else(|| CommandError::NoHandle(name.to_string()))
    }

    fn reference(&self, name: &str) -> Result<Reference, CommandError> {
        name.strip_prefix('&')
            .and_then(|index| index.parse::<usize>().ok())
            .and_then(|index| self.references.get(index).copied())
            .ok_or_else(|| CommandError::NoReference(name.to_string()))
    }
}
