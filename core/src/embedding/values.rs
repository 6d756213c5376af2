use crate::context::Context;
use crate::embedding::handle::Handle;
use crate::errors::Status;
use crate::runtime::value::{JsObject, JsValue, ObjectClass};

/// Result of `Context::type_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Object,
    Function,
    External,
}

impl Context {
    pub fn get_undefined(&mut self) -> Result<Handle, Status> {
        self.root_or_release(JsValue::Undefined)
    }

    pub fn get_null(&mut self) -> Result<Handle, Status> {
        self.root_or_release(JsValue::Null)
    }

    pub fn get_global(&mut self) -> Result<Handle, Status> {
        self.root_dup(JsValue::Object(self.global_id()))
    }

    pub fn get_boolean(&mut self, value: bool) -> Result<Handle, Status> {
        self.root_or_release(JsValue::Boolean(value))
    }

    pub fn create_double(&mut self, value: f64) -> Result<Handle, Status> {
        self.root_or_release(JsValue::Number(value))
    }

    pub fn create_int32(&mut self, value: i32) -> Result<Handle, Status> {
        self.create_double(f64::from(value))
    }

    pub fn create_uint32(&mut self, value: u32) -> Result<Handle, Status> {
        self.create_double(f64::from(value))
    }

    /// Values beyond 2^53 lose precision.
    pub fn create_int64(&mut self, value: i64) -> Result<Handle, Status> {
        self.create_double(value as f64)
    }

    pub fn create_string_utf8(&mut self, value: &str) -> Result<Handle, Status> {
        self.preamble()?;
        self.root_or_release(JsValue::string(value))
    }

    pub fn create_object(&mut self) -> Result<Handle, Status> {
        let id = self.runtime().alloc(JsObject::new(ObjectClass::Ordinary))?;
        self.root_or_release(JsValue::Object(id))
    }

    pub fn type_of(&self, value: Handle) -> Result<ValueType, Status> {
        Ok(match self.value(value)? {
            JsValue::Undefined => ValueType::Undefined,
            JsValue::Null => ValueType::Null,
            JsValue::Boolean(_) => ValueType::Boolean,
            JsValue::Number(_) => ValueType::Number,
            JsValue::String(_) => ValueType::String,
            JsValue::Object(id) => {
                let heap = self.runtime().heap();
                match heap.get(*id).map(JsObject::class) {
                    Some(ObjectClass::Function | ObjectClass::Constructor) => ValueType::Function,
                    Some(ObjectClass::External) => ValueType::External,
                    Some(_) => ValueType::Object,
                    None => return Err(Status::InvalidArgument),
                }
            }
        })
    }

    pub fn get_value_double(&self, value: Handle) -> Result<f64, Status> {
        match self.value(value)? {
            JsValue::Number(n) => Ok(*n),
            _ => Err(Status::NumberExpected),
        }
    }

    /// Saturating conversion; NaN reads as 0.
    pub fn get_value_int32(&self, value: Handle) -> Result<i32, Status> {
        self.get_value_double(value).map(|n| n as i32)
    }

    pub fn get_value_uint32(&self, value: Handle) -> Result<u32, Status> {
        self.get_value_double(value).map(|n| n as u32)
    }

    pub fn get_value_int64(&self, value: Handle) -> Result<i64, Status> {
        self.get_value_double(value).map(|n| n as i64)
    }

    pub fn get_value_bool(&self, value: Handle) -> Result<bool, Status> {
        match self.value(value)? {
            JsValue::Boolean(b) => Ok(*b),
            _ => Err(Status::BooleanExpected),
        }
    }

    /// Copies the string into `buf` as NUL-terminated UTF-8 and returns the
    /// number of bytes written, terminator excluded. The copy is cut on a
    /// character boundary when it does not fit. Without a buffer, returns the
    /// full byte length.
    pub fn get_value_string_utf8(
        &self,
        value: Handle,
        buf: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        self.preamble()?;
        let JsValue::String(s) = self.value(value)? else {
            return Err(Status::StringExpected);
        };
        Ok(match buf {
            Some(buf) => copy_truncated(s, buf),
            None => s.len(),
        })
    }

    pub fn coerce_to_bool(&mut self, value: Handle) -> Result<Handle, Status> {
        self.preamble()?;
        let coerced = self.value(value)?.to_boolean();
        self.root_or_release(JsValue::Boolean(coerced))
    }

    pub fn coerce_to_number(&mut self, value: Handle) -> Result<Handle, Status> {
        self.preamble()?;
        let coerced = self.value(value)?.to_number();
        self.root_or_release(JsValue::Number(coerced))
    }

    pub fn coerce_to_string(&mut self, value: Handle) -> Result<Handle, Status> {
        self.preamble()?;
        let coerced = self.display_string(value)?;
        self.root_or_release(JsValue::string(coerced))
    }

    /// ToString, with functions rendered by name.
    pub(crate) fn display_string(&self, value: Handle) -> Result<String, Status> {
        let value = self.value(value)?;
        let Some(id) = value.as_object() else {
            return Ok(value.to_js_string());
        };
        let heap = self.runtime().heap();
        let object = heap.get(id).ok_or(Status::InvalidArgument)?;
        Ok(match object.class() {
            ObjectClass::Function | ObjectClass::Constructor => {
                let name = object
                    .get_own("name")
                    .and_then(|property| property.value.as_str())
                    .unwrap_or_default();
                format!("function {name}() {{ [native code] }}")
            }
            _ => value.to_js_string(),
        })
    }
}

fn copy_truncated(source: &str, buf: &mut [u8]) -> usize {
    let Some(room) = buf.len().checked_sub(1) else {
        return 0;
    };
    let mut end = source.len().min(room);
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    buf[..end].copy_from_slice(&source.as_bytes()[..end]);
    buf[end] = 0;
    end
}
