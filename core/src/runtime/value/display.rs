use super::JsValue;
use std::fmt;

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::String(s) => write!(f, "{s:?}"),
            JsValue::Object(id) => write!(f, "[object #{}]", id.index),
            other => write!(f, "{}", other.to_js_string()),
        }
    }
}
