use std::fmt;

use mrt_object::{TypeRepr, Value, try_type_of};

use crate::boxed;

/// Textual form of a value, as `print` writes it.
///
/// ```text
/// 42                            short or boxed integer
/// None                          Value::NONE
/// <error>                       Value::ERROR
/// <test.Point object at 0x..>   any other instance
/// <uninitialized object at 0x..> memory without a header
/// ```
#[derive(Clone, Copy)]
pub struct DisplayValue(pub Value);

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if let Some(n) = value.as_short() {
            return write!(f, "{n}");
        }
        if value.is_none() {
            return f.write_str("None");
        }
        if value.is_error() {
            return f.write_str("<error>");
        }
        if let Some(n) = boxed::boxed_value(value) {
            return write!(f, "{n}");
        }
        // SAFETY: heap references always cover at least a header
        let name = unsafe { try_type_of(value) }.map_or("uninitialized", TypeRepr::full_name);
        write!(f, "<{name} object at 0x{:x}>", value.ref_bits())
    }
}

pub fn format_value(value: Value) -> String {
    DisplayValue(value).to_string()
}
