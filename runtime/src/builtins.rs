//! Builtin types and functions every program links against.

use std::io::{self, Write};

use mrt_object::{Env, MethodFn, TypeRepr, Value};

use crate::format::DisplayValue;

/// Method table index of the initializer.
pub const INIT_METHOD: usize = 0;

static OBJECT_VTABLE: [MethodFn; 1] = [object_init];

/// Root of every user type. Its single method is the default initializer.
pub static OBJECT_TYPE: TypeRepr = TypeRepr::new("builtins.object", 0, &OBJECT_VTABLE);

/// Default initializer: does nothing and returns `None`.
pub fn object_init(_env: &mut Env) -> Value {
    Value::NONE
}

/// Write local 0 of the current frame to stdout followed by a newline.
pub fn print(env: &mut Env) -> Value {
    let value = env.local(0);
    let mut out = io::stdout().lock();
    if let Err(err) = writeln!(out, "{}", DisplayValue(value)) {
        log::warn!("print failed: {err}");
    }
    Value::NONE
}
