use super::Value;
use crate::jvm::code::{FieldRef, InvokeDynamicRef, MethodRef};
use crate::jvm::{BinaryName, FieldType};

/// Supplies the initial values of method parameters
///
/// Returning `None` leaves the parameter as an unknown value of its declared type.
pub trait ParameterFactory {
    /// Value of the parameter in local `local` (the receiver is local 0 of instance methods)
    fn create_parameter_value(
        &self,
        is_instance_method: bool,
        local: usize,
        typ: &FieldType<BinaryName>,
    ) -> Option<Value>;
}

/// Resolves `invokestatic` and `invokedynamic` calls before simulation gets a chance to
pub trait StaticInvokeFactory {
    /// Result of the call (ignored for `void` methods), or `None` to fall back
    fn invoke_static(&self, insn: usize, method: &MethodRef, args: &[Value]) -> Option<Value>;

    fn invoke_dynamic(
        &self,
        _insn: usize,
        _call_site: &InvokeDynamicRef,
        _args: &[Value],
    ) -> Option<Value> {
        None
    }
}

/// Resolves `getstatic` reads
pub trait StaticGetFactory {
    fn get_static(&self, insn: usize, field: &FieldRef) -> Option<Value>;
}

impl<F> ParameterFactory for F
where
    F: Fn(bool, usize, &FieldType<BinaryName>) -> Option<Value>,
{
    fn create_parameter_value(
        &self,
        is_instance_method: bool,
        local: usize,
        typ: &FieldType<BinaryName>,
    ) -> Option<Value> {
        self(is_instance_method, local, typ)
    }
}
