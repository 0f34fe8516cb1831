use super::simulation::{java_double_string, java_float_string, HostValue};
use super::{AnalyzerErrorKind, TypeResolver};
use crate::jvm::{BaseType, BinaryName, FieldType, RefType};
use crate::util::Width;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Instructions which contributed to a value, in the order they were first seen
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Provenance(Vec<usize>);

impl Provenance {
    pub const fn new() -> Provenance {
        Provenance(Vec::new())
    }

    /// Provenance of a value produced out of nothing by one instruction
    pub fn of(insn: usize) -> Provenance {
        Provenance(vec![insn])
    }

    pub fn add(&mut self, insn: usize) {
        if !self.0.contains(&insn) {
            self.0.push(insn);
        }
    }

    pub fn union(&mut self, other: &Provenance) {
        for insn in &other.0 {
            self.add(*insn);
        }
    }

    pub fn instructions(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, insn: usize) -> bool {
        self.0.contains(&insn)
    }

    /// Does this provenance already cover every instruction of the other one?
    pub fn covers(&self, other: &Provenance) -> bool {
        other.0.iter().all(|insn| self.0.contains(insn))
    }
}

impl FromIterator<usize> for Provenance {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut provenance = Provenance::new();
        for insn in iter {
            provenance.add(insn);
        }
        provenance
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, insn) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "#{}", insn)?;
        }
        f.write_str("]")
    }
}

/// Statically known numeric value
///
/// Floating point numbers compare by their bits, so that `NaN` is equal to itself and merging
/// a frame with itself is a no-op.
#[derive(Copy, Clone, Debug)]
pub enum Number {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Number {
    /// Computational type of the number
    pub const fn base_type(self) -> BaseType {
        match self {
            Number::Int(_) => BaseType::Int,
            Number::Long(_) => BaseType::Long,
            Number::Float(_) => BaseType::Float,
            Number::Double(_) => BaseType::Double,
        }
    }

    pub fn to_host(self) -> HostValue {
        match self {
            Number::Int(i) => HostValue::Int(i),
            Number::Long(l) => HostValue::Long(l),
            Number::Float(f) => HostValue::Float(f),
            Number::Double(d) => HostValue::Double(d),
        }
    }

    pub fn from_host(host: &HostValue) -> Option<Number> {
        match host {
            HostValue::Int(i) => Some(Number::Int(*i)),
            HostValue::Long(l) => Some(Number::Long(*l)),
            HostValue::Float(f) => Some(Number::Float(*f)),
            HostValue::Double(d) => Some(Number::Double(*d)),
            _ => None,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Long(a), Number::Long(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a.to_bits() == b.to_bits(),
            (Number::Double(a), Number::Double(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Number {}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Long(l) => write!(f, "{}L", l),
            Number::Float(x) => write!(f, "{}f", java_float_string(*x)),
            Number::Double(d) => f.write_str(&java_double_string(*d)),
        }
    }
}

/// Mutable state of a simulated object, shared by every copy of the object
pub type SharedHost = Rc<RefCell<HostValue>>;

/// What is known about a value
#[derive(Clone, Debug)]
pub enum ValueKind {
    /// Slot that was never written, or the result of merging incompatible values
    Uninitialized,

    /// `null`, possibly compared against `null` by a branch at `null_check`
    Null { null_check: Option<usize> },

    /// Primitive of a computational type (`int`, `long`, `float`, or `double`)
    Primitive {
        typ: BaseType,
        number: Option<Number>,
    },

    /// Reference whose identity is not tracked
    Virtual {
        typ: RefType<BinaryName>,
        resolved: bool,
    },

    /// Exception caught at the entry of a handler
    Exception { typ: RefType<BinaryName> },

    /// Address pushed by `jsr`
    ReturnAddress,

    /// Object whose contents are tracked by running its methods
    ///
    /// `host` is a snapshot of the contents when the value was produced, while `cell` is the
    /// state of the object shared with every other copy of it.
    Simulated {
        typ: RefType<BinaryName>,
        host: HostValue,
        cell: SharedHost,
    },
}

/// Structural equality: simulated objects compare by type and snapshot, not identity
impl PartialEq for ValueKind {
    fn eq(&self, other: &ValueKind) -> bool {
        use ValueKind::*;
        match (self, other) {
            (Uninitialized, Uninitialized) | (ReturnAddress, ReturnAddress) => true,
            (Null { null_check: a }, Null { null_check: b }) => a == b,
            (
                Primitive { typ: t1, number: n1 },
                Primitive { typ: t2, number: n2 },
            ) => t1 == t2 && n1 == n2,
            (
                Virtual { typ: t1, resolved: r1 },
                Virtual { typ: t2, resolved: r2 },
            ) => t1 == t2 && r1 == r2,
            (Exception { typ: t1 }, Exception { typ: t2 }) => t1 == t2,
            (
                Simulated { typ: t1, host: h1, .. },
                Simulated { typ: t2, host: h2, .. },
            ) => t1 == t2 && h1 == h2,
            _ => false,
        }
    }
}

/// Abstract value held in a local variable or on the operand stack
///
/// Values are immutable: every operation produces a new value. Equality ignores provenance.
#[derive(Clone, Debug)]
pub struct Value {
    kind: ValueKind,
    provenance: Provenance,
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.kind == other.kind
    }
}

impl Value {
    fn new(kind: ValueKind, provenance: Provenance) -> Value {
        Value { kind, provenance }
    }

    pub const fn uninitialized() -> Value {
        Value {
            kind: ValueKind::Uninitialized,
            provenance: Provenance::new(),
        }
    }

    pub fn null(insn: usize) -> Value {
        Value::new(ValueKind::Null { null_check: None }, Provenance::of(insn))
    }

    /// Constant number pushed by `insn`
    pub fn number(number: Number, insn: usize) -> Value {
        Value::resolved_number(number, Provenance::of(insn))
    }

    pub fn resolved_number(number: Number, provenance: Provenance) -> Value {
        let kind = ValueKind::Primitive {
            typ: number.base_type(),
            number: Some(number),
        };
        Value::new(kind, provenance)
    }

    pub fn unresolved_primitive(typ: BaseType, provenance: Provenance) -> Value {
        let kind = ValueKind::Primitive {
            typ: typ.computational(),
            number: None,
        };
        Value::new(kind, provenance)
    }

    /// Reference whose identity is not tracked
    pub fn reference(typ: RefType<BinaryName>, resolved: bool, provenance: Provenance) -> Value {
        Value::new(ValueKind::Virtual { typ, resolved }, provenance)
    }

    /// Unknown value of a given type
    pub fn of_type(typ: &FieldType<BinaryName>, provenance: Provenance) -> Value {
        match typ {
            FieldType::Base(base) => Value::unresolved_primitive(*base, provenance),
            FieldType::Ref(ref_type) => Value::reference(ref_type.clone(), false, provenance),
        }
    }

    pub fn exception(typ: RefType<BinaryName>, provenance: Provenance) -> Value {
        Value::new(ValueKind::Exception { typ }, provenance)
    }

    pub fn return_address(insn: usize) -> Value {
        Value::new(ValueKind::ReturnAddress, Provenance::of(insn))
    }

    /// New simulated object, with its own state
    pub fn simulated(typ: RefType<BinaryName>, host: HostValue, provenance: Provenance) -> Value {
        let cell = Rc::new(RefCell::new(host.clone()));
        Value::new(ValueKind::Simulated { typ, host, cell }, provenance)
    }

    /// The same simulated object, after its state changed to `host`
    ///
    /// Every other copy of the object observes the change through the shared cell. Values that
    /// are not simulated are returned as is.
    pub fn with_host(&self, host: HostValue) -> Value {
        match &self.kind {
            ValueKind::Simulated { typ, cell, .. } => {
                *cell.borrow_mut() = host.clone();
                let kind = ValueKind::Simulated {
                    typ: typ.clone(),
                    host,
                    cell: cell.clone(),
                };
                Value::new(kind, self.provenance.clone())
            }
            _ => self.clone(),
        }
    }

    /// Same value with the snapshot of a simulated object brought up to date with its cell
    pub fn refreshed(&self) -> Value {
        match &self.kind {
            ValueKind::Simulated { cell, .. } => {
                let host = cell.borrow().clone();
                self.with_host(host)
            }
            _ => self.clone(),
        }
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Value {
        self.provenance = provenance;
        self
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(self.kind, ValueKind::Uninitialized)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null { .. })
    }

    /// Is this some reference (including `null`)?
    pub fn is_reference(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Null { .. }
                | ValueKind::Virtual { .. }
                | ValueKind::Exception { .. }
                | ValueKind::Simulated { .. }
        )
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ValueKind::Primitive { .. })
    }

    /// Is the concrete value statically known?
    pub fn is_resolved(&self) -> bool {
        match &self.kind {
            ValueKind::Null { .. } | ValueKind::Simulated { .. } => true,
            ValueKind::Primitive { number, .. } => number.is_some(),
            ValueKind::Virtual { resolved, .. } => *resolved,
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match &self.kind {
            ValueKind::Primitive { number, .. } => *number,
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.as_number() {
            Some(Number::Int(i)) => Some(i),
            _ => None,
        }
    }

    /// Contents of a simulated `String`, `StringBuilder`, or `StringBuffer`
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Simulated { host, .. } => host.as_str(),
            _ => None,
        }
    }

    /// Concrete value, if it is known well enough to be passed to a simulated method
    pub fn host_value(&self) -> Option<HostValue> {
        match &self.kind {
            ValueKind::Null { .. } => Some(HostValue::Null),
            ValueKind::Primitive { number, .. } => number.map(Number::to_host),
            ValueKind::Simulated { host, .. } => Some(host.clone()),
            _ => None,
        }
    }

    /// Static type of the value (`None` for `null`, return addresses, and uninitialized values)
    pub fn field_type(&self) -> Option<FieldType<BinaryName>> {
        match &self.kind {
            ValueKind::Primitive { typ, .. } => Some(FieldType::Base(*typ)),
            _ => self.ref_type().cloned().map(FieldType::Ref),
        }
    }

    pub fn ref_type(&self) -> Option<&RefType<BinaryName>> {
        match &self.kind {
            ValueKind::Virtual { typ, .. }
            | ValueKind::Exception { typ }
            | ValueKind::Simulated { typ, .. } => Some(typ),
            _ => None,
        }
    }

    /// Branch which compared this `null` against `null`
    pub fn null_check(&self) -> Option<usize> {
        match &self.kind {
            ValueKind::Null { null_check } => *null_check,
            _ => None,
        }
    }

    /// Record that `insn` compares this value against `null` (no-op on non-`null` values)
    pub fn with_null_check(&self, insn: usize) -> Value {
        match &self.kind {
            ValueKind::Null { .. } => Value::new(
                ValueKind::Null {
                    null_check: Some(insn),
                },
                self.provenance.clone(),
            ),
            _ => self.clone(),
        }
    }

    /// Copy of the value, produced by `insn`
    pub fn copy(&self, insn: usize) -> Result<Value, AnalyzerErrorKind> {
        if self.is_uninitialized() {
            return Err(AnalyzerErrorKind::UninitializedValue);
        }
        let mut copy = self.clone();
        copy.provenance.add(insn);
        Ok(copy)
    }

    /// Are both values the same object at runtime?
    ///
    /// Simulated objects know their identity. Other values are only considered the same object
    /// when they are equal and come from the exact same instructions.
    pub fn is_same_object(&self, other: &Value) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::Simulated { cell: c1, .. }, ValueKind::Simulated { cell: c2, .. }) => {
                Rc::ptr_eq(c1, c2)
            }
            (ValueKind::Uninitialized, _) | (_, ValueKind::Uninitialized) => false,
            _ => self == other && self.provenance == other.provenance,
        }
    }

    /// Value representing both `self` and `new` at a control flow join
    ///
    /// The merge is not symmetric: an uninitialized `new` leaves `self` alone, but an
    /// uninitialized `self` stays uninitialized. Values that can't be reconciled (eg. an `int`
    /// and a `float`) merge to uninitialized.
    pub fn merge(&self, new: &Value, resolver: &dyn TypeResolver) -> Value {
        use ValueKind::*;

        if new.is_uninitialized() {
            return self.clone();
        }
        let mut provenance = self.provenance.clone();
        provenance.union(&new.provenance);
        if self == new {
            return Value::new(self.kind.clone(), provenance);
        }

        let kind = match (&self.kind, &new.kind) {
            (Null { .. }, Null { .. }) => Null { null_check: None },
            (Null { .. }, _) | (_, Null { .. }) => {
                let non_null = if self.is_null() { new } else { self };
                match non_null.ref_type() {
                    Some(typ) => Virtual {
                        typ: typ.clone(),
                        resolved: false,
                    },
                    None => Uninitialized,
                }
            }
            (Primitive { typ: t1, .. }, Primitive { typ: t2, .. }) if t1 == t2 => Primitive {
                typ: *t1,
                number: None,
            },
            (Exception { typ: t1 }, Exception { typ: t2 }) => Exception {
                typ: resolver.common_exception(t1, t2),
            },
            (
                Virtual { typ: t1, .. } | Exception { typ: t1 } | Simulated { typ: t1, .. },
                Virtual { typ: t2, .. } | Exception { typ: t2 } | Simulated { typ: t2, .. },
            ) => Virtual {
                typ: resolver.common(t1, t2),
                resolved: false,
            },
            _ => Uninitialized,
        };

        if let Uninitialized = kind {
            log::trace!("Cannot merge {} with {}", self, new);
            return Value::uninitialized();
        }
        Value::new(kind, provenance)
    }
}

impl Width for Value {
    fn width(&self) -> usize {
        match &self.kind {
            ValueKind::Primitive { typ, .. } => typ.width(),
            _ => 1,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Uninitialized => f.write_str("uninitialized"),
            ValueKind::Null { null_check: None } => f.write_str("null"),
            ValueKind::Null {
                null_check: Some(insn),
            } => write!(f, "null (checked at #{})", insn),
            ValueKind::Primitive {
                number: Some(number),
                ..
            } => write!(f, "{}", number),
            ValueKind::Primitive { typ, number: None } => write!(f, "{} ?", typ.keyword()),
            ValueKind::Virtual {
                typ,
                resolved: true,
            } => write!(f, "{}", typ),
            ValueKind::Virtual {
                typ,
                resolved: false,
            } => write!(f, "{} ?", typ),
            ValueKind::Exception { typ } => write!(f, "exception {}", typ),
            ValueKind::ReturnAddress => f.write_str("return address"),
            ValueKind::Simulated { typ, host, .. } => match host.as_str() {
                Some(string) => write!(f, "{} {:?}", typ, string),
                None => write!(f, "{} {:?}", typ, host),
            },
        }
    }
}
