use super::{AnalyzerErrorKind, TypeResolver, Value};
use crate::util::Width;
use std::collections::BTreeSet;
use std::fmt;

/// Snapshot of the local variables and operand stack before an instruction executes
///
/// Locals are indexed by slot: a `long` or `double` stored in slot `i` also reserves slot `i + 1`
/// (which then reads as uninitialized). The stack holds one entry per value, but its maximum size
/// is checked in slots.
#[derive(Debug, Clone)]
pub struct Frame {
    locals: Vec<Value>,
    stack: Vec<Value>,

    /// Maximum stack size, in slots
    max_stack: usize,

    /// Slots holding the upper half of a wide local stored since the last jump
    reserved: BTreeSet<usize>,

    /// Instruction this frame belongs to (once it has been recorded by the analyzer)
    insn: Option<usize>,

    /// Instructions from which control flowed into this one
    flow_inputs: BTreeSet<usize>,

    /// Instructions to which control flowed out of this one
    flow_outputs: BTreeSet<usize>,
}

/// Frames are equal when their locals and stack hold equal values
impl PartialEq for Frame {
    fn eq(&self, other: &Frame) -> bool {
        self.locals == other.locals && self.stack == other.stack
    }
}

impl Frame {
    /// Frame with every local uninitialized and an empty stack
    pub fn new(max_locals: usize, max_stack: usize) -> Frame {
        Frame {
            locals: vec![Value::uninitialized(); max_locals],
            stack: vec![],
            max_stack,
            reserved: BTreeSet::new(),
            insn: None,
            flow_inputs: BTreeSet::new(),
            flow_outputs: BTreeSet::new(),
        }
    }

    pub fn locals(&self) -> &[Value] {
        &self.locals
    }

    /// Stack values, from the bottom to the top
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Size of the stack in slots
    pub fn stack_slots(&self) -> usize {
        self.stack.iter().map(Width::width).sum()
    }

    pub fn insn(&self) -> Option<usize> {
        self.insn
    }

    pub fn flow_inputs(&self) -> &BTreeSet<usize> {
        &self.flow_inputs
    }

    pub fn flow_outputs(&self) -> &BTreeSet<usize> {
        &self.flow_outputs
    }

    /// Stamp a freshly reached frame with its instruction, dropping edges copied from elsewhere
    pub(super) fn record_at(&mut self, insn: usize) {
        self.insn = Some(insn);
        self.flow_inputs.clear();
        self.flow_outputs.clear();
    }

    pub(super) fn add_flow_input(&mut self, from: usize) {
        self.flow_inputs.insert(from);
    }

    pub(super) fn add_flow_output(&mut self, to: usize) {
        self.flow_outputs.insert(to);
    }

    pub fn local(&self, index: usize) -> Result<&Value, AnalyzerErrorKind> {
        self.locals
            .get(index)
            .ok_or(AnalyzerErrorKind::InvalidLocal(index))
    }

    /// Store a value into a local, updating the reservations of wide values
    pub fn set_local(&mut self, index: usize, value: Value) -> Result<(), AnalyzerErrorKind> {
        let width = value.width();
        if index + width > self.locals.len() {
            return Err(AnalyzerErrorKind::InvalidLocal(index));
        }
        if self.reserved.contains(&index) {
            return Err(AnalyzerErrorKind::ReservedSlot(index));
        }

        // Overwriting the upper half of a wide value invalidates it
        if index > 0 && self.locals[index - 1].width() == 2 {
            self.locals[index - 1] = Value::uninitialized();
        }
        if self.locals[index].width() == 2 {
            self.reserved.remove(&(index + 1));
        }

        self.locals[index] = value;
        if width == 2 {
            self.reserved.insert(index + 1);
            self.locals[index + 1] = Value::uninitialized();
        }
        Ok(())
    }

    pub fn push(&mut self, value: Value) -> Result<(), AnalyzerErrorKind> {
        if self.stack_slots() + value.width() > self.max_stack {
            return Err(AnalyzerErrorKind::StackOverflow(self.max_stack));
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, AnalyzerErrorKind> {
        self.stack.pop().ok_or(AnalyzerErrorKind::EmptyStack)
    }

    /// Value `offset` entries below the top of the stack
    pub fn peek(&self, offset: usize) -> Option<&Value> {
        self.stack
            .len()
            .checked_sub(offset + 1)
            .map(|index| &self.stack[index])
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Forget which slots are reserved by wide locals (done when control jumps)
    pub fn clear_reservations(&mut self) {
        self.reserved.clear();
    }

    /// Replace every local and stack value matching the predicate
    pub fn replace_all(
        &mut self,
        matches: impl Fn(&Value) -> bool,
        update: impl Fn(&Value) -> Result<Value, AnalyzerErrorKind>,
    ) -> Result<(), AnalyzerErrorKind> {
        for value in self.locals.iter_mut().chain(self.stack.iter_mut()) {
            if matches(value) {
                *value = update(value)?;
            }
        }
        Ok(())
    }

    /// Merge the state flowing in from another predecessor into this frame
    ///
    /// Returns whether the frame changed, either because some value got more general or because
    /// a value picked up new provenance.
    pub fn merge(
        &mut self,
        other: &Frame,
        resolver: &dyn TypeResolver,
    ) -> Result<bool, AnalyzerErrorKind> {
        if self.stack.len() != other.stack.len() {
            return Err(AnalyzerErrorKind::IncompatibleStacks {
                expected: self.stack.len(),
                found: other.stack.len(),
            });
        }
        if self.locals.len() != other.locals.len() {
            return Err(AnalyzerErrorKind::InvalidLocal(
                self.locals.len().min(other.locals.len()),
            ));
        }

        let mut changed = false;
        let values = self.locals.iter_mut().zip(&other.locals);
        let stack_values = self.stack.iter_mut().zip(&other.stack);
        for (current, incoming) in values.chain(stack_values) {
            let merged = current.merge(incoming, resolver);
            if merged != *current || merged.provenance() != current.provenance() {
                *current = merged;
                changed = true;
            }
        }

        let reserved = self
            .reserved
            .intersection(&other.reserved)
            .copied()
            .collect();
        self.reserved = reserved;

        Ok(changed)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("locals: [")?;
        for (i, local) in self.locals.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", local)?;
        }
        f.write_str("] stack: [")?;
        for (i, value) in self.stack.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analysis::{DefaultTypeResolver, Number, Provenance};
    use crate::jvm::{BaseType, BinaryName, FieldType};

    fn int(i: i32, insn: usize) -> Value {
        Value::number(Number::Int(i), insn)
    }

    fn long(l: i64, insn: usize) -> Value {
        Value::number(Number::Long(l), insn)
    }

    #[test]
    fn stack_limits() {
        let mut frame = Frame::new(0, 3);
        frame.push(int(1, 0)).unwrap();
        frame.push(long(2, 1)).unwrap();
        assert_eq!(frame.stack_slots(), 3);
        assert_eq!(
            frame.push(int(3, 2)),
            Err(AnalyzerErrorKind::StackOverflow(3)),
            "stack is full"
        );

        assert_eq!(frame.peek(0), Some(&long(2, 1)));
        assert_eq!(frame.peek(1), Some(&int(1, 0)));
        assert_eq!(frame.peek(2), None);

        frame.pop().unwrap();
        frame.pop().unwrap();
        assert_eq!(frame.pop(), Err(AnalyzerErrorKind::EmptyStack));
    }

    #[test]
    fn wide_locals() {
        let mut frame = Frame::new(4, 0);
        frame.set_local(0, long(5, 0)).unwrap();
        assert!(frame.local(1).unwrap().is_uninitialized());
        assert_eq!(
            frame.set_local(1, int(1, 1)),
            Err(AnalyzerErrorKind::ReservedSlot(1)),
            "upper half of a long"
        );
        assert_eq!(
            frame.set_local(3, long(1, 2)),
            Err(AnalyzerErrorKind::InvalidLocal(3)),
            "wide value past the last local"
        );
        assert_eq!(frame.local(4), Err(AnalyzerErrorKind::InvalidLocal(4)));

        // Storing over the long releases its upper half
        frame.set_local(0, int(2, 3)).unwrap();
        frame.set_local(1, int(3, 4)).unwrap();
        assert_eq!(frame.local(1).unwrap(), &int(3, 4));

        // A jump forgets the reservation, but then the long is invalidated instead
        frame.set_local(2, long(6, 5)).unwrap();
        frame.clear_reservations();
        frame.set_local(3, int(4, 6)).unwrap();
        assert!(frame.local(2).unwrap().is_uninitialized());
    }

    #[test]
    fn merges() {
        let resolver = DefaultTypeResolver;
        let mut frame = Frame::new(2, 2);
        frame.set_local(0, int(1, 0)).unwrap();
        frame.push(int(7, 1)).unwrap();

        let same = frame.clone();
        assert_eq!(frame.merge(&same, &resolver), Ok(false), "merging with itself");

        let mut other = Frame::new(2, 2);
        other.set_local(0, int(2, 2)).unwrap();
        other.push(int(7, 1)).unwrap();
        assert_eq!(frame.merge(&other, &resolver), Ok(true));
        assert_eq!(
            frame.local(0).unwrap(),
            &Value::unresolved_primitive(BaseType::Int, Provenance::new())
        );
        assert_eq!(frame.local(0).unwrap().provenance().instructions(), &[0, 2]);
        assert_eq!(frame.merge(&other, &resolver), Ok(false), "merge is stable");

        let mut provenance = Frame::new(2, 2);
        provenance.set_local(0, int(2, 2)).unwrap();
        provenance.push(int(7, 4)).unwrap();
        assert_eq!(
            frame.merge(&provenance, &resolver),
            Ok(true),
            "new provenance is a change"
        );

        let mut deeper = other.clone();
        deeper.push(int(8, 3)).unwrap();
        assert_eq!(
            frame.merge(&deeper, &resolver),
            Err(AnalyzerErrorKind::IncompatibleStacks {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn replacements() {
        let mut frame = Frame::new(2, 2);
        let null = Value::null(0);
        frame.set_local(1, null.clone()).unwrap();
        frame.push(null.clone()).unwrap();
        frame
            .push(Value::of_type(
                &FieldType::object(BinaryName::STRING),
                Provenance::of(1),
            ))
            .unwrap();

        frame
            .replace_all(|value| value.is_null(), |value| Ok(value.with_null_check(5)))
            .unwrap();
        assert_eq!(frame.local(1).unwrap().null_check(), Some(5));
        assert_eq!(frame.peek(1).unwrap().null_check(), Some(5));
        assert!(!frame.peek(0).unwrap().is_null());
    }
}
