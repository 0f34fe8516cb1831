use super::{
    is_value_subtype_of, is_value_subtype_of_or_null, BlockTree, Frame, TypeChecker, Value,
};
use crate::jvm::code::{EqComparison, FieldRef, Instruction, MethodBody, MethodRef};
use crate::jvm::{BinaryName, FieldType, RefType};
use std::fmt;
use std::rc::Rc;

/// Category of a deferred type mismatch
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeMismatchKind {
    /// Field read from something that isn't an instance of the field owner
    GetField,

    /// Value written to a static field doesn't have the field type
    PutStatic,

    /// Value written to an instance field doesn't have the field type
    PutField,

    /// Method invoked on `null`
    InvokeHostNull,

    /// Method invoked on something that isn't an instance of the method owner
    InvokeHostType,

    /// Method argument doesn't have the parameter type
    InvokeArgType,

    /// Returned value doesn't have the method return type
    Return,

    /// Array instruction operating on something that isn't a matching array
    ArrayOperand,

    /// Reference stored into an array whose elements can't hold it
    ArrayStore,
}

/// Everything a validator gets to look at once the analysis has converged
pub struct ValidationContext<'a> {
    /// Final frame of the instruction at which the problem was reported
    pub frame: &'a Frame,
    pub checker: &'a dyn TypeChecker,
    pub blocks: &'a BlockTree,
    pub method: &'a MethodBody,
    pub insn: usize,
}

impl<'a> ValidationContext<'a> {
    /// Value `offset` entries below the top of the stack
    fn stack_value(&self, offset: usize) -> Option<&'a Value> {
        let stack = self.frame.stack();
        stack.len().checked_sub(offset + 1).map(|index| &stack[index])
    }
}

/// Condition under which a deferred problem turns out not to be a problem
///
/// Stack positions are counted in values (not slots), from the top of the stack in the frame
/// before the instruction executes.
#[derive(Clone)]
pub enum Validator {
    /// Top of the stack is a subtype of the type, or `null`
    StackTop(FieldType<BinaryName>),

    /// Top of the stack is a subtype of the type, or a `null` which was checked by a branch
    CheckedStackTop(FieldType<BinaryName>),

    /// Receiver of a method taking `args` arguments is a checked `null` or an instance of `owner`
    Receiver {
        args: usize,
        owner: FieldType<BinaryName>,
    },

    /// Argument `index` (out of `args`) is a subtype of `expected`, or `null`
    ///
    /// The argument is at `stack[len - args + index]`.
    Argument {
        args: usize,
        index: usize,
        expected: FieldType<BinaryName>,
    },

    /// Receiver of a method taking `args` arguments is not `null` anymore
    ReceiverNotNull { args: usize },

    /// Operand `depth` entries below the top of the stack is an array or `null`
    ArrayOrNull { depth: usize },

    /// Top of the stack is `null` or fits the elements of the array two entries below it
    ArrayElement,

    /// Problem is never real
    Always,

    Custom(Rc<dyn Fn(&ValidationContext<'_>) -> bool>),
}

impl Validator {
    pub fn validate(&self, context: &ValidationContext<'_>) -> bool {
        let checker = context.checker;
        match self {
            Validator::StackTop(expected) => context
                .stack_value(0)
                .map_or(false, |value| is_value_subtype_of_or_null(checker, expected, value)),
            Validator::CheckedStackTop(expected) => {
                context.stack_value(0).map_or(false, |value| {
                    is_checked_null(context, value) || is_value_subtype_of(checker, expected, value)
                })
            }
            Validator::Receiver { args, owner } => {
                context.stack_value(*args).map_or(false, |value| {
                    is_checked_null(context, value) || is_value_subtype_of(checker, owner, value)
                })
            }
            Validator::Argument {
                args,
                index,
                expected,
            } => {
                let offset = args.checked_sub(index + 1);
                offset
                    .and_then(|offset| context.stack_value(offset))
                    .map_or(false, |value| {
                        is_value_subtype_of_or_null(checker, expected, value)
                    })
            }
            Validator::ReceiverNotNull { args } => context
                .stack_value(*args)
                .map_or(false, |value| !value.is_null()),
            Validator::ArrayOrNull { depth } => {
                context.stack_value(*depth).map_or(false, |value| {
                    value.is_null() || value.ref_type().map_or(false, |typ| typ.is_array())
                })
            }
            Validator::ArrayElement => match (context.stack_value(2), context.stack_value(0)) {
                (Some(array), Some(value)) => {
                    match array.ref_type().and_then(RefType::component_type) {
                        Some(element) => is_value_subtype_of_or_null(checker, &element, value),
                        None => array.is_null(),
                    }
                }
                _ => false,
            },
            Validator::Always => true,
            Validator::Custom(validate) => validate(context),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::StackTop(typ) => f.debug_tuple("StackTop").field(typ).finish(),
            Validator::CheckedStackTop(typ) => {
                f.debug_tuple("CheckedStackTop").field(typ).finish()
            }
            Validator::Receiver { args, owner } => f
                .debug_struct("Receiver")
                .field("args", args)
                .field("owner", owner)
                .finish(),
            Validator::Argument {
                args,
                index,
                expected,
            } => f
                .debug_struct("Argument")
                .field("args", args)
                .field("index", index)
                .field("expected", expected)
                .finish(),
            Validator::ReceiverNotNull { args } => f
                .debug_struct("ReceiverNotNull")
                .field("args", args)
                .finish(),
            Validator::ArrayOrNull { depth } => f
                .debug_struct("ArrayOrNull")
                .field("depth", depth)
                .finish(),
            Validator::ArrayElement => f.write_str("ArrayElement"),
            Validator::Always => f.write_str("Always"),
            Validator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn is_checked_null(context: &ValidationContext<'_>, value: &Value) -> bool {
    value.is_null() && is_null_checked(context.method, context.blocks, value, context.insn)
}

/// Can the value safely be dereferenced at `usage`?
///
/// Anything that isn't `null` is safe. A `null` is safe if it went through a null check, and the
/// successor of that check on which the value can't be `null` shares a block with the usage.
pub fn is_null_checked(
    method: &MethodBody,
    blocks: &BlockTree,
    value: &Value,
    usage: usize,
) -> bool {
    if !value.is_null() {
        return true;
    }
    let check = match value.null_check() {
        Some(check) => check,
        None => return false,
    };
    let safe = match method.instructions.get(check) {
        Some(Instruction::IfNull(EqComparison::EQ, _)) => check + 1,
        Some(Instruction::IfNull(EqComparison::NE, label)) => match method.label_index(label) {
            Some(index) => index,
            None => return false,
        },
        _ => return false,
    };
    blocks.common_block(safe, usage).is_some()
}

/// Type mismatch which might go away once more flow information is known
#[derive(Clone, Debug)]
pub struct Problem {
    /// Instruction at which the mismatch was found
    pub insn: usize,
    pub kind: TypeMismatchKind,
    pub message: String,
    pub validator: Validator,
}

impl Problem {
    pub fn new(
        insn: usize,
        kind: TypeMismatchKind,
        message: impl Into<String>,
        validator: Validator,
    ) -> Problem {
        Problem {
            insn,
            kind,
            message: message.into(),
            validator,
        }
    }

    /// Re-check the problem against the final frames
    ///
    /// A problem at an instruction which ended up unreachable is resolved.
    pub fn is_resolved(
        &self,
        frames: &[Option<Frame>],
        checker: &dyn TypeChecker,
        blocks: &BlockTree,
        method: &MethodBody,
    ) -> bool {
        match frames.get(self.insn) {
            Some(Some(frame)) => self.validator.validate(&ValidationContext {
                frame,
                checker,
                blocks,
                method,
                insn: self.insn,
            }),
            _ => true,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({:?}): {}", self.insn, self.kind, self.message)
    }
}

/// Problems found so far, at most one per instruction, in the order they were first reported
#[derive(Clone, Debug, Default)]
pub struct Problems(Vec<Problem>);

impl Problems {
    pub fn new() -> Problems {
        Problems(vec![])
    }

    /// Record a problem, replacing any earlier problem at the same instruction
    pub fn report(&mut self, problem: Problem) {
        log::debug!("Deferred problem {}", problem);
        match self.0.iter_mut().find(|existing| existing.insn == problem.insn) {
            Some(existing) => *existing = problem,
            None => self.0.push(problem),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the problems for which the predicate holds
    pub fn retain(&mut self, keep: impl FnMut(&Problem) -> bool) {
        self.0.retain(keep)
    }

    pub fn into_vec(self) -> Vec<Problem> {
        self.0
    }
}

/// Builds the deferred problems reported by the interpreter
///
/// Every method has a default implementation. Overriding one of them (for instance to return a
/// problem with [`Validator::Always`]) changes how that class of mismatch is judged.
pub trait ProblemFactory {
    fn get_field(&self, insn: usize, field: &FieldRef, found: &Value) -> Problem {
        Problem::new(
            insn,
            TypeMismatchKind::GetField,
            format!("Expected type {} for field {}, found {}", field.class, field, found),
            Validator::CheckedStackTop(FieldType::object(field.class.clone())),
        )
    }

    fn put_static(&self, insn: usize, field: &FieldRef, found: &Value) -> Problem {
        Problem::new(
            insn,
            TypeMismatchKind::PutStatic,
            format!("Expected type {} for field {}, found {}", field.descriptor, field, found),
            Validator::StackTop(field.descriptor.clone()),
        )
    }

    fn put_field(&self, insn: usize, field: &FieldRef, found: &Value) -> Problem {
        Problem::new(
            insn,
            TypeMismatchKind::PutField,
            format!("Expected type {} for field {}, found {}", field.descriptor, field, found),
            Validator::StackTop(field.descriptor.clone()),
        )
    }

    fn invoke_host_null(&self, insn: usize, method: &MethodRef) -> Problem {
        Problem::new(
            insn,
            TypeMismatchKind::InvokeHostNull,
            format!("Cannot call {} on a null reference", method),
            Validator::ReceiverNotNull {
                args: method.descriptor.parameters.len(),
            },
        )
    }

    fn invoke_host_type(&self, insn: usize, method: &MethodRef, found: &Value) -> Problem {
        Problem::new(
            insn,
            TypeMismatchKind::InvokeHostType,
            format!("Method owner of {} does not match {}", method, found),
            Validator::Receiver {
                args: method.descriptor.parameters.len(),
                owner: FieldType::object(method.class.clone()),
            },
        )
    }

    fn invoke_arg_type(
        &self,
        insn: usize,
        parameters: &[FieldType<BinaryName>],
        index: usize,
        found: &Value,
    ) -> Problem {
        let expected = parameters[index].clone();
        Problem::new(
            insn,
            TypeMismatchKind::InvokeArgType,
            format!("Argument {} was {} but expected {}", index, found, expected),
            Validator::Argument {
                args: parameters.len(),
                index,
                expected,
            },
        )
    }

    fn return_type(&self, insn: usize, expected: &FieldType<BinaryName>, found: &Value) -> Problem {
        Problem::new(
            insn,
            TypeMismatchKind::Return,
            format!("Incompatible return type, found {} but expected {}", found, expected),
            Validator::StackTop(expected.clone()),
        )
    }

    fn array_operand(&self, insn: usize, depth: usize, found: &Value) -> Problem {
        Problem::new(
            insn,
            TypeMismatchKind::ArrayOperand,
            format!("Expected an array, found {}", found),
            Validator::ArrayOrNull { depth },
        )
    }

    fn array_store(&self, insn: usize, element: &FieldType<BinaryName>, found: &Value) -> Problem {
        Problem::new(
            insn,
            TypeMismatchKind::ArrayStore,
            format!("Cannot store {} in an array of {}", found, element),
            Validator::ArrayElement,
        )
    }
}

/// Problem factory with all of the default behaviours
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultProblemFactory;

impl ProblemFactory for DefaultProblemFactory {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analysis::{Number, Provenance};
    use crate::jvm::class_graph::{ClassGraph, ClassGraphArenas};
    use crate::jvm::code::Listing;

    fn method() -> MethodBody {
        let listing = Listing::parse(
            r#"
            .class Demo
            .method static guard(Ljava/lang/String;)V
                .limit stack 2
                .limit locals 1
                aload_0
                ifnull Skip
                aload_0
                invokevirtual java/lang/String/length()I
                pop
            Skip:
                aload_0
                invokevirtual java/lang/String/length()I
                pop
                return
            .end method
            "#,
        )
        .unwrap();
        listing.methods.into_iter().next().unwrap()
    }

    fn frame_with_stack(values: Vec<Value>) -> Frame {
        let mut frame = Frame::new(1, 4);
        for value in values {
            frame.push(value).unwrap();
        }
        frame
    }

    #[test]
    fn null_checks() {
        let method = method();
        let mut blocks = BlockTree::new(method.len());
        blocks.add_block(1, 5);

        let unchecked = Value::null(0);
        let checked = unchecked.with_null_check(1);
        let string = Value::of_type(&FieldType::object(BinaryName::STRING), Provenance::of(0));

        assert!(is_null_checked(&method, &blocks, &string, 7), "not null at all");
        assert!(!is_null_checked(&method, &blocks, &unchecked, 3));
        assert!(is_null_checked(&method, &blocks, &checked, 3), "inside the guarded block");
        assert!(!is_null_checked(&method, &blocks, &checked, 7), "past the guarded block");
    }

    #[test]
    fn validators() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        graph.insert_java_library_types();
        let method = method();
        let blocks = BlockTree::new(method.len());

        let string = FieldType::object(BinaryName::STRING);
        let text = Value::of_type(&string, Provenance::of(0));
        let five = Value::number(Number::Int(5), 1);
        let frame = frame_with_stack(vec![text.clone(), Value::null(2), five]);
        let context = ValidationContext {
            frame: &frame,
            checker: &graph,
            blocks: &blocks,
            method: &method,
            insn: 3,
        };

        assert!(Validator::StackTop(FieldType::long()).validate(&context));
        assert!(!Validator::StackTop(string.clone()).validate(&context));
        let first = Validator::Argument { args: 2, index: 0, expected: string.clone() };
        assert!(first.validate(&context));
        let second = Validator::Argument { args: 2, index: 1, expected: string.clone() };
        assert!(!second.validate(&context));
        let receiver = Validator::Receiver {
            args: 2,
            owner: FieldType::object(BinaryName::CHARSEQUENCE),
        };
        assert!(receiver.validate(&context));
        assert!(!Validator::ReceiverNotNull { args: 1 }.validate(&context));
        assert!(Validator::ReceiverNotNull { args: 2 }.validate(&context));
        assert!(Validator::ArrayOrNull { depth: 1 }.validate(&context));
        assert!(!Validator::ArrayOrNull { depth: 2 }.validate(&context));
        assert!(!Validator::StackTop(string.clone()).validate(&ValidationContext {
            frame: &Frame::new(1, 4),
            ..context
        }), "missing stack value");
        assert!(Validator::Custom(Rc::new(|context| context.insn == 3)).validate(&context));
    }

    #[test]
    fn array_element_validator() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        graph.insert_java_library_types();
        let method = method();
        let blocks = BlockTree::new(method.len());

        let integers = FieldType::array(FieldType::object(BinaryName::INTEGER));
        let array = Value::of_type(&integers, Provenance::of(0));
        let index = Value::number(Number::Int(0), 1);
        let text = Value::of_type(&FieldType::object(BinaryName::STRING), Provenance::of(2));
        let boxed = Value::of_type(&FieldType::object(BinaryName::INTEGER), Provenance::of(2));

        let validate = |values: Vec<Value>| {
            let frame = frame_with_stack(values);
            Validator::ArrayElement.validate(&ValidationContext {
                frame: &frame,
                checker: &graph,
                blocks: &blocks,
                method: &method,
                insn: 3,
            })
        };

        assert!(!validate(vec![array.clone(), index.clone(), text.clone()]));
        assert!(validate(vec![array.clone(), index.clone(), boxed]));
        assert!(validate(vec![array, index.clone(), Value::null(2)]));
        assert!(validate(vec![Value::null(0), index, text]), "null array throws anyway");
    }

    #[test]
    fn problems_per_instruction() {
        let mut problems = Problems::new();
        problems.report(Problem::new(4, TypeMismatchKind::Return, "first", Validator::Always));
        problems.report(Problem::new(2, TypeMismatchKind::GetField, "second", Validator::Always));
        problems.report(Problem::new(4, TypeMismatchKind::Return, "replaced", Validator::Always));

        let reported: Vec<(usize, &str)> = problems
            .iter()
            .map(|problem| (problem.insn, problem.message.as_str()))
            .collect();
        assert_eq!(reported, vec![(4, "replaced"), (2, "second")]);
    }
}
