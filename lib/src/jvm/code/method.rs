use super::{Instruction, Label};
use crate::jvm::{BinaryName, Error, MethodAccessFlags, MethodDescriptor, UnqualifiedName};
use std::collections::HashMap;

/// Exception handler entry of a method, as written in the source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of the protected range (inclusive)
    pub start: Label,

    /// End of the protected range (exclusive)
    pub end: Label,

    /// Where the handler code starts
    pub handler: Label,

    /// Type caught (`None` catches everything, as in `finally` blocks)
    pub catch_type: Option<BinaryName>,
}

/// Exception handler entry with labels resolved to instruction indices
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryCatchBlock {
    pub start: usize,
    pub end: usize,
    pub handler: usize,
    pub catch_type: Option<BinaryName>,
}

impl TryCatchBlock {
    /// Does this handler protect the instruction at `index`?
    pub fn covers(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// Linear instruction stream of one method, with its exception table
///
/// Labels are resolved and the raw control flow successors are computed when the body is
/// constructed, so a `MethodBody` that exists is always internally consistent.
#[derive(Debug)]
pub struct MethodBody {
    /// Class declaring the method
    pub class: BinaryName,

    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
    pub access_flags: MethodAccessFlags,

    /// Maximum depth of the operand stack (in slots)
    pub max_stack: u16,

    /// Number of local variable slots
    pub max_locals: u16,

    pub instructions: Vec<Instruction>,
    pub handlers: Vec<ExceptionHandler>,

    labels: HashMap<Label, usize>,
    try_catch_blocks: Vec<TryCatchBlock>,
    successors: Vec<Vec<usize>>,
}

impl MethodBody {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        class: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<BinaryName>,
        access_flags: MethodAccessFlags,
        max_stack: u16,
        max_locals: u16,
        instructions: Vec<Instruction>,
        handlers: Vec<ExceptionHandler>,
    ) -> Result<MethodBody, Error> {
        let invalid = |message: String| Error::InvalidMethod {
            method: format!("{}.{}", class, name),
            message,
        };

        let mut labels = HashMap::new();
        for (index, insn) in instructions.iter().enumerate() {
            if let Instruction::Label(label) = insn {
                if labels.insert(label.clone(), index).is_some() {
                    return Err(invalid(format!("label {} is defined twice", label)));
                }
            }
        }
        let resolve = |label: &Label| -> Result<usize, Error> {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| invalid(format!("label {} is not defined", label)))
        };

        let mut try_catch_blocks = Vec::with_capacity(handlers.len());
        for handler in &handlers {
            let block = TryCatchBlock {
                start: resolve(&handler.start)?,
                end: resolve(&handler.end)?,
                handler: resolve(&handler.handler)?,
                catch_type: handler.catch_type.clone(),
            };
            if block.start >= block.end {
                return Err(invalid(format!(
                    "handler range {} to {} is empty",
                    handler.start, handler.end
                )));
            }
            try_catch_blocks.push(block);
        }

        // `ret` continues after any of the subroutine calls
        let mut return_sites = vec![];
        for (index, insn) in instructions.iter().enumerate() {
            if let Instruction::Jsr(_) = insn {
                if index + 1 >= instructions.len() {
                    return Err(invalid(String::from("jsr is the last instruction")));
                }
                return_sites.push(index + 1);
            }
        }

        let mut successors = Vec::with_capacity(instructions.len());
        for (index, insn) in instructions.iter().enumerate() {
            let mut targets: Vec<usize> = vec![];
            if insn.falls_through() {
                if index + 1 < instructions.len() {
                    targets.push(index + 1);
                } else if !matches!(insn, Instruction::Label(_)) {
                    return Err(invalid(format!("execution can fall off the end after {}", insn)));
                }
            }
            if let Instruction::Ret(_) = insn {
                targets.extend(&return_sites);
            }
            for label in insn.jump_targets() {
                targets.push(resolve(label)?);
            }
            let mut deduplicated = Vec::with_capacity(targets.len());
            for target in targets {
                if !deduplicated.contains(&target) {
                    deduplicated.push(target);
                }
            }
            successors.push(deduplicated);
        }

        Ok(MethodBody {
            class,
            name,
            descriptor,
            access_flags,
            max_stack,
            max_locals,
            instructions,
            handlers,
            labels,
            try_catch_blocks,
            successors,
        })
    }

    /// Is this a static method?
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Index of the pseudo-instruction for a label
    pub fn label_index(&self, label: &Label) -> Option<usize> {
        self.labels.get(label).copied()
    }

    /// Instructions control can flow to after the instruction at `index`
    ///
    /// Fall-through comes first, then jump targets (switch defaults before the other cases).
    /// Exception handler edges are not included, see [`MethodBody::handlers_covering`].
    pub fn successors(&self, index: usize) -> &[usize] {
        self.successors.get(index).map_or(&[], Vec::as_slice)
    }

    /// Exception handlers protecting the instruction at `index`, in table order
    pub fn handlers_covering(&self, index: usize) -> impl Iterator<Item = &TryCatchBlock> {
        self.try_catch_blocks
            .iter()
            .filter(move |block| block.covers(index))
    }

    /// All exception handlers, with resolved indices
    pub fn try_catch_blocks(&self) -> &[TryCatchBlock] {
        &self.try_catch_blocks
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::OrdComparison;
    use crate::jvm::{Name, ParseDescriptor};

    fn label(name: &str) -> Label {
        Label(String::from(name))
    }

    fn method(
        instructions: Vec<Instruction>,
        handlers: Vec<ExceptionHandler>,
    ) -> Result<MethodBody, Error> {
        MethodBody::new(
            BinaryName::from_string(String::from("Test")).unwrap(),
            UnqualifiedName::from_string(String::from("test")).unwrap(),
            MethodDescriptor::parse("()V").unwrap(),
            MethodAccessFlags::STATIC,
            2,
            2,
            instructions,
            handlers,
        )
    }

    #[test]
    fn branch_successors() {
        let body = method(
            vec![
                Instruction::IConst0,
                Instruction::If(OrdComparison::EQ, label("A")),
                Instruction::Nop,
                Instruction::Label(label("A")),
                Instruction::Return,
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(body.successors(0), &[1]);
        assert_eq!(body.successors(1), &[2, 3]);
        assert_eq!(body.successors(3), &[4]);
        assert!(body.successors(4).is_empty());
        assert_eq!(body.label_index(&label("A")), Some(3));
    }

    #[test]
    fn subroutine_successors() {
        let body = method(
            vec![
                Instruction::Jsr(label("Sub")),
                Instruction::Return,
                Instruction::Label(label("Sub")),
                Instruction::AStore(1),
                Instruction::Ret(1),
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(body.successors(0), &[2]);
        assert_eq!(body.successors(4), &[1]);
    }

    #[test]
    fn handler_ranges() {
        let body = method(
            vec![
                Instruction::Label(label("Start")),
                Instruction::Nop,
                Instruction::Label(label("End")),
                Instruction::Return,
                Instruction::Label(label("Handler")),
                Instruction::AThrow,
            ],
            vec![ExceptionHandler {
                start: label("Start"),
                end: label("End"),
                handler: label("Handler"),
                catch_type: None,
            }],
        )
        .unwrap();
        assert_eq!(body.handlers_covering(1).count(), 1);
        assert_eq!(body.handlers_covering(2).count(), 0);
        assert_eq!(body.try_catch_blocks()[0].handler, 4);
    }

    #[test]
    fn malformed_bodies() {
        assert!(method(vec![Instruction::Goto(label("Nowhere"))], vec![]).is_err());
        assert!(method(vec![Instruction::Nop], vec![]).is_err());
        assert!(method(
            vec![
                Instruction::Label(label("A")),
                Instruction::Label(label("A")),
                Instruction::Return
            ],
            vec![]
        )
        .is_err());
    }
}
