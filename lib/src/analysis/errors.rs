use super::Problem;
use std::fmt;

/// Reasons the analysis of a method can fail
#[derive(Debug)]
pub enum Error {
    /// Structural type violation which no amount of flow information can explain away
    Analyzer {
        insn: usize,
        instruction: String,
        kind: AnalyzerErrorKind,
    },

    /// First deferred problem still standing once the frames have converged
    Unresolved(Problem),

    /// The method body cannot be analyzed at all
    InvalidMethod(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerErrorKind {
    EmptyStack,

    /// Pushing would exceed the declared maximum stack size (in slots)
    StackOverflow(usize),

    /// Local variable index is beyond the declared number of locals
    InvalidLocal(usize),

    /// Local is the second half of a `long` or `double`
    ReservedSlot(usize),

    /// Reading a local that was never written
    UninitializedLocal(usize),

    /// Operand is the result of an unmergeable control flow join
    UninitializedValue,

    /// Storing a value into a local with an incompatible store instruction
    IllegalStore {
        local: usize,
        expected: String,
        found: String,
    },

    /// Loading a local with an incompatible load instruction
    IllegalLoad {
        local: usize,
        expected: String,
        found: String,
    },

    /// Stack manipulation on values of the wrong width (eg. `swap` on a `long`)
    InvalidWidth(usize),

    /// Operand is of the wrong kind for the instruction
    UnexpectedType { expected: String, found: String },

    /// Method receiver is not an object at all
    InvalidReceiver { method: String, found: String },

    /// `ret` on a local which doesn't hold a return address
    NotReturnAddress(usize),

    /// Jump to a label the method doesn't define
    UnknownLabel(String),

    /// Control flow joins stacks of different depths
    IncompatibleStacks { expected: usize, found: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Analyzer {
                insn,
                instruction,
                kind,
            } => write!(f, "#{} `{}`: {}", insn, instruction, kind),
            Error::Unresolved(problem) => write!(f, "{}", problem),
            Error::InvalidMethod(message) => write!(f, "invalid method: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for AnalyzerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerErrorKind::EmptyStack => f.write_str("pop from an empty stack"),
            AnalyzerErrorKind::StackOverflow(max) => {
                write!(f, "stack exceeds its maximum size of {}", max)
            }
            AnalyzerErrorKind::InvalidLocal(local) => write!(f, "no local variable {}", local),
            AnalyzerErrorKind::ReservedSlot(local) => write!(
                f,
                "local {} is reserved by the wide value in local {}",
                local,
                local.wrapping_sub(1)
            ),
            AnalyzerErrorKind::UninitializedLocal(local) => {
                write!(f, "local {} is read before being written", local)
            }
            AnalyzerErrorKind::UninitializedValue => {
                f.write_str("operand comes from incompatible control flow paths")
            }
            AnalyzerErrorKind::IllegalStore {
                local,
                expected,
                found,
            } => write!(f, "cannot store {} into {} local {}", found, expected, local),
            AnalyzerErrorKind::IllegalLoad {
                local,
                expected,
                found,
            } => write!(f, "cannot load {} local {} holding {}", expected, local, found),
            AnalyzerErrorKind::InvalidWidth(width) => {
                write!(f, "operand has unexpected width {}", width)
            }
            AnalyzerErrorKind::UnexpectedType { expected, found } => {
                write!(f, "expected {} but found {}", expected, found)
            }
            AnalyzerErrorKind::InvalidReceiver { method, found } => {
                write!(f, "cannot invoke {} on {}", method, found)
            }
            AnalyzerErrorKind::NotReturnAddress(local) => {
                write!(f, "local {} does not hold a return address", local)
            }
            AnalyzerErrorKind::UnknownLabel(label) => write!(f, "unknown label {}", label),
            AnalyzerErrorKind::IncompatibleStacks { expected, found } => write!(
                f,
                "control flow joins a stack of {} values with one of {} values",
                expected, found
            ),
        }
    }
}
