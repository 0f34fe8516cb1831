use crate::jvm::{
    BaseType, BinaryName, FieldType, MethodDescriptor, Name, RefType, RenderDescriptor,
    UnqualifiedName,
};
use std::fmt;
use std::ops::Not;

/// JVM bytecode instruction, in the linear form of a method body
///
/// The representation is slightly different from the raw class file encoding:
///
///   - the "wide" instruction doesn't show up at all, but instead gets merged into the
///     instructions it is allowed to modify
///
///   - instructions differing only in some constant (like the branches, or the shifts) get
///     abstracted into one instruction with a field
///
///   - labels are pseudo-instructions occupying their own index, so that jump targets and
///     exception handler ranges can refer to them
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),
    Ldc(Constant), // covers `ldc`, `ldc_w`, and `ldc2_w`
    ILoad(u16),    // covers `iload`, `iload{0,3}`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IStore(u16), // covers `istore`, `istore{0,3}`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishr`, `ishl`, and `iushr`
    LSh(ShiftType), // covers `lshr`, `lshl`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    If(OrdComparison, Label), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, Label), // covers `if_icmpeq`, `if_icmpne`, ... `if_icmple`
    IfACmp(EqComparison, Label), // covers `if_acmpeq`, `if_acmpne`
    IfNull(EqComparison, Label), // covers `ifnull` (`EQ`) and `ifnonnull` (`NE`)
    Goto(Label),                 // covers `goto` and `goto_w`
    Jsr(Label),                  // covers `jsr` and `jsr_w`
    Ret(u16),
    TableSwitch {
        /// Jump target if the argument is less than `low` or greater than
        /// `low + targets.len()`
        default: Label,

        /// Value associated with the first jump target
        low: i32,

        /// Jump targets
        targets: Vec<Label>,
    },
    LookupSwitch {
        /// Jump target if there is no corresponding key
        default: Label,

        /// Jump targets
        targets: Vec<(i32, Label)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    Invoke(InvokeType, MethodRef),
    InvokeDynamic(InvokeDynamicRef),
    New(BinaryName),
    NewArray(BaseType),
    ANewArray(RefType<BinaryName>),
    ArrayLength,
    AThrow,
    CheckCast(RefType<BinaryName>),
    InstanceOf(RefType<BinaryName>),
    MonitorEnter,
    MonitorExit,
    MultiANewArray(RefType<BinaryName>, u8),

    /// Pseudo-instruction marking a jump target
    Label(Label),
}

/// Name of a jump target inside a method body
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub String);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Loadable constants
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Class(RefType<BinaryName>),
    MethodType(MethodDescriptor<BinaryName>),
}

impl Constant {
    /// Type of the value pushed on the stack by loading the constant
    pub fn field_type(&self) -> FieldType<BinaryName> {
        match self {
            Constant::Integer(_) => FieldType::int(),
            Constant::Long(_) => FieldType::long(),
            Constant::Float(_) => FieldType::float(),
            Constant::Double(_) => FieldType::double(),
            Constant::String(_) => FieldType::object(BinaryName::STRING),
            Constant::Class(_) => FieldType::object(BinaryName::CLASS),
            Constant::MethodType(_) => FieldType::object(BinaryName::METHODTYPE),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Integer(integer) => write!(f, "{}", integer),
            Constant::Long(long) => write!(f, "{}L", long),
            Constant::Float(float) => write!(f, "{:?}f", float),
            Constant::Double(double) => write!(f, "{:?}", double),
            Constant::String(string) => write!(f, "{:?}", string),
            Constant::Class(class) => f.write_str(&class.render()),
            Constant::MethodType(descriptor) => f.write_str(&descriptor.render()),
        }
    }
}

/// Symbolic reference to a field
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.class, self.name, self.descriptor.render())
    }
}

/// Symbolic reference to a method
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

impl MethodRef {
    pub fn new(
        class: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<BinaryName>,
    ) -> MethodRef {
        MethodRef {
            class,
            name,
            descriptor,
        }
    }

    /// Check if the method has the given name and rendered descriptor
    pub fn is(&self, name: &str, descriptor: &str) -> bool {
        self.name.as_str() == name && self.descriptor.render() == descriptor
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.class, self.name, self.descriptor.render())
    }
}

/// Call site of an `invokedynamic`
#[derive(Clone, Debug, PartialEq)]
pub struct InvokeDynamicRef {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,

    /// Left out of listings which don't care how the call site is linked
    pub bootstrap: Option<BootstrapMethod>,
}

/// Bootstrap method of a call site, along with its static arguments
#[derive(Clone, Debug, PartialEq)]
pub struct BootstrapMethod {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub arguments: Vec<Constant>,
}

impl BootstrapMethod {
    pub fn is(&self, class: &BinaryName, name: &str) -> bool {
        &self.class == class && self.name.as_str() == name
    }
}

/// Possible bit shifts
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl OrdComparison {
    /// Evaluate the comparison on two integers
    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            OrdComparison::EQ => lhs == rhs,
            OrdComparison::GE => lhs >= rhs,
            OrdComparison::GT => lhs > rhs,
            OrdComparison::LE => lhs <= rhs,
            OrdComparison::LT => lhs < rhs,
            OrdComparison::NE => lhs != rhs,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            OrdComparison::EQ => "eq",
            OrdComparison::GE => "ge",
            OrdComparison::GT => "gt",
            OrdComparison::LE => "le",
            OrdComparison::LT => "lt",
            OrdComparison::NE => "ne",
        }
    }

    fn from_suffix(suffix: &str) -> Option<OrdComparison> {
        let comparison = match suffix {
            "eq" => OrdComparison::EQ,
            "ge" => OrdComparison::GE,
            "gt" => OrdComparison::GT,
            "le" => OrdComparison::LE,
            "lt" => OrdComparison::LT,
            "ne" => OrdComparison::NE,
            _ => return None,
        };
        Some(comparison)
    }
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Type of method to invoke
///
/// Note: `InvokeDynamic` is kept separate because the constant argument it expects is not to a
/// `Constant::MethodRef`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface(u8), // `count` is of total arguments, where `long`/`double` count for 2
}

impl InvokeType {
    fn mnemonic(self) -> &'static str {
        match self {
            InvokeType::Virtual => "invokevirtual",
            InvokeType::Special => "invokespecial",
            InvokeType::Static => "invokestatic",
            InvokeType::Interface(_) => "invokeinterface",
        }
    }
}

macro_rules! simple_instructions {
    ($( [$($insn:tt)+] => $mnemonic:literal, )*) => {
        impl Instruction {
            /// Instruction without any operands, from its mnemonic
            pub fn from_simple_mnemonic(mnemonic: &str) -> Option<Instruction> {
                match mnemonic {
                    $( $mnemonic => Some($($insn)+), )*
                    _ => None,
                }
            }

            /// Mnemonic of an instruction without any operands
            fn simple_mnemonic(&self) -> Option<&'static str> {
                match self {
                    $( $($insn)+ => Some($mnemonic), )*
                    _ => None,
                }
            }
        }
    };
}

simple_instructions! {
    [Instruction::Nop] => "nop",
    [Instruction::AConstNull] => "aconst_null",
    [Instruction::IConstM1] => "iconst_m1",
    [Instruction::IConst0] => "iconst_0",
    [Instruction::IConst1] => "iconst_1",
    [Instruction::IConst2] => "iconst_2",
    [Instruction::IConst3] => "iconst_3",
    [Instruction::IConst4] => "iconst_4",
    [Instruction::IConst5] => "iconst_5",
    [Instruction::LConst0] => "lconst_0",
    [Instruction::LConst1] => "lconst_1",
    [Instruction::FConst0] => "fconst_0",
    [Instruction::FConst1] => "fconst_1",
    [Instruction::FConst2] => "fconst_2",
    [Instruction::DConst0] => "dconst_0",
    [Instruction::DConst1] => "dconst_1",
    [Instruction::IALoad] => "iaload",
    [Instruction::LALoad] => "laload",
    [Instruction::FALoad] => "faload",
    [Instruction::DALoad] => "daload",
    [Instruction::AALoad] => "aaload",
    [Instruction::BALoad] => "baload",
    [Instruction::CALoad] => "caload",
    [Instruction::SALoad] => "saload",
    [Instruction::IAStore] => "iastore",
    [Instruction::LAStore] => "lastore",
    [Instruction::FAStore] => "fastore",
    [Instruction::DAStore] => "dastore",
    [Instruction::AAStore] => "aastore",
    [Instruction::BAStore] => "bastore",
    [Instruction::CAStore] => "castore",
    [Instruction::SAStore] => "sastore",
    [Instruction::Pop] => "pop",
    [Instruction::Pop2] => "pop2",
    [Instruction::Dup] => "dup",
    [Instruction::DupX1] => "dup_x1",
    [Instruction::DupX2] => "dup_x2",
    [Instruction::Dup2] => "dup2",
    [Instruction::Dup2X1] => "dup2_x1",
    [Instruction::Dup2X2] => "dup2_x2",
    [Instruction::Swap] => "swap",
    [Instruction::IAdd] => "iadd",
    [Instruction::LAdd] => "ladd",
    [Instruction::FAdd] => "fadd",
    [Instruction::DAdd] => "dadd",
    [Instruction::ISub] => "isub",
    [Instruction::LSub] => "lsub",
    [Instruction::FSub] => "fsub",
    [Instruction::DSub] => "dsub",
    [Instruction::IMul] => "imul",
    [Instruction::LMul] => "lmul",
    [Instruction::FMul] => "fmul",
    [Instruction::DMul] => "dmul",
    [Instruction::IDiv] => "idiv",
    [Instruction::LDiv] => "ldiv",
    [Instruction::FDiv] => "fdiv",
    [Instruction::DDiv] => "ddiv",
    [Instruction::IRem] => "irem",
    [Instruction::LRem] => "lrem",
    [Instruction::FRem] => "frem",
    [Instruction::DRem] => "drem",
    [Instruction::INeg] => "ineg",
    [Instruction::LNeg] => "lneg",
    [Instruction::FNeg] => "fneg",
    [Instruction::DNeg] => "dneg",
    [Instruction::ISh(ShiftType::Left)] => "ishl",
    [Instruction::ISh(ShiftType::ArithmeticRight)] => "ishr",
    [Instruction::ISh(ShiftType::LogicalRight)] => "iushr",
    [Instruction::LSh(ShiftType::Left)] => "lshl",
    [Instruction::LSh(ShiftType::ArithmeticRight)] => "lshr",
    [Instruction::LSh(ShiftType::LogicalRight)] => "lushr",
    [Instruction::IAnd] => "iand",
    [Instruction::LAnd] => "land",
    [Instruction::IOr] => "ior",
    [Instruction::LOr] => "lor",
    [Instruction::IXor] => "ixor",
    [Instruction::LXor] => "lxor",
    [Instruction::I2L] => "i2l",
    [Instruction::I2F] => "i2f",
    [Instruction::I2D] => "i2d",
    [Instruction::L2I] => "l2i",
    [Instruction::L2F] => "l2f",
    [Instruction::L2D] => "l2d",
    [Instruction::F2I] => "f2i",
    [Instruction::F2L] => "f2l",
    [Instruction::F2D] => "f2d",
    [Instruction::D2I] => "d2i",
    [Instruction::D2L] => "d2l",
    [Instruction::D2F] => "d2f",
    [Instruction::I2B] => "i2b",
    [Instruction::I2C] => "i2c",
    [Instruction::I2S] => "i2s",
    [Instruction::LCmp] => "lcmp",
    [Instruction::FCmp(CompareMode::L)] => "fcmpl",
    [Instruction::FCmp(CompareMode::G)] => "fcmpg",
    [Instruction::DCmp(CompareMode::L)] => "dcmpl",
    [Instruction::DCmp(CompareMode::G)] => "dcmpg",
    [Instruction::IReturn] => "ireturn",
    [Instruction::LReturn] => "lreturn",
    [Instruction::FReturn] => "freturn",
    [Instruction::DReturn] => "dreturn",
    [Instruction::AReturn] => "areturn",
    [Instruction::Return] => "return",
    [Instruction::ArrayLength] => "arraylength",
    [Instruction::AThrow] => "athrow",
    [Instruction::MonitorEnter] => "monitorenter",
    [Instruction::MonitorExit] => "monitorexit",
}

impl Instruction {
    /// Conditional branch, from the mnemonic (eg. `ifeq` or `if_acmpne`)
    pub fn conditional_branch(mnemonic: &str, target: Label) -> Option<Instruction> {
        if let Some(suffix) = mnemonic.strip_prefix("if_icmp") {
            OrdComparison::from_suffix(suffix).map(|cmp| Instruction::IfICmp(cmp, target))
        } else if let Some(suffix) = mnemonic.strip_prefix("if_acmp") {
            match suffix {
                "eq" => Some(Instruction::IfACmp(EqComparison::EQ, target)),
                "ne" => Some(Instruction::IfACmp(EqComparison::NE, target)),
                _ => None,
            }
        } else if mnemonic == "ifnull" {
            Some(Instruction::IfNull(EqComparison::EQ, target))
        } else if mnemonic == "ifnonnull" {
            Some(Instruction::IfNull(EqComparison::NE, target))
        } else {
            let suffix = mnemonic.strip_prefix("if")?;
            OrdComparison::from_suffix(suffix).map(|cmp| Instruction::If(cmp, target))
        }
    }

    /// Is this a jump (conditional or not) or a switch?
    pub fn is_jump_or_switch(&self) -> bool {
        matches!(
            self,
            Instruction::If(..)
                | Instruction::IfICmp(..)
                | Instruction::IfACmp(..)
                | Instruction::IfNull(..)
                | Instruction::Goto(_)
                | Instruction::Jsr(_)
                | Instruction::TableSwitch { .. }
                | Instruction::LookupSwitch { .. }
        )
    }

    /// Is this one of the return instructions?
    pub fn is_return(&self) -> bool {
        matches!(
            self,
            Instruction::IReturn
                | Instruction::LReturn
                | Instruction::FReturn
                | Instruction::DReturn
                | Instruction::AReturn
                | Instruction::Return
        )
    }

    /// Can control continue on to the next instruction?
    pub fn falls_through(&self) -> bool {
        !(self.is_return()
            || matches!(
                self,
                Instruction::Goto(_)
                    | Instruction::Jsr(_)
                    | Instruction::Ret(_)
                    | Instruction::TableSwitch { .. }
                    | Instruction::LookupSwitch { .. }
                    | Instruction::AThrow
            ))
    }

    /// Labels that this instruction may jump to (switch defaults first)
    pub fn jump_targets(&self) -> Vec<&Label> {
        match self {
            Instruction::If(_, target)
            | Instruction::IfICmp(_, target)
            | Instruction::IfACmp(_, target)
            | Instruction::IfNull(_, target)
            | Instruction::Goto(target)
            | Instruction::Jsr(target) => vec![target],
            Instruction::TableSwitch {
                default, targets, ..
            } => std::iter::once(default).chain(targets.iter()).collect(),
            Instruction::LookupSwitch { default, targets } => std::iter::once(default)
                .chain(targets.iter().map(|(_, target)| target))
                .collect(),
            _ => vec![],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(mnemonic) = self.simple_mnemonic() {
            return f.write_str(mnemonic);
        }
        match self {
            Instruction::BiPush(b) => write!(f, "bipush {}", b),
            Instruction::SiPush(s) => write!(f, "sipush {}", s),
            Instruction::Ldc(constant @ (Constant::Long(_) | Constant::Double(_))) => {
                write!(f, "ldc2_w {}", constant)
            }
            Instruction::Ldc(constant) => write!(f, "ldc {}", constant),
            Instruction::ILoad(idx) => write!(f, "iload {}", idx),
            Instruction::LLoad(idx) => write!(f, "lload {}", idx),
            Instruction::FLoad(idx) => write!(f, "fload {}", idx),
            Instruction::DLoad(idx) => write!(f, "dload {}", idx),
            Instruction::ALoad(idx) => write!(f, "aload {}", idx),
            Instruction::IStore(idx) => write!(f, "istore {}", idx),
            Instruction::LStore(idx) => write!(f, "lstore {}", idx),
            Instruction::FStore(idx) => write!(f, "fstore {}", idx),
            Instruction::DStore(idx) => write!(f, "dstore {}", idx),
            Instruction::AStore(idx) => write!(f, "astore {}", idx),
            Instruction::IInc(idx, by) => write!(f, "iinc {} {}", idx, by),
            Instruction::If(cmp, target) => write!(f, "if{} {}", cmp.suffix(), target),
            Instruction::IfICmp(cmp, target) => write!(f, "if_icmp{} {}", cmp.suffix(), target),
            Instruction::IfACmp(EqComparison::EQ, target) => write!(f, "if_acmpeq {}", target),
            Instruction::IfACmp(EqComparison::NE, target) => write!(f, "if_acmpne {}", target),
            Instruction::IfNull(EqComparison::EQ, target) => write!(f, "ifnull {}", target),
            Instruction::IfNull(EqComparison::NE, target) => write!(f, "ifnonnull {}", target),
            Instruction::Goto(target) => write!(f, "goto {}", target),
            Instruction::Jsr(target) => write!(f, "jsr {}", target),
            Instruction::Ret(idx) => write!(f, "ret {}", idx),
            Instruction::TableSwitch {
                default,
                low,
                targets,
            } => {
                write!(f, "tableswitch {}", low)?;
                for target in targets {
                    write!(f, " {}", target)?;
                }
                write!(f, " default:{}", default)
            }
            Instruction::LookupSwitch { default, targets } => {
                f.write_str("lookupswitch")?;
                for (key, target) in targets {
                    write!(f, " {}:{}", key, target)?;
                }
                write!(f, " default:{}", default)
            }
            Instruction::GetStatic(field) => write!(f, "getstatic {}", field),
            Instruction::PutStatic(field) => write!(f, "putstatic {}", field),
            Instruction::GetField(field) => write!(f, "getfield {}", field),
            Instruction::PutField(field) => write!(f, "putfield {}", field),
            Instruction::Invoke(InvokeType::Interface(count), method) => {
                write!(f, "invokeinterface {} {}", method, count)
            }
            Instruction::Invoke(typ, method) => write!(f, "{} {}", typ.mnemonic(), method),
            Instruction::InvokeDynamic(indy) => {
                write!(f, "invokedynamic {}{}", indy.name, indy.descriptor.render())?;
                if let Some(bootstrap) = &indy.bootstrap {
                    write!(f, " {}/{}", bootstrap.class, bootstrap.name)?;
                    for argument in &bootstrap.arguments {
                        write!(f, " {}", argument)?;
                    }
                }
                Ok(())
            }
            Instruction::New(class) => write!(f, "new {}", class),
            Instruction::NewArray(base_type) => write!(f, "newarray {}", base_type.keyword()),
            Instruction::ANewArray(ref_type) => write!(f, "anewarray {}", class_operand(ref_type)),
            Instruction::CheckCast(ref_type) => write!(f, "checkcast {}", class_operand(ref_type)),
            Instruction::InstanceOf(ref_type) => {
                write!(f, "instanceof {}", class_operand(ref_type))
            }
            Instruction::MultiANewArray(ref_type, dimensions) => {
                write!(f, "multianewarray {} {}", ref_type.render(), dimensions)
            }
            Instruction::Label(label) => write!(f, "{}:", label),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Class operands are written as plain binary names, arrays as descriptors
fn class_operand(ref_type: &RefType<BinaryName>) -> String {
    match ref_type {
        RefType::Object(class) => class.as_str().to_owned(),
        other => other.render(),
    }
}
