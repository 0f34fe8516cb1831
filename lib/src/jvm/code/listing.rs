use super::{
    BootstrapMethod, Constant, ExceptionHandler, FieldRef, Instruction, InvokeDynamicRef,
    InvokeType, Label, MethodBody, MethodRef,
};
use crate::jvm::class_graph::ClassGraph;
use crate::jvm::{
    BaseType, BinaryName, ClassAccessFlags, Error, FieldType, MethodAccessFlags,
    MethodDescriptor, Name, ParseDescriptor, RefType, UnqualifiedName,
};
use std::path::Path;

/// Stack limit for methods that don't declare `.limit stack`
const DEFAULT_MAX_STACK: u16 = 256;

/// Class and method declarations read from a textual, Jasmin-flavoured listing
///
/// The format is line based, with a `;` at the start of a token beginning a comment:
///
/// ```text
/// .class public Demo              ; starts a class, modifiers before the name
/// .super java/lang/Object         ; optional, defaults to `java/lang/Object`
/// .implements java/lang/Runnable  ; any number of these
///
/// .method public static main([Ljava/lang/String;)V
///     .limit stack 2              ; optional (defaults to 256)
///     .limit locals 1             ; optional (defaults to the highest slot used)
///     .catch java/lang/Exception from Start to End using Handler
/// Start:
///     getstatic java/lang/System/out Ljava/io/PrintStream;
///     ldc "Hello"
///     invokevirtual java/io/PrintStream/println(Ljava/lang/String;)V
/// End:
///     return
/// Handler:
///     athrow
/// .end method
/// ```
///
/// Instructions use their usual mnemonics. Switches fit on one line (`tableswitch 0 A B
/// default:C` and `lookupswitch 1:A 10:B default:C`), and `ldc`/`ldc2_w` pick the constant type
/// from the literal (`"str"`, `1`, `1.5f`, `2L`, `2.5`, `Ljava/lang/String;`, `[I`). An
/// `invokedynamic` takes its call site, then optionally the bootstrap method and its constant
/// arguments (`invokedynamic run()V Boot/link "recipe" 1`).
#[derive(Debug)]
pub struct Listing {
    pub classes: Vec<ClassDeclaration>,
    pub methods: Vec<MethodBody>,
}

/// Class header from a listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDeclaration {
    pub name: BinaryName,
    pub access_flags: ClassAccessFlags,
    pub superclass: BinaryName,
    pub interfaces: Vec<BinaryName>,
}

impl Listing {
    /// Parse a listing from its source text
    pub fn parse(source: &str) -> Result<Listing, Error> {
        let mut parser = Parser::default();
        for (line_idx, line) in source.lines().enumerate() {
            let line_number = line_idx + 1;
            parser
                .parse_line(line)
                .map_err(|message| Error::Parse {
                    line: line_number,
                    message,
                })?;
        }
        parser.finish()
    }

    /// Read and parse a listing file
    pub fn read(path: impl AsRef<Path>) -> Result<Listing, Error> {
        let source = std::fs::read_to_string(path)?;
        Listing::parse(&source)
    }

    /// Find the first method with the given name
    pub fn method(&self, name: &str) -> Option<&MethodBody> {
        self.methods.iter().find(|method| method.name.as_str() == name)
    }

    /// Register the declared classes into a class graph
    ///
    /// Classes are declared in listing order, so a superclass should be declared before its
    /// subclasses (otherwise it gets registered as a placeholder extending `java/lang/Object`).
    pub fn declare_classes<'g>(&self, class_graph: &ClassGraph<'g>) {
        for class in &self.classes {
            log::debug!("Declaring {} extends {}", class.name, class.superclass);
            class_graph.declare_class(
                class.name.clone(),
                &class.superclass,
                &class.interfaces,
                class.access_flags,
            );
        }
    }
}

/// Method whose body is still being read
struct PendingMethod {
    name: UnqualifiedName,
    descriptor: MethodDescriptor<BinaryName>,
    access_flags: MethodAccessFlags,
    max_stack: Option<u16>,
    max_locals: Option<u16>,
    instructions: Vec<Instruction>,
    handlers: Vec<ExceptionHandler>,
}

#[derive(Default)]
struct Parser {
    classes: Vec<ClassDeclaration>,
    methods: Vec<MethodBody>,
    method: Option<PendingMethod>,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Word(String),
    Str(String),
}

impl Parser {
    fn parse_line(&mut self, line: &str) -> Result<(), String> {
        let mut tokens = tokenize(line)?;
        if tokens.is_empty() {
            return Ok(());
        }

        // Label definitions, possibly followed by an instruction
        if let Token::Word(word) = &tokens[0] {
            if let Some(label) = word.strip_suffix(':') {
                if label.is_empty() || label.starts_with('.') {
                    return Err(format!("invalid label '{}'", word));
                }
                let label = Label(label.to_owned());
                self.pending_method()?
                    .instructions
                    .push(Instruction::Label(label));
                tokens.remove(0);
                if tokens.is_empty() {
                    return Ok(());
                }
            }
        }

        let (head, rest) = match tokens.split_first() {
            Some((Token::Word(head), rest)) => (head.as_str(), rest),
            _ => return Err(String::from("line must start with a directive or instruction")),
        };
        match head {
            ".class" => self.parse_class(rest),
            ".super" => {
                let class = self.current_class()?;
                class.superclass = binary_name(single(rest, ".super")?)?;
                Ok(())
            }
            ".implements" => {
                let interface = binary_name(single(rest, ".implements")?)?;
                self.current_class()?.interfaces.push(interface);
                Ok(())
            }
            ".method" => self.parse_method(rest),
            ".limit" => self.parse_limit(rest),
            ".catch" => self.parse_catch(rest),
            ".end" => match rest {
                [Token::Word(what)] if what == "method" => self.end_method(),
                _ => Err(String::from("expected '.end method'")),
            },
            _ if head.starts_with('.') => Err(format!("unknown directive '{}'", head)),
            mnemonic => {
                let insn = parse_instruction(mnemonic, rest)?;
                self.pending_method()?.instructions.push(insn);
                Ok(())
            }
        }
    }

    fn parse_class(&mut self, tokens: &[Token]) -> Result<(), String> {
        if self.method.is_some() {
            return Err(String::from(".class inside of a method"));
        }
        let (name, modifiers) = match tokens.split_last() {
            Some((Token::Word(name), modifiers)) => (name, modifiers),
            _ => return Err(String::from(".class needs a class name")),
        };
        let mut access_flags = ClassAccessFlags::SUPER;
        for modifier in modifiers {
            let modifier = word(modifier)?;
            access_flags |= ClassAccessFlags::from_keyword(modifier)
                .ok_or_else(|| format!("unknown class modifier '{}'", modifier))?;
        }
        self.classes.push(ClassDeclaration {
            name: binary_name(name)?,
            access_flags,
            superclass: BinaryName::OBJECT,
            interfaces: vec![],
        });
        Ok(())
    }

    fn parse_method(&mut self, tokens: &[Token]) -> Result<(), String> {
        if self.method.is_some() {
            return Err(String::from("previous method is missing '.end method'"));
        }
        self.current_class()?;
        let (signature, modifiers) = match tokens.split_last() {
            Some((Token::Word(signature), modifiers)) => (signature, modifiers),
            _ => return Err(String::from(".method needs a name and descriptor")),
        };
        let mut access_flags = MethodAccessFlags::empty();
        for modifier in modifiers {
            let modifier = word(modifier)?;
            access_flags |= MethodAccessFlags::from_keyword(modifier)
                .ok_or_else(|| format!("unknown method modifier '{}'", modifier))?;
        }
        let paren = signature
            .find('(')
            .ok_or_else(|| format!("method '{}' is missing a descriptor", signature))?;
        self.method = Some(PendingMethod {
            name: unqualified_name(&signature[..paren])?,
            descriptor: method_descriptor(&signature[paren..])?,
            access_flags,
            max_stack: None,
            max_locals: None,
            instructions: vec![],
            handlers: vec![],
        });
        Ok(())
    }

    fn parse_limit(&mut self, tokens: &[Token]) -> Result<(), String> {
        let method = self.pending_method()?;
        match tokens {
            [Token::Word(kind), Token::Word(value)] => {
                let value: u16 = value
                    .parse()
                    .map_err(|_| format!("invalid limit '{}'", value))?;
                match kind.as_str() {
                    "stack" => method.max_stack = Some(value),
                    "locals" => method.max_locals = Some(value),
                    other => return Err(format!("unknown limit '{}'", other)),
                }
                Ok(())
            }
            _ => Err(String::from("expected '.limit stack N' or '.limit locals N'")),
        }
    }

    fn parse_catch(&mut self, tokens: &[Token]) -> Result<(), String> {
        let method = self.pending_method()?;
        let words = tokens.iter().map(word).collect::<Result<Vec<&str>, String>>()?;
        match words.as_slice() {
            [catch_type, "from", start, "to", end, "using", handler] => {
                let catch_type = match *catch_type {
                    "all" => None,
                    name => Some(binary_name(name)?),
                };
                method.handlers.push(ExceptionHandler {
                    start: Label(start.to_string()),
                    end: Label(end.to_string()),
                    handler: Label(handler.to_string()),
                    catch_type,
                });
                Ok(())
            }
            _ => Err(String::from(
                "expected '.catch <type|all> from <label> to <label> using <label>'",
            )),
        }
    }

    fn end_method(&mut self) -> Result<(), String> {
        let method = self
            .method
            .take()
            .ok_or_else(|| String::from("'.end method' outside of a method"))?;
        let class = self.current_class()?.name.clone();
        let max_locals = match method.max_locals {
            Some(max_locals) => max_locals,
            None => inferred_max_locals(&method),
        };
        let body = MethodBody::new(
            class,
            method.name,
            method.descriptor,
            method.access_flags,
            method.max_stack.unwrap_or(DEFAULT_MAX_STACK),
            max_locals,
            method.instructions,
            method.handlers,
        )
        .map_err(|err| err.to_string())?;
        self.methods.push(body);
        Ok(())
    }

    fn finish(self) -> Result<Listing, Error> {
        if let Some(method) = self.method {
            return Err(Error::Parse {
                line: 0,
                message: format!("method {} is missing '.end method'", method.name),
            });
        }
        Ok(Listing {
            classes: self.classes,
            methods: self.methods,
        })
    }

    fn current_class(&mut self) -> Result<&mut ClassDeclaration, String> {
        self.classes
            .last_mut()
            .ok_or_else(|| String::from("no '.class' declared yet"))
    }

    fn pending_method(&mut self) -> Result<&mut PendingMethod, String> {
        self.method
            .as_mut()
            .ok_or_else(|| String::from("outside of a '.method'"))
    }
}

/// Smallest local count fitting the parameters and every slot accessed
fn inferred_max_locals(method: &PendingMethod) -> u16 {
    let has_this = !method.access_flags.contains(MethodAccessFlags::STATIC);
    let mut max_locals = method.descriptor.parameter_length(has_this);
    for insn in &method.instructions {
        let (idx, width) = match insn {
            Instruction::ILoad(idx)
            | Instruction::FLoad(idx)
            | Instruction::ALoad(idx)
            | Instruction::IStore(idx)
            | Instruction::FStore(idx)
            | Instruction::AStore(idx)
            | Instruction::IInc(idx, _)
            | Instruction::Ret(idx) => (*idx, 1),
            Instruction::LLoad(idx)
            | Instruction::DLoad(idx)
            | Instruction::LStore(idx)
            | Instruction::DStore(idx) => (*idx, 2),
            _ => continue,
        };
        max_locals = max_locals.max(idx as usize + width);
    }
    u16::try_from(max_locals).unwrap_or(u16::MAX)
}

/// Split a line into tokens, dropping comments
///
/// Comments start with a `;` at the beginning of a token, since descriptors contain semicolons.
fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = vec![];
    let mut chars = line.chars().peekable();
    let mut current = String::new();

    while let Some(c) = chars.next() {
        match c {
            ';' if current.is_empty() => break,
            '"' => {
                if !current.is_empty() {
                    return Err(format!("unexpected string literal after '{}'", current));
                }
                let mut string = String::new();
                loop {
                    match chars.next() {
                        None => return Err(String::from("unterminated string literal")),
                        Some('"') => break,
                        Some('\\') => string.push(unescape(&mut chars)?),
                        Some(c) => string.push(c),
                    }
                }
                tokens.push(Token::Str(string));
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut current)));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(Token::Word(current));
    }
    Ok(tokens)
}

fn unescape(chars: &mut impl Iterator<Item = char>) -> Result<char, String> {
    let escaped = match chars.next() {
        Some('n') => '\n',
        Some('t') => '\t',
        Some('r') => '\r',
        Some('0') => '\0',
        Some('"') => '"',
        Some('\'') => '\'',
        Some('\\') => '\\',
        Some('u') => {
            let hex: String = chars.take(4).collect();
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| format!("invalid unicode escape '\\u{}'", hex))?
        }
        Some(c) => return Err(format!("unknown escape '\\{}'", c)),
        None => return Err(String::from("unterminated escape")),
    };
    Ok(escaped)
}

fn word(token: &Token) -> Result<&str, String> {
    match token {
        Token::Word(word) => Ok(word),
        Token::Str(string) => Err(format!("unexpected string literal {:?}", string)),
    }
}

fn single<'t>(tokens: &'t [Token], what: &str) -> Result<&'t str, String> {
    match tokens {
        [token] => word(token),
        _ => Err(format!("'{}' expects exactly one operand", what)),
    }
}

fn binary_name(name: &str) -> Result<BinaryName, String> {
    BinaryName::from_string(name.to_owned())
}

fn unqualified_name(name: &str) -> Result<UnqualifiedName, String> {
    UnqualifiedName::from_string(name.to_owned())
}

fn field_type(descriptor: &str) -> Result<FieldType<BinaryName>, String> {
    FieldType::parse(descriptor).map_err(|err| format!("bad descriptor '{}': {}", descriptor, err))
}

fn method_descriptor(descriptor: &str) -> Result<MethodDescriptor<BinaryName>, String> {
    MethodDescriptor::parse(descriptor)
        .map_err(|err| format!("bad descriptor '{}': {}", descriptor, err))
}

/// Only `invokespecial` may call initializers
fn callable(method: MethodRef, mnemonic: &str) -> Result<MethodRef, String> {
    if method.name.is_initializer() {
        Err(format!("'{}' cannot call the initializer {}", mnemonic, method))
    } else {
        Ok(method)
    }
}

/// Class operand: a plain binary name, or a descriptor for array types
fn class_operand(operand: &str) -> Result<RefType<BinaryName>, String> {
    if operand.starts_with('[') {
        RefType::parse(operand).map_err(|err| format!("bad array type '{}': {}", operand, err))
    } else {
        binary_name(operand).map(RefType::Object)
    }
}

/// Split `owner/name` at the last slash
fn member(operand: &str) -> Result<(BinaryName, UnqualifiedName), String> {
    let slash = operand
        .rfind('/')
        .ok_or_else(|| format!("member '{}' is missing its class", operand))?;
    Ok((
        binary_name(&operand[..slash])?,
        unqualified_name(&operand[slash + 1..])?,
    ))
}

fn method_ref(operand: &str) -> Result<MethodRef, String> {
    let paren = operand
        .find('(')
        .ok_or_else(|| format!("method '{}' is missing a descriptor", operand))?;
    let (class, name) = member(&operand[..paren])?;
    Ok(MethodRef::new(class, name, method_descriptor(&operand[paren..])?))
}

fn number<T: std::str::FromStr>(operand: &str) -> Result<T, String> {
    operand
        .parse()
        .map_err(|_| format!("invalid number '{}'", operand))
}

fn label_operand(operand: &str) -> Label {
    Label(operand.to_owned())
}

/// Constant for `ldc` (`wide` is for `ldc2_w`, where integers are `long`s)
fn constant(token: &Token, wide: bool) -> Result<Constant, String> {
    let literal = match token {
        Token::Str(string) => return Ok(Constant::String(string.clone())),
        Token::Word(literal) => literal.as_str(),
    };
    if literal.starts_with('[') || (literal.starts_with('L') && literal.ends_with(';')) {
        return RefType::parse(literal)
            .map(Constant::Class)
            .map_err(|err| format!("bad class constant '{}': {}", literal, err));
    }
    if literal.starts_with('(') {
        return method_descriptor(literal).map(Constant::MethodType);
    }
    if let Some(long) = literal.strip_suffix(&['L', 'l'][..]) {
        return number(long).map(Constant::Long);
    }
    if let Some(float) = literal.strip_suffix(&['F', 'f'][..]) {
        return number(float).map(Constant::Float);
    }
    if let Some(double) = literal.strip_suffix(&['D', 'd'][..]) {
        return number(double).map(Constant::Double);
    }
    let is_floating = literal.contains(&['.', 'e', 'E'][..])
        || matches!(literal, "NaN" | "Infinity" | "-Infinity");
    match (is_floating, wide) {
        (false, false) => number(literal).map(Constant::Integer),
        (false, true) => number(literal).map(Constant::Long),
        (true, false) => number(literal).map(Constant::Float),
        (true, true) => number(literal).map(Constant::Double),
    }
}

/// Parse one instruction (the mnemonic has already been split off)
fn parse_instruction(mnemonic: &str, operands: &[Token]) -> Result<Instruction, String> {
    if let Some(insn) = Instruction::from_simple_mnemonic(mnemonic) {
        return if operands.is_empty() {
            Ok(insn)
        } else {
            Err(format!("'{}' takes no operands", mnemonic))
        };
    }

    // Short forms like `aload_0` or `istore_3`
    if let Some((base, slot)) = mnemonic.split_once('_') {
        if let (Some(local_insn), Ok(slot @ 0..=3)) = (local_instruction(base), slot.parse::<u16>())
        {
            if !operands.is_empty() {
                return Err(format!("'{}' takes no operands", mnemonic));
            }
            return Ok(local_insn(slot));
        }
    }
    if let Some(local_insn) = local_instruction(mnemonic) {
        return Ok(local_insn(number(single(operands, mnemonic)?)?));
    }

    let insn = match mnemonic {
        "bipush" => Instruction::BiPush(number(single(operands, mnemonic)?)?),
        "sipush" => Instruction::SiPush(number(single(operands, mnemonic)?)?),
        "ldc" | "ldc_w" | "ldc2_w" => match operands {
            [token] => Instruction::Ldc(constant(token, mnemonic == "ldc2_w")?),
            _ => return Err(format!("'{}' expects exactly one operand", mnemonic)),
        },
        "iinc" => match operands {
            [idx, by] => Instruction::IInc(number(word(idx)?)?, number(word(by)?)?),
            _ => return Err(String::from("'iinc' expects a local index and an increment")),
        },
        "ret" => Instruction::Ret(number(single(operands, mnemonic)?)?),
        "goto" | "goto_w" => Instruction::Goto(label_operand(single(operands, mnemonic)?)),
        "jsr" | "jsr_w" => Instruction::Jsr(label_operand(single(operands, mnemonic)?)),
        "tableswitch" => parse_table_switch(operands)?,
        "lookupswitch" => parse_lookup_switch(operands)?,
        "getstatic" | "putstatic" | "getfield" | "putfield" => {
            let field = match operands {
                [name, descriptor] => {
                    let (class, name) = member(word(name)?)?;
                    FieldRef {
                        class,
                        name,
                        descriptor: field_type(word(descriptor)?)?,
                    }
                }
                _ => {
                    return Err(format!(
                        "'{}' expects a field name and descriptor",
                        mnemonic
                    ))
                }
            };
            match mnemonic {
                "getstatic" => Instruction::GetStatic(field),
                "putstatic" => Instruction::PutStatic(field),
                "getfield" => Instruction::GetField(field),
                _ => Instruction::PutField(field),
            }
        }
        "invokevirtual" => Instruction::Invoke(
            InvokeType::Virtual,
            callable(method_ref(single(operands, mnemonic)?)?, mnemonic)?,
        ),
        "invokespecial" => Instruction::Invoke(
            InvokeType::Special,
            method_ref(single(operands, mnemonic)?)?,
        ),
        "invokestatic" => Instruction::Invoke(
            InvokeType::Static,
            callable(method_ref(single(operands, mnemonic)?)?, mnemonic)?,
        ),
        "invokeinterface" => {
            let (method, count) = match operands {
                [method] => {
                    let method = method_ref(word(method)?)?;
                    let count = method.descriptor.parameter_length(true);
                    (method, u8::try_from(count).map_err(|_| String::from("too many arguments"))?)
                }
                [method, count] => (method_ref(word(method)?)?, number(word(count)?)?),
                _ => return Err(String::from("'invokeinterface' expects a method")),
            };
            Instruction::Invoke(InvokeType::Interface(count), callable(method, mnemonic)?)
        }
        "invokedynamic" => {
            let (signature, bootstrap) = match operands.split_first() {
                Some((signature, bootstrap)) => (word(signature)?, bootstrap),
                None => return Err(String::from("'invokedynamic' expects a call site")),
            };
            let paren = signature
                .find('(')
                .ok_or_else(|| format!("call site '{}' is missing a descriptor", signature))?;
            let bootstrap = match bootstrap.split_first() {
                None => None,
                Some((method, arguments)) => {
                    let (class, name) = member(word(method)?)?;
                    let arguments = arguments
                        .iter()
                        .map(|argument| constant(argument, false))
                        .collect::<Result<_, _>>()?;
                    Some(BootstrapMethod {
                        class,
                        name,
                        arguments,
                    })
                }
            };
            Instruction::InvokeDynamic(InvokeDynamicRef {
                name: unqualified_name(&signature[..paren])?,
                descriptor: method_descriptor(&signature[paren..])?,
                bootstrap,
            })
        }
        "new" => Instruction::New(binary_name(single(operands, mnemonic)?)?),
        "newarray" => {
            let keyword = single(operands, mnemonic)?;
            let base_type = (4..=11)
                .filter_map(BaseType::from_array_type_code)
                .find(|base_type| base_type.keyword() == keyword)
                .ok_or_else(|| format!("unknown primitive type '{}'", keyword))?;
            Instruction::NewArray(base_type)
        }
        "anewarray" => Instruction::ANewArray(class_operand(single(operands, mnemonic)?)?),
        "checkcast" => Instruction::CheckCast(class_operand(single(operands, mnemonic)?)?),
        "instanceof" => Instruction::InstanceOf(class_operand(single(operands, mnemonic)?)?),
        "multianewarray" => match operands {
            [array_type, dimensions] => {
                let array_type = class_operand(word(array_type)?)?;
                let dimensions: u8 = number(word(dimensions)?)?;
                if dimensions == 0 || dimensions as usize > array_type.dimensions() {
                    return Err(format!(
                        "cannot allocate {} dimensions of {}",
                        dimensions,
                        word(&operands[0])?
                    ));
                }
                Instruction::MultiANewArray(array_type, dimensions)
            }
            _ => {
                return Err(String::from(
                    "'multianewarray' expects an array type and dimensions",
                ))
            }
        },
        _ => {
            let target = single(operands, mnemonic)
                .map_err(|_| format!("unknown instruction '{}'", mnemonic))?;
            Instruction::conditional_branch(mnemonic, label_operand(target))
                .ok_or_else(|| format!("unknown instruction '{}'", mnemonic))?
        }
    };
    Ok(insn)
}

/// Constructor for load/store instructions taking a local index
fn local_instruction(mnemonic: &str) -> Option<fn(u16) -> Instruction> {
    let constructor: fn(u16) -> Instruction = match mnemonic {
        "iload" => Instruction::ILoad,
        "lload" => Instruction::LLoad,
        "fload" => Instruction::FLoad,
        "dload" => Instruction::DLoad,
        "aload" => Instruction::ALoad,
        "istore" => Instruction::IStore,
        "lstore" => Instruction::LStore,
        "fstore" => Instruction::FStore,
        "dstore" => Instruction::DStore,
        "astore" => Instruction::AStore,
        _ => return None,
    };
    Some(constructor)
}

fn default_target(operand: &str) -> Option<Label> {
    operand.strip_prefix("default:").map(label_operand)
}

fn parse_table_switch(operands: &[Token]) -> Result<Instruction, String> {
    let (low, rest) = operands
        .split_first()
        .ok_or_else(|| String::from("'tableswitch' expects a low value"))?;
    let low: i32 = number(word(low)?)?;
    let mut targets = vec![];
    let mut default = None;
    for operand in rest {
        let operand = word(operand)?;
        match default_target(operand) {
            Some(label) => default = Some(label),
            None => targets.push(label_operand(operand)),
        }
    }
    let default = default.ok_or_else(|| String::from("'tableswitch' needs a 'default:' target"))?;
    Ok(Instruction::TableSwitch {
        default,
        low,
        targets,
    })
}

fn parse_lookup_switch(operands: &[Token]) -> Result<Instruction, String> {
    let mut targets = vec![];
    let mut default = None;
    for operand in operands {
        let operand = word(operand)?;
        if let Some(label) = default_target(operand) {
            default = Some(label);
            continue;
        }
        let (key, label) = operand
            .split_once(':')
            .ok_or_else(|| format!("expected 'key:label', not '{}'", operand))?;
        targets.push((number(key)?, label_operand(label)));
    }
    targets.sort_by_key(|(key, _)| *key);
    let default =
        default.ok_or_else(|| String::from("'lookupswitch' needs a 'default:' target"))?;
    Ok(Instruction::LookupSwitch { default, targets })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{EqComparison, OrdComparison};

    fn label(name: &str) -> Label {
        Label(String::from(name))
    }

    #[test]
    fn tokens() {
        assert_eq!(
            tokenize(r#"  ldc "a; \"b\"\n" ; comment"#).unwrap(),
            vec![
                Token::Word(String::from("ldc")),
                Token::Str(String::from("a; \"b\"\n"))
            ]
        );
        assert!(tokenize(r#"ldc "open"#).is_err());
        assert!(tokenize("; only a comment").unwrap().is_empty());
        assert_eq!(
            tokenize("getstatic Foo/bar Ljava/lang/String; ; comment").unwrap(),
            vec![
                Token::Word(String::from("getstatic")),
                Token::Word(String::from("Foo/bar")),
                Token::Word(String::from("Ljava/lang/String;")),
            ],
            "semicolons inside descriptors"
        );
    }

    #[test]
    fn constants() {
        let word = |w: &str| Token::Word(String::from(w));
        assert_eq!(constant(&word("12"), false).unwrap(), Constant::Integer(12));
        assert_eq!(constant(&word("12"), true).unwrap(), Constant::Long(12));
        assert_eq!(constant(&word("12L"), false).unwrap(), Constant::Long(12));
        assert_eq!(constant(&word("1.5"), false).unwrap(), Constant::Float(1.5));
        assert_eq!(constant(&word("1.5"), true).unwrap(), Constant::Double(1.5));
        assert_eq!(constant(&word("2.5f"), true).unwrap(), Constant::Float(2.5));
        assert_eq!(
            constant(&word("Ljava/lang/String;"), false).unwrap(),
            Constant::Class(RefType::Object(BinaryName::STRING))
        );
        assert!(constant(&word("twelve"), false).is_err());
    }

    #[test]
    fn instructions() {
        let parse = |line: &str| {
            let tokens = tokenize(line).unwrap();
            let (head, rest) = tokens.split_first().unwrap();
            parse_instruction(word(head).unwrap(), rest)
        };

        assert_eq!(parse("aload_0").unwrap(), Instruction::ALoad(0));
        assert_eq!(parse("istore 5").unwrap(), Instruction::IStore(5));
        assert_eq!(parse("iinc 1 -1").unwrap(), Instruction::IInc(1, -1));
        assert_eq!(
            parse("ifnull Skip").unwrap(),
            Instruction::IfNull(EqComparison::EQ, label("Skip"))
        );
        assert_eq!(
            parse("if_icmplt Loop").unwrap(),
            Instruction::IfICmp(OrdComparison::LT, label("Loop"))
        );
        assert_eq!(
            parse("tableswitch 1 A B default:C").unwrap(),
            Instruction::TableSwitch {
                default: label("C"),
                low: 1,
                targets: vec![label("A"), label("B")],
            }
        );
        assert_eq!(
            parse("lookupswitch 10:B 1:A default:C").unwrap(),
            Instruction::LookupSwitch {
                default: label("C"),
                targets: vec![(1, label("A")), (10, label("B"))],
            }
        );
        assert_eq!(
            parse("newarray char").unwrap(),
            Instruction::NewArray(BaseType::Char)
        );
        assert_eq!(
            parse("invokeinterface java/util/List/size()I").unwrap(),
            Instruction::Invoke(
                InvokeType::Interface(1),
                method_ref("java/util/List/size()I").unwrap()
            )
        );
        assert_eq!(
            parse(r#"invokedynamic run(I)Ljava/lang/String; Boot/link "\u0001!" 2"#).unwrap(),
            Instruction::InvokeDynamic(InvokeDynamicRef {
                name: UnqualifiedName::from_string(String::from("run")).unwrap(),
                descriptor: MethodDescriptor::parse("(I)Ljava/lang/String;").unwrap(),
                bootstrap: Some(BootstrapMethod {
                    class: BinaryName::from_string(String::from("Boot")).unwrap(),
                    name: UnqualifiedName::from_string(String::from("link")).unwrap(),
                    arguments: vec![
                        Constant::String(String::from("\u{1}!")),
                        Constant::Integer(2)
                    ],
                }),
            })
        );
        assert!(matches!(
            parse("invokedynamic run()V").unwrap(),
            Instruction::InvokeDynamic(InvokeDynamicRef { bootstrap: None, .. })
        ));
        assert!(parse("invokespecial java/lang/Object/<init>()V").is_ok());
        assert!(parse("invokevirtual java/lang/Object/<init>()V").is_err());
        assert!(parse("invokestatic Foo/<clinit>()V").is_err());
        assert!(parse("multianewarray [[I 3").is_err());
        assert!(parse("iadd 1").is_err());
        assert!(parse("frobnicate").is_err());
    }

    #[test]
    fn full_listing() {
        let listing = Listing::parse(
            r#"
            .class public Demo
            .super java/lang/Object
            .implements java/lang/Runnable

            .method public run()V
                .catch java/lang/Exception from Start to End using Handler
            Start:
                aload_0
                pop
            End: return
            Handler:
                astore_1
                return
            .end method
            "#,
        )
        .unwrap();

        let class = &listing.classes[0];
        assert_eq!(class.name.as_str(), "Demo");
        assert!(class.access_flags.contains(ClassAccessFlags::PUBLIC));
        assert_eq!(class.interfaces.len(), 1);

        let method = listing.method("run").unwrap();
        assert_eq!(method.max_locals, 2, "inferred from `astore_1`");
        assert_eq!(method.max_stack, DEFAULT_MAX_STACK);
        assert_eq!(method.instructions.len(), 8);
        assert_eq!(method.try_catch_blocks()[0].catch_type, Some(BinaryName::EXCEPTION));
    }

    #[test]
    fn listing_errors() {
        let source = ".class A\n.method static f()V\n  bogus\n.end method";
        let err = Listing::parse(source).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 3, .. }), "{:?}", err);

        let err = Listing::parse(".method static f()V\nreturn\n.end method").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }), "{:?}", err);

        assert!(Listing::parse(".class A\n.method static f()V\nreturn").is_err());
        assert!(Listing::parse(".class A\n.method static f()V\ngoto X\n.end method").is_err());
    }
}
