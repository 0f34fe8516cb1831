use crate::jvm::code::{Constant, InvokeDynamicRef, MethodRef};
use crate::jvm::{BaseType, BinaryName, FieldType, MethodDescriptor, Name};
use std::collections::{HashMap, HashSet};

/// Longest string (in UTF-16 code units) a simulated call may produce
///
/// Calls whose result would be longer are not simulated.
pub const MAX_SIMULATED_LENGTH: usize = 1 << 16;

/// Concrete value, as the running program would hold it
///
/// Simulated objects are only ever strings and string builders. Primitives show up as arguments
/// and results of simulated calls.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),

    /// Contents of a `StringBuilder` or `StringBuffer`
    StringBuilder(String),

    Null,

    /// Result of a `void` method
    Void,
}

impl HostValue {
    /// Textual contents of a string or string builder
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(string) | HostValue::StringBuilder(string) => Some(string),
            _ => None,
        }
    }

    fn is_within_length_limit(&self) -> bool {
        self.as_str()
            .map_or(true, |string| string.encode_utf16().count() <= MAX_SIMULATED_LENGTH)
    }

    /// Render the value the way `String.valueOf` would for the declared type
    fn to_java_string(&self, typ: &FieldType<BinaryName>) -> Option<String> {
        match (self, typ) {
            (HostValue::Int(c), FieldType::Base(BaseType::Char)) => from_utf16(&[*c as u16]),
            (HostValue::Int(b), FieldType::Base(BaseType::Boolean)) => Some((*b != 0).to_string()),
            (HostValue::Int(i), _) => Some(i.to_string()),
            (HostValue::Long(l), _) => Some(l.to_string()),
            (HostValue::Float(f), _) => Some(java_float_string(*f)),
            (HostValue::Double(d), _) => Some(java_double_string(*d)),
            (HostValue::String(s), _) | (HostValue::StringBuilder(s), _) => Some(s.clone()),
            (HostValue::Null, _) => Some(String::from("null")),
            (HostValue::Void, _) => None,
        }
    }
}

/// Outcome of simulating a call on a receiver
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedCall {
    /// State of the receiver after the call
    pub receiver: HostValue,

    pub returned: Returned,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Returned {
    /// The call returns its receiver (eg. `StringBuilder.append`)
    Receiver,

    /// The call returns a new value (`HostValue::Void` for `void` methods)
    Value(HostValue),
}

/// Kinds of objects whose state can be simulated
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SimulatedKind {
    String,
    StringBuilder,
}

/// Lookup table of the classes and methods which can be simulated
///
/// Building the table is cheap but not free, so it is constructed once per analyzer and handed
/// to the interpreter.
pub struct SimulationTable {
    /// Classes whose instances have a simulated host representation
    instances: HashMap<BinaryName, SimulatedKind>,

    /// Classes whose static methods may be simulated
    statics: HashSet<BinaryName>,

    /// Methods which are treated as identity on their receiver (name and descriptor)
    denied: HashSet<(&'static str, &'static str)>,
}

impl Default for SimulationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationTable {
    pub fn new() -> SimulationTable {
        let instances = HashMap::from([
            (BinaryName::STRING, SimulatedKind::String),
            (BinaryName::STRINGBUILDER, SimulatedKind::StringBuilder),
            (BinaryName::STRINGBUFFER, SimulatedKind::StringBuilder),
        ]);
        let statics = HashSet::from([
            BinaryName::INTEGER,
            BinaryName::LONG,
            BinaryName::SHORT,
            BinaryName::BYTE,
            BinaryName::CHARACTER,
            BinaryName::BOOLEAN,
            BinaryName::FLOAT,
            BinaryName::DOUBLE,
            BinaryName::MATH,
            BinaryName::STRING,
        ]);
        let denied = HashSet::from([
            ("wait", "()V"),
            ("wait", "(J)V"),
            ("wait", "(JI)V"),
            ("notify", "()V"),
            ("notifyAll", "()V"),
            ("intern", "()Ljava/lang/String;"),
        ]);
        SimulationTable {
            instances,
            statics,
            denied,
        }
    }

    /// Can instances of this type be simulated?
    pub fn is_simulated(&self, class: &BinaryName) -> bool {
        self.instances.contains_key(class)
    }

    /// Can static methods of this class be simulated?
    pub fn has_static_methods(&self, class: &BinaryName) -> bool {
        self.statics.contains(class)
    }

    /// Is this a no-op or blocking method which should leave its receiver untouched?
    pub fn is_denied(&self, method: &MethodRef) -> bool {
        let descriptor = method.descriptor.to_string();
        self.denied
            .iter()
            .any(|(name, desc)| method.name.as_str() == *name && descriptor == *desc)
    }

    /// State of a freshly allocated (`new`) object, before its constructor runs
    pub fn new_instance(&self, class: &BinaryName) -> Option<HostValue> {
        match self.instances.get(class)? {
            SimulatedKind::String => Some(HostValue::String(String::new())),
            SimulatedKind::StringBuilder => Some(HostValue::StringBuilder(String::new())),
        }
    }

    /// State of an object after running the constructor `<init>` with the given arguments
    pub fn construct(
        &self,
        class: &BinaryName,
        descriptor: &MethodDescriptor<BinaryName>,
        args: &[HostValue],
    ) -> Option<HostValue> {
        let kind = *self.instances.get(class)?;
        let initial = match (descriptor.to_string().as_str(), args) {
            ("()V", []) => String::new(),
            ("(I)V", [HostValue::Int(capacity)]) if kind == SimulatedKind::StringBuilder => {
                if *capacity < 0 {
                    return None;
                }
                String::new()
            }
            ("(Ljava/lang/String;)V", [arg])
            | ("(Ljava/lang/CharSequence;)V", [arg])
            | ("(Ljava/lang/StringBuilder;)V", [arg])
            | ("(Ljava/lang/StringBuffer;)V", [arg]) => arg.as_str()?.to_owned(),
            _ => return None,
        };
        Some(match kind {
            SimulatedKind::String => HostValue::String(initial),
            SimulatedKind::StringBuilder => HostValue::StringBuilder(initial),
        })
    }

    /// Run a virtual method on a simulated receiver
    ///
    /// Returns `None` whenever the method is not supported or would throw.
    pub fn invoke_virtual(
        &self,
        method: &MethodRef,
        receiver: &HostValue,
        args: &[HostValue],
    ) -> Option<SimulatedCall> {
        if self.is_denied(method) {
            return Some(SimulatedCall {
                receiver: receiver.clone(),
                returned: Returned::Receiver,
            });
        }
        let call = match receiver {
            HostValue::String(string) => SimulatedCall {
                receiver: receiver.clone(),
                returned: Returned::Value(string_method(string, method, args)?),
            },
            HostValue::StringBuilder(contents) => builder_method(contents, method, args)?,
            _ => return None,
        };
        let returned_fits = match &call.returned {
            Returned::Receiver => true,
            Returned::Value(value) => value.is_within_length_limit(),
        };
        if call.receiver.is_within_length_limit() && returned_fits {
            Some(call)
        } else {
            log::debug!("{} would grow a string past {} characters", method, MAX_SIMULATED_LENGTH);
            None
        }
    }

    /// Run a call site linked by `StringConcatFactory`
    ///
    /// In a `makeConcatWithConstants` recipe, `\u{1}` stands for the next argument and `\u{2}`
    /// for the next extra constant of the bootstrap method. `makeConcat` just concatenates its
    /// arguments.
    pub fn invoke_dynamic(
        &self,
        call_site: &InvokeDynamicRef,
        args: &[HostValue],
    ) -> Option<HostValue> {
        let bootstrap = call_site.bootstrap.as_ref()?;
        let parameters = &call_site.descriptor.parameters;
        let mut args = args.iter().zip(parameters);
        let mut next_arg = || {
            let (arg, parameter) = args.next()?;
            arg.to_java_string(parameter)
        };

        let mut concatenated = String::new();
        if bootstrap.is(&BinaryName::STRINGCONCATFACTORY, "makeConcat") {
            for _ in 0..parameters.len() {
                concatenated.push_str(&next_arg()?);
            }
        } else if bootstrap.is(&BinaryName::STRINGCONCATFACTORY, "makeConcatWithConstants") {
            let (recipe, constants) = match bootstrap.arguments.split_first()? {
                (Constant::String(recipe), constants) => (recipe, constants),
                _ => return None,
            };
            let mut constants = constants.iter();
            for c in recipe.chars() {
                match c {
                    '\u{1}' => concatenated.push_str(&next_arg()?),
                    '\u{2}' => match constants.next()? {
                        Constant::String(string) => concatenated.push_str(string),
                        Constant::Integer(i) => concatenated.push_str(&i.to_string()),
                        Constant::Long(l) => concatenated.push_str(&l.to_string()),
                        Constant::Float(f) => concatenated.push_str(&java_float_string(*f)),
                        Constant::Double(d) => concatenated.push_str(&java_double_string(*d)),
                        _ => return None,
                    },
                    c => concatenated.push(c),
                }
            }
        } else {
            return None;
        }

        let concatenated = HostValue::String(concatenated);
        if concatenated.is_within_length_limit() {
            Some(concatenated)
        } else {
            None
        }
    }

    /// Run an allow-listed static method
    pub fn invoke_static(&self, method: &MethodRef, args: &[HostValue]) -> Option<HostValue> {
        if !self.statics.contains(&method.class) {
            return None;
        }
        let descriptor = method.descriptor.to_string();
        let name = method.name.as_str();
        match method.class.as_str() {
            "java/lang/Integer" => integer_static(name, &descriptor, args),
            "java/lang/Long" => long_static(name, &descriptor, args),
            "java/lang/Short" => match (name, descriptor.as_str(), args) {
                ("parseShort", "(Ljava/lang/String;)S", [HostValue::String(s)]) => {
                    s.parse::<i16>().ok().map(|s| HostValue::Int(s as i32))
                }
                ("toString", "(S)Ljava/lang/String;", [HostValue::Int(s)]) => {
                    Some(HostValue::String(s.to_string()))
                }
                _ => None,
            },
            "java/lang/Byte" => match (name, descriptor.as_str(), args) {
                ("parseByte", "(Ljava/lang/String;)B", [HostValue::String(s)]) => {
                    s.parse::<i8>().ok().map(|b| HostValue::Int(b as i32))
                }
                ("toString", "(B)Ljava/lang/String;", [HostValue::Int(b)]) => {
                    Some(HostValue::String(b.to_string()))
                }
                _ => None,
            },
            "java/lang/Character" => character_static(name, &descriptor, args),
            "java/lang/Boolean" => match (name, descriptor.as_str(), args) {
                ("parseBoolean", "(Ljava/lang/String;)Z", [HostValue::String(s)]) => {
                    Some(HostValue::Int(s.eq_ignore_ascii_case("true") as i32))
                }
                ("toString", "(Z)Ljava/lang/String;", [HostValue::Int(b)]) => {
                    Some(HostValue::String((*b != 0).to_string()))
                }
                _ => None,
            },
            "java/lang/Float" => match (name, descriptor.as_str(), args) {
                ("parseFloat", "(Ljava/lang/String;)F", [HostValue::String(s)]) => {
                    s.trim().parse::<f32>().ok().map(HostValue::Float)
                }
                ("floatToIntBits", "(F)I", [HostValue::Float(f)]) => {
                    let bits = if f.is_nan() { 0x7fc00000 } else { f.to_bits() };
                    Some(HostValue::Int(bits as i32))
                }
                ("floatToRawIntBits", "(F)I", [HostValue::Float(f)]) => {
                    Some(HostValue::Int(f.to_bits() as i32))
                }
                ("intBitsToFloat", "(I)F", [HostValue::Int(i)]) => {
                    Some(HostValue::Float(f32::from_bits(*i as u32)))
                }
                ("toString", "(F)Ljava/lang/String;", [HostValue::Float(f)]) => {
                    Some(HostValue::String(java_float_string(*f)))
                }
                _ => None,
            },
            "java/lang/Double" => match (name, descriptor.as_str(), args) {
                ("parseDouble", "(Ljava/lang/String;)D", [HostValue::String(s)]) => {
                    s.trim().parse::<f64>().ok().map(HostValue::Double)
                }
                ("doubleToLongBits", "(D)J", [HostValue::Double(d)]) => {
                    let bits = if d.is_nan() {
                        0x7ff8000000000000
                    } else {
                        d.to_bits()
                    };
                    Some(HostValue::Long(bits as i64))
                }
                ("doubleToRawLongBits", "(D)J", [HostValue::Double(d)]) => {
                    Some(HostValue::Long(d.to_bits() as i64))
                }
                ("longBitsToDouble", "(J)D", [HostValue::Long(l)]) => {
                    Some(HostValue::Double(f64::from_bits(*l as u64)))
                }
                ("toString", "(D)Ljava/lang/String;", [HostValue::Double(d)]) => {
                    Some(HostValue::String(java_double_string(*d)))
                }
                _ => None,
            },
            "java/lang/Math" => math_static(name, &descriptor, args),
            "java/lang/String" => {
                if name != "valueOf" {
                    return None;
                }
                let parameter = method.descriptor.parameters.first()?;
                match args {
                    [HostValue::Int(_)
                    | HostValue::Long(_)
                    | HostValue::Float(_)
                    | HostValue::Double(_)]
                        if parameter.is_reference() =>
                    {
                        None
                    }
                    [arg] => arg.to_java_string(parameter).map(HostValue::String),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn integer_static(name: &str, descriptor: &str, args: &[HostValue]) -> Option<HostValue> {
    use HostValue::*;
    let value = match (name, descriptor, args) {
        ("parseInt", "(Ljava/lang/String;)I", [String(s)]) => Int(s.parse().ok()?),
        ("parseInt", "(Ljava/lang/String;I)I", [String(s), Int(radix)]) => {
            Int(i32::from_str_radix(s, radix_of(*radix)?).ok()?)
        }
        ("toString", "(I)Ljava/lang/String;", [Int(i)]) => String(i.to_string()),
        ("toHexString", "(I)Ljava/lang/String;", [Int(i)]) => String(format!("{:x}", i)),
        ("toOctalString", "(I)Ljava/lang/String;", [Int(i)]) => String(format!("{:o}", i)),
        ("toBinaryString", "(I)Ljava/lang/String;", [Int(i)]) => String(format!("{:b}", i)),
        ("reverse", "(I)I", [Int(i)]) => Int(i.reverse_bits()),
        ("reverseBytes", "(I)I", [Int(i)]) => Int(i.swap_bytes()),
        ("bitCount", "(I)I", [Int(i)]) => Int(i.count_ones() as i32),
        ("rotateLeft", "(II)I", [Int(i), Int(d)]) => Int(i.rotate_left(*d as u32 & 31)),
        ("rotateRight", "(II)I", [Int(i), Int(d)]) => Int(i.rotate_right(*d as u32 & 31)),
        ("numberOfLeadingZeros", "(I)I", [Int(i)]) => Int(i.leading_zeros() as i32),
        ("numberOfTrailingZeros", "(I)I", [Int(i)]) => Int(i.trailing_zeros() as i32),
        ("highestOneBit", "(I)I", [Int(i)]) => {
            Int(if *i == 0 { 0 } else { (1u32 << (31 - i.leading_zeros())) as i32 })
        }
        ("signum", "(I)I", [Int(i)]) => Int(i.signum()),
        ("compare", "(II)I", [Int(a), Int(b)]) => Int(a.cmp(b) as i32),
        ("max", "(II)I", [Int(a), Int(b)]) => Int(*a.max(b)),
        ("min", "(II)I", [Int(a), Int(b)]) => Int(*a.min(b)),
        ("sum", "(II)I", [Int(a), Int(b)]) => Int(a.wrapping_add(*b)),
        _ => return None,
    };
    Some(value)
}

fn long_static(name: &str, descriptor: &str, args: &[HostValue]) -> Option<HostValue> {
    use HostValue::*;
    let value = match (name, descriptor, args) {
        ("parseLong", "(Ljava/lang/String;)J", [String(s)]) => Long(s.parse().ok()?),
        ("toString", "(J)Ljava/lang/String;", [Long(l)]) => String(l.to_string()),
        ("toHexString", "(J)Ljava/lang/String;", [Long(l)]) => String(format!("{:x}", l)),
        ("toBinaryString", "(J)Ljava/lang/String;", [Long(l)]) => String(format!("{:b}", l)),
        ("bitCount", "(J)I", [Long(l)]) => Int(l.count_ones() as i32),
        ("reverse", "(J)J", [Long(l)]) => Long(l.reverse_bits()),
        ("rotateLeft", "(JI)J", [Long(l), Int(d)]) => Long(l.rotate_left(*d as u32 & 63)),
        ("rotateRight", "(JI)J", [Long(l), Int(d)]) => Long(l.rotate_right(*d as u32 & 63)),
        ("signum", "(J)I", [Long(l)]) => Int(l.signum() as i32),
        ("compare", "(JJ)I", [Long(a), Long(b)]) => Int(a.cmp(b) as i32),
        ("max", "(JJ)J", [Long(a), Long(b)]) => Long(*a.max(b)),
        ("min", "(JJ)J", [Long(a), Long(b)]) => Long(*a.min(b)),
        ("sum", "(JJ)J", [Long(a), Long(b)]) => Long(a.wrapping_add(*b)),
        _ => return None,
    };
    Some(value)
}

fn character_static(name: &str, descriptor: &str, args: &[HostValue]) -> Option<HostValue> {
    let unit = match args {
        [HostValue::Int(code)] => *code as u16,
        _ => return None,
    };
    let c = char::from_u32(unit as u32);
    let test = |predicate: fn(char) -> bool| HostValue::Int(c.map_or(false, predicate) as i32);
    let value = match (name, descriptor) {
        ("isDigit", "(C)Z") => test(|c| c.is_ascii_digit()),
        ("isLetter", "(C)Z") => test(char::is_alphabetic),
        ("isLetterOrDigit", "(C)Z") => test(char::is_alphanumeric),
        ("isUpperCase", "(C)Z") => test(char::is_uppercase),
        ("isLowerCase", "(C)Z") => test(char::is_lowercase),
        ("isWhitespace", "(C)Z") => test(char::is_whitespace),
        ("toUpperCase", "(C)C") => HostValue::Int(map_single(c, unit, char::to_uppercase)),
        ("toLowerCase", "(C)C") => HostValue::Int(map_single(c, unit, char::to_lowercase)),
        ("toString", "(C)Ljava/lang/String;") => HostValue::String(from_utf16(&[unit])?),
        _ => return None,
    };
    Some(value)
}

/// Case mapping of one UTF-16 unit, leaving it alone unless it maps onto exactly one unit
fn map_single<I: Iterator<Item = char>>(c: Option<char>, unit: u16, map: fn(char) -> I) -> i32 {
    let mapped: Vec<char> = match c {
        Some(c) => map(c).collect(),
        None => return unit as i32,
    };
    match mapped.as_slice() {
        [single] if (*single as u32) <= 0xFFFF => *single as i32,
        _ => unit as i32,
    }
}

fn math_static(name: &str, descriptor: &str, args: &[HostValue]) -> Option<HostValue> {
    use HostValue::*;
    let value = match (name, descriptor, args) {
        ("abs", "(I)I", [Int(i)]) => Int(i.wrapping_abs()),
        ("abs", "(J)J", [Long(l)]) => Long(l.wrapping_abs()),
        ("abs", "(F)F", [Float(f)]) => Float(f.abs()),
        ("abs", "(D)D", [Double(d)]) => Double(d.abs()),
        ("max", "(II)I", [Int(a), Int(b)]) => Int(*a.max(b)),
        ("max", "(JJ)J", [Long(a), Long(b)]) => Long(*a.max(b)),
        ("min", "(II)I", [Int(a), Int(b)]) => Int(*a.min(b)),
        ("min", "(JJ)J", [Long(a), Long(b)]) => Long(*a.min(b)),
        ("max", "(DD)D", [Double(a), Double(b)]) => Double(java_max(*a, *b)),
        ("min", "(DD)D", [Double(a), Double(b)]) => Double(-java_max(-*a, -*b)),
        ("floorDiv", "(II)I", [Int(a), Int(b)]) if *b != 0 => {
            let q = a.wrapping_div(*b);
            Int(if a.wrapping_rem(*b) != 0 && ((*a < 0) != (*b < 0)) { q - 1 } else { q })
        }
        ("floorMod", "(II)I", [Int(a), Int(b)]) if *b != 0 => {
            let r = a.wrapping_rem(*b);
            Int(if r != 0 && ((r < 0) != (*b < 0)) { r + b } else { r })
        }
        ("sqrt", "(D)D", [Double(d)]) => Double(d.sqrt()),
        ("cbrt", "(D)D", [Double(d)]) => Double(d.cbrt()),
        ("pow", "(DD)D", [Double(a), Double(b)]) => Double(a.powf(*b)),
        ("floor", "(D)D", [Double(d)]) => Double(d.floor()),
        ("ceil", "(D)D", [Double(d)]) => Double(d.ceil()),
        _ => return None,
    };
    Some(value)
}

fn java_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b && a == 0.0 {
        // `max(-0.0, 0.0)` is `0.0`
        if a.is_sign_negative() {
            b
        } else {
            a
        }
    } else {
        a.max(b)
    }
}

fn radix_of(radix: i32) -> Option<u32> {
    if (2..=36).contains(&radix) {
        Some(radix as u32)
    } else {
        None
    }
}

fn string_method(string: &str, method: &MethodRef, args: &[HostValue]) -> Option<HostValue> {
    use HostValue::*;
    let descriptor = method.descriptor.to_string();
    let units: Vec<u16> = string.encode_utf16().collect();
    let value = match (method.name.as_str(), descriptor.as_str(), args) {
        ("length", "()I", []) => Int(units.len() as i32),
        ("isEmpty", "()Z", []) => Int(units.is_empty() as i32),
        ("charAt", "(I)C", [Int(index)]) => Int(*units.get(index_of(*index)?)? as i32),
        ("substring", "(I)Ljava/lang/String;", [Int(start)]) => {
            String(from_utf16(units.get(index_of(*start)?..)?)?)
        }
        ("substring", "(II)Ljava/lang/String;", [Int(start), Int(end)]) => {
            String(from_utf16(units.get(index_of(*start)?..index_of(*end)?)?)?)
        }
        ("concat", "(Ljava/lang/String;)Ljava/lang/String;", [String(other)]) => {
            String(format!("{}{}", string, other))
        }
        ("indexOf", "(Ljava/lang/String;)I", [String(needle)]) => {
            Int(utf16_index_of(&units, &needle.encode_utf16().collect::<Vec<_>>()))
        }
        ("indexOf", "(I)I", [Int(c)]) => {
            Int(units.iter().position(|u| *u as i32 == *c).map_or(-1, |i| i as i32))
        }
        ("lastIndexOf", "(I)I", [Int(c)]) => {
            Int(units.iter().rposition(|u| *u as i32 == *c).map_or(-1, |i| i as i32))
        }
        ("contains", "(Ljava/lang/CharSequence;)Z", [other]) => {
            Int(string.contains(other.as_str()?) as i32)
        }
        ("equals", "(Ljava/lang/Object;)Z", [other]) => Int(match other {
            String(other) => string == other.as_str(),
            Null | StringBuilder(_) => false,
            _ => return None,
        } as i32),
        ("equalsIgnoreCase", "(Ljava/lang/String;)Z", [other]) => Int(match other {
            String(other) => string.to_lowercase() == other.to_lowercase(),
            Null => false,
            _ => return None,
        } as i32),
        ("toUpperCase", "()Ljava/lang/String;", []) => String(string.to_uppercase()),
        ("toLowerCase", "()Ljava/lang/String;", []) => String(string.to_lowercase()),
        ("trim", "()Ljava/lang/String;", []) => {
            String(string.trim_matches(|c: char| c <= ' ').to_owned())
        }
        ("replace", "(CC)Ljava/lang/String;", [Int(from), Int(to)]) => {
            let replaced: Vec<u16> = units
                .iter()
                .map(|u| if *u == *from as u16 { *to as u16 } else { *u })
                .collect();
            String(from_utf16(&replaced)?)
        }
        (
            "replace",
            "(Ljava/lang/CharSequence;Ljava/lang/CharSequence;)Ljava/lang/String;",
            [from, to],
        ) => String(java_replace(string, from.as_str()?, to.as_str()?)),
        ("startsWith", "(Ljava/lang/String;)Z", [String(prefix)]) => {
            Int(string.starts_with(prefix.as_str()) as i32)
        }
        ("endsWith", "(Ljava/lang/String;)Z", [String(suffix)]) => {
            Int(string.ends_with(suffix.as_str()) as i32)
        }
        ("hashCode", "()I", []) => Int(units
            .iter()
            .fold(0i32, |hash, u| hash.wrapping_mul(31).wrapping_add(*u as i32))),
        ("compareTo", "(Ljava/lang/String;)I", [String(other)]) => {
            let other: Vec<u16> = other.encode_utf16().collect();
            Int(utf16_compare(&units, &other))
        }
        ("toString", "()Ljava/lang/String;", []) => String(string.to_owned()),
        _ => return None,
    };
    Some(value)
}

fn builder_method(contents: &str, method: &MethodRef, args: &[HostValue]) -> Option<SimulatedCall> {
    let descriptor = &method.descriptor;
    let returns_builder = descriptor.return_type == Some(FieldType::object(method.class.clone()));
    let mut units: Vec<u16> = contents.encode_utf16().collect();

    let returned = match (method.name.as_str(), args) {
        ("append", [arg]) if returns_builder => {
            let parameter = descriptor.parameters.first()?;
            if parameter == &FieldType::array(FieldType::char()) {
                return None;
            }
            units.extend(arg.to_java_string(parameter)?.encode_utf16());
            Returned::Receiver
        }
        ("insert", [HostValue::Int(offset), arg]) if returns_builder => {
            let parameter = descriptor.parameters.get(1)?;
            let offset = index_of(*offset).filter(|offset| *offset <= units.len())?;
            let inserted: Vec<u16> = arg.to_java_string(parameter)?.encode_utf16().collect();
            units.splice(offset..offset, inserted);
            Returned::Receiver
        }
        ("reverse", []) if returns_builder => {
            // Surrogate pairs stay in order, as with the real thing
            let reversed: String = from_utf16(&units)?.chars().rev().collect();
            units = reversed.encode_utf16().collect();
            Returned::Receiver
        }
        ("deleteCharAt", [HostValue::Int(index)]) if returns_builder => {
            let index = index_of(*index).filter(|index| *index < units.len())?;
            units.remove(index);
            Returned::Receiver
        }
        ("delete", [HostValue::Int(start), HostValue::Int(end)]) if returns_builder => {
            let start = index_of(*start)?;
            let end = index_of(*end)?.min(units.len());
            if start > end {
                return None;
            }
            units.drain(start..end);
            Returned::Receiver
        }
        ("setLength", [HostValue::Int(length)]) if descriptor.return_type.is_none() => {
            let length = index_of(*length).filter(|length| *length <= MAX_SIMULATED_LENGTH)?;
            units.resize(length, 0);
            Returned::Value(HostValue::Void)
        }
        ("toString", []) => Returned::Value(HostValue::String(from_utf16(&units)?)),
        ("length", []) => Returned::Value(HostValue::Int(units.len() as i32)),
        ("charAt", [HostValue::Int(index)]) => {
            Returned::Value(HostValue::Int(*units.get(index_of(*index)?)? as i32))
        }
        ("indexOf", [HostValue::String(needle)]) => {
            let needle: Vec<u16> = needle.encode_utf16().collect();
            Returned::Value(HostValue::Int(utf16_index_of(&units, &needle)))
        }
        _ => return None,
    };

    Some(SimulatedCall {
        receiver: HostValue::StringBuilder(from_utf16(&units)?),
        returned,
    })
}

fn index_of(index: i32) -> Option<usize> {
    usize::try_from(index).ok()
}

fn from_utf16(units: &[u16]) -> Option<String> {
    String::from_utf16(units).ok()
}

fn utf16_index_of(haystack: &[u16], needle: &[u16]) -> i32 {
    if needle.is_empty() {
        return 0;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .map_or(-1, |index| index as i32)
}

fn utf16_compare(lhs: &[u16], rhs: &[u16]) -> i32 {
    for (l, r) in lhs.iter().zip(rhs) {
        if l != r {
            return *l as i32 - *r as i32;
        }
    }
    lhs.len() as i32 - rhs.len() as i32
}

/// `String.replace(CharSequence, CharSequence)`, where an empty target matches between every
/// character
fn java_replace(string: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        let mut replaced = String::from(to);
        for c in string.chars() {
            replaced.push(c);
            replaced.push_str(to);
        }
        replaced
    } else {
        string.replace(from, to)
    }
}

/// `Double.toString`
pub fn java_double_string(value: f64) -> String {
    if value.is_nan() {
        String::from("NaN")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else if value == 0.0 || (1e-3..1e7).contains(&value.abs()) {
        decimal_notation(format!("{}", value))
    } else {
        scientific_notation(format!("{:e}", value))
    }
}

/// `Float.toString`
pub fn java_float_string(value: f32) -> String {
    if value.is_nan() {
        String::from("NaN")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else if value == 0.0 || (1e-3..1e7).contains(&value.abs()) {
        decimal_notation(format!("{}", value))
    } else {
        scientific_notation(format!("{:e}", value))
    }
}

fn decimal_notation(mut rendered: String) -> String {
    if !rendered.contains('.') {
        rendered.push_str(".0");
    }
    rendered
}

fn scientific_notation(rendered: String) -> String {
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            format!("{}E{}", decimal_notation(mantissa.to_owned()), exponent)
        }
        None => rendered,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::BootstrapMethod;
    use crate::jvm::{ParseDescriptor, UnqualifiedName};

    fn method(class: BinaryName, name: &str, descriptor: &str) -> MethodRef {
        MethodRef::new(
            class,
            UnqualifiedName::from_string(String::from(name)).unwrap(),
            MethodDescriptor::parse(descriptor).unwrap(),
        )
    }

    fn string(s: &str) -> HostValue {
        HostValue::String(String::from(s))
    }

    fn builder(s: &str) -> HostValue {
        HostValue::StringBuilder(String::from(s))
    }

    #[test]
    fn string_builders() {
        let table = SimulationTable::new();
        let sb = BinaryName::STRINGBUILDER;

        let from_string = MethodDescriptor::parse("(Ljava/lang/String;)V").unwrap();
        let initial = table.construct(&sb, &from_string, &[string("Hello")]).unwrap();
        assert_eq!(initial, builder("Hello"));

        let append_string = method(
            sb.clone(),
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
        );
        let call = table
            .invoke_virtual(&append_string, &initial, &[string(" World")])
            .unwrap();
        assert_eq!(call.receiver, builder("Hello World"));
        assert_eq!(call.returned, Returned::Receiver);

        let append_char = method(sb.clone(), "append", "(C)Ljava/lang/StringBuilder;");
        let call = table
            .invoke_virtual(&append_char, &call.receiver, &[HostValue::Int('!' as i32)])
            .unwrap();
        assert_eq!(call.receiver, builder("Hello World!"));

        let append_bool = method(sb.clone(), "append", "(Z)Ljava/lang/StringBuilder;");
        let call = table
            .invoke_virtual(&append_bool, &builder(""), &[HostValue::Int(1)])
            .unwrap();
        assert_eq!(call.receiver, builder("true"));

        let append_double = method(sb.clone(), "append", "(D)Ljava/lang/StringBuilder;");
        let call = table
            .invoke_virtual(&append_double, &builder("x="), &[HostValue::Double(2.0)])
            .unwrap();
        assert_eq!(call.receiver, builder("x=2.0"));

        let reverse = method(sb.clone(), "reverse", "()Ljava/lang/StringBuilder;");
        let call = table.invoke_virtual(&reverse, &builder("abc"), &[]).unwrap();
        assert_eq!(call.receiver, builder("cba"));

        let to_string = method(sb, "toString", "()Ljava/lang/String;");
        let call = table.invoke_virtual(&to_string, &builder("done"), &[]).unwrap();
        assert_eq!(call.receiver, builder("done"), "toString leaves the builder alone");
        assert_eq!(call.returned, Returned::Value(string("done")));
    }

    #[test]
    fn length_limit() {
        let table = SimulationTable::new();
        let sb = BinaryName::STRINGBUILDER;

        let set_length = method(sb.clone(), "setLength", "(I)V");
        let call = table
            .invoke_virtual(&set_length, &builder("ab"), &[HostValue::Int(4)])
            .unwrap();
        assert_eq!(call.receiver, builder("ab\0\0"));
        assert_eq!(
            table.invoke_virtual(&set_length, &builder(""), &[HostValue::Int(i32::MAX)]),
            None
        );
        assert_eq!(
            table.invoke_virtual(&set_length, &builder(""), &[HostValue::Int(-1)]),
            None
        );

        let longest = "x".repeat(MAX_SIMULATED_LENGTH);
        let append = method(sb, "append", "(C)Ljava/lang/StringBuilder;");
        assert_eq!(
            table.invoke_virtual(&append, &builder(&longest), &[HostValue::Int('y' as i32)]),
            None,
            "appending past the limit"
        );

        let concat = method(
            BinaryName::STRING,
            "concat",
            "(Ljava/lang/String;)Ljava/lang/String;",
        );
        let half = "x".repeat(MAX_SIMULATED_LENGTH / 2);
        assert!(table
            .invoke_virtual(&concat, &string(&half), &[string(&half)])
            .is_some());
        assert_eq!(
            table.invoke_virtual(&concat, &string(&half), &[string(&longest)]),
            None
        );
    }

    #[test]
    fn strings() {
        let table = SimulationTable::new();
        let s = BinaryName::STRING;
        let call = |name: &str, descriptor: &str, receiver: &str, args: &[HostValue]| {
            table
                .invoke_virtual(&method(s.clone(), name, descriptor), &string(receiver), args)
                .and_then(|call| match call.returned {
                    Returned::Value(value) => Some(value),
                    Returned::Receiver => None,
                })
        };

        assert_eq!(call("length", "()I", "h\u{e9}llo", &[]), Some(HostValue::Int(5)));
        assert_eq!(
            call("length", "()I", "\u{1F600}", &[]),
            Some(HostValue::Int(2)),
            "UTF-16 length"
        );
        assert_eq!(
            call("charAt", "(I)C", "abc", &[HostValue::Int(1)]),
            Some(HostValue::Int('b' as i32))
        );
        assert_eq!(
            call("charAt", "(I)C", "abc", &[HostValue::Int(3)]),
            None,
            "out of bounds"
        );
        assert_eq!(
            call(
                "substring",
                "(II)Ljava/lang/String;",
                "Hello World",
                &[HostValue::Int(6), HostValue::Int(11)]
            ),
            Some(string("World"))
        );
        assert_eq!(
            call("hashCode", "()I", "Hello", &[]),
            Some(HostValue::Int(69609650))
        );
        assert_eq!(
            call("compareTo", "(Ljava/lang/String;)I", "apple", &[string("banana")]),
            Some(HostValue::Int(-1))
        );
        assert_eq!(
            call("equals", "(Ljava/lang/Object;)Z", "a", &[HostValue::Null]),
            Some(HostValue::Int(0))
        );
        assert_eq!(
            call("trim", "()Ljava/lang/String;", "\t x \n", &[]),
            Some(string("x"))
        );
        assert_eq!(
            call(
                "replace",
                "(Ljava/lang/CharSequence;Ljava/lang/CharSequence;)Ljava/lang/String;",
                "ab",
                &[string(""), string("-")]
            ),
            Some(string("-a-b-"))
        );
        assert_eq!(
            call(
                "split",
                "(Ljava/lang/String;)[Ljava/lang/String;",
                "a,b",
                &[string(",")]
            ),
            None
        );
    }

    #[test]
    fn denied_methods() {
        let table = SimulationTable::new();
        let intern = method(BinaryName::STRING, "intern", "()Ljava/lang/String;");
        let wait = method(BinaryName::OBJECT, "wait", "(J)V");
        let notify = method(BinaryName::OBJECT, "notify", "(I)V");

        assert!(table.is_denied(&intern));
        assert!(table.is_denied(&wait));
        assert!(!table.is_denied(&notify), "only the exact descriptors are denied");

        let call = table.invoke_virtual(&intern, &string("x"), &[]).unwrap();
        assert_eq!(call.returned, Returned::Receiver);
        assert_eq!(call.receiver, string("x"));
    }

    #[test]
    fn static_methods() {
        let table = SimulationTable::new();
        let invoke = |class: BinaryName, name: &str, descriptor: &str, args: &[HostValue]| {
            table.invoke_static(&method(class, name, descriptor), args)
        };
        let parse_int = "(Ljava/lang/String;)I";

        assert_eq!(
            invoke(BinaryName::INTEGER, "parseInt", parse_int, &[string("-42")]),
            Some(HostValue::Int(-42))
        );
        assert_eq!(invoke(BinaryName::INTEGER, "parseInt", parse_int, &[string("x")]), None);
        assert_eq!(
            invoke(
                BinaryName::INTEGER,
                "toHexString",
                "(I)Ljava/lang/String;",
                &[HostValue::Int(-1)]
            ),
            Some(string("ffffffff"))
        );
        assert_eq!(
            invoke(BinaryName::INTEGER, "highestOneBit", "(I)I", &[HostValue::Int(100)]),
            Some(HostValue::Int(64))
        );
        assert_eq!(
            invoke(BinaryName::MATH, "abs", "(I)I", &[HostValue::Int(i32::MIN)]),
            Some(HostValue::Int(i32::MIN))
        );
        assert_eq!(
            invoke(
                BinaryName::MATH,
                "floorMod",
                "(II)I",
                &[HostValue::Int(-7), HostValue::Int(3)]
            ),
            Some(HostValue::Int(2))
        );
        assert_eq!(
            invoke(
                BinaryName::MATH,
                "floorDiv",
                "(II)I",
                &[HostValue::Int(1), HostValue::Int(0)]
            ),
            None
        );
        assert_eq!(
            invoke(
                BinaryName::CHARACTER,
                "toUpperCase",
                "(C)C",
                &[HostValue::Int('q' as i32)]
            ),
            Some(HostValue::Int('Q' as i32))
        );
        assert_eq!(
            invoke(
                BinaryName::STRING,
                "valueOf",
                "(I)Ljava/lang/String;",
                &[HostValue::Int(7)]
            ),
            Some(string("7"))
        );
        assert_eq!(
            invoke(BinaryName::SYSTEM, "currentTimeMillis", "()J", &[]),
            None,
            "not allow-listed"
        );
    }

    #[test]
    fn string_concat_factory() {
        let table = SimulationTable::new();
        let call_site = |bootstrap: &str, arguments: Vec<Constant>| InvokeDynamicRef {
            name: UnqualifiedName::from_string(String::from(bootstrap)).unwrap(),
            descriptor: MethodDescriptor::parse("(Ljava/lang/String;CD)Ljava/lang/String;")
                .unwrap(),
            bootstrap: Some(BootstrapMethod {
                class: BinaryName::STRINGCONCATFACTORY,
                name: UnqualifiedName::from_string(String::from(bootstrap)).unwrap(),
                arguments,
            }),
        };
        let args = [string("pi"), HostValue::Int('=' as i32), HostValue::Double(3.5)];

        let recipe = Constant::String(String::from("[\u{1}\u{1}\u{1}] \u{2}"));
        let with_constants = call_site(
            "makeConcatWithConstants",
            vec![recipe, Constant::Integer(7)],
        );
        assert_eq!(
            table.invoke_dynamic(&with_constants, &args),
            Some(string("[pi=3.5] 7"))
        );

        let plain = call_site("makeConcat", vec![]);
        assert_eq!(table.invoke_dynamic(&plain, &args), Some(string("pi=3.5")));

        let missing_constant = call_site(
            "makeConcatWithConstants",
            vec![Constant::String(String::from("\u{2}"))],
        );
        assert_eq!(table.invoke_dynamic(&missing_constant, &args), None);

        let mut unlinked = call_site("makeConcat", vec![]);
        unlinked.bootstrap = None;
        assert_eq!(table.invoke_dynamic(&unlinked, &args), None);
    }

    #[test]
    fn java_number_strings() {
        assert_eq!(java_double_string(1.0), "1.0");
        assert_eq!(java_double_string(-0.0), "-0.0");
        assert_eq!(java_double_string(0.1), "0.1");
        assert_eq!(java_double_string(1e7), "1.0E7");
        assert_eq!(java_double_string(1.5e-5), "1.5E-5");
        assert_eq!(java_double_string(f64::NAN), "NaN");
        assert_eq!(java_float_string(2.5), "2.5");
        assert_eq!(java_float_string(f32::NEG_INFINITY), "-Infinity");
    }
}
