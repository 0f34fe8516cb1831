use super::*;
use crate::jvm::code::{
    CompareMode, Constant, FieldRef, Instruction, InvokeDynamicRef, InvokeType, Label, MethodBody,
    MethodRef, ShiftType,
};
use crate::jvm::{BaseType, BinaryName, FieldType, RefType, UnqualifiedName};
use crate::util::Width;

/// Mutable state of one analysis run which the interpreter updates as it goes
pub struct ExecutionState<'s> {
    pub blocks: &'s BlockTree,
    pub detector: &'s mut OpaquePredicateDetector,
    pub problems: &'s mut Problems,
}

/// Abstract transfer function of every instruction of one method
///
/// The interpreter only ever reads from its collaborators. Everything that changes during an
/// analysis run lives in the [`Frame`] being transformed and in the [`ExecutionState`].
pub struct Interpreter<'a> {
    method: &'a MethodBody,
    checker: &'a dyn TypeChecker,
    simulation: Option<&'a SimulationTable>,
    static_invoke: Option<&'a dyn StaticInvokeFactory>,
    static_get: Option<&'a dyn StaticGetFactory>,
    problem_factory: &'a dyn ProblemFactory,
    detect_opaque_predicates: bool,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        method: &'a MethodBody,
        checker: &'a dyn TypeChecker,
        problem_factory: &'a dyn ProblemFactory,
    ) -> Interpreter<'a> {
        Interpreter {
            method,
            checker,
            simulation: None,
            static_invoke: None,
            static_get: None,
            problem_factory,
            detect_opaque_predicates: false,
        }
    }

    /// Run allow-listed methods of strings, string builders, and boxes
    pub fn with_simulation(mut self, table: &'a SimulationTable) -> Self {
        self.simulation = Some(table);
        self
    }

    pub fn with_static_invoke_factory(
        mut self,
        factory: Option<&'a dyn StaticInvokeFactory>,
    ) -> Self {
        self.static_invoke = factory;
        self
    }

    pub fn with_static_get_factory(mut self, factory: Option<&'a dyn StaticGetFactory>) -> Self {
        self.static_get = factory;
        self
    }

    /// Mark branches on constant operands in the opaque predicate detector
    pub fn with_opaque_predicate_detection(mut self, detect: bool) -> Self {
        self.detect_opaque_predicates = detect;
        self
    }

    /// Update the frame to reflect the effects of the instruction at `insn`
    pub fn execute(
        &self,
        insn: usize,
        frame: &mut Frame,
        state: &mut ExecutionState<'_>,
    ) -> Result<(), AnalyzerErrorKind> {
        use Instruction::*;
        use Number::{Double as D, Float as F, Int as I, Long as L};

        let instruction = match self.method.instructions.get(insn) {
            Some(instruction) => instruction,
            None => return Ok(()),
        };

        match instruction {
            Nop | Instruction::Label(_) | Goto(_) => (),

            // Constants
            AConstNull => frame.push(Value::null(insn))?,
            IConstM1 => frame.push(Value::number(I(-1), insn))?,
            IConst0 => frame.push(Value::number(I(0), insn))?,
            IConst1 => frame.push(Value::number(I(1), insn))?,
            IConst2 => frame.push(Value::number(I(2), insn))?,
            IConst3 => frame.push(Value::number(I(3), insn))?,
            IConst4 => frame.push(Value::number(I(4), insn))?,
            IConst5 => frame.push(Value::number(I(5), insn))?,
            LConst0 => frame.push(Value::number(L(0), insn))?,
            LConst1 => frame.push(Value::number(L(1), insn))?,
            FConst0 => frame.push(Value::number(F(0.0), insn))?,
            FConst1 => frame.push(Value::number(F(1.0), insn))?,
            FConst2 => frame.push(Value::number(F(2.0), insn))?,
            DConst0 => frame.push(Value::number(D(0.0), insn))?,
            DConst1 => frame.push(Value::number(D(1.0), insn))?,
            BiPush(b) => frame.push(Value::number(I(*b as i32), insn))?,
            SiPush(s) => frame.push(Value::number(I(*s as i32), insn))?,
            Ldc(constant) => frame.push(self.constant(insn, constant))?,

            // Locals
            ILoad(local) => load(frame, insn, *local, Some(BaseType::Int))?,
            LLoad(local) => load(frame, insn, *local, Some(BaseType::Long))?,
            FLoad(local) => load(frame, insn, *local, Some(BaseType::Float))?,
            DLoad(local) => load(frame, insn, *local, Some(BaseType::Double))?,
            ALoad(local) => load(frame, insn, *local, None)?,
            IStore(local) => store(frame, insn, *local, Some(BaseType::Int))?,
            LStore(local) => store(frame, insn, *local, Some(BaseType::Long))?,
            FStore(local) => store(frame, insn, *local, Some(BaseType::Float))?,
            DStore(local) => store(frame, insn, *local, Some(BaseType::Double))?,
            AStore(local) => store(frame, insn, *local, None)?,
            IInc(local, increment) => {
                let index = *local as usize;
                let value = frame.local(index)?;
                let number = match value.kind() {
                    ValueKind::Uninitialized => {
                        return Err(AnalyzerErrorKind::UninitializedLocal(index))
                    }
                    ValueKind::Primitive {
                        typ: BaseType::Int,
                        number,
                    } => number.and_then(|number| match number {
                        I(i) => Some(I(i.wrapping_add(*increment as i32))),
                        _ => None,
                    }),
                    _ => {
                        return Err(AnalyzerErrorKind::IllegalLoad {
                            local: index,
                            expected: String::from("int"),
                            found: value.to_string(),
                        })
                    }
                };
                let provenance = provenance_of(insn, &[value]);
                frame.set_local(index, number_value(BaseType::Int, number, provenance))?;
            }

            // Arrays
            IALoad => self.array_load(frame, insn, state, Some(&[BaseType::Int]))?,
            LALoad => self.array_load(frame, insn, state, Some(&[BaseType::Long]))?,
            FALoad => self.array_load(frame, insn, state, Some(&[BaseType::Float]))?,
            DALoad => self.array_load(frame, insn, state, Some(&[BaseType::Double]))?,
            AALoad => self.array_load(frame, insn, state, None)?,
            BALoad => {
                self.array_load(frame, insn, state, Some(&[BaseType::Byte, BaseType::Boolean]))?
            }
            CALoad => self.array_load(frame, insn, state, Some(&[BaseType::Char]))?,
            SALoad => self.array_load(frame, insn, state, Some(&[BaseType::Short]))?,
            IAStore => self.array_store(frame, insn, state, Some(&[BaseType::Int]))?,
            LAStore => self.array_store(frame, insn, state, Some(&[BaseType::Long]))?,
            FAStore => self.array_store(frame, insn, state, Some(&[BaseType::Float]))?,
            DAStore => self.array_store(frame, insn, state, Some(&[BaseType::Double]))?,
            AAStore => self.array_store(frame, insn, state, None)?,
            BAStore => {
                self.array_store(frame, insn, state, Some(&[BaseType::Byte, BaseType::Boolean]))?
            }
            CAStore => self.array_store(frame, insn, state, Some(&[BaseType::Char]))?,
            SAStore => self.array_store(frame, insn, state, Some(&[BaseType::Short]))?,
            ArrayLength => {
                let array = self.pop_array(frame, insn, state, 0, None)?;
                let provenance = provenance_of(insn, &[&array]);
                frame.push(Value::unresolved_primitive(BaseType::Int, provenance))?;
            }
            NewArray(element) => {
                let length = pop_expecting(frame, BaseType::Int)?;
                let typ = RefType::array(FieldType::Base(*element));
                frame.push(Value::reference(typ, true, provenance_of(insn, &[&length])))?;
            }
            ANewArray(element) => {
                let length = pop_expecting(frame, BaseType::Int)?;
                let typ = RefType::array(FieldType::Ref(element.clone()));
                frame.push(Value::reference(typ, true, provenance_of(insn, &[&length])))?;
            }
            MultiANewArray(typ, dimensions) => {
                let mut provenance = Provenance::new();
                for _ in 0..*dimensions {
                    provenance.union(pop_expecting(frame, BaseType::Int)?.provenance());
                }
                provenance.add(insn);
                frame.push(Value::reference(typ.clone(), true, provenance))?;
            }

            // Generic stack manipulation
            Pop => {
                pop_width(frame, 1)?;
            }
            Pop2 => {
                if frame.pop()?.width() == 1 {
                    pop_width(frame, 1)?;
                }
            }
            Dup => {
                let value = pop_width(frame, 1)?;
                let copy = value.copy(insn)?;
                frame.push(copy.clone())?;
                frame.push(copy)?;
            }
            DupX1 => {
                let value1 = pop_width(frame, 1)?;
                let value2 = pop_width(frame, 1)?;
                let copy = value1.copy(insn)?;
                push_all(frame, vec![copy.clone(), value2, copy])?;
            }
            DupX2 => {
                let value1 = pop_width(frame, 1)?;
                let copy = value1.copy(insn)?;
                let value2 = frame.pop()?;
                if value2.width() == 2 {
                    push_all(frame, vec![copy.clone(), value2, copy])?;
                } else {
                    let value3 = pop_width(frame, 1)?;
                    push_all(frame, vec![copy.clone(), value3, value2, copy])?;
                }
            }
            Dup2 => {
                let value1 = frame.pop()?;
                let copy1 = value1.copy(insn)?;
                if value1.width() == 2 {
                    push_all(frame, vec![copy1.clone(), copy1])?;
                } else {
                    let copy2 = pop_width(frame, 1)?.copy(insn)?;
                    push_all(frame, vec![copy2.clone(), copy1.clone(), copy2, copy1])?;
                }
            }
            Dup2X1 => {
                let value1 = frame.pop()?;
                let copy1 = value1.copy(insn)?;
                if value1.width() == 2 {
                    let value2 = pop_width(frame, 1)?;
                    push_all(frame, vec![copy1.clone(), value2, copy1])?;
                } else {
                    let copy2 = pop_width(frame, 1)?.copy(insn)?;
                    let value3 = pop_width(frame, 1)?;
                    push_all(frame, vec![copy2.clone(), copy1.clone(), value3, copy2, copy1])?;
                }
            }
            Dup2X2 => {
                let value1 = frame.pop()?;
                let copy1 = value1.copy(insn)?;
                if value1.width() == 2 {
                    let value2 = frame.pop()?;
                    if value2.width() == 2 {
                        push_all(frame, vec![copy1.clone(), value2, copy1])?;
                    } else {
                        let value3 = pop_width(frame, 1)?;
                        push_all(frame, vec![copy1.clone(), value3, value2, copy1])?;
                    }
                } else {
                    let copy2 = pop_width(frame, 1)?.copy(insn)?;
                    let value3 = frame.pop()?;
                    if value3.width() == 2 {
                        push_all(frame, vec![copy2.clone(), copy1.clone(), value3, copy2, copy1])?;
                    } else {
                        let value4 = pop_width(frame, 1)?;
                        push_all(
                            frame,
                            vec![copy2.clone(), copy1.clone(), value4, value3, copy2, copy1],
                        )?;
                    }
                }
            }
            Swap => {
                let value1 = pop_width(frame, 1)?.copy(insn)?;
                let value2 = pop_width(frame, 1)?.copy(insn)?;
                let provenance = provenance_of(insn, &[&value2, &value1]);
                frame.push(value1.with_provenance(provenance.clone()))?;
                frame.push(value2.with_provenance(provenance))?;
            }

            // Arithmetic
            IAdd => int_op(frame, insn, |a, b| Some(a.wrapping_add(b)))?,
            LAdd => long_op(frame, insn, |a, b| Some(a.wrapping_add(b)))?,
            FAdd => float_op(frame, insn, |a, b| a + b)?,
            DAdd => double_op(frame, insn, |a, b| a + b)?,
            ISub => int_op(frame, insn, |a, b| Some(a.wrapping_sub(b)))?,
            LSub => long_op(frame, insn, |a, b| Some(a.wrapping_sub(b)))?,
            FSub => float_op(frame, insn, |a, b| a - b)?,
            DSub => double_op(frame, insn, |a, b| a - b)?,
            IMul => int_op(frame, insn, |a, b| Some(a.wrapping_mul(b)))?,
            LMul => long_op(frame, insn, |a, b| Some(a.wrapping_mul(b)))?,
            FMul => float_op(frame, insn, |a, b| a * b)?,
            DMul => double_op(frame, insn, |a, b| a * b)?,
            IDiv => int_op(frame, insn, |a, b| (b != 0).then(|| a.wrapping_div(b)))?,
            LDiv => long_op(frame, insn, |a, b| (b != 0).then(|| a.wrapping_div(b)))?,
            FDiv => float_op(frame, insn, |a, b| a / b)?,
            DDiv => double_op(frame, insn, |a, b| a / b)?,
            IRem => int_op(frame, insn, |a, b| (b != 0).then(|| a.wrapping_rem(b)))?,
            LRem => long_op(frame, insn, |a, b| (b != 0).then(|| a.wrapping_rem(b)))?,
            FRem => float_op(frame, insn, |a, b| a % b)?,
            DRem => double_op(frame, insn, |a, b| a % b)?,
            INeg => unary(frame, insn, BaseType::Int, BaseType::Int, |n| match n {
                I(i) => Some(I(i.wrapping_neg())),
                _ => None,
            })?,
            LNeg => unary(frame, insn, BaseType::Long, BaseType::Long, |n| match n {
                L(l) => Some(L(l.wrapping_neg())),
                _ => None,
            })?,
            FNeg => unary(frame, insn, BaseType::Float, BaseType::Float, |n| match n {
                F(f) => Some(F(-f)),
                _ => None,
            })?,
            DNeg => unary(frame, insn, BaseType::Double, BaseType::Double, |n| match n {
                D(d) => Some(D(-d)),
                _ => None,
            })?,
            ISh(shift) => {
                let shift = *shift;
                int_op(frame, insn, move |a, b| {
                    let b = b as u32;
                    Some(match shift {
                        ShiftType::Left => a.wrapping_shl(b),
                        ShiftType::ArithmeticRight => a.wrapping_shr(b),
                        ShiftType::LogicalRight => (a as u32).wrapping_shr(b) as i32,
                    })
                })?
            }
            LSh(shift) => {
                let shift = *shift;
                binary(frame, insn, [BaseType::Long, BaseType::Int], BaseType::Long, move |a, b| {
                    match (a, b) {
                        (L(a), I(b)) => {
                            let b = b as u32;
                            Some(L(match shift {
                                ShiftType::Left => a.wrapping_shl(b),
                                ShiftType::ArithmeticRight => a.wrapping_shr(b),
                                ShiftType::LogicalRight => (a as u64).wrapping_shr(b) as i64,
                            }))
                        }
                        _ => None,
                    }
                })?
            }
            IAnd => int_op(frame, insn, |a, b| Some(a & b))?,
            LAnd => long_op(frame, insn, |a, b| Some(a & b))?,
            IOr => int_op(frame, insn, |a, b| Some(a | b))?,
            LOr => long_op(frame, insn, |a, b| Some(a | b))?,
            IXor => int_op(frame, insn, |a, b| Some(a ^ b))?,
            LXor => long_op(frame, insn, |a, b| Some(a ^ b))?,

            // Conversions
            I2L => convert(frame, insn, BaseType::Int, BaseType::Long)?,
            I2F => convert(frame, insn, BaseType::Int, BaseType::Float)?,
            I2D => convert(frame, insn, BaseType::Int, BaseType::Double)?,
            L2I => convert(frame, insn, BaseType::Long, BaseType::Int)?,
            L2F => convert(frame, insn, BaseType::Long, BaseType::Float)?,
            L2D => convert(frame, insn, BaseType::Long, BaseType::Double)?,
            F2I => convert(frame, insn, BaseType::Float, BaseType::Int)?,
            F2L => convert(frame, insn, BaseType::Float, BaseType::Long)?,
            F2D => convert(frame, insn, BaseType::Float, BaseType::Double)?,
            D2I => convert(frame, insn, BaseType::Double, BaseType::Int)?,
            D2L => convert(frame, insn, BaseType::Double, BaseType::Long)?,
            D2F => convert(frame, insn, BaseType::Double, BaseType::Float)?,
            I2B => unary(frame, insn, BaseType::Int, BaseType::Int, |n| match n {
                I(i) => Some(I(i as i8 as i32)),
                _ => None,
            })?,
            I2C => unary(frame, insn, BaseType::Int, BaseType::Int, |n| match n {
                I(i) => Some(I(i as u16 as i32)),
                _ => None,
            })?,
            I2S => unary(frame, insn, BaseType::Int, BaseType::Int, |n| match n {
                I(i) => Some(I(i as i16 as i32)),
                _ => None,
            })?,

            // Comparisons
            LCmp => binary(frame, insn, [BaseType::Long; 2], BaseType::Int, |a, b| match (a, b) {
                (L(a), L(b)) => Some(I(a.cmp(&b) as i32)),
                _ => None,
            })?,
            FCmp(mode) => {
                let mode = *mode;
                binary(frame, insn, [BaseType::Float; 2], BaseType::Int, move |a, b| {
                    match (a, b) {
                        (F(a), F(b)) => Some(I(compare_floats(a as f64, b as f64, mode))),
                        _ => None,
                    }
                })?
            }
            DCmp(mode) => {
                let mode = *mode;
                binary(frame, insn, [BaseType::Double; 2], BaseType::Int, move |a, b| {
                    match (a, b) {
                        (D(a), D(b)) => Some(I(compare_floats(a, b, mode))),
                        _ => None,
                    }
                })?
            }

            // Branches
            If(comparison, label) => {
                let value = pop_expecting(frame, BaseType::Int)?;
                if let Some(operand) = value.as_int() {
                    let taken = comparison.holds(operand, 0);
                    self.mark_branch(insn, label, taken, state)?;
                }
            }
            IfICmp(comparison, label) => {
                let rhs = pop_expecting(frame, BaseType::Int)?;
                let lhs = pop_expecting(frame, BaseType::Int)?;
                if let (Some(lhs), Some(rhs)) = (lhs.as_int(), rhs.as_int()) {
                    let taken = comparison.holds(lhs, rhs);
                    self.mark_branch(insn, label, taken, state)?;
                }
            }
            IfACmp(_, _) => {
                pop_reference(frame)?;
                pop_reference(frame)?;
            }
            IfNull(_, _) => {
                let value = pop_reference(frame)?;
                if value.is_null() {
                    let checked = value.provenance().clone();
                    frame.replace_all(
                        |slot| slot.is_null() && checked.covers(slot.provenance()),
                        |slot| Ok(slot.with_null_check(insn)),
                    )?;
                }
            }
            Jsr(_) => frame.push(Value::return_address(insn))?,
            Ret(local) => {
                let index = *local as usize;
                if !matches!(frame.local(index)?.kind(), ValueKind::ReturnAddress) {
                    return Err(AnalyzerErrorKind::NotReturnAddress(index));
                }
            }
            TableSwitch {
                default,
                low,
                targets,
            } => {
                let key = pop_expecting(frame, BaseType::Int)?;
                if let Some(key) = key.as_int() {
                    let offset = key as i64 - *low as i64;
                    let target = if offset >= 0 && offset < targets.len() as i64 {
                        Some(&targets[offset as usize])
                    } else {
                        None
                    };
                    self.mark_switch(insn, default, target, state)?;
                }
            }
            LookupSwitch { default, targets } => {
                let key = pop_expecting(frame, BaseType::Int)?;
                if let Some(key) = key.as_int() {
                    let target = targets
                        .iter()
                        .find(|(value, _)| *value == key)
                        .map(|(_, target)| target);
                    self.mark_switch(insn, default, target, state)?;
                }
            }

            // Returns
            IReturn => self.return_value(frame, insn, state, Some(BaseType::Int))?,
            LReturn => self.return_value(frame, insn, state, Some(BaseType::Long))?,
            FReturn => self.return_value(frame, insn, state, Some(BaseType::Float))?,
            DReturn => self.return_value(frame, insn, state, Some(BaseType::Double))?,
            AReturn => self.return_value(frame, insn, state, None)?,
            Return => {
                if let Some(expected) = &self.method.descriptor.return_type {
                    return Err(AnalyzerErrorKind::UnexpectedType {
                        expected: expected.to_string(),
                        found: String::from("void"),
                    });
                }
            }
            AThrow => {
                pop_reference(frame)?;
            }

            // Fields
            GetStatic(field) => {
                let value = self
                    .static_get
                    .and_then(|factory| factory.get_static(insn, field))
                    .unwrap_or_else(|| Value::of_type(&field.descriptor, Provenance::of(insn)));
                frame.push(value)?;
            }
            PutStatic(field) => {
                let value = pop_typed(frame, &field.descriptor)?;
                if !is_value_subtype_of_or_null(self.checker, &field.descriptor, &value) {
                    let problem = self.problem_factory.put_static(insn, field, &value);
                    state.problems.report(problem);
                }
            }
            GetField(field) => {
                let receiver = pop_reference(frame)?;
                if self.is_bad_field_receiver(field, &receiver, insn, state) {
                    let problem = self.problem_factory.get_field(insn, field, &receiver);
                    state.problems.report(problem);
                }
                let provenance = provenance_of(insn, &[&receiver]);
                frame.push(Value::of_type(&field.descriptor, provenance))?;
            }
            PutField(field) => {
                let value = pop_typed(frame, &field.descriptor)?;
                pop_reference(frame)?;
                if !is_value_subtype_of_or_null(self.checker, &field.descriptor, &value) {
                    let problem = self.problem_factory.put_field(insn, field, &value);
                    state.problems.report(problem);
                }
            }

            // Calls
            Invoke(typ, method) => self.invoke(frame, insn, state, typ, method)?,
            InvokeDynamic(call_site) => {
                let args = pop_arguments(frame, &call_site.descriptor.parameters)?;
                let provenance = provenance_of(insn, &args.iter().collect::<Vec<_>>());
                if let Some(return_type) = &call_site.descriptor.return_type {
                    let value = self
                        .invoke_dynamic(insn, call_site, &args, provenance.clone())
                        .unwrap_or_else(|| Value::of_type(return_type, provenance));
                    frame.push(value)?;
                }
            }

            // Objects
            New(class) => {
                let typ = RefType::Object(class.clone());
                let host = self
                    .simulation
                    .and_then(|simulation| simulation.new_instance(class));
                let value = match host {
                    Some(host) => Value::simulated(typ, host, Provenance::of(insn)),
                    None => Value::reference(typ, true, Provenance::of(insn)),
                };
                frame.push(value)?;
            }
            CheckCast(typ) => {
                let value = pop_reference(frame)?;
                let target = FieldType::Ref(typ.clone());
                let assignable = is_value_subtype_of(self.checker, &target, &value);
                let cast = if value.is_null() || assignable {
                    value.copy(insn)?
                } else {
                    Value::reference(typ.clone(), false, provenance_of(insn, &[&value]))
                };
                frame.push(cast)?;
            }
            InstanceOf(_) => {
                let value = pop_reference(frame)?;
                let provenance = provenance_of(insn, &[&value]);
                let result = if value.is_null() {
                    Value::resolved_number(I(0), provenance)
                } else {
                    Value::unresolved_primitive(BaseType::Int, provenance)
                };
                frame.push(result)?;
            }
            MonitorEnter | MonitorExit => {
                pop_reference(frame)?;
            }
        }

        Ok(())
    }

    fn constant(&self, insn: usize, constant: &Constant) -> Value {
        match constant {
            Constant::Integer(i) => Value::number(Number::Int(*i), insn),
            Constant::Long(l) => Value::number(Number::Long(*l), insn),
            Constant::Float(f) => Value::number(Number::Float(*f), insn),
            Constant::Double(d) => Value::number(Number::Double(*d), insn),
            Constant::String(string) => {
                let typ = RefType::Object(BinaryName::STRING);
                match self.simulation {
                    Some(_) => Value::simulated(
                        typ,
                        HostValue::String(string.clone()),
                        Provenance::of(insn),
                    ),
                    None => Value::reference(typ, false, Provenance::of(insn)),
                }
            }
            Constant::Class(_) | Constant::MethodType(_) => match constant.field_type() {
                FieldType::Ref(typ) => Value::reference(typ, true, Provenance::of(insn)),
                FieldType::Base(base) => Value::unresolved_primitive(base, Provenance::of(insn)),
            },
        }
    }

    /// Record a conditional branch on constant operands
    fn mark_branch(
        &self,
        insn: usize,
        label: &Label,
        taken: bool,
        state: &mut ExecutionState<'_>,
    ) -> Result<(), AnalyzerErrorKind> {
        if !self.detect_opaque_predicates {
            return Ok(());
        }
        if taken {
            let target = self.label_index(label)?;
            state
                .detector
                .mark_predicate(insn, OpaquePredicateType::GotoDestination, target);
        } else {
            state
                .detector
                .mark_predicate(insn, OpaquePredicateType::FallThrough, insn + 1);
        }
        Ok(())
    }

    /// Record a switch on a constant key
    fn mark_switch(
        &self,
        insn: usize,
        default: &Label,
        target: Option<&Label>,
        state: &mut ExecutionState<'_>,
    ) -> Result<(), AnalyzerErrorKind> {
        if !self.detect_opaque_predicates {
            return Ok(());
        }
        let (typ, label) = match target {
            Some(target) => (OpaquePredicateType::SwitchKey, target),
            None => (OpaquePredicateType::SwitchDefault, default),
        };
        let live = self.label_index(label)?;
        state.detector.mark_predicate(insn, typ, live);
        Ok(())
    }

    fn label_index(&self, label: &Label) -> Result<usize, AnalyzerErrorKind> {
        self.method
            .label_index(label)
            .ok_or_else(|| AnalyzerErrorKind::UnknownLabel(label.0.clone()))
    }

    fn return_value(
        &self,
        frame: &mut Frame,
        insn: usize,
        state: &mut ExecutionState<'_>,
        found: Option<BaseType>,
    ) -> Result<(), AnalyzerErrorKind> {
        let expected = &self.method.descriptor.return_type;
        match (expected, found) {
            (Some(FieldType::Base(base)), Some(found)) if base.computational() == found => {
                pop_expecting(frame, found)?;
            }
            (Some(expected @ FieldType::Ref(_)), None) => {
                let value = pop_reference(frame)?;
                if !is_value_subtype_of_or_null(self.checker, expected, &value) {
                    let problem = self.problem_factory.return_type(insn, expected, &value);
                    state.problems.report(problem);
                }
            }
            (expected, found) => {
                return Err(AnalyzerErrorKind::UnexpectedType {
                    expected: expected
                        .as_ref()
                        .map_or_else(|| String::from("void"), |typ| typ.to_string()),
                    found: found.map_or("reference", BaseType::keyword).to_owned(),
                })
            }
        }
        Ok(())
    }

    fn is_bad_field_receiver(
        &self,
        field: &FieldRef,
        receiver: &Value,
        insn: usize,
        state: &ExecutionState<'_>,
    ) -> bool {
        if receiver.is_null() {
            !is_null_checked(self.method, state.blocks, receiver, insn)
        } else {
            let owner = FieldType::object(field.class.clone());
            !is_value_subtype_of(self.checker, &owner, receiver)
        }
    }

    /// Pop an array operand, reporting a problem if it isn't an array with the expected elements
    ///
    /// `elements` lists the acceptable primitive element types (`None` for references).
    fn pop_array(
        &self,
        frame: &mut Frame,
        insn: usize,
        state: &mut ExecutionState<'_>,
        depth: usize,
        elements: Option<&[BaseType]>,
    ) -> Result<Value, AnalyzerErrorKind> {
        let array = pop_reference(frame)?;
        let matches = if array.is_null() {
            true
        } else {
            match array.ref_type().and_then(RefType::component_type) {
                Some(FieldType::Base(found)) => {
                    elements.map_or(depth == 0, |elements| elements.contains(&found))
                }
                Some(FieldType::Ref(_)) => elements.is_none() || depth == 0,
                None => false,
            }
        };
        if !matches {
            let problem = self.problem_factory.array_operand(insn, depth, &array);
            state.problems.report(problem);
        }
        Ok(array)
    }

    fn array_load(
        &self,
        frame: &mut Frame,
        insn: usize,
        state: &mut ExecutionState<'_>,
        elements: Option<&[BaseType]>,
    ) -> Result<(), AnalyzerErrorKind> {
        let index = pop_expecting(frame, BaseType::Int)?;
        let array = self.pop_array(frame, insn, state, 1, elements)?;
        let provenance = provenance_of(insn, &[&array, &index]);
        let element = match elements {
            Some(elements) => {
                Value::unresolved_primitive(elements[0].computational(), provenance)
            }
            None => match array.ref_type().and_then(RefType::component_type) {
                Some(component @ FieldType::Ref(_)) => Value::of_type(&component, provenance),
                _ => Value::reference(RefType::Object(BinaryName::OBJECT), false, provenance),
            },
        };
        frame.push(element)
    }

    fn array_store(
        &self,
        frame: &mut Frame,
        insn: usize,
        state: &mut ExecutionState<'_>,
        elements: Option<&[BaseType]>,
    ) -> Result<(), AnalyzerErrorKind> {
        let value = match elements {
            Some(elements) => pop_expecting(frame, elements[0])?,
            None => pop_reference(frame)?,
        };
        pop_expecting(frame, BaseType::Int)?;
        let array = self.pop_array(frame, insn, state, 2, elements)?;

        // Arrays of primitives were already checked by the type of the store
        let element = array.ref_type().and_then(RefType::component_type);
        if let Some(element @ FieldType::Ref(_)) = element {
            if !is_value_subtype_of_or_null(self.checker, &element, &value) {
                let problem = self.problem_factory.array_store(insn, &element, &value);
                state.problems.report(problem);
            }
        }
        Ok(())
    }

    fn invoke(
        &self,
        frame: &mut Frame,
        insn: usize,
        state: &mut ExecutionState<'_>,
        typ: &InvokeType,
        method: &MethodRef,
    ) -> Result<(), AnalyzerErrorKind> {
        let parameters = &method.descriptor.parameters;
        let return_type = method.descriptor.return_type.as_ref();
        let args = pop_arguments(frame, parameters)?;
        let receiver = match typ {
            InvokeType::Static => None,
            _ => {
                let receiver = frame.pop()?;
                if !receiver.is_reference() {
                    return Err(AnalyzerErrorKind::InvalidReceiver {
                        method: method.to_string(),
                        found: receiver.to_string(),
                    });
                }
                Some(receiver)
            }
        };

        let mut provenance = Provenance::new();
        if let Some(receiver) = &receiver {
            provenance.union(receiver.provenance());
        }
        for arg in &args {
            provenance.union(arg.provenance());
        }
        provenance.add(insn);

        // At most one problem is kept per instruction, so the receiver takes precedence
        let mut problem = None;
        if let Some(receiver) = &receiver {
            if receiver.is_null() {
                if method.name == UnqualifiedName::ADDSUPPRESSED
                    && method.is("addSuppressed", "(Ljava/lang/Throwable;)V")
                {
                    return Ok(());
                }
                if !is_null_checked(self.method, state.blocks, receiver, insn) {
                    problem = Some(self.problem_factory.invoke_host_null(insn, method));
                }
            } else {
                let owner = FieldType::object(method.class.clone());
                if !is_value_subtype_of(self.checker, &owner, receiver) {
                    problem = Some(self.problem_factory.invoke_host_type(insn, method, receiver));
                }
            }
        }
        if problem.is_none() {
            problem = parameters
                .iter()
                .zip(&args)
                .enumerate()
                .find(|(_, (parameter, arg))| {
                    parameter.is_reference()
                        && !is_value_subtype_of_or_null(self.checker, parameter, arg)
                })
                .map(|(index, (_, arg))| {
                    self.problem_factory
                        .invoke_arg_type(insn, parameters, index, arg)
                });
        }
        if let Some(problem) = problem {
            state.problems.report(problem);
        }

        let result = match &receiver {
            None => self.invoke_static(insn, method, &args, provenance.clone()),
            Some(receiver) if receiver.is_null() => None,
            Some(receiver) if method.name == UnqualifiedName::INIT => {
                self.initialize(frame, insn, receiver, method, &args)?;
                None
            }
            Some(receiver) => {
                self.invoke_virtual(frame, receiver, method, &args, provenance.clone())?
            }
        };

        if let Some(return_type) = return_type {
            let value = result.unwrap_or_else(|| Value::of_type(return_type, provenance));
            frame.push(value)?;
        }
        Ok(())
    }

    /// Result of a static call, either from the factory or from simulation
    fn invoke_static(
        &self,
        insn: usize,
        method: &MethodRef,
        args: &[Value],
        provenance: Provenance,
    ) -> Option<Value> {
        if let Some(factory) = self.static_invoke {
            if let Some(value) = factory.invoke_static(insn, method, args) {
                return Some(value);
            }
        }
        let simulation = self.simulation?;
        if !simulation.has_static_methods(&method.class) {
            return None;
        }
        let host_args = host_values(args)?;
        let return_type = method.descriptor.return_type.as_ref()?;
        match simulation.invoke_static(method, &host_args) {
            Some(host) => host_result(return_type, host, provenance),
            None => {
                log::warn!("Could not simulate {}, its result is unknown", method);
                None
            }
        }
    }

    /// Result of an `invokedynamic`, either from the factory or from simulation
    fn invoke_dynamic(
        &self,
        insn: usize,
        call_site: &InvokeDynamicRef,
        args: &[Value],
        provenance: Provenance,
    ) -> Option<Value> {
        if let Some(factory) = self.static_invoke {
            if let Some(value) = factory.invoke_dynamic(insn, call_site, args) {
                return Some(value);
            }
        }
        let simulation = self.simulation?;
        if call_site.bootstrap.is_none() {
            return None;
        }
        let host_args = host_values(args)?;
        let return_type = call_site.descriptor.return_type.as_ref()?;
        match simulation.invoke_dynamic(call_site, &host_args) {
            Some(host) => host_result(return_type, host, provenance),
            None => {
                log::warn!(
                    "Could not simulate call site {}, its result is unknown",
                    call_site.name
                );
                None
            }
        }
    }

    /// Run a constructor on the receiver, and on every other copy of it in the frame
    fn initialize(
        &self,
        frame: &mut Frame,
        insn: usize,
        receiver: &Value,
        method: &MethodRef,
        args: &[Value],
    ) -> Result<(), AnalyzerErrorKind> {
        let simulated = match (receiver.kind(), self.simulation) {
            (ValueKind::Simulated { typ, .. }, Some(simulation)) => Some((typ, simulation)),
            _ => None,
        };
        match simulated {
            None => frame.replace_all(
                |value| value.is_same_object(receiver),
                |value| value.copy(insn),
            ),
            Some((typ, simulation)) => {
                let constructed = match typ {
                    RefType::Object(class) => host_values(args).and_then(|host_args| {
                        simulation.construct(class, &method.descriptor, &host_args)
                    }),
                    _ => None,
                };
                match constructed {
                    Some(host) => {
                        receiver.with_host(host);
                        frame.replace_all(
                            |value| value.is_same_object(receiver),
                            |value| Ok(value.copy(insn)?.refreshed()),
                        )
                    }
                    None => {
                        log::warn!("Could not simulate {}, the object is now unknown", method);
                        let typ = typ.clone();
                        frame.replace_all(
                            |value| value.is_same_object(receiver),
                            |value| {
                                let provenance = provenance_of(insn, &[value]);
                                Ok(Value::reference(typ.clone(), false, provenance))
                            },
                        )
                    }
                }
            }
        }
    }

    /// Result of a virtual call, when the receiver can be simulated
    fn invoke_virtual(
        &self,
        frame: &mut Frame,
        receiver: &Value,
        method: &MethodRef,
        args: &[Value],
        provenance: Provenance,
    ) -> Result<Option<Value>, AnalyzerErrorKind> {
        let simulation = match self.simulation {
            Some(simulation) => simulation,
            None => return Ok(None),
        };
        let (typ, host) = match receiver.kind() {
            ValueKind::Simulated { typ, host, .. } => (typ, host),
            _ => return Ok(None),
        };
        let return_type = method.descriptor.return_type.as_ref();

        let call = host_values(args)
            .and_then(|host_args| simulation.invoke_virtual(method, host, &host_args));
        let call = match call {
            Some(call) => call,
            None => {
                log::warn!("Could not simulate {} on {}", method, receiver);
                if let HostValue::StringBuilder(_) = host {
                    // The builder may have been changed in ways we can't follow
                    let typ = typ.clone();
                    frame.replace_all(
                        |value| value.is_same_object(receiver),
                        |value| {
                            let provenance = value.provenance().clone();
                            Ok(Value::reference(typ.clone(), false, provenance))
                        },
                    )?;
                }
                return Ok(None);
            }
        };

        let mut updated = receiver.clone();
        if &call.receiver != host {
            updated = receiver.with_host(call.receiver.clone());
            frame.replace_all(
                |value| value.is_same_object(receiver),
                |value| Ok(value.refreshed()),
            )?;
        }

        let return_type = match return_type {
            Some(return_type) => return_type,
            None => return Ok(None),
        };
        Ok(match call.returned {
            Returned::Receiver => Some(updated.with_provenance(provenance)),
            Returned::Value(host) => host_result(return_type, host, provenance),
        })
    }
}

/// Concrete values of all arguments, if they are all known
fn host_values(args: &[Value]) -> Option<Vec<HostValue>> {
    args.iter().map(Value::host_value).collect()
}

/// Wrap the result of a simulated call back into a value
fn host_result(
    return_type: &FieldType<BinaryName>,
    host: HostValue,
    provenance: Provenance,
) -> Option<Value> {
    match (return_type, host) {
        (FieldType::Base(base), host) => {
            let number = Number::from_host(&host)?;
            if number.base_type() != base.computational() {
                return None;
            }
            Some(Value::resolved_number(number, provenance))
        }
        (FieldType::Ref(RefType::Object(class)), HostValue::String(string))
            if class == &BinaryName::STRING
                || class == &BinaryName::OBJECT
                || class == &BinaryName::CHARSEQUENCE =>
        {
            let typ = RefType::Object(BinaryName::STRING);
            Some(Value::simulated(typ, HostValue::String(string), provenance))
        }
        (FieldType::Ref(_), HostValue::Null) => Some(Value::null(0).with_provenance(provenance)),
        _ => None,
    }
}

/// Union of the provenance of some operands, plus the instruction consuming them
fn provenance_of(insn: usize, values: &[&Value]) -> Provenance {
    let mut provenance = Provenance::new();
    for value in values {
        provenance.union(value.provenance());
    }
    provenance.add(insn);
    provenance
}

fn number_value(typ: BaseType, number: Option<Number>, provenance: Provenance) -> Value {
    match number {
        Some(number) => Value::resolved_number(number, provenance),
        None => Value::unresolved_primitive(typ, provenance),
    }
}

fn push_all(frame: &mut Frame, values: Vec<Value>) -> Result<(), AnalyzerErrorKind> {
    for value in values {
        frame.push(value)?;
    }
    Ok(())
}

/// Pop a value taking up the expected number of slots
fn pop_width(frame: &mut Frame, width: usize) -> Result<Value, AnalyzerErrorKind> {
    let value = frame.pop()?;
    if value.width() != width {
        return Err(AnalyzerErrorKind::InvalidWidth(value.width()));
    }
    Ok(value)
}

/// Pop a primitive of the given computational type
fn pop_expecting(frame: &mut Frame, expected: BaseType) -> Result<Value, AnalyzerErrorKind> {
    let value = frame.pop()?;
    match value.kind() {
        ValueKind::Uninitialized => Err(AnalyzerErrorKind::UninitializedValue),
        ValueKind::Primitive { typ, .. } if *typ == expected.computational() => Ok(value),
        _ => Err(AnalyzerErrorKind::UnexpectedType {
            expected: expected.computational().keyword().to_owned(),
            found: value.to_string(),
        }),
    }
}

/// Pop a reference (possibly `null`)
fn pop_reference(frame: &mut Frame) -> Result<Value, AnalyzerErrorKind> {
    let value = frame.pop()?;
    match value.kind() {
        ValueKind::Uninitialized => Err(AnalyzerErrorKind::UninitializedValue),
        _ if value.is_reference() => Ok(value),
        _ => Err(AnalyzerErrorKind::UnexpectedType {
            expected: String::from("reference"),
            found: value.to_string(),
        }),
    }
}

/// Pop a value which is structurally compatible with a declared type
///
/// Primitives must widen to the declared type. References are only checked for being references,
/// the actual subtyping check is left to the caller (since it may be a deferred problem).
fn pop_typed(
    frame: &mut Frame,
    expected: &FieldType<BinaryName>,
) -> Result<Value, AnalyzerErrorKind> {
    match expected {
        FieldType::Ref(_) => pop_reference(frame),
        FieldType::Base(base) => {
            let value = frame.pop()?;
            match value.kind() {
                ValueKind::Uninitialized => Err(AnalyzerErrorKind::UninitializedValue),
                ValueKind::Primitive { typ, .. } if is_primitive_subtype_of(*base, *typ) => {
                    Ok(value)
                }
                _ => Err(AnalyzerErrorKind::UnexpectedType {
                    expected: expected.to_string(),
                    found: value.to_string(),
                }),
            }
        }
    }
}

/// Pop the arguments of a call, returning them in declaration order
fn pop_arguments(
    frame: &mut Frame,
    parameters: &[FieldType<BinaryName>],
) -> Result<Vec<Value>, AnalyzerErrorKind> {
    let mut args = Vec::with_capacity(parameters.len());
    for parameter in parameters.iter().rev() {
        args.push(pop_typed(frame, parameter)?);
    }
    args.reverse();
    Ok(args)
}

/// Load a local onto the stack (`None` is for references)
///
/// As with stores, narrower primitives are widened to the type of the load.
fn load(
    frame: &mut Frame,
    insn: usize,
    local: u16,
    expected: Option<BaseType>,
) -> Result<(), AnalyzerErrorKind> {
    let index = local as usize;
    let value = frame.local(index)?;
    let loaded = match (expected, value.kind()) {
        (_, ValueKind::Uninitialized) => return Err(AnalyzerErrorKind::UninitializedLocal(index)),
        (Some(expected), ValueKind::Primitive { typ, number }) => {
            widen_primitive(&value, insn, *typ, *number, expected)?
        }
        (None, _) if value.is_reference() => Some(value.copy(insn)?),
        _ => None,
    };
    match loaded {
        Some(loaded) => frame.push(loaded),
        None => Err(AnalyzerErrorKind::IllegalLoad {
            local: index,
            expected: expected.map_or("reference", BaseType::keyword).to_owned(),
            found: value.to_string(),
        }),
    }
}

/// Copy of a primitive converted to `expected`, or `None` if the primitive is too wide
fn widen_primitive(
    value: &Value,
    insn: usize,
    typ: BaseType,
    number: Option<Number>,
    expected: BaseType,
) -> Result<Option<Value>, AnalyzerErrorKind> {
    if typ == expected {
        Ok(Some(value.copy(insn)?))
    } else if is_primitive_subtype_of(expected, typ) {
        let provenance = provenance_of(insn, &[value]);
        let widened = number.map(|number| widen(number, expected));
        Ok(Some(number_value(expected, widened, provenance)))
    } else {
        Ok(None)
    }
}

/// Store the top of the stack into a local (`None` is for references)
///
/// Narrower primitives are widened to the type of the store, while wider ones are an error.
fn store(
    frame: &mut Frame,
    insn: usize,
    local: u16,
    expected: Option<BaseType>,
) -> Result<(), AnalyzerErrorKind> {
    let index = local as usize;
    let value = frame.pop()?;
    let illegal = || AnalyzerErrorKind::IllegalStore {
        local: index,
        expected: expected.map_or("reference", BaseType::keyword).to_owned(),
        found: value.to_string(),
    };
    let stored = match (expected, value.kind()) {
        (_, ValueKind::Uninitialized) => return Err(AnalyzerErrorKind::UninitializedValue),
        (None, ValueKind::ReturnAddress) => value.copy(insn)?,
        (None, _) if value.is_reference() => value.copy(insn)?,
        (Some(expected), ValueKind::Primitive { typ, number }) => {
            match widen_primitive(&value, insn, *typ, *number, expected)? {
                Some(widened) => widened,
                None => return Err(illegal()),
            }
        }
        _ => return Err(illegal()),
    };
    frame.set_local(index, stored)
}

/// Numeric conversion following the JVM conversion instructions
fn widen(number: Number, to: BaseType) -> Number {
    use Number::*;
    let (as_int, as_long, as_float, as_double) = match number {
        Int(i) => (i, i as i64, i as f32, i as f64),
        Long(l) => (l as i32, l, l as f32, l as f64),
        Float(f) => (f as i32, f as i64, f, f as f64),
        Double(d) => (d as i32, d as i64, d as f32, d),
    };
    match to {
        BaseType::Long => Long(as_long),
        BaseType::Float => Float(as_float),
        BaseType::Double => Double(as_double),
        _ => Int(as_int),
    }
}

fn compare_floats(a: f64, b: f64, mode: CompareMode) -> i32 {
    match a.partial_cmp(&b) {
        Some(ordering) => ordering as i32,
        None => match mode {
            CompareMode::L => -1,
            CompareMode::G => 1,
        },
    }
}

/// Pop two operands, push the folded result (or an unknown value of the result type)
///
/// `operands` are the types of the left and right operands.
fn binary(
    frame: &mut Frame,
    insn: usize,
    operands: [BaseType; 2],
    result: BaseType,
    fold: impl Fn(Number, Number) -> Option<Number>,
) -> Result<(), AnalyzerErrorKind> {
    let rhs = pop_expecting(frame, operands[1])?;
    let lhs = pop_expecting(frame, operands[0])?;
    let provenance = provenance_of(insn, &[&lhs, &rhs]);
    let number = match (lhs.as_number(), rhs.as_number()) {
        (Some(lhs), Some(rhs)) => fold(lhs, rhs),
        _ => None,
    };
    frame.push(number_value(result, number, provenance))
}

fn unary(
    frame: &mut Frame,
    insn: usize,
    operand: BaseType,
    result: BaseType,
    fold: impl Fn(Number) -> Option<Number>,
) -> Result<(), AnalyzerErrorKind> {
    let value = pop_expecting(frame, operand)?;
    let provenance = provenance_of(insn, &[&value]);
    let number = value.as_number().and_then(fold);
    frame.push(number_value(result, number, provenance))
}

fn convert(
    frame: &mut Frame,
    insn: usize,
    from: BaseType,
    to: BaseType,
) -> Result<(), AnalyzerErrorKind> {
    unary(frame, insn, from, to, |number| Some(widen(number, to)))
}

fn int_op(
    frame: &mut Frame,
    insn: usize,
    op: impl Fn(i32, i32) -> Option<i32>,
) -> Result<(), AnalyzerErrorKind> {
    binary(frame, insn, [BaseType::Int; 2], BaseType::Int, |a, b| match (a, b) {
        (Number::Int(a), Number::Int(b)) => op(a, b).map(Number::Int),
        _ => None,
    })
}

fn long_op(
    frame: &mut Frame,
    insn: usize,
    op: impl Fn(i64, i64) -> Option<i64>,
) -> Result<(), AnalyzerErrorKind> {
    binary(frame, insn, [BaseType::Long; 2], BaseType::Long, |a, b| match (a, b) {
        (Number::Long(a), Number::Long(b)) => op(a, b).map(Number::Long),
        _ => None,
    })
}

fn float_op(
    frame: &mut Frame,
    insn: usize,
    op: impl Fn(f32, f32) -> f32,
) -> Result<(), AnalyzerErrorKind> {
    binary(frame, insn, [BaseType::Float; 2], BaseType::Float, |a, b| match (a, b) {
        (Number::Float(a), Number::Float(b)) => Some(Number::Float(op(a, b))),
        _ => None,
    })
}

fn double_op(
    frame: &mut Frame,
    insn: usize,
    op: impl Fn(f64, f64) -> f64,
) -> Result<(), AnalyzerErrorKind> {
    binary(frame, insn, [BaseType::Double; 2], BaseType::Double, |a, b| match (a, b) {
        (Number::Double(a), Number::Double(b)) => Some(Number::Double(op(a, b))),
        _ => None,
    })
}
