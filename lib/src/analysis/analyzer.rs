use super::*;
use crate::jvm::code::{Instruction, MethodBody};
use crate::jvm::{BinaryName, FieldType, RefType};
use crate::util::Width;
use std::collections::BTreeMap;

/// Knobs of the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerSettings {
    /// Fail when a deferred problem is still standing after convergence
    pub throw_unresolved_problems: bool,

    /// Don't schedule the dead successor of branches on constant operands
    pub skip_dead_code_blocks: bool,

    /// Track the contents of strings and string builders
    pub simulate: bool,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        AnalyzerSettings {
            throw_unresolved_problems: true,
            skip_dead_code_blocks: true,
            simulate: true,
        }
    }
}

/// Fixed-point driver computing the frames of a method
///
/// One analyzer can be reused for any number of methods: every call to [`Analyzer::analyze`]
/// starts from scratch.
pub struct Analyzer<'a> {
    checker: &'a dyn TypeChecker,
    resolver: &'a dyn TypeResolver,
    parameter_factory: Option<&'a dyn ParameterFactory>,
    static_invoke_factory: Option<&'a dyn StaticInvokeFactory>,
    static_get_factory: Option<&'a dyn StaticGetFactory>,
    problem_factory: &'a dyn ProblemFactory,
    settings: AnalyzerSettings,
    simulation: SimulationTable,
}

impl<'a> Analyzer<'a> {
    /// Analyzer answering subtyping and merge questions from one type hierarchy
    pub fn new<T: TypeChecker + TypeResolver>(types: &'a T) -> Analyzer<'a> {
        Analyzer {
            checker: types,
            resolver: types,
            parameter_factory: None,
            static_invoke_factory: None,
            static_get_factory: None,
            problem_factory: &DefaultProblemFactory,
            settings: AnalyzerSettings::default(),
            simulation: SimulationTable::new(),
        }
    }

    pub fn with_type_resolver(mut self, resolver: &'a dyn TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_parameter_factory(mut self, factory: &'a dyn ParameterFactory) -> Self {
        self.parameter_factory = Some(factory);
        self
    }

    pub fn with_static_invoke_factory(mut self, factory: &'a dyn StaticInvokeFactory) -> Self {
        self.static_invoke_factory = Some(factory);
        self
    }

    pub fn with_static_get_factory(mut self, factory: &'a dyn StaticGetFactory) -> Self {
        self.static_get_factory = Some(factory);
        self
    }

    pub fn with_problem_factory(mut self, factory: &'a dyn ProblemFactory) -> Self {
        self.problem_factory = factory;
        self
    }

    pub fn with_settings(mut self, settings: AnalyzerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn set_throw_unresolved_analyzer_errors(&mut self, throw: bool) {
        self.settings.throw_unresolved_problems = throw;
    }

    pub fn set_skip_dead_code_blocks(&mut self, skip: bool) {
        self.settings.skip_dead_code_blocks = skip;
    }

    pub fn set_simulation(&mut self, simulate: bool) {
        self.settings.simulate = simulate;
    }

    /// Compute the frame before every reachable instruction of the method
    pub fn analyze(&self, method: &MethodBody) -> Result<Frames, Error> {
        if method.is_empty() {
            return Err(Error::InvalidMethod(format!(
                "{}.{} has no instructions",
                method.class, method.name
            )));
        }
        log::debug!(
            "Analyzing {}.{}{} ({} instructions)",
            method.class,
            method.name,
            method.descriptor,
            method.len()
        );

        let mut interpreter = Interpreter::new(method, self.checker, self.problem_factory)
            .with_static_invoke_factory(self.static_invoke_factory)
            .with_static_get_factory(self.static_get_factory)
            .with_opaque_predicate_detection(self.settings.skip_dead_code_blocks);
        if self.settings.simulate {
            interpreter = interpreter.with_simulation(&self.simulation);
        }

        let mut run = Run {
            frames: vec![None; method.len()],
            worklist: vec![],
            queued: vec![false; method.len()],
        };
        let mut blocks = BlockTree::new(method.len());
        let mut detector = OpaquePredicateDetector::new();
        let mut problems = Problems::new();

        let mut entry = self.entry_frame(method)?;
        entry.record_at(0);
        run.frames[0] = Some(entry);
        run.schedule(0);

        while let Some(insn) = run.next() {
            let before = match &run.frames[insn] {
                Some(frame) => frame.clone(),
                None => continue,
            };
            let instruction = &method.instructions[insn];
            log::trace!("#{} {} with {}", insn, instruction, before);

            let mut after = before.clone();
            let mut state = ExecutionState {
                blocks: &blocks,
                detector: &mut detector,
                problems: &mut problems,
            };
            interpreter
                .execute(insn, &mut after, &mut state)
                .map_err(|kind| failure(method, insn, kind))?;

            // Normal edges, minus the dead one of an opaque predicate
            let live = detector.take(insn);
            for &successor in method.successors(insn) {
                if live.map_or(false, |live| live != successor) {
                    log::debug!("#{} -> #{} is never taken, skipping it", insn, successor);
                    continue;
                }
                let mut incoming = after.clone();
                if instruction.is_jump_or_switch() {
                    incoming.clear_reservations();
                    if let Instruction::Label(_) = method.instructions[successor] {
                        blocks.add_block(insn, successor);
                    }
                }
                run.flow(insn, successor, incoming, self.resolver)
                    .map_err(|kind| failure(method, insn, kind))?;
            }

            // Exception edges start from the state before the instruction
            for block in method.handlers_covering(insn) {
                let catch_type = block.catch_type.clone().unwrap_or(BinaryName::THROWABLE);
                let mut incoming = before.clone();
                incoming.clear_stack();
                incoming.clear_reservations();
                incoming
                    .push(Value::exception(
                        RefType::Object(catch_type),
                        Provenance::of(block.handler),
                    ))
                    .map_err(|kind| failure(method, insn, kind))?;
                blocks.add_block(insn, block.handler);
                run.flow(insn, block.handler, incoming, self.resolver)
                    .map_err(|kind| failure(method, insn, kind))?;
            }
        }

        let reachable = run.frames.iter().filter(|frame| frame.is_some()).count();
        log::debug!(
            "Converged with {} of {} instructions reachable, {} problems to check",
            reachable,
            method.len(),
            problems.len()
        );

        let frames = run.frames;
        problems.retain(|problem| {
            let resolved = problem.is_resolved(&frames, self.checker, &blocks, method);
            if resolved {
                log::debug!("{} was resolved", problem);
            }
            !resolved
        });
        let mut problems = problems.into_vec();
        if self.settings.throw_unresolved_problems && !problems.is_empty() {
            let problem = problems.remove(0);
            log::error!("{}.{} has an unresolved problem: {}", method.class, method.name, problem);
            return Err(Error::Unresolved(problem));
        }

        Ok(Frames {
            frames,
            problems,
            opaque_jumps: detector.into_predicates(),
            blocks,
        })
    }

    /// Frame on entry to the method, with the parameters in the first locals
    fn entry_frame(&self, method: &MethodBody) -> Result<Frame, Error> {
        let mut frame = Frame::new(method.max_locals as usize, method.max_stack as usize);
        let is_instance_method = !method.is_static();

        let mut parameters = vec![];
        if is_instance_method {
            parameters.push(FieldType::object(method.class.clone()));
        }
        parameters.extend(method.descriptor.parameters.iter().cloned());

        let mut local = 0;
        for parameter in &parameters {
            let value = self
                .parameter_factory
                .and_then(|factory| {
                    factory.create_parameter_value(is_instance_method, local, parameter)
                })
                .unwrap_or_else(|| Value::of_type(parameter, Provenance::new()));
            let width = value.width();
            frame.set_local(local, value).map_err(|_| {
                Error::InvalidMethod(format!(
                    "parameters of {}.{}{} don't fit in {} locals",
                    method.class, method.name, method.descriptor, method.max_locals
                ))
            })?;
            local += width;
        }
        frame.clear_reservations();
        Ok(frame)
    }
}

fn failure(method: &MethodBody, insn: usize, kind: AnalyzerErrorKind) -> Error {
    let instruction = method.instructions[insn].to_string();
    log::error!(
        "{}.{} fails at #{} ({}): {}",
        method.class,
        method.name,
        insn,
        instruction,
        kind
    );
    Error::Analyzer {
        insn,
        instruction,
        kind,
    }
}

/// Mutable state of the worklist loop
struct Run {
    frames: Vec<Option<Frame>>,
    worklist: Vec<usize>,
    queued: Vec<bool>,
}

impl Run {
    fn schedule(&mut self, insn: usize) {
        if !self.queued[insn] {
            self.queued[insn] = true;
            self.worklist.push(insn);
        }
    }

    fn next(&mut self) -> Option<usize> {
        let insn = self.worklist.pop()?;
        self.queued[insn] = false;
        Some(insn)
    }

    /// Propagate the state after `from` into the frame of `to`
    fn flow(
        &mut self,
        from: usize,
        to: usize,
        incoming: Frame,
        resolver: &dyn TypeResolver,
    ) -> Result<(), AnalyzerErrorKind> {
        if let Some(frame) = &mut self.frames[from] {
            frame.add_flow_output(to);
        }
        let changed = match &mut self.frames[to] {
            None => {
                let mut frame = incoming;
                frame.record_at(to);
                frame.add_flow_input(from);
                self.frames[to] = Some(frame);
                true
            }
            Some(frame) => {
                frame.add_flow_input(from);
                let changed = frame.merge(&incoming, resolver)?;
                if changed {
                    log::trace!("#{} changed after merging from #{}: {}", to, from, frame);
                }
                changed
            }
        };
        if changed {
            self.schedule(to);
        }
        Ok(())
    }
}

/// Result of analyzing one method: the frame before every reachable instruction
#[derive(Debug)]
pub struct Frames {
    frames: Vec<Option<Frame>>,
    problems: Vec<Problem>,
    opaque_jumps: BTreeMap<usize, OpaquePredicateType>,
    blocks: BlockTree,
}

impl Frames {
    /// Frame before the instruction, `None` if it is unreachable
    pub fn frame(&self, insn: usize) -> Option<&Frame> {
        self.frames.get(insn).and_then(Option::as_ref)
    }

    pub fn is_reachable(&self, insn: usize) -> bool {
        self.frame(insn).is_some()
    }

    /// Value on top of the stack before the instruction
    pub fn top_of_stack(&self, insn: usize) -> Option<&Value> {
        self.stack_from_top(insn, 0)
    }

    /// Value `offset` entries below the top of the stack before the instruction
    pub fn stack_from_top(&self, insn: usize, offset: usize) -> Option<&Value> {
        self.frame(insn)?.peek(offset)
    }

    /// Topmost `count` stack values before the instruction (eg. the arguments of a call), bottom
    /// first
    pub fn stack_arguments(&self, insn: usize, count: usize) -> Option<&[Value]> {
        let stack = self.frame(insn)?.stack();
        let start = stack.len().checked_sub(count)?;
        Some(&stack[start..])
    }

    /// Branches whose outcome was decided by constant operands
    pub fn opaque_jumps(&self) -> &BTreeMap<usize, OpaquePredicateType> {
        &self.opaque_jumps
    }

    /// Problems left standing (only ever non-empty when unresolved problems don't fail)
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn blocks(&self) -> &BlockTree {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Frame>> {
        self.frames.iter().map(Option::as_ref)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::{ClassGraph, ClassGraphArenas};
    use crate::jvm::code::Listing;
    use crate::jvm::Name;

    fn analyze(source: &str, settings: AnalyzerSettings) -> Result<Frames, Error> {
        let listing = Listing::parse(source).unwrap();
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        graph.insert_java_library_types();
        listing.declare_classes(&graph);
        Analyzer::new(&graph)
            .with_settings(settings)
            .analyze(&listing.methods[0])
    }

    #[test]
    fn parameters() {
        let frames = analyze(
            r#"
            .class Test
            .method test(JLjava/lang/String;)V
                .limit stack 0
                .limit locals 4
                return
            .end method
            "#,
            AnalyzerSettings::default(),
        )
        .unwrap();
        let entry = frames.frame(0).unwrap();
        assert_eq!(
            entry.locals()[0].ref_type(),
            Some(&RefType::Object(BinaryName::from_string(String::from("Test")).unwrap())),
            "receiver"
        );
        assert!(entry.locals()[1].is_primitive());
        assert!(entry.locals()[2].is_uninitialized(), "upper half of the long");
        assert_eq!(
            entry.locals()[3].ref_type(),
            Some(&RefType::Object(BinaryName::STRING))
        );

        let too_many = analyze(
            r#"
            .class Test
            .method static test(JJ)V
                .limit locals 3
                return
            .end method
            "#,
            AnalyzerSettings::default(),
        );
        assert!(matches!(too_many, Err(Error::InvalidMethod(_))));
    }

    #[test]
    fn flow_edges() {
        let frames = analyze(
            r#"
            .class Test
            .method static test(I)I
                .limit stack 1
                .limit locals 1
                iload_0
                ifeq Zero
                iconst_1
                ireturn
            Zero:
                iconst_0
                ireturn
            .end method
            "#,
            AnalyzerSettings::default(),
        )
        .unwrap();
        assert_eq!(frames.len(), 7);
        assert!(frames.iter().all(|frame| frame.is_some()));
        let branch = frames.frame(1).unwrap();
        assert_eq!(branch.insn(), Some(1));
        assert_eq!(branch.flow_outputs().iter().copied().collect::<Vec<_>>(), vec![2, 4]);
        let target = frames.frame(4).unwrap();
        assert_eq!(target.flow_inputs().iter().copied().collect::<Vec<_>>(), vec![1]);
        assert!(frames.opaque_jumps().is_empty());
    }

    #[test]
    fn handlers() {
        let frames = analyze(
            r#"
            .class Test
            .method static test()V
                .limit stack 2
                .limit locals 1
                .catch java/io/IOException from Start to End using Handler
            Start:
                iconst_1
                istore_0
                invokestatic Test/run()V
            End:
                return
            Handler:
                astore_0
                return
            .end method
            "#,
            AnalyzerSettings::default(),
        )
        .unwrap();
        let handler = frames.frame(6).unwrap();
        assert_eq!(handler.stack().len(), 1);
        assert!(matches!(
            handler.stack()[0].kind(),
            ValueKind::Exception { typ: RefType::Object(class) }
                if class == &BinaryName::IOEXCEPTION
        ));
        assert!(
            handler.locals()[0].is_uninitialized(),
            "the handler is also reached before the store"
        );
    }
}
