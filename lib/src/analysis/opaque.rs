use std::collections::BTreeMap;

/// Which successor of a statically decided branch stays live
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpaquePredicateType {
    /// The branch is always taken
    GotoDestination,

    /// The branch is never taken
    FallThrough,

    /// The switch always jumps to the target of one of its keys
    SwitchKey,

    /// The switch always jumps to its default target
    SwitchDefault,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DetectorState {
    Idle,
    PredicateSeen { insn: usize, live: usize },
}

/// Tracks conditional branches whose outcome is known from constant operands
///
/// The interpreter marks a predicate while executing a branch, then the analyzer takes it back
/// when it schedules the successors of that same branch. A branch that stops being constant on a
/// later visit (because its operands merged into something unresolved) is forgotten.
#[derive(Debug)]
pub struct OpaquePredicateDetector {
    state: DetectorState,
    predicates: BTreeMap<usize, OpaquePredicateType>,
}

impl Default for OpaquePredicateDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl OpaquePredicateDetector {
    pub fn new() -> OpaquePredicateDetector {
        OpaquePredicateDetector {
            state: DetectorState::Idle,
            predicates: BTreeMap::new(),
        }
    }

    /// Record that the branch at `insn` always continues at `live`
    pub fn mark_predicate(&mut self, insn: usize, typ: OpaquePredicateType, live: usize) {
        log::trace!("#{} is an opaque predicate ({:?}), only #{} is live", insn, typ, live);
        self.state = DetectorState::PredicateSeen { insn, live };
        self.predicates.insert(insn, typ);
    }

    /// Live successor of the branch at `insn`, if it was just marked as an opaque predicate
    ///
    /// The detector goes back to idle no matter what.
    pub fn take(&mut self, insn: usize) -> Option<usize> {
        let state = std::mem::replace(&mut self.state, DetectorState::Idle);
        match state {
            DetectorState::PredicateSeen {
                insn: marked,
                live,
            } if marked == insn => Some(live),
            _ => {
                self.predicates.remove(&insn);
                None
            }
        }
    }

    /// Branches found to be opaque predicates, by instruction
    pub fn predicates(&self) -> &BTreeMap<usize, OpaquePredicateType> {
        &self.predicates
    }

    pub fn into_predicates(self) -> BTreeMap<usize, OpaquePredicateType> {
        self.predicates
    }
}
