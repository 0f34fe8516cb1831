use super::{Value, ValueKind};
use crate::jvm::class_graph::ClassGraph;
use crate::jvm::{BaseType, BinaryName, FieldType, RefType};

/// Answers subtyping questions about reference types
///
/// The analysis only ever reads from the checker, so one checker can serve many analyses.
pub trait TypeChecker {
    /// Can a value of type `child` be used where a `parent` is expected?
    fn is_assignable(&self, parent: &RefType<BinaryName>, child: &RefType<BinaryName>) -> bool;
}

/// Picks the type of a value resulting from merging two references at a control flow join
pub trait TypeResolver {
    /// Common super type of two reference types
    fn common(&self, a: &RefType<BinaryName>, b: &RefType<BinaryName>) -> RefType<BinaryName>;

    /// Common super type of two caught exception types (always some throwable)
    fn common_exception(
        &self,
        a: &RefType<BinaryName>,
        b: &RefType<BinaryName>,
    ) -> RefType<BinaryName>;
}

/// Resolver which knows nothing about the class hierarchy
///
/// Equal types stay as they are, anything else becomes `java/lang/Object` (or
/// `java/lang/Exception` for exceptions).
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultTypeResolver;

impl TypeResolver for DefaultTypeResolver {
    fn common(&self, a: &RefType<BinaryName>, b: &RefType<BinaryName>) -> RefType<BinaryName> {
        if a == b {
            a.clone()
        } else {
            RefType::Object(BinaryName::OBJECT)
        }
    }

    fn common_exception(
        &self,
        a: &RefType<BinaryName>,
        b: &RefType<BinaryName>,
    ) -> RefType<BinaryName> {
        if a == b {
            a.clone()
        } else {
            RefType::Object(BinaryName::EXCEPTION)
        }
    }
}

impl<'g> TypeChecker for ClassGraph<'g> {
    fn is_assignable(&self, parent: &RefType<BinaryName>, child: &RefType<BinaryName>) -> bool {
        self.is_java_assignable(child, parent)
    }
}

impl<'g> TypeResolver for ClassGraph<'g> {
    fn common(&self, a: &RefType<BinaryName>, b: &RefType<BinaryName>) -> RefType<BinaryName> {
        self.common_super_type(a, b)
    }

    fn common_exception(
        &self,
        a: &RefType<BinaryName>,
        b: &RefType<BinaryName>,
    ) -> RefType<BinaryName> {
        match self.common_super_type(a, b) {
            RefType::Object(class) if self.is_throwable(&class) => RefType::Object(class),
            _ => RefType::Object(BinaryName::THROWABLE),
        }
    }
}

/// Rank of computational types, where wider types accept values of narrower ones
const fn rank(typ: BaseType) -> u8 {
    match typ.computational() {
        BaseType::Float => 1,
        BaseType::Long => 2,
        BaseType::Double => 3,
        _ => 0,
    }
}

/// Is a primitive of type `child` usable where a `parent` is expected?
pub fn is_primitive_subtype_of(parent: BaseType, child: BaseType) -> bool {
    rank(parent) >= rank(child)
}

/// Is `child` usable where a `parent` is expected?
///
/// Primitives follow the widening order `int < float < long < double` (the sub-`int` types all
/// read as `int`). References are accepted by `java/lang/Object`, by themselves, and by whatever
/// the type checker says. Arrays are compared element-wise.
pub fn is_subtype_of(
    checker: &dyn TypeChecker,
    parent: &FieldType<BinaryName>,
    child: &FieldType<BinaryName>,
) -> bool {
    match (parent, child) {
        (FieldType::Base(parent), FieldType::Base(child)) => {
            is_primitive_subtype_of(*parent, *child)
        }
        (FieldType::Ref(parent), FieldType::Ref(child)) => {
            is_ref_subtype_of(checker, parent, child)
        }
        _ => false,
    }
}

fn is_ref_subtype_of(
    checker: &dyn TypeChecker,
    parent: &RefType<BinaryName>,
    child: &RefType<BinaryName>,
) -> bool {
    if parent == child || parent == &RefType::Object(BinaryName::OBJECT) {
        return true;
    }
    match (parent.component_type(), child.component_type()) {
        (Some(FieldType::Base(parent)), Some(FieldType::Base(child))) => parent == child,
        (Some(parent @ FieldType::Ref(_)), Some(child @ FieldType::Ref(_))) => {
            is_subtype_of(checker, &parent, &child)
        }
        (Some(_), _) => false,
        (None, _) => checker.is_assignable(parent, child),
    }
}

/// Is the value usable where a `parent` is expected?
///
/// `null` is rejected, see [`is_value_subtype_of_or_null`] for the lenient version.
pub fn is_value_subtype_of(
    checker: &dyn TypeChecker,
    parent: &FieldType<BinaryName>,
    value: &Value,
) -> bool {
    match value.field_type() {
        Some(child) => is_subtype_of(checker, parent, &child),
        None => false,
    }
}

/// Is the value usable where a `parent` is expected, counting `null` as a valid reference?
pub fn is_value_subtype_of_or_null(
    checker: &dyn TypeChecker,
    parent: &FieldType<BinaryName>,
    value: &Value,
) -> bool {
    match value.kind() {
        ValueKind::Null { .. } => parent.is_reference(),
        _ => is_value_subtype_of(checker, parent, value),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analysis::{Number, Provenance};
    use crate::jvm::class_graph::ClassGraphArenas;

    #[test]
    fn primitive_widening() {
        assert!(is_primitive_subtype_of(BaseType::Long, BaseType::Int));
        assert!(is_primitive_subtype_of(BaseType::Int, BaseType::Boolean));
        assert!(is_primitive_subtype_of(BaseType::Byte, BaseType::Char), "both read as int");
        assert!(is_primitive_subtype_of(BaseType::Double, BaseType::Float));
        assert!(!is_primitive_subtype_of(BaseType::Int, BaseType::Long));
        assert!(!is_primitive_subtype_of(BaseType::Float, BaseType::Long));
    }

    #[test]
    fn reference_subtypes() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        graph.insert_java_library_types();

        let object = FieldType::object(BinaryName::OBJECT);
        let string = FieldType::object(BinaryName::STRING);
        let char_sequence = FieldType::object(BinaryName::CHARSEQUENCE);
        let strings = FieldType::array(string.clone());
        let objects = FieldType::array(object.clone());
        let ints = FieldType::array(FieldType::int());
        let longs = FieldType::array(FieldType::long());

        assert!(is_subtype_of(&graph, &object, &string));
        assert!(is_subtype_of(&graph, &char_sequence, &string));
        assert!(!is_subtype_of(&graph, &string, &char_sequence));
        assert!(is_subtype_of(&graph, &objects, &strings), "arrays are covariant");
        assert!(is_subtype_of(&graph, &object, &ints));
        assert!(!is_subtype_of(&graph, &longs, &ints), "primitive arrays are invariant");
        assert!(!is_subtype_of(&graph, &objects, &ints));
        assert!(!is_subtype_of(&graph, &FieldType::int(), &string));
        assert!(!is_subtype_of(&graph, &string, &FieldType::int()));
        assert!(is_subtype_of(
            &graph,
            &FieldType::array(objects.clone()),
            &FieldType::array(strings.clone())
        ));
    }

    #[test]
    fn value_subtypes() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        graph.insert_java_library_types();

        let string = FieldType::object(BinaryName::STRING);
        let null = Value::null(0);
        let five = Value::number(Number::Int(5), 1);
        let text = Value::of_type(&string, Provenance::of(2));

        assert!(!is_value_subtype_of(&graph, &string, &null));
        assert!(is_value_subtype_of_or_null(&graph, &string, &null));
        assert!(!is_value_subtype_of_or_null(&graph, &FieldType::int(), &null));
        assert!(is_value_subtype_of(&graph, &FieldType::long(), &five));
        assert!(is_value_subtype_of(&graph, &FieldType::object(BinaryName::OBJECT), &text));
        assert!(!is_value_subtype_of_or_null(&graph, &string, &Value::uninitialized()));
    }

    #[test]
    fn resolvers() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        graph.insert_java_library_types();

        let npe = RefType::Object(BinaryName::NULLPOINTEREXCEPTION);
        let iae = RefType::Object(BinaryName::ILLEGALARGUMENTEXCEPTION);
        let io = RefType::Object(BinaryName::IOEXCEPTION);
        let error = RefType::Object(BinaryName::ASSERTIONERROR);

        assert_eq!(graph.common(&npe, &iae), RefType::Object(BinaryName::RUNTIMEEXCEPTION));
        assert_eq!(graph.common_exception(&npe, &io), RefType::Object(BinaryName::EXCEPTION));
        assert_eq!(graph.common_exception(&npe, &error), RefType::Object(BinaryName::THROWABLE));

        assert_eq!(DefaultTypeResolver.common(&npe, &npe), npe);
        assert_eq!(DefaultTypeResolver.common(&npe, &iae), RefType::Object(BinaryName::OBJECT));
        assert_eq!(
            DefaultTypeResolver.common_exception(&npe, &iae),
            RefType::Object(BinaryName::EXCEPTION)
        );
    }
}
