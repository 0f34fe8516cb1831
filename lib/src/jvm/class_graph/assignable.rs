use super::{ClassData, ClassGraph};
use crate::jvm::{ArrayType, BinaryName, RefType};
use std::cmp::Ordering;
use std::collections::HashSet;

impl<'g> ClassGraph<'g> {
    /// Query if one type is assignable to another
    ///
    /// This matches the semantics of the prolog predicate `isJavaAssignable(sub_type, super_type)`
    /// in the JVM verifier specification. Classes missing from the graph are only assignable to
    /// themselves and to `java/lang/Object`.
    pub fn is_java_assignable(
        &self,
        sub_type: &RefType<BinaryName>,
        super_type: &RefType<BinaryName>,
    ) -> bool {
        if sub_type == super_type {
            return true;
        }
        match (sub_type, super_type) {
            (RefType::PrimitiveArray(_) | RefType::ObjectArray(_), RefType::Object(object)) => {
                is_array_super_type(object)
            }

            // Distinct primitive arrays are never related
            (RefType::PrimitiveArray(_), RefType::PrimitiveArray(_)) => false,

            // `int[][]` is an `Object[]`, but `int[]` is not
            (RefType::PrimitiveArray(arr1), RefType::ObjectArray(arr2)) => {
                arr1.additional_dimensions > arr2.additional_dimensions
                    && is_array_super_type(&arr2.element_type)
            }

            // Arrays are covariant
            (RefType::ObjectArray(arr1), RefType::ObjectArray(arr2)) => {
                match arr1.additional_dimensions.cmp(&arr2.additional_dimensions) {
                    Ordering::Less => false,
                    Ordering::Equal => self.is_subclass(&arr1.element_type, &arr2.element_type),
                    Ordering::Greater => is_array_super_type(&arr2.element_type),
                }
            }

            (RefType::Object(class1), RefType::Object(class2)) => {
                self.is_subclass(class1, class2)
            }

            _ => false,
        }
    }

    /// Is there a path of superclass or interface edges from one class to the other?
    fn is_subclass(&self, sub_class: &BinaryName, super_class: &BinaryName) -> bool {
        if sub_class == super_class || super_class == &BinaryName::OBJECT {
            return true;
        }
        let (sub_class, super_class) =
            match (self.lookup_class(sub_class), self.lookup_class(super_class)) {
                (Some(sub_class), Some(super_class)) => (sub_class, super_class),
                _ => {
                    log::debug!(
                        "Cannot decide {} <: {}, a class is missing from the graph",
                        sub_class,
                        super_class
                    );
                    return false;
                }
            };

        // Classes are never reached through interface edges
        let follow_interfaces = super_class.is_interface();
        let mut to_visit: Vec<&'g ClassData<'g>> = vec![sub_class];
        let mut visited: HashSet<&BinaryName> = HashSet::new();
        visited.insert(&sub_class.name);

        while let Some(class) = to_visit.pop() {
            if class == super_class {
                return true;
            }
            if let Some(superclass) = class.superclass {
                if visited.insert(&superclass.name) {
                    to_visit.push(superclass);
                }
            }
            if follow_interfaces {
                for interface in &class.interfaces {
                    if visited.insert(&interface.name) {
                        to_visit.push(interface);
                    }
                }
            }
        }

        false
    }

    /// Closest superclass that both types are assignable to
    ///
    /// Interfaces are not considered (the answer falls back to `java/lang/Object` whenever only a
    /// shared interface exists), and arrays only share a super type other than `Object` when
    /// their element types do.
    pub fn common_super_type(
        &self,
        type1: &RefType<BinaryName>,
        type2: &RefType<BinaryName>,
    ) -> RefType<BinaryName> {
        if type1 == type2 {
            return type1.clone();
        }
        match (type1, type2) {
            (RefType::Object(class1), RefType::Object(_)) => {
                let mut next_class = self.lookup_class(class1);
                while let Some(class) = next_class {
                    let candidate = RefType::Object(class.name.clone());
                    if self.is_java_assignable(type2, &candidate) {
                        return candidate;
                    }
                    next_class = class.superclass;
                }
            }
            (RefType::ObjectArray(arr1), RefType::ObjectArray(arr2))
                if arr1.additional_dimensions == arr2.additional_dimensions =>
            {
                let element = self.common_super_type(
                    &RefType::Object(arr1.element_type.clone()),
                    &RefType::Object(arr2.element_type.clone()),
                );
                if let RefType::Object(element_type) = element {
                    return RefType::ObjectArray(ArrayType {
                        additional_dimensions: arr1.additional_dimensions,
                        element_type,
                    });
                }
            }
            _ => (),
        }
        log::trace!("{} and {} only share Object", type1, type2);
        RefType::Object(BinaryName::OBJECT)
    }
}

/// Super types of every array
fn is_array_super_type(super_type: &BinaryName) -> bool {
    super_type == &BinaryName::OBJECT
        || super_type == &BinaryName::CLONEABLE
        || super_type == &BinaryName::SERIALIZABLE
}

#[cfg(test)]
mod test {
    use crate::jvm::class_graph::{ClassGraph, ClassGraphArenas};
    use crate::jvm::{BinaryName, FieldType, Name, RefType};

    fn object(name: &BinaryName) -> RefType<BinaryName> {
        RefType::Object(name.clone())
    }

    #[test]
    fn classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        let assignable = [
            (&java.lang.string, &java.lang.object, true),
            (&java.lang.object, &java.lang.string, false),
            (&java.lang.null_pointer_exception, &java.lang.runtime_exception, true),
            (&java.lang.null_pointer_exception, &java.lang.throwable, true),
            (&java.lang.throwable, &java.lang.null_pointer_exception, false),
            (&java.lang.integer, &java.lang.number, true),
            (&java.lang.integer, &java.lang.long, false),
        ];
        for (sub_class, super_class, expected) in assignable {
            assert_eq!(
                class_graph
                    .is_java_assignable(&object(&sub_class.name), &object(&super_class.name)),
                expected,
                "{:?} <: {:?}",
                sub_class,
                super_class
            );
        }
    }

    #[test]
    fn interfaces() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        let builder = object(&java.lang.string_builder.name);
        let print_stream = object(&java.io.print_stream.name);
        assert!(class_graph.is_java_assignable(&builder, &object(&java.lang.appendable.name)));
        assert!(class_graph.is_java_assignable(&builder, &object(&java.lang.char_sequence.name)));
        assert!(
            class_graph.is_java_assignable(&print_stream, &object(&java.lang.auto_closeable.name)),
            "inherited through FilterOutputStream and Closeable"
        );
        assert!(!class_graph.is_java_assignable(&object(&java.io.closeable.name), &print_stream));
    }

    #[test]
    fn arrays() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let ints = RefType::array(FieldType::int());
        let longs = RefType::array(FieldType::long());
        let int_matrix = RefType::array(FieldType::array(FieldType::int()));
        let objects = RefType::array(FieldType::object(BinaryName::OBJECT));
        let integer_matrix =
            RefType::array(FieldType::array(FieldType::object(BinaryName::INTEGER)));
        let number_matrix = RefType::array(FieldType::array(FieldType::object(BinaryName::NUMBER)));

        assert!(class_graph.is_java_assignable(&ints, &object(&BinaryName::OBJECT)));
        assert!(class_graph.is_java_assignable(&ints, &object(&BinaryName::CLONEABLE)));
        assert!(!class_graph.is_java_assignable(&ints, &longs));
        assert!(!class_graph.is_java_assignable(&ints, &objects));
        assert!(class_graph.is_java_assignable(&int_matrix, &objects));
        assert!(class_graph.is_java_assignable(&integer_matrix, &number_matrix));
        assert!(class_graph.is_java_assignable(&integer_matrix, &objects));
        assert!(!class_graph.is_java_assignable(&objects, &integer_matrix));
        assert!(!class_graph.is_java_assignable(&number_matrix, &integer_matrix));
    }

    #[test]
    fn unknown_classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let unknown = RefType::Object(BinaryName::from_string(String::from("me/Unknown")).unwrap());
        assert!(class_graph.is_java_assignable(&unknown, &unknown));
        assert!(class_graph.is_java_assignable(&unknown, &object(&BinaryName::OBJECT)));
        assert!(!class_graph.is_java_assignable(&unknown, &object(&BinaryName::STRING)));
    }
}
