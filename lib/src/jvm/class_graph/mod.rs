use super::{BinaryName, ClassAccessFlags, Name};
use elsa::map::FrozenMap;
use elsa::FrozenVec;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

mod assignable;
mod java_classes;

pub use java_classes::*;

pub struct ClassGraphArenas<'g> {
    class_arena: Arena<ClassData<'g>>,
}

impl<'g> ClassGraphArenas<'g> {
    pub fn new() -> Self {
        ClassGraphArenas {
            class_arena: Arena::new(),
        }
    }
}

impl<'g> Default for ClassGraphArenas<'g> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks the inheritance relationships between classes/interfaces
///
/// The graph is append-only: classes can be added through a shared reference, but never removed
/// or modified (apart from pushing extra interfaces). This is what lets the analysis query it
/// freely while a listing is still registering its own declarations.
pub struct ClassGraph<'g> {
    arenas: &'g ClassGraphArenas<'g>,
    classes: FrozenMap<&'g BinaryName, Box<&'g ClassData<'g>>>,
}

impl<'g> ClassGraph<'g> {
    /// New empty graph
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> Self {
        ClassGraph {
            arenas,
            classes: FrozenMap::new(),
        }
    }

    pub fn lookup_class(&self, name: &BinaryName) -> Option<&'g ClassData<'g>> {
        self.classes.get(name).copied()
    }

    /// Add a new class to the class graph
    ///
    /// If a class with the same name is already present, that class is returned instead.
    pub fn add_class(&self, data: ClassData<'g>) -> &'g ClassData<'g> {
        if let Some(existing) = self.lookup_class(&data.name) {
            log::debug!("Class {} is already in the class graph", data.name);
            return existing;
        }
        let data = &*self.arenas.class_arena.alloc(data);
        self.classes.insert(&data.name, Box::new(data));
        data
    }

    /// Add a class by name, resolving its super types in the graph
    ///
    /// Unknown super types get added as placeholder classes directly under `java/lang/Object`
    /// (placeholder interfaces when they are listed as implemented interfaces).
    pub fn declare_class(
        &self,
        name: BinaryName,
        superclass: &BinaryName,
        interfaces: &[BinaryName],
        access_flags: ClassAccessFlags,
    ) -> &'g ClassData<'g> {
        let object = self.object_class();
        let superclass = self.lookup_class(superclass).unwrap_or_else(|| {
            log::warn!(
                "Superclass {} of {} is unknown, assuming it extends Object",
                superclass,
                name
            );
            self.add_class(ClassData::new(
                superclass.clone(),
                object,
                ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            ))
        });
        let class = self.add_class(ClassData::new(name, superclass, access_flags));
        for interface in interfaces {
            let interface = self.lookup_class(interface).unwrap_or_else(|| {
                log::warn!("Interface {} is unknown, assuming it extends nothing", interface);
                self.add_class(ClassData::new(
                    interface.clone(),
                    object,
                    ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE,
                ))
            });
            class.interfaces.push(interface);
        }
        class
    }

    /// `java/lang/Object`, inserting it first if the graph does not yet have it
    fn object_class(&self) -> &'g ClassData<'g> {
        match self.lookup_class(&BinaryName::OBJECT) {
            Some(object) => object,
            None => self.add_class(ClassData::root_object()),
        }
    }

    /// Is this object type throwable?
    pub fn is_throwable(&self, class: &BinaryName) -> bool {
        let mut next_class = self.lookup_class(class);
        while let Some(class) = next_class {
            if class.name == BinaryName::THROWABLE {
                return true;
            }
            next_class = class.superclass;
        }

        false
    }

    /// Add standard types to the class graph
    pub fn insert_java_library_types(&self) -> JavaClasses<'g> {
        JavaClasses::add_to_graph(self)
    }
}

pub struct ClassData<'g> {
    /// Name of the class
    pub name: BinaryName,

    /// Superclass is only ever missing for `java/lang/Object` itself
    pub superclass: Option<&'g ClassData<'g>>,

    /// Interfaces implemented (or super-interfaces)
    pub interfaces: FrozenVec<&'g ClassData<'g>>,

    /// Access flags
    pub access_flags: ClassAccessFlags,
}

impl<'g> ClassData<'g> {
    pub fn new(
        name: BinaryName,
        superclass: &'g ClassData<'g>,
        access_flags: ClassAccessFlags,
    ) -> ClassData<'g> {
        ClassData {
            name,
            superclass: Some(superclass),
            interfaces: FrozenVec::new(),
            access_flags,
        }
    }

    /// `java/lang/Object`, the only class without a superclass
    pub fn root_object() -> ClassData<'g> {
        ClassData {
            name: BinaryName::OBJECT,
            superclass: None,
            interfaces: FrozenVec::new(),
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        }
    }

    /// Is this an interface?
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }
}

impl<'g> PartialEq for ClassData<'g> {
    fn eq(&self, other: &ClassData<'g>) -> bool {
        self.name == other.name
    }
}

impl<'g> Eq for ClassData<'g> {}

impl<'g> std::hash::Hash for ClassData<'g> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl<'g> Debug for ClassData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{FieldType, RefType};

    fn name(name: &str) -> BinaryName {
        BinaryName::from_string(String::from(name)).unwrap()
    }

    #[test]
    fn declared_classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        class_graph.declare_class(
            name("me/Base"),
            &BinaryName::OBJECT,
            &[BinaryName::SERIALIZABLE],
            ClassAccessFlags::PUBLIC,
        );
        class_graph.declare_class(
            name("me/Derived"),
            &name("me/Base"),
            &[],
            ClassAccessFlags::PUBLIC,
        );

        let base = RefType::Object(name("me/Base"));
        let derived = RefType::Object(name("me/Derived"));
        let serializable = RefType::Object(BinaryName::SERIALIZABLE);
        assert!(class_graph.is_java_assignable(&derived, &base), "Derived <: Base");
        assert!(
            class_graph.is_java_assignable(&derived, &serializable),
            "Derived <: Serializable"
        );
        assert!(!class_graph.is_java_assignable(&base, &derived), "Base </: Derived");
    }

    #[test]
    fn unknown_superclass() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);

        let class = class_graph.declare_class(
            name("me/Child"),
            &name("me/Missing"),
            &[name("me/MissingInterface")],
            ClassAccessFlags::PUBLIC,
        );
        let missing = class_graph.lookup_class(&name("me/Missing")).unwrap();
        assert_eq!(class.superclass, Some(missing));
        assert_eq!(missing.superclass.map(|c| &c.name), Some(&BinaryName::OBJECT));
        assert!(class_graph
            .lookup_class(&name("me/MissingInterface"))
            .unwrap()
            .is_interface());
    }

    #[test]
    fn common_super_types() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let integer = RefType::Object(BinaryName::INTEGER);
        let long = RefType::Object(BinaryName::LONG);
        let string = RefType::Object(BinaryName::STRING);
        assert_eq!(
            class_graph.common_super_type(&integer, &long),
            RefType::Object(BinaryName::NUMBER)
        );
        assert_eq!(
            class_graph.common_super_type(&integer, &string),
            RefType::Object(BinaryName::OBJECT)
        );

        let npe = RefType::Object(BinaryName::NULLPOINTEREXCEPTION);
        let arith = RefType::Object(BinaryName::ARITHMETICEXCEPTION);
        assert_eq!(
            class_graph.common_super_type(&npe, &arith),
            RefType::Object(BinaryName::RUNTIMEEXCEPTION)
        );

        let integers = RefType::array(FieldType::object(BinaryName::INTEGER));
        let longs = RefType::array(FieldType::object(BinaryName::LONG));
        assert_eq!(
            class_graph.common_super_type(&integers, &longs),
            RefType::array(FieldType::object(BinaryName::NUMBER))
        );
    }

    #[test]
    fn throwables() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        assert!(class_graph.is_throwable(&BinaryName::IOEXCEPTION));
        assert!(class_graph.is_throwable(&BinaryName::ASSERTIONERROR));
        assert!(!class_graph.is_throwable(&BinaryName::STRING));
    }
}
