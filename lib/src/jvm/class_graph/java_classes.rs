use super::{BinaryName, ClassAccessFlags, ClassData, ClassGraph};

/// Classes inside `java.*`
pub struct JavaClasses<'g> {
    pub lang: LangClasses<'g>,
    pub io: IoClasses<'g>,
    pub util: UtilClasses<'g>,
}

/// Classes inside `java.lang.*`
pub struct LangClasses<'g> {
    pub object: &'g ClassData<'g>,
    pub cloneable: &'g ClassData<'g>,
    pub comparable: &'g ClassData<'g>,
    pub iterable: &'g ClassData<'g>,
    pub auto_closeable: &'g ClassData<'g>,
    pub appendable: &'g ClassData<'g>,
    pub char_sequence: &'g ClassData<'g>,
    pub string: &'g ClassData<'g>,
    pub abstract_string_builder: &'g ClassData<'g>,
    pub string_builder: &'g ClassData<'g>,
    pub string_buffer: &'g ClassData<'g>,
    pub class: &'g ClassData<'g>,
    pub number: &'g ClassData<'g>,
    pub integer: &'g ClassData<'g>,
    pub long: &'g ClassData<'g>,
    pub short: &'g ClassData<'g>,
    pub byte: &'g ClassData<'g>,
    pub float: &'g ClassData<'g>,
    pub double: &'g ClassData<'g>,
    pub character: &'g ClassData<'g>,
    pub boolean: &'g ClassData<'g>,
    pub math: &'g ClassData<'g>,
    pub system: &'g ClassData<'g>,
    pub invoke: InvokeClasses<'g>,
    pub throwable: &'g ClassData<'g>,
    pub error: &'g ClassData<'g>,
    pub assertion_error: &'g ClassData<'g>,
    pub exception: &'g ClassData<'g>,
    pub runtime_exception: &'g ClassData<'g>,
    pub arithmetic_exception: &'g ClassData<'g>,
    pub class_cast_exception: &'g ClassData<'g>,
    pub illegal_argument_exception: &'g ClassData<'g>,
    pub illegal_state_exception: &'g ClassData<'g>,
    pub index_out_of_bounds_exception: &'g ClassData<'g>,
    pub array_index_out_of_bounds_exception: &'g ClassData<'g>,
    pub null_pointer_exception: &'g ClassData<'g>,
}

/// Classes inside `java.lang.invoke.*`
pub struct InvokeClasses<'g> {
    pub method_type: &'g ClassData<'g>,
    pub method_handle: &'g ClassData<'g>,
    pub call_site: &'g ClassData<'g>,
}

/// Classes inside `java.io.*`
pub struct IoClasses<'g> {
    pub serializable: &'g ClassData<'g>,
    pub closeable: &'g ClassData<'g>,
    pub flushable: &'g ClassData<'g>,
    pub io_exception: &'g ClassData<'g>,
    pub input_stream: &'g ClassData<'g>,
    pub output_stream: &'g ClassData<'g>,
    pub filter_output_stream: &'g ClassData<'g>,
    pub print_stream: &'g ClassData<'g>,
}

/// Classes inside `java.util.*`
pub struct UtilClasses<'g> {
    pub collection: &'g ClassData<'g>,
    pub list: &'g ClassData<'g>,
    pub array_list: &'g ClassData<'g>,
    pub map: &'g ClassData<'g>,
    pub hash_map: &'g ClassData<'g>,
}

const CLASS: ClassAccessFlags = ClassAccessFlags::from_bits_truncate(
    ClassAccessFlags::PUBLIC.bits() | ClassAccessFlags::SUPER.bits(),
);
const FINAL_CLASS: ClassAccessFlags = ClassAccessFlags::from_bits_truncate(
    CLASS.bits() | ClassAccessFlags::FINAL.bits(),
);
const ABSTRACT_CLASS: ClassAccessFlags = ClassAccessFlags::from_bits_truncate(
    CLASS.bits() | ClassAccessFlags::ABSTRACT.bits(),
);
const INTERFACE: ClassAccessFlags = ClassAccessFlags::from_bits_truncate(
    ClassAccessFlags::PUBLIC.bits()
        | ClassAccessFlags::INTERFACE.bits()
        | ClassAccessFlags::ABSTRACT.bits(),
);

impl<'g> JavaClasses<'g> {
    pub fn add_to_graph(class_graph: &ClassGraph<'g>) -> JavaClasses<'g> {
        let object = class_graph.add_class(ClassData::root_object());
        let io_interfaces = IoClasses::add_interfaces(class_graph, object);
        let lang = LangClasses::add_to_graph(class_graph, object, &io_interfaces);
        let io = io_interfaces.add_classes(class_graph, &lang);
        let util = UtilClasses::add_to_graph(class_graph, &lang, &io);

        JavaClasses { lang, io, util }
    }
}

impl<'g> LangClasses<'g> {
    pub fn add_to_graph(
        class_graph: &ClassGraph<'g>,
        object: &'g ClassData<'g>,
        io: &PartialIoClasses<'g>,
    ) -> LangClasses<'g> {
        let add = |name: BinaryName, superclass: &'g ClassData<'g>, flags: ClassAccessFlags| {
            class_graph.add_class(ClassData::new(name, superclass, flags))
        };

        let cloneable = add(BinaryName::CLONEABLE, object, INTERFACE);
        let comparable = add(BinaryName::COMPARABLE, object, INTERFACE);
        let iterable = add(BinaryName::ITERABLE, object, INTERFACE);
        let auto_closeable = add(BinaryName::AUTOCLOSEABLE, object, INTERFACE);
        let appendable = add(BinaryName::APPENDABLE, object, INTERFACE);
        let char_sequence = add(BinaryName::CHARSEQUENCE, object, INTERFACE);

        let string = add(BinaryName::STRING, object, FINAL_CLASS);
        string.interfaces.push(io.serializable);
        string.interfaces.push(comparable);
        string.interfaces.push(char_sequence);

        let abstract_string_builder =
            add(BinaryName::ABSTRACTSTRINGBUILDER, object, ABSTRACT_CLASS);
        abstract_string_builder.interfaces.push(appendable);
        abstract_string_builder.interfaces.push(char_sequence);
        let string_builder = add(BinaryName::STRINGBUILDER, abstract_string_builder, FINAL_CLASS);
        string_builder.interfaces.push(io.serializable);
        string_builder.interfaces.push(char_sequence);
        let string_buffer = add(BinaryName::STRINGBUFFER, abstract_string_builder, FINAL_CLASS);
        string_buffer.interfaces.push(io.serializable);
        string_buffer.interfaces.push(char_sequence);

        let class = add(BinaryName::CLASS, object, FINAL_CLASS);
        class.interfaces.push(io.serializable);

        let number = add(BinaryName::NUMBER, object, ABSTRACT_CLASS);
        number.interfaces.push(io.serializable);
        let boxed = |name: BinaryName, superclass: &'g ClassData<'g>| {
            let class = add(name, superclass, FINAL_CLASS);
            class.interfaces.push(io.serializable);
            class.interfaces.push(comparable);
            class
        };
        let integer = boxed(BinaryName::INTEGER, number);
        let long = boxed(BinaryName::LONG, number);
        let short = boxed(BinaryName::SHORT, number);
        let byte = boxed(BinaryName::BYTE, number);
        let float = boxed(BinaryName::FLOAT, number);
        let double = boxed(BinaryName::DOUBLE, number);
        let character = boxed(BinaryName::CHARACTER, object);
        let boolean = boxed(BinaryName::BOOLEAN, object);

        let math = add(BinaryName::MATH, object, FINAL_CLASS);
        let system = add(BinaryName::SYSTEM, object, FINAL_CLASS);
        let invoke = InvokeClasses::add_to_graph(class_graph, object);

        let throwable = add(BinaryName::THROWABLE, object, CLASS);
        throwable.interfaces.push(io.serializable);
        let error = add(BinaryName::ERROR, throwable, CLASS);
        let assertion_error = add(BinaryName::ASSERTIONERROR, error, CLASS);
        let exception = add(BinaryName::EXCEPTION, throwable, CLASS);
        let runtime_exception = add(BinaryName::RUNTIMEEXCEPTION, exception, CLASS);
        let arithmetic_exception = add(BinaryName::ARITHMETICEXCEPTION, runtime_exception, CLASS);
        let class_cast_exception = add(BinaryName::CLASSCASTEXCEPTION, runtime_exception, CLASS);
        let illegal_argument_exception =
            add(BinaryName::ILLEGALARGUMENTEXCEPTION, runtime_exception, CLASS);
        let illegal_state_exception =
            add(BinaryName::ILLEGALSTATEEXCEPTION, runtime_exception, CLASS);
        let index_out_of_bounds_exception =
            add(BinaryName::INDEXOUTOFBOUNDSEXCEPTION, runtime_exception, CLASS);
        let array_index_out_of_bounds_exception = add(
            BinaryName::ARRAYINDEXOUTOFBOUNDSEXCEPTION,
            index_out_of_bounds_exception,
            CLASS,
        );
        let null_pointer_exception =
            add(BinaryName::NULLPOINTEREXCEPTION, runtime_exception, CLASS);

        LangClasses {
            object,
            cloneable,
            comparable,
            iterable,
            auto_closeable,
            appendable,
            char_sequence,
            string,
            abstract_string_builder,
            string_builder,
            string_buffer,
            class,
            number,
            integer,
            long,
            short,
            byte,
            float,
            double,
            character,
            boolean,
            math,
            system,
            invoke,
            throwable,
            error,
            assertion_error,
            exception,
            runtime_exception,
            arithmetic_exception,
            class_cast_exception,
            illegal_argument_exception,
            illegal_state_exception,
            index_out_of_bounds_exception,
            array_index_out_of_bounds_exception,
            null_pointer_exception,
        }
    }
}

impl<'g> InvokeClasses<'g> {
    pub fn add_to_graph(
        class_graph: &ClassGraph<'g>,
        object: &'g ClassData<'g>,
    ) -> InvokeClasses<'g> {
        let method_type = class_graph.add_class(ClassData::new(
            BinaryName::METHODTYPE,
            object,
            FINAL_CLASS,
        ));
        let method_handle = class_graph.add_class(ClassData::new(
            BinaryName::METHODHANDLE,
            object,
            ABSTRACT_CLASS,
        ));
        let call_site = class_graph.add_class(ClassData::new(
            BinaryName::CALLSITE,
            object,
            ABSTRACT_CLASS,
        ));

        InvokeClasses {
            method_type,
            method_handle,
            call_site,
        }
    }
}

/// The `java.io` interfaces `java.lang` depends on
///
/// `java.lang.String` is `Serializable` while `java.io.PrintStream` is an `Appendable`, so the two
/// packages get added in an interleaved fashion.
pub struct PartialIoClasses<'g> {
    pub serializable: &'g ClassData<'g>,
    pub flushable: &'g ClassData<'g>,
}

impl<'g> IoClasses<'g> {
    fn add_interfaces(
        class_graph: &ClassGraph<'g>,
        object: &'g ClassData<'g>,
    ) -> PartialIoClasses<'g> {
        let serializable =
            class_graph.add_class(ClassData::new(BinaryName::SERIALIZABLE, object, INTERFACE));
        let flushable =
            class_graph.add_class(ClassData::new(BinaryName::FLUSHABLE, object, INTERFACE));
        PartialIoClasses {
            serializable,
            flushable,
        }
    }
}

impl<'g> PartialIoClasses<'g> {
    fn add_classes(&self, class_graph: &ClassGraph<'g>, lang: &LangClasses<'g>) -> IoClasses<'g> {
        let add = |name: BinaryName, superclass: &'g ClassData<'g>, flags: ClassAccessFlags| {
            class_graph.add_class(ClassData::new(name, superclass, flags))
        };

        let closeable = add(BinaryName::CLOSEABLE, lang.object, INTERFACE);
        closeable.interfaces.push(lang.auto_closeable);
        let io_exception = add(BinaryName::IOEXCEPTION, lang.exception, CLASS);
        let input_stream = add(BinaryName::INPUTSTREAM, lang.object, ABSTRACT_CLASS);
        input_stream.interfaces.push(closeable);
        let output_stream = add(BinaryName::OUTPUTSTREAM, lang.object, ABSTRACT_CLASS);
        output_stream.interfaces.push(closeable);
        output_stream.interfaces.push(self.flushable);
        let filter_output_stream = add(BinaryName::FILTEROUTPUTSTREAM, output_stream, CLASS);
        let print_stream = add(BinaryName::PRINTSTREAM, filter_output_stream, CLASS);
        print_stream.interfaces.push(lang.appendable);
        print_stream.interfaces.push(closeable);

        IoClasses {
            serializable: self.serializable,
            closeable,
            flushable: self.flushable,
            io_exception,
            input_stream,
            output_stream,
            filter_output_stream,
            print_stream,
        }
    }
}

impl<'g> UtilClasses<'g> {
    pub fn add_to_graph(
        class_graph: &ClassGraph<'g>,
        lang: &LangClasses<'g>,
        io: &IoClasses<'g>,
    ) -> UtilClasses<'g> {
        let add = |name: BinaryName, superclass: &'g ClassData<'g>, flags: ClassAccessFlags| {
            class_graph.add_class(ClassData::new(name, superclass, flags))
        };

        let collection = add(BinaryName::COLLECTION, lang.object, INTERFACE);
        collection.interfaces.push(lang.iterable);
        let list = add(BinaryName::LIST, lang.object, INTERFACE);
        list.interfaces.push(collection);
        let array_list = add(BinaryName::ARRAYLIST, lang.object, CLASS);
        array_list.interfaces.push(list);
        array_list.interfaces.push(lang.cloneable);
        array_list.interfaces.push(io.serializable);
        let map = add(BinaryName::MAP, lang.object, INTERFACE);
        let hash_map = add(BinaryName::HASHMAP, lang.object, CLASS);
        hash_map.interfaces.push(map);
        hash_map.interfaces.push(lang.cloneable);
        hash_map.interfaces.push(io.serializable);

        UtilClasses {
            collection,
            list,
            array_list,
            map,
            hash_map,
        }
    }
}
