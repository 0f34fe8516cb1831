use bitflags::bitflags;

bitflags! {
    /// Access flags on classes
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

impl ClassAccessFlags {
    /// Look up the flag for a modifier keyword as it appears in a listing
    pub fn from_keyword(keyword: &str) -> Option<ClassAccessFlags> {
        let flag = match keyword {
            "public" => ClassAccessFlags::PUBLIC,
            "final" => ClassAccessFlags::FINAL,
            "super" => ClassAccessFlags::SUPER,
            "interface" => ClassAccessFlags::INTERFACE,
            "abstract" => ClassAccessFlags::ABSTRACT,
            "synthetic" => ClassAccessFlags::SYNTHETIC,
            "annotation" => ClassAccessFlags::ANNOTATION,
            "enum" => ClassAccessFlags::ENUM,
            "module" => ClassAccessFlags::MODULE,
            _ => return None,
        };
        Some(flag)
    }
}

impl MethodAccessFlags {
    /// Look up the flag for a modifier keyword as it appears in a listing
    pub fn from_keyword(keyword: &str) -> Option<MethodAccessFlags> {
        let flag = match keyword {
            "public" => MethodAccessFlags::PUBLIC,
            "private" => MethodAccessFlags::PRIVATE,
            "protected" => MethodAccessFlags::PROTECTED,
            "static" => MethodAccessFlags::STATIC,
            "final" => MethodAccessFlags::FINAL,
            "synchronized" => MethodAccessFlags::SYNCHRONIZED,
            "bridge" => MethodAccessFlags::BRIDGE,
            "varargs" => MethodAccessFlags::VARARGS,
            "native" => MethodAccessFlags::NATIVE,
            "abstract" => MethodAccessFlags::ABSTRACT,
            "strict" => MethodAccessFlags::STRICT,
            "synthetic" => MethodAccessFlags::SYNTHETIC,
            _ => return None,
        };
        Some(flag)
    }

    /// Does the method take an implicit `this` first argument?
    pub fn has_receiver(&self) -> bool {
        !self.contains(MethodAccessFlags::STATIC)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(
            MethodAccessFlags::from_keyword("static"),
            Some(MethodAccessFlags::STATIC)
        );
        assert_eq!(MethodAccessFlags::from_keyword("volatile"), None);
        assert_eq!(
            ClassAccessFlags::from_keyword("interface"),
            Some(ClassAccessFlags::INTERFACE)
        );
        assert!(!(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC).has_receiver());
        assert!(MethodAccessFlags::PUBLIC.has_receiver());
    }
}
