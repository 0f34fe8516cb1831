mod common;

use common::*;
use simanalyzer::analysis::{AnalyzerErrorKind, AnalyzerSettings, Error, Number, TypeMismatchKind};
use simanalyzer::jvm::{BinaryName, FieldType, RefType};

const ILLEGAL: &str = r#"
.class Demo

.method static longIntoInt()V
    .limit stack 2
    .limit locals 1
    lconst_1
    istore_0
    return
.end method

.method static doubleIntoInt()V
    .limit stack 2
    .limit locals 1
    dconst_1
    istore_0
    return
.end method

.method static longAsInt()I
    .limit stack 1
    .limit locals 2
    lconst_1
    lstore_0
    iload_0
    ireturn
.end method

.method static stringIntoInt()V
    .limit stack 1
    .limit locals 1
    ldc "not a number"
    istore_0
    return
.end method

.method static intIntoReference()V
    .limit stack 1
    .limit locals 1
    iconst_1
    astore_0
    return
.end method

.method static stringAsInteger()I
    .limit stack 1
    .limit locals 1
    ldc "42"
    astore_0
    aload_0
    invokevirtual java/lang/Integer/intValue()I
    ireturn
.end method

.method static mixedArray()V
    .limit stack 3
    .limit locals 0
    iconst_1
    anewarray java/lang/Integer
    iconst_0
    ldc "one"
    aastore
    return
.end method

.method static readsGarbage()I
    .limit stack 1
    .limit locals 2
    iload_1
    ireturn
.end method

.method static wideSwap()V
    .limit stack 4
    .limit locals 0
    lconst_0
    lconst_1
    swap
    return
.end method

.method static wrongReturn()Ljava/lang/String;
    .limit stack 1
    .limit locals 0
    iconst_0
    ireturn
.end method
"#;

fn analyzer_error(method: &str) -> (usize, AnalyzerErrorKind) {
    match analyze(ILLEGAL, method) {
        Err(Error::Analyzer { insn, kind, .. }) => (insn, kind),
        other => panic!("{} should fail with a type error, got {:?}", method, other.map(|_| ())),
    }
}

#[test]
fn illegal_stores() {
    for method in &["longIntoInt", "doubleIntoInt", "stringIntoInt", "intIntoReference"] {
        let (insn, kind) = analyzer_error(method);
        assert_eq!(insn, 1, "{} fails at the store", method);
        assert!(
            matches!(kind, AnalyzerErrorKind::IllegalStore { local: 0, .. }),
            "{} fails with {:?}",
            method,
            kind
        );
    }
}

#[test]
fn other_structural_errors() {
    assert_eq!(
        analyzer_error("readsGarbage"),
        (0, AnalyzerErrorKind::UninitializedLocal(1))
    );
    assert_eq!(analyzer_error("wideSwap"), (2, AnalyzerErrorKind::InvalidWidth(2)));
    assert!(matches!(
        analyzer_error("longAsInt"),
        (2, AnalyzerErrorKind::IllegalLoad { local: 0, .. })
    ));
    assert!(matches!(
        analyzer_error("wrongReturn"),
        (1, AnalyzerErrorKind::UnexpectedType { .. })
    ));
}

#[test]
fn incompatible_receiver() {
    match analyze(ILLEGAL, "stringAsInteger") {
        Err(Error::Unresolved(problem)) => {
            assert_eq!(problem.insn, 3);
            assert_eq!(problem.kind, TypeMismatchKind::InvokeHostType);
        }
        other => panic!("expected an unresolved problem, got {:?}", other.map(|_| ())),
    }

    let lenient = AnalyzerSettings {
        throw_unresolved_problems: false,
        ..AnalyzerSettings::default()
    };
    let frames = analyze_with_settings(ILLEGAL, "stringAsInteger", lenient).unwrap();
    assert_eq!(frames.problems().len(), 1, "problem is kept when lenient");
    assert!(frames.is_reachable(4));
}

#[test]
fn incompatible_array_element() {
    match analyze(ILLEGAL, "mixedArray") {
        Err(Error::Unresolved(problem)) => {
            assert_eq!(problem.insn, 4);
            assert_eq!(problem.kind, TypeMismatchKind::ArrayStore);
        }
        other => panic!("expected an unresolved problem, got {:?}", other.map(|_| ())),
    }
}

const LEGAL: &str = r#"
.class Demo

.method static casts()V
    .limit stack 3
    .limit locals 2
    iconst_2
    iconst_3
    multianewarray [[Ljava/lang/String; 2
    astore_0
    aload_0
    checkcast [[Ljava/lang/Object;
    astore_1
    aload_1
    checkcast [Ljava/lang/Object;
    pop
    aload_1
    checkcast java/lang/Object
    pop
    aload_0
    iconst_0
    aaload
    iconst_1
    aaload
    invokevirtual java/lang/String/length()I
    pop
    return
.end method

.method static intAsLong()J
    .limit stack 2
    .limit locals 2
    iconst_1
    istore_0
    lload_0
    lreturn
.end method

.method static intAsFloat()F
    .limit stack 1
    .limit locals 1
    iconst_2
    istore_0
    fload_0
    freturn
.end method

.method static numbers()V
    .limit stack 4
    .limit locals 1
    iconst_2
    anewarray java/lang/Number
    astore_0
    aload_0
    iconst_0
    iconst_5
    invokestatic java/lang/Integer/valueOf(I)Ljava/lang/Integer;
    aastore
    aload_0
    iconst_1
    aconst_null
    aastore
    return
.end method

.method static find([[II)Z
    .limit stack 3
    .limit locals 4
    iconst_0
    istore_2
Outer:
    iload_2
    aload_0
    arraylength
    if_icmpge NotFound
    iconst_0
    istore_3
Inner:
    iload_3
    aload_0
    iload_2
    aaload
    arraylength
    if_icmpge NextRow
    aload_0
    iload_2
    aaload
    iload_3
    iaload
    iload_1
    if_icmpne Next
    iconst_1
    ireturn
Next:
    iinc 3 1
    goto Inner
NextRow:
    iinc 2 1
    goto Outer
NotFound:
    iconst_0
    ireturn
.end method

.method static sum([J)J
    .limit stack 6
    .limit locals 4
    lconst_0
    lstore_1
    aload_0
    arraylength
    istore_3
Loop:
    iload_3
    ifle Done
    iinc 3 -1
    lload_1
    aload_0
    iload_3
    laload
    ladd
    lstore_1
    goto Loop
Done:
    lload_1
    lreturn
.end method

.method static closes(Ljava/io/Closeable;)V
    .limit stack 2
    .limit locals 3
    .catch java/lang/Throwable from Start to End using Handler
Start:
    aload_0
    invokeinterface java/io/Closeable/close()V
End:
    return
Handler:
    astore_1
    aconst_null
    astore_2
    aload_1
    aload_2
    invokevirtual java/lang/Throwable/addSuppressed(Ljava/lang/Throwable;)V
    aload_1
    athrow
.end method
"#;

#[test]
fn legal_methods() {
    let methods = ["casts", "intAsLong", "intAsFloat", "numbers", "find", "sum", "closes"];
    for method in &methods {
        let result = analyze(LEGAL, method);
        assert!(result.is_ok(), "{} should analyze, got {:?}", method, result.err());
    }
}

#[test]
fn widening_loads() {
    let frames = analyze(LEGAL, "intAsLong").unwrap();
    let long = frames.top_of_stack(3).unwrap();
    assert_eq!(long.as_number(), Some(Number::Long(1)));
    assert_eq!(long.provenance().instructions(), &[0, 1, 2]);

    let frames = analyze(LEGAL, "intAsFloat").unwrap();
    assert_eq!(frames.top_of_stack(3).unwrap().as_number(), Some(Number::Float(2.0)));
}

#[test]
fn array_elements() {
    let frames = analyze(LEGAL, "casts").unwrap();
    let index = frames.top_of_stack(17).expect("second aaload is reachable");
    assert_eq!(index.as_int(), Some(1));
    let row = frames.stack_from_top(17, 1).unwrap();
    let string_array = RefType::array(FieldType::object(BinaryName::STRING));
    assert_eq!(row.ref_type(), Some(&string_array));

    let element = frames.top_of_stack(18).unwrap();
    assert_eq!(element.ref_type(), Some(&RefType::Object(BinaryName::STRING)));
}
