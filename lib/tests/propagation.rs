mod common;

use common::*;
use simanalyzer::analysis::{AnalyzerSettings, Number, Value};

const CONCATENATIONS: &str = r#"
.class Demo

.method static consume(Ljava/lang/String;)V
    return
.end method

; Literals loaded in declaration order
.method static linear()V
    .limit stack 3
    .limit locals 2
    ldc "Hello, "
    astore_0
    ldc "World"
    astore_1
    new java/lang/StringBuilder
    dup
    invokespecial java/lang/StringBuilder/<init>()V
    aload_0
    invokevirtual java/lang/StringBuilder/append(Ljava/lang/String;)Ljava/lang/StringBuilder;
    aload_1
    invokevirtual java/lang/StringBuilder/append(Ljava/lang/String;)Ljava/lang/StringBuilder;
    invokevirtual java/lang/StringBuilder/toString()Ljava/lang/String;
    invokestatic Demo/consume(Ljava/lang/String;)V
    return
.end method

; Literals stored out of order, with jumps putting them back in order
.method static jumps()V
    .limit stack 3
    .limit locals 2
    goto Second
First:
    ldc "Hello, "
    astore_0
    goto Build
Second:
    ldc "World"
    astore_1
    goto First
Build:
    new java/lang/StringBuilder
    dup
    aload_0
    invokespecial java/lang/StringBuilder/<init>(Ljava/lang/String;)V
    aload_1
    invokevirtual java/lang/StringBuilder/append(Ljava/lang/String;)Ljava/lang/StringBuilder;
    invokevirtual java/lang/StringBuilder/toString()Ljava/lang/String;
    invokestatic Demo/consume(Ljava/lang/String;)V
    return
.end method

; Literals pushed out of order, with a swap putting them back in order
.method static swaps()V
    .limit stack 4
    .limit locals 2
    new java/lang/StringBuilder
    dup
    invokespecial java/lang/StringBuilder/<init>()V
    ldc "World"
    ldc "Hello, "
    swap
    astore_0
    invokevirtual java/lang/StringBuilder/append(Ljava/lang/String;)Ljava/lang/StringBuilder;
    aload_0
    invokevirtual java/lang/StringBuilder/append(Ljava/lang/String;)Ljava/lang/StringBuilder;
    invokevirtual java/lang/StringBuilder/toString()Ljava/lang/String;
    astore_1
    aload_1
    invokestatic Demo/consume(Ljava/lang/String;)V
    return
.end method

; What javac emits for `fruit + ": " + count + " left"` since Java 9
.method static dynamic()V
    .limit stack 2
    .limit locals 0
    ldc "apples"
    bipush 3
    invokedynamic makeConcatWithConstants(Ljava/lang/String;I)Ljava/lang/String; java/lang/invoke/StringConcatFactory/makeConcatWithConstants "\u0001: \u0001 \u0002" "left"
    invokestatic Demo/consume(Ljava/lang/String;)V
    return
.end method

.method static oversized()V
    .limit stack 3
    .limit locals 0
    new java/lang/StringBuilder
    dup
    invokespecial java/lang/StringBuilder/<init>()V
    dup
    ldc 2147483647
    invokevirtual java/lang/StringBuilder/setLength(I)V
    invokevirtual java/lang/StringBuilder/toString()Ljava/lang/String;
    invokestatic Demo/consume(Ljava/lang/String;)V
    return
.end method

.method static unlinked()V
    .limit stack 2
    .limit locals 0
    ldc "apples"
    invokedynamic describe(Ljava/lang/String;)Ljava/lang/String;
    invokestatic Demo/consume(Ljava/lang/String;)V
    return
.end method
"#;

#[test]
fn linear_concatenation() {
    let frames = analyze(CONCATENATIONS, "linear").unwrap();
    let consumed = frames.top_of_stack(12).expect("consume is reachable");
    assert_eq!(consumed.as_str(), Some("Hello, World"));
    assert!(consumed.is_resolved());

    let builder = frames.stack_from_top(8, 1).expect("append is reachable");
    assert_eq!(builder.as_str(), Some(""), "receiver of the first append");
}

#[test]
fn concatenation_across_jumps() {
    let frames = analyze(CONCATENATIONS, "jumps").unwrap();
    let call = 17;
    let consumed = frames.top_of_stack(call).expect("consume is reachable");
    assert_eq!(consumed.as_str(), Some("Hello, World"));

    let frame = frames.frame(call).unwrap();
    assert_eq!(frame.insn(), Some(call));
    assert_eq!(frame.flow_inputs().iter().copied().collect::<Vec<_>>(), vec![16]);
}

#[test]
fn concatenation_across_swaps() {
    let frames = analyze(CONCATENATIONS, "swaps").unwrap();
    let consumed = frames.top_of_stack(13).expect("consume is reachable");
    assert_eq!(consumed.as_str(), Some("Hello, World"));

    // Everything up to the call contributed, constructor included
    let mut provenance = consumed.provenance().instructions().to_vec();
    provenance.sort_unstable();
    assert_eq!(provenance, (0..13).collect::<Vec<_>>());
    assert_eq!(consumed.provenance().len(), 13);

    let args = frames.stack_arguments(7, 2).expect("append is reachable");
    assert_eq!(args[0].as_str(), Some(""), "builder");
    assert_eq!(args[1].as_str(), Some("Hello, "), "argument");
}

#[test]
fn dynamic_concatenation() {
    let frames = analyze(CONCATENATIONS, "dynamic").unwrap();
    let consumed = frames.top_of_stack(3).expect("consume is reachable");
    assert_eq!(consumed.as_str(), Some("apples: 3 left"));
    assert_eq!(consumed.provenance().instructions(), &[0, 1, 2]);

    let frames = analyze(CONCATENATIONS, "unlinked").unwrap();
    let consumed = frames.top_of_stack(2).expect("consume is reachable");
    assert_eq!(consumed.as_str(), None);
    assert!(consumed.is_reference());
}

#[test]
fn oversized_builders() {
    let frames = analyze(CONCATENATIONS, "oversized").unwrap();
    assert_eq!(frames.top_of_stack(5).unwrap().as_int(), Some(i32::MAX));
    let builder = frames.top_of_stack(6).expect("toString is reachable");
    assert!(!builder.is_resolved(), "builder is no longer simulated");
    let consumed = frames.top_of_stack(7).expect("consume is reachable");
    assert_eq!(consumed.as_str(), None);
}

#[test]
fn without_simulation() {
    let settings = AnalyzerSettings {
        simulate: false,
        ..AnalyzerSettings::default()
    };
    let frames = analyze_with_settings(CONCATENATIONS, "linear", settings).unwrap();
    let consumed = frames.top_of_stack(12).expect("consume is reachable");
    assert_eq!(consumed.as_str(), None);
    assert!(!consumed.is_resolved());
}

const ARITHMETIC: &str = r#"
.class Demo

.method static consume(I)V
    return
.end method

.method static fold()V
    .limit stack 4
    .limit locals 2
    bipush 6
    bipush 7
    imul
    istore_0
    iload_0
    i2l
    bipush 8
    lshl
    l2i
    invokestatic Demo/consume(I)V
    ldc "12345"
    invokestatic java/lang/Integer/parseInt(Ljava/lang/String;)I
    invokestatic Demo/consume(I)V
    return
.end method

.method static loop()V
    .limit stack 2
    .limit locals 1
    iconst_0
    istore_0
Head:
    iload_0
    bipush 10
    if_icmpge Exit
    iinc 0 1
    goto Head
Exit:
    iload_0
    invokestatic Demo/consume(I)V
    return
.end method
"#;

#[test]
fn constant_folding() {
    let frames = analyze(ARITHMETIC, "fold").unwrap();
    assert_eq!(frames.top_of_stack(3), Some(&Value::number(Number::Int(42), 0)));
    assert_eq!(
        frames.top_of_stack(9),
        Some(&Value::number(Number::Int(42 << 8), 0))
    );
    assert_eq!(
        frames.top_of_stack(12),
        Some(&Value::number(Number::Int(12345), 0)),
        "Integer.parseInt is simulated"
    );
}

#[test]
fn loops_converge() {
    let frames = analyze(ARITHMETIC, "loop").unwrap();
    let counter = frames.top_of_stack(10).expect("exit is reachable");
    assert!(counter.is_primitive());
    assert!(!counter.is_resolved(), "counter merged across iterations");
    assert!(
        frames.opaque_jumps().is_empty(),
        "the loop condition is only constant on the first iteration"
    );
}

#[test]
fn subroutines() {
    let frames = analyze(
        r#"
        .class Demo
        .method static subroutine()V
            .limit stack 1
            .limit locals 2
            jsr Sub
            return
        Sub:
            astore_1
            ret 1
        .end method
        "#,
        "subroutine",
    )
    .unwrap();
    assert!(frames.is_reachable(1), "ret returns after the jsr");
    let address = frames.top_of_stack(3).expect("subroutine is reachable");
    assert_eq!(address, &Value::return_address(0));
}
