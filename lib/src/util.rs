/// Number of JVM slots (local variable or operand stack entries) an element occupies
///
/// `long` and `double` take up two slots, everything else takes one.
pub trait Width {
    fn width(&self) -> usize;
}
