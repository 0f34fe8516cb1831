//! Bytecode representation
//!
//! A method body is a linear sequence of [`Instruction`]s, where labels are pseudo-instructions
//! occupying their own index. [`MethodBody`] resolves the labels, validates the exception table,
//! and computes the raw control flow successors of every instruction. Bodies are usually read
//! from a Jasmin-flavoured textual [`Listing`].

mod instructions;
mod listing;
mod method;

pub use instructions::*;
pub use listing::*;
pub use method::*;
