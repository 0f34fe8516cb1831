//! Model of JVM classes and method bodies, as consumed by the analysis
//!
//! This covers names and descriptors, an in-memory class hierarchy ([`class_graph`]) for
//! subtyping queries, and the linear instruction stream of method bodies ([`code`]), which can be
//! read from a textual listing:
//!
//! ```
//! use simanalyzer::jvm::code::{Instruction, Listing};
//! use simanalyzer::jvm::{BinaryName, Name};
//!
//! # fn read_listing() -> Result<(), simanalyzer::jvm::Error> {
//! let listing = Listing::parse(r#"
//!     .class public me/alec/Point
//!     .super java/lang/Object
//!
//!     .method public static origin()I
//!         .limit stack 1
//!         .limit locals 0
//!         iconst_0
//!         ireturn
//!     .end method
//! "#)?;
//!
//! assert_eq!(listing.classes[0].name.as_str(), "me/alec/Point");
//! let origin = listing.method("origin").unwrap();
//! assert_eq!(origin.class, listing.classes[0].name);
//! assert_eq!(origin.instructions, vec![Instruction::IConst0, Instruction::IReturn]);
//! # Ok(())
//! # }
//! # read_listing().unwrap();
//! ```

mod access_flags;
pub mod class_graph;
pub mod code;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
