//! Abstract interpretation of JVM method bodies
//!
//! The crate is split in two:
//!
//!   - [`jvm`] models what gets analyzed: names, descriptors, the class hierarchy used to answer
//!     subtyping questions, and the linear instruction stream of a method body (which can be
//!     parsed from a textual listing)
//!
//!   - [`analysis`] is the dataflow engine: it runs a worklist to a fixed point over the
//!     instructions of one method, inferring for every instruction the values held in the local
//!     variables and on the operand stack
//!
//! ```
//! use simanalyzer::analysis::Analyzer;
//! use simanalyzer::jvm::class_graph::{ClassGraph, ClassGraphArenas};
//! use simanalyzer::jvm::code::Listing;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let listing = Listing::parse(
//!     r#"
//!     .class Demo
//!     .method static hello()V
//!         .limit stack 2
//!         .limit locals 0
//!         getstatic java/lang/System/out Ljava/io/PrintStream;
//!         ldc "Hello"
//!         invokevirtual java/io/PrintStream/println(Ljava/lang/String;)V
//!         return
//!     .end method
//!     "#,
//! )?;
//!
//! let arenas = ClassGraphArenas::new();
//! let class_graph = ClassGraph::new(&arenas);
//! class_graph.insert_java_library_types();
//!
//! let method = &listing.methods[0];
//! let frames = Analyzer::new(&class_graph).analyze(method)?;
//! let top = frames.top_of_stack(2).expect("println is reachable");
//! assert_eq!(top.as_str(), Some("Hello"));
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod jvm;
mod util;
