//! # forth-lang
//!
//! A Forth-family language toolchain: a compiler that turns word
//! definitions into a linear stack-machine bytecode and a virtual
//! machine that executes that bytecode.
//!
//! Begin by opening a terminal and running the executable.
//! ```text
//! forth> 2 3 + .
//! 5
//! ```
//!
//! Source files are loaded with `use filename.fs` or by passing the
//! filename on the command line. The word `main` is the entry point
//! for compiled programs.

pub mod lang;
pub mod mach;
