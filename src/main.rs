//! # Forth
//!
//! A Forth-family compiler and stack-machine virtual machine.
//!

mod lang;
mod mach;
mod term;

fn main() {
    term::main();
}
