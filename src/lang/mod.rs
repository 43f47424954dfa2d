/*!
## Language Module

Lexical analysis for the Forth surface syntax. Source text becomes
word definitions in a `Dictionary`; the machine module compiles and
runs them.

*/

#[macro_use]
mod error;
mod dictionary;
mod lex;
mod sugar;
mod token;

pub use dictionary::Dictionary;
pub use error::Error;
pub use error::ErrorCode;
pub use lex::lex;
pub use lex::SourceLoader;
pub use token::{is_float, is_numeric, is_string};
