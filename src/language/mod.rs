//! Front end of the compiler: lexing, parsing and the tree passes that turn
//! a script into the final tree handed to code generation.

pub mod ast;
pub mod classify;
pub mod errors;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod roles;
pub mod span;
pub mod token;
pub mod transform;
pub mod validate;
pub mod visit;
