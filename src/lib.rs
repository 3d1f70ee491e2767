pub mod ast;
pub mod builtins;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod printer;
pub mod scope;
pub mod token;
pub mod typechecker;
