use std::io::{BufRead, Write};

use crate::ast::StmtList;
use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::parser::parse;
use crate::typechecker::check;

/// Parses and type-checks `source`.
pub fn compile(source: &str) -> Result<StmtList, Error> {
    let program = parse(source)?;
    check(&program)?;
    Ok(program)
}

/// Compiles and runs `source`, returning the program's exit value.
pub fn run_source<R: BufRead, W: Write>(source: &str, input: R, output: W) -> Result<i64, Error> {
    let program = compile(source)?;
    let mut interpreter = Interpreter::with_io(input, output);
    Ok(interpreter.run(&program)?)
}
