use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};

use mypl::error::Error;
use mypl::interpreter::Interpreter;
use mypl::parser::ParseError;
use mypl::{lexer, parser, pipeline, printer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Check,
    Print,
    Tokens,
}

impl Mode {
    fn from_name(name: &str) -> Result<Self> {
        match name {
            "run" => Ok(Self::Run),
            "check" => Ok(Self::Check),
            "print" => Ok(Self::Print),
            "tokens" => Ok(Self::Tokens),
            _ => bail!("Unknown mode '{name}' (expected run, check, print or tokens)"),
        }
    }
}

fn main() -> Result<ExitCode> {
    let mut args = std::env::args().skip(1);
    let mut mode = Mode::Run;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" | "-m" => {
                let name = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing mode name after {arg}"))?;
                mode = Mode::from_name(&name)?;
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    match mode {
        Mode::Tokens => {
            let tokens =
                lexer::tokenize(&source).map_err(|error| Error::from(ParseError::from(error)))?;
            for token in tokens {
                println!(
                    "{}:{} {:?} {:?}",
                    token.line(),
                    token.column(),
                    token.kind,
                    token.lexeme
                );
            }
        }
        Mode::Print => {
            let program = parser::parse(&source).map_err(Error::from)?;
            print!("{}", printer::print(&program));
        }
        Mode::Check => {
            pipeline::compile(&source)?;
        }
        Mode::Run => {
            let program = pipeline::compile(&source)?;
            let mut interpreter = Interpreter::new();
            let code = interpreter.run(&program).map_err(Error::from)?;
            io::stdout().flush().context("Flushing stdout")?;
            // The exit status carries the program's return value.
            return Ok(ExitCode::from(code as u8));
        }
    }

    Ok(ExitCode::SUCCESS)
}
