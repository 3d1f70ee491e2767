//! Renders a syntax tree back to MyPL source.
//!
//! The output re-parses to the same tree: parentheses appear only where the
//! source had a parenthesized term, and every statement gets its own line.

use crate::ast::{Expr, FunDecl, If, RValue, Stmt, StmtList, Term, TypeDecl, VarDecl};
use crate::token::{Token, TokenKind};

const INDENT: &str = "  ";

pub fn print(program: &StmtList) -> String {
    let mut output = String::new();
    emit_block(program, 0, &mut output);
    output
}

fn emit_block(block: &StmtList, indent: usize, output: &mut String) {
    for stmt in &block.stmts {
        emit_statement(stmt, indent, output);
    }
}

fn emit_statement(stmt: &Stmt, indent: usize, output: &mut String) {
    match stmt {
        Stmt::VarDecl(decl) => push_line(output, indent, &emit_var_decl(decl)),
        Stmt::Assign(assign) => {
            let target = join_path(&assign.target.segments);
            let value = emit_expression(&assign.value);
            push_line(output, indent, &format!("set {target} := {value}"));
        }
        Stmt::Return(ret) => match &ret.value {
            Some(value) => push_line(output, indent, &format!("return {}", emit_expression(value))),
            None => push_line(output, indent, "return"),
        },
        Stmt::If(stmt) => emit_if(stmt, indent, output),
        Stmt::While(stmt) => {
            let condition = emit_expression(&stmt.condition);
            push_line(output, indent, &format!("while {condition} do"));
            emit_block(&stmt.body, indent + 1, output);
            push_line(output, indent, "end");
        }
        Stmt::For(stmt) => {
            let start = emit_expression(&stmt.start);
            let end = emit_expression(&stmt.end);
            push_line(
                output,
                indent,
                &format!("for {} := {start} to {end} do", stmt.var.lexeme),
            );
            emit_block(&stmt.body, indent + 1, output);
            push_line(output, indent, "end");
        }
        Stmt::TypeDecl(decl) => emit_type_decl(decl, indent, output),
        Stmt::FunDecl(decl) => emit_fun_decl(decl, indent, output),
        Stmt::Expr(expr) => push_line(output, indent, &emit_expression(expr)),
    }
}

fn emit_var_decl(decl: &VarDecl) -> String {
    let init = emit_expression(&decl.init);
    match &decl.var_type {
        Some(var_type) => format!("var {} {} := {init}", var_type.lexeme, decl.name.lexeme),
        None => format!("var {} := {init}", decl.name.lexeme),
    }
}

fn emit_if(stmt: &If, indent: usize, output: &mut String) {
    let condition = emit_expression(&stmt.if_part.condition);
    push_line(output, indent, &format!("if {condition} then"));
    emit_block(&stmt.if_part.body, indent + 1, output);
    for branch in &stmt.elifs {
        let condition = emit_expression(&branch.condition);
        push_line(output, indent, &format!("elif {condition} then"));
        emit_block(&branch.body, indent + 1, output);
    }
    if let Some(body) = &stmt.else_body {
        push_line(output, indent, "else");
        emit_block(body, indent + 1, output);
    }
    push_line(output, indent, "end");
}

fn emit_type_decl(decl: &TypeDecl, indent: usize, output: &mut String) {
    push_line(output, indent, &format!("type {}", decl.name.lexeme));
    for field in &decl.fields {
        push_line(output, indent + 1, &emit_var_decl(field));
    }
    push_line(output, indent, "end");
}

fn emit_fun_decl(decl: &FunDecl, indent: usize, output: &mut String) {
    let params = decl
        .params
        .iter()
        .map(|param| format!("{} {}", param.param_type.lexeme, param.name.lexeme))
        .collect::<Vec<_>>()
        .join(", ");
    push_line(
        output,
        indent,
        &format!(
            "fun {} {}({params})",
            decl.return_type.lexeme, decl.name.lexeme
        ),
    );
    emit_block(&decl.body, indent + 1, output);
    push_line(output, indent, "end");
}

fn emit_expression(expr: &Expr) -> String {
    let mut rendered = String::new();
    if expr.negated {
        rendered.push_str("not ");
    }
    rendered.push_str(&emit_term(&expr.first));
    if let Some(tail) = &expr.tail {
        rendered.push(' ');
        rendered.push_str(tail.op.symbol());
        rendered.push(' ');
        rendered.push_str(&emit_expression(&tail.rest));
    }
    rendered
}

fn emit_term(term: &Term) -> String {
    match term {
        Term::Simple(rvalue) => emit_rvalue(rvalue),
        Term::Complex(expr) => format!("({})", emit_expression(expr)),
    }
}

fn emit_rvalue(rvalue: &RValue) -> String {
    match rvalue {
        RValue::Literal(token) => emit_literal(token),
        RValue::New(type_name) => format!("new {}", type_name.lexeme),
        RValue::Call { name, args } => {
            let args = args.iter().map(emit_expression).collect::<Vec<_>>();
            format!("{}({})", name.lexeme, args.join(", "))
        }
        RValue::Path(path) => join_path(&path.segments),
        RValue::Neg(expr) => format!("neg {}", emit_expression(expr)),
    }
}

fn emit_literal(token: &Token) -> String {
    match token.kind {
        TokenKind::StringVal => format!("\"{}\"", token.lexeme),
        TokenKind::CharVal => format!("'{}'", token.lexeme),
        _ => token.lexeme.clone(),
    }
}

fn join_path(segments: &[Token]) -> String {
    segments
        .iter()
        .map(|segment| segment.lexeme.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn push_line(output: &mut String, indent: usize, line: &str) {
    for _ in 0..indent {
        output.push_str(INDENT);
    }
    output.push_str(line);
    output.push('\n');
}
