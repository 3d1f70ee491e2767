//! Tree-walking evaluator.
//!
//! Statements return a [`Signal`]; a `return` travels up as
//! `Signal::Return` until a call boundary (or the top level) takes it.
//! Faults travel separately as [`RuntimeError`].

use std::io::{self, BufRead, Write};

use rustc_hash::FxHashMap;

use crate::ast::{Expr, For, FunDecl, If, Path, RValue, Stmt, StmtList, Term, TypeDecl};
use crate::builtins::BuiltinFunction;
use crate::scope::{EnvId, ScopeTable};
use crate::token::{Token, TokenKind};

mod error;
mod heap;
mod value;

pub use error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
pub use heap::{Heap, ObjectId};
pub use value::Value;

/// Nested user calls and `new` expressions allowed before the run is
/// aborted.
pub const MAX_CALL_DEPTH: usize = 256;

/// Control-flow marker for statement execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Continue,
    Return(Value),
}

/// What a name is bound to at run time. Declarations remember the frame
/// they were made in so their bodies resolve names there.
#[derive(Debug, Clone)]
enum Binding<'a> {
    Value(Value),
    Type { env: EnvId, decl: &'a TypeDecl },
    Function { env: EnvId, decl: &'a FunDecl },
}

pub struct Interpreter<'a, R, W> {
    scope: ScopeTable<Binding<'a>>,
    heap: Heap,
    call_depth: usize,
    input: R,
    output: W,
}

impl<'a> Interpreter<'a, io::StdinLock<'static>, io::Stdout> {
    pub fn new() -> Self {
        Self::with_io(io::stdin().lock(), io::stdout())
    }
}

impl Default for Interpreter<'_, io::StdinLock<'static>, io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R: BufRead, W: Write> Interpreter<'a, R, W> {
    pub fn with_io(input: R, output: W) -> Self {
        Self {
            scope: ScopeTable::new(),
            heap: Heap::default(),
            call_depth: 0,
            input,
            output,
        }
    }

    /// Runs a checked program and returns its exit value: the top-level
    /// `return` value, or 0 when the program falls through or returns nil.
    pub fn run(&mut self, program: &'a StmtList) -> RuntimeResult<i64> {
        self.scope = ScopeTable::new();
        self.heap = Heap::default();
        self.call_depth = 0;

        match self.exec_block(program)? {
            Signal::Return(Value::Int(code)) => Ok(code),
            Signal::Return(_) | Signal::Continue => Ok(0),
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn exec_block(&mut self, block: &'a StmtList) -> RuntimeResult<Signal> {
        self.scope.push_environment();
        let result = self.exec_stmts(&block.stmts);
        self.scope.pop_environment();
        result
    }

    fn exec_stmts(&mut self, stmts: &'a [Stmt]) -> RuntimeResult<Signal> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Signal::Continue => {}
                signal @ Signal::Return(_) => return Ok(signal),
            }
        }
        Ok(Signal::Continue)
    }

    fn exec_stmt(&mut self, stmt: &'a Stmt) -> RuntimeResult<Signal> {
        match stmt {
            Stmt::VarDecl(decl) => {
                let value = self.eval_expr(&decl.init)?;
                self.scope
                    .add_name(decl.name.lexeme.as_str(), Binding::Value(value));
                Ok(Signal::Continue)
            }
            Stmt::Assign(assign) => {
                let value = self.eval_expr(&assign.value)?;
                self.assign_path(&assign.target, value)?;
                Ok(Signal::Continue)
            }
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                if self.call_depth == 0 && !matches!(value, Value::Int(_) | Value::Nil) {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::NonIntegerExit(value.kind_name()),
                        &ret.keyword,
                    ));
                }
                Ok(Signal::Return(value))
            }
            Stmt::If(stmt) => self.exec_if(stmt),
            Stmt::While(stmt) => {
                while self.eval_condition(&stmt.condition)? {
                    if let signal @ Signal::Return(_) = self.exec_block(&stmt.body)? {
                        return Ok(signal);
                    }
                }
                Ok(Signal::Continue)
            }
            Stmt::For(stmt) => self.exec_for(stmt),
            Stmt::TypeDecl(decl) => {
                let env = self.scope.pin_environment();
                self.scope
                    .add_name(decl.name.lexeme.as_str(), Binding::Type { env, decl });
                Ok(Signal::Continue)
            }
            Stmt::FunDecl(decl) => {
                let env = self.scope.pin_environment();
                self.scope
                    .add_name(decl.name.lexeme.as_str(), Binding::Function { env, decl });
                Ok(Signal::Continue)
            }
            Stmt::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Signal::Continue)
            }
        }
    }

    fn exec_if(&mut self, stmt: &'a If) -> RuntimeResult<Signal> {
        for branch in std::iter::once(&stmt.if_part).chain(&stmt.elifs) {
            if self.eval_condition(&branch.condition)? {
                return self.exec_block(&branch.body);
            }
        }
        match &stmt.else_body {
            Some(body) => self.exec_block(body),
            None => Ok(Signal::Continue),
        }
    }

    /// Inclusive in both directions; counts down when `start > end`. The
    /// counter is kept apart from the loop variable, so assigning to the
    /// variable in the body does not change the iteration.
    fn exec_for(&mut self, stmt: &'a For) -> RuntimeResult<Signal> {
        let start = self.eval_int(&stmt.start)?;
        let end = self.eval_int(&stmt.end)?;
        let step = if start > end { -1 } else { 1 };

        self.scope.push_environment();
        let mut counter = start;
        let result = loop {
            self.scope
                .add_name(stmt.var.lexeme.as_str(), Binding::Value(Value::Int(counter)));
            match self.exec_block(&stmt.body) {
                Ok(Signal::Continue) => {}
                other => break other,
            }
            if counter == end {
                break Ok(Signal::Continue);
            }
            counter += step;
        };
        self.scope.pop_environment();
        result
    }

    fn eval_condition(&mut self, expr: &'a Expr) -> RuntimeResult<bool> {
        match self.eval_expr(expr)? {
            Value::Bool(value) => Ok(value),
            other => Err(RuntimeError::new(
                RuntimeErrorKind::InvalidOperand {
                    op: "condition".to_string(),
                    found: other.kind_name(),
                },
                expr.first_token(),
            )),
        }
    }

    fn eval_int(&mut self, expr: &'a Expr) -> RuntimeResult<i64> {
        match self.eval_expr(expr)? {
            Value::Int(value) => Ok(value),
            other => Err(RuntimeError::new(
                RuntimeErrorKind::InvalidOperand {
                    op: "for".to_string(),
                    found: other.kind_name(),
                },
                expr.first_token(),
            )),
        }
    }

    fn eval_expr(&mut self, expr: &'a Expr) -> RuntimeResult<Value> {
        let first = self.eval_term(&expr.first)?;
        let value = match &expr.tail {
            Some(tail) => {
                let rest = self.eval_expr(&tail.rest)?;
                Value::binary(tail.op, first, rest)
                    .map_err(|kind| RuntimeError::new(kind, &tail.op_token))?
            }
            None => first,
        };
        Ok(match value {
            Value::Bool(value) if expr.negated => Value::Bool(!value),
            value => value,
        })
    }

    fn eval_term(&mut self, term: &'a Term) -> RuntimeResult<Value> {
        match term {
            Term::Simple(rvalue) => self.eval_rvalue(rvalue),
            Term::Complex(expr) => self.eval_expr(expr),
        }
    }

    fn eval_rvalue(&mut self, rvalue: &'a RValue) -> RuntimeResult<Value> {
        match rvalue {
            RValue::Literal(token) => literal_value(token),
            RValue::New(type_name) => self.instantiate(type_name),
            RValue::Call { name, args } => self.eval_call(name, args),
            RValue::Path(path) => self.lookup(path.first(), &path.segments[1..]),
            RValue::Neg(expr) => self
                .eval_expr(expr)?
                .negate()
                .map_err(|kind| RuntimeError::new(kind, expr.first_token())),
        }
    }

    /// Evaluates field initializers in the type's declaration frame, in
    /// order, so later fields can read earlier ones.
    fn instantiate(&mut self, type_name: &'a Token) -> RuntimeResult<Value> {
        let (env, decl) = match self.scope.get_info(&type_name.lexeme) {
            Some(&Binding::Type { env, decl }) => (env, decl),
            Some(_) => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::NotAType(type_name.lexeme.clone()),
                    type_name,
                ));
            }
            None => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedName(type_name.lexeme.clone()),
                    type_name,
                ));
            }
        };

        // Field initializers may themselves say `new`, so this nests like a call.
        self.check_depth(type_name)?;
        let caller = self.scope.environment_id();
        self.scope.set_environment_id(env);
        self.scope.push_environment();
        self.call_depth += 1;
        let fields = self.eval_fields(decl);
        self.call_depth -= 1;
        self.scope.pop_environment();
        self.scope.set_environment_id(caller);

        Ok(Value::Object(self.heap.allocate(fields?)))
    }

    fn eval_fields(&mut self, decl: &'a TypeDecl) -> RuntimeResult<FxHashMap<String, Value>> {
        let mut fields = FxHashMap::default();
        for field in &decl.fields {
            let value = self.eval_expr(&field.init)?;
            self.scope
                .add_name(field.name.lexeme.as_str(), Binding::Value(value.clone()));
            fields.insert(field.name.lexeme.clone(), value);
        }
        Ok(fields)
    }

    fn check_depth(&self, at: &Token) -> RuntimeResult<()> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new(
                RuntimeErrorKind::CallDepthExceeded {
                    limit: MAX_CALL_DEPTH,
                },
                at,
            ));
        }
        Ok(())
    }

    fn eval_call(&mut self, name: &'a Token, args: &'a [Expr]) -> RuntimeResult<Value> {
        if let Some(builtin) = BuiltinFunction::from_name(&name.lexeme) {
            return self.call_builtin(builtin, name, args);
        }

        let (env, decl) = match self.scope.get_info(&name.lexeme) {
            Some(&Binding::Function { env, decl }) => (env, decl),
            Some(_) => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::NotCallable(name.lexeme.clone()),
                    name,
                ));
            }
            None => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedName(name.lexeme.clone()),
                    name,
                ));
            }
        };
        if args.len() != decl.params.len() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::ArityMismatch {
                    name: name.lexeme.clone(),
                    expected: decl.params.len(),
                    found: args.len(),
                },
                name,
            ));
        }
        self.check_depth(name)?;

        // Arguments are evaluated in the caller's frame before switching.
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }

        let caller = self.scope.environment_id();
        self.scope.set_environment_id(env);
        self.scope.push_environment();
        for (param, value) in decl.params.iter().zip(values) {
            self.scope
                .add_name(param.name.lexeme.as_str(), Binding::Value(value));
        }
        self.call_depth += 1;
        let result = self.exec_block(&decl.body);
        self.call_depth -= 1;
        self.scope.pop_environment();
        self.scope.set_environment_id(caller);

        match result? {
            Signal::Return(value) => Ok(value),
            Signal::Continue => Ok(Value::Nil),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: BuiltinFunction,
        name: &'a Token,
        args: &'a [Expr],
    ) -> RuntimeResult<Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.eval_expr(arg)?;
            if value == Value::Nil {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::NilArgument {
                        function: builtin.name().to_string(),
                    },
                    arg.first_token(),
                ));
            }
            values.push(value);
        }
        if values.len() != builtin.arity() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::ArityMismatch {
                    name: builtin.name().to_string(),
                    expected: builtin.arity(),
                    found: values.len(),
                },
                name,
            ));
        }

        let fail = |kind| RuntimeError::new(kind, name);
        match (builtin, values.as_slice()) {
            (BuiltinFunction::Print, [Value::Str(text)]) => {
                let text = text.replace("\\n", "\n").replace("\\t", "\t");
                self.output
                    .write_all(text.as_bytes())
                    .and_then(|()| self.output.flush())
                    .map_err(|error| fail(RuntimeErrorKind::Io(error.to_string())))?;
                Ok(Value::Nil)
            }
            (BuiltinFunction::Read, []) => Ok(self.read_line()),
            (BuiltinFunction::Length, [Value::Str(text)]) => {
                Ok(Value::Int(text.chars().count() as i64))
            }
            (BuiltinFunction::Get, [Value::Int(index), Value::Str(text)]) => {
                let len = text.chars().count();
                usize::try_from(*index)
                    .ok()
                    .and_then(|at| text.chars().nth(at))
                    .map(|ch| Value::Str(ch.to_string()))
                    .ok_or_else(|| {
                        fail(RuntimeErrorKind::IndexOutOfBounds { index: *index, len })
                    })
            }
            (BuiltinFunction::Concat | BuiltinFunction::Append, [Value::Str(a), Value::Str(b)]) => {
                Ok(Value::Str(format!("{a}{b}")))
            }
            (BuiltinFunction::Itos, [value @ Value::Int(_)])
            | (BuiltinFunction::Dtos, [value @ Value::Double(_)]) => {
                Ok(Value::Str(value.to_string()))
            }
            (BuiltinFunction::Stoi, [Value::Str(text)]) => text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| fail(RuntimeErrorKind::InvalidInteger(text.clone()))),
            (BuiltinFunction::Stod, [Value::Str(text)]) => text
                .trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| fail(RuntimeErrorKind::InvalidDouble(text.clone()))),
            (_, values) => Err(fail(RuntimeErrorKind::InvalidArgument {
                function: builtin.name().to_string(),
                found: values.first().map_or("nothing", Value::kind_name),
            })),
        }
    }

    /// One line without its terminator; nil at end of input or on failure.
    fn read_line(&mut self) -> Value {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => Value::Nil,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Value::Str(line)
            }
        }
    }

    /// Reads a variable, following field names through the heap.
    fn lookup(&self, first: &Token, fields: &[Token]) -> RuntimeResult<Value> {
        let mut value = match self.scope.get_info(&first.lexeme) {
            Some(Binding::Value(value)) => value.clone(),
            Some(_) => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::NotAValue(first.lexeme.clone()),
                    first,
                ));
            }
            None => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedName(first.lexeme.clone()),
                    first,
                ));
            }
        };

        let mut owner = first;
        for field in fields {
            let id = object_id(&value, owner)?;
            value = self.heap.field(id, &field.lexeme).cloned().ok_or_else(|| {
                RuntimeError::new(RuntimeErrorKind::UnknownField(field.lexeme.clone()), field)
            })?;
            owner = field;
        }
        Ok(value)
    }

    fn assign_path(&mut self, path: &Path, value: Value) -> RuntimeResult<()> {
        let (last, prefix) = path.segments.split_at(path.segments.len() - 1);
        let last = &last[0];

        let [first, fields @ ..] = prefix else {
            return match self.scope.get_info_mut(&last.lexeme) {
                Some(slot @ Binding::Value(_)) => {
                    *slot = Binding::Value(value);
                    Ok(())
                }
                Some(_) => Err(RuntimeError::new(
                    RuntimeErrorKind::NotAValue(last.lexeme.clone()),
                    last,
                )),
                None => Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedName(last.lexeme.clone()),
                    last,
                )),
            };
        };

        let owner = fields.last().unwrap_or(first);
        let id = object_id(&self.lookup(first, fields)?, owner)?;
        match self.heap.field_mut(id, &last.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::new(
                RuntimeErrorKind::UnknownField(last.lexeme.clone()),
                last,
            )),
        }
    }
}

fn object_id(value: &Value, owner: &Token) -> RuntimeResult<ObjectId> {
    match value {
        Value::Object(id) => Ok(*id),
        Value::Nil => Err(RuntimeError::new(
            RuntimeErrorKind::NilDereference(owner.lexeme.clone()),
            owner,
        )),
        _ => Err(RuntimeError::new(
            RuntimeErrorKind::NotAnObject(owner.lexeme.clone()),
            owner,
        )),
    }
}

fn literal_value(token: &Token) -> RuntimeResult<Value> {
    match token.kind {
        TokenKind::IntVal => token
            .lexeme
            .parse()
            .map(Value::Int)
            .map_err(|_| {
                RuntimeError::new(RuntimeErrorKind::InvalidInteger(token.lexeme.clone()), token)
            }),
        TokenKind::DoubleVal => token
            .lexeme
            .parse()
            .map(Value::Double)
            .map_err(|_| {
                RuntimeError::new(RuntimeErrorKind::InvalidDouble(token.lexeme.clone()), token)
            }),
        TokenKind::BoolVal => Ok(Value::Bool(token.lexeme == "true")),
        TokenKind::CharVal | TokenKind::StringVal => Ok(Value::Str(token.lexeme.clone())),
        _ => Ok(Value::Nil),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::typechecker::check;
    use indoc::indoc;

    struct Outcome {
        result: RuntimeResult<i64>,
        output: String,
    }

    fn run_with_input(source: &str, input: &str) -> Outcome {
        let program = parse(source).expect("parse failed");
        check(&program).expect("type check failed");
        let mut interpreter = Interpreter::with_io(input.as_bytes(), Vec::new());
        let result = interpreter.run(&program);
        let output = String::from_utf8(interpreter.into_output()).expect("utf-8 output");
        Outcome { result, output }
    }

    fn run(source: &str) -> Outcome {
        run_with_input(source, "")
    }

    fn exit_code(source: &str) -> i64 {
        run(source).result.expect("run failed")
    }

    fn runtime_error(source: &str) -> RuntimeError {
        run(source).result.expect_err("expected runtime error")
    }

    #[test]
    fn operators_are_right_associative() {
        let source = indoc! {"
            var a := 10
            var b := 3
            var c := 2
            return a - b - c
        "};
        assert_eq!(exit_code(source), 9);
    }

    #[test]
    fn falls_through_to_zero() {
        assert_eq!(exit_code("var x := 1"), 0);
        assert_eq!(exit_code("return"), 0);
        assert_eq!(exit_code("var x int := nil return x"), 0);
    }

    #[test]
    fn return_unwinds_nested_blocks() {
        let source = indoc! {r#"
            fun int find(int target)
              for i := 1 to 10 do
                while true do
                  if i = target then
                    return i * 100
                  end
                  print("never twice")
                  return 0
                end
              end
              return neg 1
            end
            return find(1)
        "#};
        let outcome = run(source);
        assert_eq!(outcome.result, Ok(100));
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn division_by_zero_is_an_error_for_both_kinds() {
        let error = runtime_error("var x := 1 / 0");
        assert_eq!(error.kind, RuntimeErrorKind::DivisionByZero);
        assert_eq!((error.line, error.column), (1, 12));
        assert_eq!(
            runtime_error("var x := 1.5 / 0.0").kind,
            RuntimeErrorKind::DivisionByZero
        );
        assert_eq!(
            runtime_error("var x := 4 % 0").kind,
            RuntimeErrorKind::ModuloByZero
        );
    }

    #[test]
    fn typed_nil_stays_nil_until_assigned() {
        let source = indoc! {"
            var x int := nil
            var was_nil := x = nil
            set x := 4
            if was_nil and (x = 4) then
              return x
            end
            return 1
        "};
        assert_eq!(exit_code(source), 4);
    }

    #[test]
    fn objects_are_aliased() {
        let source = indoc! {"
            type T
              var f int := 0
            end
            var a := new T()
            var b := a
            set b.f := 5
            return a.f
        "};
        assert_eq!(exit_code(source), 5);
    }

    #[test]
    fn fields_initialize_in_order_in_declaration_scope() {
        let source = indoc! {"
            var base := 10
            type Pair
              var int first := base
              var int second := first * 2
            end
            fun int make()
              var base := 1000
              var p := new Pair
              return p.second
            end
            return make()
        "};
        assert_eq!(exit_code(source), 20);
    }

    #[test]
    fn nested_field_assignment_walks_the_heap() {
        let source = indoc! {"
            type Node
              var int value := 0
              var Node next := nil
            end
            var head := new Node
            set head.next := new Node
            set head.next.value := 7
            var alias := head.next
            return alias.value
        "};
        assert_eq!(exit_code(source), 7);
    }

    #[test]
    fn nil_dereference_is_reported() {
        let source = indoc! {"
            type Node
              var Node next := nil
              var int value := 0
            end
            var head := new Node
            return head.next.value
        "};
        let error = runtime_error(source);
        assert_eq!(error.kind, RuntimeErrorKind::NilDereference("next".to_string()));
        assert_eq!(error.line, 6);
    }

    #[test]
    fn for_loops_run_inclusive_in_both_directions() {
        let source = indoc! {r#"
            for i := 5 to 1 do
              print(itos(i))
            end
            print(" ")
            for i := 1 to 3 do
              print(itos(i))
              set i := 100
            end
            for i := 2 to 2 do
              print("!")
            end
        "#};
        let outcome = run(source);
        assert_eq!(outcome.result, Ok(0));
        assert_eq!(outcome.output, "54321 123!");
    }

    #[test]
    fn if_runs_only_first_matching_branch() {
        let source = indoc! {r#"
            var x := 2
            if x = 1 then
              print("one")
            elif x > 1 then
              print("first")
            elif x = 2 then
              print("second")
            else
              print("else")
            end
            if false then
              print("no")
            else
              print("-else")
            end
        "#};
        assert_eq!(run(source).output, "first-else");
    }

    #[test]
    fn recursion_resolves_names_in_declaration_scope() {
        let source = indoc! {"
            var depth := 0
            fun int fib(int n)
              if n < 2 then
                return n
              end
              return fib(n - 1) + fib(n - 2)
            end
            fun int shadow()
              var n := 99
              var depth := 50
              return fib(10)
            end
            return shadow()
        "};
        assert_eq!(exit_code(source), 55);
    }

    #[test]
    fn functions_see_globals_not_caller_locals() {
        let source = indoc! {"
            var x := 1
            fun int read_x()
              return x
            end
            fun int caller()
              var x := 2
              return read_x()
            end
            return caller()
        "};
        assert_eq!(exit_code(source), 1);
    }

    #[test]
    fn function_without_return_yields_nil() {
        let source = indoc! {r#"
            fun nil hello()
              print("hi")
            end
            var r := hello() = nil
            if r then
              return 3
            end
        "#};
        let outcome = run(source);
        assert_eq!(outcome.result, Ok(3));
        assert_eq!(outcome.output, "hi");
    }

    #[test]
    fn get_is_bounds_checked() {
        let outcome = run(indoc! {r#"
            var c := get(1, "ab")
            print(append("", c))
        "#});
        assert_eq!(outcome.output, "b");
        assert_eq!(
            runtime_error(r#"var c := get(3, "ab")"#).kind,
            RuntimeErrorKind::IndexOutOfBounds { index: 3, len: 2 }
        );
        assert!(matches!(
            runtime_error(r#"var c := get(neg 1, "ab")"#).kind,
            RuntimeErrorKind::IndexOutOfBounds { index: -1, .. }
        ));
    }

    #[test]
    fn string_builtins() {
        let source = indoc! {r#"
            var s := concat("ab", "cd")
            set s := append(s, 'e')
            print(s)
            print("\t|\n")
            print(itos(length(s)))
            print(dtos(2.0))
            print(dtos(stod(" 1.25 ")))
            return stoi("42")
        "#};
        let outcome = run(source);
        assert_eq!(outcome.result, Ok(42));
        assert_eq!(outcome.output, "abcde\t|\n52.01.25");
    }

    #[test]
    fn conversion_failures_are_runtime_errors() {
        assert_eq!(
            runtime_error(r#"var n := stoi("4x")"#).kind,
            RuntimeErrorKind::InvalidInteger("4x".to_string())
        );
        assert_eq!(
            runtime_error(r#"var d := stod("abc")"#).kind,
            RuntimeErrorKind::InvalidDouble("abc".to_string())
        );
    }

    #[test]
    fn nil_arguments_to_builtins_are_rejected() {
        let source = indoc! {r#"
            var s string := nil
            print(s)
        "#};
        let error = runtime_error(source);
        assert_eq!(
            error.kind,
            RuntimeErrorKind::NilArgument {
                function: "print".to_string()
            }
        );
        assert_eq!((error.line, error.column), (2, 7));
    }

    #[test]
    fn read_returns_lines_then_nil() {
        let source = indoc! {r#"
            var first := read()
            var second := read()
            var third := read()
            print(concat(first, second))
            print(third)
        "#};
        let outcome = run_with_input(source, "ab\r\ncd\n");
        let error = outcome.result.expect_err("third read is nil");
        assert_eq!(
            error.kind,
            RuntimeErrorKind::NilArgument {
                function: "print".to_string()
            }
        );
        assert_eq!((error.line, error.column), (5, 7));
        assert_eq!(outcome.output, "abcd");
    }

    #[test]
    fn not_applies_after_the_operator() {
        let source = indoc! {"
            var a := not 1 = 2
            var b := not true and false
            if a and b then
              return 1
            end
            return 2
        "};
        assert_eq!(exit_code(source), 1);
    }

    #[test]
    fn repeated_not_negates_once() {
        let source = indoc! {"
            if not not true then
              return 1
            end
            return 2
        "};
        assert_eq!(exit_code(source), 2);
    }

    #[test]
    fn integer_overflow_is_an_error() {
        assert!(matches!(
            runtime_error("var x := 9223372036854775807 + 1").kind,
            RuntimeErrorKind::IntegerOverflow { .. }
        ));
    }

    #[test]
    fn runaway_recursion_is_stopped() {
        let source = indoc! {"
            fun int forever(int n)
              return forever(n + 1)
            end
            return forever(0)
        "};
        // Debug builds use large frames; give the deep recursion room.
        let kind = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(move || runtime_error(source).kind)
            .expect("spawn")
            .join()
            .expect("join");
        assert_eq!(
            kind,
            RuntimeErrorKind::CallDepthExceeded {
                limit: MAX_CALL_DEPTH
            }
        );
    }

    #[test]
    fn self_instantiating_type_is_stopped() {
        let source = indoc! {"
            type T
              var T next := new T
            end
            var t := new T
        "};
        let error = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(move || runtime_error(source))
            .expect("spawn")
            .join()
            .expect("join");
        assert_eq!(
            error.kind,
            RuntimeErrorKind::CallDepthExceeded {
                limit: MAX_CALL_DEPTH
            }
        );
        assert_eq!(error.line, 2);
    }

    #[test]
    fn nested_new_within_the_limit_succeeds() {
        let source = indoc! {"
            type Leaf
              var int v := 7
            end
            type Branch
              var Leaf leaf := new Leaf
            end
            fun int depth(int n)
              if n = 0 then
                var b := new Branch
                return b.leaf.v
              end
              return depth(n - 1)
            end
            return depth(100)
        "};
        assert_eq!(exit_code(source), 7);
    }

    #[test]
    fn loops_do_not_grow_the_scope_arena() {
        let source = indoc! {"
            var total := 0
            for i := 1 to 500 do
              var sq := i * i
              set total := total + sq % 7
            end
            return total
        "};
        let program = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::with_io(io::empty(), io::sink());
        assert!(interpreter.run(&program).is_ok());
        assert!(interpreter.scope.allocated_frames() <= 4);
        assert!(interpreter.heap().is_empty());
    }
}
