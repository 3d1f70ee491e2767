//! Static checking of a parsed program.
//!
//! One pass over the tree with a [`ScopeTable`] of [`Symbol`]s. The first
//! violation aborts the pass.

use rustc_hash::FxHashMap;

use crate::ast::{
    Assign, BinaryOperator, Expr, For, FunDecl, If, Path, RValue, Return, Stmt, StmtList, Term,
    TypeDecl, VarDecl,
};
use crate::builtins::BuiltinFunction;
use crate::scope::ScopeTable;
use crate::token::{Token, TokenKind};

mod error;
mod types;

pub use error::{TypeError, TypeErrorKind, TypeResult};
pub use types::{Signature, Symbol, Ty};

/// Slot holding the return type of the enclosing function. `return` is a
/// keyword, so no user binding can collide with it.
const RETURN_SLOT: &str = "return";

pub struct TypeChecker {
    scope: ScopeTable<Symbol>,
}

impl TypeChecker {
    pub fn new() -> Self {
        let mut scope = ScopeTable::new();
        scope.add_name(RETURN_SLOT, Symbol::Var(Ty::Int));
        for builtin in BuiltinFunction::ALL {
            scope.add_name(builtin.name(), Symbol::Function(builtin.signature()));
        }
        Self { scope }
    }

    pub fn check(&mut self, program: &StmtList) -> TypeResult<()> {
        *self = Self::new();
        self.check_block(program)
    }

    fn check_block(&mut self, block: &StmtList) -> TypeResult<()> {
        self.scope.push_environment();
        let result = block.stmts.iter().try_for_each(|stmt| self.check_stmt(stmt));
        self.scope.pop_environment();
        result
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> TypeResult<()> {
        match stmt {
            Stmt::VarDecl(decl) => self.check_var_decl(decl).map(|_| ()),
            Stmt::Assign(assign) => self.check_assign(assign),
            Stmt::Return(ret) => self.check_return(ret),
            Stmt::If(stmt) => self.check_if(stmt),
            Stmt::While(stmt) => {
                self.check_condition(&stmt.condition)?;
                self.check_block(&stmt.body)
            }
            Stmt::For(stmt) => self.check_for(stmt),
            Stmt::TypeDecl(decl) => self.check_type_decl(decl),
            Stmt::FunDecl(decl) => self.check_fun_decl(decl),
            Stmt::Expr(expr) => self.infer_expr(expr).map(|_| ()),
        }
    }

    /// Binds the declared name and returns the type it was bound with.
    fn check_var_decl(&mut self, decl: &VarDecl) -> TypeResult<Ty> {
        let init = self.infer_expr(&decl.init)?;
        let ty = match &decl.var_type {
            Some(type_token) => {
                let declared = self.resolve_type(type_token)?;
                if !init.fits(&declared) {
                    return Err(TypeError::new(
                        TypeErrorKind::Mismatch {
                            expected: declared,
                            found: init,
                        },
                        type_token,
                    ));
                }
                declared
            }
            None if init.is_nil() => {
                return Err(TypeError::new(
                    TypeErrorKind::UntypedNil(decl.name.lexeme.clone()),
                    &decl.name,
                ));
            }
            None => init,
        };
        self.declare(&decl.name, Symbol::Var(ty.clone()))?;
        Ok(ty)
    }

    fn check_assign(&mut self, assign: &Assign) -> TypeResult<()> {
        let value = self.infer_expr(&assign.value)?;
        let target = self.resolve_path(&assign.target)?;
        if value.fits(&target) {
            Ok(())
        } else {
            Err(TypeError::new(
                TypeErrorKind::Mismatch {
                    expected: target,
                    found: value,
                },
                assign.target.first(),
            ))
        }
    }

    fn check_return(&mut self, ret: &Return) -> TypeResult<()> {
        let found = match &ret.value {
            Some(value) => self.infer_expr(value)?,
            None => Ty::Nil,
        };
        let expected = match self.scope.get_info(RETURN_SLOT) {
            Some(Symbol::Var(ty)) => ty.clone(),
            _ => Ty::Int,
        };
        if found.fits(&expected) {
            Ok(())
        } else {
            Err(TypeError::new(
                TypeErrorKind::ReturnMismatch { expected, found },
                &ret.keyword,
            ))
        }
    }

    fn check_if(&mut self, stmt: &If) -> TypeResult<()> {
        for branch in std::iter::once(&stmt.if_part).chain(&stmt.elifs) {
            self.check_condition(&branch.condition)?;
            self.check_block(&branch.body)?;
        }
        match &stmt.else_body {
            Some(body) => self.check_block(body),
            None => Ok(()),
        }
    }

    fn check_for(&mut self, stmt: &For) -> TypeResult<()> {
        for bound in [&stmt.start, &stmt.end] {
            let ty = self.infer_expr(bound)?;
            if ty != Ty::Int {
                return Err(TypeError::new(
                    TypeErrorKind::NonIntBound(ty),
                    bound.first_token(),
                ));
            }
        }
        self.scope.push_environment();
        self.scope.add_name(stmt.var.lexeme.as_str(), Symbol::Var(Ty::Int));
        let result = self.check_block(&stmt.body);
        self.scope.pop_environment();
        result
    }

    fn check_condition(&mut self, condition: &Expr) -> TypeResult<()> {
        let ty = self.infer_expr(condition)?;
        if ty == Ty::Bool {
            Ok(())
        } else {
            Err(TypeError::new(
                TypeErrorKind::NonBoolCondition(ty),
                condition.first_token(),
            ))
        }
    }

    fn check_type_decl(&mut self, decl: &TypeDecl) -> TypeResult<()> {
        // Registered before the fields so a type can refer to itself.
        self.declare(&decl.name, Symbol::Struct(FxHashMap::default()))?;

        self.scope.push_environment();
        let fields = decl
            .fields
            .iter()
            .map(|field| -> TypeResult<(String, Ty)> {
                Ok((field.name.lexeme.clone(), self.check_var_decl(field)?))
            })
            .collect::<TypeResult<FxHashMap<_, _>>>();
        self.scope.pop_environment();

        self.scope.set_info(&decl.name.lexeme, Symbol::Struct(fields?));
        Ok(())
    }

    fn check_fun_decl(&mut self, decl: &FunDecl) -> TypeResult<()> {
        if self.scope.name_exists(&decl.name.lexeme) {
            return Err(TypeError::new(
                TypeErrorKind::Redeclaration(decl.name.lexeme.clone()),
                &decl.name,
            ));
        }
        let ret = match decl.return_type.kind {
            TokenKind::Nil => Ty::Nil,
            _ => self.resolve_type(&decl.return_type)?,
        };
        let params = decl
            .params
            .iter()
            .map(|param| self.resolve_type(&param.param_type))
            .collect::<TypeResult<Vec<_>>>()?;

        // Registered before the body so the function can call itself.
        self.scope.add_name(
            decl.name.lexeme.as_str(),
            Symbol::Function(Signature {
                params: params.clone(),
                ret: ret.clone(),
            }),
        );

        self.scope.push_environment();
        let result = self.check_fun_body(decl, params, ret);
        self.scope.pop_environment();
        result
    }

    fn check_fun_body(&mut self, decl: &FunDecl, params: Vec<Ty>, ret: Ty) -> TypeResult<()> {
        self.scope.add_name(RETURN_SLOT, Symbol::Var(ret));
        for (param, ty) in decl.params.iter().zip(params) {
            self.declare(&param.name, Symbol::Var(ty))?;
        }
        self.check_block(&decl.body)
    }

    fn declare(&mut self, name: &Token, symbol: Symbol) -> TypeResult<()> {
        if self.scope.name_exists_in_current_env(&name.lexeme) {
            return Err(TypeError::new(
                TypeErrorKind::Redeclaration(name.lexeme.clone()),
                name,
            ));
        }
        self.scope.add_name(name.lexeme.as_str(), symbol);
        Ok(())
    }

    /// The type a type-name token denotes: a primitive or a visible record.
    fn resolve_type(&self, token: &Token) -> TypeResult<Ty> {
        if let Some(ty) = Ty::primitive(token.kind) {
            return Ok(ty);
        }
        match self.scope.get_info(&token.lexeme) {
            Some(Symbol::Struct(_)) if token.kind == TokenKind::Id => {
                Ok(Ty::Named(token.lexeme.clone()))
            }
            _ => Err(TypeError::new(
                TypeErrorKind::UnknownType(token.lexeme.clone()),
                token,
            )),
        }
    }

    fn struct_fields(&self, ty: &Ty, at: &Token) -> TypeResult<&FxHashMap<String, Ty>> {
        if let Ty::Named(name) = ty
            && let Some(Symbol::Struct(fields)) = self.scope.get_info(name)
        {
            return Ok(fields);
        }
        Err(TypeError::new(TypeErrorKind::NotAStruct(ty.clone()), at))
    }

    fn resolve_path(&self, path: &Path) -> TypeResult<Ty> {
        let first = path.first();
        let mut ty = match self.scope.get_info(&first.lexeme) {
            Some(Symbol::Var(ty)) => ty.clone(),
            Some(_) => {
                return Err(TypeError::new(
                    TypeErrorKind::NotAVariable(first.lexeme.clone()),
                    first,
                ));
            }
            None => {
                return Err(TypeError::new(
                    TypeErrorKind::UndefinedVariable(first.lexeme.clone()),
                    first,
                ));
            }
        };

        for pair in path.segments.windows(2) {
            let (owner, field) = (&pair[0], &pair[1]);
            let next = self
                .struct_fields(&ty, owner)?
                .get(&field.lexeme)
                .cloned()
                .ok_or_else(|| {
                    TypeError::new(
                        TypeErrorKind::UnknownField {
                            ty: ty.clone(),
                            field: field.lexeme.clone(),
                        },
                        field,
                    )
                })?;
            ty = next;
        }
        Ok(ty)
    }

    fn infer_expr(&mut self, expr: &Expr) -> TypeResult<Ty> {
        let left = self.infer_term(&expr.first)?;
        let Some(tail) = &expr.tail else {
            return Ok(left);
        };
        let right = self.infer_expr(&tail.rest)?;
        check_binary(tail.op, &tail.op_token, left, right)
    }

    fn infer_term(&mut self, term: &Term) -> TypeResult<Ty> {
        match term {
            Term::Simple(rvalue) => self.infer_rvalue(rvalue),
            Term::Complex(expr) => self.infer_expr(expr),
        }
    }

    fn infer_rvalue(&mut self, rvalue: &RValue) -> TypeResult<Ty> {
        match rvalue {
            RValue::Literal(token) => Ty::of_literal(token).ok_or_else(|| {
                TypeError::new(TypeErrorKind::UnknownType(token.lexeme.clone()), token)
            }),
            RValue::New(type_name) => self.resolve_type(type_name),
            RValue::Call { name, args } => self.infer_call(name, args),
            RValue::Path(path) => self.resolve_path(path),
            RValue::Neg(expr) => {
                let ty = self.infer_expr(expr)?;
                if ty.is_numeric() {
                    Ok(ty)
                } else {
                    Err(TypeError::new(
                        TypeErrorKind::InvalidNegation(ty),
                        expr.first_token(),
                    ))
                }
            }
        }
    }

    fn infer_call(&mut self, name: &Token, args: &[Expr]) -> TypeResult<Ty> {
        let signature = match self.scope.get_info(&name.lexeme) {
            Some(Symbol::Function(signature)) => signature.clone(),
            Some(_) => {
                return Err(TypeError::new(
                    TypeErrorKind::NotCallable(name.lexeme.clone()),
                    name,
                ));
            }
            None => {
                return Err(TypeError::new(
                    TypeErrorKind::UndefinedFunction(name.lexeme.clone()),
                    name,
                ));
            }
        };

        let expected = signature.params.len();
        let found = args.len();
        if found < expected {
            return Err(TypeError::new(
                TypeErrorKind::NotEnoughArguments {
                    name: name.lexeme.clone(),
                    expected,
                    found,
                },
                name,
            ));
        }
        if found > expected {
            return Err(TypeError::new(
                TypeErrorKind::TooManyArguments {
                    name: name.lexeme.clone(),
                    expected,
                    found,
                },
                name,
            ));
        }

        for (position, (arg, param)) in args.iter().zip(&signature.params).enumerate() {
            let ty = self.infer_expr(arg)?;
            if !ty.fits(param) {
                return Err(TypeError::new(
                    TypeErrorKind::ArgumentMismatch {
                        name: name.lexeme.clone(),
                        position: position + 1,
                        expected: param.clone(),
                        found: ty,
                    },
                    arg.first_token(),
                ));
            }
        }
        Ok(signature.ret)
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Operator rules, checked in order:
/// operand types agree unless one side is nil; `%` needs two ints; `char`
/// and `string` operands take no operator at all, not even against nil; a nil
/// right operand allows only `=`/`!=`; otherwise the left operand's type
/// decides. Comparisons produce `bool`.
fn check_binary(op: BinaryOperator, token: &Token, left: Ty, right: Ty) -> TypeResult<Ty> {
    if left != right && !left.is_nil() && !right.is_nil() {
        return Err(TypeError::new(
            TypeErrorKind::OperandMismatch {
                op: op.symbol().to_string(),
                left,
                right,
            },
            token,
        ));
    }
    if op == BinaryOperator::Mod && (left != Ty::Int || right != Ty::Int) {
        return Err(TypeError::new(
            TypeErrorKind::InvalidModulo { left, right },
            token,
        ));
    }

    let allowed = match &left {
        Ty::Char | Ty::String => false,
        _ if right.is_nil() => op.is_equality(),
        Ty::Int | Ty::Double => !op.is_logical(),
        Ty::Bool => op.is_logical() || op.is_equality(),
        Ty::Nil | Ty::Named(_) => op.is_equality(),
    };
    if !allowed {
        return Err(TypeError::new(
            TypeErrorKind::InvalidOperator {
                op: op.symbol().to_string(),
                ty: left,
            },
            token,
        ));
    }

    if op.is_relational() {
        Ok(Ty::Bool)
    } else {
        Ok(left)
    }
}

pub fn check(program: &StmtList) -> TypeResult<()> {
    TypeChecker::new().check(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use indoc::indoc;

    fn check_source(input: &str) -> TypeResult<()> {
        check(&parse(input).expect("parse failed"))
    }

    fn type_error(input: &str) -> TypeError {
        check_source(input).expect_err("expected type error")
    }

    #[test]
    fn accepts_well_typed_program() {
        let input = indoc! {r#"
            type Node
              var int value := 0
              var Node next := nil
            end

            fun int sum(Node head)
              var total := 0
              var cur := head
              while cur != nil do
                set total := total + cur.value
                set cur := cur.next
              end
              return total
            end

            fun nil greet(string name)
              print(concat("hi ", name))
              return
            end

            var head := new Node()
            set head.next := new Node
            set head.next.value := 4
            greet(itos(sum(head)))
            for i := 5 to 1 do
              if ((i % 2) = 0) and true then
                print("even")
              elif not i > 3 then
                print("small")
              else
                print(append("x", get(0, "ab")))
              end
            end
            var d double := 2.5
            set d := neg d * 2.0
            return length("abc")
        "#};
        check_source(input).expect("program should type-check");
    }

    #[test]
    fn untyped_nil_declaration_is_rejected() {
        let error = type_error("var x := nil");
        assert_eq!(error.kind, TypeErrorKind::UntypedNil("x".to_string()));
        assert_eq!((error.line, error.column), (1, 5));

        check_source("var x int := nil").expect("typed nil is fine");
        check_source("var int x := nil").expect("typed nil is fine");
    }

    #[test]
    fn declared_type_must_match_initializer() {
        let error = type_error("var int x := 1.5");
        assert_eq!(
            error.kind,
            TypeErrorKind::Mismatch {
                expected: Ty::Int,
                found: Ty::Double,
            }
        );
        assert_eq!(
            type_error("var Missing x := nil").kind,
            TypeErrorKind::UnknownType("Missing".to_string())
        );
    }

    #[test]
    fn redeclaration_only_in_same_block() {
        let error = type_error(indoc! {"
            var x := 1
            var x := 2
        "});
        assert_eq!(error.kind, TypeErrorKind::Redeclaration("x".to_string()));
        assert_eq!(error.line, 2);

        check_source(indoc! {"
            var x := 1
            while x < 3 do
              var x := true
              set x := false
            end
        "})
        .expect("shadowing in a nested block is allowed");
    }

    #[test]
    fn assignment_types_must_agree() {
        let error = type_error(indoc! {"
            var x := 1
            set x := \"one\"
        "});
        assert!(matches!(error.kind, TypeErrorKind::Mismatch { .. }));
        check_source("var x := 1 set x := nil").expect("nil assignment is allowed");
    }

    #[test]
    fn path_resolution_rules() {
        let base = indoc! {"
            type T
              var int f := 0
            end
            var t := new T
            var n := 3
        "};
        check_source(&format!("{base}set t.f := 2")).expect("field assignment");
        assert!(matches!(
            type_error(&format!("{base}set t.g := 2")).kind,
            TypeErrorKind::UnknownField { .. }
        ));
        assert_eq!(
            type_error(&format!("{base}var z := n.f")).kind,
            TypeErrorKind::NotAStruct(Ty::Int)
        );
        assert_eq!(
            type_error(&format!("{base}var z := t.f.g")).kind,
            TypeErrorKind::NotAStruct(Ty::Int)
        );
        assert_eq!(
            type_error(&format!("{base}set T := nil")).kind,
            TypeErrorKind::NotAVariable("T".to_string())
        );
        assert_eq!(
            type_error("set y := 1").kind,
            TypeErrorKind::UndefinedVariable("y".to_string())
        );
    }

    #[test]
    fn strings_and_chars_cannot_be_compared_with_nil() {
        for source in [
            "var x := \"a\" = nil",
            "var s := \"a\" var x := s != nil",
            "var c := 'x' != nil",
        ] {
            assert_eq!(
                type_error(source).kind,
                TypeErrorKind::InvalidOperator {
                    op: if source.contains("!=") { "!=" } else { "=" }.to_string(),
                    ty: if source.contains('\'') { Ty::Char } else { Ty::String },
                },
                "{source}"
            );
        }
    }

    #[test]
    fn operator_rules() {
        assert!(matches!(
            type_error("var x := 1 + 2.0").kind,
            TypeErrorKind::OperandMismatch { .. }
        ));
        assert!(matches!(
            type_error("var x := 1.0 % 2.0").kind,
            TypeErrorKind::InvalidModulo { .. }
        ));
        assert!(matches!(
            type_error("var x := 1 and 2").kind,
            TypeErrorKind::InvalidOperator { .. }
        ));
        assert!(matches!(
            type_error("var x := true + false").kind,
            TypeErrorKind::InvalidOperator { .. }
        ));
        assert!(matches!(
            type_error("var x := \"a\" = \"a\"").kind,
            TypeErrorKind::InvalidOperator { .. }
        ));
        assert!(matches!(
            type_error("var x := 'a' < 'b'").kind,
            TypeErrorKind::InvalidOperator { .. }
        ));
        assert!(matches!(
            type_error("var x := nil + 1").kind,
            TypeErrorKind::InvalidOperator { .. }
        ));
        assert!(matches!(
            type_error("var x := 1 + nil").kind,
            TypeErrorKind::InvalidOperator { .. }
        ));
        check_source("var x := (1 < 2) and (2.0 >= 1.5)").expect("comparisons yield bool");
        check_source("var x := nil = \"a\"").expect("nil on the left compares with anything");
        check_source("var x := nil = nil").expect("nil equality");
        check_source("var x := 1 != nil").expect("nil inequality");
    }

    #[test]
    fn conditions_and_bounds_are_checked() {
        assert_eq!(
            type_error("while 1 do end").kind,
            TypeErrorKind::NonBoolCondition(Ty::Int)
        );
        assert_eq!(
            type_error("if true then elif \"s\" then end").kind,
            TypeErrorKind::NonBoolCondition(Ty::String)
        );
        assert_eq!(
            type_error("for i := 1.0 to 3 do end").kind,
            TypeErrorKind::NonIntBound(Ty::Double)
        );
        check_source(indoc! {"
            for i := 1 to 3 do
              var j int := i * 2
            end
        "})
        .expect("loop variable is an int");
        assert_eq!(
            type_error("for i := 1 to 3 do end var j := i").kind,
            TypeErrorKind::UndefinedVariable("i".to_string())
        );
    }

    #[test]
    fn call_rules() {
        let error = type_error("var s := concat(\"a\")");
        assert_eq!(
            error.kind,
            TypeErrorKind::NotEnoughArguments {
                name: "concat".to_string(),
                expected: 2,
                found: 1,
            }
        );
        assert!(matches!(
            type_error("var s := itos(1, 2)").kind,
            TypeErrorKind::TooManyArguments { .. }
        ));
        let error = type_error("var s := get(\"a\", 0)");
        assert!(matches!(
            error.kind,
            TypeErrorKind::ArgumentMismatch { position: 1, .. }
        ));
        assert_eq!(error.column, 14);
        assert_eq!(
            type_error("f()").kind,
            TypeErrorKind::UndefinedFunction("f".to_string())
        );
        assert_eq!(
            type_error("var x := 1 x()").kind,
            TypeErrorKind::NotCallable("x".to_string())
        );
        check_source("print(nil)").expect("nil argument passes the checker");
    }

    #[test]
    fn return_types_are_checked() {
        assert!(matches!(
            type_error(indoc! {"
                fun int f()
                  return \"no\"
                end
            "})
            .kind,
            TypeErrorKind::ReturnMismatch { .. }
        ));
        assert!(matches!(
            type_error("return 1.5").kind,
            TypeErrorKind::ReturnMismatch { .. }
        ));
        check_source(indoc! {"
            fun int fact(int n)
              if n <= 1 then
                return 1
              end
              return n * fact(n - 1)
            end
            return fact(5)
        "})
        .expect("recursion sees its own signature");
    }

    #[test]
    fn declaration_rules() {
        assert_eq!(
            type_error("fun nil print(string s) end").kind,
            TypeErrorKind::Redeclaration("print".to_string())
        );
        assert_eq!(
            type_error("fun nil f(int a, int a) end").kind,
            TypeErrorKind::Redeclaration("a".to_string())
        );
        assert_eq!(
            type_error("type T end type T end").kind,
            TypeErrorKind::Redeclaration("T".to_string())
        );
        assert_eq!(
            type_error(indoc! {"
                type T
                  var int a := 0
                  var int a := 1
                end
            "})
            .kind,
            TypeErrorKind::Redeclaration("a".to_string())
        );
        check_source(indoc! {"
            type T
              var int a := 1
              var int b := a + 1
            end
        "})
        .expect("later fields see earlier ones");
    }

    #[test]
    fn negation_requires_numbers() {
        assert_eq!(
            type_error("var b := neg true").kind,
            TypeErrorKind::InvalidNegation(Ty::Bool)
        );
    }

    #[test]
    fn structs_compare_only_for_equality() {
        let base = indoc! {"
            type T
            end
            var a := new T
            var b := new T
        "};
        check_source(&format!("{base}var same := a = b")).expect("struct equality");
        assert!(matches!(
            type_error(&format!("{base}var less := a < b")).kind,
            TypeErrorKind::InvalidOperator { .. }
        ));
    }
}
