//! The semantic analyzer.
//!
//! Five passes over the top-level statement list, so routines and types can
//! be referenced before their declarations appear in the source:
//!
//! 1. hoist routine signatures,
//! 2. hoist type declarations,
//! 3. collect top-level variable and array declarations,
//! 4. analyze routine bodies,
//! 5. analyze the remaining top-level statements in source order.
//!
//! The analyzer never aborts: it collects every [`SemanticError`] it finds
//! and leaves the decision to the pipeline.

use log::debug;

use crate::ast::{BinOp, Expr, ExprKind, Parameter, Program, Stmt, StmtKind, UnOp};
use crate::errors::SemanticError;
use crate::symbol::{RoutineSig, SymbolTable};
use crate::types::Type;

pub struct SemanticAnalyzer {
    table: SymbolTable,
    errors: Vec<SemanticError>,
    /// Expected return type per enclosing routine; `None` means the routine
    /// is a procedure without a return value.
    expected_returns: Vec<Option<Type>>,
}

/// Analyzes a program, returning every semantic error found together with
/// the populated symbol table (whose routine and type namespaces outlive the
/// analysis and feed the code generator).
pub fn analyze(program: &Program) -> (Vec<SemanticError>, SymbolTable) {
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.run(program);
    (analyzer.errors, analyzer.table)
}

impl SemanticAnalyzer {
    fn new() -> Self {
        SemanticAnalyzer {
            table: SymbolTable::new(),
            errors: Vec::new(),
            expected_returns: Vec::new(),
        }
    }

    fn error(&mut self, error: SemanticError) {
        self.errors.push(error);
    }

    fn run(&mut self, program: &Program) {
        self.table.enter_scope();

        debug!("pass 1: collecting routine declarations");
        for stmt in &program.statements {
            if let StmtKind::RoutineDecl {
                name,
                params,
                return_type,
                ..
            } = &stmt.kind
            {
                let sig = RoutineSig {
                    params: params.clone(),
                    return_type: return_type.clone(),
                };
                if !self.table.declare_routine(name, sig) {
                    self.error(SemanticError::RoutineAlreadyDefined { name: name.clone() });
                }
            }
        }

        debug!("pass 2: collecting type declarations");
        for stmt in &program.statements {
            if let StmtKind::TypeDecl { name, ty } = &stmt.kind {
                self.visit_type_decl(name, ty);
            }
        }

        debug!("pass 3: collecting top-level variable declarations");
        for stmt in &program.statements {
            if matches!(
                stmt.kind,
                StmtKind::VarDecl { .. } | StmtKind::ArrayDecl { .. }
            ) {
                self.visit_stmt(stmt);
            }
        }

        debug!("pass 4: analyzing routine bodies");
        for stmt in &program.statements {
            if let StmtKind::RoutineDecl {
                name,
                params,
                return_type,
                body,
            } = &stmt.kind
            {
                self.visit_routine_body(name, params, return_type.as_ref(), body);
            }
        }

        debug!("pass 5: analyzing remaining top-level statements");
        for stmt in &program.statements {
            if !matches!(
                stmt.kind,
                StmtKind::VarDecl { .. }
                    | StmtKind::ArrayDecl { .. }
                    | StmtKind::TypeDecl { .. }
                    | StmtKind::RoutineDecl { .. }
            ) {
                self.visit_stmt(stmt);
            }
        }

        self.table.exit_scope();
        debug!("semantic analysis found {} error(s)", self.errors.len());
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                self.visit_var_decl(name, ty, init.as_deref())
            }
            StmtKind::ArrayDecl { name, ty } => self.visit_array_decl(name, ty),
            StmtKind::Assignment {
                target,
                index,
                value,
            } => self.visit_assignment(target, index.as_deref(), value),
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => {
                if !matches!(self.expr_type(condition), Some(Type::Boolean)) {
                    self.error(SemanticError::NonBooleanIfCondition);
                }
                for stmt in then_body {
                    self.visit_stmt(stmt);
                }
                if let Some(else_body) = else_body {
                    for stmt in else_body {
                        self.visit_stmt(stmt);
                    }
                }
            }
            StmtKind::While { condition, body } => {
                if !matches!(self.expr_type(condition), Some(Type::Boolean)) {
                    self.error(SemanticError::NonBooleanWhileCondition);
                }
                for stmt in body {
                    self.visit_stmt(stmt);
                }
            }
            StmtKind::For {
                variable,
                from,
                to,
                body,
                ..
            } => self.visit_for(variable, from, to, body),
            StmtKind::Print { value } => {
                if self.expr_type(value).is_none() {
                    self.error(SemanticError::InvalidPrintExpression);
                }
            }
            StmtKind::Read { variable } => {
                if !self.table.is_defined(variable) {
                    self.error(SemanticError::UndefinedVariable {
                        name: variable.clone(),
                    });
                }
            }
            StmtKind::Return { value } => self.visit_return(value.as_deref()),
            StmtKind::RoutineCall { name, args } => self.visit_routine_call_stmt(name, args),
            // Handled by their dedicated passes.
            StmtKind::TypeDecl { .. } | StmtKind::RoutineDecl { .. } => {}
        }
    }

    fn visit_type_decl(&mut self, name: &str, ty: &Type) {
        if self.table.is_type_defined(name) {
            self.error(SemanticError::TypeAlreadyDefined {
                name: name.to_string(),
            });
            return;
        }
        if let Type::Record(fields) = ty {
            for field_type in fields.values() {
                if !self.is_valid_type(field_type) {
                    self.error(SemanticError::InvalidFieldType {
                        field_type: field_type.to_string(),
                        record: name.to_string(),
                    });
                    return;
                }
            }
        }
        self.table.define_type(name, ty.clone());
    }

    fn visit_var_decl(&mut self, name: &str, ty: &Type, init: Option<&Expr>) {
        if self.table.is_defined_in_current_scope(name) {
            self.error(SemanticError::VariableAlreadyDeclared {
                name: name.to_string(),
            });
            return;
        }

        if !self.is_valid_type(ty) {
            self.error(SemanticError::UnknownType {
                name: ty.to_string(),
            });
            return;
        }
        let declared = self.table.resolve(ty).clone();

        // Declare before checking the initializer so it can reference
        // previously declared names.
        self.table.declare_variable(name, declared.clone());

        if let Some(init) = init {
            if let Some(value_type) = self.expr_type(init) {
                if !self.compatible(&declared, &value_type) {
                    self.error(SemanticError::InitializerTypeMismatch {
                        value_type: value_type.to_string(),
                        target_type: declared.to_string(),
                    });
                }
            }
        }
    }

    fn visit_array_decl(&mut self, name: &str, ty: &Type) {
        if self.table.is_defined_in_current_scope(name) {
            self.error(SemanticError::ArrayAlreadyDeclared {
                name: name.to_string(),
            });
            return;
        }

        let Type::Array { size, element } = ty else {
            // The parser only builds `ArrayDecl` with an array type.
            return;
        };
        if !self.is_valid_type(element) {
            self.error(SemanticError::InvalidArrayElementType {
                element_type: element.to_string(),
            });
            return;
        }
        if *size <= 0 {
            self.error(SemanticError::NonPositiveArraySize);
            return;
        }

        let element = self.table.resolve(element).clone();
        self.table.declare_variable(
            name,
            Type::Array {
                size: *size,
                element: Box::new(element),
            },
        );
    }

    fn visit_routine_body(
        &mut self,
        name: &str,
        params: &[Parameter],
        return_type: Option<&Type>,
        body: &[Stmt],
    ) {
        debug!("analyzing routine body: {name}");
        self.table.enter_scope();

        for param in params {
            let ty = self.table.resolve(&param.ty).clone();
            if !self.table.declare_variable(&param.name, ty) {
                self.error(SemanticError::ParameterAlreadyDefined {
                    name: param.name.clone(),
                });
            }
        }

        let expected = return_type
            .filter(|ty| !matches!(ty, Type::Void))
            .map(|ty| self.table.resolve(ty).clone());
        self.expected_returns.push(expected.clone());

        for stmt in body {
            self.visit_stmt(stmt);
        }

        if let Some(expected) = expected {
            if !has_return(body) {
                self.error(SemanticError::MissingReturnPath {
                    name: name.to_string(),
                    return_type: expected.to_string(),
                });
            }
        }

        self.expected_returns.pop();
        self.table.exit_scope();
    }

    fn visit_assignment(&mut self, target: &str, index: Option<&Expr>, value: &Expr) {
        // Array element assignment.
        if let Some(index) = index {
            if !self.table.is_defined(target) {
                self.error(SemanticError::UndefinedArrayVariable {
                    name: target.to_string(),
                });
                return;
            }
            let target_type = self.table.variable_type(target).cloned().unwrap();
            let Type::Array { size, element } = self.table.resolve(&target_type).clone() else {
                self.error(SemanticError::NotAnArray {
                    name: target.to_string(),
                });
                return;
            };

            if !matches!(self.expr_type(index), Some(Type::Integer)) {
                self.error(SemanticError::NonIntegerArrayIndex);
                return;
            }
            self.check_array_bounds(index, size, target);

            if let Some(value_type) = self.expr_type(value) {
                if !self.compatible(&element, &value_type) {
                    self.error(SemanticError::ArrayAssignmentTypeMismatch {
                        value_type: value_type.to_string(),
                        element_type: element.to_string(),
                    });
                }
            }
            return;
        }

        // Record field assignment, target spelled `record.field`.
        if let Some((record_name, field)) = target.split_once('.') {
            let Some(record_type) = self.table.variable_type(record_name).cloned() else {
                self.error(SemanticError::UndefinedRecordVariable {
                    name: record_name.to_string(),
                });
                return;
            };
            let Type::Record(fields) = self.table.resolve(&record_type).clone() else {
                self.error(SemanticError::NotARecord {
                    name: record_name.to_string(),
                });
                return;
            };
            let Some(field_type) = fields.get(field).cloned() else {
                self.error(SemanticError::NoSuchField {
                    field: field.to_string(),
                    record: record_name.to_string(),
                });
                return;
            };
            if let Some(value_type) = self.expr_type(value) {
                if !self.compatible(&field_type, &value_type) {
                    self.error(SemanticError::FieldAssignmentTypeMismatch {
                        value_type: value_type.to_string(),
                        field_type: field_type.to_string(),
                    });
                }
            }
            return;
        }

        // Plain variable assignment.
        let Some(target_type) = self.table.variable_type(target).cloned() else {
            self.error(SemanticError::UndefinedVariable {
                name: target.to_string(),
            });
            return;
        };
        if let Some(value_type) = self.expr_type(value) {
            if !self.compatible(&target_type, &value_type) {
                self.error(SemanticError::AssignmentTypeMismatch {
                    value_type: value_type.to_string(),
                    target_type: target_type.to_string(),
                });
            }
        }
    }

    /// The loop variable is declared by the loop itself, as `integer`, in a
    /// scope of its own.
    fn visit_for(&mut self, variable: &str, from: &Expr, to: &Expr, body: &[Stmt]) {
        self.table.enter_scope();
        self.table.declare_variable(variable, Type::Integer);

        for bound in [from, to] {
            match self.expr_type(bound) {
                Some(Type::Integer) | None => {}
                Some(_) => self.error(SemanticError::NonIntegerForBound),
            }
        }

        for stmt in body {
            self.visit_stmt(stmt);
        }
        self.table.exit_scope();
    }

    fn visit_return(&mut self, value: Option<&Expr>) {
        let Some(expected) = self.expected_returns.last().cloned() else {
            self.error(SemanticError::ReturnOutsideRoutine);
            return;
        };
        let actual = value.and_then(|value| self.expr_type(value));

        match (expected, actual) {
            (None, None) => {}
            (None, Some(_)) => self.error(SemanticError::UnexpectedReturnValue),
            (Some(expected), None) => self.error(SemanticError::MissingReturnValue {
                return_type: expected.to_string(),
            }),
            (Some(expected), Some(actual)) => {
                if !self.compatible(&expected, &actual) {
                    self.error(SemanticError::ReturnTypeMismatch {
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                    });
                }
            }
        }
    }

    fn visit_routine_call_stmt(&mut self, name: &str, args: &[Expr]) {
        let Some(sig) = self.table.routine(name).cloned() else {
            self.error(SemanticError::UndefinedRoutine {
                name: name.to_string(),
            });
            return;
        };
        if sig.params.len() != args.len() {
            self.error(SemanticError::WrongArgumentCountStatement {
                name: name.to_string(),
                expected: sig.params.len(),
                actual: args.len(),
            });
            return;
        }
        for (i, (param, arg)) in sig.params.iter().zip(args).enumerate() {
            if let Some(arg_type) = self.expr_type(arg) {
                if !self.compatible(&param.ty, &arg_type) {
                    self.error(SemanticError::ArgumentTypeMismatchStatement {
                        index: i + 1,
                        name: name.to_string(),
                        expected: param.ty.to_string(),
                        actual: arg_type.to_string(),
                    });
                }
            }
        }
    }

    /// Determines the type of an expression through recursive analysis,
    /// reporting any violations found on the way. `None` means the type
    /// could not be established (an error has already been recorded).
    fn expr_type(&mut self, expr: &Expr) -> Option<Type> {
        match &expr.kind {
            ExprKind::Integer(_) => Some(Type::Integer),
            ExprKind::Real(_) => Some(Type::Real),
            ExprKind::Boolean(_) => Some(Type::Boolean),
            ExprKind::Str(_) => Some(Type::Str),

            ExprKind::Var(name) => match self.table.variable_type(name).cloned() {
                Some(ty) => Some(ty),
                None => {
                    self.error(SemanticError::UndefinedVariable { name: name.clone() });
                    None
                }
            },

            ExprKind::ArrayAccess { name, index } => {
                if !self.table.is_defined(name) {
                    self.error(SemanticError::UndefinedArrayVariable { name: name.clone() });
                    return None;
                }
                let ty = self.table.variable_type(name).cloned().unwrap();
                let Type::Array { size, element } = self.table.resolve(&ty).clone() else {
                    self.error(SemanticError::NotAnArray { name: name.clone() });
                    return None;
                };
                if !matches!(self.expr_type(index), Some(Type::Integer)) {
                    self.error(SemanticError::NonIntegerArrayIndex);
                    return None;
                }
                self.check_array_bounds(index, size, name);
                Some(*element)
            }

            ExprKind::RecordAccess { record, field } => {
                let Some(record_type) = self.table.variable_type(record).cloned() else {
                    self.error(SemanticError::UndefinedVariable {
                        name: record.clone(),
                    });
                    return None;
                };
                let Type::Record(fields) = self.table.resolve(&record_type).clone() else {
                    self.error(SemanticError::NotARecord {
                        name: record.clone(),
                    });
                    return None;
                };
                match fields.get(field) {
                    Some(field_type) => Some(field_type.clone()),
                    None => {
                        self.error(SemanticError::NoSuchField {
                            field: field.clone(),
                            record: record.clone(),
                        });
                        None
                    }
                }
            }

            ExprKind::Cast { expr, target } => {
                let source = self.expr_type(expr)?;
                let source = self.table.resolve(&source).clone();
                let target = self.table.resolve(target).clone();
                if source.casts_to(&target) {
                    Some(target)
                } else {
                    self.error(SemanticError::InvalidCast {
                        from: source.to_string(),
                        to: target.to_string(),
                    });
                    None
                }
            }

            ExprKind::Call { name, args } => self.visit_routine_call_expr(name, args),

            ExprKind::Binary { left, op, right } => {
                let left_type = self.expr_type(left);
                let right_type = self.expr_type(right);
                self.binary_type(*op, left_type, right_type)
            }

            ExprKind::Unary { op: UnOp::Not, operand } => {
                if let Some(ty) = self.expr_type(operand) {
                    if !ty.is_boolean() {
                        self.error(SemanticError::NonBooleanNotOperand);
                    }
                }
                Some(Type::Boolean)
            }
            ExprKind::Unary { op: UnOp::Neg, operand } => {
                let ty = self.expr_type(operand)?;
                if !ty.is_numeric() {
                    self.error(SemanticError::NonNumericNegation);
                    return None;
                }
                Some(ty)
            }
        }
    }

    fn visit_routine_call_expr(&mut self, name: &str, args: &[Expr]) -> Option<Type> {
        let Some(sig) = self.table.routine(name).cloned() else {
            self.error(SemanticError::UndefinedRoutine {
                name: name.to_string(),
            });
            return None;
        };
        if sig.params.len() != args.len() {
            self.error(SemanticError::WrongArgumentCount {
                name: name.to_string(),
                expected: sig.params.len(),
                actual: args.len(),
            });
            return None;
        }
        for (i, (param, arg)) in sig.params.iter().zip(args).enumerate() {
            if let Some(arg_type) = self.expr_type(arg) {
                if !self.compatible(&param.ty, &arg_type) {
                    self.error(SemanticError::ArgumentTypeMismatch {
                        index: i + 1,
                        name: name.to_string(),
                        expected: param.ty.to_string(),
                        actual: arg_type.to_string(),
                    });
                }
            }
        }
        sig.return_type
    }

    fn binary_type(
        &mut self,
        op: BinOp,
        left: Option<Type>,
        right: Option<Type>,
    ) -> Option<Type> {
        if op.is_comparison() {
            return Some(Type::Boolean);
        }

        if op.is_logical() {
            if let (Some(left), Some(right)) = (&left, &right) {
                if !left.is_boolean() || !right.is_boolean() {
                    self.error(SemanticError::NonBooleanLogicalOperand);
                }
            }
            return Some(Type::Boolean);
        }

        // Arithmetic. `+` doubles as string concatenation.
        let (left, right) = (left?, right?);
        if op == BinOp::Add && (left.is_string() || right.is_string()) {
            return Some(Type::Str);
        }
        match (&left, &right) {
            (Type::Integer, Type::Integer) => Some(Type::Integer),
            _ if left.is_numeric() && right.is_numeric() => Some(Type::Real),
            _ => {
                self.error(SemanticError::NonNumericArithmeticOperand {
                    op: op.to_string(),
                });
                None
            }
        }
    }

    /// Bound check for constant indices. The upper bound is inclusive:
    /// `a[size]` is accepted, `a[size + 1]` is not.
    fn check_array_bounds(&mut self, index: &Expr, size: i32, name: &str) {
        if let ExprKind::Integer(value) = index.kind {
            if value < 0 {
                self.error(SemanticError::NegativeArrayIndex {
                    index: value,
                    name: name.to_string(),
                });
            } else if value > size {
                self.error(SemanticError::ArrayIndexOutOfBounds {
                    index: value,
                    name: name.to_string(),
                    size,
                });
            }
        }
    }

    fn is_valid_type(&self, ty: &Type) -> bool {
        match ty {
            Type::Integer | Type::Real | Type::Boolean | Type::Str | Type::Void => true,
            Type::Named(name) => self.table.is_type_defined(name),
            Type::Array { element, .. } => self.is_valid_type(element),
            Type::Record(fields) => fields.values().all(|field| self.is_valid_type(field)),
        }
    }

    fn compatible(&self, expected: &Type, actual: &Type) -> bool {
        self.table
            .resolve(expected)
            .accepts(self.table.resolve(actual))
    }
}

/// True iff the statement list is guaranteed to exit through a `return`:
/// it contains a top-level `return`, or an `if` whose branches both do.
fn has_return(statements: &[Stmt]) -> bool {
    statements.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return { .. } => true,
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => {
            has_return(then_body)
                && else_body
                    .as_ref()
                    .is_some_and(|else_body| has_return(else_body))
        }
        _ => false,
    })
}
