//! The AST optimizer.
//!
//! Three rewrite passes over the validated AST, in order: constant folding,
//! dead-code elimination, unused-variable elimination. Every transformation
//! bumps a counter and records an [`OptimizationDetail`] for the reporter;
//! the rewritten tree is semantically equivalent to the input.

use log::debug;
use rustc_hash::FxHashSet;

use crate::ast::{BinOp, Expr, ExprKind, Program, Stmt, StmtKind, UnOp};

/// Which pass produced a detail record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizationKind {
    ConstantFolding,
    DeadCodeElimination,
    UnusedVariableElimination,
}

impl std::fmt::Display for OptimizationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizationKind::ConstantFolding => write!(f, "Constant Folding"),
            OptimizationKind::DeadCodeElimination => write!(f, "Dead Code Elimination"),
            OptimizationKind::UnusedVariableElimination => {
                write!(f, "Unused Variable Elimination")
            }
        }
    }
}

/// A record of one applied transformation, for the visualization reporter.
#[derive(Clone, Debug)]
pub struct OptimizationDetail {
    pub kind: OptimizationKind,
    pub description: String,
    pub before: String,
    pub after: String,
    pub line: Option<u32>,
}

#[derive(Default)]
pub struct Optimizer {
    count: usize,
    details: Vec<OptimizationDetail>,
}

impl Optimizer {
    pub fn new() -> Self {
        Optimizer::default()
    }

    /// Total number of transformations applied so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn details(&self) -> &[OptimizationDetail] {
        &self.details
    }

    pub fn into_details(self) -> Vec<OptimizationDetail> {
        self.details
    }

    /// Runs the three passes and returns the rewritten program.
    pub fn optimize(&mut self, program: Program) -> Program {
        debug!("pass 1: constant folding");
        let program = Program {
            statements: program
                .statements
                .into_iter()
                .map(|stmt| self.fold_stmt(stmt))
                .collect(),
        };

        debug!("pass 2: dead code elimination");
        let program = Program {
            statements: self.eliminate_stmts(program.statements, false),
        };

        debug!("pass 3: unused variable elimination");
        let program = self.eliminate_unused(program);

        debug!("optimization completed: {} transformation(s)", self.count);
        program
    }

    fn record(
        &mut self,
        kind: OptimizationKind,
        description: String,
        before: String,
        after: String,
        line: Option<u32>,
    ) {
        self.count += 1;
        self.details.push(OptimizationDetail {
            kind,
            description,
            before,
            after,
            line,
        });
    }

    // ----- pass 1: constant folding -----

    fn fold_stmt(&mut self, stmt: Stmt) -> Stmt {
        let Stmt { kind, start, end } = stmt;
        let line = Some(start.lineno);
        let kind = match kind {
            StmtKind::VarDecl {
                name,
                ty,
                init: Some(init),
            } => {
                let before = init.to_string();
                let (init, changed) = self.fold_expr(*init);
                if changed {
                    self.record(
                        OptimizationKind::ConstantFolding,
                        format!("folded constant in declaration of '{name}'"),
                        before,
                        init.to_string(),
                        line,
                    );
                }
                StmtKind::VarDecl {
                    name,
                    ty,
                    init: Some(Box::new(init)),
                }
            }
            StmtKind::Assignment {
                target,
                index,
                value,
            } => {
                let before = value.to_string();
                let (value, value_changed) = self.fold_expr(*value);
                let (index, index_changed) = match index {
                    Some(index) => {
                        let (index, changed) = self.fold_expr(*index);
                        (Some(Box::new(index)), changed)
                    }
                    None => (None, false),
                };
                if value_changed || index_changed {
                    self.record(
                        OptimizationKind::ConstantFolding,
                        format!("folded constant in assignment to '{target}'"),
                        before,
                        value.to_string(),
                        line,
                    );
                }
                StmtKind::Assignment {
                    target,
                    index,
                    value: Box::new(value),
                }
            }
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let before = condition.to_string();
                let (condition, changed) = self.fold_expr(*condition);
                if changed {
                    self.record(
                        OptimizationKind::ConstantFolding,
                        "folded constant in if condition".to_string(),
                        before,
                        condition.to_string(),
                        line,
                    );
                }
                StmtKind::If {
                    condition: Box::new(condition),
                    then_body: then_body.into_iter().map(|s| self.fold_stmt(s)).collect(),
                    else_body: else_body
                        .map(|body| body.into_iter().map(|s| self.fold_stmt(s)).collect()),
                }
            }
            StmtKind::While { condition, body } => {
                let before = condition.to_string();
                let (condition, changed) = self.fold_expr(*condition);
                if changed {
                    self.record(
                        OptimizationKind::ConstantFolding,
                        "folded constant in while condition".to_string(),
                        before,
                        condition.to_string(),
                        line,
                    );
                }
                StmtKind::While {
                    condition: Box::new(condition),
                    body: body.into_iter().map(|s| self.fold_stmt(s)).collect(),
                }
            }
            StmtKind::For {
                variable,
                reverse,
                from,
                to,
                body,
            } => {
                let (from, from_changed) = self.fold_expr(*from);
                let (to, to_changed) = self.fold_expr(*to);
                if from_changed || to_changed {
                    self.record(
                        OptimizationKind::ConstantFolding,
                        format!("folded constant in range of for loop over '{variable}'"),
                        String::new(),
                        format!("{from} .. {to}"),
                        line,
                    );
                }
                StmtKind::For {
                    variable,
                    reverse,
                    from: Box::new(from),
                    to: Box::new(to),
                    body: body.into_iter().map(|s| self.fold_stmt(s)).collect(),
                }
            }
            StmtKind::Print { value } => {
                let before = value.to_string();
                let (value, changed) = self.fold_expr(*value);
                if changed {
                    self.record(
                        OptimizationKind::ConstantFolding,
                        "folded constant in print statement".to_string(),
                        before,
                        value.to_string(),
                        line,
                    );
                }
                StmtKind::Print {
                    value: Box::new(value),
                }
            }
            StmtKind::Return { value: Some(value) } => {
                let before = value.to_string();
                let (value, changed) = self.fold_expr(*value);
                if changed {
                    self.record(
                        OptimizationKind::ConstantFolding,
                        "folded constant in return statement".to_string(),
                        before,
                        value.to_string(),
                        line,
                    );
                }
                StmtKind::Return {
                    value: Some(Box::new(value)),
                }
            }
            StmtKind::RoutineDecl {
                name,
                params,
                return_type,
                body,
            } => StmtKind::RoutineDecl {
                name,
                params,
                return_type,
                body: body.into_iter().map(|s| self.fold_stmt(s)).collect(),
            },
            StmtKind::RoutineCall { name, args } => {
                let mut changed = false;
                let args = args
                    .into_iter()
                    .map(|arg| {
                        let (arg, c) = self.fold_expr(arg);
                        changed |= c;
                        arg
                    })
                    .collect();
                if changed {
                    self.record(
                        OptimizationKind::ConstantFolding,
                        format!("folded constants in arguments of call to '{name}'"),
                        String::new(),
                        String::new(),
                        line,
                    );
                }
                StmtKind::RoutineCall { name, args }
            }
            other => other,
        };
        Stmt { kind, start, end }
    }

    /// Bottom-up fold. The returned flag is true when anything under this
    /// expression was rewritten.
    fn fold_expr(&mut self, expr: Expr) -> (Expr, bool) {
        let Expr { kind, start, end } = expr;
        let rebuild = |kind| Expr { kind, start, end };
        match kind {
            ExprKind::Binary { left, op, right } => {
                let (left, left_changed) = self.fold_expr(*left);
                let (right, right_changed) = self.fold_expr(*right);
                if let Some(folded) = fold_binary(&left.kind, op, &right.kind) {
                    return (rebuild(folded), true);
                }
                (
                    rebuild(ExprKind::Binary {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    }),
                    left_changed || right_changed,
                )
            }
            ExprKind::Unary { op, operand } => {
                let (operand, changed) = self.fold_expr(*operand);
                match (op, &operand.kind) {
                    (UnOp::Not, ExprKind::Boolean(value)) => {
                        (rebuild(ExprKind::Boolean(!value)), true)
                    }
                    (UnOp::Neg, ExprKind::Integer(value)) => {
                        (rebuild(ExprKind::Integer(value.wrapping_neg())), true)
                    }
                    (UnOp::Neg, ExprKind::Real(value)) => {
                        (rebuild(ExprKind::Real(-value)), true)
                    }
                    _ => (
                        rebuild(ExprKind::Unary {
                            op,
                            operand: Box::new(operand),
                        }),
                        changed,
                    ),
                }
            }
            ExprKind::ArrayAccess { name, index } => {
                let (index, changed) = self.fold_expr(*index);
                (
                    rebuild(ExprKind::ArrayAccess {
                        name,
                        index: Box::new(index),
                    }),
                    changed,
                )
            }
            ExprKind::Call { name, args } => {
                let mut changed = false;
                let args = args
                    .into_iter()
                    .map(|arg| {
                        let (arg, c) = self.fold_expr(arg);
                        changed |= c;
                        arg
                    })
                    .collect();
                (rebuild(ExprKind::Call { name, args }), changed)
            }
            ExprKind::Cast { expr, target } => {
                let (expr, changed) = self.fold_expr(*expr);
                (
                    rebuild(ExprKind::Cast {
                        expr: Box::new(expr),
                        target,
                    }),
                    changed,
                )
            }
            other => (rebuild(other), false),
        }
    }

    // ----- pass 2: dead code elimination -----

    /// Rewrites a statement list. `truncate_after_return` is set for routine
    /// bodies, where nothing after a top-level `return` can execute.
    fn eliminate_stmts(&mut self, stmts: Vec<Stmt>, truncate_after_return: bool) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            out.extend(self.eliminate_stmt(stmt));
        }
        if truncate_after_return {
            if let Some(position) = out
                .iter()
                .position(|stmt| matches!(stmt.kind, StmtKind::Return { .. }))
            {
                if position + 1 < out.len() {
                    let dropped = out.split_off(position + 1);
                    self.record(
                        OptimizationKind::DeadCodeElimination,
                        "removed unreachable code after return".to_string(),
                        dropped.iter().map(|s| s.to_string()).collect(),
                        String::new(),
                        dropped.first().map(|s| s.start.lineno),
                    );
                }
            }
        }
        out
    }

    /// A single statement may rewrite to any number of statements: branches
    /// of a decided `if` are spliced into the surrounding list.
    fn eliminate_stmt(&mut self, stmt: Stmt) -> Vec<Stmt> {
        let Stmt { kind, start, end } = stmt;
        let line = Some(start.lineno);
        match kind {
            StmtKind::RoutineDecl {
                name,
                params,
                return_type,
                body,
            } => {
                let body = self.eliminate_stmts(body, true);
                vec![Stmt {
                    kind: StmtKind::RoutineDecl {
                        name,
                        params,
                        return_type,
                        body,
                    },
                    start,
                    end,
                }]
            }
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => match condition.kind {
                ExprKind::Boolean(true) => {
                    self.record(
                        OptimizationKind::DeadCodeElimination,
                        "if (true): replaced by its then branch".to_string(),
                        "if true then ...".to_string(),
                        String::new(),
                        line,
                    );
                    self.eliminate_stmts(then_body, false)
                }
                ExprKind::Boolean(false) => {
                    self.record(
                        OptimizationKind::DeadCodeElimination,
                        "if (false): replaced by its else branch".to_string(),
                        "if false then ...".to_string(),
                        String::new(),
                        line,
                    );
                    match else_body {
                        Some(else_body) => self.eliminate_stmts(else_body, false),
                        None => Vec::new(),
                    }
                }
                _ => {
                    let then_body = self.eliminate_stmts(then_body, false);
                    let else_body = else_body.map(|body| self.eliminate_stmts(body, false));
                    vec![Stmt {
                        kind: StmtKind::If {
                            condition,
                            then_body,
                            else_body,
                        },
                        start,
                        end,
                    }]
                }
            },
            StmtKind::While { condition, body } => {
                if matches!(condition.kind, ExprKind::Boolean(false)) {
                    self.record(
                        OptimizationKind::DeadCodeElimination,
                        "while (false): removed loop body".to_string(),
                        "while false loop ...".to_string(),
                        String::new(),
                        line,
                    );
                    vec![Stmt {
                        kind: StmtKind::While {
                            condition,
                            body: Vec::new(),
                        },
                        start,
                        end,
                    }]
                } else {
                    let body = self.eliminate_stmts(body, false);
                    vec![Stmt {
                        kind: StmtKind::While { condition, body },
                        start,
                        end,
                    }]
                }
            }
            StmtKind::For {
                variable,
                reverse,
                from,
                to,
                body,
            } => {
                let body = self.eliminate_stmts(body, false);
                vec![Stmt {
                    kind: StmtKind::For {
                        variable,
                        reverse,
                        from,
                        to,
                        body,
                    },
                    start,
                    end,
                }]
            }
            other => vec![Stmt {
                kind: other,
                start,
                end,
            }],
        }
    }

    // ----- pass 3: unused variable elimination -----

    fn eliminate_unused(&mut self, program: Program) -> Program {
        let mut used = FxHashSet::default();
        for stmt in &program.statements {
            collect_used_stmt(stmt, &mut used);
        }

        let statements = program
            .statements
            .into_iter()
            .filter_map(|stmt| match &stmt.kind {
                StmtKind::VarDecl { name, .. } | StmtKind::ArrayDecl { name, .. } => {
                    if used.contains(name) {
                        Some(stmt)
                    } else {
                        self.record(
                            OptimizationKind::UnusedVariableElimination,
                            format!("removed unused variable '{name}'"),
                            stmt.to_string(),
                            String::new(),
                            Some(stmt.start.lineno),
                        );
                        None
                    }
                }
                StmtKind::RoutineDecl { .. } => Some(self.filter_unused_locals(stmt, &used)),
                _ => Some(stmt),
            })
            .collect();
        Program { statements }
    }

    fn filter_unused_locals(&mut self, stmt: Stmt, used: &FxHashSet<String>) -> Stmt {
        let Stmt { kind, start, end } = stmt;
        let StmtKind::RoutineDecl {
            name,
            params,
            return_type,
            body,
        } = kind
        else {
            unreachable!("only called on routine declarations");
        };

        let body = body
            .into_iter()
            .filter_map(|stmt| match &stmt.kind {
                StmtKind::VarDecl { name: var, .. } | StmtKind::ArrayDecl { name: var, .. } => {
                    if used.contains(var) {
                        Some(stmt)
                    } else {
                        self.record(
                            OptimizationKind::UnusedVariableElimination,
                            format!("removed unused local variable '{var}' in routine '{name}'"),
                            stmt.to_string(),
                            String::new(),
                            Some(stmt.start.lineno),
                        );
                        None
                    }
                }
                _ => Some(stmt),
            })
            .collect();

        Stmt {
            kind: StmtKind::RoutineDecl {
                name,
                params,
                return_type,
                body,
            },
            start,
            end,
        }
    }
}

fn fold_binary(left: &ExprKind, op: BinOp, right: &ExprKind) -> Option<ExprKind> {
    use ExprKind::{Boolean, Integer, Real};
    match (left, right) {
        (Integer(a), Integer(b)) => {
            let (a, b) = (*a, *b);
            Some(match op {
                BinOp::Add => Integer(a.wrapping_add(b)),
                BinOp::Sub => Integer(a.wrapping_sub(b)),
                BinOp::Mul => Integer(a.wrapping_mul(b)),
                BinOp::Div if b != 0 => Integer(a.wrapping_div(b)),
                BinOp::Mod if b != 0 => Integer(a.wrapping_rem(b)),
                BinOp::Gt => Boolean(a > b),
                BinOp::Lt => Boolean(a < b),
                BinOp::Ge => Boolean(a >= b),
                BinOp::Le => Boolean(a <= b),
                BinOp::Eq => Boolean(a == b),
                BinOp::Ne => Boolean(a != b),
                _ => return None,
            })
        }
        (Real(_), Real(_)) | (Integer(_), Real(_)) | (Real(_), Integer(_)) => {
            let a = match left {
                Integer(v) => *v as f64,
                Real(v) => *v,
                _ => unreachable!(),
            };
            let b = match right {
                Integer(v) => *v as f64,
                Real(v) => *v,
                _ => unreachable!(),
            };
            Some(match op {
                BinOp::Add => Real(a + b),
                BinOp::Sub => Real(a - b),
                BinOp::Mul => Real(a * b),
                BinOp::Div if b != 0.0 => Real(a / b),
                BinOp::Gt => Boolean(a > b),
                BinOp::Lt => Boolean(a < b),
                BinOp::Ge => Boolean(a >= b),
                BinOp::Le => Boolean(a <= b),
                BinOp::Eq => Boolean(a == b),
                BinOp::Ne => Boolean(a != b),
                _ => return None,
            })
        }
        (Boolean(a), Boolean(b)) => Some(match op {
            BinOp::And => Boolean(*a && *b),
            BinOp::Or => Boolean(*a || *b),
            BinOp::Xor => Boolean(a != b),
            _ => return None,
        }),
        _ => None,
    }
}

fn collect_used_stmt(stmt: &Stmt, used: &mut FxHashSet<String>) {
    match &stmt.kind {
        StmtKind::VarDecl { init, .. } => {
            if let Some(init) = init {
                collect_used_expr(init, used);
            }
        }
        StmtKind::Assignment {
            target,
            index,
            value,
        } => {
            // An assignment keeps its target alive; the live set is
            // deliberately conservative.
            let name = target.split('.').next().unwrap_or(target);
            used.insert(name.to_string());
            collect_used_expr(value, used);
            if let Some(index) = index {
                collect_used_expr(index, used);
            }
        }
        StmtKind::If {
            condition,
            then_body,
            else_body,
        } => {
            collect_used_expr(condition, used);
            for stmt in then_body {
                collect_used_stmt(stmt, used);
            }
            if let Some(else_body) = else_body {
                for stmt in else_body {
                    collect_used_stmt(stmt, used);
                }
            }
        }
        StmtKind::While { condition, body } => {
            collect_used_expr(condition, used);
            for stmt in body {
                collect_used_stmt(stmt, used);
            }
        }
        StmtKind::For {
            variable,
            from,
            to,
            body,
            ..
        } => {
            used.insert(variable.clone());
            collect_used_expr(from, used);
            collect_used_expr(to, used);
            for stmt in body {
                collect_used_stmt(stmt, used);
            }
        }
        StmtKind::Print { value } => collect_used_expr(value, used),
        StmtKind::Read { variable } => {
            used.insert(variable.clone());
        }
        StmtKind::Return { value } => {
            if let Some(value) = value {
                collect_used_expr(value, used);
            }
        }
        StmtKind::RoutineDecl { body, .. } => {
            for stmt in body {
                collect_used_stmt(stmt, used);
            }
        }
        StmtKind::RoutineCall { args, .. } => {
            for arg in args {
                collect_used_expr(arg, used);
            }
        }
        StmtKind::ArrayDecl { .. } | StmtKind::TypeDecl { .. } => {}
    }
}

fn collect_used_expr(expr: &Expr, used: &mut FxHashSet<String>) {
    match &expr.kind {
        ExprKind::Var(name) => {
            used.insert(name.clone());
        }
        ExprKind::ArrayAccess { name, index } => {
            used.insert(name.clone());
            collect_used_expr(index, used);
        }
        ExprKind::RecordAccess { record, .. } => {
            used.insert(record.clone());
        }
        ExprKind::Unary { operand, .. } => collect_used_expr(operand, used),
        ExprKind::Binary { left, right, .. } => {
            collect_used_expr(left, used);
            collect_used_expr(right, used);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                collect_used_expr(arg, used);
            }
        }
        ExprKind::Cast { expr, .. } => collect_used_expr(expr, used),
        ExprKind::Integer(_) | ExprKind::Real(_) | ExprKind::Boolean(_) | ExprKind::Str(_) => {}
    }
}
