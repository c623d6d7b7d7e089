use il_lang::ast::{Expr, ExprKind, Program, Stmt, StmtKind};
use il_lang::optimizer::Optimizer;
use il_lang::parser::parse;

fn optimized(input: &str) -> (Program, usize) {
    let program = parse(input).expect("expected the input to parse");
    let mut optimizer = Optimizer::new();
    let program = optimizer.optimize(program);
    (program, optimizer.count())
}

/// No binary or unary expression over literal operands may survive a fold.
fn assert_fully_folded_expr(expr: &Expr) {
    match &expr.kind {
        ExprKind::Binary { left, op, right } => {
            let foldable = matches!(
                (&left.kind, &right.kind),
                (
                    ExprKind::Integer(_) | ExprKind::Real(_) | ExprKind::Boolean(_),
                    ExprKind::Integer(_) | ExprKind::Real(_) | ExprKind::Boolean(_),
                )
            );
            assert!(
                !foldable || matches!((op, &right.kind), (il_lang::ast::BinOp::Div | il_lang::ast::BinOp::Mod, ExprKind::Integer(0))),
                "unfolded constant expression: {expr}"
            );
            assert_fully_folded_expr(left);
            assert_fully_folded_expr(right);
        }
        ExprKind::Unary { operand, .. } => assert_fully_folded_expr(operand),
        ExprKind::ArrayAccess { index, .. } => assert_fully_folded_expr(index),
        ExprKind::Call { args, .. } => args.iter().for_each(assert_fully_folded_expr),
        ExprKind::Cast { expr, .. } => assert_fully_folded_expr(expr),
        _ => {}
    }
}

fn assert_fully_folded(stmts: &[Stmt]) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::VarDecl {
                init: Some(init), ..
            } => assert_fully_folded_expr(init),
            StmtKind::Assignment { value, index, .. } => {
                assert_fully_folded_expr(value);
                if let Some(index) = index {
                    assert_fully_folded_expr(index);
                }
            }
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => {
                assert_fully_folded_expr(condition);
                assert_fully_folded(then_body);
                if let Some(else_body) = else_body {
                    assert_fully_folded(else_body);
                }
            }
            StmtKind::While { condition, body } => {
                assert_fully_folded_expr(condition);
                assert_fully_folded(body);
            }
            StmtKind::For { from, to, body, .. } => {
                assert_fully_folded_expr(from);
                assert_fully_folded_expr(to);
                assert_fully_folded(body);
            }
            StmtKind::Print { value } => assert_fully_folded_expr(value),
            StmtKind::Return { value: Some(value) } => assert_fully_folded_expr(value),
            StmtKind::RoutineDecl { body, .. } => assert_fully_folded(body),
            _ => {}
        }
    }
}

#[test]
fn test_fold_integer_initializer() {
    let (program, count) = optimized("routine main() is var x: integer is 2+3; print(x); end;");
    assert!(count >= 1);
    let StmtKind::RoutineDecl { body, .. } = &program.statements[0].kind else {
        panic!("expected a routine");
    };
    let StmtKind::VarDecl {
        init: Some(init), ..
    } = &body[0].kind
    else {
        panic!("expected a declaration with initializer");
    };
    assert!(matches!(init.kind, ExprKind::Integer(5)));
}

#[test]
fn test_fold_nested_and_mixed() {
    let (program, _) = optimized(
        "routine main() is \
         var a: integer is (1 + 2) * (3 + 4); \
         var b: real is 1 + 0.5; \
         var c: boolean is 1 < 2 and true; \
         var d: integer is -(2 + 3); \
         print(a); print(b); print(c); print(d); end;",
    );
    let StmtKind::RoutineDecl { body, .. } = &program.statements[0].kind else {
        panic!("expected a routine");
    };
    assert!(matches!(
        body[0].kind,
        StmtKind::VarDecl { init: Some(ref init), .. } if matches!(init.kind, ExprKind::Integer(21))
    ));
    assert!(matches!(
        body[1].kind,
        StmtKind::VarDecl { init: Some(ref init), .. } if matches!(init.kind, ExprKind::Real(v) if v == 1.5)
    ));
    assert!(matches!(
        body[2].kind,
        StmtKind::VarDecl { init: Some(ref init), .. } if matches!(init.kind, ExprKind::Boolean(true))
    ));
    assert!(matches!(
        body[3].kind,
        StmtKind::VarDecl { init: Some(ref init), .. } if matches!(init.kind, ExprKind::Integer(-5))
    ));
    assert_fully_folded(&program.statements);
}

#[test]
fn test_division_by_zero_not_folded() {
    let (program, _) = optimized("routine main() is print(1 / 0); end;");
    let StmtKind::RoutineDecl { body, .. } = &program.statements[0].kind else {
        panic!("expected a routine");
    };
    let StmtKind::Print { value } = &body[0].kind else {
        panic!("expected print");
    };
    assert!(matches!(value.kind, ExprKind::Binary { .. }));
}

#[test]
fn test_if_true_splices_then_branch() {
    let (program, count) = optimized("if true then print(1); else print(2); end;");
    assert!(count >= 1);
    assert_eq!(program.statements.len(), 1);
    assert!(matches!(program.statements[0].kind, StmtKind::Print { .. }));
}

#[test]
fn test_if_false_splices_else_branch() {
    let (program, _) = optimized("if false then print(1); else print(2); print(3); end;");
    assert_eq!(program.statements.len(), 2);
    assert!(program
        .statements
        .iter()
        .all(|stmt| matches!(stmt.kind, StmtKind::Print { .. })));
}

#[test]
fn test_if_false_without_else_vanishes() {
    let (program, _) = optimized("if false then print(1); end;");
    assert!(program.statements.is_empty());
}

#[test]
fn test_folded_condition_feeds_dead_code_pass() {
    // `1 < 2` folds to `true` in pass 1, then pass 2 splices the branch.
    let (program, _) = optimized("if 1 < 2 then print(1); else print(2); end;");
    assert_eq!(program.statements.len(), 1);
    assert!(matches!(program.statements[0].kind, StmtKind::Print { .. }));
}

#[test]
fn test_while_false_empties_body() {
    let (program, count) = optimized("while false loop print(1); end;");
    assert!(count >= 1);
    let StmtKind::While { body, .. } = &program.statements[0].kind else {
        panic!("expected the while to survive with an empty body");
    };
    assert!(body.is_empty());
}

#[test]
fn test_code_after_return_is_dropped() {
    let (program, count) = optimized(
        "routine f(): integer is return 1; print(2); print(3); end;",
    );
    assert!(count >= 1);
    let StmtKind::RoutineDecl { body, .. } = &program.statements[0].kind else {
        panic!("expected a routine");
    };
    assert_eq!(body.len(), 1);
    assert!(matches!(body[0].kind, StmtKind::Return { .. }));
}

#[test]
fn test_no_statement_after_top_level_return_in_any_routine() {
    let (program, _) = optimized(
        "routine f(): integer is if true then return 1; end; print(9); end; \
         routine main() is print(f()); end;",
    );
    for stmt in &program.statements {
        if let StmtKind::RoutineDecl { body, .. } = &stmt.kind {
            if let Some(position) = body
                .iter()
                .position(|stmt| matches!(stmt.kind, StmtKind::Return { .. }))
            {
                assert_eq!(position, body.len() - 1);
            }
        }
    }
}

#[test]
fn test_unused_global_removed() {
    let (program, count) = optimized("var u: integer is 9; routine main() is print(1); end;");
    assert!(count >= 1);
    assert!(!program
        .statements
        .iter()
        .any(|stmt| matches!(&stmt.kind, StmtKind::VarDecl { name, .. } if name == "u")));
}

#[test]
fn test_used_global_kept() {
    let (program, _) = optimized("var g: integer is 9; routine main() is print(g); end;");
    assert!(program
        .statements
        .iter()
        .any(|stmt| matches!(&stmt.kind, StmtKind::VarDecl { name, .. } if name == "g")));
}

#[test]
fn test_assignment_counts_as_use() {
    // Conservative liveness: a name that is only ever assigned stays.
    let (program, _) = optimized("var g: integer; routine main() is g := 1; end;");
    assert!(program
        .statements
        .iter()
        .any(|stmt| matches!(&stmt.kind, StmtKind::VarDecl { name, .. } if name == "g")));
}

#[test]
fn test_unused_local_removed() {
    let (program, _) = optimized(
        "routine main() is var dead: integer is 1; print(2); end;",
    );
    let StmtKind::RoutineDecl { body, .. } = &program.statements[0].kind else {
        panic!("expected a routine");
    };
    assert!(!body
        .iter()
        .any(|stmt| matches!(&stmt.kind, StmtKind::VarDecl { name, .. } if name == "dead")));
}

#[test]
fn test_unused_array_removed() {
    let (program, _) = optimized("var a: array[5] integer; routine main() is print(1); end;");
    assert!(!program
        .statements
        .iter()
        .any(|stmt| matches!(stmt.kind, StmtKind::ArrayDecl { .. })));
}

#[test]
fn test_details_are_recorded() {
    let program = parse("routine main() is var x: integer is 2+3; print(x); end;").unwrap();
    let mut optimizer = Optimizer::new();
    let _ = optimizer.optimize(program);
    assert_eq!(optimizer.count(), optimizer.details().len());
    assert!(optimizer
        .details()
        .iter()
        .any(|detail| detail.before.contains("2 + 3")));
}
