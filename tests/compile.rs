//! End-to-end pipeline scenarios driven through the public API.

use il_lang::ast::{ExprKind, StmtKind};
use il_lang::errors::{Diagnostics, Error};
use il_lang::{check, compile, CompileOptions};

fn optimizing() -> CompileOptions {
    CompileOptions { optimize: true }
}

#[test]
fn test_scenario_folds_initializer() {
    let input = "routine main() is var x: integer is 2+3; print(x); end;";
    let compilation = compile(input, &optimizing()).unwrap();
    assert!(compilation.optimizations >= 1);
    let StmtKind::RoutineDecl { body, .. } = &compilation.program.statements[0].kind else {
        panic!("expected a routine");
    };
    let StmtKind::VarDecl {
        init: Some(init), ..
    } = &body[0].kind
    else {
        panic!("expected an initialized declaration");
    };
    assert!(matches!(init.kind, ExprKind::Integer(5)));
    assert!(compilation.code.main.contains("iconst_5"));
}

#[test]
fn test_scenario_undefined_variable() {
    let input = "routine main() is print(y); end;";
    let error = compile(input, &CompileOptions::default()).unwrap_err();
    let Error::Semantic(errors) = &error else {
        panic!("expected semantic errors, got {error}");
    };
    assert!(errors
        .iter()
        .any(|error| error.to_string().contains("Undefined variable 'y'")));
}

#[test]
fn test_scenario_assignment_mismatch() {
    let input = "routine main() is var x: integer is 42; x := true; end;";
    let error = compile(input, &CompileOptions::default()).unwrap_err();
    let Error::Semantic(errors) = &error else {
        panic!("expected semantic errors, got {error}");
    };
    assert!(errors
        .iter()
        .any(|error| error.to_string().contains("Type mismatch")));
}

#[test]
fn test_scenario_missing_field() {
    let input = "type P is record var age: integer; end; \
                 routine main() is var p: P; p.height := 1; end;";
    let error = compile(input, &CompileOptions::default()).unwrap_err();
    let Error::Semantic(errors) = &error else {
        panic!("expected semantic errors, got {error}");
    };
    assert!(errors
        .iter()
        .any(|error| error.to_string().contains("does not exist")));
}

#[test]
fn test_scenario_array_program_compiles() {
    let input = "routine main() is var a: array[5] integer; a[0] := 1; print(a[0]); end;";
    assert!(compile(input, &CompileOptions::default()).is_ok());
}

#[test]
fn test_scenario_arity_mismatch() {
    let input = "routine f(x: integer, y: integer): integer is return x+y; end; \
                 routine main() is var r: integer is f(1); end;";
    let error = compile(input, &CompileOptions::default()).unwrap_err();
    let Error::Semantic(errors) = &error else {
        panic!("expected semantic errors, got {error}");
    };
    assert!(errors
        .iter()
        .any(|error| error.to_string().contains("Wrong number of arguments")));
}

#[test]
fn test_scenario_if_true_keeps_then_branch() {
    let input = "if true then print(1); else print(2); end;";
    let compilation = compile(input, &optimizing()).unwrap();
    assert!(compilation.optimizations >= 1);
    assert_eq!(compilation.program.statements.len(), 1);
    assert!(matches!(
        compilation.program.statements[0].kind,
        StmtKind::Print { .. }
    ));
}

#[test]
fn test_scenario_unused_global_pruned() {
    let input = "var u: integer is 9; routine main() is print(1); end;";
    let compilation = compile(input, &optimizing()).unwrap();
    assert!(compilation.optimizations >= 1);
    assert!(!compilation
        .program
        .statements
        .iter()
        .any(|stmt| matches!(&stmt.kind, StmtKind::VarDecl { name, .. } if name == "u")));
    assert!(!compilation.code.main.contains(".field private static u"));
}

#[test]
fn test_unoptimized_compilation_leaves_ast_alone() {
    let input = "var u: integer is 9; routine main() is print(2+3); end;";
    let compilation = compile(input, &CompileOptions::default()).unwrap();
    assert_eq!(compilation.optimizations, 0);
    assert!(compilation
        .program
        .statements
        .iter()
        .any(|stmt| matches!(&stmt.kind, StmtKind::VarDecl { name, .. } if name == "u")));
}

#[test]
fn test_diagnostics_sink_kinds() {
    let error = compile("var x: integer is @;", &CompileOptions::default()).unwrap_err();
    let diagnostics = Diagnostics::from(&error);
    assert_eq!(diagnostics.len(), 1);
    let rendered = diagnostics.iter().next().unwrap().to_string();
    assert!(rendered.starts_with("lexical error:"), "{rendered}");
    assert!(rendered.contains("line 1"), "{rendered}");

    let error = compile("routine main() is", &CompileOptions::default()).unwrap_err();
    let diagnostics = Diagnostics::from(&error);
    let rendered = diagnostics.iter().next().unwrap().to_string();
    assert!(rendered.starts_with("syntax error:"), "{rendered}");

    let error = compile(
        "routine main() is print(y); end;",
        &CompileOptions::default(),
    )
    .unwrap_err();
    let diagnostics = Diagnostics::from(&error);
    assert!(diagnostics.len() >= 1);
    assert!(diagnostics
        .iter()
        .all(|diagnostic| diagnostic.to_string().starts_with("semantic error:")));
}

#[test]
fn test_check_classifies_outcomes() {
    // OK.
    let (_, errors) = check("routine main() is print(1); end;").unwrap();
    assert!(errors.is_empty());

    // Parse error.
    assert!(check("routine main( is end;").is_err());

    // Semantic error list.
    let (_, errors) = check("routine main() is print(y); end;").unwrap();
    assert!(!errors.is_empty());
}

#[test]
fn test_larger_program_compiles_end_to_end() {
    let input = r#"
type Account is record
    var balance: integer;
    var overdrawn: boolean;
end;

var acct: Account;
var history: array[10] integer;

routine deposit(amount: integer): integer is
    acct.balance := acct.balance + amount;
    return acct.balance;
end;

routine describe(balance: integer): string is
    if balance < 0 then
        return "overdrawn by " + (-balance);
    end;
    return "balance: " + balance;
end;

routine main() is
    acct.balance := 100;
    acct.overdrawn := false;
    for i in 1 .. 10 loop
        history[i] := deposit(i * 10);
    end;
    while acct.balance > 500 loop
        acct.balance := acct.balance - 100;
    end;
    print(describe(acct.balance));
    print(acct.balance as real);
end;
"#;
    let compilation = compile(input, &optimizing()).unwrap();
    assert_eq!(compilation.code.records.len(), 1);
    assert!(compilation.code.main.contains(".method public static deposit(I)I"));
    assert!(compilation
        .code
        .main
        .contains(".method public static describe(I)Ljava/lang/String;"));
}
