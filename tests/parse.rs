use il_lang::ast::{BinOp, ExprKind, StmtKind};
use il_lang::errors::Error;
use il_lang::parser::parse;

#[test]
fn test_statements() {
    let input = r#"
var x: integer is 5;
var r: real;
var a: array[10] boolean;
type Point is record
    var x: integer;
    var y: integer;
end;
routine dist(p: integer, q: integer): integer is
    return p - q;
end;
routine main() is
    x := x + 1;
    a[1] := true;
    if x > 3 then
        print(x);
    else
        print(0);
    end;
    while x < 10 loop
        x := x + 1;
    end;
    for i in 1 .. 10 loop
        print(i);
    end;
    for i in reverse 10 .. 1 loop
        print(i);
    end;
    read x;
    dist(1, 2);
end;
"#;
    let program = parse(input).unwrap();
    assert_eq!(program.statements.len(), 6);
    assert!(matches!(
        program.statements[0].kind,
        StmtKind::VarDecl { .. }
    ));
    assert!(matches!(
        program.statements[2].kind,
        StmtKind::ArrayDecl { .. }
    ));
    assert!(matches!(
        program.statements[3].kind,
        StmtKind::TypeDecl { .. }
    ));
    let StmtKind::RoutineDecl { name, body, .. } = &program.statements[5].kind else {
        panic!("expected a routine declaration");
    };
    assert_eq!(name, "main");
    assert_eq!(body.len(), 8);
}

#[test]
fn test_precedence() {
    let program = parse("x := 1 + 2 * 3;").unwrap();
    let StmtKind::Assignment { value, .. } = &program.statements[0].kind else {
        panic!("expected an assignment");
    };
    // `*` binds tighter than `+`.
    let ExprKind::Binary { op, right, .. } = &value.kind else {
        panic!("expected a binary expression");
    };
    assert_eq!(*op, BinOp::Add);
    assert!(matches!(
        right.kind,
        ExprKind::Binary {
            op: BinOp::Mul,
            ..
        }
    ));
}

#[test]
fn test_logic_precedence() {
    let program = parse("x := a and b or not c;").unwrap();
    let StmtKind::Assignment { value, .. } = &program.statements[0].kind else {
        panic!("expected an assignment");
    };
    let ExprKind::Binary { op, .. } = &value.kind else {
        panic!("expected a binary expression");
    };
    assert_eq!(*op, BinOp::Or);
}

#[test]
fn test_not_equal_spellings() {
    for spelling in ["/=", "!=", "<>"] {
        let program = parse(&format!("x := 1 {spelling} 2;")).unwrap();
        let StmtKind::Assignment { value, .. } = &program.statements[0].kind else {
            panic!("expected an assignment");
        };
        assert!(matches!(value.kind, ExprKind::Binary { op: BinOp::Ne, .. }));
    }
}

#[test]
fn test_record_field_forms() {
    let program = parse("p.x := p.y;").unwrap();
    let StmtKind::Assignment { target, value, .. } = &program.statements[0].kind else {
        panic!("expected an assignment");
    };
    assert_eq!(target, "p.x");
    assert!(matches!(value.kind, ExprKind::RecordAccess { .. }));
}

#[test]
fn test_cast_expression() {
    let program = parse("x := y as real;").unwrap();
    let StmtKind::Assignment { value, .. } = &program.statements[0].kind else {
        panic!("expected an assignment");
    };
    assert!(matches!(value.kind, ExprKind::Cast { .. }));
}

#[test]
fn test_locations() {
    let program = parse("var x: integer;\nvar y: integer;").unwrap();
    assert_eq!(program.statements[0].start.lineno, 1);
    assert_eq!(program.statements[0].start.column, 1);
    assert_eq!(program.statements[1].start.lineno, 2);
}

#[test]
fn test_syntax_error_aborts() {
    let result = parse("routine main() is var x integer; end;");
    assert!(matches!(result, Err(Error::Syntax { .. })));
}

#[test]
fn test_unterminated_string_is_lexical() {
    let result = parse("var s: string is \"oops;");
    assert!(matches!(result, Err(Error::Lexical { .. })));
}

#[test]
fn test_illegal_character_is_lexical() {
    let result = parse("var x: integer is @;");
    assert!(matches!(result, Err(Error::Lexical { .. })));
}

#[test]
fn test_integer_overflow_is_lexical() {
    let result = parse("var x: integer is 99999999999;");
    assert!(matches!(result, Err(Error::Lexical { .. })));
}

#[test]
fn test_nested_routine_rejected() {
    let result = parse("routine outer() is routine inner() is end; end;");
    assert!(matches!(result, Err(Error::Syntax { .. })));
}

#[test]
fn test_pretty_print_round_trip() {
    let input = r#"
var g: integer is 2 + 3 * 4;
type P is record
    var age: integer;
    var height: real;
end;
var p: P;
routine grow(amount: integer): integer is
    var next: integer is g + amount;
    if next > 100 then
        return 100;
    else
        return next;
    end;
end;
routine main() is
    var s: string is "a" + "b";
    for i in reverse 10 .. 1 loop
        g := grow(i);
    end;
    while g > 0 loop
        g := g - 1;
    end;
    p.age := (g as integer);
    print(not (g = 0));
end;
"#;
    let first = parse(input).unwrap();
    let printed = first.to_string();
    let second = parse(&printed).unwrap_or_else(|e| panic!("reparse failed: {e}\n{printed}"));
    assert_eq!(printed, second.to_string());
}
