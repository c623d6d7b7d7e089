use il_lang::check;

fn semantic_errors(input: &str) -> Vec<String> {
    let (_, errors) = check(input).expect("expected the input to parse");
    errors.iter().map(|error| error.to_string()).collect()
}

fn assert_clean(input: &str) {
    let errors = semantic_errors(input);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

fn assert_error_contains(input: &str, needle: &str) {
    let errors = semantic_errors(input);
    assert!(
        errors.iter().any(|error| error.contains(needle)),
        "expected an error containing {needle:?}, got {errors:?}"
    );
}

#[test]
fn test_undefined_variable() {
    assert_error_contains(
        "routine main() is print(y); end;",
        "Undefined variable 'y'",
    );
}

#[test]
fn test_assignment_type_mismatch() {
    assert_error_contains(
        "routine main() is var x: integer is 42; x := true; end;",
        "Type mismatch",
    );
}

#[test]
fn test_unknown_record_field() {
    assert_error_contains(
        "type P is record var age: integer; end; \
         routine main() is var p: P; p.height := 1; end;",
        "does not exist",
    );
}

#[test]
fn test_wrong_argument_count() {
    assert_error_contains(
        "routine f(x: integer, y: integer): integer is return x+y; end; \
         routine main() is var r: integer is f(1); end;",
        "Wrong number of arguments",
    );
}

#[test]
fn test_argument_type_mismatch() {
    assert_error_contains(
        "routine f(x: integer): integer is return x; end; \
         routine main() is var r: integer is f(true); end;",
        "Type mismatch in argument 1",
    );
}

#[test]
fn test_duplicate_routine() {
    assert_error_contains(
        "routine f() is end; routine f() is end;",
        "Routine f is already defined",
    );
}

#[test]
fn test_duplicate_type() {
    assert_error_contains(
        "type T is integer; type T is real;",
        "Type T is already defined",
    );
}

#[test]
fn test_invalid_record_field_type() {
    assert_error_contains(
        "type T is record var f: Widget; end;",
        "Invalid field type Widget in record T",
    );
}

#[test]
fn test_duplicate_variable_in_scope() {
    assert_error_contains(
        "routine main() is var x: integer; var x: real; end;",
        "already declared in this scope",
    );
}

#[test]
fn test_shadowing_across_scopes_is_allowed() {
    assert_clean("var x: integer; routine main() is var x: real; print(x); end;");
}

#[test]
fn test_unknown_type() {
    assert_error_contains("var x: Widget;", "Unknown type Widget");
}

#[test]
fn test_forward_references_to_routines_and_types() {
    assert_clean(
        "routine main() is var p: P; p.age := f(); end; \
         routine f(): integer is return 7; end; \
         type P is record var age: integer; end;",
    );
}

#[test]
fn test_initializer_compatibility() {
    // `real` accepts an integer initializer, not the other way around.
    assert_clean("var r: real is 5;");
    assert_error_contains(
        "var i: integer is 5.0;",
        "Type mismatch in initialization",
    );
}

#[test]
fn test_array_size_must_be_positive() {
    assert_error_contains(
        "routine main() is var a: array[0] integer; end;",
        "Array size must be positive",
    );
}

#[test]
fn test_array_index_must_be_integer() {
    assert_error_contains(
        "var a: array[5] integer; routine main() is a[true] := 1; end;",
        "Array index must be an integer",
    );
}

#[test]
fn test_array_bounds_constant_index() {
    // The upper bound is inclusive: an index equal to the declared size is
    // accepted.
    assert_clean("var a: array[5] integer; routine main() is a[5] := 1; end;");
    assert_error_contains(
        "var a: array[5] integer; routine main() is a[6] := 1; end;",
        "out of bounds",
    );
}

#[test]
fn test_array_element_compatibility() {
    assert_error_contains(
        "var a: array[5] integer; routine main() is a[1] := true; end;",
        "Type mismatch in array assignment",
    );
}

#[test]
fn test_not_an_array() {
    assert_error_contains(
        "var x: integer; routine main() is x[1] := 2; end;",
        "is not an array",
    );
}

#[test]
fn test_not_a_record() {
    assert_error_contains(
        "var x: integer; routine main() is x.field := 2; end;",
        "is not a record",
    );
}

#[test]
fn test_if_condition_must_be_boolean() {
    assert_error_contains(
        "routine main() is if 1 then print(1); end; end;",
        "If statement condition must be a boolean",
    );
}

#[test]
fn test_while_condition_must_be_boolean() {
    assert_error_contains(
        "routine main() is while 1 loop print(1); end; end;",
        "While statement condition must be a boolean",
    );
}

#[test]
fn test_for_declares_its_loop_variable() {
    // The loop declares `i` itself, as integer, in its own scope.
    assert_clean("routine main() is for i in 1 .. 10 loop print(i); end; end;");
    assert_error_contains(
        "routine main() is for i in 1 .. 10 loop print(i); end; print(i); end;",
        "Undefined variable 'i'",
    );
}

#[test]
fn test_for_bounds_must_be_integers() {
    assert_error_contains(
        "routine main() is for i in 1.5 .. 10 loop print(i); end; end;",
        "For loop bound must be an integer",
    );
}

#[test]
fn test_logical_operands_must_be_boolean() {
    assert_error_contains(
        "routine main() is var b: boolean is 1 and 2; end;",
        "Logical operators require boolean operands",
    );
}

#[test]
fn test_arithmetic_on_non_numeric() {
    assert_error_contains(
        "routine main() is var x: integer is true * false; end;",
        "requires numeric operands",
    );
}

#[test]
fn test_string_concatenation_types_as_string() {
    assert_clean("routine main() is var s: string is \"n = \" + 42; print(s); end;");
}

#[test]
fn test_mixed_arithmetic_promotes_to_real() {
    assert_clean("routine main() is var r: real is 1 + 2.5; print(r); end;");
    assert_error_contains(
        "routine main() is var i: integer is 1 + 2.5; end;",
        "Type mismatch in initialization",
    );
}

#[test]
fn test_return_paths() {
    // A routine with a return type needs a return on the way out; an `if`
    // counts only when both branches return.
    assert_clean(
        "routine f(x: integer): integer is \
         if x > 0 then return 1; else return 2; end; end;",
    );
    assert_error_contains(
        "routine f(x: integer): integer is if x > 0 then return 1; end; end;",
        "must have a return statement",
    );
    assert_error_contains(
        "routine f(): integer is print(1); end;",
        "must have a return statement",
    );
}

#[test]
fn test_return_type_compatibility() {
    assert_error_contains(
        "routine f(): integer is return true; end;",
        "Return type mismatch",
    );
    assert_error_contains(
        "routine f(): integer is return; end;",
        "Missing return value",
    );
    assert_error_contains(
        "routine f() is return 1; end;",
        "Unexpected return value",
    );
}

#[test]
fn test_return_at_top_level() {
    assert_error_contains("return 1;", "Return statement not allowed");
}

#[test]
fn test_bare_return_in_procedure_is_fine() {
    assert_clean("routine f() is return; end;");
}

#[test]
fn test_casts() {
    assert_clean(
        "routine main() is \
         var b: boolean is 1 as boolean; \
         var i: integer is 2.5 as integer; \
         var r: real is true as real; \
         print(b); print(i); print(r); end;",
    );
    assert_error_contains(
        "routine main() is var s: string is 1 as string; end;",
        "Invalid type cast",
    );
}

#[test]
fn test_undefined_routine() {
    assert_error_contains("routine main() is frobnicate(); end;", "Undefined routine");
}

#[test]
fn test_errors_are_collected_not_aborted() {
    let errors = semantic_errors(
        "routine main() is print(y); print(z); var x: integer is true; end;",
    );
    assert!(errors.len() >= 3, "expected several errors, got {errors:?}");
}

#[test]
fn test_type_alias_resolution() {
    assert_clean(
        "type Age is integer; \
         routine main() is var a: Age is 30; var b: integer is a + 1; print(b); end;",
    );
}
