use il_lang::{compile, CompileOptions};

fn generate(input: &str) -> il_lang::codegen::GeneratedCode {
    compile(input, &CompileOptions::default())
        .expect("expected the input to compile")
        .code
}

#[test]
fn test_main_unit_skeleton() {
    let code = generate("routine main() is print(1); end;");
    assert!(code.main.contains(".class public Main"));
    assert!(code.main.contains(".super java/lang/Object"));
    assert!(code.main.contains(".method public static main([Ljava/lang/String;)V"));
    assert!(code.main.contains(".method public static main()V"));
    assert!(code.main.contains("invokevirtual java/io/PrintStream/println(I)V"));
    assert!(code.records.is_empty());
}

#[test]
fn test_void_main_is_inlined() {
    let code = generate("routine main() is print(7); end;");
    assert!(!code.main.contains("invokestatic Main/main()"));
    assert!(code.main.contains("bipush 7"));
}

#[test]
fn test_typed_main_is_invoked_and_discarded() {
    let code = generate("routine main(): integer is return 0; end;");
    assert!(code.main.contains("invokestatic Main/main()I"));
    let entry = code
        .main
        .split(".method public static main([Ljava/lang/String;)V")
        .nth(1)
        .unwrap();
    assert!(entry.contains("pop"));
}

#[test]
fn test_global_fields_and_descriptors() {
    let code = generate(
        "var i: integer; var r: real; var b: boolean; var s: string; \
         routine main() is i := 1; r := 1.0; b := true; s := \"x\"; end;",
    );
    assert!(code.main.contains(".field private static i I"));
    assert!(code.main.contains(".field private static r D"));
    assert!(code.main.contains(".field private static b Z"));
    assert!(code.main.contains(".field private static s Ljava/lang/String;"));
    assert!(code.main.contains("putstatic Main/i I"));
    assert!(code.main.contains("putstatic Main/r D"));
}

#[test]
fn test_routine_descriptors_and_locals() {
    let code = generate(
        "routine f(x: integer, y: real): real is return y; end; \
         routine main() is print(f(1, 2.0)); end;",
    );
    assert!(code.main.contains(".method public static f(ID)D"));
    // Real parameters take two slots, so locals are x=0, y=1..2.
    assert!(code.main.contains("dload 1"));
    assert!(code.main.contains("invokestatic Main/f(ID)D"));
}

#[test]
fn test_argument_promotion() {
    let code = generate(
        "routine f(x: real): real is return x; end; \
         routine main() is print(f(3)); end;",
    );
    // An integer argument to a real parameter is widened at the call site.
    assert!(code.main.contains("i2d"));
}

#[test]
fn test_small_integer_opcodes() {
    let code = generate(
        "routine main() is print(3); print(100); print(1000); print(100000); end;",
    );
    assert!(code.main.contains("iconst_3"));
    assert!(code.main.contains("bipush 100"));
    assert!(code.main.contains("sipush 1000"));
    assert!(code.main.contains("ldc 100000"));
}

#[test]
fn test_real_literal_uses_wide_constant() {
    let code = generate("routine main() is print(2.5); end;");
    assert!(code.main.contains("ldc2_w 2.5"));
    assert!(code.main.contains("invokevirtual java/io/PrintStream/println(D)V"));
}

#[test]
fn test_comparison_lowers_to_branches() {
    let code = generate("var x: integer; routine main() is print(x > 3); end;");
    assert!(code.main.contains("if_icmpgt"));
    assert!(code.main.contains("invokevirtual java/io/PrintStream/println(Z)V"));
}

#[test]
fn test_short_circuit_and_xor() {
    let code = generate(
        "var a: boolean; var b: boolean; \
         routine main() is print(a and b); print(a or b); print(a xor b); end;",
    );
    assert!(code.main.contains("ifeq"));
    assert!(code.main.contains("ifne"));
    assert!(code.main.contains("ixor"));
}

#[test]
fn test_string_concatenation() {
    let code = generate("routine main() is print(\"n = \" + 42 + \"!\"); end;");
    assert!(code.main.contains("new java/lang/StringBuilder"));
    assert!(code
        .main
        .contains("invokevirtual java/lang/StringBuilder/append(Ljava/lang/String;)Ljava/lang/StringBuilder;"));
    assert!(code
        .main
        .contains("invokevirtual java/lang/StringBuilder/append(I)Ljava/lang/StringBuilder;"));
    assert!(code
        .main
        .contains("invokevirtual java/lang/StringBuilder/toString()Ljava/lang/String;"));
    // The chain flattens into a single builder.
    assert_eq!(code.main.matches("new java/lang/StringBuilder").count(), 1);
}

#[test]
fn test_while_loop_shape() {
    let code = generate(
        "routine main() is var x: integer is 0; while x < 3 loop x := x + 1; end; end;",
    );
    assert!(code.main.contains("if_icmplt"));
    assert!(code.main.contains("goto"));
}

#[test]
fn test_for_loop_shape() {
    let code = generate("routine main() is for i in 1 .. 10 loop print(i); end; end;");
    assert!(code.main.contains("if_icmpgt"));
    assert!(code.main.contains("iinc"));
}

#[test]
fn test_reverse_for_loop() {
    let code = generate(
        "routine main() is for i in reverse 10 .. 1 loop print(i); end; end;",
    );
    assert!(code.main.contains("if_icmplt"));
    assert!(code.main.contains("iinc") && code.main.contains("-1"));
}

#[test]
fn test_record_unit_emitted() {
    let code = generate(
        "type Point is record var x: integer; var y: real; end; \
         var p: Point; \
         routine main() is p.x := 1; p.y := 2.0; print(p.x); end;",
    );
    assert_eq!(code.records.len(), 1);
    let unit = &code.records[0];
    assert_eq!(unit.name, "Point");
    assert!(unit.text.contains(".class public Point"));
    assert!(unit.text.contains(".field public x I"));
    assert!(unit.text.contains(".field public y D"));
    assert!(unit.text.contains(".method public <init>()V"));
    // The emitted unit carries exactly the declared fields.
    assert_eq!(unit.text.matches(".field public").count(), 2);

    // The main unit allocates the instance and accesses fields through it.
    assert!(code.main.contains(".field private static p LPoint;"));
    assert!(code.main.contains("new Point"));
    assert!(code.main.contains("invokespecial Point/<init>()V"));
    assert!(code.main.contains("putfield Point/x I"));
    assert!(code.main.contains("getfield Point/x I"));
}

#[test]
fn test_global_array_allocation_and_access() {
    let code = generate(
        "var a: array[5] integer; \
         routine main() is a[1] := 9; print(a[1]); end;",
    );
    assert!(code.main.contains(".field private static a [I"));
    assert!(code.main.contains("newarray int"));
    assert!(code.main.contains("putstatic Main/a [I"));
    // Element access adjusts the 1-based source index.
    assert!(code.main.contains("isub"));
    assert!(code.main.contains("iastore"));
    assert!(code.main.contains("iaload"));
}

#[test]
fn test_read_uses_scanner() {
    let code = generate("var x: integer; routine main() is read x; print(x); end;");
    assert!(code.main.contains(".field private static scanner Ljava/util/Scanner;"));
    assert!(code.main.contains("new java/util/Scanner"));
    assert!(code.main.contains("invokevirtual java/util/Scanner/nextInt()I"));
    assert!(code.main.contains("putstatic Main/x I"));
}

#[test]
fn test_no_scanner_init_without_read() {
    let code = generate("routine main() is print(1); end;");
    assert!(!code.main.contains("new java/util/Scanner"));
}

#[test]
fn test_casts_lower_to_conversions() {
    let code = generate(
        "routine main() is \
         var r: real is 1 as real; \
         var i: integer is 2.5 as integer; \
         print(r); print(i); end;",
    );
    assert!(code.main.contains("i2d"));
    assert!(code.main.contains("d2i"));
}

#[test]
fn test_real_arithmetic_promotes() {
    let code = generate("routine main() is print(1 + 2.5); end;");
    assert!(code.main.contains("i2d"));
    assert!(code.main.contains("dadd"));
}

#[test]
fn test_unary_lowering() {
    let code = generate(
        "var x: integer; var b: boolean; \
         routine main() is print(-x); print(not b); end;",
    );
    assert!(code.main.contains("ineg"));
    assert!(code.main.contains("ifeq"));
}

#[test]
fn test_call_statement_discards_result() {
    let code = generate(
        "routine f(): integer is return 1; end; \
         routine main() is f(); end;",
    );
    let entry = code
        .main
        .split(".method public static main([Ljava/lang/String;)V")
        .nth(1)
        .unwrap();
    assert!(entry.contains("invokestatic Main/f()I"));
    assert!(entry.contains("pop"));
}

#[test]
fn test_string_equality() {
    let code = generate(
        "var s: string; routine main() is print(s = \"done\"); end;",
    );
    assert!(code
        .main
        .contains("invokevirtual java/lang/String/equals(Ljava/lang/Object;)Z"));
}

#[test]
fn test_branch_elision_after_return() {
    let code = generate(
        "routine f(b: boolean): integer is \
         if b then return 1; else return 2; end; end; \
         routine main() is print(f(true)); end;",
    );
    // Both branches return, so no jump over the else branch is emitted
    // inside f.
    let f_method = code
        .main
        .split(".method public static f(Z)I")
        .nth(1)
        .unwrap()
        .split(".end method")
        .next()
        .unwrap();
    assert!(!f_method.contains("goto"));
}
