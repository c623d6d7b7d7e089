//! The Jasmin code generator.
//!
//! Lowers the checked (and possibly optimized) AST to JVM assembly in Jasmin
//! textual form. One unit is produced per user-declared record type, plus the
//! `Main` unit holding static fields for the top-level variables, one method
//! per routine, and the `main` entry point.
//!
//! All emitter state (label counter, local slot allocator, variable maps) is
//! carried by the generator value; nothing is global.

use log::debug;
use rustc_hash::FxHashMap;

use crate::ast::{BinOp, Expr, ExprKind, Program, Stmt, StmtKind, UnOp};
use crate::errors::CodegenError;
use crate::symbol::SymbolTable;
use crate::types::Type;
use crate::utils::escape_str;

/// A generated Jasmin unit for one record type, to be written as `<name>.j`.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordUnit {
    pub name: String,
    pub text: String,
}

/// Everything the code generator produces for one program.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedCode {
    /// The `Main.j` translation unit.
    pub main: String,
    /// Record units, to be assembled before the main unit.
    pub records: Vec<RecordUnit>,
}

pub struct JasminGenerator {
    table: SymbolTable,
    out: String,
    label_counter: u32,
    /// Local variable slots of the method being emitted.
    locals: FxHashMap<String, u32>,
    local_types: FxHashMap<String, Type>,
    /// Top-level variables, emitted as static fields on `Main`.
    globals: FxHashMap<String, Type>,
    next_local: u32,
}

/// Lowers a program using the symbol table produced by semantic analysis.
pub fn generate(program: &Program, table: SymbolTable) -> Result<GeneratedCode, CodegenError> {
    JasminGenerator::new(table).generate(program)
}

impl JasminGenerator {
    pub fn new(table: SymbolTable) -> Self {
        JasminGenerator {
            table,
            out: String::new(),
            label_counter: 0,
            locals: FxHashMap::default(),
            local_types: FxHashMap::default(),
            globals: FxHashMap::default(),
            next_local: 0,
        }
    }

    fn emit(&mut self, instruction: &str) {
        self.out.push_str("    ");
        self.out.push_str(instruction);
        self.out.push('\n');
    }

    fn raw(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn place_label(&mut self, label: &str) {
        self.out.push_str(label);
        self.out.push_str(":\n");
    }

    fn next_label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    pub fn generate(mut self, program: &Program) -> Result<GeneratedCode, CodegenError> {
        debug!("starting code generation");

        let mut records = Vec::new();
        for stmt in &program.statements {
            if let StmtKind::TypeDecl { name, ty } = &stmt.kind {
                if let Type::Record(_) = ty {
                    debug!("generating record unit: {name}");
                    records.push(RecordUnit {
                        name: name.clone(),
                        text: self.record_unit(name, ty)?,
                    });
                }
            }
        }

        self.raw(".class public Main");
        self.raw(".super java/lang/Object");
        self.blank();

        self.raw(".field private static scanner Ljava/util/Scanner;");
        self.blank();

        // Static fields for the top-level variables and arrays.
        for stmt in &program.statements {
            match &stmt.kind {
                StmtKind::VarDecl { name, ty, .. } => {
                    let descriptor = self.descriptor(ty)?;
                    self.raw(&format!(".field private static {name} {descriptor}"));
                    self.blank();
                    self.globals.insert(name.clone(), ty.clone());
                }
                StmtKind::ArrayDecl { name, ty } => {
                    let descriptor = self.descriptor(ty)?;
                    self.raw(&format!(".field private static {name} {descriptor}"));
                    self.blank();
                    self.globals.insert(name.clone(), ty.clone());
                }
                _ => {}
            }
        }

        // Default constructor.
        self.raw(".method public <init>()V");
        self.emit("aload_0");
        self.emit("invokespecial java/lang/Object/<init>()V");
        self.emit("return");
        self.raw(".end method");
        self.blank();

        for stmt in &program.statements {
            if let StmtKind::RoutineDecl { .. } = &stmt.kind {
                self.routine(&stmt.kind)?;
            }
        }

        self.main_method(program)?;

        Ok(GeneratedCode {
            main: std::mem::take(&mut self.out),
            records,
        })
    }

    fn main_method(&mut self, program: &Program) -> Result<(), CodegenError> {
        self.raw(".method public static main([Ljava/lang/String;)V");
        self.emit(".limit stack 6");
        self.emit(".limit locals 20");
        self.blank();

        if has_read(&program.statements) {
            self.emit("new java/util/Scanner");
            self.emit("dup");
            self.emit("getstatic java/lang/System/in Ljava/io/InputStream;");
            self.emit("invokespecial java/util/Scanner/<init>(Ljava/io/InputStream;)V");
            self.emit("putstatic Main/scanner Ljava/util/Scanner;");
            self.blank();
        }

        // Slot 0 holds the args array.
        self.locals.clear();
        self.local_types.clear();
        self.next_local = 1;

        // Allocate record instances and arrays for the static fields.
        for stmt in &program.statements {
            match &stmt.kind {
                StmtKind::VarDecl { name, ty, .. } => {
                    if let Some(record_name) = self.record_type_name(ty) {
                        self.emit(&format!("new {record_name}"));
                        self.emit("dup");
                        self.emit(&format!("invokespecial {record_name}/<init>()V"));
                        self.emit(&format!("putstatic Main/{name} L{record_name};"));
                        self.blank();
                    }
                }
                StmtKind::ArrayDecl { name, ty } => {
                    let Type::Array { size, element } = ty else {
                        continue;
                    };
                    self.emit(&format!("; initialize array {name}"));
                    self.push_int(*size);
                    let tag = self.newarray_tag(element)?;
                    self.emit(&format!("newarray {tag}"));
                    let descriptor = self.descriptor(element)?;
                    self.emit(&format!("putstatic Main/{name} [{descriptor}"));
                    self.blank();
                }
                _ => {}
            }
        }

        // Evaluate top-level initializers into their static fields.
        for stmt in &program.statements {
            if let StmtKind::VarDecl {
                name,
                ty,
                init: Some(init),
            } = &stmt.kind
            {
                self.expression(init)?;
                let value_type = self.expr_type(init)?;
                self.implicit_cast(&value_type, ty);
                let descriptor = self.descriptor(ty)?;
                self.emit(&format!("putstatic Main/{name} {descriptor}"));
                self.blank();
            }
        }

        // The user's `main` routine: a void main is inlined, a typed main is
        // invoked with its result discarded.
        let main_routine = program.statements.iter().find_map(|stmt| match &stmt.kind {
            StmtKind::RoutineDecl {
                name,
                return_type,
                body,
                ..
            } if name == "main" => Some((return_type.clone(), body)),
            _ => None,
        });

        if let Some((return_type, body)) = main_routine {
            match return_type {
                Some(ty) if !matches!(ty, Type::Void) => {
                    let descriptor = self.descriptor(&ty)?;
                    self.emit(&format!("invokestatic Main/main(){descriptor}"));
                    if matches!(self.table.resolve(&ty), Type::Real) {
                        self.emit("pop2");
                    } else {
                        self.emit("pop");
                    }
                }
                _ => {
                    for stmt in body {
                        self.statement(stmt)?;
                    }
                }
            }
        }

        self.blank();
        self.emit("return");
        self.raw(".end method");
        Ok(())
    }

    fn routine(&mut self, kind: &StmtKind) -> Result<(), CodegenError> {
        let StmtKind::RoutineDecl {
            name,
            params,
            return_type,
            body,
        } = kind
        else {
            return Ok(());
        };
        debug!("generating routine: {name}");

        self.locals.clear();
        self.local_types.clear();
        self.next_local = 0;

        let mut signature = String::new();
        for param in params {
            signature.push_str(&self.descriptor(&param.ty)?);
        }
        let return_descriptor = match return_type {
            Some(ty) => self.descriptor(ty)?,
            None => "V".to_string(),
        };
        self.raw(&format!(
            ".method public static {name}({signature}){return_descriptor}"
        ));
        self.emit(".limit stack 20");
        let locals_limit = self.locals_limit(body);
        self.emit(&format!(".limit locals {locals_limit}"));
        self.blank();

        // Parameters occupy the first slots; reals take two.
        let mut index = 0;
        for param in params {
            self.locals.insert(param.name.clone(), index);
            self.local_types.insert(param.name.clone(), param.ty.clone());
            index += self.slot_size(&param.ty);
        }
        self.next_local = index;

        for stmt in body {
            self.statement(stmt)?;
        }

        if !ends_with_return(body) {
            match return_type {
                None | Some(Type::Void) => self.emit("return"),
                Some(ty) => match self.table.resolve(ty).clone() {
                    Type::Integer | Type::Boolean => {
                        self.emit("iconst_0");
                        self.emit("ireturn");
                    }
                    Type::Real => {
                        self.emit("dconst_0");
                        self.emit("dreturn");
                    }
                    Type::Str => {
                        self.emit("ldc \"\"");
                        self.emit("areturn");
                    }
                    _ => {
                        self.emit("aconst_null");
                        self.emit("areturn");
                    }
                },
            }
        }

        self.raw(".end method");
        self.blank();
        Ok(())
    }

    /// Conservative locals limit: the args/this slot plus the slots of the
    /// body's top-level declarations, with a floor of 5.
    fn locals_limit(&self, body: &[Stmt]) -> u32 {
        let mut count = 1;
        for stmt in body {
            if let StmtKind::VarDecl { ty, .. } = &stmt.kind {
                count += self.slot_size(ty);
            }
        }
        count.max(5)
    }

    fn slot_size(&self, ty: &Type) -> u32 {
        if matches!(self.table.resolve(ty), Type::Real) {
            2
        } else {
            1
        }
    }

    // ----- statements -----

    fn statement(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => self.var_decl(name, ty, init.as_deref()),
            StmtKind::ArrayDecl { name, ty } => self.local_array_decl(name, ty),
            StmtKind::Assignment {
                target,
                index,
                value,
            } => self.assignment(target, index.as_deref(), value),
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => self.if_statement(condition, then_body, else_body.as_deref()),
            StmtKind::While { condition, body } => self.while_statement(condition, body),
            StmtKind::For {
                variable,
                reverse,
                from,
                to,
                body,
            } => self.for_statement(variable, *reverse, from, to, body),
            StmtKind::Print { value } => self.print_statement(value),
            StmtKind::Read { variable } => self.read_statement(variable),
            StmtKind::Return { value } => self.return_statement(value.as_deref()),
            StmtKind::RoutineCall { name, args } => {
                self.call(name, args)?;
                let return_type = self
                    .table
                    .routine(name)
                    .and_then(|sig| sig.return_type.clone());
                if let Some(ty) = return_type {
                    if !matches!(ty, Type::Void) {
                        if matches!(self.table.resolve(&ty), Type::Real) {
                            self.emit("pop2");
                        } else {
                            self.emit("pop");
                        }
                    }
                }
                Ok(())
            }
            // Record units are emitted separately; nested routines are
            // rejected by the parser.
            StmtKind::TypeDecl { .. } | StmtKind::RoutineDecl { .. } => Ok(()),
        }
    }

    fn var_decl(&mut self, name: &str, ty: &Type, init: Option<&Expr>) -> Result<(), CodegenError> {
        let index = self.next_local;
        self.next_local += self.slot_size(ty);
        self.locals.insert(name.to_string(), index);
        self.local_types.insert(name.to_string(), ty.clone());

        // Default-initialize the slot kinds the verifier will read early.
        match self.table.resolve(ty) {
            Type::Integer => {
                self.emit("iconst_0");
                self.emit(&format!("istore {index}"));
            }
            Type::Str => {
                self.emit("ldc \"\"");
                self.emit(&format!("astore {index}"));
            }
            _ => {}
        }

        if let Some(init) = init {
            self.emit(&format!("; var {name}: {ty}"));
            self.expression(init)?;
            let value_type = self.expr_type(init)?;
            self.implicit_cast(&value_type, ty);
            self.store(ty, index)?;
            self.blank();
        }
        Ok(())
    }

    fn local_array_decl(&mut self, name: &str, ty: &Type) -> Result<(), CodegenError> {
        let Type::Array { size, element } = ty else {
            return Err(CodegenError::UnsupportedType(ty.to_string()));
        };
        self.push_int(*size);
        let tag = self.newarray_tag(element)?;
        self.emit(&format!("newarray {tag}"));
        let index = self.next_local;
        self.next_local += 1;
        self.locals.insert(name.to_string(), index);
        self.local_types.insert(name.to_string(), ty.clone());
        self.emit(&format!("astore {index}"));
        Ok(())
    }

    fn assignment(
        &mut self,
        target: &str,
        index: Option<&Expr>,
        value: &Expr,
    ) -> Result<(), CodegenError> {
        // Array element assignment.
        if let Some(index) = index {
            let array_type = self.variable_type(target)?;
            let Type::Array { element, .. } = self.table.resolve(&array_type).clone() else {
                return Err(CodegenError::UnsupportedType(array_type.to_string()));
            };
            self.load_array_reference(target, &element)?;
            self.expression(index)?;
            // Source indices are 1-based.
            self.emit("iconst_1");
            self.emit("isub");
            self.expression(value)?;
            let value_type = self.expr_type(value)?;
            self.implicit_cast(&value_type, &element);
            match self.table.resolve(&element) {
                Type::Integer | Type::Boolean => self.emit("iastore"),
                Type::Real => self.emit("dastore"),
                _ => self.emit("aastore"),
            }
            return Ok(());
        }

        // Record field assignment.
        if let Some((record, field)) = target.split_once('.') {
            let record_type = self.variable_type(record)?;
            let Some(type_name) = self.record_type_name(&record_type) else {
                return Err(CodegenError::NotARecordType(record.to_string()));
            };
            let field_type = self.field_type(&type_name, field)?;

            self.load_record_reference(record, &type_name)?;
            self.expression(value)?;
            let value_type = self.expr_type(value)?;
            self.implicit_cast(&value_type, &field_type);
            let descriptor = self.descriptor(&field_type)?;
            self.emit(&format!("putfield {type_name}/{field} {descriptor}"));
            return Ok(());
        }

        // Plain variable assignment.
        self.expression(value)?;
        let target_type = self.variable_type(target)?;
        let value_type = self.expr_type(value)?;
        self.implicit_cast(&value_type, &target_type);
        if let Some(&index) = self.locals.get(target) {
            self.store(&target_type, index)?;
        } else {
            let descriptor = self.descriptor(&target_type)?;
            self.emit(&format!("putstatic Main/{target} {descriptor}"));
        }
        Ok(())
    }

    fn if_statement(
        &mut self,
        condition: &Expr,
        then_body: &[Stmt],
        else_body: Option<&[Stmt]>,
    ) -> Result<(), CodegenError> {
        let else_label = self.next_label();
        let end_label = self.next_label();

        self.expression(condition)?;
        self.emit(&format!("ifeq {else_label}"));

        for stmt in then_body {
            self.statement(stmt)?;
        }
        // The jump over the else branch is elided when the branch returns.
        if !ends_with_return(then_body) {
            self.emit(&format!("goto {end_label}"));
        }

        self.place_label(&else_label);
        if let Some(else_body) = else_body {
            for stmt in else_body {
                self.statement(stmt)?;
            }
        }

        let else_returns = else_body.is_some_and(ends_with_return);
        if !ends_with_return(then_body) || (else_body.is_some() && !else_returns) {
            self.place_label(&end_label);
        }
        Ok(())
    }

    fn while_statement(&mut self, condition: &Expr, body: &[Stmt]) -> Result<(), CodegenError> {
        let start_label = self.next_label();
        let end_label = self.next_label();

        self.place_label(&start_label);
        self.expression(condition)?;
        self.emit(&format!("ifeq {end_label}"));
        for stmt in body {
            self.statement(stmt)?;
        }
        self.emit(&format!("goto {start_label}"));
        self.place_label(&end_label);
        Ok(())
    }

    fn for_statement(
        &mut self,
        variable: &str,
        reverse: bool,
        from: &Expr,
        to: &Expr,
        body: &[Stmt],
    ) -> Result<(), CodegenError> {
        let start_label = self.next_label();
        let end_label = self.next_label();

        let index = self.next_local;
        self.next_local += 1;
        self.locals.insert(variable.to_string(), index);
        self.local_types.insert(variable.to_string(), Type::Integer);

        self.expression(from)?;
        self.emit(&format!("istore {index}"));

        self.place_label(&start_label);
        self.emit(&format!("iload {index}"));
        self.expression(to)?;
        if reverse {
            self.emit(&format!("if_icmplt {end_label}"));
        } else {
            self.emit(&format!("if_icmpgt {end_label}"));
        }

        for stmt in body {
            self.statement(stmt)?;
        }

        if reverse {
            self.emit(&format!("iinc {index} -1"));
        } else {
            self.emit(&format!("iinc {index} 1"));
        }
        self.emit(&format!("goto {start_label}"));
        self.place_label(&end_label);
        Ok(())
    }

    fn print_statement(&mut self, value: &Expr) -> Result<(), CodegenError> {
        self.emit("getstatic java/lang/System/out Ljava/io/PrintStream;");
        self.expression(value)?;
        let value_type = self.expr_type(value)?;
        let signature = match self.table.resolve(&value_type) {
            Type::Integer => "(I)V",
            Type::Boolean => "(Z)V",
            Type::Real => "(D)V",
            Type::Str => "(Ljava/lang/String;)V",
            other => return Err(CodegenError::UnsupportedType(other.to_string())),
        };
        self.emit(&format!("invokevirtual java/io/PrintStream/println{signature}"));
        self.blank();
        Ok(())
    }

    fn read_statement(&mut self, variable: &str) -> Result<(), CodegenError> {
        let variable_type = self.variable_type(variable)?;
        let local_index = self.locals.get(variable).copied();

        self.emit("getstatic Main/scanner Ljava/util/Scanner;");
        match self.table.resolve(&variable_type).clone() {
            Type::Integer => {
                self.emit("invokevirtual java/util/Scanner/nextInt()I");
                match local_index {
                    Some(index) => self.emit(&format!("istore {index}")),
                    None => self.emit(&format!("putstatic Main/{variable} I")),
                }
            }
            Type::Real => {
                self.emit("invokevirtual java/util/Scanner/nextDouble()D");
                match local_index {
                    Some(index) => self.emit(&format!("dstore {index}")),
                    None => self.emit(&format!("putstatic Main/{variable} D")),
                }
            }
            Type::Str => {
                self.emit("invokevirtual java/util/Scanner/next()Ljava/lang/String;");
                match local_index {
                    Some(index) => self.emit(&format!("astore {index}")),
                    None => {
                        self.emit(&format!("putstatic Main/{variable} Ljava/lang/String;"))
                    }
                }
            }
            Type::Boolean => {
                self.emit("invokevirtual java/util/Scanner/nextBoolean()Z");
                match local_index {
                    Some(index) => self.emit(&format!("istore {index}")),
                    None => self.emit(&format!("putstatic Main/{variable} Z")),
                }
            }
            other => return Err(CodegenError::UnsupportedType(other.to_string())),
        }
        Ok(())
    }

    fn return_statement(&mut self, value: Option<&Expr>) -> Result<(), CodegenError> {
        match value {
            Some(value) => {
                self.expression(value)?;
                let value_type = self.expr_type(value)?;
                match self.table.resolve(&value_type) {
                    Type::Integer | Type::Boolean => self.emit("ireturn"),
                    Type::Real => self.emit("dreturn"),
                    _ => self.emit("areturn"),
                }
            }
            None => self.emit("return"),
        }
        Ok(())
    }

    // ----- expressions -----

    fn expression(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        match &expr.kind {
            ExprKind::Integer(value) => {
                self.push_int(*value);
                Ok(())
            }
            ExprKind::Real(value) => {
                self.emit(&format!("ldc2_w {value:?}"));
                Ok(())
            }
            ExprKind::Boolean(value) => {
                self.emit(if *value { "iconst_1" } else { "iconst_0" });
                Ok(())
            }
            ExprKind::Str(value) => {
                self.emit(&format!("ldc \"{}\"", escape_str(value)));
                Ok(())
            }
            ExprKind::Var(name) => self.load_variable(name),
            ExprKind::Cast { expr, target } => self.cast(expr, target),
            ExprKind::Call { name, args } => self.call(name, args),
            ExprKind::ArrayAccess { name, index } => self.array_access(name, index),
            ExprKind::RecordAccess { record, field } => self.record_access(record, field),
            ExprKind::Unary { op, operand } => self.unary(*op, operand),
            ExprKind::Binary { left, op, right } => self.binary(left, *op, right),
        }
    }

    fn push_int(&mut self, value: i32) {
        if value == -1 {
            self.emit("iconst_m1");
        } else if (0..=5).contains(&value) {
            self.emit(&format!("iconst_{value}"));
        } else if (-128..=127).contains(&value) {
            self.emit(&format!("bipush {value}"));
        } else if (-32768..=32767).contains(&value) {
            self.emit(&format!("sipush {value}"));
        } else {
            self.emit(&format!("ldc {value}"));
        }
    }

    fn load_variable(&mut self, name: &str) -> Result<(), CodegenError> {
        if let Some(&index) = self.locals.get(name) {
            let ty = self.local_types.get(name).cloned().unwrap();
            self.load(&ty, index)
        } else if let Some(ty) = self.globals.get(name).cloned() {
            let descriptor = self.descriptor(&ty)?;
            self.emit(&format!("getstatic Main/{name} {descriptor}"));
            Ok(())
        } else {
            Err(CodegenError::UndefinedVariable(name.to_string()))
        }
    }

    fn cast(&mut self, expr: &Expr, target: &Type) -> Result<(), CodegenError> {
        self.expression(expr)?;
        let source = self.expr_type(expr)?;
        let source = self.table.resolve(&source).clone();
        let target = self.table.resolve(target).clone();
        match (source, target) {
            (Type::Integer, Type::Real) | (Type::Boolean, Type::Real) => self.emit("i2d"),
            (Type::Real, Type::Integer) => self.emit("d2i"),
            (Type::Integer, Type::Boolean) => {
                // Normalize to 0/1.
                let label = self.next_label();
                self.emit(&format!("ifeq {label}_false"));
                self.emit("iconst_1");
                self.emit(&format!("goto {label}_end"));
                self.place_label(&format!("{label}_false"));
                self.emit("iconst_0");
                self.place_label(&format!("{label}_end"));
            }
            (Type::Real, Type::Boolean) => {
                self.emit("dconst_0");
                self.emit("dcmpl");
                let label = self.next_label();
                self.emit(&format!("ifeq {label}_false"));
                self.emit("iconst_1");
                self.emit(&format!("goto {label}_end"));
                self.place_label(&format!("{label}_false"));
                self.emit("iconst_0");
                self.place_label(&format!("{label}_end"));
            }
            // Identity casts and boolean-to-integer need no conversion.
            _ => {}
        }
        Ok(())
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> Result<(), CodegenError> {
        let Some(sig) = self.table.routine(name).cloned() else {
            return Err(CodegenError::Unsupported(format!(
                "call to unknown routine {name}"
            )));
        };
        for (param, arg) in sig.params.iter().zip(args) {
            self.expression(arg)?;
            let arg_type = self.expr_type(arg)?;
            self.implicit_cast(&arg_type, &param.ty);
        }
        let mut signature = String::new();
        for param in &sig.params {
            signature.push_str(&self.descriptor(&param.ty)?);
        }
        let return_descriptor = match &sig.return_type {
            Some(ty) => self.descriptor(ty)?,
            None => "V".to_string(),
        };
        self.emit(&format!(
            "invokestatic Main/{name}({signature}){return_descriptor}"
        ));
        Ok(())
    }

    fn array_access(&mut self, name: &str, index: &Expr) -> Result<(), CodegenError> {
        let array_type = self.variable_type(name)?;
        let Type::Array { element, .. } = self.table.resolve(&array_type).clone() else {
            return Err(CodegenError::UnsupportedType(array_type.to_string()));
        };
        self.load_array_reference(name, &element)?;
        self.expression(index)?;
        // Source indices are 1-based.
        self.emit("iconst_1");
        self.emit("isub");
        match self.table.resolve(&element) {
            Type::Integer | Type::Boolean => self.emit("iaload"),
            Type::Real => self.emit("daload"),
            _ => self.emit("aaload"),
        }
        Ok(())
    }

    fn record_access(&mut self, record: &str, field: &str) -> Result<(), CodegenError> {
        let record_type = self.variable_type(record)?;
        let Some(type_name) = self.record_type_name(&record_type) else {
            return Err(CodegenError::NotARecordType(record.to_string()));
        };
        self.load_record_reference(record, &type_name)?;
        let field_type = self.field_type(&type_name, field)?;
        let descriptor = self.descriptor(&field_type)?;
        self.emit(&format!("getfield {type_name}/{field} {descriptor}"));
        Ok(())
    }

    fn unary(&mut self, op: UnOp, operand: &Expr) -> Result<(), CodegenError> {
        self.expression(operand)?;
        match op {
            UnOp::Not => {
                let label = self.next_label();
                self.emit(&format!("ifeq {label}_true"));
                self.emit("iconst_0");
                self.emit(&format!("goto {label}_end"));
                self.place_label(&format!("{label}_true"));
                self.emit("iconst_1");
                self.place_label(&format!("{label}_end"));
            }
            UnOp::Neg => {
                let ty = self.expr_type(operand)?;
                match self.table.resolve(&ty) {
                    Type::Real => self.emit("dneg"),
                    _ => self.emit("ineg"),
                }
            }
        }
        Ok(())
    }

    fn binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> Result<(), CodegenError> {
        if op.is_logical() {
            return self.logical(left, op, right);
        }

        let left_type = self.expr_type(left)?;
        let right_type = self.expr_type(right)?;
        let left_resolved = self.table.resolve(&left_type).clone();
        let right_resolved = self.table.resolve(&right_type).clone();
        let strings = left_resolved.is_string() || right_resolved.is_string();
        let reals = matches!(left_resolved, Type::Real) || matches!(right_resolved, Type::Real);

        if op == BinOp::Add && strings {
            return self.concatenation(left, right);
        }

        if op.is_comparison() {
            if strings && matches!(op, BinOp::Eq | BinOp::Ne) {
                self.expression(left)?;
                self.expression(right)?;
                self.emit("invokevirtual java/lang/String/equals(Ljava/lang/Object;)Z");
                let label = self.next_label();
                let branch = if op == BinOp::Eq { "ifne" } else { "ifeq" };
                self.emit(&format!("{branch} {label}_true"));
                self.emit("iconst_0");
                self.emit(&format!("goto {label}_end"));
                self.place_label(&format!("{label}_true"));
                self.emit("iconst_1");
                self.place_label(&format!("{label}_end"));
                return Ok(());
            }

            if reals {
                self.expression(left)?;
                if matches!(left_resolved, Type::Integer) {
                    self.emit("i2d");
                }
                self.expression(right)?;
                if matches!(right_resolved, Type::Integer) {
                    self.emit("i2d");
                }
                self.emit("dcmpl");
                let branch = match op {
                    BinOp::Gt => "ifgt",
                    BinOp::Ge => "ifge",
                    BinOp::Lt => "iflt",
                    BinOp::Le => "ifle",
                    BinOp::Eq => "ifeq",
                    BinOp::Ne => "ifne",
                    _ => unreachable!(),
                };
                let label = self.next_label();
                self.emit(&format!("{branch} {label}_true"));
                self.emit("iconst_0");
                self.emit(&format!("goto {label}_end"));
                self.place_label(&format!("{label}_true"));
                self.emit("iconst_1");
                self.place_label(&format!("{label}_end"));
                return Ok(());
            }

            self.expression(left)?;
            self.expression(right)?;
            let branch = match op {
                BinOp::Gt => "if_icmpgt",
                BinOp::Ge => "if_icmpge",
                BinOp::Lt => "if_icmplt",
                BinOp::Le => "if_icmple",
                BinOp::Eq => "if_icmpeq",
                BinOp::Ne => "if_icmpne",
                _ => unreachable!(),
            };
            let label = self.next_label();
            self.emit(&format!("{branch} {label}_true"));
            self.emit("iconst_0");
            self.emit(&format!("goto {label}_end"));
            self.place_label(&format!("{label}_true"));
            self.emit("iconst_1");
            self.place_label(&format!("{label}_end"));
            return Ok(());
        }

        // Arithmetic; integer operands promote to double when mixed.
        if reals {
            self.expression(left)?;
            if matches!(left_resolved, Type::Integer) {
                self.emit("i2d");
            }
            self.expression(right)?;
            if matches!(right_resolved, Type::Integer) {
                self.emit("i2d");
            }
            match op {
                BinOp::Add => self.emit("dadd"),
                BinOp::Sub => self.emit("dsub"),
                BinOp::Mul => self.emit("dmul"),
                BinOp::Div => self.emit("ddiv"),
                BinOp::Mod => self.emit("drem"),
                _ => unreachable!(),
            }
        } else {
            self.expression(left)?;
            self.expression(right)?;
            match op {
                BinOp::Add => self.emit("iadd"),
                BinOp::Sub => self.emit("isub"),
                BinOp::Mul => self.emit("imul"),
                BinOp::Div => self.emit("idiv"),
                BinOp::Mod => self.emit("irem"),
                _ => unreachable!(),
            }
        }
        Ok(())
    }

    fn logical(&mut self, left: &Expr, op: BinOp, right: &Expr) -> Result<(), CodegenError> {
        match op {
            BinOp::And => {
                let end_label = self.next_label();
                let false_label = self.next_label();
                self.expression(left)?;
                self.emit(&format!("ifeq {false_label}"));
                self.expression(right)?;
                self.emit(&format!("ifeq {false_label}"));
                self.emit("iconst_1");
                self.emit(&format!("goto {end_label}"));
                self.place_label(&false_label);
                self.emit("iconst_0");
                self.place_label(&end_label);
            }
            BinOp::Or => {
                let end_label = self.next_label();
                let true_label = self.next_label();
                self.expression(left)?;
                self.emit(&format!("ifne {true_label}"));
                self.expression(right)?;
                self.emit(&format!("ifne {true_label}"));
                self.emit("iconst_0");
                self.emit(&format!("goto {end_label}"));
                self.place_label(&true_label);
                self.emit("iconst_1");
                self.place_label(&end_label);
            }
            BinOp::Xor => {
                self.expression(left)?;
                self.expression(right)?;
                self.emit("ixor");
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    /// String concatenation through a `StringBuilder`; nested `+` chains on
    /// the left flatten into a single builder.
    fn concatenation(&mut self, left: &Expr, right: &Expr) -> Result<(), CodegenError> {
        self.emit("new java/lang/StringBuilder");
        self.emit("dup");
        self.emit("invokespecial java/lang/StringBuilder/<init>()V");
        self.append_flattened(left)?;
        self.append_flattened(right)?;
        self.emit("invokevirtual java/lang/StringBuilder/toString()Ljava/lang/String;");
        Ok(())
    }

    fn append_flattened(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        if let ExprKind::Binary {
            left,
            op: BinOp::Add,
            right,
        } = &expr.kind
        {
            let ty = self.expr_type(expr)?;
            if self.table.resolve(&ty).is_string() {
                self.append_flattened(left)?;
                self.append_flattened(right)?;
                return Ok(());
            }
        }
        self.expression(expr)?;
        let ty = self.expr_type(expr)?;
        let descriptor = match self.table.resolve(&ty) {
            Type::Integer => "I",
            Type::Real => "D",
            Type::Boolean => "Z",
            Type::Str => "Ljava/lang/String;",
            other => return Err(CodegenError::UnsupportedType(other.to_string())),
        };
        self.emit(&format!(
            "invokevirtual java/lang/StringBuilder/append({descriptor})Ljava/lang/StringBuilder;"
        ));
        Ok(())
    }

    // ----- helpers -----

    fn load(&mut self, ty: &Type, index: u32) -> Result<(), CodegenError> {
        match self.table.resolve(ty) {
            Type::Integer | Type::Boolean => self.emit(&format!("iload {index}")),
            Type::Real => self.emit(&format!("dload {index}")),
            _ => self.emit(&format!("aload {index}")),
        }
        Ok(())
    }

    fn store(&mut self, ty: &Type, index: u32) -> Result<(), CodegenError> {
        match self.table.resolve(ty) {
            Type::Integer | Type::Boolean => self.emit(&format!("istore {index}")),
            Type::Real => self.emit(&format!("dstore {index}")),
            _ => self.emit(&format!("astore {index}")),
        }
        Ok(())
    }

    fn implicit_cast(&mut self, from: &Type, to: &Type) {
        let from = self.table.resolve(from).clone();
        let to = self.table.resolve(to).clone();
        match (from, to) {
            (Type::Integer, Type::Real) => self.emit("i2d"),
            (Type::Real, Type::Integer) => self.emit("d2i"),
            _ => {}
        }
    }

    fn load_array_reference(&mut self, name: &str, element: &Type) -> Result<(), CodegenError> {
        if let Some(&index) = self.locals.get(name) {
            self.emit(&format!("aload {index}"));
        } else {
            let descriptor = self.descriptor(element)?;
            self.emit(&format!("getstatic Main/{name} [{descriptor}"));
        }
        Ok(())
    }

    fn load_record_reference(&mut self, name: &str, type_name: &str) -> Result<(), CodegenError> {
        if let Some(&index) = self.locals.get(name) {
            self.emit(&format!("aload {index}"));
        } else if self.globals.contains_key(name) {
            self.emit(&format!("getstatic Main/{name} L{type_name};"));
        } else {
            return Err(CodegenError::UndefinedVariable(name.to_string()));
        }
        Ok(())
    }

    /// Declared type of a variable: the innermost local, or the static field.
    fn variable_type(&self, name: &str) -> Result<Type, CodegenError> {
        self.local_types
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
            .ok_or_else(|| CodegenError::UndefinedVariable(name.to_string()))
    }

    /// The record type name behind a variable's declared type, if any.
    fn record_type_name(&self, ty: &Type) -> Option<String> {
        if let Type::Named(name) = ty {
            if let Some(Type::Record(_)) = self.table.type_definition(name) {
                return Some(name.clone());
            }
        }
        None
    }

    fn field_type(&self, type_name: &str, field: &str) -> Result<Type, CodegenError> {
        let Some(Type::Record(fields)) = self.table.type_definition(type_name) else {
            return Err(CodegenError::NotARecordType(type_name.to_string()));
        };
        fields
            .get(field)
            .cloned()
            .ok_or_else(|| CodegenError::Unsupported(format!("unknown field {field}")))
    }

    fn newarray_tag(&self, element: &Type) -> Result<&'static str, CodegenError> {
        match self.table.resolve(element) {
            Type::Integer => Ok("int"),
            Type::Boolean => Ok("boolean"),
            Type::Real => Ok("double"),
            other => Err(CodegenError::UnsupportedType(other.to_string())),
        }
    }

    /// JVM field/method descriptor for a type.
    fn descriptor(&self, ty: &Type) -> Result<String, CodegenError> {
        match ty {
            Type::Integer => Ok("I".to_string()),
            Type::Boolean => Ok("Z".to_string()),
            Type::Real => Ok("D".to_string()),
            Type::Str => Ok("Ljava/lang/String;".to_string()),
            Type::Void => Ok("V".to_string()),
            Type::Array { element, .. } => Ok(format!("[{}", self.descriptor(element)?)),
            Type::Named(name) => match self.table.type_definition(name) {
                Some(Type::Record(_)) => Ok(format!("L{name};")),
                Some(definition) => self.descriptor(&definition.clone()),
                None => Err(CodegenError::UnsupportedType(name.clone())),
            },
            Type::Record(_) => Err(CodegenError::UnsupportedType(
                "anonymous record".to_string(),
            )),
        }
    }

    /// The expression's type as the emitter sees it. Analysis has validated
    /// the program, so failures here indicate an unsupported lowering.
    fn expr_type(&self, expr: &Expr) -> Result<Type, CodegenError> {
        match &expr.kind {
            ExprKind::Integer(_) => Ok(Type::Integer),
            ExprKind::Real(_) => Ok(Type::Real),
            ExprKind::Boolean(_) => Ok(Type::Boolean),
            ExprKind::Str(_) => Ok(Type::Str),
            ExprKind::Var(name) => self.variable_type(name),
            ExprKind::Cast { target, .. } => Ok(target.clone()),
            ExprKind::ArrayAccess { name, .. } => {
                let array_type = self.variable_type(name)?;
                match self.table.resolve(&array_type) {
                    Type::Array { element, .. } => Ok(element.as_ref().clone()),
                    other => Err(CodegenError::UnsupportedType(other.to_string())),
                }
            }
            ExprKind::RecordAccess { record, field } => {
                let record_type = self.variable_type(record)?;
                let Some(type_name) = self.record_type_name(&record_type) else {
                    return Err(CodegenError::NotARecordType(record.to_string()));
                };
                self.field_type(&type_name, field)
            }
            ExprKind::Call { name, .. } => {
                let sig = self
                    .table
                    .routine(name)
                    .ok_or_else(|| CodegenError::Unsupported(format!("unknown routine {name}")))?;
                Ok(sig.return_type.clone().unwrap_or(Type::Void))
            }
            ExprKind::Unary { op: UnOp::Not, .. } => Ok(Type::Boolean),
            ExprKind::Unary {
                op: UnOp::Neg,
                operand,
            } => self.expr_type(operand),
            ExprKind::Binary { left, op, right } => {
                if op.is_comparison() || op.is_logical() {
                    return Ok(Type::Boolean);
                }
                let left = self.expr_type(left)?;
                let right = self.expr_type(right)?;
                let left = self.table.resolve(&left).clone();
                let right = self.table.resolve(&right).clone();
                if *op == BinOp::Add && (left.is_string() || right.is_string()) {
                    Ok(Type::Str)
                } else if matches!((&left, &right), (Type::Integer, Type::Integer)) {
                    Ok(Type::Integer)
                } else {
                    Ok(Type::Real)
                }
            }
        }
    }

    fn record_unit(&self, name: &str, ty: &Type) -> Result<String, CodegenError> {
        let Type::Record(fields) = ty else {
            return Err(CodegenError::UnsupportedType(ty.to_string()));
        };
        let mut out = String::new();
        out.push_str(&format!(".class public {name}\n"));
        out.push_str(".super java/lang/Object\n\n");
        for (field, field_type) in fields {
            let descriptor = self.descriptor(field_type)?;
            out.push_str(&format!(".field public {field} {descriptor}\n"));
        }
        out.push_str("\n.method public <init>()V\n");
        out.push_str("    .limit stack 1\n");
        out.push_str("    .limit locals 1\n");
        out.push_str("    aload_0\n");
        out.push_str("    invokespecial java/lang/Object/<init>()V\n");
        out.push_str("    return\n");
        out.push_str(".end method\n");
        Ok(out)
    }
}

fn ends_with_return(statements: &[Stmt]) -> bool {
    matches!(
        statements.last(),
        Some(Stmt {
            kind: StmtKind::Return { .. },
            ..
        })
    )
}

fn has_read(statements: &[Stmt]) -> bool {
    statements.iter().any(|stmt| match &stmt.kind {
        StmtKind::Read { .. } => true,
        StmtKind::RoutineDecl { body, .. } => has_read(body),
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => {
            has_read(then_body) || else_body.as_ref().is_some_and(|body| has_read(body))
        }
        StmtKind::While { body, .. } | StmtKind::For { body, .. } => has_read(body),
        _ => false,
    })
}
