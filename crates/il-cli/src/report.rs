//! Visualization reporters: an HTML compilation report and a Graphviz DOT
//! rendering of the AST.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::Context as _;

use il_lang::ast::{Expr, ExprKind, Program, Stmt, StmtKind};
use il_lang::Compilation;

pub fn write_reports(
    output_dir: &Path,
    base_name: &str,
    source: &str,
    compilation: &Compilation,
) -> Result<(), anyhow::Error> {
    let html_path = output_dir.join(format!("{base_name}_report.html"));
    fs::write(&html_path, html_report(base_name, source, compilation))
        .with_context(|| format!("could not write {}", html_path.display()))?;

    let dot_path = output_dir.join(format!("{base_name}_ast.dot"));
    fs::write(&dot_path, ast_to_dot(&compilation.program))
        .with_context(|| format!("could not write {}", dot_path.display()))?;

    println!("Reports written:");
    println!("  - {}", html_path.display());
    println!("  - {}", dot_path.display());
    Ok(())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn html_report(base_name: &str, source: &str, compilation: &Compilation) -> String {
    let mut details = String::new();
    for detail in &compilation.details {
        let _ = write!(
            details,
            "<tr><td>{}</td><td>{}</td><td><code>{}</code></td>\
             <td><code>{}</code></td><td>{}</td></tr>\n",
            detail.kind,
            escape_html(&detail.description),
            escape_html(&detail.before),
            escape_html(&detail.after),
            detail
                .line
                .map(|line| line.to_string())
                .unwrap_or_default(),
        );
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Compilation report: {base_name}</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; margin: 2em; }}\n\
         pre {{ background: #f4f4f4; padding: 1em; overflow-x: auto; }}\n\
         table {{ border-collapse: collapse; }}\n\
         td, th {{ border: 1px solid #ccc; padding: 0.3em 0.6em; }}\n\
         </style>\n</head>\n<body>\n\
         <h1>Compilation report: {base_name}</h1>\n\
         <h2>Source</h2>\n<pre>{source}</pre>\n\
         <h2>Optimizations ({count})</h2>\n\
         <table>\n<tr><th>Pass</th><th>Description</th><th>Before</th>\
         <th>After</th><th>Line</th></tr>\n{details}</table>\n\
         <h2>AST</h2>\n<pre>{ast}</pre>\n\
         <h2>Generated assembly</h2>\n<pre>{assembly}</pre>\n\
         </body>\n</html>\n",
        base_name = escape_html(base_name),
        source = escape_html(source),
        count = compilation.optimizations,
        details = details,
        ast = escape_html(&compilation.program.to_string()),
        assembly = escape_html(&compilation.code.main),
    )
}

/// Renders the AST as a Graphviz digraph, one node per statement or
/// expression.
pub fn ast_to_dot(program: &Program) -> String {
    let mut dot = DotBuilder::default();
    let root = dot.node("Program");
    for stmt in &program.statements {
        let child = dot.stmt(stmt);
        dot.edge(root, child);
    }
    format!(
        "digraph AST {{\n    node [shape=box, fontname=\"monospace\"];\n{}}}\n",
        dot.out
    )
}

#[derive(Default)]
struct DotBuilder {
    out: String,
    next_id: usize,
}

impl DotBuilder {
    fn node(&mut self, label: &str) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        let label = label.replace('\\', "\\\\").replace('"', "\\\"");
        let _ = writeln!(self.out, "    n{id} [label=\"{label}\"];");
        id
    }

    fn edge(&mut self, from: usize, to: usize) {
        let _ = writeln!(self.out, "    n{from} -> n{to};");
    }

    fn body(&mut self, parent: usize, stmts: &[Stmt]) {
        for stmt in stmts {
            let child = self.stmt(stmt);
            self.edge(parent, child);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) -> usize {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                let id = self.node(&format!("var {name}: {ty}"));
                if let Some(init) = init {
                    let child = self.expr(init);
                    self.edge(id, child);
                }
                id
            }
            StmtKind::ArrayDecl { name, ty } => self.node(&format!("var {name}: {ty}")),
            StmtKind::TypeDecl { name, .. } => self.node(&format!("type {name}")),
            StmtKind::RoutineDecl { name, body, .. } => {
                let id = self.node(&format!("routine {name}"));
                self.body(id, body);
                id
            }
            StmtKind::Assignment {
                target,
                index,
                value,
            } => {
                let id = self.node(&format!("{target} :=",));
                if let Some(index) = index {
                    let child = self.expr(index);
                    self.edge(id, child);
                }
                let child = self.expr(value);
                self.edge(id, child);
                id
            }
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let id = self.node("if");
                let cond = self.expr(condition);
                self.edge(id, cond);
                let then_id = self.node("then");
                self.edge(id, then_id);
                self.body(then_id, then_body);
                if let Some(else_body) = else_body {
                    let else_id = self.node("else");
                    self.edge(id, else_id);
                    self.body(else_id, else_body);
                }
                id
            }
            StmtKind::While { condition, body } => {
                let id = self.node("while");
                let cond = self.expr(condition);
                self.edge(id, cond);
                self.body(id, body);
                id
            }
            StmtKind::For {
                variable,
                reverse,
                from,
                to,
                body,
            } => {
                let label = if *reverse {
                    format!("for {variable} in reverse")
                } else {
                    format!("for {variable}")
                };
                let id = self.node(&label);
                let from = self.expr(from);
                self.edge(id, from);
                let to = self.expr(to);
                self.edge(id, to);
                self.body(id, body);
                id
            }
            StmtKind::Print { value } => {
                let id = self.node("print");
                let child = self.expr(value);
                self.edge(id, child);
                id
            }
            StmtKind::Read { variable } => self.node(&format!("read {variable}")),
            StmtKind::Return { value } => {
                let id = self.node("return");
                if let Some(value) = value {
                    let child = self.expr(value);
                    self.edge(id, child);
                }
                id
            }
            StmtKind::RoutineCall { name, args } => {
                let id = self.node(&format!("call {name}"));
                for arg in args {
                    let child = self.expr(arg);
                    self.edge(id, child);
                }
                id
            }
        }
    }

    fn expr(&mut self, expr: &Expr) -> usize {
        match &expr.kind {
            ExprKind::Integer(value) => self.node(&value.to_string()),
            ExprKind::Real(value) => self.node(&format!("{value:?}")),
            ExprKind::Boolean(value) => self.node(&value.to_string()),
            ExprKind::Str(value) => self.node(&format!("\"{value}\"")),
            ExprKind::Var(name) => self.node(name),
            ExprKind::ArrayAccess { name, index } => {
                let id = self.node(&format!("{name}[]"));
                let child = self.expr(index);
                self.edge(id, child);
                id
            }
            ExprKind::RecordAccess { record, field } => self.node(&format!("{record}.{field}")),
            ExprKind::Unary { op, operand } => {
                let id = self.node(&op.to_string());
                let child = self.expr(operand);
                self.edge(id, child);
                id
            }
            ExprKind::Binary { left, op, right } => {
                let id = self.node(&op.to_string());
                let l = self.expr(left);
                self.edge(id, l);
                let r = self.expr(right);
                self.edge(id, r);
                id
            }
            ExprKind::Call { name, args } => {
                let id = self.node(&format!("{name}()"));
                for arg in args {
                    let child = self.expr(arg);
                    self.edge(id, child);
                }
                id
            }
            ExprKind::Cast { expr, target } => {
                let id = self.node(&format!("as {target}"));
                let child = self.expr(expr);
                self.edge(id, child);
                id
            }
        }
    }
}
