//! The symbol table.
//!
//! Three namespaces: variables live in a stack of lexical scopes (duplicates
//! rejected per scope, shadowing across scopes allowed), while routines and
//! types are flat and program-wide. The built-in type names are preloaded
//! into the type namespace.

use rustc_hash::FxHashMap;

use crate::ast::Parameter;
use crate::types::Type;

/// Signature of a declared routine, as needed by call checking and by the
/// code generator for method descriptors.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutineSig {
    pub params: Vec<Parameter>,
    pub return_type: Option<Type>,
}

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<FxHashMap<String, Type>>,
    routines: FxHashMap<String, RoutineSig>,
    types: FxHashMap<String, Type>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut types = FxHashMap::default();
        types.insert("integer".to_string(), Type::Integer);
        types.insert("real".to_string(), Type::Real);
        types.insert("boolean".to_string(), Type::Boolean);
        types.insert("string".to_string(), Type::Str);
        types.insert("void".to_string(), Type::Void);
        SymbolTable {
            scopes: Vec::new(),
            routines: FxHashMap::default(),
            types,
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declares a variable in the innermost scope. Returns `false` if the
    /// name is already taken in that scope.
    pub fn declare_variable(&mut self, name: &str, ty: Type) -> bool {
        match self.scopes.last_mut() {
            Some(scope) => {
                if scope.contains_key(name) {
                    false
                } else {
                    scope.insert(name.to_string(), ty);
                    true
                }
            }
            None => false,
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains_key(name))
    }

    pub fn is_defined_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.contains_key(name))
    }

    /// Looks a variable up through the scope stack, most-local first.
    pub fn variable_type(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Declares a routine. Returns `false` on a duplicate name.
    pub fn declare_routine(&mut self, name: &str, sig: RoutineSig) -> bool {
        if self.routines.contains_key(name) {
            false
        } else {
            self.routines.insert(name.to_string(), sig);
            true
        }
    }

    pub fn routine(&self, name: &str) -> Option<&RoutineSig> {
        self.routines.get(name)
    }

    pub fn is_type_defined(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Defines a user type. Returns `false` if the name collides with a
    /// built-in or an earlier declaration.
    pub fn define_type(&mut self, name: &str, ty: Type) -> bool {
        if self.types.contains_key(name) {
            false
        } else {
            self.types.insert(name.to_string(), ty);
            true
        }
    }

    pub fn type_definition(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    /// Resolves a type through the type namespace until it is no longer a
    /// bare name. Unknown names are returned as-is for the caller to report.
    pub fn resolve<'a>(&'a self, ty: &'a Type) -> &'a Type {
        let mut current = ty;
        // The iteration bound guards against alias cycles built from forward
        // references, which the analyzer reports separately.
        for _ in 0..=self.types.len() {
            match current {
                Type::Named(name) => match self.types.get(name) {
                    Some(definition) => current = definition,
                    None => break,
                },
                _ => break,
            }
        }
        current
    }
}
