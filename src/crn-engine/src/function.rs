// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::{Expr, Symbol, SymbolTable};
use crate::common::{Ident, Result, check_ident};
use crate::definition::Definition;
use crate::model_err;
use crate::node::{Named, Node, NodeKind};
use crate::scope::Scope;
use crate::variable::FunctionArgument;

/// A user-defined function.  Its arguments live in a closed scope, so
/// the body can't refer to anything but them.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDefinition {
    ident: Ident,
    pub name: Option<String>,
    scope: Scope,
    pub body: Expr,
}

impl FunctionDefinition {
    pub fn new(ident: &str, args: &[&str]) -> Result<Self> {
        check_ident(ident)?;
        let mut scope = Scope::new(None, true);
        for arg in args.iter() {
            let arg = FunctionArgument::new(arg)?;
            if scope.has_definition(arg.ident()) {
                return model_err!(DuplicateDefinition, format!("{ident}: argument '{}'", arg.ident()));
            }
            scope.add_definition(Definition::FunctionArgument(arg));
        }
        Ok(FunctionDefinition {
            ident: ident.to_owned(),
            name: None,
            scope,
            body: Expr::Const(0.0),
        })
    }

    pub fn with_body(mut self, body: Expr) -> Self {
        self.body = body;
        self
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn args(&self) -> impl Iterator<Item = &FunctionArgument> {
        self.scope.definitions().filter_map(Definition::as_function_argument)
    }

    pub fn arg(&self, ident: &str) -> Option<&Symbol> {
        self.scope
            .get_definition(ident)
            .and_then(Definition::as_function_argument)
            .map(FunctionArgument::symbol)
    }

    pub fn arity(&self) -> usize {
        self.args().count()
    }

    /// instantiate returns the body with `args` substituted for the
    /// formal arguments.
    pub fn instantiate(&self, args: &[Expr]) -> Result<Expr> {
        if args.len() != self.arity() {
            return model_err!(
                Generic,
                format!(
                    "{} expects {} arguments, got {}",
                    self.ident,
                    self.arity(),
                    args.len()
                )
            );
        }
        let table: SymbolTable = self
            .args()
            .map(|arg| arg.symbol().clone())
            .zip(args.iter().cloned())
            .collect();
        Ok(self.body.subs(&table))
    }
}

impl Node for FunctionDefinition {
    fn node_kind(&self) -> NodeKind {
        NodeKind::FunctionDefinition
    }
}

impl Named for FunctionDefinition {
    fn ident(&self) -> &str {
        &self.ident
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[test]
fn test_function_instantiate() {
    let f = FunctionDefinition::new("mass_action", &["k", "x"]).unwrap();
    let k = f.arg("k").unwrap().clone();
    let x = f.arg("x").unwrap().clone();
    let f = f.with_body(Expr::sym(&k) * Expr::sym(&x));
    assert!(f.scope().is_closed());
    assert_eq!(2, f.arity());

    let a = Symbol::new("A");
    let result = f.instantiate(&[Expr::num(0.1), Expr::sym(&a)]).unwrap();
    assert_eq!(Expr::num(0.1) * Expr::sym(&a), result);

    assert!(f.instantiate(&[Expr::num(0.1)]).is_err());
    assert!(FunctionDefinition::new("f", &["x", "x"]).is_err());
}
