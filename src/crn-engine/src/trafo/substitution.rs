// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::{Expr, Symbol, SymbolTable};
use crate::common::Result;
use crate::function::FunctionDefinition;
use crate::trafo::Traversal;
use crate::trafo_err;

/// Substitution maps symbols to expressions.  The table is kept
/// normalized: no right-hand side mentions any left-hand side, so a
/// single rewrite of an expression reaches the fixpoint.  Each symbol
/// can be bound once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Substitution {
    table: SymbolTable,
}

impl Substitution {
    pub fn new() -> Self {
        Substitution::default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn contains(&self, sym: &Symbol) -> bool {
        self.table.contains_key(sym)
    }

    pub fn get(&self, sym: &Symbol) -> Option<&Expr> {
        self.table.get(sym)
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// add inserts `lhs -> rhs`.  The existing table is substituted
    /// into `rhs`, and the new pair into every existing right-hand
    /// side.  If that makes any right-hand side refer to its own
    /// left-hand side the table is left unchanged and
    /// `CircularSubstitution` is returned.  Rebinding a symbol already
    /// in the table fails with `DuplicateDefinition`.
    pub fn add(&mut self, lhs: &Symbol, mut rhs: Expr) -> Result<()> {
        if self.table.contains_key(lhs) {
            return trafo_err!(
                DuplicateDefinition,
                format!("{} is already substituted", lhs.name())
            );
        }
        let mut table = self.table.clone();

        while rhs.subs_in_place(&table) {
            if rhs.has_symbol(lhs) {
                break;
            }
        }
        if rhs.has_symbol(lhs) {
            return trafo_err!(
                CircularSubstitution,
                format!("{} refers to itself", lhs.name())
            );
        }

        let single: SymbolTable = [(lhs.clone(), rhs.clone())].into_iter().collect();
        for value in table.values_mut() {
            value.subs_in_place(&single);
        }
        if let Some((sym, _)) = table.iter().find(|(sym, value)| value.has_symbol(sym)) {
            return trafo_err!(
                CircularSubstitution,
                format!("{} and {} refer to each other", lhs.name(), sym.name())
            );
        }

        table.insert(lhs.clone(), rhs);
        self.table = table;
        Ok(())
    }

    /// apply_to rewrites a single expression.
    pub fn apply_to(&self, expr: &mut Expr) -> bool {
        expr.subs_in_place(&self.table)
    }
}

// Function bodies live in closed scopes and can't see the symbols
// being substituted.
impl Traversal for Substitution {
    fn visit_function_definition(&mut self, _func: &mut FunctionDefinition) -> Result<()> {
        Ok(())
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        expr.subs_in_place(&self.table);
        Ok(())
    }
}
