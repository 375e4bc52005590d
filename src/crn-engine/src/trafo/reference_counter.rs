// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;

use crate::ast::{Expr, Symbol};
use crate::definition::Definition;
use crate::model::Model;

/// ReferenceCounter counts how often each symbol is used across a
/// model: in expressions of every scope, as a species' compartment, as
/// a compartment's `outside`, and as a reactant or product.
#[derive(Debug, Default)]
pub struct ReferenceCounter {
    counts: HashMap<Symbol, usize>,
}

impl ReferenceCounter {
    pub fn for_model(model: &Model) -> Self {
        ReferenceCounter::for_model_except(model, None)
    }

    /// for_model_except ignores the expressions owned by the definition
    /// named `skip`, so a variable referring to itself doesn't keep
    /// itself alive.
    pub fn for_model_except(model: &Model, skip: Option<&str>) -> Self {
        let mut counter = ReferenceCounter::default();
        for def in model.definitions() {
            if Some(def.ident()) == skip {
                continue;
            }
            counter.count_definition(def);
        }
        for constraint in model.constraints() {
            counter.count_expr(&constraint.expr);
        }
        counter
    }

    fn bump(&mut self, sym: &Symbol) {
        *self.counts.entry(sym.clone()).or_insert(0) += 1;
    }

    fn count_expr(&mut self, expr: &Expr) {
        expr.for_each_symbol(&mut |sym| self.bump(sym));
    }

    fn count_definition(&mut self, def: &Definition) {
        match def {
            Definition::Species(species) => {
                self.bump(&species.compartment);
                species.var.for_each_expr(&mut |e| self.count_expr(e));
            }
            Definition::Compartment(compartment) => {
                if let Some(outside) = &compartment.outside {
                    self.bump(outside);
                }
                compartment.var.for_each_expr(&mut |e| self.count_expr(e));
            }
            Definition::Parameter(param) => param.var.for_each_expr(&mut |e| self.count_expr(e)),
            Definition::FunctionArgument(arg) => arg.var.for_each_expr(&mut |e| self.count_expr(e)),
            Definition::FunctionDefinition(func) => self.count_expr(&func.body),
            Definition::Reaction(reaction) => {
                for sym in reaction.reactants.keys().chain(reaction.products.keys()) {
                    self.bump(sym);
                }
                reaction.for_each_expr(&mut |e| self.count_expr(e));
            }
            Definition::UnitDefinition(_) => {}
        }
    }

    pub fn count(&self, sym: &Symbol) -> usize {
        self.counts.get(sym).copied().unwrap_or(0)
    }

    pub fn is_referenced(&self, sym: &Symbol) -> bool {
        self.count(sym) > 0
    }
}
