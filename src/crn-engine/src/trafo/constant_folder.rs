// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::{Expr, Symbol};
use crate::common::Result;
use crate::model::Model;
use crate::trafo::{Substitution, Traversal, walk_model};
use crate::variable::Parameter;

/// ConstantFolder replaces references to constant parameters with
/// their values and then folds constant subexpressions everywhere,
/// function bodies included.  The parameters themselves stay.
#[derive(Debug, Default)]
pub struct ConstantFolder {
    folded: usize,
}

impl ConstantFolder {
    pub fn new() -> Self {
        ConstantFolder::default()
    }

    /// folded returns how many parameters were inlined by the last
    /// `apply`.
    pub fn folded(&self) -> usize {
        self.folded
    }

    fn is_candidate(param: &Parameter) -> bool {
        param.var.constant && param.var.rule.is_none() && param.var.initial_value.is_some()
    }

    /// Parameters whose values only mention other constant parameters
    /// are resolved too, so passes repeat until nothing new folds.
    fn substitution(model: &Model) -> Result<Substitution> {
        let locals = model
            .all_reactions()
            .flat_map(|reaction| reaction.kinetic_law().local_parameters());
        let mut pending: Vec<(Symbol, Expr)> = model
            .all_parameters()
            .chain(locals)
            .filter(|param| ConstantFolder::is_candidate(param))
            .filter_map(|param| {
                let value = param.var.initial_value.clone()?;
                Some((param.symbol().clone(), value))
            })
            .collect();

        let mut subst = Substitution::new();
        loop {
            let mut resolved = Vec::new();
            for (i, (sym, value)) in pending.iter().enumerate() {
                let mut value = value.clone();
                subst.apply_to(&mut value);
                if let Some(n) = value.eval_const() {
                    subst.add(sym, Expr::num(n))?;
                    resolved.push(i);
                }
            }
            if resolved.is_empty() {
                break;
            }
            for i in resolved.into_iter().rev() {
                pending.remove(i);
            }
        }
        Ok(subst)
    }
}

impl Traversal for ConstantFolder {
    fn visit_model(&mut self, model: &mut Model) -> Result<()> {
        let mut subst = ConstantFolder::substitution(model)?;
        self.folded = subst.len();
        subst.apply(model)?;
        walk_model(self, model)
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        *expr = std::mem::take(expr).fold();
        Ok(())
    }
}
