// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::{Expr, Symbol};
use crate::common::Result;
use crate::function::FunctionDefinition;
use crate::model::Model;
use crate::trafo::{Substitution, Traversal, walk_model};
use crate::variable::Rule;

/// RuleInliner replaces every use of a variable that has an assignment
/// rule with the rule's expression.  The rules themselves are kept, so
/// the variables can still be observed.
#[derive(Debug, Default)]
pub struct RuleInliner {
    subst: Substitution,
}

impl RuleInliner {
    pub fn new() -> Self {
        RuleInliner::default()
    }

    /// substitution returns the table built by the last `apply`.
    pub fn substitution(&self) -> &Substitution {
        &self.subst
    }

    fn collect(model: &Model) -> Result<Substitution> {
        let mut subst = Substitution::new();
        for def in model.definitions() {
            if let Some(var) = def.as_variable() {
                if let Some(Rule::Assignment(expr)) = &var.rule {
                    subst.add(var.symbol(), expr.clone())?;
                }
            }
        }
        Ok(subst)
    }
}

impl Traversal for RuleInliner {
    fn visit_model(&mut self, model: &mut Model) -> Result<()> {
        self.subst = RuleInliner::collect(model)?;
        if self.subst.is_empty() {
            return Ok(());
        }
        walk_model(self, model)
    }

    fn visit_function_definition(&mut self, _func: &mut FunctionDefinition) -> Result<()> {
        Ok(())
    }

    fn visit_assignment_rule(&mut self, _var: &Symbol, _expr: &mut Expr) -> Result<()> {
        Ok(())
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        self.subst.apply_to(expr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::testutils::{mass_action_model, var, x_param};

    #[test]
    fn test_inlines_chained_rules() {
        let mut model = mass_action_model();
        model.add_definition(x_param("base", 2.0).constant(false));
        let base = var(&model, "base");
        let k_eff = x_param("k_eff", 0.0).with_rule(Rule::Assignment(base.clone() * Expr::num(3.0)));
        model.add_definition(k_eff);
        let k_eff = var(&model, "k_eff");
        let k_tot = x_param("k_tot", 0.0).with_rule(Rule::Assignment(k_eff.clone() + Expr::num(1.0)));
        model.add_definition(k_tot);
        let k_tot = var(&model, "k_tot");
        let a = var(&model, "A");
        model.get_reaction_mut("r1").unwrap().kinetic_law_mut().rate_law = k_tot.clone() * a.clone();

        let mut inliner = RuleInliner::new();
        inliner.apply(&mut model).unwrap();
        assert_eq!(2, inliner.substitution().len());
        assert_eq!(
            &((base.clone() * Expr::num(3.0) + Expr::num(1.0)) * a),
            model.get_reaction("r1").unwrap().rate_law()
        );
        // defining bodies are left as written
        let rule = model.get_variable("k_tot").unwrap().rule.clone();
        assert_eq!(Some(Rule::Assignment(k_eff + Expr::num(1.0))), rule);
    }

    #[test]
    fn test_circular_rules() {
        let mut model = mass_action_model();
        let p = x_param("p", 0.0);
        let q = x_param("q", 0.0);
        let (p_sym, q_sym) = (p.symbol().clone(), q.symbol().clone());
        model.add_definition(p.with_rule(Rule::Assignment(Expr::sym(&q_sym) + Expr::num(1.0))));
        model.add_definition(q.with_rule(Rule::Assignment(Expr::sym(&p_sym) * Expr::num(2.0))));
        let before = model.clone();

        let err = RuleInliner::new().apply(&mut model).unwrap_err();
        assert_eq!(ErrorCode::CircularSubstitution, err.code);
        assert_eq!(before, model);
    }
}
