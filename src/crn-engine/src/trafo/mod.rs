// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Model transformations.
//!
//! A `Traversal` walks a model depth-first and may rewrite expressions
//! in place; it never adds or removes definitions.  Structural edits go
//! through a `Pass` (see `pass`), which collects replacements during
//! the walk and rebuilds the affected scope afterwards.
//!
//! Each `visit_*` hook defaults to the matching `walk_*` function,
//! which visits the node's children.  Overriding a hook without calling
//! `walk_*` prunes that subtree.

pub mod conservation;
pub mod constant_folder;
pub mod copyist;
pub mod decompose;
pub mod feature_filter;
pub mod function_inliner;
pub mod local_params;
pub mod pass;
pub mod reference_counter;
pub mod rescale;
pub mod reversible;
pub mod rule_inliner;
pub mod substitution;

use crate::ast::{Expr, Symbol};
use crate::common::Result;
use crate::definition::{Definition, UnitDefinition};
use crate::function::FunctionDefinition;
use crate::model::{AlgebraicConstraint, Model};
use crate::reaction::{KineticLaw, Reaction};
use crate::scope::Scope;
use crate::variable::{Compartment, FunctionArgument, Parameter, Rule, Species, VariableDefinition};

pub use pass::{Pass, Replacement};
pub use substitution::Substitution;

pub trait Traversal {
    /// apply runs the traversal over the whole model.
    fn apply(&mut self, model: &mut Model) -> Result<()>
    where
        Self: Sized,
    {
        self.visit_model(model)
    }

    fn visit_model(&mut self, model: &mut Model) -> Result<()> {
        walk_model(self, model)
    }

    fn visit_definition(&mut self, def: &mut Definition) -> Result<()> {
        walk_definition(self, def)
    }

    fn visit_parameter(&mut self, param: &mut Parameter) -> Result<()> {
        walk_variable(self, &mut param.var)
    }

    fn visit_compartment(&mut self, compartment: &mut Compartment) -> Result<()> {
        walk_variable(self, &mut compartment.var)
    }

    fn visit_species(&mut self, species: &mut Species) -> Result<()> {
        walk_variable(self, &mut species.var)
    }

    fn visit_function_argument(&mut self, arg: &mut FunctionArgument) -> Result<()> {
        walk_variable(self, &mut arg.var)
    }

    fn visit_function_definition(&mut self, func: &mut FunctionDefinition) -> Result<()> {
        walk_function_definition(self, func)
    }

    fn visit_reaction(&mut self, reaction: &mut Reaction) -> Result<()> {
        walk_reaction(self, reaction)
    }

    fn visit_kinetic_law(&mut self, law: &mut KineticLaw) -> Result<()> {
        walk_kinetic_law(self, law)
    }

    fn visit_unit_definition(&mut self, _unit: &mut UnitDefinition) -> Result<()> {
        Ok(())
    }

    fn visit_initial_value(&mut self, _var: &Symbol, expr: &mut Expr) -> Result<()> {
        self.visit_expr(expr)
    }

    fn visit_assignment_rule(&mut self, _var: &Symbol, expr: &mut Expr) -> Result<()> {
        self.visit_expr(expr)
    }

    fn visit_rate_rule(&mut self, _var: &Symbol, expr: &mut Expr) -> Result<()> {
        self.visit_expr(expr)
    }

    fn visit_stoichiometry(&mut self, _species: &Symbol, expr: &mut Expr) -> Result<()> {
        self.visit_expr(expr)
    }

    fn visit_rate_law(&mut self, expr: &mut Expr) -> Result<()> {
        self.visit_expr(expr)
    }

    fn visit_function_body(&mut self, expr: &mut Expr) -> Result<()> {
        self.visit_expr(expr)
    }

    fn visit_algebraic_constraint(&mut self, constraint: &mut AlgebraicConstraint) -> Result<()> {
        self.visit_expr(&mut constraint.expr)
    }

    /// visit_expr is where most traversals do their work.
    fn visit_expr(&mut self, _expr: &mut Expr) -> Result<()> {
        Ok(())
    }
}

pub fn walk_model<T: Traversal + ?Sized>(t: &mut T, model: &mut Model) -> Result<()> {
    walk_scope(t, model.scope_mut())?;
    for constraint in model.constraints_mut().iter_mut() {
        t.visit_algebraic_constraint(constraint)?;
    }
    Ok(())
}

pub fn walk_scope<T: Traversal + ?Sized>(t: &mut T, scope: &mut Scope) -> Result<()> {
    for def in scope.definitions_mut() {
        t.visit_definition(def)?;
    }
    Ok(())
}

pub fn walk_definition<T: Traversal + ?Sized>(t: &mut T, def: &mut Definition) -> Result<()> {
    match def {
        Definition::Parameter(param) => t.visit_parameter(param),
        Definition::Compartment(compartment) => t.visit_compartment(compartment),
        Definition::Species(species) => t.visit_species(species),
        Definition::FunctionArgument(arg) => t.visit_function_argument(arg),
        Definition::FunctionDefinition(func) => t.visit_function_definition(func),
        Definition::Reaction(reaction) => t.visit_reaction(reaction),
        Definition::UnitDefinition(unit) => t.visit_unit_definition(unit),
    }
}

pub fn walk_variable<T: Traversal + ?Sized>(t: &mut T, var: &mut VariableDefinition) -> Result<()> {
    let sym = var.symbol().clone();
    if let Some(value) = &mut var.initial_value {
        t.visit_initial_value(&sym, value)?;
    }
    match &mut var.rule {
        Some(Rule::Assignment(expr)) => t.visit_assignment_rule(&sym, expr),
        Some(Rule::Rate(expr)) => t.visit_rate_rule(&sym, expr),
        None => Ok(()),
    }
}

pub fn walk_function_definition<T: Traversal + ?Sized>(
    t: &mut T,
    func: &mut FunctionDefinition,
) -> Result<()> {
    walk_scope(t, func.scope_mut())?;
    t.visit_function_body(&mut func.body)
}

pub fn walk_reaction<T: Traversal + ?Sized>(t: &mut T, reaction: &mut Reaction) -> Result<()> {
    for (species, expr) in reaction.reactants.iter_mut() {
        t.visit_stoichiometry(species, expr)?;
    }
    for (species, expr) in reaction.products.iter_mut() {
        t.visit_stoichiometry(species, expr)?;
    }
    t.visit_kinetic_law(reaction.kinetic_law_mut())
}

pub fn walk_kinetic_law<T: Traversal + ?Sized>(t: &mut T, law: &mut KineticLaw) -> Result<()> {
    walk_scope(t, law.scope_mut())?;
    t.visit_rate_law(&mut law.rate_law)
}

/// ExprVisitor adapts a closure into a traversal over every expression
/// in the model except function bodies.
pub struct ExprVisitor<F: FnMut(&mut Expr) -> Result<()>> {
    f: F,
}

impl<F: FnMut(&mut Expr) -> Result<()>> ExprVisitor<F> {
    pub fn new(f: F) -> Self {
        ExprVisitor { f }
    }
}

impl<F: FnMut(&mut Expr) -> Result<()>> Traversal for ExprVisitor<F> {
    fn visit_function_definition(&mut self, _func: &mut FunctionDefinition) -> Result<()> {
        Ok(())
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        (self.f)(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{mass_action_model, var, x_param};

    #[derive(Default)]
    struct Counter {
        exprs: usize,
        rate_laws: usize,
        stoichiometries: usize,
        constraints: usize,
    }

    impl Traversal for Counter {
        fn visit_rate_law(&mut self, expr: &mut Expr) -> Result<()> {
            self.rate_laws += 1;
            self.visit_expr(expr)
        }

        fn visit_stoichiometry(&mut self, _species: &Symbol, expr: &mut Expr) -> Result<()> {
            self.stoichiometries += 1;
            self.visit_expr(expr)
        }

        fn visit_algebraic_constraint(&mut self, c: &mut AlgebraicConstraint) -> Result<()> {
            self.constraints += 1;
            self.visit_expr(&mut c.expr)
        }

        fn visit_expr(&mut self, _expr: &mut Expr) -> Result<()> {
            self.exprs += 1;
            Ok(())
        }
    }

    #[test]
    fn test_default_walk_reaches_everything() {
        let mut model = mass_action_model();
        let a = var(&model, "A");
        model.add_constraint(a - Expr::num(1.0));
        model
            .get_reaction_mut("r1")
            .unwrap()
            .kinetic_law_mut()
            .add_local_parameter(x_param("kl", 1.0));

        let mut counter = Counter::default();
        counter.apply(&mut model).unwrap();
        assert_eq!(1, counter.rate_laws);
        assert_eq!(2, counter.stoichiometries);
        assert_eq!(1, counter.constraints);
        // cell, A, B, k1, kl initial values + 2 stoichiometries + rate law + constraint
        assert_eq!(9, counter.exprs);
    }

    struct SkipLocals(usize);

    impl Traversal for SkipLocals {
        fn visit_kinetic_law(&mut self, law: &mut KineticLaw) -> Result<()> {
            // prune the local scope, keep the rate law
            self.visit_rate_law(&mut law.rate_law)
        }

        fn visit_expr(&mut self, _expr: &mut Expr) -> Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    #[test]
    fn test_overriding_prunes() {
        let mut model = mass_action_model();
        model
            .get_reaction_mut("r1")
            .unwrap()
            .kinetic_law_mut()
            .add_local_parameter(x_param("kl", 1.0));
        let mut skip = SkipLocals(0);
        skip.apply(&mut model).unwrap();
        assert_eq!(7, skip.0);
    }

    #[test]
    fn test_expr_visitor_rewrites_leaves() {
        let mut model = mass_action_model();
        let mut visitor = ExprVisitor::new(|expr: &mut Expr| {
            *expr = std::mem::take(expr) * Expr::num(1.0);
            Ok(())
        });
        visitor.apply(&mut model).unwrap();
        let k1 = model.get_variable("k1").unwrap();
        assert_eq!(
            Some(Expr::num(0.1) * Expr::num(1.0)),
            k1.initial_value
        );
    }
}
