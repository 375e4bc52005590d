// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! A human-readable listing of a model, one definition per line.

use std::fmt::Write;

use indexmap::IndexMap;

use crate::ast::{Expr, Symbol};
use crate::definition::UnitDefinition;
use crate::function::FunctionDefinition;
use crate::model::{AlgebraicConstraint, Model};
use crate::node::{NodeHandler, NodeRef};
use crate::reaction::{KineticLaw, Reaction};
use crate::variable::{Compartment, Parameter, Rule, Species, VariableDefinition};

struct Dumper<'a> {
    model: &'a Model,
    out: String,
    indent: usize,
}

impl<'a> Dumper<'a> {
    fn new(model: &'a Model) -> Self {
        Dumper {
            model,
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn variable(&mut self, keyword: &str, var: &VariableDefinition, extra: &str) {
        let mut text = format!("{keyword} {}{extra}", var.ident());
        if let Some(value) = &var.initial_value {
            let _ = write!(text, " = {value}");
        }
        let _ = write!(text, " [{}]", self.model.unit_of(var));
        if var.constant {
            text.push_str(" const");
        }
        if let Some(name) = &var.name {
            let _ = write!(text, " \"{name}\"");
        }
        self.line(&text);
    }
}

fn side(entries: &IndexMap<Symbol, Expr>) -> String {
    if entries.is_empty() {
        return "0".to_owned();
    }
    let terms: Vec<String> = entries
        .iter()
        .map(|(species, stoichiometry)| match stoichiometry {
            Expr::Const(n) if *n == 1.0 => format!("{species}"),
            _ => format!("{stoichiometry}*{species}"),
        })
        .collect();
    terms.join(" + ")
}

impl NodeHandler for Dumper<'_> {
    fn handle_model(&mut self, model: &Model) {
        let name = model.name.as_deref().unwrap_or("<unnamed>");
        self.line(&format!("model {name}"));
        self.indent += 1;
        for def in model.definitions() {
            def.as_node().dispatch(self);
            if let Some(var) = def.as_variable() {
                match &var.rule {
                    Some(Rule::Assignment(expr)) => {
                        NodeRef::AssignmentRule(var, expr).dispatch(self)
                    }
                    Some(Rule::Rate(expr)) => {
                        NodeRef::RateRule(var, expr).dispatch(self)
                    }
                    None => {}
                }
            }
        }
        for constraint in model.constraints() {
            NodeRef::AlgebraicConstraint(constraint).dispatch(self);
        }
        self.indent -= 1;
    }

    fn handle_parameter(&mut self, param: &Parameter) {
        self.variable("parameter", &param.var, "");
    }

    fn handle_compartment(&mut self, compartment: &Compartment) {
        let mut extra = format!(" ({}d", compartment.spatial_dimension);
        if let Some(outside) = &compartment.outside {
            let _ = write!(extra, ", in {outside}");
        }
        extra.push(')');
        self.variable("compartment", &compartment.var, &extra);
    }

    fn handle_species(&mut self, species: &Species) {
        let mut extra = format!(" in {}", species.compartment);
        if species.boundary_condition {
            extra.push_str(" boundary");
        }
        if species.only_substance_units {
            extra.push_str(" amount");
        }
        self.variable("species", &species.var, &extra);
    }

    fn handle_function_definition(&mut self, func: &FunctionDefinition) {
        let args: Vec<&str> = func.args().map(|arg| arg.ident()).collect();
        self.line(&format!(
            "function {}({}) = {}",
            func.ident(),
            args.join(", "),
            func.body
        ));
    }

    fn handle_reaction(&mut self, reaction: &Reaction) {
        let arrow = if reaction.reversible { "<->" } else { "->" };
        self.line(&format!(
            "reaction {}: {} {arrow} {}",
            reaction.ident(),
            side(&reaction.reactants),
            side(&reaction.products)
        ));
        self.indent += 1;
        NodeRef::KineticLaw(reaction.kinetic_law()).dispatch(self);
        self.indent -= 1;
    }

    fn handle_kinetic_law(&mut self, law: &KineticLaw) {
        for param in law.local_parameters() {
            self.variable("local", &param.var, "");
        }
        self.line(&format!("rate {}", law.rate_law));
    }

    fn handle_unit_definition(&mut self, unit: &UnitDefinition) {
        self.line(&format!("unit {} = {}", unit.ident(), unit.unit));
    }

    fn handle_assignment_rule(&mut self, var: &VariableDefinition, expr: &Expr) {
        self.line(&format!("{} := {expr}", var.ident()));
    }

    fn handle_rate_rule(&mut self, var: &VariableDefinition, expr: &Expr) {
        self.line(&format!("d{}/dt = {expr}", var.ident()));
    }

    fn handle_algebraic_constraint(&mut self, constraint: &AlgebraicConstraint) {
        self.line(&format!("0 = {}", constraint.expr));
    }
}

/// dump renders `model` as an indented listing.
pub fn dump(model: &Model) -> String {
    let mut dumper = Dumper::new(model);
    model.as_node().dispatch(&mut dumper);
    dumper.out
}
