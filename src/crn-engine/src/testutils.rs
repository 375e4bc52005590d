// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::{Expr, Symbol};
use crate::model::Model;
use crate::reaction::Reaction;
use crate::variable::{Compartment, Parameter, Species};

pub(crate) fn x_compartment(ident: &str) -> Compartment {
    Compartment::new(ident)
        .unwrap()
        .with_value(Expr::num(1.0))
        .constant(true)
}

pub(crate) fn x_species(ident: &str, compartment: &Symbol, initial: f64) -> Species {
    Species::new(ident, compartment)
        .unwrap()
        .with_value(Expr::num(initial))
}

pub(crate) fn x_param(ident: &str, value: f64) -> Parameter {
    Parameter::new(ident)
        .unwrap()
        .with_value(Expr::num(value))
        .constant(true)
}

pub(crate) fn sym(model: &Model, ident: &str) -> Symbol {
    model.get_variable(ident).unwrap().symbol().clone()
}

pub(crate) fn var(model: &Model, ident: &str) -> Expr {
    Expr::Sym(sym(model, ident))
}

/// cell, A, B, k1 and r1: A -> B at k1*A
pub(crate) fn mass_action_model() -> Model {
    let mut model = Model::default();
    model.add_definition(x_compartment("cell"));
    let cell = sym(&model, "cell");
    model.add_definition(x_species("A", &cell, 10.0));
    model.add_definition(x_species("B", &cell, 0.0));
    model.add_definition(x_param("k1", 0.1));

    let rate = var(&model, "k1") * var(&model, "A");
    let r1 = Reaction::new("r1", rate)
        .unwrap()
        .with_reactant(&sym(&model, "A"), 1.0)
        .with_product(&sym(&model, "B"), 1.0);
    model.add_definition(r1);
    model
}

/// mass_action_model with r1 reversible at k1*A - k2*B
pub(crate) fn reversible_model() -> Model {
    let mut model = mass_action_model();
    model.add_definition(x_param("k2", 0.05));
    let rate = var(&model, "k1") * var(&model, "A") - var(&model, "k2") * var(&model, "B");
    let r1 = model.get_reaction_mut("r1").unwrap();
    r1.reversible = true;
    r1.kinetic_law_mut().rate_law = rate;
    model
}

/// A -> B (r1) and B -> A (r2), so A + B is conserved
pub(crate) fn cycle_model() -> Model {
    let mut model = mass_action_model();
    model.add_definition(x_param("k2", 0.05));
    let rate = var(&model, "k2") * var(&model, "B");
    let r2 = Reaction::new("r2", rate)
        .unwrap()
        .with_reactant(&sym(&model, "B"), 1.0)
        .with_product(&sym(&model, "A"), 1.0);
    model.add_definition(r2);
    model
}

/// cycle_model plus an unrelated C -> D (r3)
pub(crate) fn two_networks_model() -> Model {
    let mut model = cycle_model();
    let cell = sym(&model, "cell");
    model.add_definition(x_species("C", &cell, 5.0));
    model.add_definition(x_species("D", &cell, 0.0));
    model.add_definition(x_param("k3", 1.0));
    let rate = var(&model, "k3") * var(&model, "C");
    let r3 = Reaction::new("r3", rate)
        .unwrap()
        .with_reactant(&sym(&model, "C"), 1.0)
        .with_product(&sym(&model, "D"), 1.0);
    model.add_definition(r3);
    model
}
