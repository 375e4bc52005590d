// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Node kinds and handler dispatch.
//!
//! The set of node kinds is closed, so handlers are written against an
//! exhaustive `match` in `NodeRef::dispatch`.  Every `NodeHandler`
//! method has a default that forwards to the next less specific method
//! (kind -> variable -> definition -> node), and `handle_node` does
//! nothing, so a handler only overrides what it cares about.

use std::fmt;

use crate::ast::Expr;
use crate::definition::UnitDefinition;
use crate::function::FunctionDefinition;
use crate::model::{AlgebraicConstraint, Model};
use crate::reaction::{KineticLaw, Reaction};
use crate::variable::{Compartment, FunctionArgument, Parameter, Species, VariableDefinition};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Model,
    Parameter,
    Compartment,
    Species,
    FunctionArgument,
    FunctionDefinition,
    Reaction,
    KineticLaw,
    UnitDefinition,
    AssignmentRule,
    RateRule,
    AlgebraicConstraint,
}

impl NodeKind {
    pub fn is_variable(self) -> bool {
        matches!(
            self,
            NodeKind::Parameter
                | NodeKind::Compartment
                | NodeKind::Species
                | NodeKind::FunctionArgument
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Model => "model",
            NodeKind::Parameter => "parameter",
            NodeKind::Compartment => "compartment",
            NodeKind::Species => "species",
            NodeKind::FunctionArgument => "function_argument",
            NodeKind::FunctionDefinition => "function_definition",
            NodeKind::Reaction => "reaction",
            NodeKind::KineticLaw => "kinetic_law",
            NodeKind::UnitDefinition => "unit_definition",
            NodeKind::AssignmentRule => "assignment_rule",
            NodeKind::RateRule => "rate_rule",
            NodeKind::AlgebraicConstraint => "algebraic_constraint",
        };
        write!(f, "{name}")
    }
}

pub trait Node {
    fn node_kind(&self) -> NodeKind;
}

/// Named is implemented by every definition: nodes with a
/// scope-unique identifier and an optional display name.
pub trait Named: Node {
    fn ident(&self) -> &str;
    fn name(&self) -> Option<&str>;
}

/// A borrowed reference to any node in a model.
#[derive(Clone, Copy, Debug)]
pub enum NodeRef<'a> {
    Model(&'a Model),
    Parameter(&'a Parameter),
    Compartment(&'a Compartment),
    Species(&'a Species),
    FunctionArgument(&'a FunctionArgument),
    FunctionDefinition(&'a FunctionDefinition),
    Reaction(&'a Reaction),
    KineticLaw(&'a KineticLaw),
    UnitDefinition(&'a UnitDefinition),
    AssignmentRule(&'a VariableDefinition, &'a Expr),
    RateRule(&'a VariableDefinition, &'a Expr),
    AlgebraicConstraint(&'a AlgebraicConstraint),
}

impl NodeRef<'_> {
    pub fn node_kind(&self) -> NodeKind {
        match self {
            NodeRef::Model(_) => NodeKind::Model,
            NodeRef::Parameter(_) => NodeKind::Parameter,
            NodeRef::Compartment(_) => NodeKind::Compartment,
            NodeRef::Species(_) => NodeKind::Species,
            NodeRef::FunctionArgument(_) => NodeKind::FunctionArgument,
            NodeRef::FunctionDefinition(_) => NodeKind::FunctionDefinition,
            NodeRef::Reaction(_) => NodeKind::Reaction,
            NodeRef::KineticLaw(_) => NodeKind::KineticLaw,
            NodeRef::UnitDefinition(_) => NodeKind::UnitDefinition,
            NodeRef::AssignmentRule(_, _) => NodeKind::AssignmentRule,
            NodeRef::RateRule(_, _) => NodeKind::RateRule,
            NodeRef::AlgebraicConstraint(_) => NodeKind::AlgebraicConstraint,
        }
    }

    /// dispatch offers this node to the handler method for its exact
    /// kind.
    pub fn dispatch<H: NodeHandler + ?Sized>(&self, handler: &mut H) {
        match *self {
            NodeRef::Model(model) => handler.handle_model(model),
            NodeRef::Parameter(param) => handler.handle_parameter(param),
            NodeRef::Compartment(compartment) => handler.handle_compartment(compartment),
            NodeRef::Species(species) => handler.handle_species(species),
            NodeRef::FunctionArgument(arg) => handler.handle_function_argument(arg),
            NodeRef::FunctionDefinition(func) => handler.handle_function_definition(func),
            NodeRef::Reaction(reaction) => handler.handle_reaction(reaction),
            NodeRef::KineticLaw(law) => handler.handle_kinetic_law(law),
            NodeRef::UnitDefinition(unit) => handler.handle_unit_definition(unit),
            NodeRef::AssignmentRule(var, expr) => handler.handle_assignment_rule(var, expr),
            NodeRef::RateRule(var, expr) => handler.handle_rate_rule(var, expr),
            NodeRef::AlgebraicConstraint(c) => handler.handle_algebraic_constraint(c),
        }
    }
}

pub trait NodeHandler {
    fn handle_node(&mut self, _kind: NodeKind) {}

    fn handle_definition(&mut self, def: &dyn Named) {
        self.handle_node(def.node_kind())
    }

    fn handle_variable(&mut self, var: &VariableDefinition) {
        self.handle_definition(var)
    }

    fn handle_model(&mut self, _model: &Model) {
        self.handle_node(NodeKind::Model)
    }

    fn handle_parameter(&mut self, param: &Parameter) {
        self.handle_variable(&param.var)
    }

    fn handle_compartment(&mut self, compartment: &Compartment) {
        self.handle_variable(&compartment.var)
    }

    fn handle_species(&mut self, species: &Species) {
        self.handle_variable(&species.var)
    }

    fn handle_function_argument(&mut self, arg: &FunctionArgument) {
        self.handle_variable(&arg.var)
    }

    fn handle_function_definition(&mut self, func: &FunctionDefinition) {
        self.handle_definition(func)
    }

    fn handle_reaction(&mut self, reaction: &Reaction) {
        self.handle_definition(reaction)
    }

    fn handle_kinetic_law(&mut self, _law: &KineticLaw) {
        self.handle_node(NodeKind::KineticLaw)
    }

    fn handle_unit_definition(&mut self, unit: &UnitDefinition) {
        self.handle_definition(unit)
    }

    fn handle_assignment_rule(&mut self, _var: &VariableDefinition, _expr: &Expr) {
        self.handle_node(NodeKind::AssignmentRule)
    }

    fn handle_rate_rule(&mut self, _var: &VariableDefinition, _expr: &Expr) {
        self.handle_node(NodeKind::RateRule)
    }

    fn handle_algebraic_constraint(&mut self, _constraint: &AlgebraicConstraint) {
        self.handle_node(NodeKind::AlgebraicConstraint)
    }
}
