// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! An in-memory representation of chemical reaction network models,
//! with unit algebra, lexical scopes and rewriting passes.

#![forbid(unsafe_code)]

pub mod ast;
pub mod common;
pub mod config;
pub mod definition;
pub mod function;
pub mod history;
pub mod model;
pub mod node;
pub mod print;
pub mod reaction;
pub mod scope;
pub mod trafo;
pub mod units;
pub mod variable;

#[cfg(test)]
mod testutils;

pub use self::ast::{Expr, Poly, Symbol, SymbolTable};
pub use self::common::{Error, ErrorCode, ErrorKind, Ident, Result};
pub use self::config::{AnalysisOptions, Config, Constants};
pub use self::definition::{Definition, UnitDefinition};
pub use self::function::FunctionDefinition;
pub use self::history::{Edit, History};
pub use self::model::{AlgebraicConstraint, DefaultUnit, DefaultUnits, Model};
pub use self::node::{Named, Node, NodeHandler, NodeKind, NodeRef};
pub use self::reaction::{KineticLaw, Reaction};
pub use self::scope::{Scope, ScopeId, ScopeLookup};
pub use self::units::{BaseUnit, ScaledBaseUnit, Unit};
pub use self::variable::{
    Compartment, FunctionArgument, Parameter, Rule, Species, VariableDefinition,
};
