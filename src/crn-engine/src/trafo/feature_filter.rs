// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::{BuiltinFn, Expr};
use crate::common::Result;
use crate::definition::Definition;
use crate::model::Model;
use crate::trafo_err;

/// A model feature ODE-based simulators generally can't handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnsupportedFeature {
    NonVolumeCompartment { compartment: String, dimensions: u8 },
    NestedCompartment { compartment: String },
    AlgebraicConstraint { index: usize },
    Delay { definition: String },
}

impl std::fmt::Display for UnsupportedFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnsupportedFeature::NonVolumeCompartment {
                compartment,
                dimensions,
            } => write!(f, "compartment {compartment} has {dimensions} spatial dimensions"),
            UnsupportedFeature::NestedCompartment { compartment } => {
                write!(f, "compartment {compartment} is nested in another")
            }
            UnsupportedFeature::AlgebraicConstraint { index } => {
                write!(f, "algebraic constraint #{index}")
            }
            UnsupportedFeature::Delay { definition } => write!(f, "{definition} uses delay()"),
        }
    }
}

fn uses_delay(def: &Definition) -> bool {
    let mut found = false;
    let mut check = |expr: &Expr| found |= expr.has_builtin(BuiltinFn::Delay);
    match def {
        Definition::FunctionDefinition(func) => check(&func.body),
        Definition::Reaction(reaction) => reaction.for_each_expr(&mut check),
        Definition::UnitDefinition(_) => {}
        _ => {
            if let Some(var) = def.as_variable() {
                var.for_each_expr(&mut check);
            }
        }
    }
    found
}

/// unsupported_features lists every feature of `model` that the
/// simulators we hand models to don't support, in definition order.
pub fn unsupported_features(model: &Model) -> Vec<UnsupportedFeature> {
    let mut features = vec![];
    for def in model.definitions() {
        if let Some(compartment) = def.as_compartment() {
            if compartment.spatial_dimension != 3 {
                features.push(UnsupportedFeature::NonVolumeCompartment {
                    compartment: compartment.ident().to_owned(),
                    dimensions: compartment.spatial_dimension,
                });
            }
            if compartment.outside.is_some() {
                features.push(UnsupportedFeature::NestedCompartment {
                    compartment: compartment.ident().to_owned(),
                });
            }
        }
        if uses_delay(def) {
            features.push(UnsupportedFeature::Delay {
                definition: def.ident().to_owned(),
            });
        }
    }
    for (index, constraint) in model.constraints().iter().enumerate() {
        features.push(UnsupportedFeature::AlgebraicConstraint { index });
        if constraint.expr.has_builtin(BuiltinFn::Delay) {
            features.push(UnsupportedFeature::Delay {
                definition: format!("algebraic constraint #{index}"),
            });
        }
    }
    features
}

/// check_supported fails with `UnsupportedModelFeature` naming every
/// unsupported feature of `model`.
pub fn check_supported(model: &Model) -> Result<()> {
    let features = unsupported_features(model);
    if features.is_empty() {
        return Ok(());
    }
    let details: Vec<String> = features.iter().map(|f| f.to_string()).collect();
    trafo_err!(UnsupportedModelFeature, details.join("; "))
}
