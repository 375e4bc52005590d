// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Rescaling a model to new default units.
//!
//! A variable without an explicit unit is measured in units derived
//! from the model's defaults.  When a default changes, such a variable
//! `x` with conversion factor `f` (new value = f * old value) is
//! replaced by `x / f` in every expression, and its own initial value
//! and rule are multiplied by `f`.  Rate rules and kinetic laws are
//! per time and use the factor of `unit / time`; a rate rule on a
//! variable with an explicit unit is rescaled by the time factor alone.
//!
//! The replacements `x -> x / f` are applied together as one
//! simultaneous rewrite rather than through a normalized
//! `Substitution`, since each `x` appears in its own replacement.

use tracing::{debug, warn};

use crate::ast::{Expr, Symbol, SymbolTable};
use crate::common::Result;
use crate::model::{DefaultUnits, Model};
use crate::trafo::{ExprVisitor, Traversal};
use crate::units::Unit;
use crate::variable::Rule;

struct Rescaled {
    symbol: Symbol,
    factor: f64,
    rate_factor: f64,
}

fn scale(expr: &mut Expr, factor: f64) {
    *expr = (Expr::num(factor) * std::mem::take(expr)).fold();
}

/// rescale_to_defaults converts every default-derived value in `model`
/// to `defaults` and installs them.  All conversion factors are
/// computed first, so an `IncompatibleUnits` error leaves the model
/// unchanged.
pub fn rescale_to_defaults(model: &mut Model, defaults: DefaultUnits) -> Result<()> {
    let old = model.default_units().clone();
    let constants = *model.constants();

    let per_time = Unit::conversion_factor(
        &old.time.clone().reciprocal(),
        &defaults.time.clone().reciprocal(),
        &constants,
    )?;

    let mut rescaled: Vec<Rescaled> = vec![];
    for def in model.definitions() {
        let var = match def.as_variable() {
            Some(var) => var,
            None => continue,
        };
        if var.unit.is_some() {
            let has_rate = matches!(var.rule, Some(Rule::Rate(_)));
            if has_rate && per_time.is_finite() && per_time != 1.0 {
                rescaled.push(Rescaled {
                    symbol: var.symbol().clone(),
                    factor: 1.0,
                    rate_factor: per_time,
                });
            }
            continue;
        }
        let from = model.unit_of_with(var, &old);
        let to = model.unit_of_with(var, &defaults);
        let factor = Unit::conversion_factor(&from, &to, &constants)?;
        let rate_factor = Unit::conversion_factor(
            &(from / old.time.clone()),
            &(to / defaults.time.clone()),
            &constants,
        )?;
        if !factor.is_finite() || !rate_factor.is_finite() {
            warn!(ident = var.ident(), factor, "skipping non-finite rescale factor");
            continue;
        }
        if factor == 1.0 && rate_factor == 1.0 {
            continue;
        }
        rescaled.push(Rescaled {
            symbol: var.symbol().clone(),
            factor,
            rate_factor,
        });
    }
    let time_factor = Unit::conversion_factor(&old.time, &defaults.time, &constants)?;
    let flux_factor = Unit::conversion_factor(
        &(old.substance.clone() / old.time.clone()),
        &(defaults.substance.clone() / defaults.time.clone()),
        &constants,
    )?;

    let mut table: SymbolTable = rescaled
        .iter()
        .filter(|r| r.factor != 1.0)
        .map(|r| (r.symbol.clone(), Expr::sym(&r.symbol) / Expr::num(r.factor)))
        .collect();
    if time_factor.is_finite() && time_factor != 1.0 {
        let time = model.time_symbol().clone();
        table.insert(time.clone(), Expr::sym(&time) / Expr::num(time_factor));
    }
    if !table.is_empty() {
        ExprVisitor::new(|expr: &mut Expr| {
            expr.subs_in_place(&table);
            Ok(())
        })
        .apply(model)?;
    }

    for r in rescaled.iter() {
        let var = match model.get_variable_by_symbol_mut(&r.symbol) {
            Some(var) => var,
            None => continue,
        };
        debug!(ident = var.ident(), factor = r.factor, "rescaling variable");
        if r.factor != 1.0 {
            if let Some(value) = &mut var.initial_value {
                scale(value, r.factor);
            }
        }
        match &mut var.rule {
            Some(Rule::Assignment(expr)) if r.factor != 1.0 => scale(expr, r.factor),
            Some(Rule::Rate(expr)) if r.rate_factor != 1.0 => scale(expr, r.rate_factor),
            _ => {}
        }
    }

    if flux_factor.is_finite() && flux_factor != 1.0 {
        let reactions: Vec<String> = model.all_reactions().map(|r| r.ident().to_owned()).collect();
        for ident in reactions {
            if let Some(reaction) = model.get_reaction_mut(&ident) {
                scale(&mut reaction.kinetic_law_mut().rate_law, flux_factor);
            }
        }
    }

    model.set_default_units(defaults);
    Ok(())
}
