// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Deep copies of models.
//!
//! Copying happens in two phases.  First every definition is cloned
//! and given a fresh symbol, recording old -> new in a translation
//! table; local parameters and function arguments are included, as is
//! the time symbol.  Then every expression and symbol reference in the
//! copy is rewritten through the table.  The copy shares no symbols
//! with the source, so the two can be edited independently and even
//! merged into one model.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ast::{Expr, Symbol};
use crate::common::Result;
use crate::definition::Definition;
use crate::model::Model;
use crate::reaction::Reaction;
use crate::trafo::{Traversal, walk_reaction, walk_variable};
use crate::variable::{Compartment, Species, VariableDefinition};

pub type Translation = HashMap<Symbol, Symbol>;

#[derive(Debug, Default)]
pub struct ModelCopyist {
    translation: Translation,
}

impl ModelCopyist {
    /// copy returns a deep copy of `model` and the translation from the
    /// source's symbols to the copy's.
    pub fn copy(model: &Model) -> Result<(Model, Translation)> {
        let mut copyist = ModelCopyist::default();

        let mut copy = Model::with_config(*model.config());
        copy.name = model.name.clone();
        copy.set_default_units(model.default_units().clone());
        let time = model.time_symbol().fresh();
        copyist
            .translation
            .insert(model.time_symbol().clone(), time.clone());
        copy.set_time_symbol(time);
        for def in model.definitions() {
            copy.add_definition(copyist.copy_definition(def)?);
        }
        for constraint in model.constraints() {
            copy.add_constraint(constraint.expr.clone());
        }

        let mut translator = Translator {
            translation: &copyist.translation,
        };
        translator.apply(&mut copy)?;
        Ok((copy, copyist.translation))
    }

    fn refresh(&mut self, var: &mut VariableDefinition) {
        let new_sym = var.symbol().fresh();
        self.translation.insert(var.symbol().clone(), new_sym.clone());
        var.set_symbol(new_sym);
    }

    fn copy_definition(&mut self, def: &Definition) -> Result<Definition> {
        let mut def = def.clone();
        if let Some(var) = def.as_variable_mut() {
            self.refresh(var);
        }
        if let Some(scope) = def.scope_mut() {
            let mut inner = scope.take_definitions();
            for local in inner.iter_mut() {
                if let Some(var) = local.as_variable_mut() {
                    self.refresh(var);
                }
            }
            scope.rebuild(inner)?;
            scope.renew_id();
        }
        Ok(def)
    }
}

/// translate rewrites every symbol reference in `model` (expressions,
/// compartments of species, `outside` links and stoichiometry keys)
/// through `translation`.  Definitions keep their own symbols.
pub fn translate(model: &mut Model, translation: &Translation) -> Result<()> {
    Translator { translation }.apply(model)
}

struct Translator<'a> {
    translation: &'a Translation,
}

impl Translator<'_> {
    fn map(&self, sym: &Symbol) -> Symbol {
        self.translation.get(sym).unwrap_or(sym).clone()
    }

    fn map_keys(&self, stoichiometry: &mut IndexMap<Symbol, Expr>) {
        *stoichiometry = std::mem::take(stoichiometry)
            .into_iter()
            .map(|(sym, expr)| (self.map(&sym), expr))
            .collect();
    }
}

impl Traversal for Translator<'_> {
    fn visit_species(&mut self, species: &mut Species) -> Result<()> {
        species.compartment = self.map(&species.compartment);
        walk_variable(self, &mut species.var)
    }

    fn visit_compartment(&mut self, compartment: &mut Compartment) -> Result<()> {
        if let Some(outside) = &compartment.outside {
            compartment.outside = Some(self.map(outside));
        }
        walk_variable(self, &mut compartment.var)
    }

    fn visit_reaction(&mut self, reaction: &mut Reaction) -> Result<()> {
        self.map_keys(&mut reaction.reactants);
        self.map_keys(&mut reaction.products);
        walk_reaction(self, reaction)
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        expr.rename(self.translation);
        Ok(())
    }
}
