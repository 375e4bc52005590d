// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;
use std::fmt;

use crate::ast::{Expr, Symbol};
use crate::common::{Ident, Result};
use crate::config::{AnalysisOptions, Config, Constants};
use crate::definition::{Definition, UnitDefinition};
use crate::function::FunctionDefinition;
use crate::node::{Node, NodeKind, NodeRef};
use crate::reaction::Reaction;
use crate::scope::{Scope, ScopeId, ScopeLookup};
use crate::trafo::reference_counter::ReferenceCounter;
use crate::trafo::rescale;
use crate::units::{BaseUnit, ScaledBaseUnit, Unit};
use crate::variable::{Compartment, Parameter, Species, VariableDefinition};
use crate::{model_err, unit_err};

/// An equation the model's variables must satisfy (`expr == 0`).
#[derive(Clone, Debug, PartialEq)]
pub struct AlgebraicConstraint {
    pub expr: Expr,
}

impl AlgebraicConstraint {
    pub fn new(expr: Expr) -> Self {
        AlgebraicConstraint { expr }
    }
}

impl Node for AlgebraicConstraint {
    fn node_kind(&self) -> NodeKind {
        NodeKind::AlgebraicConstraint
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DefaultUnit {
    Substance,
    Volume,
    Area,
    Length,
    Time,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DefaultUnits {
    pub substance: Unit,
    pub volume: Unit,
    pub area: Unit,
    pub length: Unit,
    pub time: Unit,
}

impl Default for DefaultUnits {
    fn default() -> Self {
        DefaultUnits {
            substance: Unit::from(BaseUnit::Mole),
            volume: Unit::from(BaseUnit::Litre),
            area: Unit::from(ScaledBaseUnit::new(BaseUnit::Metre, 1.0, 0, 2)),
            length: Unit::from(BaseUnit::Metre),
            time: Unit::from(BaseUnit::Second),
        }
    }
}

impl DefaultUnits {
    pub fn get(&self, which: DefaultUnit) -> &Unit {
        match which {
            DefaultUnit::Substance => &self.substance,
            DefaultUnit::Volume => &self.volume,
            DefaultUnit::Area => &self.area,
            DefaultUnit::Length => &self.length,
            DefaultUnit::Time => &self.time,
        }
    }

    pub fn set(&mut self, which: DefaultUnit, unit: Unit) {
        match which {
            DefaultUnit::Substance => self.substance = unit,
            DefaultUnit::Volume => self.volume = unit,
            DefaultUnit::Area => self.area = unit,
            DefaultUnit::Length => self.length = unit,
            DefaultUnit::Time => self.time = unit,
        }
    }

    /// derived_unit returns the unit of a variable without an explicit
    /// unit.  `dims` is the spatial dimension of the compartment
    /// involved, if known.
    fn derived_unit(&self, kind: NodeKind, dims: Option<u8>, only_substance: bool) -> Unit {
        let volume_like = |dims: Option<u8>| match dims.unwrap_or(3) {
            3 => self.volume.clone(),
            2 => self.area.clone(),
            1 => self.length.clone(),
            _ => Unit::dimensionless(),
        };
        match kind {
            NodeKind::Compartment => volume_like(dims),
            NodeKind::Species if only_substance => self.substance.clone(),
            NodeKind::Species => self.substance.clone() / volume_like(dims),
            _ => Unit::dimensionless(),
        }
    }
}

fn check_default_unit(which: DefaultUnit, unit: &Unit) -> Result<()> {
    let ok = match which {
        DefaultUnit::Substance => unit.is_substance_unit(),
        DefaultUnit::Volume => unit.is_volume_unit(),
        DefaultUnit::Area => unit.is_area_unit(),
        DefaultUnit::Length => unit.is_length_unit(),
        DefaultUnit::Time => unit.is_time_unit(),
    };
    if ok {
        Ok(())
    } else {
        unit_err!(
            IncompatibleUnits,
            format!("'{unit}' can't be the default {which:?} unit")
        )
    }
}

/// Model is the root scope of a reaction network.  Besides owning
/// every definition, it keeps the species, compartments, parameters
/// and reactions in side lists for indexed access.
#[derive(Clone, Debug)]
pub struct Model {
    pub name: Option<String>,
    scope: Scope,
    // nested scope id -> identifier of the definition owning it
    nested: HashMap<ScopeId, Ident>,
    species: Vec<Ident>,
    compartments: Vec<Ident>,
    parameters: Vec<Ident>,
    reactions: Vec<Ident>,
    time_symbol: Symbol,
    default_units: DefaultUnits,
    constraints: Vec<AlgebraicConstraint>,
    config: Config,
}

impl PartialEq for Model {
    // side lists and the nested scope index are derived from the scope
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.scope == other.scope
            && self.time_symbol == other.time_symbol
            && self.default_units == other.default_units
            && self.constraints == other.constraints
            && self.config == other.config
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::new(Constants::default())
    }
}

impl Model {
    pub fn new(constants: Constants) -> Self {
        Model::with_config(Config {
            constants,
            analysis: AnalysisOptions::default(),
        })
    }

    pub fn with_config(config: Config) -> Self {
        Model {
            name: None,
            scope: Scope::new(None, false),
            nested: HashMap::new(),
            species: vec![],
            compartments: vec![],
            parameters: vec![],
            reactions: vec![],
            time_symbol: Symbol::new("time"),
            default_units: DefaultUnits::default(),
            constraints: vec![],
            config,
        }
    }

    pub fn constants(&self) -> &Constants {
        &self.config.constants
    }

    pub fn analysis_options(&self) -> &AnalysisOptions {
        &self.config.analysis
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn time_symbol(&self) -> &Symbol {
        &self.time_symbol
    }

    pub(crate) fn set_time_symbol(&mut self, sym: Symbol) {
        self.time_symbol = sym;
    }

    pub fn as_node(&self) -> NodeRef<'_> {
        NodeRef::Model(self)
    }

    fn side_list_mut(&mut self, kind: NodeKind) -> Option<&mut Vec<Ident>> {
        match kind {
            NodeKind::Species => Some(&mut self.species),
            NodeKind::Compartment => Some(&mut self.compartments),
            NodeKind::Parameter => Some(&mut self.parameters),
            NodeKind::Reaction => Some(&mut self.reactions),
            _ => None,
        }
    }

    /// reindex rebuilds the side lists and the nested scope index from
    /// the root scope's contents.
    pub(crate) fn reindex(&mut self) {
        self.species.clear();
        self.compartments.clear();
        self.parameters.clear();
        self.reactions.clear();
        self.nested.clear();

        let mut entries: Vec<(NodeKind, Ident)> = Vec::with_capacity(self.scope.len());
        for def in self.scope.definitions_mut() {
            let ident = def.ident().to_owned();
            if let Some(child) = def.scope_mut() {
                if self.nested.contains_key(&child.id()) {
                    // copies of a definition share a scope id
                    child.renew_id();
                }
                self.nested.insert(child.id(), ident.clone());
            }
            entries.push((def.node_kind(), ident));
        }
        for (kind, ident) in entries {
            if let Some(list) = self.side_list_mut(kind) {
                list.push(ident);
            }
        }
    }

    /// add_definition moves `def` into the model.  A definition with the
    /// same identifier is evicted and dropped.
    pub fn add_definition<D: Into<Definition>>(&mut self, def: D) {
        let def = def.into();
        let kind = def.node_kind();
        let ident = def.ident().to_owned();
        if self.scope.add_definition(def).is_some() {
            self.reindex();
            return;
        }
        if let Some(def) = self.scope.get_definition_mut(&ident) {
            if let Some(child) = def.scope_mut() {
                if self.nested.contains_key(&child.id()) {
                    child.renew_id();
                }
                self.nested.insert(child.id(), ident.clone());
            }
        }
        if let Some(list) = self.side_list_mut(kind) {
            list.push(ident);
        }
    }

    /// add_definition_after inserts `def` directly after the definition
    /// named `after`.
    pub fn add_definition_after<D: Into<Definition>>(&mut self, def: D, after: &str) -> Result<()> {
        self.scope.add_definition_after(def.into(), after)?;
        self.reindex();
        Ok(())
    }

    pub(crate) fn add_definition_at(&mut self, def: Definition, index: usize) -> Result<()> {
        match index.checked_sub(1) {
            Some(prev) => {
                let prev = self
                    .scope
                    .definitions()
                    .nth(prev)
                    .map(|d| d.ident().to_owned());
                match prev {
                    Some(prev) => self.add_definition_after(def, &prev),
                    None => {
                        self.add_definition(def);
                        Ok(())
                    }
                }
            }
            None => {
                let mut rest = self.scope.take_definitions();
                rest.insert(0, def);
                self.scope.rebuild(rest)?;
                self.reindex();
                Ok(())
            }
        }
    }

    /// rem_definition removes a definition from the model and hands it
    /// back.  It doesn't check whether the definition is still
    /// referenced; see `rem_definition_checked`.
    pub fn rem_definition(&mut self, ident: &str) -> Result<Definition> {
        let def = self.scope.rem_definition(ident)?;
        if let Some(child) = def.scope() {
            self.nested.remove(&child.id());
        }
        if let Some(list) = self.side_list_mut(def.node_kind()) {
            list.retain(|entry| entry != ident);
        }
        Ok(def)
    }

    /// rem_definition_checked is `rem_definition` that refuses to remove
    /// a variable some other part of the model still references.
    pub fn rem_definition_checked(&mut self, ident: &str) -> Result<Definition> {
        let def = match self.get_definition(ident) {
            Some(def) => def,
            None => return model_err!(DoesNotExist, ident.to_owned()),
        };
        if let Some(sym) = def.symbol() {
            let counter = ReferenceCounter::for_model_except(self, Some(ident));
            let refs = counter.count(sym);
            if refs > 0 {
                return model_err!(
                    StillReferenced,
                    format!("{ident} is referenced {refs} time(s)")
                );
            }
        }
        self.rem_definition(ident)
    }

    pub fn len(&self) -> usize {
        self.scope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.scope.definitions()
    }

    pub fn has_definition(&self, ident: &str) -> bool {
        self.scope.has_definition(ident)
    }

    pub fn get_definition(&self, ident: &str) -> Option<&Definition> {
        self.scope.get_definition(ident)
    }

    /// get_definition_mut allows in-place edits.  Callers must not
    /// replace the definition wholesale; use `add_definition` for that.
    pub fn get_definition_mut(&mut self, ident: &str) -> Option<&mut Definition> {
        self.scope.get_definition_mut(ident)
    }

    pub fn has_variable(&self, ident: &str) -> bool {
        self.scope.has_variable(ident)
    }

    pub fn get_variable(&self, ident: &str) -> Result<&VariableDefinition> {
        self.scope.get_variable(ident)
    }

    pub fn get_variable_mut(&mut self, ident: &str) -> Result<&mut VariableDefinition> {
        self.scope.get_variable_mut(ident)
    }

    /// get_variable_by_symbol finds the variable owning `sym`, whether
    /// global or local to a kinetic law or function.
    pub fn get_variable_by_symbol(&self, sym: &Symbol) -> Option<&VariableDefinition> {
        if let Some(var) = self.scope.get_variable_by_symbol(sym) {
            return Some(var);
        }
        self.scope
            .definitions()
            .filter_map(Definition::scope)
            .find_map(|scope| scope.get_variable_by_symbol(sym))
    }

    pub fn get_variable_by_symbol_mut(&mut self, sym: &Symbol) -> Option<&mut VariableDefinition> {
        if self.scope.has_symbol(sym) {
            return self.scope.get_variable_by_symbol_mut(sym);
        }
        self.scope
            .definitions_mut()
            .filter_map(Definition::scope_mut)
            .find_map(|scope| scope.get_variable_by_symbol_mut(sym))
    }

    pub fn get_species(&self, ident: &str) -> Option<&Species> {
        self.get_definition(ident).and_then(Definition::as_species)
    }

    pub fn get_species_mut(&mut self, ident: &str) -> Option<&mut Species> {
        match self.scope.get_definition_mut(ident) {
            Some(Definition::Species(species)) => Some(species),
            _ => None,
        }
    }

    pub fn get_species_by_symbol(&self, sym: &Symbol) -> Option<&Species> {
        self.scope
            .get_definition_by_symbol(sym)
            .and_then(Definition::as_species)
    }

    pub fn get_compartment(&self, ident: &str) -> Option<&Compartment> {
        self.get_definition(ident).and_then(Definition::as_compartment)
    }

    pub fn get_compartment_mut(&mut self, ident: &str) -> Option<&mut Compartment> {
        match self.scope.get_definition_mut(ident) {
            Some(Definition::Compartment(compartment)) => Some(compartment),
            _ => None,
        }
    }

    pub fn get_compartment_by_symbol(&self, sym: &Symbol) -> Option<&Compartment> {
        self.scope
            .get_definition_by_symbol(sym)
            .and_then(Definition::as_compartment)
    }

    pub fn get_parameter(&self, ident: &str) -> Option<&Parameter> {
        self.get_definition(ident).and_then(Definition::as_parameter)
    }

    pub fn get_parameter_mut(&mut self, ident: &str) -> Option<&mut Parameter> {
        match self.scope.get_definition_mut(ident) {
            Some(Definition::Parameter(param)) => Some(param),
            _ => None,
        }
    }

    pub fn get_reaction(&self, ident: &str) -> Option<&Reaction> {
        self.get_definition(ident).and_then(Definition::as_reaction)
    }

    pub fn get_reaction_mut(&mut self, ident: &str) -> Option<&mut Reaction> {
        match self.scope.get_definition_mut(ident) {
            Some(Definition::Reaction(reaction)) => Some(reaction),
            _ => None,
        }
    }

    pub fn get_function(&self, ident: &str) -> Option<&FunctionDefinition> {
        self.get_definition(ident).and_then(Definition::as_function)
    }

    pub fn get_unit_definition(&self, ident: &str) -> Option<&UnitDefinition> {
        self.get_definition(ident)
            .and_then(Definition::as_unit_definition)
    }

    fn nth<'a, T>(
        &'a self,
        list: &[Ident],
        i: usize,
        cast: impl Fn(&'a Definition) -> Option<&'a T>,
    ) -> Option<&'a T> {
        list.get(i)
            .and_then(|ident| self.scope.get_definition(ident))
            .and_then(cast)
    }

    pub fn species(&self, i: usize) -> Option<&Species> {
        self.nth(&self.species, i, Definition::as_species)
    }

    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    pub fn species_index(&self, ident: &str) -> Option<usize> {
        self.species.iter().position(|entry| entry == ident)
    }

    pub fn all_species(&self) -> impl Iterator<Item = &Species> {
        self.species
            .iter()
            .filter_map(|ident| self.get_species(ident))
    }

    pub fn compartment(&self, i: usize) -> Option<&Compartment> {
        self.nth(&self.compartments, i, Definition::as_compartment)
    }

    pub fn num_compartments(&self) -> usize {
        self.compartments.len()
    }

    pub fn compartment_index(&self, ident: &str) -> Option<usize> {
        self.compartments.iter().position(|entry| entry == ident)
    }

    pub fn all_compartments(&self) -> impl Iterator<Item = &Compartment> {
        self.compartments
            .iter()
            .filter_map(|ident| self.get_compartment(ident))
    }

    pub fn parameter(&self, i: usize) -> Option<&Parameter> {
        self.nth(&self.parameters, i, Definition::as_parameter)
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_index(&self, ident: &str) -> Option<usize> {
        self.parameters.iter().position(|entry| entry == ident)
    }

    pub fn all_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter_map(|ident| self.get_parameter(ident))
    }

    pub fn reaction(&self, i: usize) -> Option<&Reaction> {
        self.nth(&self.reactions, i, Definition::as_reaction)
    }

    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn reaction_index(&self, ident: &str) -> Option<usize> {
        self.reactions.iter().position(|entry| entry == ident)
    }

    pub fn all_reactions(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions
            .iter()
            .filter_map(|ident| self.get_reaction(ident))
    }

    /// modifiers returns the species `reaction`'s rate law references
    /// that are neither reactants nor products.
    pub fn modifiers(&self, reaction: &Reaction) -> Vec<Symbol> {
        reaction.modifiers(|sym| self.get_species_by_symbol(sym).is_some())
    }

    pub fn constraints(&self) -> &[AlgebraicConstraint] {
        &self.constraints
    }

    pub(crate) fn constraints_mut(&mut self) -> &mut Vec<AlgebraicConstraint> {
        &mut self.constraints
    }

    pub fn add_constraint(&mut self, expr: Expr) {
        self.constraints.push(AlgebraicConstraint::new(expr));
    }

    /// resolve looks `ident` up starting from the scope `scope`.
    pub fn resolve(&self, scope: ScopeId, ident: &str) -> Result<&Definition> {
        match ScopeLookup::scope(self, scope) {
            Some(scope) => scope.resolve(ident, self),
            None => model_err!(DoesNotExist, format!("no scope {scope:?}")),
        }
    }

    pub fn resolve_symbol(&self, scope: ScopeId, sym: &Symbol) -> Result<&VariableDefinition> {
        match ScopeLookup::scope(self, scope) {
            Some(scope) => scope.resolve_symbol(sym, self),
            None => model_err!(DoesNotExist, format!("no scope {scope:?}")),
        }
    }

    pub fn default_units(&self) -> &DefaultUnits {
        &self.default_units
    }

    pub fn default_substance_unit(&self) -> &Unit {
        &self.default_units.substance
    }

    pub fn default_volume_unit(&self) -> &Unit {
        &self.default_units.volume
    }

    pub fn default_area_unit(&self) -> &Unit {
        &self.default_units.area
    }

    pub fn default_length_unit(&self) -> &Unit {
        &self.default_units.length
    }

    pub fn default_time_unit(&self) -> &Unit {
        &self.default_units.time
    }

    /// set_default_unit changes one of the default units.  With
    /// `rescale_model`, every value whose unit derives from the defaults
    /// is converted so the model describes the same system; on error
    /// the model is left as it was.
    pub fn set_default_unit(
        &mut self,
        which: DefaultUnit,
        unit: Unit,
        rescale_model: bool,
    ) -> Result<()> {
        check_default_unit(which, &unit)?;
        if rescale_model {
            let mut defaults = self.default_units.clone();
            defaults.set(which, unit);
            rescale::rescale_to_defaults(self, defaults)
        } else {
            self.default_units.set(which, unit);
            Ok(())
        }
    }

    pub(crate) fn set_default_units(&mut self, defaults: DefaultUnits) {
        self.default_units = defaults;
    }

    pub fn set_default_substance_unit(&mut self, unit: Unit, rescale_model: bool) -> Result<()> {
        self.set_default_unit(DefaultUnit::Substance, unit, rescale_model)
    }

    pub fn set_default_volume_unit(&mut self, unit: Unit, rescale_model: bool) -> Result<()> {
        self.set_default_unit(DefaultUnit::Volume, unit, rescale_model)
    }

    pub fn set_default_area_unit(&mut self, unit: Unit, rescale_model: bool) -> Result<()> {
        self.set_default_unit(DefaultUnit::Area, unit, rescale_model)
    }

    pub fn set_default_length_unit(&mut self, unit: Unit, rescale_model: bool) -> Result<()> {
        self.set_default_unit(DefaultUnit::Length, unit, rescale_model)
    }

    pub fn set_default_time_unit(&mut self, unit: Unit, rescale_model: bool) -> Result<()> {
        self.set_default_unit(DefaultUnit::Time, unit, rescale_model)
    }

    /// unit_of returns the unit of `var`: its explicit unit, or else the
    /// one derived from the model's default units.
    pub fn unit_of(&self, var: &VariableDefinition) -> Unit {
        self.unit_of_with(var, &self.default_units)
    }

    pub(crate) fn unit_of_with(&self, var: &VariableDefinition, defaults: &DefaultUnits) -> Unit {
        if let Some(unit) = &var.unit {
            return unit.clone();
        }
        match var.node_kind() {
            NodeKind::Compartment => {
                let dims = self
                    .get_compartment_by_symbol(var.symbol())
                    .map(|c| c.spatial_dimension);
                defaults.derived_unit(NodeKind::Compartment, dims, false)
            }
            NodeKind::Species => match self.get_species_by_symbol(var.symbol()) {
                Some(species) if species.only_substance_units => defaults.substance.clone(),
                Some(species) => match self.get_compartment_by_symbol(&species.compartment) {
                    Some(compartment) => {
                        defaults.substance.clone() / self.unit_of_with(&compartment.var, defaults)
                    }
                    None => defaults.derived_unit(NodeKind::Species, None, false),
                },
                None => defaults.derived_unit(NodeKind::Species, None, false),
            },
            kind => defaults.derived_unit(kind, None, false),
        }
    }
}

impl ScopeLookup for Model {
    fn scope(&self, id: ScopeId) -> Option<&Scope> {
        if id == self.scope.id() {
            return Some(&self.scope);
        }
        let ident = self.nested.get(&id)?;
        self.scope.get_definition(ident)?.scope()
    }
}

impl Node for Model {
    fn node_kind(&self) -> NodeKind {
        NodeKind::Model
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::print::dump(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::testutils::{mass_action_model, x_compartment, x_param, x_species};

    #[test]
    fn test_side_lists_follow_insertion_order() {
        let mut model = Model::default();
        let cell = x_compartment("cell");
        let cell_sym = cell.symbol().clone();
        model.add_definition(cell);
        model.add_definition(x_species("B", &cell_sym, 0.0));
        model.add_definition(x_param("k", 1.0));
        model.add_definition(x_species("A", &cell_sym, 1.0));

        assert_eq!(2, model.num_species());
        assert_eq!(1, model.num_parameters());
        assert_eq!(1, model.num_compartments());
        assert_eq!("B", model.species(0).unwrap().ident());
        assert_eq!("A", model.species(1).unwrap().ident());
        assert!(model.species(2).is_none());
        assert_eq!(Some(1), model.species_index("A"));
        assert_eq!(None, model.species_index("k"));

        model
            .add_definition_after(x_species("C", &cell_sym, 0.0), "B")
            .unwrap();
        let order: Vec<&str> = model.all_species().map(|s| s.ident()).collect();
        assert_eq!(vec!["B", "C", "A"], order);

        let removed = model.rem_definition("C").unwrap();
        assert_eq!("C", removed.ident());
        assert_eq!(2, model.num_species());
        assert!(model.get_species("C").is_none());
    }

    #[test]
    fn test_add_definition_at_position() {
        let mut model = mass_action_model();
        model.add_definition_at(x_param("first", 1.0).into(), 0).unwrap();
        model.add_definition_at(x_param("third", 1.0).into(), 2).unwrap();
        model.add_definition_at(x_param("last", 1.0).into(), 99).unwrap();

        let order: Vec<&str> = model.definitions().map(|d| d.ident()).collect();
        assert_eq!(
            vec!["first", "cell", "third", "A", "B", "k1", "r1", "last"],
            order
        );
        assert!(model.get_variable("first").is_ok());
        assert_eq!(4, model.num_parameters());
    }

    #[test]
    fn test_eviction_replaces_definition() {
        let mut model = Model::default();
        model.add_definition(x_param("x", 1.0));
        let old_sym = model.get_variable("x").unwrap().symbol().clone();
        let cell = x_compartment("x");
        model.add_definition(cell);

        assert_eq!(0, model.num_parameters());
        assert_eq!(1, model.num_compartments());
        assert!(model.get_variable_by_symbol(&old_sym).is_none());
        assert_eq!(1, model.len());
    }

    #[test]
    fn test_lookup_errors() {
        let model = mass_action_model();
        assert!(model.has_definition("r1"));
        assert!(!model.has_variable("r1"));
        assert_eq!(
            ErrorCode::ExpectedVariable,
            model.get_variable("r1").unwrap_err().code
        );
        assert_eq!(
            ErrorCode::UndefinedSymbol,
            model.get_variable("nope").unwrap_err().code
        );
        assert!(model.get_reaction("A").is_none());
        assert!(model.get_species("A").is_some());
    }

    #[test]
    fn test_nested_scope_resolution() {
        let mut model = mass_action_model();
        let local = x_param("kl", 2.0);
        let local_sym = local.symbol().clone();
        model
            .get_reaction_mut("r1")
            .unwrap()
            .kinetic_law_mut()
            .add_local_parameter(local);

        let law_scope = model.get_reaction("r1").unwrap().kinetic_law().scope().id();
        assert_eq!(Some(model.scope().id()), model.get_reaction("r1").unwrap().kinetic_law().scope().parent());
        assert_eq!("kl", model.resolve(law_scope, "kl").unwrap().ident());
        // falls through to the model
        assert_eq!("k1", model.resolve(law_scope, "k1").unwrap().ident());
        assert_eq!("kl", model.get_variable_by_symbol(&local_sym).unwrap().ident());
        assert!(model.resolve(model.scope().id(), "kl").is_err());
    }

    #[test]
    fn test_function_scope_is_closed() {
        let mut model = mass_action_model();
        let f = FunctionDefinition::new("f", &["x"]).unwrap();
        model.add_definition(f);
        let f_scope = model.get_function("f").unwrap().scope().id();
        assert_eq!("x", model.resolve(f_scope, "x").unwrap().ident());
        let err = model.resolve(f_scope, "k1").unwrap_err();
        assert_eq!(ErrorCode::UndefinedSymbol, err.code);
    }

    #[test]
    fn test_modifiers() {
        let mut model = mass_action_model();
        let cell_sym = model.get_variable("cell").unwrap().symbol().clone();
        let e = x_species("E", &cell_sym, 1.0);
        let e_sym = e.symbol().clone();
        model.add_definition(e);
        let r1 = model.get_reaction_mut("r1").unwrap();
        r1.kinetic_law_mut().rate_law = r1.rate_law().clone() * Expr::sym(&e_sym);

        let r1 = model.get_reaction("r1").unwrap();
        assert_eq!(vec![e_sym], model.modifiers(r1));
    }

    #[test]
    fn test_unit_of() {
        let mut model = Model::default();
        let cell = x_compartment("cell");
        let cell_sym = cell.symbol().clone();
        model.add_definition(cell);
        model.add_definition(x_species("A", &cell_sym, 1.0));
        model.add_definition(x_species("N", &cell_sym, 1.0).with_only_substance_units(true));
        model.add_definition(x_param("k", 1.0));
        let membrane = x_compartment("membrane").with_spatial_dimension(2);
        let membrane_sym = membrane.symbol().clone();
        model.add_definition(membrane);
        model.add_definition(x_species("M", &membrane_sym, 1.0));

        let unit = |ident: &str| model.unit_of(model.get_variable(ident).unwrap());
        let mole = Unit::from(BaseUnit::Mole);
        let litre = Unit::from(BaseUnit::Litre);
        assert_eq!(litre, unit("cell"));
        assert_eq!(mole.clone() / litre, unit("A"));
        assert_eq!(mole.clone(), unit("N"));
        assert_eq!(Unit::dimensionless(), unit("k"));
        assert_eq!(model.default_area_unit().clone(), unit("membrane"));
        assert_eq!(mole / model.default_area_unit().clone(), unit("M"));
    }

    #[test]
    fn test_set_default_unit_without_rescale() {
        let mut model = mass_action_model();
        let before = model.get_variable("A").unwrap().initial_value.clone();
        let mmol = Unit::from(ScaledBaseUnit::new(BaseUnit::Mole, 1.0, -3, 1));
        model.set_default_substance_unit(mmol.clone(), false).unwrap();
        assert_eq!(&mmol, model.default_substance_unit());
        assert_eq!(before, model.get_variable("A").unwrap().initial_value);

        let err = model
            .set_default_time_unit(Unit::from(BaseUnit::Mole), false)
            .unwrap_err();
        assert_eq!(ErrorCode::IncompatibleUnits, err.code);
        assert_eq!(&Unit::from(BaseUnit::Second), model.default_time_unit());
    }
}
