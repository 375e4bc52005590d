// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use indexmap::IndexMap;

use crate::ast::{Expr, Symbol};
use crate::common::{Ident, Result, check_ident};
use crate::definition::Definition;
use crate::node::{Named, Node, NodeKind};
use crate::scope::Scope;
use crate::variable::Parameter;

/// KineticLaw is a reaction's rate law together with the scope of
/// parameters local to it.
#[derive(Clone, Debug, PartialEq)]
pub struct KineticLaw {
    scope: Scope,
    pub rate_law: Expr,
}

impl KineticLaw {
    pub fn new(rate_law: Expr) -> Self {
        KineticLaw {
            scope: Scope::new(None, false),
            rate_law,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn add_local_parameter(&mut self, param: Parameter) {
        self.scope.add_definition(Definition::Parameter(param));
    }

    pub fn local_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.scope.definitions().filter_map(Definition::as_parameter)
    }
}

impl Node for KineticLaw {
    fn node_kind(&self) -> NodeKind {
        NodeKind::KineticLaw
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reaction {
    ident: Ident,
    pub name: Option<String>,
    pub reversible: bool,
    /// species symbol -> stoichiometry, in insertion order
    pub reactants: IndexMap<Symbol, Expr>,
    pub products: IndexMap<Symbol, Expr>,
    kinetic_law: KineticLaw,
}

impl Reaction {
    pub fn new(ident: &str, rate_law: Expr) -> Result<Self> {
        check_ident(ident)?;
        Ok(Reaction {
            ident: ident.to_owned(),
            name: None,
            reversible: false,
            reactants: IndexMap::new(),
            products: IndexMap::new(),
            kinetic_law: KineticLaw::new(rate_law),
        })
    }

    pub fn with_reactant(mut self, species: &Symbol, stoichiometry: f64) -> Self {
        self.reactants
            .insert(species.clone(), Expr::num(stoichiometry));
        self
    }

    pub fn with_product(mut self, species: &Symbol, stoichiometry: f64) -> Self {
        self.products
            .insert(species.clone(), Expr::num(stoichiometry));
        self
    }

    pub fn with_reversible(mut self, reversible: bool) -> Self {
        self.reversible = reversible;
        self
    }

    pub fn with_local_parameter(mut self, param: Parameter) -> Self {
        self.kinetic_law.add_local_parameter(param);
        self
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub(crate) fn set_ident(&mut self, ident: &str) -> Result<()> {
        check_ident(ident)?;
        self.ident = ident.to_owned();
        Ok(())
    }

    pub fn kinetic_law(&self) -> &KineticLaw {
        &self.kinetic_law
    }

    pub fn kinetic_law_mut(&mut self) -> &mut KineticLaw {
        &mut self.kinetic_law
    }

    pub fn rate_law(&self) -> &Expr {
        &self.kinetic_law.rate_law
    }

    /// participants returns reactant and product species, reactants
    /// first, without duplicates.
    pub fn participants(&self) -> Vec<Symbol> {
        let mut result: Vec<Symbol> = self.reactants.keys().cloned().collect();
        for sym in self.products.keys() {
            if !self.reactants.contains_key(sym) {
                result.push(sym.clone());
            }
        }
        result
    }

    pub fn involves(&self, species: &Symbol) -> bool {
        self.reactants.contains_key(species) || self.products.contains_key(species)
    }

    /// modifiers returns the species the rate law references that are
    /// neither reactants nor products.  `is_species` decides which
    /// symbols name species.
    pub fn modifiers(&self, is_species: impl Fn(&Symbol) -> bool) -> Vec<Symbol> {
        self.rate_law()
            .free_symbols()
            .into_iter()
            .filter(|sym| is_species(sym) && !self.involves(sym))
            .collect()
    }

    /// for_each_expr visits stoichiometries, local parameter
    /// expressions and the rate law.
    pub fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        for expr in self.reactants.values().chain(self.products.values()) {
            f(expr);
        }
        for param in self.kinetic_law.local_parameters() {
            param.var.for_each_expr(f);
        }
        f(&self.kinetic_law.rate_law);
    }
}

impl Node for Reaction {
    fn node_kind(&self) -> NodeKind {
        NodeKind::Reaction
    }
}

impl Named for Reaction {
    fn ident(&self) -> &str {
        &self.ident
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_modifiers_are_computed() {
        let a = Symbol::new("A");
        let b = Symbol::new("B");
        let e = Symbol::new("E");
        let k = Symbol::new("k");
        let species: HashSet<Symbol> = [a.clone(), b.clone(), e.clone()].into_iter().collect();

        let mut reaction = Reaction::new(
            "r1",
            Expr::sym(&k) * Expr::sym(&e) * Expr::sym(&a),
        )
        .unwrap()
        .with_reactant(&a, 1.0)
        .with_product(&b, 1.0);
        assert_eq!(vec![e.clone()], reaction.modifiers(|s| species.contains(s)));

        // E becomes a product, so it is no longer a modifier
        reaction.products.insert(e.clone(), Expr::num(1.0));
        assert!(reaction.modifiers(|s| species.contains(s)).is_empty());
        assert_eq!(vec![a, b, e], reaction.participants());
    }

    #[test]
    fn test_local_parameters() {
        let k = Parameter::new("k").unwrap().with_value(Expr::num(0.5));
        let k_sym = k.symbol().clone();
        let reaction = Reaction::new("r1", Expr::sym(&k_sym))
            .unwrap()
            .with_local_parameter(k);
        let locals: Vec<&str> = reaction
            .kinetic_law()
            .local_parameters()
            .map(|p| p.ident())
            .collect();
        assert_eq!(vec!["k"], locals);
        assert!(reaction.kinetic_law().scope().get_variable_by_symbol(&k_sym).is_some());

        let mut exprs = 0;
        reaction.for_each_expr(&mut |_| exprs += 1);
        assert_eq!(2, exprs);

        assert!(Reaction::new("r 1", Expr::num(0.0)).is_err());
    }
}
