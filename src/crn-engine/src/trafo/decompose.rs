// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Splitting a model into independent sub-networks.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::common::{Ident, Result};
use crate::model::Model;
use crate::trafo::copyist::ModelCopyist;

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        DisjointSets {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut i = i;
        while self.parent[i] != root {
            let next = self.parent[i];
            self.parent[i] = root;
            i = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            // keep the smaller index as root so components come out in
            // species order
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            self.parent[hi] = lo;
        }
    }
}

/// components groups the model's species into connected components of
/// the species-reaction graph: two species are connected when one
/// reaction has both as reactant, product or modifier.  Components are
/// ordered by their first species, species within a component by
/// position in the model.
pub fn components(model: &Model) -> Vec<Vec<Ident>> {
    let n = model.num_species();
    let mut sets = DisjointSets::new(n);
    for reaction in model.all_reactions() {
        let mut species = reaction.participants();
        species.extend(model.modifiers(reaction));
        let indices: Vec<usize> = species
            .iter()
            .filter_map(|sym| model.get_species_by_symbol(sym))
            .filter_map(|s| model.species_index(s.ident()))
            .collect();
        for pair in indices.windows(2) {
            sets.union(pair[0], pair[1]);
        }
    }

    let mut groups: BTreeMap<usize, Vec<Ident>> = BTreeMap::new();
    for (i, species) in model.all_species().enumerate() {
        let root = sets.find(i);
        groups.entry(root).or_default().push(species.ident().to_owned());
    }
    groups.into_values().collect()
}

/// decompose returns one deep copy of `model` per component.  Each copy
/// keeps the component's species, the reactions touching them, and
/// every definition that is neither a species nor a reaction.
/// Reactions that involve no species are dropped.
pub fn decompose(model: &Model) -> Result<Vec<Model>> {
    let components = components(model);
    let mut result = Vec::with_capacity(components.len());
    for (i, keep) in components.iter().enumerate() {
        let keep: HashSet<&str> = keep.iter().map(|ident| ident.as_str()).collect();

        let drop_species: Vec<Ident> = model
            .all_species()
            .filter(|s| !keep.contains(s.ident()))
            .map(|s| s.ident().to_owned())
            .collect();
        let drop_reactions: Vec<Ident> = model
            .all_reactions()
            .filter(|reaction| {
                let mut species = reaction.participants();
                species.extend(model.modifiers(reaction));
                !species.iter().any(|sym| {
                    model
                        .get_species_by_symbol(sym)
                        .is_some_and(|s| keep.contains(s.ident()))
                })
            })
            .map(|reaction| reaction.ident().to_owned())
            .collect();

        let (mut part, _) = ModelCopyist::copy(model)?;
        for ident in drop_species.iter().chain(drop_reactions.iter()) {
            part.rem_definition(ident)?;
        }
        if let Some(name) = &model.name {
            part.name = Some(format!("{name}_{}", i + 1));
        }
        debug!(
            part = i,
            species = part.num_species(),
            reactions = part.num_reactions(),
            "decomposed model"
        );
        result.push(part);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::testutils::{cycle_model, sym, two_networks_model, x_species};

    #[test]
    fn test_two_networks() {
        let mut model = two_networks_model();
        model.name = Some("net".to_owned());
        assert_eq!(
            vec![
                vec!["A".to_owned(), "B".to_owned()],
                vec!["C".to_owned(), "D".to_owned()]
            ],
            components(&model)
        );

        let parts = decompose(&model).unwrap();
        assert_eq!(2, parts.len());
        let (first, second) = (&parts[0], &parts[1]);
        assert_eq!(Some("net_1".to_owned()), first.name);
        assert_eq!(2, first.num_species());
        assert_eq!(vec!["r1", "r2"], first.all_reactions().map(|r| r.ident()).collect::<Vec<_>>());
        assert_eq!(vec!["r3"], second.all_reactions().map(|r| r.ident()).collect::<Vec<_>>());
        assert!(second.get_species("A").is_none());
        // parameters and compartments go to every part
        assert_eq!(model.num_parameters(), first.num_parameters());
        assert_eq!(model.num_parameters(), second.num_parameters());
        assert!(second.has_definition("cell"));
        // parts are copies
        assert_ne!(sym(&model, "C"), sym(second, "C"));
    }

    #[test]
    fn test_modifiers_connect() {
        let mut model = two_networks_model();
        let c = Expr::sym(&sym(&model, "C"));
        let r1 = model.get_reaction_mut("r1").unwrap();
        r1.kinetic_law_mut().rate_law = r1.rate_law().clone() * c;
        assert_eq!(1, components(&model).len());
    }

    #[test]
    fn test_isolated_species() {
        let mut model = cycle_model();
        let cell = sym(&model, "cell");
        model.add_definition(x_species("Z", &cell, 1.0));
        let parts = decompose(&model).unwrap();
        assert_eq!(2, parts.len());
        assert_eq!(0, parts[1].num_reactions());
        assert!(parts[1].get_species("Z").is_some());
    }
}
