// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashSet;

use tracing::info;

use crate::ast::Poly;
use crate::common::{Ident, Result};
use crate::definition::Definition;
use crate::model::Model;
use crate::reaction::Reaction;
use crate::trafo::local_params::LocalParameterMover;
use crate::trafo::pass::run_pass;
use crate::trafo::{Pass, Replacement};
use crate::trafo_err;

/// ReversibleConverter splits every reversible reaction into an
/// irreversible forward reaction `<id>_fwd` and a reverse reaction
/// `<id>_rev` with reactants and products swapped.  The rate law is
/// expanded to polynomial normal form; its positive terms become the
/// forward rate and its negated negative terms the reverse rate.
#[derive(Debug, Default)]
pub struct ReversibleConverter {
    max_exponent: i32,
    taken: HashSet<Ident>,
    split: Vec<(Ident, Ident, Ident)>,
}

impl ReversibleConverter {
    pub fn new() -> Self {
        ReversibleConverter::default()
    }

    /// split lists `(original, forward, reverse)` identifiers from the
    /// last `apply`.
    pub fn split(&self) -> &[(Ident, Ident, Ident)] {
        &self.split
    }

    fn split_rate(&self, reaction: &Reaction) -> Result<(Poly, Poly)> {
        let poly = Poly::from_expr(reaction.rate_law(), self.max_exponent);
        let (forward, reverse) = poly.split_by_sign();
        if forward.is_zero() || reverse.is_zero() {
            return trafo_err!(
                UnsupportedModelFeature,
                format!(
                    "can't split the rate law of reversible reaction {}: {}",
                    reaction.ident(),
                    reaction.rate_law()
                )
            );
        }
        Ok((forward, reverse))
    }

    fn fresh_ident(&mut self, model: &Model, base: &str) -> Ident {
        let ident = model
            .scope()
            .get_new_identifier_with(base, |ident| self.taken.contains(ident));
        self.taken.insert(ident.clone());
        ident
    }
}

impl Pass for ReversibleConverter {
    fn replace(&mut self, def: &Definition, model: &Model) -> Result<Replacement> {
        let reaction = match def.as_reaction() {
            Some(reaction) if reaction.reversible => reaction,
            _ => return Ok(Replacement::Keep),
        };
        let (forward_rate, reverse_rate) = self.split_rate(reaction)?;

        let fwd_ident = self.fresh_ident(model, &format!("{}_fwd", reaction.ident()));
        let rev_ident = self.fresh_ident(model, &format!("{}_rev", reaction.ident()));

        let mut forward = reaction.clone();
        forward.set_ident(&fwd_ident)?;
        forward.reversible = false;
        forward.kinetic_law_mut().rate_law = forward_rate.to_expr();

        let mut reverse = reaction.clone();
        reverse.set_ident(&rev_ident)?;
        reverse.reversible = false;
        std::mem::swap(&mut reverse.reactants, &mut reverse.products);
        reverse.kinetic_law_mut().rate_law = reverse_rate.to_expr();

        info!(
            reaction = reaction.ident(),
            forward = %forward.rate_law(),
            reverse = %reverse.rate_law(),
            "split reversible reaction"
        );
        self.split.push((reaction.ident().to_owned(), fwd_ident, rev_ident));
        Ok(Replacement::Replace(vec![forward.into(), reverse.into()]))
    }

    /// apply checks every reversible rate law can be split before
    /// touching the model, then moves the local parameters of those
    /// reactions into the model's scope and splits them.
    fn apply(&mut self, model: &mut Model) -> Result<()> {
        self.max_exponent = model.analysis_options().max_expand_exponent;
        self.taken.clear();
        self.split.clear();

        let reversible: Vec<Ident> = model
            .all_reactions()
            .filter(|reaction| reaction.reversible)
            .map(|reaction| reaction.ident().to_owned())
            .collect();
        for reaction in model.all_reactions().filter(|reaction| reaction.reversible) {
            self.split_rate(reaction)?;
        }
        if reversible.is_empty() {
            return Ok(());
        }

        LocalParameterMover::for_reactions(reversible).apply(model)?;
        run_pass(self, model)
    }
}
