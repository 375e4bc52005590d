// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashSet;

use tracing::debug;

use crate::common::{Ident, Result};
use crate::definition::Definition;
use crate::model::Model;
use crate::trafo::{Pass, Replacement};

/// LocalParameterMover moves kinetic-law local parameters into the
/// model's scope, each just before its reaction.  Parameters keep their
/// symbols, so rate laws stay valid; identifiers are made unique with
/// `Scope::get_new_identifier`.
#[derive(Debug, Default)]
pub struct LocalParameterMover {
    only: Option<HashSet<Ident>>,
    taken: HashSet<Ident>,
    moved: Vec<(Ident, Ident)>,
}

impl LocalParameterMover {
    pub fn new() -> Self {
        LocalParameterMover::default()
    }

    /// for_reactions restricts the mover to the named reactions.
    pub fn for_reactions<I: IntoIterator<Item = Ident>>(reactions: I) -> Self {
        LocalParameterMover {
            only: Some(reactions.into_iter().collect()),
            ..LocalParameterMover::default()
        }
    }

    /// moved lists `(reaction, new global identifier)` pairs from the
    /// last `apply`.
    pub fn moved(&self) -> &[(Ident, Ident)] {
        &self.moved
    }
}

impl Pass for LocalParameterMover {
    fn replace(&mut self, def: &Definition, model: &Model) -> Result<Replacement> {
        let reaction = match def.as_reaction() {
            Some(reaction) if !reaction.kinetic_law().scope().is_empty() => reaction,
            _ => return Ok(Replacement::Keep),
        };
        if let Some(only) = &self.only {
            if !only.contains(reaction.ident()) {
                return Ok(Replacement::Keep);
            }
        }

        let mut reaction = reaction.clone();
        let locals = reaction.kinetic_law_mut().scope_mut().take_definitions();
        let mut defs: Vec<Definition> = Vec::with_capacity(locals.len() + 1);
        for mut local in locals {
            let ident = model
                .scope()
                .get_new_identifier_with(local.ident(), |ident| self.taken.contains(ident));
            debug!(reaction = reaction.ident(), from = local.ident(), to = %ident, "moving local parameter");
            local.set_ident(&ident)?;
            self.taken.insert(ident.clone());
            self.moved.push((reaction.ident().to_owned(), ident));
            defs.push(local);
        }
        defs.push(reaction.into());
        Ok(Replacement::Replace(defs))
    }

    fn apply(&mut self, model: &mut Model) -> Result<()> {
        self.taken.clear();
        self.moved.clear();
        crate::trafo::pass::run_pass(self, model)
    }
}
