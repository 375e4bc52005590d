// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashSet;

use tracing::debug;

use crate::common::Result;
use crate::definition::Definition;
use crate::model::Model;
use crate::model_err;

/// What a pass wants done with one definition of the root scope.
#[derive(Debug)]
pub enum Replacement {
    Keep,
    Remove,
    /// Replace the definition with these, in order, at its position.
    Replace(Vec<Definition>),
}

/// Pass rewrites the model's definitions structurally.  `replace` sees
/// every root definition against the unmodified model; nothing changes
/// until all replacements are known, so a pass never observes its own
/// edits.
pub trait Pass {
    fn replace(&mut self, def: &Definition, model: &Model) -> Result<Replacement>;

    fn apply(&mut self, model: &mut Model) -> Result<()>
    where
        Self: Sized,
    {
        run_pass(self, model)
    }
}

/// run_pass collects a replacement for every root definition, checks
/// the result has no duplicate identifiers, and only then rebuilds the
/// root scope and side lists.  On error the model is unchanged.
pub fn run_pass<P: Pass + ?Sized>(pass: &mut P, model: &mut Model) -> Result<()> {
    let mut table: Vec<Replacement> = Vec::with_capacity(model.len());
    for def in model.definitions() {
        table.push(pass.replace(def, model)?);
    }

    if table.iter().all(|r| matches!(r, Replacement::Keep)) {
        return Ok(());
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(model.len());
    for (def, replacement) in model.definitions().zip(table.iter()) {
        let idents: Vec<&str> = match replacement {
            Replacement::Keep => vec![def.ident()],
            Replacement::Remove => vec![],
            Replacement::Replace(defs) => defs.iter().map(Definition::ident).collect(),
        };
        for ident in idents {
            if !seen.insert(ident) {
                return model_err!(DuplicateDefinition, ident.to_owned());
            }
        }
    }

    let old = model.scope_mut().take_definitions();
    let mut rebuilt = Vec::with_capacity(old.len());
    for (def, replacement) in old.into_iter().zip(table) {
        match replacement {
            Replacement::Keep => rebuilt.push(def),
            Replacement::Remove => {
                debug!(ident = def.ident(), "pass removed definition");
            }
            Replacement::Replace(defs) => {
                debug!(ident = def.ident(), count = defs.len(), "pass replaced definition");
                rebuilt.extend(defs);
            }
        }
    }
    model.scope_mut().rebuild(rebuilt)?;
    model.reindex();
    Ok(())
}
