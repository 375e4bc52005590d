// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::Symbol;
use crate::common::{Ident, Result};
use crate::definition::Definition;
use crate::model_err;
use crate::variable::VariableDefinition;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// ScopeId is a non-owning handle to a scope, resolved through a
/// `ScopeLookup` (the model that owns the scope).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    fn next() -> ScopeId {
        ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// ScopeLookup resolves parent handles during identifier resolution.
pub trait ScopeLookup {
    fn scope(&self, id: ScopeId) -> Option<&Scope>;
}

/// Scope owns definitions by identifier, in insertion order, and
/// indexes the symbols of the variables among them.
#[derive(Clone, Debug)]
pub struct Scope {
    id: ScopeId,
    parent: Option<ScopeId>,
    closed: bool,
    definitions: IndexMap<Ident, Definition>,
    symbols: HashMap<Symbol, Ident>,
}

impl PartialEq for Scope {
    // ids are handles, not content
    fn eq(&self, other: &Self) -> bool {
        self.closed == other.closed
            && self.definitions.len() == other.definitions.len()
            && self
                .definitions
                .iter()
                .zip(other.definitions.iter())
                .all(|(a, b)| a == b)
    }
}

impl Scope {
    pub fn new(parent: Option<ScopeId>, closed: bool) -> Self {
        Scope {
            id: ScopeId::next(),
            parent,
            closed,
            definitions: IndexMap::new(),
            symbols: HashMap::new(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ScopeId>) {
        self.parent = parent;
    }

    pub(crate) fn renew_id(&mut self) {
        self.id = ScopeId::next();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn adopt(&mut self, def: &mut Definition) {
        let id = self.id;
        if let Some(child) = def.scope_mut() {
            child.set_parent(Some(id));
        }
        if let Some(sym) = def.symbol() {
            self.symbols.insert(sym.clone(), def.ident().to_owned());
        }
    }

    fn unindex(&mut self, def: &Definition) {
        if let Some(sym) = def.symbol() {
            self.symbols.remove(sym);
        }
    }

    /// add_definition moves `def` into the scope, returning the
    /// definition it evicted, if one had the same identifier.  The
    /// new definition takes the evicted one's position.
    pub fn add_definition(&mut self, mut def: Definition) -> Option<Definition> {
        self.adopt(&mut def);
        let ident = def.ident().to_owned();
        let new_sym = def.symbol().cloned();
        let evicted = self.definitions.insert(ident.clone(), def);
        if let Some(old) = &evicted {
            debug!(ident = %ident, "evicting existing definition");
            if let Some(sym) = old.symbol() {
                if Some(sym) != new_sym.as_ref() {
                    self.symbols.remove(sym);
                }
            }
        }
        evicted
    }

    /// add_definition_after inserts `def` directly after the
    /// definition named `after`.
    pub fn add_definition_after(
        &mut self,
        mut def: Definition,
        after: &str,
    ) -> Result<Option<Definition>> {
        if !self.definitions.contains_key(after) {
            return model_err!(DoesNotExist, after.to_owned());
        }
        let ident = def.ident().to_owned();
        if ident == after {
            return Ok(self.add_definition(def));
        }
        let evicted = if self.definitions.contains_key(&ident) {
            debug!(ident = %ident, "evicting existing definition");
            Some(self.rem_definition(&ident)?)
        } else {
            None
        };
        let pos = match self.definitions.get_index_of(after) {
            Some(pos) => pos + 1,
            None => return crate::internal_err!(format!("lost '{after}'")),
        };
        self.adopt(&mut def);
        self.definitions.shift_insert(pos, ident, def);
        Ok(evicted)
    }

    /// rem_definition removes the definition and returns ownership of
    /// it.  References to its symbol elsewhere are left alone.
    pub fn rem_definition(&mut self, ident: &str) -> Result<Definition> {
        match self.definitions.shift_remove(ident) {
            Some(def) => {
                self.unindex(&def);
                Ok(def)
            }
            None => model_err!(DoesNotExist, ident.to_owned()),
        }
    }

    pub fn has_definition(&self, ident: &str) -> bool {
        self.definitions.contains_key(ident)
    }

    pub fn get_definition(&self, ident: &str) -> Option<&Definition> {
        self.definitions.get(ident)
    }

    /// get_definition_mut allows in-place edits.  Callers must not
    /// change the definition's identifier or symbol.
    pub fn get_definition_mut(&mut self, ident: &str) -> Option<&mut Definition> {
        self.definitions.get_mut(ident)
    }

    pub fn position(&self, ident: &str) -> Option<usize> {
        self.definitions.get_index_of(ident)
    }

    pub fn has_variable(&self, ident: &str) -> bool {
        self.get_definition(ident)
            .is_some_and(|def| def.as_variable().is_some())
    }

    pub fn get_variable(&self, ident: &str) -> Result<&VariableDefinition> {
        match self.get_definition(ident) {
            Some(def) => match def.as_variable() {
                Some(var) => Ok(var),
                None => model_err!(ExpectedVariable, ident.to_owned()),
            },
            None => model_err!(UndefinedSymbol, ident.to_owned()),
        }
    }

    pub fn get_variable_mut(&mut self, ident: &str) -> Result<&mut VariableDefinition> {
        match self.definitions.get_mut(ident) {
            Some(def) => match def.as_variable_mut() {
                Some(var) => Ok(var),
                None => model_err!(ExpectedVariable, ident.to_owned()),
            },
            None => model_err!(UndefinedSymbol, ident.to_owned()),
        }
    }

    pub fn has_symbol(&self, sym: &Symbol) -> bool {
        self.symbols.contains_key(sym)
    }

    pub fn ident_of(&self, sym: &Symbol) -> Option<&str> {
        self.symbols.get(sym).map(|ident| ident.as_str())
    }

    pub fn get_definition_by_symbol(&self, sym: &Symbol) -> Option<&Definition> {
        self.symbols
            .get(sym)
            .and_then(|ident| self.definitions.get(ident))
    }

    pub fn get_variable_by_symbol(&self, sym: &Symbol) -> Option<&VariableDefinition> {
        self.get_definition_by_symbol(sym)
            .and_then(Definition::as_variable)
    }

    pub fn get_variable_by_symbol_mut(&mut self, sym: &Symbol) -> Option<&mut VariableDefinition> {
        let ident = self.symbols.get(sym)?;
        self.definitions
            .get_mut(ident)
            .and_then(Definition::as_variable_mut)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    pub fn definitions_mut(&mut self) -> impl Iterator<Item = &mut Definition> {
        self.definitions.values_mut()
    }

    pub fn idents(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(|ident| ident.as_str())
    }

    /// resolve looks `ident` up here, then in enclosing scopes until a
    /// closed scope or the root is reached.
    pub fn resolve<'a>(&'a self, ident: &str, lookup: &'a dyn ScopeLookup) -> Result<&'a Definition> {
        let mut scope = self;
        loop {
            if let Some(def) = scope.get_definition(ident) {
                return Ok(def);
            }
            scope = match scope.enclosing(lookup) {
                Some(parent) => parent,
                None => return model_err!(UndefinedSymbol, ident.to_owned()),
            };
        }
    }

    pub fn resolve_symbol<'a>(
        &'a self,
        sym: &Symbol,
        lookup: &'a dyn ScopeLookup,
    ) -> Result<&'a VariableDefinition> {
        let mut scope = self;
        loop {
            if let Some(var) = scope.get_variable_by_symbol(sym) {
                return Ok(var);
            }
            scope = match scope.enclosing(lookup) {
                Some(parent) => parent,
                None => return model_err!(UndefinedSymbol, sym.name().to_owned()),
            };
        }
    }

    fn enclosing<'a>(&self, lookup: &'a dyn ScopeLookup) -> Option<&'a Scope> {
        if self.closed {
            return None;
        }
        self.parent.and_then(|parent| lookup.scope(parent))
    }

    /// get_new_identifier returns `base` if it is unused here, or else
    /// the first of `base_1`, `base_2`, ... that is.
    pub fn get_new_identifier(&self, base: &str) -> Ident {
        self.get_new_identifier_with(base, |_| false)
    }

    /// Like `get_new_identifier`, but also avoids identifiers for
    /// which `reserved` returns true.
    pub fn get_new_identifier_with(&self, base: &str, reserved: impl Fn(&str) -> bool) -> Ident {
        let taken = |ident: &str| self.has_definition(ident) || reserved(ident);
        if !taken(base) {
            return base.to_owned();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|ident| !taken(ident))
            .unwrap_or_else(|| base.to_owned())
    }

    /// rebuild replaces the scope's contents, keeping its id and
    /// parent.
    pub(crate) fn rebuild(&mut self, definitions: Vec<Definition>) -> Result<()> {
        let mut scope = Scope {
            id: self.id,
            parent: self.parent,
            closed: self.closed,
            definitions: IndexMap::with_capacity(definitions.len()),
            symbols: HashMap::new(),
        };
        for def in definitions {
            if scope.has_definition(def.ident()) {
                return model_err!(DuplicateDefinition, def.ident().to_owned());
            }
            scope.add_definition(def);
        }
        *self = scope;
        Ok(())
    }

    pub(crate) fn take_definitions(&mut self) -> Vec<Definition> {
        self.symbols.clear();
        std::mem::take(&mut self.definitions)
            .into_iter()
            .map(|(_, def)| def)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::common::ErrorCode;
    use crate::function::FunctionDefinition;
    use crate::variable::Parameter;
    use proptest::prelude::*;

    struct Scopes(Vec<Scope>);

    impl ScopeLookup for Scopes {
        fn scope(&self, id: ScopeId) -> Option<&Scope> {
            self.0.iter().find(|scope| scope.id() == id)
        }
    }

    fn param(ident: &str) -> Definition {
        Parameter::new(ident).unwrap().into()
    }

    #[test]
    fn test_add_and_evict() {
        let mut scope = Scope::new(None, false);
        assert!(scope.add_definition(param("k")).is_none());
        assert!(scope.add_definition(param("j")).is_none());
        let old_sym = scope.get_definition("k").unwrap().symbol().unwrap().clone();

        let evicted = scope.add_definition(param("k")).unwrap();
        assert_eq!(Some(&old_sym), evicted.symbol());
        assert!(!scope.has_symbol(&old_sym));
        assert_eq!(2, scope.len());
        // eviction keeps the original position
        assert_eq!(vec!["k", "j"], scope.idents().collect::<Vec<_>>());

        let new_sym = scope.get_definition("k").unwrap().symbol().unwrap().clone();
        assert_eq!(Some("k"), scope.ident_of(&new_sym));
    }

    #[test]
    fn test_add_after_and_remove() {
        let mut scope = Scope::new(None, false);
        scope.add_definition(param("a"));
        scope.add_definition(param("c"));
        scope.add_definition_after(param("b"), "a").unwrap();
        assert_eq!(vec!["a", "b", "c"], scope.idents().collect::<Vec<_>>());
        assert_eq!(Some(1), scope.position("b"));

        // moving an existing definition
        scope.add_definition_after(param("a"), "c").unwrap();
        assert_eq!(vec!["b", "c", "a"], scope.idents().collect::<Vec<_>>());

        let err = scope.add_definition_after(param("d"), "zzz").unwrap_err();
        assert_eq!(ErrorCode::DoesNotExist, err.code);

        let b = scope.rem_definition("b").unwrap();
        let b_sym = b.symbol().unwrap();
        assert!(!scope.has_symbol(b_sym));
        assert!(scope.get_variable_by_symbol(b_sym).is_none());
        assert_eq!(
            ErrorCode::DoesNotExist,
            scope.rem_definition("b").unwrap_err().code
        );
    }

    #[test]
    fn test_get_variable() {
        let mut scope = Scope::new(None, false);
        scope.add_definition(param("k"));
        scope.add_definition(FunctionDefinition::new("f", &["x"]).unwrap().into());
        assert!(scope.has_variable("k"));
        assert!(!scope.has_variable("f"));
        assert_eq!(
            ErrorCode::ExpectedVariable,
            scope.get_variable("f").unwrap_err().code
        );
        assert_eq!(
            ErrorCode::UndefinedSymbol,
            scope.get_variable("nope").unwrap_err().code
        );
        scope.get_variable_mut("k").unwrap().initial_value = Some(Expr::num(1.0));
        assert_eq!(
            Some(Expr::num(1.0)),
            scope.get_variable("k").unwrap().initial_value
        );
    }

    #[test]
    fn test_resolution_and_closedness() {
        let mut root = Scope::new(None, false);
        root.add_definition(param("k"));
        let k_sym = root.get_definition("k").unwrap().symbol().unwrap().clone();

        let mut open = Scope::new(Some(root.id()), false);
        open.add_definition(param("local"));
        let mut closed = Scope::new(Some(root.id()), true);
        closed.add_definition(param("x"));

        let scopes = Scopes(vec![root]);
        assert_eq!("k", open.resolve("k", &scopes).unwrap().ident());
        assert_eq!("local", open.resolve("local", &scopes).unwrap().ident());
        assert_eq!("k", open.resolve_symbol(&k_sym, &scopes).unwrap().ident());

        assert_eq!("x", closed.resolve("x", &scopes).unwrap().ident());
        let err = closed.resolve("k", &scopes).unwrap_err();
        assert_eq!(ErrorCode::UndefinedSymbol, err.code);
        assert!(closed.resolve_symbol(&k_sym, &scopes).is_err());

        assert!(open.resolve("nope", &scopes).is_err());
    }

    #[test]
    fn test_get_new_identifier() {
        let mut scope = Scope::new(None, false);
        assert_eq!("k", scope.get_new_identifier("k"));
        scope.add_definition(param("k"));
        assert_eq!("k_1", scope.get_new_identifier("k"));
        scope.add_definition(param("k_1"));
        assert_eq!("k_2", scope.get_new_identifier("k"));
        assert_eq!("k_3", scope.get_new_identifier_with("k", |ident| ident == "k_2"));
    }

    #[test]
    fn test_rebuild_rejects_duplicates() {
        let mut scope = Scope::new(None, false);
        scope.add_definition(param("a"));
        let id = scope.id();
        let err = scope.rebuild(vec![param("b"), param("b")]).unwrap_err();
        assert_eq!(ErrorCode::DuplicateDefinition, err.code);
        assert!(scope.has_definition("a"));

        scope.rebuild(vec![param("c")]).unwrap();
        assert_eq!(id, scope.id());
        assert_eq!(vec!["c"], scope.idents().collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn fresh_identifier_is_unused(base in "[a-z][a-z0-9]{0,3}", taken in 0usize..6) {
            let mut scope = Scope::new(None, false);
            scope.add_definition(param(&base));
            for i in 1..=taken {
                scope.add_definition(param(&format!("{base}_{i}")));
            }
            let fresh = scope.get_new_identifier(&base);
            prop_assert!(!scope.has_definition(&fresh));
            prop_assert_eq!(format!("{base}_{}", taken + 1), fresh);
        }
    }
}
