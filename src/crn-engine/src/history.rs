// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Undoable model edits.
//!
//! A `History` is a linear log of applied edits with a cursor.  Each
//! record keeps whatever the model held before the edit, so undoing
//! and redoing both come down to swapping that state back in.

use tracing::debug;

use crate::ast::Expr;
use crate::common::{Ident, Result};
use crate::definition::Definition;
use crate::model::{DefaultUnit, DefaultUnits, Model};
use crate::units::Unit;
use crate::variable::Rule;
use crate::{internal_err, model_err};

/// An edit a `History` can apply to a model.
#[derive(Clone, Debug)]
pub enum Edit {
    AddDefinition(Definition),
    RemoveDefinition(Ident),
    SetInitialValue { ident: Ident, value: Option<Expr> },
    SetRule { ident: Ident, rule: Option<Rule> },
    SetRateLaw { reaction: Ident, rate_law: Expr },
    SetDefaultUnit { which: DefaultUnit, unit: Unit, rescale: bool },
}

impl Edit {
    fn describe(&self) -> String {
        match self {
            Edit::AddDefinition(def) => format!("add {}", def.ident()),
            Edit::RemoveDefinition(ident) => format!("remove {ident}"),
            Edit::SetInitialValue { ident, .. } => format!("set initial value of {ident}"),
            Edit::SetRule { ident, .. } => format!("set rule of {ident}"),
            Edit::SetRateLaw { reaction, .. } => format!("set rate law of {reaction}"),
            Edit::SetDefaultUnit { which, .. } => format!("set default {which:?} unit"),
        }
    }
}

// The Option fields hold a definition while it is out of the model.
#[derive(Debug)]
enum Record {
    Added {
        ident: Ident,
        def: Option<Definition>,
    },
    Removed {
        ident: Ident,
        position: usize,
        def: Option<Definition>,
    },
    InitialValue {
        ident: Ident,
        value: Option<Expr>,
    },
    Rule {
        ident: Ident,
        rule: Option<Rule>,
    },
    RateLaw {
        reaction: Ident,
        rate_law: Expr,
    },
    DefaultUnits(DefaultUnits),
    Snapshot(Box<Model>),
}

fn rate_law_mut<'a>(model: &'a mut Model, reaction: &str) -> Result<&'a mut Expr> {
    match model.get_reaction_mut(reaction) {
        Some(reaction) => Ok(&mut reaction.kinetic_law_mut().rate_law),
        None => model_err!(DoesNotExist, reaction.to_owned()),
    }
}

impl Record {
    fn undo(&mut self, model: &mut Model) -> Result<()> {
        match self {
            Record::Added { ident, def } => {
                *def = Some(model.rem_definition(ident)?);
                Ok(())
            }
            Record::Removed { position, def, ident } => match def.take() {
                Some(removed) => model.add_definition_at(removed, *position),
                None => internal_err!(format!("{ident} is not held by the history")),
            },
            _ => self.swap(model),
        }
    }

    fn redo(&mut self, model: &mut Model) -> Result<()> {
        match self {
            Record::Added { ident, def } => match def.take() {
                Some(added) => {
                    model.add_definition(added);
                    Ok(())
                }
                None => internal_err!(format!("{ident} is not held by the history")),
            },
            Record::Removed { ident, def, .. } => {
                *def = Some(model.rem_definition(ident)?);
                Ok(())
            }
            _ => self.swap(model),
        }
    }

    fn swap(&mut self, model: &mut Model) -> Result<()> {
        match self {
            Record::InitialValue { ident, value } => {
                let var = model.get_variable_mut(ident)?;
                std::mem::swap(&mut var.initial_value, value);
            }
            Record::Rule { ident, rule } => {
                let var = model.get_variable_mut(ident)?;
                std::mem::swap(&mut var.rule, rule);
            }
            Record::RateLaw { reaction, rate_law } => {
                std::mem::swap(rate_law_mut(model, reaction)?, rate_law);
            }
            Record::DefaultUnits(defaults) => {
                let current = model.default_units().clone();
                model.set_default_units(std::mem::replace(defaults, current));
            }
            Record::Snapshot(snapshot) => {
                std::mem::swap(model, snapshot.as_mut());
            }
            Record::Added { .. } | Record::Removed { .. } => {
                return internal_err!("structural edits aren't swapped".to_owned());
            }
        }
        Ok(())
    }
}

/// History applies edits to a model and can take them back.  It only
/// knows about changes made through `apply`; editing the model behind
/// its back may make `undo` fail.
#[derive(Debug, Default)]
pub struct History {
    records: Vec<Record>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.records.len()
    }

    /// len is the number of edits that can be undone.
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.cursor = 0;
    }

    /// apply performs `edit` on `model` and records it, dropping any
    /// edits that were undone.  A failed edit leaves both the model and
    /// the history as they were.
    pub fn apply(&mut self, model: &mut Model, edit: Edit) -> Result<()> {
        let description = edit.describe();
        let record = match edit {
            Edit::AddDefinition(def) => {
                let ident = def.ident().to_owned();
                if model.has_definition(&ident) {
                    return model_err!(DuplicateDefinition, ident);
                }
                model.add_definition(def);
                Record::Added { ident, def: None }
            }
            Edit::RemoveDefinition(ident) => {
                let position = match model.scope().position(&ident) {
                    Some(position) => position,
                    None => return model_err!(DoesNotExist, ident),
                };
                let def = model.rem_definition(&ident)?;
                Record::Removed {
                    ident,
                    position,
                    def: Some(def),
                }
            }
            Edit::SetInitialValue { ident, value } => {
                let var = model.get_variable_mut(&ident)?;
                let value = std::mem::replace(&mut var.initial_value, value);
                Record::InitialValue { ident, value }
            }
            Edit::SetRule { ident, rule } => {
                let var = model.get_variable_mut(&ident)?;
                let rule = std::mem::replace(&mut var.rule, rule);
                Record::Rule { ident, rule }
            }
            Edit::SetRateLaw { reaction, rate_law } => {
                let rate_law = std::mem::replace(rate_law_mut(model, &reaction)?, rate_law);
                Record::RateLaw { reaction, rate_law }
            }
            Edit::SetDefaultUnit {
                which,
                unit,
                rescale: true,
            } => {
                let snapshot = model.clone();
                model.set_default_unit(which, unit, true)?;
                Record::Snapshot(Box::new(snapshot))
            }
            Edit::SetDefaultUnit {
                which,
                unit,
                rescale: false,
            } => {
                let previous = model.default_units().clone();
                model.set_default_unit(which, unit, false)?;
                Record::DefaultUnits(previous)
            }
        };
        debug!(edit = %description, "applied edit");
        self.records.truncate(self.cursor);
        self.records.push(record);
        self.cursor += 1;
        Ok(())
    }

    /// undo reverts the most recent applied edit.
    pub fn undo(&mut self, model: &mut Model) -> Result<()> {
        if self.cursor == 0 {
            return model_err!(NothingToUndo);
        }
        self.records[self.cursor - 1].undo(model)?;
        self.cursor -= 1;
        debug!(remaining = self.cursor, "undid edit");
        Ok(())
    }

    /// redo re-applies the most recently undone edit.
    pub fn redo(&mut self, model: &mut Model) -> Result<()> {
        if self.cursor == self.records.len() {
            return model_err!(NothingToRedo);
        }
        self.records[self.cursor].redo(model)?;
        self.cursor += 1;
        debug!(applied = self.cursor, "redid edit");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::testutils::{mass_action_model, sym, var, x_param, x_species};
    use crate::units::{BaseUnit, ScaledBaseUnit};

    #[test]
    fn test_empty_history() {
        let mut model = mass_action_model();
        let mut history = History::new();
        assert_eq!(ErrorCode::NothingToUndo, history.undo(&mut model).unwrap_err().code);
        assert_eq!(ErrorCode::NothingToRedo, history.redo(&mut model).unwrap_err().code);
        assert!(!history.can_undo() && !history.can_redo());
    }

    #[test]
    fn test_undo_redo_restores_models() {
        let mut model = mass_action_model();
        let original = model.clone();
        let mut history = History::new();

        let cell = sym(&model, "cell");
        let rate = var(&model, "k1") * var(&model, "A") * Expr::num(2.0);
        let edits = vec![
            Edit::AddDefinition(x_species("C", &cell, 3.0).into()),
            Edit::SetInitialValue {
                ident: "A".to_owned(),
                value: Some(Expr::num(20.0)),
            },
            Edit::SetRule {
                ident: "B".to_owned(),
                rule: Some(Rule::Assignment(var(&model, "A"))),
            },
            Edit::SetRateLaw {
                reaction: "r1".to_owned(),
                rate_law: rate,
            },
            Edit::RemoveDefinition("k1".to_owned()),
        ];
        let mut states = vec![model.clone()];
        for edit in edits {
            history.apply(&mut model, edit).unwrap();
            states.push(model.clone());
        }
        assert_eq!(5, history.len());

        for expected in states.iter().rev().skip(1) {
            history.undo(&mut model).unwrap();
            assert_eq!(expected, &model);
        }
        assert_eq!(original, model);
        // k1 went back to its old position
        assert_eq!(Some(3), model.scope().position("k1"));
        assert_eq!(Some(0), model.parameter_index("k1"));

        for expected in states.iter().skip(1) {
            history.redo(&mut model).unwrap();
            assert_eq!(expected, &model);
        }
        assert!(!history.can_redo());
    }

    #[test]
    fn test_apply_truncates_redo() {
        let mut model = mass_action_model();
        let mut history = History::new();
        history
            .apply(&mut model, Edit::AddDefinition(x_param("k2", 1.0).into()))
            .unwrap();
        history.undo(&mut model).unwrap();
        assert!(history.can_redo());
        history
            .apply(&mut model, Edit::AddDefinition(x_param("k3", 1.0).into()))
            .unwrap();
        assert!(!history.can_redo());
        assert!(!model.has_definition("k2"));
        assert!(model.has_definition("k3"));
    }

    #[test]
    fn test_failed_edits_are_not_recorded() {
        let mut model = mass_action_model();
        let before = model.clone();
        let mut history = History::new();

        let err = history
            .apply(&mut model, Edit::AddDefinition(x_param("k1", 1.0).into()))
            .unwrap_err();
        assert_eq!(ErrorCode::DuplicateDefinition, err.code);
        let err = history
            .apply(&mut model, Edit::RemoveDefinition("nope".to_owned()))
            .unwrap_err();
        assert_eq!(ErrorCode::DoesNotExist, err.code);
        let err = history
            .apply(
                &mut model,
                Edit::SetDefaultUnit {
                    which: DefaultUnit::Substance,
                    unit: Unit::from(BaseUnit::Second),
                    rescale: false,
                },
            )
            .unwrap_err();
        assert_eq!(ErrorCode::IncompatibleUnits, err.code);

        assert!(history.is_empty());
        assert_eq!(before, model);
    }

    #[test]
    fn test_rescaling_default_unit() {
        let mut model = mass_action_model();
        let before = model.clone();
        let mut history = History::new();
        let mmol = Unit::from(ScaledBaseUnit::new(BaseUnit::Mole, 1.0, -3, 1));
        history
            .apply(
                &mut model,
                Edit::SetDefaultUnit {
                    which: DefaultUnit::Substance,
                    unit: mmol.clone(),
                    rescale: true,
                },
            )
            .unwrap();
        let rescaled = model.clone();
        assert_eq!(&mmol, model.default_substance_unit());
        assert_eq!(
            Some(10_000.0),
            model.get_variable("A").unwrap().initial_value.as_ref().and_then(Expr::eval_const)
        );

        history.undo(&mut model).unwrap();
        assert_eq!(before, model);
        history.redo(&mut model).unwrap();
        assert_eq!(rescaled, model);
    }

    #[test]
    fn test_default_unit_without_rescale() {
        let mut model = mass_action_model();
        let mut history = History::new();
        let minute = Unit::from(ScaledBaseUnit::new(BaseUnit::Second, 60.0, 0, 1));
        history
            .apply(
                &mut model,
                Edit::SetDefaultUnit {
                    which: DefaultUnit::Time,
                    unit: minute.clone(),
                    rescale: false,
                },
            )
            .unwrap();
        assert_eq!(&minute, model.default_time_unit());
        assert_eq!(
            Some(10.0),
            model.get_variable("A").unwrap().initial_value.as_ref().and_then(Expr::eval_const)
        );
        history.undo(&mut model).unwrap();
        assert_eq!(&Unit::from(BaseUnit::Second), model.default_time_unit());
    }
}
