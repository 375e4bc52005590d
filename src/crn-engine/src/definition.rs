// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::Symbol;
use crate::common::{Ident, Result, check_ident};
use crate::function::FunctionDefinition;
use crate::internal_err;
use crate::node::{Named, Node, NodeKind, NodeRef};
use crate::reaction::Reaction;
use crate::scope::Scope;
use crate::units::Unit;
use crate::variable::{Compartment, FunctionArgument, Parameter, Species, VariableDefinition};

/// Binds an identifier to a unit so definitions can refer to it by
/// name.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitDefinition {
    ident: Ident,
    pub name: Option<String>,
    pub unit: Unit,
}

impl UnitDefinition {
    pub fn new(ident: &str, unit: Unit) -> Result<Self> {
        check_ident(ident)?;
        Ok(UnitDefinition {
            ident: ident.to_owned(),
            name: None,
            unit,
        })
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }
}

impl Node for UnitDefinition {
    fn node_kind(&self) -> NodeKind {
        NodeKind::UnitDefinition
    }
}

impl Named for UnitDefinition {
    fn ident(&self) -> &str {
        &self.ident
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Definition is anything a scope can own.
#[derive(Clone, Debug, PartialEq)]
pub enum Definition {
    Parameter(Parameter),
    Compartment(Compartment),
    Species(Species),
    FunctionArgument(FunctionArgument),
    FunctionDefinition(FunctionDefinition),
    Reaction(Reaction),
    UnitDefinition(UnitDefinition),
}

impl Definition {
    pub fn ident(&self) -> &str {
        self.as_named().ident()
    }

    pub fn name(&self) -> Option<&str> {
        self.as_named().name()
    }

    fn as_named(&self) -> &dyn Named {
        match self {
            Definition::Parameter(param) => &param.var,
            Definition::Compartment(compartment) => &compartment.var,
            Definition::Species(species) => &species.var,
            Definition::FunctionArgument(arg) => &arg.var,
            Definition::FunctionDefinition(func) => func,
            Definition::Reaction(reaction) => reaction,
            Definition::UnitDefinition(unit) => unit,
        }
    }

    pub(crate) fn set_ident(&mut self, ident: &str) -> Result<()> {
        if let Definition::Reaction(reaction) = self {
            return reaction.set_ident(ident);
        }
        let current = self.ident().to_owned();
        match self.as_variable_mut() {
            Some(var) => var.set_ident(ident),
            None => internal_err!(format!("can't rename {current}")),
        }
    }

    pub fn as_node(&self) -> NodeRef<'_> {
        match self {
            Definition::Parameter(param) => NodeRef::Parameter(param),
            Definition::Compartment(compartment) => NodeRef::Compartment(compartment),
            Definition::Species(species) => NodeRef::Species(species),
            Definition::FunctionArgument(arg) => NodeRef::FunctionArgument(arg),
            Definition::FunctionDefinition(func) => NodeRef::FunctionDefinition(func),
            Definition::Reaction(reaction) => NodeRef::Reaction(reaction),
            Definition::UnitDefinition(unit) => NodeRef::UnitDefinition(unit),
        }
    }

    pub fn as_variable(&self) -> Option<&VariableDefinition> {
        match self {
            Definition::Parameter(param) => Some(&param.var),
            Definition::Compartment(compartment) => Some(&compartment.var),
            Definition::Species(species) => Some(&species.var),
            Definition::FunctionArgument(arg) => Some(&arg.var),
            Definition::FunctionDefinition(_)
            | Definition::Reaction(_)
            | Definition::UnitDefinition(_) => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut VariableDefinition> {
        match self {
            Definition::Parameter(param) => Some(&mut param.var),
            Definition::Compartment(compartment) => Some(&mut compartment.var),
            Definition::Species(species) => Some(&mut species.var),
            Definition::FunctionArgument(arg) => Some(&mut arg.var),
            Definition::FunctionDefinition(_)
            | Definition::Reaction(_)
            | Definition::UnitDefinition(_) => None,
        }
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        self.as_variable().map(VariableDefinition::symbol)
    }

    /// scope returns the nested scope this definition owns, if any.
    pub fn scope(&self) -> Option<&Scope> {
        match self {
            Definition::FunctionDefinition(func) => Some(func.scope()),
            Definition::Reaction(reaction) => Some(reaction.kinetic_law().scope()),
            _ => None,
        }
    }

    pub(crate) fn scope_mut(&mut self) -> Option<&mut Scope> {
        match self {
            Definition::FunctionDefinition(func) => Some(func.scope_mut()),
            Definition::Reaction(reaction) => Some(reaction.kinetic_law_mut().scope_mut()),
            _ => None,
        }
    }

    pub fn as_parameter(&self) -> Option<&Parameter> {
        match self {
            Definition::Parameter(param) => Some(param),
            _ => None,
        }
    }

    pub fn as_compartment(&self) -> Option<&Compartment> {
        match self {
            Definition::Compartment(compartment) => Some(compartment),
            _ => None,
        }
    }

    pub fn as_species(&self) -> Option<&Species> {
        match self {
            Definition::Species(species) => Some(species),
            _ => None,
        }
    }

    pub fn as_function_argument(&self) -> Option<&FunctionArgument> {
        match self {
            Definition::FunctionArgument(arg) => Some(arg),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDefinition> {
        match self {
            Definition::FunctionDefinition(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_reaction(&self) -> Option<&Reaction> {
        match self {
            Definition::Reaction(reaction) => Some(reaction),
            _ => None,
        }
    }

    pub fn as_unit_definition(&self) -> Option<&UnitDefinition> {
        match self {
            Definition::UnitDefinition(unit) => Some(unit),
            _ => None,
        }
    }
}

impl Node for Definition {
    fn node_kind(&self) -> NodeKind {
        self.as_node().node_kind()
    }
}

impl From<Parameter> for Definition {
    fn from(param: Parameter) -> Self {
        Definition::Parameter(param)
    }
}

impl From<Compartment> for Definition {
    fn from(compartment: Compartment) -> Self {
        Definition::Compartment(compartment)
    }
}

impl From<Species> for Definition {
    fn from(species: Species) -> Self {
        Definition::Species(species)
    }
}

impl From<FunctionDefinition> for Definition {
    fn from(func: FunctionDefinition) -> Self {
        Definition::FunctionDefinition(func)
    }
}

impl From<Reaction> for Definition {
    fn from(reaction: Reaction) -> Self {
        Definition::Reaction(reaction)
    }
}

impl From<UnitDefinition> for Definition {
    fn from(unit: UnitDefinition) -> Self {
        Definition::UnitDefinition(unit)
    }
}

#[test]
fn test_definition_accessors() {
    use crate::ast::Expr;
    use crate::units::BaseUnit;

    let cell = Compartment::new("cell").unwrap();
    let cell_sym = cell.symbol().clone();
    let defs: Vec<Definition> = vec![
        cell.into(),
        Species::new("A", &cell_sym).unwrap().into(),
        Reaction::new("r1", Expr::num(1.0)).unwrap().into(),
        UnitDefinition::new("mM", Unit::from(BaseUnit::Mole))
            .unwrap()
            .into(),
    ];
    let kinds: Vec<NodeKind> = defs.iter().map(|d| d.node_kind()).collect();
    assert_eq!(
        vec![
            NodeKind::Compartment,
            NodeKind::Species,
            NodeKind::Reaction,
            NodeKind::UnitDefinition
        ],
        kinds
    );
    assert_eq!(Some(&cell_sym), defs[0].symbol());
    assert!(defs[2].symbol().is_none());
    assert!(defs[2].scope().is_some());
    assert!(defs[1].scope().is_none());
    assert_eq!("mM", defs[3].ident());
    assert!(defs[1].as_species().is_some());
    assert!(defs[1].as_parameter().is_none());
}
