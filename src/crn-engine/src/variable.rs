// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::{Expr, Symbol};
use crate::common::{Ident, Result, check_ident};
use crate::node::{Named, Node, NodeKind};
use crate::units::Unit;

/// A rule attached to a variable: either its value (assignment) or its
/// time derivative (rate).
#[derive(Clone, Debug, PartialEq)]
pub enum Rule {
    Assignment(Expr),
    Rate(Expr),
}

impl Rule {
    pub fn expr(&self) -> &Expr {
        match self {
            Rule::Assignment(expr) | Rule::Rate(expr) => expr,
        }
    }

    pub fn expr_mut(&mut self) -> &mut Expr {
        match self {
            Rule::Assignment(expr) | Rule::Rate(expr) => expr,
        }
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self, Rule::Assignment(_))
    }

    pub fn is_rate(&self) -> bool {
        matches!(self, Rule::Rate(_))
    }
}

impl Node for Rule {
    fn node_kind(&self) -> NodeKind {
        match self {
            Rule::Assignment(_) => NodeKind::AssignmentRule,
            Rule::Rate(_) => NodeKind::RateRule,
        }
    }
}

/// VariableDefinition is the part shared by every definition that
/// owns a symbol.  The kind is fixed by the constructor of the
/// enclosing type.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDefinition {
    kind: NodeKind,
    ident: Ident,
    symbol: Symbol,
    pub name: Option<String>,
    pub initial_value: Option<Expr>,
    pub rule: Option<Rule>,
    pub constant: bool,
    /// None means the unit derives from the model's default units.
    pub unit: Option<Unit>,
}

impl VariableDefinition {
    fn new(kind: NodeKind, ident: &str) -> Result<Self> {
        check_ident(ident)?;
        Ok(VariableDefinition {
            kind,
            ident: ident.to_owned(),
            symbol: Symbol::new(ident),
            name: None,
            initial_value: None,
            rule: None,
            constant: false,
            unit: None,
        })
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub(crate) fn set_ident(&mut self, ident: &str) -> Result<()> {
        check_ident(ident)?;
        self.ident = ident.to_owned();
        Ok(())
    }

    pub(crate) fn set_symbol(&mut self, symbol: Symbol) {
        self.symbol = symbol;
    }

    pub fn has_assignment_rule(&self) -> bool {
        self.rule.as_ref().is_some_and(Rule::is_assignment)
    }

    pub fn has_rate_rule(&self) -> bool {
        self.rule.as_ref().is_some_and(Rule::is_rate)
    }

    /// for_each_expr visits the initial value and the rule body.
    pub fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        if let Some(value) = &self.initial_value {
            f(value);
        }
        if let Some(rule) = &self.rule {
            f(rule.expr());
        }
    }

    pub fn for_each_expr_mut(&mut self, f: &mut impl FnMut(&mut Expr)) {
        if let Some(value) = &mut self.initial_value {
            f(value);
        }
        if let Some(rule) = &mut self.rule {
            f(rule.expr_mut());
        }
    }
}

impl Node for VariableDefinition {
    fn node_kind(&self) -> NodeKind {
        self.kind
    }
}

impl Named for VariableDefinition {
    fn ident(&self) -> &str {
        &self.ident
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

macro_rules! variable_builders {
    () => {
        pub fn with_name(mut self, name: &str) -> Self {
            self.var.name = Some(name.to_owned());
            self
        }

        pub fn with_value(mut self, value: Expr) -> Self {
            self.var.initial_value = Some(value);
            self
        }

        pub fn with_rule(mut self, rule: Rule) -> Self {
            self.var.rule = Some(rule);
            self
        }

        pub fn with_unit(mut self, unit: Unit) -> Self {
            self.var.unit = Some(unit);
            self
        }

        pub fn constant(mut self, constant: bool) -> Self {
            self.var.constant = constant;
            self
        }

        pub fn ident(&self) -> &str {
            self.var.ident()
        }

        pub fn symbol(&self) -> &Symbol {
            self.var.symbol()
        }
    };
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub var: VariableDefinition,
}

impl Parameter {
    pub fn new(ident: &str) -> Result<Self> {
        Ok(Parameter {
            var: VariableDefinition::new(NodeKind::Parameter, ident)?,
        })
    }

    variable_builders!();
}

#[derive(Clone, Debug, PartialEq)]
pub struct Compartment {
    pub var: VariableDefinition,
    /// 0 to 3.
    pub spatial_dimension: u8,
    /// The enclosing compartment, if any.
    pub outside: Option<Symbol>,
}

impl Compartment {
    pub fn new(ident: &str) -> Result<Self> {
        Ok(Compartment {
            var: VariableDefinition::new(NodeKind::Compartment, ident)?,
            spatial_dimension: 3,
            outside: None,
        })
    }

    /// Dimensions above 3 are clamped to 3.
    pub fn with_spatial_dimension(mut self, spatial_dimension: u8) -> Self {
        self.spatial_dimension = spatial_dimension.min(3);
        self
    }

    pub fn with_outside(mut self, outside: &Symbol) -> Self {
        self.outside = Some(outside.clone());
        self
    }

    variable_builders!();
}

#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    pub var: VariableDefinition,
    pub compartment: Symbol,
    /// The species' symbol denotes an amount instead of a concentration.
    pub only_substance_units: bool,
    /// Reactions don't change boundary species.
    pub boundary_condition: bool,
}

impl Species {
    pub fn new(ident: &str, compartment: &Symbol) -> Result<Self> {
        Ok(Species {
            var: VariableDefinition::new(NodeKind::Species, ident)?,
            compartment: compartment.clone(),
            only_substance_units: false,
            boundary_condition: false,
        })
    }

    pub fn with_only_substance_units(mut self, only_substance_units: bool) -> Self {
        self.only_substance_units = only_substance_units;
        self
    }

    pub fn with_boundary_condition(mut self, boundary_condition: bool) -> Self {
        self.boundary_condition = boundary_condition;
        self
    }

    variable_builders!();
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionArgument {
    pub var: VariableDefinition,
}

impl FunctionArgument {
    pub fn new(ident: &str) -> Result<Self> {
        Ok(FunctionArgument {
            var: VariableDefinition::new(NodeKind::FunctionArgument, ident)?,
        })
    }

    pub fn ident(&self) -> &str {
        self.var.ident()
    }

    pub fn symbol(&self) -> &Symbol {
        self.var.symbol()
    }
}

#[test]
fn test_variable_construction() {
    use crate::common::ErrorCode;
    use crate::units::BaseUnit;

    let cell = Compartment::new("cell").unwrap().with_spatial_dimension(7);
    assert_eq!(3, cell.spatial_dimension);
    assert_eq!(NodeKind::Compartment, cell.var.node_kind());

    let a = Species::new("A", cell.symbol())
        .unwrap()
        .with_value(Expr::num(10.0))
        .with_unit(Unit::from(BaseUnit::Mole))
        .with_name("species A");
    assert_eq!("A", a.ident());
    assert_eq!("A", a.symbol().name());
    assert_eq!(Some("species A"), Named::name(&a.var));
    assert_eq!(cell.symbol(), &a.compartment);
    assert_eq!(Some(Expr::num(10.0)), a.var.initial_value);

    let b = Species::new("A", cell.symbol()).unwrap();
    assert_ne!(a.symbol(), b.symbol());

    let err = Parameter::new("2k").unwrap_err();
    assert_eq!(ErrorCode::InvalidIdentifier, err.code);

    let p = Parameter::new("k")
        .unwrap()
        .with_rule(Rule::Assignment(Expr::num(1.0)));
    assert!(p.var.has_assignment_rule());
    assert!(!p.var.has_rate_rule());
    assert_eq!(
        NodeKind::AssignmentRule,
        p.var.rule.as_ref().unwrap().node_kind()
    );
}
