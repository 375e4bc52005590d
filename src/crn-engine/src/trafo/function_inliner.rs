// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;

use crate::ast::Expr;
use crate::common::{Error, ErrorCode, ErrorKind, Ident, Result};
use crate::function::FunctionDefinition;
use crate::model::Model;
use crate::trafo::{Traversal, walk_model};

// deeper nesting than this is taken to be recursion
const MAX_DEPTH: usize = 64;

/// FunctionInliner replaces calls of user-defined functions with the
/// function's body, actual arguments substituted for formal ones.
/// Function definitions are kept.
#[derive(Debug, Default)]
pub struct FunctionInliner {
    functions: HashMap<Ident, FunctionDefinition>,
    inlined: usize,
}

impl FunctionInliner {
    pub fn new() -> Self {
        FunctionInliner::default()
    }

    /// inlined returns the number of call sites replaced by the last
    /// `apply`.
    pub fn inlined(&self) -> usize {
        self.inlined
    }

    fn inline(&self, expr: &mut Expr, depth: usize, count: &mut usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::new(
                ErrorKind::Transform,
                ErrorCode::UnsupportedModelFeature,
                Some("recursive function definition".to_owned()),
            ));
        }
        let mut error: Option<Error> = None;
        expr.rewrite_calls(&mut |name, args| {
            if error.is_some() {
                return None;
            }
            let func = match self.functions.get(name) {
                Some(func) => func,
                None => {
                    error = Some(Error::new(
                        ErrorKind::Model,
                        ErrorCode::UndefinedSymbol,
                        Some(name.to_owned()),
                    ));
                    return None;
                }
            };
            let body = func
                .instantiate(args)
                .and_then(|mut body| self.inline(&mut body, depth + 1, count).map(|_| body));
            match body {
                Ok(body) => {
                    *count += 1;
                    Some(body)
                }
                Err(err) => {
                    error = Some(err);
                    None
                }
            }
        });
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Traversal for FunctionInliner {
    fn visit_model(&mut self, model: &mut Model) -> Result<()> {
        self.functions = model
            .definitions()
            .filter_map(|def| def.as_function())
            .map(|func| (func.ident().to_owned(), func.clone()))
            .collect();
        self.inlined = 0;
        walk_model(self, model)
    }

    fn visit_function_definition(&mut self, _func: &mut FunctionDefinition) -> Result<()> {
        Ok(())
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        if !expr.has_calls() {
            return Ok(());
        }
        let mut count = 0;
        self.inline(expr, 0, &mut count)?;
        self.inlined += count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{mass_action_model, var};

    fn mm_model() -> Model {
        let mut model = mass_action_model();
        let mm = FunctionDefinition::new("mm", &["vmax", "km", "s"]).unwrap();
        let (vmax, km, s) = (
            Expr::sym(mm.arg("vmax").unwrap()),
            Expr::sym(mm.arg("km").unwrap()),
            Expr::sym(mm.arg("s").unwrap()),
        );
        let body = vmax * s.clone() / (km + s);
        model.add_definition(mm.with_body(body));
        model
    }

    #[test]
    fn test_inlines_call() {
        let mut model = mm_model();
        let (k1, a) = (var(&model, "k1"), var(&model, "A"));
        let call = Expr::Call("mm".to_owned(), vec![k1.clone(), Expr::num(2.0), a.clone()]);
        model.get_reaction_mut("r1").unwrap().kinetic_law_mut().rate_law = call;

        let mut inliner = FunctionInliner::new();
        inliner.apply(&mut model).unwrap();
        assert_eq!(1, inliner.inlined());
        assert_eq!(
            &(k1 * a.clone() / (Expr::num(2.0) + a)),
            model.get_reaction("r1").unwrap().rate_law()
        );
        assert!(model.get_function("mm").is_some());
    }

    #[test]
    fn test_nested_calls() {
        let mut model = mm_model();
        let twice = FunctionDefinition::new("twice", &["x"]).unwrap();
        let x = Expr::sym(twice.arg("x").unwrap());
        let body = Expr::Call("mm".to_owned(), vec![x.clone(), Expr::num(1.0), x]) * Expr::num(2.0);
        model.add_definition(twice.with_body(body));

        let a = var(&model, "A");
        let call = Expr::Call("twice".to_owned(), vec![a.clone()]);
        model.get_reaction_mut("r1").unwrap().kinetic_law_mut().rate_law = call;

        let mut inliner = FunctionInliner::new();
        inliner.apply(&mut model).unwrap();
        assert_eq!(2, inliner.inlined());
        let expected = a.clone() * a.clone() / (Expr::num(1.0) + a) * Expr::num(2.0);
        assert_eq!(&expected, model.get_reaction("r1").unwrap().rate_law());
    }

    #[test]
    fn test_errors() {
        let mut model = mm_model();
        let a = var(&model, "A");
        model.get_reaction_mut("r1").unwrap().kinetic_law_mut().rate_law =
            Expr::Call("nope".to_owned(), vec![a.clone()]);
        let err = FunctionInliner::new().apply(&mut model).unwrap_err();
        assert_eq!(ErrorCode::UndefinedSymbol, err.code);

        model.get_reaction_mut("r1").unwrap().kinetic_law_mut().rate_law =
            Expr::Call("mm".to_owned(), vec![a]);
        let err = FunctionInliner::new().apply(&mut model).unwrap_err();
        assert_eq!(ErrorCode::Generic, err.code);

        let rec = FunctionDefinition::new("rec", &["x"]).unwrap();
        let x = Expr::sym(rec.arg("x").unwrap());
        model.add_definition(rec.with_body(Expr::Call("rec".to_owned(), vec![x])));
        model.get_reaction_mut("r1").unwrap().kinetic_law_mut().rate_law =
            Expr::Call("rec".to_owned(), vec![Expr::num(1.0)]);
        let err = FunctionInliner::new().apply(&mut model).unwrap_err();
        assert_eq!(ErrorCode::UnsupportedModelFeature, err.code);
    }
}
