// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Conservation laws of a reaction network.
//!
//! With `S` the stoichiometry matrix (species x reactions), every
//! vector `c` with `c^T S = 0` gives a quantity `c . x` that no
//! reaction changes.  We row-reduce `S^T`; its pivot columns are the
//! independent species and each free column `f` yields the law
//!
//! ```text
//! x_f = Total_f + sum_p R[row(p), f] * x_p
//! ```
//!
//! over the pivot species `p`, where `R` is the reduced matrix.

use float_cmp::approx_eq;
use ndarray::{Array2, ArrayView2};
use tracing::info;

use crate::ast::{Expr, Symbol};
use crate::common::{Ident, Result};
use crate::model::Model;
use crate::model_err;
use crate::trafo_err;
use crate::variable::{Parameter, Rule};

#[derive(Clone, Debug)]
pub struct ConservationAnalysis {
    species: Vec<Symbol>,
    stoichiometry: Array2<f64>,
    independent: Vec<usize>,
    dependent: Vec<usize>,
    // dependent x independent
    link: Array2<f64>,
    // conservation laws x species
    conservation: Array2<f64>,
    tolerance: f64,
}

/// rref reduces `m` to reduced row echelon form in place, choosing
/// the largest remaining entry of each column as pivot, and returns
/// the pivot columns.
fn rref(m: &mut Array2<f64>, tolerance: f64) -> Vec<usize> {
    let (rows, cols) = m.dim();
    let mut pivots = Vec::with_capacity(rows.min(cols));
    let mut r = 0;
    for c in 0..cols {
        if r == rows {
            break;
        }
        let (best, magnitude) = (r..rows)
            .map(|i| (i, m[[i, c]].abs()))
            .fold((r, 0.0), |acc, cand| if cand.1 > acc.1 { cand } else { acc });
        if magnitude <= tolerance {
            for i in r..rows {
                m[[i, c]] = 0.0;
            }
            continue;
        }
        if best != r {
            for j in 0..cols {
                m.swap([r, j], [best, j]);
            }
        }
        let pivot = m[[r, c]];
        for j in 0..cols {
            m[[r, j]] /= pivot;
        }
        for i in 0..rows {
            let factor = m[[i, c]];
            if i == r || factor == 0.0 {
                continue;
            }
            for j in 0..cols {
                let v = m[[r, j]];
                m[[i, j]] -= factor * v;
            }
        }
        pivots.push(c);
        r += 1;
    }
    m.mapv_inplace(|v| if v.abs() <= tolerance { 0.0 } else { v });
    pivots
}

impl ConservationAnalysis {
    /// new analyzes `model` without changing it.  Species with a rule
    /// and boundary species are left out, since reactions don't
    /// determine them.
    pub fn new(model: &Model) -> Result<Self> {
        let tolerance = model.analysis_options().pivot_tolerance;
        let species: Vec<Symbol> = model
            .all_species()
            .filter(|s| s.var.rule.is_none() && !s.boundary_condition)
            .map(|s| s.symbol().clone())
            .collect();
        let n = species.len();
        let m = model.num_reactions();

        let mut stoichiometry = Array2::<f64>::zeros((n, m));
        for (j, reaction) in model.all_reactions().enumerate() {
            let terms = reaction
                .reactants
                .iter()
                .map(|term| (term, -1.0))
                .chain(reaction.products.iter().map(|term| (term, 1.0)));
            for ((sym, expr), sign) in terms {
                let Some(i) = species.iter().position(|s| s == sym) else {
                    continue;
                };
                let coeff = match expr.eval_const() {
                    Some(coeff) => coeff,
                    None => {
                        return trafo_err!(
                            NonConstantStoichiometry,
                            format!("{} in {}: {}", sym.name(), reaction.ident(), expr)
                        );
                    }
                };
                stoichiometry[[i, j]] += sign * coeff;
            }
        }

        let mut reduced = stoichiometry.t().to_owned();
        let independent = rref(&mut reduced, tolerance);
        let dependent: Vec<usize> = (0..n).filter(|i| !independent.contains(i)).collect();

        let mut link = Array2::<f64>::zeros((dependent.len(), independent.len()));
        let mut conservation = Array2::<f64>::zeros((dependent.len(), n));
        for (d, &f) in dependent.iter().enumerate() {
            conservation[[d, f]] = 1.0;
            for (k, &p) in independent.iter().enumerate() {
                link[[d, k]] = reduced[[k, f]];
                conservation[[d, p]] = -reduced[[k, f]];
            }
        }

        Ok(ConservationAnalysis {
            species,
            stoichiometry,
            independent,
            dependent,
            link,
            conservation,
            tolerance,
        })
    }

    /// species returns the analyzed species, in matrix row order.
    pub fn species(&self) -> &[Symbol] {
        &self.species
    }

    pub fn stoichiometry_matrix(&self) -> ArrayView2<'_, f64> {
        self.stoichiometry.view()
    }

    /// conservation_matrix has one row per conservation law and one
    /// column per analyzed species.
    pub fn conservation_matrix(&self) -> ArrayView2<'_, f64> {
        self.conservation.view()
    }

    /// link_matrix `L` expresses dependent species through independent
    /// ones: `x_dep = totals + L x_indep`.
    pub fn link_matrix(&self) -> ArrayView2<'_, f64> {
        self.link.view()
    }

    pub fn rank(&self) -> usize {
        self.independent.len()
    }

    pub fn independent_species(&self) -> Vec<&Symbol> {
        self.independent.iter().map(|&i| &self.species[i]).collect()
    }

    pub fn dependent_species(&self) -> Vec<&Symbol> {
        self.dependent.iter().map(|&i| &self.species[i]).collect()
    }

    /// add_term appends `coeff * x` to `acc`, folding unit coefficients
    /// and signs into the operator.
    fn add_term(&self, acc: Option<Expr>, coeff: f64, x: Expr) -> Option<Expr> {
        if approx_eq!(f64, coeff, 0.0, epsilon = self.tolerance) {
            return acc;
        }
        let term = if approx_eq!(f64, coeff.abs(), 1.0, epsilon = self.tolerance) {
            x
        } else {
            Expr::num(coeff.abs()) * x
        };
        Some(match acc {
            None if coeff < 0.0 => -term,
            None => term,
            Some(acc) if coeff < 0.0 => acc - term,
            Some(acc) => acc + term,
        })
    }

    /// apply adds, for every dependent species, a constant parameter
    /// holding its conserved total and an assignment rule computing the
    /// species from the total and the independent species.  Existing
    /// definitions keep their positions.  Returns the identifiers of
    /// the new parameters.
    pub fn apply(&self, model: &mut Model) -> Result<Vec<Ident>> {
        for (d, &f) in self.dependent.iter().enumerate() {
            let sym = &self.species[f];
            match model.get_variable_by_symbol(sym) {
                Some(var) if var.rule.is_none() => {}
                Some(var) => {
                    return model_err!(
                        Generic,
                        format!("{} gained a rule after analysis (law {d})", var.ident())
                    );
                }
                None => return model_err!(DoesNotExist, sym.name().to_owned()),
            }
        }

        let mut totals = Vec::with_capacity(self.dependent.len());
        for (d, &f) in self.dependent.iter().enumerate() {
            let dependent = self.species[f].clone();

            let mut value = self.add_term(None, 1.0, Expr::sym(&dependent));
            for (k, &p) in self.independent.iter().enumerate() {
                value = self.add_term(value, -self.link[[d, k]], Expr::sym(&self.species[p]));
            }

            let ident = model.scope().get_new_identifier("Total");
            let unit = match model.get_variable_by_symbol(&dependent) {
                Some(var) => model.unit_of(var),
                None => return model_err!(DoesNotExist, dependent.name().to_owned()),
            };
            let total = Parameter::new(&ident)?
                .with_value(value.unwrap_or_default())
                .with_unit(unit)
                .constant(true);
            let total_sym = total.symbol().clone();
            model.add_definition(total);

            let mut rule = Some(Expr::sym(&total_sym));
            for (k, &p) in self.independent.iter().enumerate() {
                rule = self.add_term(rule, self.link[[d, k]], Expr::sym(&self.species[p]));
            }
            let rule = rule.unwrap_or_default();
            info!(species = %dependent, rule = %rule, "derived conservation law");

            match model.get_variable_by_symbol_mut(&dependent) {
                Some(var) => var.rule = Some(Rule::Assignment(rule)),
                None => return model_err!(DoesNotExist, dependent.name().to_owned()),
            }
            totals.push(ident);
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::testutils::{cycle_model, mass_action_model, sym, two_networks_model, var, x_species};

    #[test]
    fn test_rref() {
        let mut m = ndarray::arr2(&[[2.0, 4.0, 2.0], [1.0, 2.0, 3.0], [0.0, 0.0, 1.0]]);
        let pivots = rref(&mut m, 1e-10);
        assert_eq!(vec![0, 2], pivots);
        assert_eq!(ndarray::arr2(&[[1.0, 2.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0, 0.0]]), m);
    }

    #[test]
    fn test_cycle() {
        let mut model = cycle_model();
        let analysis = ConservationAnalysis::new(&model).unwrap();
        let (a, b) = (sym(&model, "A"), sym(&model, "B"));
        assert_eq!(1, analysis.rank());
        assert_eq!(vec![&a], analysis.independent_species());
        assert_eq!(vec![&b], analysis.dependent_species());

        let product = analysis
            .conservation_matrix()
            .dot(&analysis.stoichiometry_matrix());
        assert!(product.iter().all(|v| *v == 0.0));

        let totals = analysis.apply(&mut model).unwrap();
        assert_eq!(vec!["Total".to_owned()], totals);
        let total = var(&model, "Total");
        assert_eq!(
            Some(Rule::Assignment(total - Expr::sym(&a))),
            model.get_variable("B").unwrap().rule
        );
        assert_eq!(
            Some(Expr::sym(&b) + Expr::sym(&a)),
            model.get_variable("Total").unwrap().initial_value
        );
        // appended, nothing renumbered
        assert_eq!(Some(0), model.species_index("A"));
        assert_eq!(Some(2), model.parameter_index("Total"));
    }

    #[test]
    fn test_unit_stoichiometry_weights() {
        // 2 A -> B leaves A + 2 B constant
        let mut model = mass_action_model();
        let r1 = model.get_reaction_mut("r1").unwrap();
        *r1.reactants.values_mut().next().unwrap() = Expr::num(2.0);
        let analysis = ConservationAnalysis::new(&model).unwrap();
        let (a, b) = (sym(&model, "A"), sym(&model, "B"));
        assert_eq!(vec![&a], analysis.independent_species());
        assert_eq!(-0.5, analysis.link_matrix()[[0, 0]]);

        analysis.apply(&mut model).unwrap();
        let total = var(&model, "Total");
        assert_eq!(
            Some(Rule::Assignment(total - Expr::num(0.5) * Expr::sym(&a))),
            model.get_variable("B").unwrap().rule
        );
        assert_eq!(
            Some(Expr::sym(&b) + Expr::num(0.5) * Expr::sym(&a)),
            model.get_variable("Total").unwrap().initial_value
        );
    }

    #[test]
    fn test_two_networks() {
        let mut model = two_networks_model();
        let analysis = ConservationAnalysis::new(&model).unwrap();
        assert_eq!(2, analysis.rank());
        assert_eq!(2, analysis.dependent_species().len());
        let totals = analysis.apply(&mut model).unwrap();
        assert_eq!(vec!["Total".to_owned(), "Total_1".to_owned()], totals);
    }

    #[test]
    fn test_excluded_species() {
        let mut model = cycle_model();
        let cell = sym(&model, "cell");
        model.add_definition(x_species("E", &cell, 1.0).with_boundary_condition(true));
        model.add_definition(
            x_species("F", &cell, 1.0).with_rule(Rule::Assignment(Expr::num(2.0))),
        );
        let analysis = ConservationAnalysis::new(&model).unwrap();
        assert_eq!(2, analysis.species().len());
    }

    #[test]
    fn test_non_constant_stoichiometry() {
        let mut model = mass_action_model();
        let k1 = var(&model, "k1");
        let r1 = model.get_reaction_mut("r1").unwrap();
        *r1.reactants.values_mut().next().unwrap() = k1;
        let err = ConservationAnalysis::new(&model).unwrap_err();
        assert_eq!(ErrorCode::NonConstantStoichiometry, err.code);
    }
}
