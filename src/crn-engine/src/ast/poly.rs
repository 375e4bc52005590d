// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Polynomial normal form for expressions.
//!
//! A `Poly` is a sum of terms `coeff * prod(atom_i^e_i)` where atoms are
//! either symbols or opaque subexpressions (function applications,
//! non-integer powers, divisions by sums, ...).  Exponents may be
//! negative, so `k*A/V` is a single term.  Two expressions that are
//! equal after distributing products and collecting like terms have the
//! same normal form, which is what rate-law splitting and the algebraic
//! comparisons in tests rely on.

use std::collections::BTreeMap;
use std::ops;

use float_cmp::approx_eq;
use smallvec::SmallVec;

use crate::ast::expr::{BinaryOp, Expr, UnaryOp};
use crate::ast::Symbol;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Atom {
    Sym(Symbol),
    // keyed by the Debug rendering, which includes symbol ids
    Opaque(String),
}

/// sorted by atom, no zero exponents
type Monomial = SmallVec<[(Atom, i32); 4]>;

#[derive(Clone, Debug, Default)]
pub struct Poly {
    terms: BTreeMap<Monomial, f64>,
    opaque: BTreeMap<String, Expr>,
}

impl PartialEq for Poly {
    fn eq(&self, other: &Self) -> bool {
        // opaque atoms of cancelled terms may linger in the lookup table
        self.terms == other.terms
    }
}

fn mul_monomials(a: &Monomial, b: &Monomial) -> Monomial {
    let mut result = Monomial::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (atom_a, exp_a) = &a[i];
        let (atom_b, exp_b) = &b[j];
        match atom_a.cmp(atom_b) {
            std::cmp::Ordering::Less => {
                result.push((atom_a.clone(), *exp_a));
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                result.push((atom_b.clone(), *exp_b));
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                let exp = exp_a + exp_b;
                if exp != 0 {
                    result.push((atom_a.clone(), exp));
                }
                i += 1;
                j += 1;
            }
        }
    }
    result.extend(a[i..].iter().cloned());
    result.extend(b[j..].iter().cloned());
    result
}

impl Poly {
    pub fn zero() -> Poly {
        Poly::default()
    }

    pub fn constant(n: f64) -> Poly {
        let mut poly = Poly::zero();
        poly.add_term(Monomial::new(), n);
        poly
    }

    pub fn symbol(sym: &Symbol) -> Poly {
        let mut poly = Poly::zero();
        let mut mono = Monomial::new();
        mono.push((Atom::Sym(sym.clone()), 1));
        poly.add_term(mono, 1.0);
        poly
    }

    fn atom(expr: Expr, exp: i32) -> Poly {
        let key = format!("{:?}", expr);
        let mut poly = Poly::zero();
        let mut mono = Monomial::new();
        mono.push((Atom::Opaque(key.clone()), exp));
        poly.add_term(mono, 1.0);
        poly.opaque.insert(key, expr);
        poly
    }

    fn add_term(&mut self, mono: Monomial, coeff: f64) {
        let new_coeff = self.terms.get(&mono).copied().unwrap_or(0.0) + coeff;
        if new_coeff == 0.0 {
            self.terms.remove(&mono);
        } else {
            self.terms.insert(mono, new_coeff);
        }
    }

    fn merge_opaque(&mut self, other: &Poly) {
        for (key, expr) in other.opaque.iter() {
            self.opaque
                .entry(key.clone())
                .or_insert_with(|| expr.clone());
        }
    }

    /// from_expr expands `expr` into normal form.  Integer powers up to
    /// `max_exponent` are multiplied out; anything else that isn't a
    /// sum, product or quotient becomes an opaque atom.
    pub fn from_expr(expr: &Expr, max_exponent: i32) -> Poly {
        let from = |e: &Expr| Poly::from_expr(e, max_exponent);
        match expr {
            Expr::Const(n) => Poly::constant(*n),
            Expr::Sym(sym) => Poly::symbol(sym),
            Expr::Op1(UnaryOp::Negative, l) => -from(l),
            Expr::Op2(BinaryOp::Add, l, r) => from(l) + from(r),
            Expr::Op2(BinaryOp::Sub, l, r) => from(l) - from(r),
            Expr::Op2(BinaryOp::Mul, l, r) => from(l) * from(r),
            Expr::Op2(BinaryOp::Div, l, r) => {
                let den = from(r);
                match den.invert() {
                    Some(inv) => from(l) * inv,
                    None => from(l) * Poly::atom(r.as_ref().clone(), -1),
                }
            }
            Expr::Op2(BinaryOp::Exp, l, r) => {
                let n = match r.eval_const() {
                    Some(n) if approx_eq!(f64, n, n.round()) && n.abs() <= max_exponent as f64 => {
                        n.round() as i32
                    }
                    _ => return Poly::atom(expr.clone(), 1),
                };
                let base = from(l);
                if n >= 0 {
                    base.powi(n as u32)
                } else {
                    match base.invert() {
                        Some(inv) => inv.powi(n.unsigned_abs()),
                        None => Poly::atom(l.as_ref().clone(), n),
                    }
                }
            }
            _ => Poly::atom(expr.clone(), 1),
        }
    }

    /// invert returns 1/self for single-term polynomials.
    fn invert(&self) -> Option<Poly> {
        if self.terms.len() != 1 {
            return None;
        }
        let (mono, coeff) = self.terms.iter().next()?;
        let inverse: Monomial = mono.iter().map(|(atom, exp)| (atom.clone(), -exp)).collect();
        let mut result = Poly::zero();
        result.add_term(inverse, 1.0 / coeff);
        result.merge_opaque(self);
        Some(result)
    }

    pub fn powi(&self, n: u32) -> Poly {
        let mut result = Poly::constant(1.0);
        for _ in 0..n {
            result = result * self.clone();
        }
        result
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// split_by_sign separates positive terms from negative ones,
    /// returning `(positive, -negative)` so both halves have positive
    /// coefficients and `positive - negative == self`.
    pub fn split_by_sign(&self) -> (Poly, Poly) {
        let mut positive = Poly::zero();
        let mut negative = Poly::zero();
        for (mono, coeff) in self.terms.iter() {
            if *coeff > 0.0 {
                positive.add_term(mono.clone(), *coeff);
            } else {
                negative.add_term(mono.clone(), -coeff);
            }
        }
        positive.merge_opaque(self);
        negative.merge_opaque(self);
        (positive, negative)
    }

    /// approx_eq compares coefficients of like terms within `epsilon`.
    pub fn approx_eq(&self, other: &Poly, epsilon: f64) -> bool {
        let coeff = |poly: &Poly, mono: &Monomial| poly.terms.get(mono).copied().unwrap_or(0.0);
        self.terms
            .keys()
            .chain(other.terms.keys())
            .all(|mono| approx_eq!(f64, coeff(self, mono), coeff(other, mono), epsilon = epsilon))
    }

    fn atom_expr(&self, atom: &Atom) -> Expr {
        match atom {
            Atom::Sym(sym) => Expr::Sym(sym.clone()),
            Atom::Opaque(key) => self.opaque.get(key).cloned().unwrap_or_default(),
        }
    }

    fn product(&self, factors: &[(&Atom, i32)]) -> Option<Expr> {
        factors
            .iter()
            .map(|(atom, exp)| {
                let base = self.atom_expr(atom);
                if *exp == 1 {
                    base
                } else {
                    base.pow(Expr::num(*exp as f64))
                }
            })
            .reduce(|acc, e| acc * e)
    }

    fn term_expr(&self, mono: &Monomial, coeff: f64) -> Expr {
        let numer: Vec<(&Atom, i32)> = mono
            .iter()
            .filter(|(_, exp)| *exp > 0)
            .map(|(atom, exp)| (atom, *exp))
            .collect();
        let denom: Vec<(&Atom, i32)> = mono
            .iter()
            .filter(|(_, exp)| *exp < 0)
            .map(|(atom, exp)| (atom, -exp))
            .collect();

        let numer = match (coeff, self.product(&numer)) {
            (c, Some(product)) if c == 1.0 => product,
            (c, Some(product)) => Expr::num(c) * product,
            (c, None) => Expr::num(c),
        };
        match self.product(&denom) {
            Some(denom) => numer / denom,
            None => numer,
        }
    }

    /// to_expr renders the normal form back to an expression, with
    /// negative terms subtracted.
    pub fn to_expr(&self) -> Expr {
        let mut result: Option<Expr> = None;
        for (mono, coeff) in self.terms.iter() {
            let negative = *coeff < 0.0;
            let term = self.term_expr(mono, coeff.abs());
            result = Some(match (result, negative) {
                (None, false) => term,
                (None, true) => -term,
                (Some(acc), false) => acc + term,
                (Some(acc), true) => acc - term,
            });
        }
        result.unwrap_or(Expr::Const(0.0))
    }
}

impl ops::Add for Poly {
    type Output = Poly;

    fn add(mut self, rhs: Poly) -> Poly {
        self.merge_opaque(&rhs);
        for (mono, coeff) in rhs.terms.into_iter() {
            self.add_term(mono, coeff);
        }
        self
    }
}

impl ops::Neg for Poly {
    type Output = Poly;

    fn neg(mut self) -> Poly {
        for coeff in self.terms.values_mut() {
            *coeff = -*coeff;
        }
        self
    }
}

impl ops::Sub for Poly {
    type Output = Poly;

    fn sub(self, rhs: Poly) -> Poly {
        self + (-rhs)
    }
}

impl ops::Mul for Poly {
    type Output = Poly;

    fn mul(self, rhs: Poly) -> Poly {
        let mut result = Poly::zero();
        result.merge_opaque(&self);
        result.merge_opaque(&rhs);
        for (mono_a, coeff_a) in self.terms.iter() {
            for (mono_b, coeff_b) in rhs.terms.iter() {
                result.add_term(mul_monomials(mono_a, mono_b), coeff_a * coeff_b);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BuiltinFn;

    const MAX_EXP: i32 = 16;

    fn poly(e: &Expr) -> Poly {
        Poly::from_expr(e, MAX_EXP)
    }

    #[test]
    fn test_collects_like_terms() {
        let a = Expr::sym(&Symbol::new("A"));
        let b = Expr::sym(&Symbol::new("B"));

        // (A + B)^2 - A*A - B*B == 2*A*B
        let lhs = (a.clone() + b.clone()).pow(Expr::num(2.0))
            - a.clone() * a.clone()
            - b.clone() * b.clone();
        let rhs = Expr::num(2.0) * a.clone() * b.clone();
        assert_eq!(poly(&rhs), poly(&lhs));
        assert_eq!(1, poly(&lhs).num_terms());

        let zero = a.clone() * b.clone() - b.clone() * a.clone();
        assert!(poly(&zero).is_zero());
        assert_eq!(Expr::num(0.0), poly(&zero).to_expr());
    }

    #[test]
    fn test_division_by_monomial() {
        let k = Expr::sym(&Symbol::new("k"));
        let a = Expr::sym(&Symbol::new("A"));
        let v = Expr::sym(&Symbol::new("V"));

        let lhs = (k.clone() * a.clone() * v.clone()) / (Expr::num(2.0) * v.clone());
        let rhs = Expr::num(0.5) * k.clone() * a.clone();
        assert_eq!(poly(&rhs), poly(&lhs));

        let inv = a.clone().pow(Expr::num(-2.0)) * a.clone() * a.clone();
        assert_eq!(Poly::constant(1.0), poly(&inv));
    }

    #[test]
    fn test_opaque_atoms() {
        let s = Expr::sym(&Symbol::new("S"));
        let km = Expr::sym(&Symbol::new("Km"));
        let vmax = Expr::sym(&Symbol::new("Vmax"));

        // Michaelis-Menten: the denominator is a sum and stays opaque
        let mm = vmax.clone() * s.clone() / (km.clone() + s.clone());
        let p = poly(&mm);
        assert_eq!(1, p.num_terms());
        assert_eq!(poly(&p.to_expr()), p);

        let e = Expr::App(BuiltinFn::Exp, vec![s.clone()]);
        let p = poly(&(e.clone() - e.clone() + s.clone()));
        assert_eq!(Poly::from_expr(&s, MAX_EXP), p);

        // exponents past the limit aren't expanded
        let big = (s.clone() + km.clone()).pow(Expr::num(100.0));
        assert_eq!(1, poly(&big).num_terms());
    }

    #[test]
    fn test_split_by_sign() {
        let k1 = Expr::sym(&Symbol::new("k1"));
        let k2 = Expr::sym(&Symbol::new("k2"));
        let a = Expr::sym(&Symbol::new("A"));
        let b = Expr::sym(&Symbol::new("B"));

        let rate = k1.clone() * a.clone() - k2.clone() * b.clone();
        let (fwd, rev) = poly(&rate).split_by_sign();
        assert_eq!(poly(&(k1 * a)), fwd);
        assert_eq!(poly(&(k2 * b)), rev);
        assert_eq!(poly(&rate), poly(&(fwd.to_expr() - rev.to_expr())));
    }

    #[test]
    fn test_approx_eq() {
        let a = Expr::sym(&Symbol::new("A"));
        let lhs = poly(&(Expr::num(0.1) * a.clone() + Expr::num(0.2) * a.clone()));
        let rhs = poly(&(Expr::num(0.3) * a.clone()));
        assert!(lhs.approx_eq(&rhs, 1e-12));
        assert!(!lhs.approx_eq(&poly(&a), 1e-12));
    }
}
