// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::config::Constants;
use crate::unit_err;

/// The base units of the markup language.  Every unit in a model is a
/// product of powers of these.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseUnit {
    Ampere,
    Avogadro,
    Becquerel,
    Candela,
    Celsius,
    Coulomb,
    Dimensionless,
    Farad,
    Gram,
    Gray,
    Henry,
    Hertz,
    Item,
    Joule,
    Katal,
    Kelvin,
    Kilogram,
    Litre,
    Lumen,
    Lux,
    Metre,
    Mole,
    Newton,
    Ohm,
    Pascal,
    Radian,
    Second,
    Siemens,
    Sievert,
    Steradian,
    Tesla,
    Volt,
    Watt,
    Weber,
}

impl BaseUnit {
    pub fn name(self) -> &'static str {
        use BaseUnit::*;
        match self {
            Ampere => "ampere",
            Avogadro => "avogadro",
            Becquerel => "becquerel",
            Candela => "candela",
            Celsius => "celsius",
            Coulomb => "coulomb",
            Dimensionless => "dimensionless",
            Farad => "farad",
            Gram => "gram",
            Gray => "gray",
            Henry => "henry",
            Hertz => "hertz",
            Item => "item",
            Joule => "joule",
            Katal => "katal",
            Kelvin => "kelvin",
            Kilogram => "kilogram",
            Litre => "litre",
            Lumen => "lumen",
            Lux => "lux",
            Metre => "metre",
            Mole => "mole",
            Newton => "newton",
            Ohm => "ohm",
            Pascal => "pascal",
            Radian => "radian",
            Second => "second",
            Siemens => "siemens",
            Sievert => "sievert",
            Steradian => "steradian",
            Tesla => "tesla",
            Volt => "volt",
            Watt => "watt",
            Weber => "weber",
        }
    }

    /// from_name accepts the markup language's base unit names, plus
    /// the American spellings of litre and metre.
    pub fn from_name(name: &str) -> Option<BaseUnit> {
        use BaseUnit::*;
        let unit = match name {
            "ampere" => Ampere,
            "avogadro" => Avogadro,
            "becquerel" => Becquerel,
            "candela" => Candela,
            "celsius" => Celsius,
            "coulomb" => Coulomb,
            "dimensionless" => Dimensionless,
            "farad" => Farad,
            "gram" => Gram,
            "gray" => Gray,
            "henry" => Henry,
            "hertz" => Hertz,
            "item" => Item,
            "joule" => Joule,
            "katal" => Katal,
            "kelvin" => Kelvin,
            "kilogram" => Kilogram,
            "litre" | "liter" => Litre,
            "lumen" => Lumen,
            "lux" => Lux,
            "metre" | "meter" => Metre,
            "mole" => Mole,
            "newton" => Newton,
            "ohm" => Ohm,
            "pascal" => Pascal,
            "radian" => Radian,
            "second" => Second,
            "siemens" => Siemens,
            "sievert" => Sievert,
            "steradian" => Steradian,
            "tesla" => Tesla,
            "volt" => Volt,
            "watt" => Watt,
            "weber" => Weber,
            _ => return None,
        };
        Some(unit)
    }

    fn is_substance_like(self) -> bool {
        matches!(
            self,
            BaseUnit::Mole
                | BaseUnit::Item
                | BaseUnit::Gram
                | BaseUnit::Kilogram
                | BaseUnit::Avogadro
        )
    }
}

impl Display for BaseUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single base unit with multiplier, decimal scale and exponent:
/// `(multiplier * 10^scale * base)^exponent`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaledBaseUnit {
    pub base: BaseUnit,
    pub multiplier: f64,
    pub scale: i32,
    pub exponent: i32,
}

impl ScaledBaseUnit {
    pub fn new(base: BaseUnit, multiplier: f64, scale: i32, exponent: i32) -> Self {
        ScaledBaseUnit {
            base,
            multiplier,
            scale,
            exponent,
        }
    }
}

impl From<BaseUnit> for ScaledBaseUnit {
    fn from(base: BaseUnit) -> Self {
        ScaledBaseUnit::new(base, 1.0, 0, 1)
    }
}

/// Unit is the formal product `multiplier * 10^scale * prod(base_i^e_i)`.
/// Factors with a zero exponent are never stored, and the dimensionless
/// base unit never appears as a factor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    factors: BTreeMap<BaseUnit, i32>,
    multiplier: f64,
    scale: i32,
}

impl Default for Unit {
    fn default() -> Self {
        Unit::dimensionless()
    }
}

impl Unit {
    pub fn dimensionless() -> Unit {
        Unit {
            factors: BTreeMap::new(),
            multiplier: 1.0,
            scale: 0,
        }
    }

    pub fn new<I: IntoIterator<Item = (BaseUnit, i32)>>(
        factors: I,
        multiplier: f64,
        scale: i32,
    ) -> Unit {
        let mut unit = Unit {
            factors: BTreeMap::new(),
            multiplier,
            scale,
        };
        for (base, exp) in factors {
            unit.add_factor(base, exp);
        }
        unit
    }

    fn add_factor(&mut self, base: BaseUnit, exp: i32) {
        if base == BaseUnit::Dimensionless || exp == 0 {
            return;
        }
        let new_value = self.factors.get(&base).copied().unwrap_or(0) + exp;
        if new_value == 0 {
            self.factors.remove(&base);
        } else {
            self.factors.insert(base, new_value);
        }
    }

    pub fn factors(&self) -> impl Iterator<Item = (BaseUnit, i32)> + '_ {
        self.factors.iter().map(|(base, exp)| (*base, *exp))
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn exponent(&self, base: BaseUnit) -> i32 {
        self.factors.get(&base).copied().unwrap_or(0)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// has_no_factors is true for units without any base unit, even if
    /// they carry a multiplier or scale (e.g. a percentage).
    pub fn has_no_factors(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.factors.is_empty() && self.multiplier == 1.0 && self.scale == 0
    }

    /// as_scaled_base_unit returns the single-factor representation,
    /// if this unit has exactly one base unit.
    pub fn as_scaled_base_unit(&self) -> Option<ScaledBaseUnit> {
        if self.factors.len() != 1 {
            return None;
        }
        let (base, exp) = self.factors().next()?;
        if self.scale % exp != 0 {
            return None;
        }
        let multiplier = self.multiplier.powf(1.0 / exp as f64);
        Some(ScaledBaseUnit::new(base, multiplier, self.scale / exp, exp))
    }

    pub fn reciprocal(mut self) -> Unit {
        for (_base, exp) in self.factors.iter_mut() {
            *exp *= -1;
        }
        self.multiplier = 1.0 / self.multiplier;
        self.scale = -self.scale;
        self
    }

    pub fn pow(mut self, exp: i32) -> Unit {
        if exp == 0 {
            return Unit::dimensionless();
        }
        for (_base, e) in self.factors.iter_mut() {
            *e *= exp;
        }
        self.multiplier = self.multiplier.powi(exp);
        self.scale *= exp;
        self
    }

    fn is_single_factor(&self, matches: impl Fn(BaseUnit, i32) -> bool) -> bool {
        // dimensionless passes every classification
        if self.factors.is_empty() {
            return true;
        }
        if self.factors.len() != 1 {
            return false;
        }
        self.factors().all(|(base, exp)| matches(base, exp))
    }

    pub fn is_volume_unit(&self) -> bool {
        self.is_single_factor(|base, exp| {
            (base == BaseUnit::Litre && exp == 1) || (base == BaseUnit::Metre && exp == 3)
        })
    }

    pub fn is_area_unit(&self) -> bool {
        self.is_single_factor(|base, exp| base == BaseUnit::Metre && exp == 2)
    }

    pub fn is_length_unit(&self) -> bool {
        self.is_single_factor(|base, exp| base == BaseUnit::Metre && exp == 1)
    }

    pub fn is_substance_unit(&self) -> bool {
        self.is_single_factor(|base, exp| base.is_substance_like() && exp == 1)
    }

    pub fn is_time_unit(&self) -> bool {
        self.is_single_factor(|base, exp| base == BaseUnit::Second && exp == 1)
    }

    /// is_concentration_unit requires exactly a substance factor and a
    /// reciprocal volume factor; dimensionless units don't qualify.
    pub fn is_concentration_unit(&self) -> bool {
        if self.factors.len() != 2 {
            return false;
        }
        let has_substance = self
            .factors()
            .any(|(base, exp)| base.is_substance_like() && exp == 1);
        let has_inverse_volume = self.factors().any(|(base, exp)| {
            (base == BaseUnit::Litre && exp == -1) || (base == BaseUnit::Metre && exp == -3)
        });
        has_substance && has_inverse_volume
    }

    /// to_si rewrites non-SI base units in terms of SI ones.  Litres
    /// become cubic metres (scaled by 10^-3 per power), grams become
    /// kilograms, and avogadro becomes a dimensionless multiplier.
    pub fn to_si(&self, constants: &Constants) -> Unit {
        let mut result = Unit {
            factors: BTreeMap::new(),
            multiplier: self.multiplier,
            scale: self.scale,
        };
        for (base, exp) in self.factors() {
            match base {
                BaseUnit::Litre => {
                    result.add_factor(BaseUnit::Metre, 3 * exp);
                    result.scale -= 3 * exp;
                }
                BaseUnit::Gram => {
                    result.add_factor(BaseUnit::Kilogram, exp);
                    result.scale -= 3 * exp;
                }
                BaseUnit::Avogadro => {
                    result.multiplier *= constants.avogadro.powi(exp);
                }
                _ => result.add_factor(base, exp),
            }
        }
        result
    }

    /// conversion_factor returns f such that a quantity whose value is
    /// x in `from` has the value f*x in `to`.
    pub fn conversion_factor(from: &Unit, to: &Unit, constants: &Constants) -> Result<f64> {
        if from == to {
            return Ok(1.0);
        }
        let ratio = from.to_si(constants) / to.to_si(constants);
        if !ratio.factors.is_empty() {
            return unit_err!(IncompatibleUnits, format!("cannot convert '{from}' to '{to}'"));
        }
        Ok(ratio.multiplier * 10f64.powi(ratio.scale))
    }

    pub fn pretty_print(&self) -> String {
        format!("{}", self)
    }
}

impl From<BaseUnit> for Unit {
    fn from(base: BaseUnit) -> Self {
        Unit::new([(base, 1)], 1.0, 0)
    }
}

impl From<ScaledBaseUnit> for Unit {
    fn from(unit: ScaledBaseUnit) -> Self {
        Unit::new(
            [(unit.base, unit.exponent)],
            unit.multiplier.powi(unit.exponent),
            unit.scale * unit.exponent,
        )
    }
}

impl std::ops::Mul for Unit {
    type Output = Self;

    fn mul(mut self, rhs: Self) -> Self::Output {
        for (base, exp) in rhs.factors.into_iter() {
            self.add_factor(base, exp);
        }
        self.multiplier *= rhs.multiplier;
        self.scale += rhs.scale;

        self
    }
}

impl std::ops::Div for Unit {
    type Output = Self;

    fn div(mut self, rhs: Self) -> Self::Output {
        for (base, exp) in rhs.factors.into_iter() {
            self.add_factor(base, -exp);
        }
        // divide directly: m * (1/m) isn't always exactly 1
        self.multiplier /= rhs.multiplier;
        self.scale -= rhs.scale;

        self
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = vec![];
        if self.multiplier != 1.0 {
            parts.push(format!("{}", self.multiplier));
        }
        if self.scale != 0 {
            parts.push(format!("1e{}", self.scale));
        }
        for (base, exp) in self.factors() {
            if exp == 1 {
                parts.push(base.name().to_owned());
            } else {
                parts.push(format!("{}^{}", base.name(), exp));
            }
        }
        if parts.is_empty() {
            write!(f, "dimensionless")
        } else {
            write!(f, "{}", parts.join("*"))
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::common::ErrorCode;

    fn mmol() -> Unit {
        Unit::from(ScaledBaseUnit::new(BaseUnit::Mole, 1.0, -3, 1))
    }

    #[test]
    fn test_mul_div_combine_exponents() {
        let m = Unit::from(BaseUnit::Metre);
        let s = Unit::from(BaseUnit::Second);

        let area = m.clone() * m.clone();
        assert_eq!(2, area.exponent(BaseUnit::Metre));
        assert!(area.is_area_unit());

        let speed = m.clone() / s.clone();
        assert_eq!(1, speed.exponent(BaseUnit::Metre));
        assert_eq!(-1, speed.exponent(BaseUnit::Second));

        // zero exponents remove the base entirely
        let back = speed * s;
        assert_eq!(1, back.num_factors());
        assert_eq!(m, back);

        let nothing = m.clone() / m;
        assert!(nothing.is_dimensionless());
    }

    #[test]
    fn test_scale_arithmetic() {
        let conc = mmol() / Unit::from(BaseUnit::Litre);
        assert_eq!(-3, conc.scale());
        assert!(conc.is_concentration_unit());

        let per_ml = Unit::from(ScaledBaseUnit::new(BaseUnit::Litre, 1.0, -3, 1)).reciprocal();
        assert_eq!(3, per_ml.scale());

        let squared = mmol().pow(2);
        assert_eq!(-6, squared.scale());
        assert_eq!(2, squared.exponent(BaseUnit::Mole));
    }

    #[test]
    fn test_dimensionless_base_is_dropped() {
        let unit = Unit::from(BaseUnit::Dimensionless);
        assert!(unit.is_dimensionless());
        assert_eq!("dimensionless", format!("{unit}"));
    }

    #[test]
    fn test_classification() {
        let litre = Unit::from(BaseUnit::Litre);
        let cubic = Unit::from(ScaledBaseUnit::new(BaseUnit::Metre, 1.0, 0, 3));
        assert!(litre.is_volume_unit());
        assert!(cubic.is_volume_unit());
        assert!(!litre.is_substance_unit());

        assert!(Unit::from(BaseUnit::Item).is_substance_unit());
        assert!(Unit::from(BaseUnit::Second).is_time_unit());
        assert!(Unit::from(BaseUnit::Metre).is_length_unit());
        assert!(!Unit::from(BaseUnit::Metre).is_volume_unit());

        // dimensionless satisfies the single-base predicates...
        let dmnl = Unit::dimensionless();
        assert!(dmnl.is_volume_unit());
        assert!(dmnl.is_substance_unit());
        // ...but not the concentration one
        assert!(!dmnl.is_concentration_unit());

        let molar = Unit::from(BaseUnit::Mole) / cubic;
        assert!(molar.is_concentration_unit());
        let not_conc = Unit::from(BaseUnit::Mole) * Unit::from(BaseUnit::Litre);
        assert!(!not_conc.is_concentration_unit());
    }

    #[test]
    fn test_conversion_factor() {
        let constants = Constants::default();
        let mole = Unit::from(BaseUnit::Mole);
        let f = Unit::conversion_factor(&mole, &mmol(), &constants).unwrap();
        assert!(approx_eq!(f64, 1000.0, f, ulps = 2));

        let litre = Unit::from(BaseUnit::Litre);
        let cubic = Unit::from(ScaledBaseUnit::new(BaseUnit::Metre, 1.0, 0, 3));
        let f = Unit::conversion_factor(&litre, &cubic, &constants).unwrap();
        assert!(approx_eq!(f64, 1e-3, f, ulps = 2));

        let gram = Unit::from(BaseUnit::Gram);
        let kg = Unit::from(BaseUnit::Kilogram);
        let f = Unit::conversion_factor(&kg, &gram, &constants).unwrap();
        assert!(approx_eq!(f64, 1000.0, f, ulps = 2));

        let avogadro = Unit::from(BaseUnit::Avogadro);
        let f = Unit::conversion_factor(&avogadro, &Unit::dimensionless(), &constants).unwrap();
        assert_eq!(constants.avogadro, f);

        let err = Unit::conversion_factor(&mole, &litre, &constants).unwrap_err();
        assert_eq!(ErrorCode::IncompatibleUnits, err.code);
    }

    #[test]
    fn test_conversion_factor_degenerate_multiplier() {
        let constants = Constants::default();
        for multiplier in [0.0, f64::INFINITY] {
            let unit = Unit::from(ScaledBaseUnit::new(BaseUnit::Mole, multiplier, 0, 1));
            let f = Unit::conversion_factor(&unit, &unit, &constants).unwrap();
            assert_eq!(1.0, f);
        }
    }

    #[test]
    fn test_as_scaled_base_unit() {
        let unit = Unit::from(ScaledBaseUnit::new(BaseUnit::Metre, 2.0, -2, 2));
        let scaled = unit.as_scaled_base_unit().unwrap();
        assert_eq!(BaseUnit::Metre, scaled.base);
        assert_eq!(2, scaled.exponent);
        assert_eq!(-2, scaled.scale);
        assert!(approx_eq!(f64, 2.0, scaled.multiplier, ulps = 2));

        let two = Unit::from(BaseUnit::Mole) / Unit::from(BaseUnit::Litre);
        assert!(two.as_scaled_base_unit().is_none());
    }

    #[test]
    fn test_pretty_print_unit() {
        let cases: &[(Unit, &str)] = &[
            (Unit::dimensionless(), "dimensionless"),
            (Unit::from(BaseUnit::Mole), "mole"),
            (mmol() / Unit::from(BaseUnit::Litre), "1e-3*litre^-1*mole"),
            (
                Unit::from(ScaledBaseUnit::new(BaseUnit::Second, 60.0, 0, 1)),
                "60*second",
            ),
        ];
        for (unit, expected) in cases.iter() {
            assert_eq!(*expected, unit.pretty_print());
        }
    }

    #[test]
    fn test_base_unit_names() {
        assert_eq!(Some(BaseUnit::Litre), BaseUnit::from_name("liter"));
        assert_eq!(Some(BaseUnit::Metre), BaseUnit::from_name("metre"));
        assert_eq!(None, BaseUnit::from_name("furlong"));
        assert_eq!(Some(BaseUnit::Katal), BaseUnit::from_name(BaseUnit::Katal.name()));
    }

    fn base_unit_strategy() -> impl Strategy<Value = BaseUnit> {
        prop_oneof![
            Just(BaseUnit::Mole),
            Just(BaseUnit::Item),
            Just(BaseUnit::Litre),
            Just(BaseUnit::Metre),
            Just(BaseUnit::Second),
            Just(BaseUnit::Gram),
            Just(BaseUnit::Avogadro),
            Just(BaseUnit::Kelvin),
        ]
    }

    fn unit_strategy() -> impl Strategy<Value = Unit> {
        (
            prop::collection::vec((base_unit_strategy(), -3i32..=3), 0..4),
            prop_oneof![Just(1.0), 0.001f64..1000.0],
            -9i32..=9,
        )
            .prop_map(|(factors, multiplier, scale)| Unit::new(factors, multiplier, scale))
    }

    proptest! {
        #[test]
        fn conversion_factor_to_self_is_one(unit in unit_strategy()) {
            let f = Unit::conversion_factor(&unit, &unit, &Constants::default()).unwrap();
            prop_assert_eq!(1.0, f);
        }

        #[test]
        fn mul_then_div_restores_factors(a in unit_strategy(), b in unit_strategy()) {
            let restored = (a.clone() * b.clone()) / b;
            let expected: Vec<_> = a.factors().collect();
            let actual: Vec<_> = restored.factors().collect();
            prop_assert_eq!(expected, actual);
            prop_assert_eq!(a.scale(), restored.scale());
        }
    }
}
