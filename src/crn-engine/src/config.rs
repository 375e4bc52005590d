// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Configuration passed explicitly into models and analyses.
//!
//! Physical constants live in a `Constants` table handed to
//! `Model::new` rather than in process-wide state, so two models in the
//! same process can disagree about (say) Avogadro's number without
//! interfering with each other.

use serde::{Deserialize, Serialize};

use crate::common::{Error, ErrorCode, ErrorKind, Result};

/// Avogadro's number as fixed by SBML Level 3.
pub const AVOGADRO: f64 = 6.022_141_79e23;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Constants {
    pub avogadro: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Constants { avogadro: AVOGADRO }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Pivots with an absolute value below this are treated as zero
    /// during rank-revealing elimination.
    pub pivot_tolerance: f64,
    /// Largest integer exponent expanded when building polynomial normal
    /// forms; larger powers are kept as opaque factors.
    pub max_expand_exponent: i32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            pivot_tolerance: 1e-10,
            max_expand_exponent: 16,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub constants: Constants,
    pub analysis: AnalysisOptions,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Config> {
        let config: Config = serde_json::from_str(json).map_err(|err| {
            Error::new(ErrorKind::Model, ErrorCode::BadConfig, Some(err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        // serializing plain f64/i32 fields can't fail
        serde_json::to_string(self).unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        let bad = |details: &str| {
            Err(Error::new(
                ErrorKind::Model,
                ErrorCode::BadConfig,
                Some(details.to_owned()),
            ))
        };
        if !(self.constants.avogadro.is_finite() && self.constants.avogadro > 0.0) {
            return bad("avogadro must be positive and finite");
        }
        if !(self.analysis.pivot_tolerance >= 0.0) {
            return bad("pivotTolerance must be non-negative");
        }
        if self.analysis.max_expand_exponent < 1 {
            return bad("maxExpandExponent must be at least 1");
        }
        Ok(())
    }
}

#[test]
fn test_config_defaults_from_empty_json() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(Config::default(), config);
    assert_eq!(AVOGADRO, config.constants.avogadro);
}

#[test]
fn test_config_partial_json() {
    let config = Config::from_json(r#"{"analysis": {"pivotTolerance": 1e-6}}"#).unwrap();
    assert_eq!(1e-6, config.analysis.pivot_tolerance);
    assert_eq!(16, config.analysis.max_expand_exponent);
    assert_eq!(AVOGADRO, config.constants.avogadro);

    let roundtrip = Config::from_json(&config.to_json()).unwrap();
    assert_eq!(config, roundtrip);
}

#[test]
fn test_config_rejects_nonsense() {
    let cases = [
        r#"{"constants": {"avogadro": -1.0}}"#,
        r#"{"analysis": {"pivotTolerance": -1.0}}"#,
        r#"{"analysis": {"maxExpandExponent": 0}}"#,
        r#"{"constants": 3}"#,
    ];
    for json in cases.iter() {
        let err = Config::from_json(json).unwrap_err();
        assert_eq!(ErrorCode::BadConfig, err.code, "{json}");
    }
}
