// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

use lazy_static::lazy_static;
use regex::Regex;

/// Identifiers name definitions within a scope.  They are validated
/// on construction (see `is_valid_ident`) and compared verbatim:
/// unlike equation languages with loose naming, the markup formats we
/// ingest are case sensitive.
pub type Ident = String;

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

pub fn is_valid_ident(ident: &str) -> bool {
    IDENT_RE.is_match(ident)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    DoesNotExist,
    UndefinedSymbol,
    DuplicateDefinition,
    InvalidIdentifier,
    ExpectedVariable,
    IncompatibleUnits,
    CircularSubstitution,
    NonConstantStoichiometry,
    UnsupportedModelFeature,
    StillReferenced,
    NothingToUndo,
    NothingToRedo,
    BadConfig,
    InternalInconsistency,
    Generic,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            DoesNotExist => "does_not_exist",
            UndefinedSymbol => "undefined_symbol",
            DuplicateDefinition => "duplicate_definition",
            InvalidIdentifier => "invalid_identifier",
            ExpectedVariable => "expected_variable",
            IncompatibleUnits => "incompatible_units",
            CircularSubstitution => "circular_substitution",
            NonConstantStoichiometry => "non_constant_stoichiometry",
            UnsupportedModelFeature => "unsupported_model_feature",
            StillReferenced => "still_referenced",
            NothingToUndo => "nothing_to_undo",
            NothingToRedo => "nothing_to_redo",
            BadConfig => "bad_config",
            InternalInconsistency => "internal_inconsistency",
            Generic => "generic",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Model,
    Unit,
    Transform,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }

    /// Internal inconsistencies are invariant violations: callers
    /// must treat them as fatal and discard the model.
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Internal || self.code == ErrorCode::InternalInconsistency
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Model => "ModelError",
            ErrorKind::Unit => "UnitError",
            ErrorKind::Transform => "TransformError",
            ErrorKind::Internal => "InternalError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

#[test]
fn test_is_valid_ident() {
    let valid = ["a", "_", "k_1", "Species42", "__x", "A_b_C"];
    for ident in valid.iter() {
        assert!(is_valid_ident(ident), "expected '{ident}' to be valid");
    }

    let invalid = ["", "1a", "a-b", "a b", "a.b", "é", "k!"];
    for ident in invalid.iter() {
        assert!(!is_valid_ident(ident), "expected '{ident}' to be invalid");
    }
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Model,
        ErrorCode::UndefinedSymbol,
        Some("k1".to_owned()),
    );
    assert_eq!("ModelError{undefined_symbol: k1}", format!("{err}"));

    let err = Error::new(ErrorKind::Unit, ErrorCode::IncompatibleUnits, None);
    assert_eq!("UnitError{incompatible_units}", format!("{err}"));
    assert!(!err.is_fatal());

    let err = Error::new(
        ErrorKind::Internal,
        ErrorCode::InternalInconsistency,
        None,
    );
    assert!(err.is_fatal());
}
