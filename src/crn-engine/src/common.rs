// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

// Re-export all common types from crn-core
pub use crn_core::common::*;

// Macros for error creation - these need to stay in crn-engine
// as they use crate-local paths

#[macro_export]
macro_rules! model_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Model,
            ErrorCode::$code,
            Some($str),
        ))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Model, ErrorCode::$code, None))
    }};
);

#[macro_export]
macro_rules! unit_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Unit,
            ErrorCode::$code,
            Some($str),
        ))
    }};
);

#[macro_export]
macro_rules! trafo_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Transform,
            ErrorCode::$code,
            Some($str),
        ))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Transform, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! internal_err {
    ($str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Internal,
            ErrorCode::InternalInconsistency,
            Some($str),
        ))
    }};
}

/// check_ident returns an InvalidIdentifier error for identifiers that
/// don't match `[A-Za-z_][A-Za-z0-9_]*`.
pub fn check_ident(ident: &str) -> Result<()> {
    if is_valid_ident(ident) {
        Ok(())
    } else {
        model_err!(InvalidIdentifier, ident.to_owned())
    }
}

#[test]
fn test_error_macros() {
    let err: Result<()> = model_err!(UndefinedSymbol, "x".to_owned());
    let err = err.unwrap_err();
    assert_eq!(ErrorKind::Model, err.kind);
    assert_eq!(ErrorCode::UndefinedSymbol, err.code);
    assert_eq!(Some("x".to_owned()), err.details);

    let err: Result<()> = trafo_err!(CircularSubstitution);
    assert_eq!(None, err.unwrap_err().details);

    let err: Result<()> = internal_err!("bad index".to_owned());
    assert!(err.unwrap_err().is_fatal());

    assert!(check_ident("k_1").is_ok());
    assert_eq!(
        ErrorCode::InvalidIdentifier,
        check_ident("1k").unwrap_err().code
    );
}
