// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// redakt-core — Shared types, error definitions, configuration, and geometry
// utilities used by every Redakt crate.

pub mod config;
pub mod error;
pub mod geometry;
pub mod types;

pub use config::SessionConfig;
pub use error::RedaktError;
pub use types::*;
