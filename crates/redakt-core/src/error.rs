// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Redakt.

use thiserror::Error;

/// Top-level error type for all Redakt operations.
///
/// Degenerate geometry (zero-area bake rectangles, non-finite fit scales) is
/// deliberately *not* an error: those cases are recovered locally by skipping
/// the operation. Likewise a stale deferred write is detected by id checks
/// and discarded, never surfaced.
#[derive(Debug, Error)]
pub enum RedaktError {
    // -- Import errors --
    #[error("source document decode failed: {0}")]
    Decode(String),

    // -- Document assembly errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("font loading failed: {0}")]
    Font(String),

    // -- Editing session --
    #[error("session error: {0}")]
    Session(String),

    // -- Infrastructure --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RedaktError>;
