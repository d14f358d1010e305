// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// redakt-compose — The editing pipeline: one live canvas session bound to
// the page store, the export compositor, and the PDF collaborator seams
// (source decoder, document writer) with lopdf-backed implementations.

pub mod export;
pub mod pdf;
pub mod session;
pub mod source;

pub use export::export_document;
pub use pdf::assembler::PdfAssembler;
pub use pdf::decoder::MediaBoxDecoder;
pub use session::{CanvasSession, SessionState, ToolShape};
pub use source::{DecodedPage, DocumentWriter, SourceDecoder, import_source};
