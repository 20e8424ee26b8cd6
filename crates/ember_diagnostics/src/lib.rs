//! Structured diagnostics for the ember placement engine.
//!
//! Physical-design stages report non-fatal findings (narrow channels,
//! suspicious acceptance rates, consistency-check failures) through a shared
//! [`DiagnosticSink`]. Each [`Diagnostic`] carries a severity, a structured
//! code (e.g. `W104`, `E210`), and a message. Fatal conditions are *not*
//! diagnostics; they are returned as errors by the stage that hit them.
//!
//! Unlike compiler diagnostics there are no source spans here: the subject of
//! a placement diagnostic is a block, net, or grid location, which is named
//! directly in the message.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use severity::Severity;
pub use sink::DiagnosticSink;
