//! Source-side stages shared by every renderer.
//!
//! ```text
//! input ──▶ (strategy chain) ──▶ PDF
//!   └──▶ text  (synthetic fallback only)
//! ```
//!
//! 1. [`input`] — classify the user-supplied string as file, URL or inline
//!    markup and load it once for all strategies
//! 2. [`text`]  — reduce markup to a plain-text preview for the last-resort
//!    PDF

pub mod input;
pub mod text;
