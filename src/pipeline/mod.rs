//! Pipeline stages for report ingestion and analysis.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch extraction strategy) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ parse ──▶ validate
//! (file)  (bytes→text) (HTTP)  (fences,   (strict gate,
//!                              salvage)    normalize)
//! ```
//!
//! 1. [`input`]    — validate the file (type claim, size ceiling) and load it
//! 2. [`extract`]  — turn bytes into text; CPU-bound, callers use
//!    `spawn_blocking`
//! 3. [`llm`]      — drive the completion call with the single strict-prompt
//!    retry; the only stage with network I/O
//! 4. [`parse`]    — recover a JSON object from raw model output
//!    (fence stripping, outermost-brace salvage)
//! 5. [`validate`] — reject placeholder output, normalize to [`crate::insights::Insights`]

pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
pub mod validate;
