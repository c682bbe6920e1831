//! Pipeline stages.
//!
//! Each submodule implements exactly one stage. [`crate::run`] sequences them
//! and decides which failures end the run.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ process ──▶ upload ──▶ cleanup
//! (exists?)   (session)   (primary,   (remove input
//!                          else CLI)   and output)
//! ```
//!
//! 1. [`validate`] — the input must exist; an empty input only warns
//! 2. [`process`]  — open an engine session, run the transform, always
//!    release the session
//! 3. [`upload`]   — library client first, `storacha up` on any failure;
//!    never fatal
//! 4. [`cleanup`]  — remove ephemeral artifacts, one path at a time, never
//!    fatal

pub mod cleanup;
pub mod process;
pub mod upload;
pub mod validate;
