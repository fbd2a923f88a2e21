//! # promptloops-rewriter
//!
//! Rewrites the dynamic sections of the agent and critic instructions from
//! the error accumulated over a critique cycle.
//!
//! ## Key Types
//!
//! - [`Rewriter`] - External rewrite collaborator
//! - [`AgentRewriter`] - Rewriter backed by an agent CLI
//! - [`RewriteRequest`] / [`Rewrite`] - Call input and output
//! - [`Intensity`] / [`Drift`] - Per-dimension guidance

mod prompts;
mod rewrite;
pub mod rewriter;

pub use prompts::RewriterPrompts;
pub use rewrite::{
    Drift, Intensity, Rewrite, RewriteParseError, RewriteRequest, DYNAMIC_SECTION_MARKER,
};
pub use rewriter::{AgentRewriter, RewriteError, Rewriter};
