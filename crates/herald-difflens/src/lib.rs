//! Line diffing for pull-request review.
//!
//! Aligns the before and after text of a file with a longest-matching-block
//! sequence matcher, turns the non-equal regions into [`hunk::Hunk`]s,
//! drops insignificant ones, and renders unified-diff excerpts for prompts.
//! Nothing here touches the network or the language model.

pub mod hunk;
pub mod lines;
pub mod matcher;
pub mod unified;
