//! Pull request review orchestration.
//!
//! Four stages, each a plain async function over typed records and
//! capability handles: [`resolver`], [`fetcher`], [`composer`] and
//! [`publisher`], composed by [`pipeline::ReviewPipeline`]. Concrete
//! platform clients live in [`azure`], [`slack`] and [`llm`].

pub mod azure;
pub mod capability;
pub mod composer;
pub mod fetcher;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod publisher;
pub mod resolver;
pub mod slack;
