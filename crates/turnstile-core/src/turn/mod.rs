//! Turn processing: the trait the scheduler drives and its production
//! pipeline.

pub mod pipeline;
pub mod processor;
