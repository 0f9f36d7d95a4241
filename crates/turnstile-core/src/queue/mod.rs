//! The request queue: FIFO admission with a concurrency limit and
//! time-bounded result retention.

pub mod scheduler;
