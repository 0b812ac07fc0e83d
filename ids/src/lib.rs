// bids — Bundler ID core
//
// Library root: stable module and chunk ids for a bundler's chunk graph,
// plus cached resolver construction.

pub mod diag;
pub mod graph;
pub mod hash;
pub mod hooks;
pub mod id;
pub mod naming;
pub mod occurrence;
pub mod pass;
pub mod pipeline;
pub mod request;
pub mod resolver;
pub mod snapshot;
