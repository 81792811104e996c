//! Accounts, keys, and the authority graph

pub mod graph;
pub mod registry;

pub use graph::{AuthorityGraph, AuthorityMember, MAX_AUTHORITY_DEPTH};
pub use registry::{Account, AccountPlan, AccountRegistry};
