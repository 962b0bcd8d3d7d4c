//! Collaborators with the outside world: the remote document store and the
//! local durable cache.

pub mod cache;
pub mod remote;
