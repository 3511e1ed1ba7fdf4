//! Wire model shared by every relaymesh node.
//!
//! Nothing in here is async: the types describe what travels over the relay
//! and over a direct data channel, plus the addressing rule that decides
//! whether an incoming envelope concerns this node at all.

pub mod model;

pub use model::*;
