//! Messenger Platform wire types.

mod send;
mod webhook;

pub use send::*;
pub use webhook::*;
