// Document sessions: the single owner of each document's blocks and formatting.
// Handlers mutate through the session, reads go through the versioned layout cache.

pub mod debounce;
pub mod handlers;
pub mod service;
pub mod session;
pub mod store;

pub use store::SessionStore;
