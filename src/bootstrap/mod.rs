//! Process bootstrap helpers that run before the server starts.

pub mod logger;
