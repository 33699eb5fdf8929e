//! Kimi agent - chat front end with local tool execution.
//!
//! Core pieces: the subprocess executor and safety filter ([`executor`]),
//! the tool-call dispatcher and plan runner ([`agent`]), the Moonshot
//! completion client ([`moonshot`]), and append-only conversation state
//! ([`session`]).

pub mod agent;
pub mod executor;
pub mod moonshot;
pub mod session;
