//! cx-cli: Terminal front end for the Cindex session client
//!
//! Provides the `cindex` binary: an interactive chat loop that renders
//! session events, plus helpers for inspecting the client configuration.

pub mod commands;
pub mod output;
