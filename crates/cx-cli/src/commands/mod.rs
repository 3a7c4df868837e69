//! Command implementations

mod chat;
mod config;

pub use chat::{chat_command, parse_input, ChatOptions, Input};
pub use config::{config_get, config_init, config_path, config_show, load_client_config};
