//! Interactive chat loop

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::output::{print_error, print_info, print_turn, print_warning, render_event};
use cx_core::config::ClientConfig;
use cx_protocol::{Lang, RequestAction};
use cx_session::{RequestDescriptor, SessionClient};

/// Options for the chat loop
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Keep requests typed while offline instead of sending only the latest
    pub keep_queued: bool,
    /// Ask the backend for a greeting on startup
    pub welcome: bool,
}

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Chat(String),
    Welcome,
    /// Tell the backend an image was opened
    Open(String),
    Lang(Lang),
    History,
    Help,
    Quit,
    /// Slash command that could not be parsed
    Invalid(String),
}

/// Parse a line typed at the prompt
///
/// Anything not starting with `/` is chat text and is passed through as is.
pub fn parse_input(line: &str) -> Input {
    let Some(command) = line.trim_start().strip_prefix('/') else {
        return Input::Chat(line.to_string());
    };

    let mut parts = command.trim().splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match (name, arg) {
        ("quit" | "exit", _) => Input::Quit,
        ("welcome", _) => Input::Welcome,
        ("history", _) => Input::History,
        ("help", _) => Input::Help,
        ("open", Some(file)) => Input::Open(file.to_string()),
        ("lang", Some(code)) => match Lang::from_code(code) {
            Some(lang) => Input::Lang(lang),
            None => Input::Invalid(format!("unknown language '{}'", code)),
        },
        ("open" | "lang", None) => Input::Invalid(format!("/{} needs an argument", name)),
        _ => Input::Invalid(format!("unknown command '/{}'", name)),
    }
}

const HELP: &str = "\
Commands:
  /welcome        ask the backend for a greeting
  /open <file>    report an opened image
  /lang <en|zh>   switch request language
  /history        show the conversation log
  /quit           leave";

/// Run the chat loop until stdin closes, `/quit`, or Ctrl+C
pub async fn chat_command(config: ClientConfig, options: ChatOptions) -> Result<()> {
    print_info(&format!("Connecting to {}", config.server_url));
    let (client, mut events) = SessionClient::connect(&config);

    if options.welcome {
        client.submit(RequestDescriptor::action(RequestAction::Welcome))?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed");
                    break;
                };
                if !handle_input(&client, parse_input(&line), &options).await? {
                    break;
                }
            }

            event = events.recv() => match event {
                Some(event) => render_event(&event),
                None => break,
            },

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, leaving");
                break;
            }
        }
    }

    client.dispose();
    Ok(())
}

/// Returns false when the loop should stop
async fn handle_input(
    client: &SessionClient,
    input: Input,
    options: &ChatOptions,
) -> Result<bool> {
    let descriptor = match input {
        Input::Quit => return Ok(false),
        Input::Help => {
            println!("{}", HELP);
            return Ok(true);
        }
        Input::History => {
            for turn in client.history().await? {
                print_turn(&turn);
            }
            return Ok(true);
        }
        Input::Lang(lang) => {
            client.set_lang(lang)?;
            print_info(&format!("Language set to {}", lang));
            return Ok(true);
        }
        Input::Invalid(reason) => {
            print_error(&reason);
            return Ok(true);
        }
        Input::Welcome => RequestDescriptor::action(RequestAction::Welcome),
        Input::Open(file) => {
            RequestDescriptor::action(RequestAction::ImageOpened).with_file_name(file)
        }
        Input::Chat(text) => RequestDescriptor::chat(text),
    };

    let descriptor = if options.keep_queued {
        descriptor.keep_existing()
    } else {
        descriptor
    };

    if !client.connected() {
        print_warning("Not connected; request will be sent on reconnect");
    }
    client.submit(descriptor)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(parse_input("Hello"), Input::Chat("Hello".to_string()));
        assert_eq!(parse_input("  spaced  "), Input::Chat("  spaced  ".to_string()));
        assert_eq!(parse_input(""), Input::Chat(String::new()));
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("/welcome"), Input::Welcome);
        assert_eq!(parse_input(" /history "), Input::History);
        assert_eq!(parse_input("/lang zh"), Input::Lang(Lang::Zh));
        assert_eq!(
            parse_input("/open beach photo.jpg"),
            Input::Open("beach photo.jpg".to_string())
        );
    }

    #[test]
    fn test_invalid_commands() {
        assert!(matches!(parse_input("/lang fr"), Input::Invalid(_)));
        assert!(matches!(parse_input("/open"), Input::Invalid(_)));
        assert!(matches!(parse_input("/dance"), Input::Invalid(_)));
    }
}
