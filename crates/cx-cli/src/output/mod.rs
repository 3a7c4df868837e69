//! Output formatting utilities for the CLI
//!
//! Session events are rendered as they arrive: streamed text is printed
//! inline and everything else gets a colored one-line notice.

use std::io::Write;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

use cx_protocol::{Directive, InboundFrame};
use cx_session::{SessionEvent, Turn};

/// Render one session event to the terminal
pub fn render_event(event: &SessionEvent) {
    match event {
        SessionEvent::Connected => print_success("Connected"),
        SessionEvent::Disconnected => print_warning("Disconnected, retrying"),
        SessionEvent::StreamStarted { .. } => print_colored("assistant> ", Color::Magenta),
        SessionEvent::Delta { text } => {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{}", text);
            let _ = stdout.flush();
        }
        SessionEvent::TurnFinished { turn, interrupted } => {
            if turn.is_some() {
                println!();
            }
            if *interrupted {
                print_warning("(interrupted)");
            }
        }
        SessionEvent::ActionFinished { action, .. } => {
            tracing::debug!(action = %action, "Action finished");
        }
        SessionEvent::Directive(directive) => print_info(&format_directive(directive)),
        SessionEvent::Message(frame) => print_info(&format_frame(frame)),
        SessionEvent::TurnAbandoned { .. } => {
            println!();
            print_warning("Connection lost mid-reply; the request will be retried");
        }
    }
}

/// Print one conversation log entry
pub fn print_turn(turn: &Turn) {
    println!("{}", format_turn(turn));
}

/// One-line summary of a log entry
pub fn format_turn(turn: &Turn) -> String {
    let marker = if turn.forget { " (forgotten)" } else { "" };
    format!("{}{}: {}", turn.role, marker, turn.content)
}

/// Directive name with its payload, if any
pub fn format_directive(directive: &Directive) -> String {
    if directive.payload.is_empty() {
        format!("[{}]", directive.kind)
    } else {
        format!(
            "[{}] {}",
            directive.kind,
            serde_json::Value::Object(directive.payload.clone())
        )
    }
}

fn format_frame(frame: &InboundFrame) -> String {
    serde_json::to_string(frame).unwrap_or_else(|_| format!("{:?}", frame))
}

fn print_colored(msg: &str, color: Color) {
    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(stdout, SetForegroundColor(color), Print(msg), ResetColor);
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Goes to stderr.
pub fn print_error(msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow
pub fn print_warning(msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use cx_protocol::DirectiveKind;

    #[test]
    fn test_format_turn() {
        let mut turn = Turn::user("Hello");
        assert_eq!(format_turn(&turn), "user: Hello");

        turn.forget = true;
        assert_eq!(format_turn(&turn), "user (forgotten): Hello");
    }

    #[test]
    fn test_format_directive() {
        let bare = Directive {
            kind: DirectiveKind::OpenFile,
            payload: Default::default(),
        };
        assert_eq!(format_directive(&bare), "[openFile]");

        let mut payload = serde_json::Map::new();
        payload.insert("lang".into(), "zh".into());
        let with_payload = Directive {
            kind: DirectiveKind::SwitchLang,
            payload,
        };
        assert_eq!(format_directive(&with_payload), r#"[switchLang] {"lang":"zh"}"#);
    }
}
