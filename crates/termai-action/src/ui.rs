//! User-facing status lines. Diagnostics go through `tracing`; these are
//! the messages the person at the terminal reads.
//!
//! Lines are coloured only when the stream is a terminal.

use std::io::IsTerminal;

use crossterm::style::{Color, Stylize};

pub fn message(text: &str) {
    println!("{}", text);
}

pub fn error(text: &str) {
    let tty = std::io::stderr().is_terminal();
    eprintln!("{}", paint(&format!("error: {}", text), Color::Red, tty));
}

pub fn warn(text: &str) {
    let tty = std::io::stderr().is_terminal();
    eprintln!("{}", paint(&format!("warning: {}", text), Color::Yellow, tty));
}

pub fn command(text: &str) {
    let tty = std::io::stdout().is_terminal();
    println!("{}", paint(&format!("$ {}", text), Color::Cyan, tty));
}

pub fn status(text: &str) {
    let tty = std::io::stdout().is_terminal();
    println!("{}", paint(&format!(":: {}", text), Color::Green, tty));
}

pub fn hint(text: &str) {
    let tty = std::io::stdout().is_terminal();
    println!("{}", paint(&format!("hint: {}", text), Color::Yellow, tty));
}

fn paint(text: &str, color: Color, enabled: bool) -> String {
    if enabled {
        text.with(color).to_string()
    } else {
        text.to_string()
    }
}
