//! Terminal prompts: yes/no confirmation and masked flag input.

use std::io::{self, BufRead, Write};

use htb_core::Prompter;

/// Prompter reading from the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str) -> bool {
        eprint!("{question} [y/N] ");
        if io::stderr().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => parse_answer(&line),
            Err(_) => false,
        }
    }

    fn read_secret(&self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt)
    }
}

/// Only an explicit yes counts; anything else (including EOF) is no.
pub fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
