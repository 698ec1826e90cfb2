//! EULA acceptance
//!
//! Interactive runs ask on the console; scheduled runs answer every prompt
//! from configuration.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};

/// How unaccepted EULAs are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EulaPolicy {
    /// Ask on the console for each update
    #[default]
    Prompt,
    /// Accept every EULA without asking
    Accept,
    /// Decline every EULA without asking
    Decline,
}

impl EulaPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EulaPolicy::Prompt => "prompt",
            EulaPolicy::Accept => "accept",
            EulaPolicy::Decline => "decline",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prompt" => Some(EulaPolicy::Prompt),
            "accept" => Some(EulaPolicy::Accept),
            "decline" => Some(EulaPolicy::Decline),
            _ => None,
        }
    }
}

/// Source of yes/no answers for EULA prompts
pub trait EulaPrompt {
    /// Returns true when the user accepts the license for `title`
    fn confirm(&mut self, title: &str, eula_text: Option<&str>) -> bool;

    /// True when answers come from configuration rather than a person
    fn is_automatic(&self) -> bool {
        false
    }
}

/// Only a bare `y`/`Y` accepts
pub fn is_acceptance(response: &str) -> bool {
    response.trim().eq_ignore_ascii_case("y")
}

/// Reads answers from a line-oriented input
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stderr> {
    /// Reads stdin, writes to stderr so stdout stays machine-readable
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, title: &str, eula_text: Option<&str>) -> io::Result<bool> {
        writeln!(self.output, "\nLicense agreement for: {}", title)?;
        writeln!(self.output, "{}", "-".repeat(60))?;
        writeln!(
            self.output,
            "{}",
            eula_text.unwrap_or("(no license text provided)")
        )?;
        writeln!(self.output, "{}", "-".repeat(60))?;
        write!(self.output, "Accept? [y/N]: ")?;
        self.output.flush()?;

        let mut response = String::new();
        self.input.read_line(&mut response)?;
        Ok(is_acceptance(&response))
    }
}

impl<R: BufRead, W: Write> EulaPrompt for ConsolePrompt<R, W> {
    fn confirm(&mut self, title: &str, eula_text: Option<&str>) -> bool {
        // closed or broken stdin declines
        self.ask(title, eula_text).unwrap_or(false)
    }
}

/// Fixed answer for unattended runs
#[derive(Debug, Clone, Copy)]
pub struct AutoAnswer {
    accept: bool,
}

impl AutoAnswer {
    pub fn accept() -> Self {
        Self { accept: true }
    }

    pub fn decline() -> Self {
        Self { accept: false }
    }
}

impl EulaPrompt for AutoAnswer {
    fn confirm(&mut self, _title: &str, _eula_text: Option<&str>) -> bool {
        self.accept
    }

    fn is_automatic(&self) -> bool {
        true
    }
}

/// Build the prompt matching `policy`
pub fn prompt_for_policy(policy: EulaPolicy) -> Box<dyn EulaPrompt> {
    match policy {
        EulaPolicy::Prompt => Box::new(ConsolePrompt::stdio()),
        EulaPolicy::Accept => Box::new(AutoAnswer::accept()),
        EulaPolicy::Decline => Box::new(AutoAnswer::decline()),
    }
}
