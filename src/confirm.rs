//! Confirmation gate for destructive commands.
//!
//! A command that mutates remote state describes its prompt as a
//! [`Confirmation`]. [`gate`] either lets it through because `--confirm` was
//! given, or asks the injected [`Confirm`] capability. The prompt is the only
//! blocking wait on the user in the whole run; there is no timeout.

use std::io::BufRead;

use crate::console::Console;

/// What to ask before a destructive command, and what to say when the
/// question is skipped.
#[derive(Debug, Clone)]
pub struct Confirmation {
    /// Question shown to the user.
    pub prompt: String,
    /// Verbose note printed when `--confirm` suppressed the question.
    pub suppressed_note: String,
}

/// Asks the user a yes/no question.
pub trait Confirm {
    /// Returns `true` if the user answered yes.
    fn confirm(&mut self, console: &mut Console, message: &str) -> std::io::Result<bool>;
}

/// Reads the answer from standard input. Defaults to "no".
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, console: &mut Console, message: &str) -> std::io::Result<bool> {
        console.prompt(&format!("{message} [y/N] "))?;
        let mut input = String::new();
        std::io::stdin().lock().read_line(&mut input)?;
        Ok(is_affirmative(&input))
    }
}

/// `y` or `yes`, any case, surrounding whitespace ignored.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Decides whether a destructive command may proceed.
///
/// `bypass` is the `--confirm` flag.
pub fn gate(
    confirmation: &Confirmation,
    bypass: bool,
    confirmer: &mut dyn Confirm,
    console: &mut Console,
) -> std::io::Result<bool> {
    if bypass {
        console.verbose(&confirmation.suppressed_note);
        return Ok(true);
    }
    confirmer.confirm(console, &confirmation.prompt)
}
