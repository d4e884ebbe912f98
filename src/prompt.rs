use std::io::{BufRead, Write};

/// Human confirmation step in front of destructive or unverified actions.
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

/// Asks on the terminal; `assume_yes` skips the question.
pub struct TerminalConfirm {
    assume_yes: bool,
}

impl TerminalConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{question} [y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(_) => is_affirmative(&line),
            Err(_) => false,
        }
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "si" | "sí"
    )
}

#[cfg(test)]
pub struct FixedAnswer(pub bool);

#[cfg(test)]
impl Confirm for FixedAnswer {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}
