use std::io::{self, BufRead, Write};

use dashboard_core::{Confirm, DeletePrompt};

/// Asks on stderr and reads the answer from stdin. Only `y`/`yes` proceed.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &DeletePrompt<'_>) -> bool {
        let mut stderr = io::stderr().lock();
        if write!(stderr, "{} [y/N] ", prompt.question())
            .and_then(|()| stderr.flush())
            .is_err()
        {
            return false;
        }

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }
}
