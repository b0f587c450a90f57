//! Interactive supplier reading one token address per console line.

use super::{TokenCandidate, TokenSupplier};
use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub struct ConsoleSupplier {
    lines: Lines<BufReader<Stdin>>,
}

pub(crate) enum LineAction {
    Quit,
    Skip,
    Candidate(String),
}

pub(crate) fn interpret_line(line: &str) -> LineAction {
    let token = line.trim();
    if token.is_empty() {
        return LineAction::Skip;
    }
    if token == "quit" || token == "exit" {
        return LineAction::Quit;
    }
    LineAction::Candidate(token.to_string())
}

impl ConsoleSupplier {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for ConsoleSupplier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenSupplier for ConsoleSupplier {
    async fn retrieve(&mut self) -> Result<Option<Vec<TokenCandidate>>> {
        print!("Enter token address: ");
        let _ = std::io::stdout().flush();

        let Some(line) = self.lines.next_line().await? else {
            return Ok(None); // stdin closed
        };

        match interpret_line(&line) {
            LineAction::Quit => {
                tracing::info!("exiting...");
                Ok(None)
            }
            LineAction::Skip => Ok(Some(Vec::new())),
            LineAction::Candidate(token) => Ok(Some(vec![TokenCandidate::new(token)])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_and_exit_end_the_supply() {
        assert!(matches!(interpret_line("quit"), LineAction::Quit));
        assert!(matches!(interpret_line("  exit  "), LineAction::Quit));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(matches!(interpret_line(""), LineAction::Skip));
        assert!(matches!(interpret_line("   "), LineAction::Skip));
    }

    #[test]
    fn addresses_are_trimmed() {
        match interpret_line("  ABC123  ") {
            LineAction::Candidate(token) => assert_eq!(token, "ABC123"),
            _ => panic!("expected a candidate"),
        }
    }
}
