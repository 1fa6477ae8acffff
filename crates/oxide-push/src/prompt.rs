//! Interactive answers on the terminal.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use oxide_sqlgen::schema::{AmbiguousChange, Decision};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::driver::BoxFuture;
use crate::engine::{Confirm, Resolution, Resolver};

/// Reads answers from standard input. End of input cancels.
///
/// Clones share one buffered reader, so a clone can serve as resolver and
/// another as confirmation without losing input.
#[derive(Clone)]
pub struct TerminalPrompt {
    lines: Arc<Mutex<Lines<BufReader<Stdin>>>>,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompt {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines())),
        }
    }

    async fn ask(&self, question: &str) -> Option<String> {
        print!("{question} ");
        let _ = std::io::stdout().flush();
        self.lines
            .lock()
            .await
            .next_line()
            .await
            .ok()
            .flatten()
            .map(|l| l.trim().to_ascii_lowercase())
    }

    async fn yes_no(&self, question: &str) -> bool {
        matches!(self.ask(question).await.as_deref(), Some("y" | "yes"))
    }
}

/// Parses one answer to a rename question.
fn parse_decision(answer: &str) -> Option<Decision> {
    match answer {
        "r" | "rename" => Some(Decision::Rename),
        "c" | "create" | "a" | "add" => Some(Decision::AddAndDrop),
        _ => None,
    }
}

const CHOICES: &str = "[r]ename / [c]reate, [q]uit:";

fn question(change: &AmbiguousChange) -> String {
    match change {
        AmbiguousChange::Table { from, to } => {
            format!("Is table `{to}` created or renamed from `{from}`? {CHOICES}")
        }
        AmbiguousChange::Column { table, from, to } => {
            format!("Is column `{table}.{to}` created or renamed from `{from}`? {CHOICES}")
        }
    }
}

impl Resolver for TerminalPrompt {
    fn resolve<'a>(&'a mut self, changes: &'a [AmbiguousChange]) -> BoxFuture<'a, Resolution> {
        Box::pin(async move {
            let mut decisions = BTreeMap::new();
            for change in changes {
                let decision = loop {
                    let Some(answer) = self.ask(&question(change)).await else {
                        return Resolution::Cancelled;
                    };
                    if answer == "q" || answer == "quit" {
                        return Resolution::Cancelled;
                    }
                    if let Some(decision) = parse_decision(&answer) {
                        break decision;
                    }
                };
                decisions.insert(change.clone(), decision);
            }
            Resolution::Decided(decisions)
        })
    }
}

impl Confirm for TerminalPrompt {
    fn on_destructive<'a>(&'a mut self, descriptions: &'a [String]) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            println!("\nThe following changes can lose data:");
            for description in descriptions {
                println!("  - {description}");
            }
            self.yes_no("Apply them? [y/N]").await
        })
    }

    fn on_statements<'a>(&'a mut self, statements: &'a [String]) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            println!("\nStatements to execute:");
            for sql in statements {
                println!("{sql};");
            }
            self.yes_no("Execute? [y/N]").await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_accept_short_and_long_forms() {
        assert_eq!(parse_decision("r"), Some(Decision::Rename));
        assert_eq!(parse_decision("rename"), Some(Decision::Rename));
        assert_eq!(parse_decision("c"), Some(Decision::AddAndDrop));
        assert_eq!(parse_decision("maybe"), None);
    }

    #[test]
    fn questions_name_both_sides() {
        let q = question(&AmbiguousChange::Column {
            table: "users".into(),
            from: "email".into(),
            to: "mail".into(),
        });
        assert!(q.contains("`users.mail`"));
        assert!(q.contains("`email`"));
    }
}
