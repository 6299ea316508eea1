//! Confirm-destructive-action capability: a trait standing in for the
//! original's blocking `input()` prompts, so the Worker Pool never calls
//! stdin directly. `StdinConfirm` is the CLI's real implementation; tests
//! use a canned responder instead.

use async_trait::async_trait;
use std::io::Write;

#[async_trait]
pub trait ConfirmAction: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

pub struct StdinConfirm;

#[async_trait]
impl ConfirmAction for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        let _ = std::io::stdout().flush();
        let mut input = String::new();
        if std::io::stdin().read_line(&mut input).is_err() {
            return false;
        }
        matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[cfg(test)]
pub struct AlwaysConfirm(pub bool);

#[cfg(test)]
#[async_trait]
impl ConfirmAction for AlwaysConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}
