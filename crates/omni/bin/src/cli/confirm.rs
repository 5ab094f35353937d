use std::io::{self, BufRead, Write};

use versa_omni_bridge::Confirmation;

/// Asks the operator on the terminal. Anything but `y` or `yes` declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirmation for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> io::Result<bool> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            let mut stderr = io::stderr().lock();
            write!(stderr, "{prompt} [y/N] ")?;
            stderr.flush()?;

            let mut answer = String::new();
            io::stdin().lock().read_line(&mut answer)?;
            Ok(is_yes(&answer))
        })
        .await
        .map_err(io::Error::other)?
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
