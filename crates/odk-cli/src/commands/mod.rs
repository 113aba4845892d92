//! Command handlers for odk-cli.
//!
//! Shared output and prompt helpers live here. Command-specific logic lives
//! in the submodules.

pub mod orders;
pub mod tickets;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use odk_client::OrderService;
use odk_workflow::{Notice, NoticeLevel};

/// `odk health`: print the service's health body.
pub async fn health<S: OrderService + ?Sized>(svc: &S) -> Result<()> {
    let body = svc
        .health()
        .await
        .map_err(|e| anyhow::anyhow!("health check failed: {}", e.user_message()))?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Print workflow notices. Errors go to stderr.
pub fn print_notices(notices: &[Notice]) {
    for n in notices {
        match n.level {
            NoticeLevel::Info => println!("note: {}", n.message),
            NoticeLevel::Success => println!("{}", n.message),
            NoticeLevel::Error => eprintln!("error: {}", n.message),
        }
    }
}

/// Print `label` and read one trimmed line. EOF reads as an empty answer.
pub fn prompt_line(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush().context("stdout flush failed")?;
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read stdin")?;
    Ok(line.trim().to_string())
}

/// Only an explicit `y` / `yes` confirms.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
