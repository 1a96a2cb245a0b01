//! Interactive confirmation seam

use crate::core::error::{RailError, RailResult};
use std::io::{self, BufRead, Write};

/// Human interaction the release flow needs
pub trait Prompt {
  /// Ask a yes/no question
  fn confirm(&self, message: &str, default: bool) -> RailResult<bool>;

  /// Pick one of `choices`, returning its index
  fn select(&self, message: &str, choices: &[String]) -> RailResult<usize>;
}

/// Prompt reading answers from stdin
pub struct TerminalPrompt;

impl TerminalPrompt {
  fn read_line(&self) -> RailResult<Option<String>> {
    io::stdout().flush()?;
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
      return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
  }
}

impl Prompt for TerminalPrompt {
  fn confirm(&self, message: &str, default: bool) -> RailResult<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
      print!("❓ {} {} ", message, hint);
      let Some(answer) = self.read_line()? else {
        return Ok(default);
      };
      match parse_confirmation(&answer, default) {
        Some(value) => return Ok(value),
        None => println!("   Please answer y or n."),
      }
    }
  }

  fn select(&self, message: &str, choices: &[String]) -> RailResult<usize> {
    if choices.is_empty() {
      return Err(RailError::message(format!("Nothing to choose for: {}", message)));
    }

    println!("❓ {}", message);
    for (i, choice) in choices.iter().enumerate() {
      println!("   {}) {}", i + 1, choice);
    }

    loop {
      print!("   Choice [1-{}]: ", choices.len());
      let Some(answer) = self.read_line()? else {
        return Err(RailError::UserAborted);
      };
      match answer.parse::<usize>() {
        Ok(n) if (1..=choices.len()).contains(&n) => return Ok(n - 1),
        _ => println!("   Enter a number between 1 and {}.", choices.len()),
      }
    }
  }
}

fn parse_confirmation(answer: &str, default: bool) -> Option<bool> {
  match answer.to_ascii_lowercase().as_str() {
    "" => Some(default),
    "y" | "yes" => Some(true),
    "n" | "no" => Some(false),
    _ => None,
  }
}
