//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init command and shared utilities (open_store, load_settings)
//! - `budget` - Local reports over the data file (classify, budget, goals)
//! - `remote` - Commands that talk to a running API server
//! - `serve` - Web server command

pub mod budget;
pub mod core;
pub mod remote;
pub mod serve;

// Re-export command functions for main.rs
pub use budget::*;
pub use core::*;
pub use remote::*;
pub use serve::*;

/// Format an amount with thousands separators, no decimals when whole
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let rounded = (amount.abs() * 100.0).round() / 100.0;
    let whole = rounded.trunc() as u64;
    let cents = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative && (whole > 0 || cents > 0) { "-" } else { "" };
    if cents == 0 {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{:02}", sign, grouped, cents)
    }
}
