use std::io::{self, Write};

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::app::RunResult;
use crate::pipeline::{ProgressEvent, ProgressSink, StatusCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Interactive,
    Verbose,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Terse mode: a single progress bar over the remaining rows.
pub struct BarOutput {
    bar: ProgressBar,
}

impl BarOutput {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    pub fn with_bar(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} ETA: {eta}",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }
}

impl Default for BarOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarOutput {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started {
                command,
                total,
                start,
            } => {
                self.bar.set_length(total as u64);
                self.bar.set_position(start as u64);
                self.bar.set_message(command.to_string());
            }
            ProgressEvent::Row(row) => {
                self.bar.set_position(row.index as u64 + 1);
                if !row.category.is_success() {
                    self.bar.set_message(format!("{}: {}", row.key, row.status));
                }
            }
            ProgressEvent::Finished { .. } => self.bar.finish_and_clear(),
        }
    }
}

/// Verbose mode: one colorized line per row.
pub struct VerboseOutput;

impl ProgressSink for VerboseOutput {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started {
                command,
                total,
                start,
            } => {
                if start > 0 {
                    println!(
                        "{}",
                        format!("{command}: resuming at row {} of {total}", start + 1).cyan()
                    );
                } else {
                    println!("{}", format!("{command}: processing {total} rows").cyan());
                }
            }
            ProgressEvent::Row(row) => {
                let width = row.total.to_string().len();
                let counter = format!("[{:>width$}/{}]", row.index + 1, row.total);
                let status = match row.category {
                    StatusCategory::Success => row.status.green(),
                    StatusCategory::RecoverableError => row.status.yellow(),
                    StatusCategory::FatalError => row.status.red(),
                };
                if row.detail.is_empty() {
                    println!("{} {}: {status}", counter.dark_grey(), row.key);
                } else {
                    println!(
                        "{} {}: {status} ({})",
                        counter.dark_grey(),
                        row.key,
                        row.detail
                    );
                }
            }
            ProgressEvent::Finished { processed } => {
                println!("{}", format!("processed {processed} rows").cyan());
            }
        }
    }
}

pub fn print_summary(result: &RunResult) {
    let summary = &result.summary;
    println!("{}", format!("{} summary", result.command).cyan().bold());
    println!("  report:  {}", result.input);
    println!("  results: {}", result.batch.result_path);
    if result.batch.start > 0 {
        println!("  resumed at row {}", result.batch.start + 1);
    }
    println!(
        "  {}",
        format!("success: {}", summary.success).green()
    );
    println!(
        "  {}",
        format!("recoverable errors: {}", summary.recoverable).yellow()
    );
    println!("  {}", format!("errors: {}", summary.fatal).red());
    for (status, count) in &summary.by_status {
        println!("    {status}: {count}");
    }
}
