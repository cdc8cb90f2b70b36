//! Validate command - surface data quality issues without generating full reports

use super::{format_quantity, InputArgs};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: String,
    date: String,
    isin: String,
    kind: String,
    units: String,
    message: String,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.read_portfolio()?;

        let issues: Vec<ValidationIssue> = portfolio
            .errors()
            .filter_map(|r| {
                r.error.as_ref().map(|err| ValidationIssue {
                    issue_type: err.name().to_string(),
                    date: r.booking_date.format("%Y-%m-%d").to_string(),
                    isin: r.instrument_id.clone(),
                    kind: r.kind.clone(),
                    units: format_quantity(r.units),
                    message: err.to_string(),
                })
            })
            .collect();

        if self.json {
            self.print_json(&issues)?;
        } else {
            self.print_text(&issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, issues: &[ValidationIssue]) {
        println!();
        println!("VALIDATION RESULTS");
        println!();

        if issues.is_empty() {
            println!("\u{2713} No issues found.");
            return;
        }

        println!("\u{26A0} {} issue(s) found:", issues.len());
        println!();
        for (i, issue) in issues.iter().enumerate() {
            println!(
                "  {}. [{}] {} {} of {} units of {}",
                i + 1,
                issue.issue_type,
                issue.date,
                issue.kind,
                issue.units,
                issue.isin
            );
            println!("     {}", issue.message);
            println!();
        }
    }

    fn print_json(&self, issues: &[ValidationIssue]) -> anyhow::Result<()> {
        let output = ValidationOutput {
            issue_count: issues.len(),
            issues: issues.to_vec(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
