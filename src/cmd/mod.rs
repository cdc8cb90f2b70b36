pub mod lots;
pub mod report;
pub mod schema;
pub mod summary;
pub mod validate;

use crate::input::{self, Locale, ParseOptions};
use crate::tax::{self, Portfolio, Transaction};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Input file options shared by every command that reads transactions
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Broker CSV export. Reads from stdin if not specified.
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Field delimiter of the export
    #[arg(short, long, default_value_t = ';')]
    delimiter: char,

    /// Number format used in the export
    #[arg(short, long, value_enum, default_value_t = LocaleArg::De)]
    locale: LocaleArg,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LocaleArg {
    /// 1.234,56
    #[default]
    De,
    /// 1234.56
    Iso,
}

impl From<LocaleArg> for Locale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::De => Locale::German,
            LocaleArg::Iso => Locale::Iso,
        }
    }
}

impl InputArgs {
    fn options(&self) -> anyhow::Result<ParseOptions> {
        if !self.delimiter.is_ascii() {
            anyhow::bail!("delimiter must be a single ASCII character");
        }
        Ok(ParseOptions {
            delimiter: self.delimiter as u8,
            locale: self.locale.into(),
        })
    }

    /// Read the export and replay every fund
    pub fn read_portfolio(&self) -> anyhow::Result<Portfolio> {
        let transactions = read_transactions(&self.file, self.options()?)?;
        Ok(tax::process(transactions)?)
    }
}

/// Read transactions from a CSV file (or stdin with "-")
pub fn read_transactions(path: &Path, options: ParseOptions) -> anyhow::Result<Vec<Transaction>> {
    if path.as_os_str() == "-" {
        read_from_stdin(options)
    } else {
        let reader = BufReader::new(File::open(path)?);
        Ok(input::read_transactions(reader, options)?)
    }
}

fn read_from_stdin(options: ParseOptions) -> anyhow::Result<Vec<Transaction>> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    Ok(input::read_transactions(io::Cursor::new(buffer), options)?)
}

pub fn format_eur(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-€{:.2}", amount.abs())
    } else {
        format!("€{:.2}", amount)
    }
}

pub fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
