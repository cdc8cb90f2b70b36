//! Reading of broker transaction exports.
//!
//! The export is a delimited file with one booking per line. Numbers and dates
//! are written in the broker's locale, so every field is read as text and
//! converted explicitly here. Nothing past this module parses strings.

use crate::tax::Transaction;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("line {line}: invalid {column} '{value}'")]
    InvalidField {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Number format of the export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// `1.234,56`
    #[default]
    German,
    /// `1234.56`
    Iso,
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub delimiter: u8,
    pub locale: Locale,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            delimiter: b';',
            locale: Locale::German,
        }
    }
}

pub const CSV_COLUMNS: &[&str] = &[
    "Transaktion",
    "Buchungsdatum",
    "ISIN",
    "Anteile",
    "Abrechnungspreis",
    "Rücknahmepreis",
    "Fondswährung",
    "Devisenkurs",
    "Ausgabeaufschlag in EUR",
    "Abrechnungsbetrag in EUR",
];

/// Columns exactly as the broker names them
#[derive(Debug, Clone, Deserialize)]
struct TransactionRecord {
    #[serde(rename = "Transaktion")]
    kind: String,
    #[serde(rename = "Buchungsdatum")]
    booking_date: String,
    #[serde(rename = "ISIN")]
    isin: String,
    #[serde(rename = "Anteile")]
    units: String,
    #[serde(rename = "Abrechnungspreis")]
    settlement_price: String,
    #[serde(rename = "Rücknahmepreis")]
    redemption_price: String,
    #[serde(rename = "Fondswährung")]
    currency: String,
    #[serde(rename = "Devisenkurs")]
    exchange_rate: String,
    #[serde(rename = "Ausgabeaufschlag in EUR", default)]
    issue_surcharge_eur: String,
    #[serde(rename = "Abrechnungsbetrag in EUR")]
    settlement_amount_eur: String,
}

/// Transfers, mergers and distributions without reinvestment never reach the lot queues
pub fn is_ignored(kind: &str) -> bool {
    kind == "erträgnis ohne wiederanlage"
        || kind.contains("zugang")
        || kind.contains("merge")
        || kind.contains("übertrag")
}

/// Read transactions in file order, dropping ignored types
pub fn read_transactions<R: Read>(
    reader: R,
    options: ParseOptions,
) -> Result<Vec<Transaction>, InputError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut transactions = Vec::new();
    let mut skipped = 0usize;
    let mut raw = csv::StringRecord::new();

    while rdr.read_record(&mut raw)? {
        let line = raw.position().map_or(0, |p| p.line());
        let record: TransactionRecord = raw.deserialize(Some(&headers))?;
        let kind = record.kind.to_lowercase();
        if is_ignored(&kind) {
            log::debug!("line {}: skipping '{}' for {}", line, kind, record.isin);
            skipped += 1;
            continue;
        }
        transactions.push(parse_record(record, kind, line, options.locale)?);
    }

    log::info!(
        "Read {} transactions ({} skipped)",
        transactions.len(),
        skipped
    );
    Ok(transactions)
}

fn parse_record(
    record: TransactionRecord,
    kind: String,
    line: u64,
    locale: Locale,
) -> Result<Transaction, InputError> {
    let issue_surcharge_eur = if record.issue_surcharge_eur.is_empty() {
        Decimal::ZERO
    } else {
        parse_decimal(&record.issue_surcharge_eur, locale)
            .ok_or_else(|| invalid(line, "Ausgabeaufschlag in EUR", &record.issue_surcharge_eur))?
    };

    Ok(Transaction {
        kind,
        booking_date: parse_date(&record.booking_date)
            .ok_or_else(|| invalid(line, "Buchungsdatum", &record.booking_date))?,
        instrument_id: non_empty(record.isin, line, "ISIN")?,
        units: number(&record.units, line, "Anteile", locale)?,
        settlement_price_local: number(&record.settlement_price, line, "Abrechnungspreis", locale)?,
        redemption_price_local: number(&record.redemption_price, line, "Rücknahmepreis", locale)?,
        currency: record.currency,
        exchange_rate: number(&record.exchange_rate, line, "Devisenkurs", locale)?,
        issue_surcharge_eur,
        settlement_amount_eur: number(
            &record.settlement_amount_eur,
            line,
            "Abrechnungsbetrag in EUR",
            locale,
        )?,
    })
}

fn number(value: &str, line: u64, column: &'static str, locale: Locale) -> Result<Decimal, InputError> {
    parse_decimal(value, locale).ok_or_else(|| invalid(line, column, value))
}

fn non_empty(value: String, line: u64, column: &'static str) -> Result<String, InputError> {
    if value.is_empty() {
        Err(invalid(line, column, &value))
    } else {
        Ok(value)
    }
}

fn invalid(line: u64, column: &'static str, value: &str) -> InputError {
    InputError::InvalidField {
        line,
        column,
        value: value.to_string(),
    }
}

/// Parse a decimal written in `locale`
pub fn parse_decimal(s: &str, locale: Locale) -> Option<Decimal> {
    let s = s.trim().trim_start_matches('+');
    if s.is_empty() {
        return None;
    }
    let normalized = match locale {
        Locale::German => s.replace('.', "").replace(',', "."),
        Locale::Iso => s.replace(',', ""),
    };
    Decimal::from_str(&normalized).ok()
}

/// Parse `dd.mm.yyyy` or `yyyy-mm-dd`
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}
