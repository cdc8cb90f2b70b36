//! Report command - one row per transaction with realized gains

use super::{format_eur, format_quantity, InputArgs};
use crate::tax::{GainAggregator, ReportRow};
use chrono::Datelike;
use clap::Args;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::io;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Only show transactions of this fund (ISIN)
    #[arg(short, long)]
    isin: Option<String>,

    /// Only show transactions booked in this calendar year
    #[arg(short, long)]
    year: Option<i32>,

    /// Add a column with the tax-exempt part of each gain
    #[arg(long)]
    exempt: bool,

    /// Add a column describing which lots each disposal consumed
    #[arg(long)]
    explain: bool,

    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

/// JSON report output
#[derive(Debug, Serialize, JsonSchema)]
pub struct ReportOutput {
    pub rows: Vec<ReportRow>,
    pub years: Vec<YearTotals>,
}

/// Gains realized in one calendar year
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct YearTotals {
    pub year: i32,
    #[schemars(with = "String")]
    pub gain: Decimal,
    #[schemars(with = "String")]
    pub taxable_gain: Decimal,
    #[schemars(with = "String")]
    pub exempt_gain: Decimal,
}

impl YearTotals {
    pub fn from_gains(gains: &GainAggregator, year: Option<i32>) -> Vec<YearTotals> {
        gains
            .years()
            .filter(|y| year.is_none_or(|wanted| *y == wanted))
            .map(|y| YearTotals {
                year: y,
                gain: gains.gain(y),
                taxable_gain: gains.taxable(y),
                exempt_gain: gains.exempt(y),
            })
            .collect()
    }
}

/// Flat CSV record for a report row
#[derive(Debug, Serialize)]
struct ReportCsvRecord {
    booking_date: String,
    isin: String,
    kind: String,
    units: String,
    currency: String,
    redemption_price_eur: String,
    settlement_price_eur: String,
    issue_surcharge_eur: String,
    settlement_amount_eur: String,
    gain: String,
    taxable_gain: String,
    exempt_gain: String,
    explanation: String,
    error: String,
}

impl From<&ReportRow> for ReportCsvRecord {
    fn from(r: &ReportRow) -> Self {
        ReportCsvRecord {
            booking_date: r.booking_date.format("%Y-%m-%d").to_string(),
            isin: r.instrument_id.clone(),
            kind: r.kind.clone(),
            units: r.units.normalize().to_string(),
            currency: r.currency.clone(),
            redemption_price_eur: r
                .redemption_price_eur
                .map(|p| p.round_dp(4).to_string())
                .unwrap_or_default(),
            settlement_price_eur: r
                .settlement_price_eur
                .map(|p| p.round_dp(4).to_string())
                .unwrap_or_default(),
            issue_surcharge_eur: r.issue_surcharge_eur.round_dp(2).to_string(),
            settlement_amount_eur: r.settlement_amount_eur.round_dp(2).to_string(),
            gain: r.gain.round_dp(2).to_string(),
            taxable_gain: r.taxable_gain.round_dp(2).to_string(),
            exempt_gain: r.exempt_gain.round_dp(2).to_string(),
            explanation: r.explanation.clone(),
            error: r.error.as_ref().map(ToString::to_string).unwrap_or_default(),
        }
    }
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.read_portfolio()?;

        let rows: Vec<ReportRow> = portfolio
            .rows
            .iter()
            .filter(|r| {
                self.isin
                    .as_ref()
                    .is_none_or(|isin| r.instrument_id.eq_ignore_ascii_case(isin))
            })
            .filter(|r| self.year.is_none_or(|y| r.booking_date.year() == y))
            .cloned()
            .collect();

        let gains = match &self.isin {
            Some(isin) => portfolio
                .funds
                .iter()
                .filter(|f| f.instrument_id.eq_ignore_ascii_case(isin))
                .fold(GainAggregator::new(), |mut acc, f| {
                    acc.merge(&f.gains);
                    acc
                }),
            None => portfolio.yearly_totals(),
        };

        if self.json {
            let output = ReportOutput {
                years: YearTotals::from_gains(&gains, self.year),
                rows,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        } else if self.csv {
            self.write_csv(&rows)
        } else {
            self.print_table(&rows, &gains);
            Ok(())
        }
    }

    fn write_csv(&self, rows: &[ReportRow]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for row in rows {
            wtr.serialize(ReportCsvRecord::from(row))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn print_table(&self, rows: &[ReportRow], gains: &GainAggregator) {
        if rows.is_empty() {
            println!("No transactions found matching filters");
            return;
        }

        let mut builder = Builder::default();
        let mut header = vec![
            "Date",
            "ISIN",
            "Type",
            "Units",
            "Redemption €",
            "Settlement €",
            "Amount €",
            "Gain",
            "KESt Gain",
        ];
        if self.exempt {
            header.push("Exempt Gain");
        }
        if self.explain {
            header.push("Matched Lots");
        }
        builder.push_record(header);

        for r in rows {
            let mut record = vec![
                r.booking_date.format("%Y-%m-%d").to_string(),
                r.instrument_id.clone(),
                r.kind.clone(),
                format_quantity(r.units),
                r.redemption_price_eur
                    .map(|p| format!("{:.4}", p.round_dp(4)))
                    .unwrap_or_else(|| "-".to_string()),
                r.settlement_price_eur
                    .map(|p| format!("{:.4}", p.round_dp(4)))
                    .unwrap_or_else(|| "-".to_string()),
                format_eur(r.settlement_amount_eur),
            ];
            match &r.error {
                Some(err) => {
                    record.push("ERROR".to_string());
                    record.push(err.name().to_string());
                }
                None => {
                    record.push(format_eur(r.gain));
                    record.push(format_eur(r.taxable_gain));
                }
            }
            if self.exempt {
                record.push(format_eur(r.exempt_gain));
            }
            if self.explain {
                record.push(match &r.error {
                    Some(err) => err.to_string(),
                    None => r.explanation.clone(),
                });
            }
            builder.push_record(record);
        }

        let table = builder
            .build()
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);

        let years = YearTotals::from_gains(gains, self.year);
        if !years.is_empty() {
            println!();
            for y in years {
                println!(
                    "{}: gain {}, KESt gain {}, exempt {}",
                    y.year,
                    format_eur(y.gain),
                    format_eur(y.taxable_gain),
                    format_eur(y.exempt_gain)
                );
            }
        }
    }
}
