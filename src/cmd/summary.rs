//! Summary command - yearly realized gains per fund and in total

use super::report::YearTotals;
use super::{format_eur, InputArgs};
use clap::Args;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Calendar year to summarize
    #[arg(short, long)]
    year: Option<i32>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct SummaryOutput {
    funds: Vec<FundSummary>,
    totals: Vec<YearTotals>,
}

#[derive(Debug, Serialize)]
struct FundSummary {
    isin: String,
    years: Vec<YearTotals>,
}

#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "ISIN")]
    isin: String,
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Gain")]
    gain: String,
    #[tabled(rename = "KESt Gain")]
    taxable_gain: String,
    #[tabled(rename = "Exempt Gain")]
    exempt_gain: String,
}

impl SummaryRow {
    fn new(isin: &str, totals: &YearTotals) -> Self {
        SummaryRow {
            isin: isin.to_string(),
            year: totals.year,
            gain: format_eur(totals.gain),
            taxable_gain: format_eur(totals.taxable_gain),
            exempt_gain: format_eur(totals.exempt_gain),
        }
    }
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.read_portfolio()?;

        let funds: Vec<FundSummary> = portfolio
            .funds
            .iter()
            .map(|f| FundSummary {
                isin: f.instrument_id.clone(),
                years: YearTotals::from_gains(&f.gains, self.year),
            })
            .filter(|f| !f.years.is_empty())
            .collect();
        let output = SummaryOutput {
            funds,
            totals: YearTotals::from_gains(&portfolio.yearly_totals(), self.year),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            self.print_table(&output);
        }
        Ok(())
    }

    fn print_table(&self, output: &SummaryOutput) {
        let year_str = self
            .year
            .map_or("All Years".to_string(), |y| y.to_string());

        if output.totals.is_empty() {
            println!("No realized gains found ({})", year_str);
            return;
        }

        println!();
        println!("REALIZED GAINS ({})", year_str);
        println!();

        let rows: Vec<SummaryRow> = output
            .funds
            .iter()
            .flat_map(|f| f.years.iter().map(|y| SummaryRow::new(&f.isin, y)))
            .chain(output.totals.iter().map(|y| SummaryRow::new("TOTAL", y)))
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }
}
