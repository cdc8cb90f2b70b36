//! Lots command - purchase lots still open after the replay

use super::{format_eur, format_quantity, InputArgs};
use crate::tax::{Lot, KEST_CUTOFF};
use clap::Args;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct LotsCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Only show lots of this fund (ISIN)
    #[arg(short, long)]
    isin: Option<String>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct FundLots<'a> {
    isin: &'a str,
    lots: &'a [Lot],
}

#[derive(Debug, Clone, Tabled)]
struct LotRow {
    #[tabled(rename = "ISIN")]
    isin: String,
    #[tabled(rename = "#")]
    id: usize,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Acquired")]
    acquired: String,
    #[tabled(rename = "Units")]
    initial_units: String,
    #[tabled(rename = "Open")]
    remaining: String,
    #[tabled(rename = "Price €")]
    price: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

impl LotsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let portfolio = self.input.read_portfolio()?;

        let funds: Vec<FundLots> = portfolio
            .funds
            .iter()
            .filter(|f| {
                self.isin
                    .as_ref()
                    .is_none_or(|isin| f.instrument_id.eq_ignore_ascii_case(isin))
            })
            .filter(|f| !f.open_lots.is_empty())
            .map(|f| FundLots {
                isin: &f.instrument_id,
                lots: &f.open_lots,
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&funds)?);
        } else {
            self.print_table(&funds);
        }
        Ok(())
    }

    fn print_table(&self, funds: &[FundLots]) {
        if funds.is_empty() {
            println!("No open lots found matching filters");
            return;
        }

        let rows: Vec<LotRow> = funds
            .iter()
            .flat_map(|f| {
                f.lots.iter().map(|lot| LotRow {
                    isin: f.isin.to_string(),
                    id: lot.id,
                    kind: lot.kind.clone(),
                    acquired: lot.acquired.format("%Y-%m-%d").to_string(),
                    initial_units: format_quantity(lot.initial_units),
                    remaining: format_quantity(lot.remaining),
                    price: format!("{:.4}", lot.redemption_price_eur.round_dp(4)),
                    cost: lot
                        .cost_eur()
                        .map(format_eur)
                        .unwrap_or_else(|| "-".to_string()),
                    status: if lot.acquired >= KEST_CUTOFF {
                        "KESt"
                    } else {
                        "Exempt"
                    },
                })
            })
            .collect();

        println!();
        println!("OPEN LOTS");
        println!();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }
}
