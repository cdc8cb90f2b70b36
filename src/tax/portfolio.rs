use super::fund::{FundError, FundProcessor, FundReport, ReportRow};
use super::gains::GainAggregator;
use super::transaction::Transaction;
use std::collections::HashMap;

/// Result of replaying every fund in the input
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    /// Rows ordered by fund, then chronologically within the fund
    pub rows: Vec<ReportRow>,
    /// Funds in order of first appearance in the input
    pub funds: Vec<FundReport>,
}

impl Portfolio {
    /// Yearly gains summed across all funds
    pub fn yearly_totals(&self) -> GainAggregator {
        let mut totals = GainAggregator::new();
        for fund in &self.funds {
            totals.merge(&fund.gains);
        }
        totals
    }

    #[cfg(test)]
    pub fn fund(&self, instrument_id: &str) -> Option<&FundReport> {
        self.funds.iter().find(|f| f.instrument_id == instrument_id)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|r| r.error.is_some())
    }
}

/// Group transactions by instrument id, preserving order of first appearance
pub fn group_by_fund(transactions: Vec<Transaction>) -> Vec<(String, Vec<Transaction>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Transaction>)> = Vec::new();

    for tx in transactions {
        match index.get(&tx.instrument_id) {
            Some(&i) => groups[i].1.push(tx),
            None => {
                index.insert(tx.instrument_id.clone(), groups.len());
                groups.push((tx.instrument_id.clone(), vec![tx]));
            }
        }
    }
    groups
}

/// Replay every fund independently
pub fn process(transactions: Vec<Transaction>) -> Result<Portfolio, FundError> {
    let mut rows = Vec::with_capacity(transactions.len());
    let mut funds = Vec::new();

    for (instrument_id, group) in group_by_fund(transactions) {
        let report = FundProcessor::run(&instrument_id, &group, &mut rows)?;
        funds.push(report);
    }

    let portfolio = Portfolio { rows, funds };
    let totals = portfolio.yearly_totals();
    log::info!(
        "Processed {} funds, {} transactions: total gain={}, taxable={}, errors={}",
        portfolio.funds.len(),
        portfolio.rows.len(),
        totals.total(),
        totals.total_taxable(),
        portfolio.errors().count()
    );
    Ok(portfolio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::transaction::tests::tx;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const A: &str = "LU0000000001";
    const B: &str = "DE0000000002";

    #[test]
    fn funds_are_independent() {
        let portfolio = process(vec![
            tx("kauf", "2012-01-01", A, dec!(5), dec!(10)),
            tx("verkauf", "2013-01-01", B, dec!(5), dec!(12)),
            tx("verkauf", "2013-01-01", A, dec!(5), dec!(12)),
        ])
        .unwrap();

        let a = portfolio.fund(A).unwrap();
        let b = portfolio.fund(B).unwrap();
        assert_eq!(a.gains.gain(2013), dec!(10));
        assert!(b.gains.is_empty());
        assert_eq!(b.error_count, 1);
        assert_eq!(portfolio.errors().count(), 1);
    }

    #[test]
    fn rows_ordered_by_fund_then_date() {
        let portfolio = process(vec![
            tx("kauf", "2012-05-01", A, dec!(1), dec!(10)),
            tx("kauf", "2011-01-01", B, dec!(1), dec!(10)),
            tx("kauf", "2012-01-01", A, dec!(1), dec!(10)),
            tx("verkauf", "2012-02-01", B, dec!(1), dec!(10)),
        ])
        .unwrap();

        let order: Vec<_> = portfolio
            .rows
            .iter()
            .map(|r| (r.instrument_id.as_str(), r.booking_date.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                (A, "2012-01-01".to_string()),
                (A, "2012-05-01".to_string()),
                (B, "2011-01-01".to_string()),
                (B, "2012-02-01".to_string()),
            ]
        );
        let ids: Vec<_> = portfolio.funds.iter().map(|f| f.instrument_id.as_str()).collect();
        assert_eq!(ids, vec![A, B]);
    }

    #[test]
    fn yearly_totals_span_funds() {
        let portfolio = process(vec![
            tx("kauf", "2010-01-01", A, dec!(10), dec!(10)),
            tx("kauf", "2012-01-01", B, dec!(10), dec!(10)),
            tx("verkauf", "2013-01-01", A, dec!(10), dec!(11)),
            tx("verkauf", "2013-06-01", B, dec!(10), dec!(12)),
        ])
        .unwrap();

        let totals = portfolio.yearly_totals();
        assert_eq!(totals.gain(2013), dec!(30));
        assert_eq!(totals.taxable(2013), dec!(20));
        assert_eq!(totals.exempt(2013), dec!(10));
    }

    #[test]
    fn empty_input_yields_empty_portfolio() {
        let portfolio = process(Vec::new()).unwrap();
        assert!(portfolio.rows.is_empty());
        assert!(portfolio.funds.is_empty());
        assert_eq!(portfolio.yearly_totals().total(), Decimal::ZERO);
    }
}
