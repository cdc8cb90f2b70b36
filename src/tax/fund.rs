//! Replay of one fund's transaction history.

use super::fifo::{match_disposal, MatchError, KEST_CUTOFF};
use super::gains::GainAggregator;
use super::lots::{Lot, LotError, LotQueue};
use super::transaction::{Transaction, TransactionKind};
use super::warnings::RowError;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum FundError {
    #[error("transaction on {date} is older than the previous one on {previous}")]
    OutOfOrder {
        previous: NaiveDate,
        date: NaiveDate,
    },
    #[error("transaction for {found} pushed to processor for {expected}")]
    ForeignInstrument { expected: String, found: String },
    #[error(transparent)]
    Lot(#[from] LotError),
}

/// One output line per processed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ReportRow {
    pub booking_date: NaiveDate,
    pub instrument_id: String,
    pub kind: String,
    #[schemars(with = "String")]
    pub units: Decimal,
    pub currency: String,
    #[schemars(with = "Option<String>")]
    pub redemption_price_eur: Option<Decimal>,
    #[schemars(with = "Option<String>")]
    pub settlement_price_eur: Option<Decimal>,
    #[schemars(with = "String")]
    pub issue_surcharge_eur: Decimal,
    #[schemars(with = "String")]
    pub settlement_amount_eur: Decimal,
    #[schemars(with = "String")]
    pub gain: Decimal,
    #[schemars(with = "String")]
    pub taxable_gain: Decimal,
    #[schemars(with = "String")]
    pub exempt_gain: Decimal,
    /// Lots consumed by a disposal
    pub explanation: String,
    pub error: Option<RowError>,
}

impl ReportRow {
    fn new(tx: &Transaction) -> Self {
        ReportRow {
            booking_date: tx.booking_date,
            instrument_id: tx.instrument_id.clone(),
            kind: tx.kind.clone(),
            units: tx.units,
            currency: tx.currency.clone(),
            redemption_price_eur: None,
            settlement_price_eur: None,
            issue_surcharge_eur: tx.issue_surcharge_eur,
            settlement_amount_eur: tx.settlement_amount_eur,
            gain: Decimal::ZERO,
            taxable_gain: Decimal::ZERO,
            exempt_gain: Decimal::ZERO,
            explanation: String::new(),
            error: None,
        }
    }
}

/// Receives report rows as the processor emits them
pub trait RowSink {
    fn emit(&mut self, row: ReportRow);
}

impl RowSink for Vec<ReportRow> {
    fn emit(&mut self, row: ReportRow) {
        self.push(row);
    }
}

/// `finish` consumes the processor, so the final state is the [`FundReport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundState {
    Idle,
    Streaming,
}

/// Final state of a fund after its last transaction
#[derive(Debug, Clone, PartialEq)]
pub struct FundReport {
    pub instrument_id: String,
    pub gains: GainAggregator,
    /// Lots with units left over, oldest first
    pub open_lots: Vec<Lot>,
    pub transaction_count: usize,
    pub disposal_count: usize,
    pub error_count: usize,
}

impl FundReport {
    pub fn open_units(&self) -> Decimal {
        self.open_lots.iter().map(|l| l.remaining).sum()
    }
}

/// Processes the chronological transactions of a single fund
#[derive(Debug)]
pub struct FundProcessor {
    instrument_id: String,
    cutoff: NaiveDate,
    state: FundState,
    queue: LotQueue,
    gains: GainAggregator,
    last_date: Option<NaiveDate>,
    next_lot_id: usize,
    transaction_count: usize,
    disposal_count: usize,
    error_count: usize,
}

impl FundProcessor {
    pub fn new(instrument_id: impl Into<String>) -> Self {
        FundProcessor {
            instrument_id: instrument_id.into(),
            cutoff: KEST_CUTOFF,
            state: FundState::Idle,
            queue: LotQueue::new(),
            gains: GainAggregator::new(),
            last_date: None,
            next_lot_id: 0,
            transaction_count: 0,
            disposal_count: 0,
            error_count: 0,
        }
    }

    /// Stable-sort `transactions` by booking date and replay them
    pub fn run<S: RowSink + ?Sized>(
        instrument_id: &str,
        transactions: &[Transaction],
        sink: &mut S,
    ) -> Result<FundReport, FundError> {
        let mut sorted: Vec<&Transaction> = transactions.iter().collect();
        sorted.sort_by_key(|t| t.booking_date);

        let mut processor = FundProcessor::new(instrument_id);
        for tx in sorted {
            processor.push(tx, &mut *sink)?;
        }
        Ok(processor.finish())
    }

    #[allow(dead_code)]
    pub fn state(&self) -> FundState {
        self.state
    }

    #[cfg(test)]
    pub fn queue(&self) -> &LotQueue {
        &self.queue
    }

    #[cfg(test)]
    pub fn gains(&self) -> &GainAggregator {
        &self.gains
    }

    pub fn push<S: RowSink + ?Sized>(
        &mut self,
        tx: &Transaction,
        sink: &mut S,
    ) -> Result<(), FundError> {
        if tx.instrument_id != self.instrument_id {
            return Err(FundError::ForeignInstrument {
                expected: self.instrument_id.clone(),
                found: tx.instrument_id.clone(),
            });
        }
        if let Some(previous) = self.last_date {
            if tx.booking_date < previous {
                return Err(FundError::OutOfOrder {
                    previous,
                    date: tx.booking_date,
                });
            }
        }

        self.state = FundState::Streaming;
        self.last_date = Some(tx.booking_date);
        self.transaction_count += 1;

        let row = self.apply(tx)?;
        if row.error.is_some() {
            self.error_count += 1;
        }
        sink.emit(row);
        Ok(())
    }

    pub fn finish(self) -> FundReport {
        let report = FundReport {
            open_lots: self
                .queue
                .open_lots()
                .filter(|l| !l.is_exhausted())
                .cloned()
                .collect(),
            instrument_id: self.instrument_id,
            gains: self.gains,
            transaction_count: self.transaction_count,
            disposal_count: self.disposal_count,
            error_count: self.error_count,
        };
        log::debug!(
            "Fund {} DONE: {} transactions, {} disposals, {} errors, total gain={}, taxable={}, open units={}",
            report.instrument_id,
            report.transaction_count,
            report.disposal_count,
            report.error_count,
            report.gains.total(),
            report.gains.total_taxable(),
            report.open_units()
        );
        report
    }

    fn apply(&mut self, tx: &Transaction) -> Result<ReportRow, FundError> {
        let row = ReportRow::new(tx);
        let kind = tx.classify();

        if kind != TransactionKind::Other && tx.units < Decimal::ZERO {
            return Ok(reject(tx, row, RowError::NegativeUnits { units: tx.units }));
        }

        let prices = tx
            .redemption_price_eur()
            .and_then(|r| tx.settlement_price_eur().map(|s| (r, s)));
        let (redemption, settlement) = match prices {
            Ok(prices) => prices,
            Err(err) => return Ok(reject(tx, row, err.into())),
        };
        let mut row = ReportRow {
            redemption_price_eur: Some(redemption),
            settlement_price_eur: Some(settlement),
            ..row
        };

        match kind {
            TransactionKind::Purchase if tx.units.is_zero() => {
                log::debug!(
                    "{} {} on {}: no units, no lot opened",
                    tx.instrument_id,
                    tx.kind,
                    tx.booking_date
                );
            }
            TransactionKind::Purchase => {
                let lot = Lot::new(
                    self.next_lot_id,
                    tx.kind.clone(),
                    tx.booking_date,
                    tx.units,
                    redemption,
                );
                self.next_lot_id += 1;
                self.queue.enqueue(lot);
            }
            TransactionKind::Disposal { fee_debit } => {
                match match_disposal(&mut self.queue, tx.units, redemption, self.cutoff) {
                    Ok(matched) => {
                        self.disposal_count += 1;
                        row.explanation = matched.explanation();
                        if fee_debit {
                            log::debug!(
                                "{} fee debit on {}: gain {} not realized",
                                tx.instrument_id,
                                tx.booking_date,
                                matched.total_gain()
                            );
                        } else {
                            row.gain = matched.total_gain();
                            row.taxable_gain = matched.taxable_gain();
                            row.exempt_gain = matched.exempt_gain();
                            self.gains.add_gain(
                                tx.booking_date.year(),
                                row.gain,
                                row.taxable_gain,
                            );
                        }
                    }
                    Err(MatchError::UnmatchedDisposal {
                        available,
                        required,
                    }) => {
                        let err = RowError::UnmatchedDisposal {
                            available,
                            required,
                        };
                        return Ok(reject(tx, row, err));
                    }
                    Err(err @ MatchError::Overflow { .. }) => {
                        let err = RowError::Overflow {
                            detail: err.to_string(),
                        };
                        return Ok(reject(tx, row, err));
                    }
                    Err(MatchError::Lot(err)) => return Err(err.into()),
                }
            }
            TransactionKind::Other => {
                log::debug!(
                    "{} {} on {}: passed through",
                    tx.instrument_id,
                    tx.kind,
                    tx.booking_date
                );
            }
        }

        Ok(row)
    }
}

/// Error row for a transaction that leaves the queue and gains untouched
fn reject(tx: &Transaction, mut row: ReportRow, err: RowError) -> ReportRow {
    log::warn!(
        "{} {} on {}: {}",
        tx.instrument_id,
        tx.kind,
        tx.booking_date,
        err
    );
    row.error = Some(err);
    row
}
