use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("exchange rate must be positive, got {rate}")]
    InvalidExchangeRate { rate: Decimal },
    #[error("price {price} / exchange rate {rate} is out of range")]
    Overflow { price: Decimal, rate: Decimal },
}

/// How a transaction affects the lot queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Adds a lot (`kauf`, `erträgnis`)
    Purchase,
    /// Consumes lots. Fee debits (`entgeltbelastung`) consume lots but realize no gain.
    Disposal { fee_debit: bool },
    /// Anything else, passed through untouched
    Other,
}

impl TransactionKind {
    /// Classify a lower-cased transaction type string.
    ///
    /// `verkauf` contains `kauf`, so disposals have to be recognised first.
    pub fn classify(kind: &str) -> Self {
        if kind.contains("verkauf") {
            TransactionKind::Disposal { fee_debit: false }
        } else if kind.contains("entgeltbelastung") {
            TransactionKind::Disposal { fee_debit: true }
        } else if kind.contains("kauf") || kind == "erträgnis" {
            TransactionKind::Purchase
        } else {
            TransactionKind::Other
        }
    }
}

/// A single booking for one fund, as exported by the broker
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Lower-cased transaction type, e.g. `kauf`, `verkauf`, `erträgnis`
    pub kind: String,
    pub booking_date: NaiveDate,
    /// ISIN of the fund
    pub instrument_id: String,
    pub units: Decimal,
    pub settlement_price_local: Decimal,
    pub redemption_price_local: Decimal,
    pub currency: String,
    /// Fund currency per EUR
    pub exchange_rate: Decimal,
    pub issue_surcharge_eur: Decimal,
    pub settlement_amount_eur: Decimal,
}

impl Transaction {
    pub fn classify(&self) -> TransactionKind {
        TransactionKind::classify(&self.kind)
    }

    pub fn redemption_price_eur(&self) -> Result<Decimal, PriceError> {
        self.to_eur(self.redemption_price_local)
    }

    pub fn settlement_price_eur(&self) -> Result<Decimal, PriceError> {
        self.to_eur(self.settlement_price_local)
    }

    fn to_eur(&self, local: Decimal) -> Result<Decimal, PriceError> {
        if self.exchange_rate <= Decimal::ZERO {
            return Err(PriceError::InvalidExchangeRate {
                rate: self.exchange_rate,
            });
        }
        local
            .checked_div(self.exchange_rate)
            .ok_or(PriceError::Overflow {
                price: local,
                rate: self.exchange_rate,
            })
    }
}
