use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LotError {
    #[error("no open lots left in the queue")]
    EmptyQueue,
    #[error("lot {id} still has {remaining} units open")]
    LotNotExhausted { id: usize, remaining: Decimal },
}

/// Open purchase lot
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Lot {
    /// Sequence number of the purchase within its fund
    pub id: usize,
    /// Source transaction type, e.g. `kauf` or `erträgnis`
    pub kind: String,
    pub acquired: NaiveDate,
    #[schemars(with = "String")]
    pub initial_units: Decimal,
    #[schemars(with = "String")]
    pub remaining: Decimal,
    #[schemars(with = "String")]
    pub redemption_price_eur: Decimal,
}

impl Lot {
    pub fn new(
        id: usize,
        kind: impl Into<String>,
        acquired: NaiveDate,
        units: Decimal,
        redemption_price_eur: Decimal,
    ) -> Self {
        Lot {
            id,
            kind: kind.into(),
            acquired,
            initial_units: units,
            remaining: units,
            redemption_price_eur,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= Decimal::ZERO
    }

    /// Take up to `quantity` units from the lot, returns how many were taken
    pub fn consume(&mut self, quantity: Decimal) -> Decimal {
        let taken = quantity.min(self.remaining).max(Decimal::ZERO);
        self.remaining -= taken;
        taken
    }

    /// EUR value of the remaining units at acquisition price, `None` on overflow
    pub fn cost_eur(&self) -> Option<Decimal> {
        self.remaining.checked_mul(self.redemption_price_eur)
    }
}

/// FIFO queue of open lots for a single fund.
///
/// Lots live in an arena and are retired by advancing `head`. Retired lots are
/// dropped once they make up more than half of the arena.
#[derive(Debug, Clone, Default)]
pub struct LotQueue {
    lots: Vec<Lot>,
    head: usize,
}

impl LotQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, lot: Lot) {
        log::debug!(
            "Lot {} ENQUEUE: {} units @ {} acquired {}. Open lots: {}",
            lot.id,
            lot.initial_units,
            lot.redemption_price_eur,
            lot.acquired,
            self.len() + 1
        );
        self.lots.push(lot);
    }

    pub fn peek_oldest(&self) -> Result<&Lot, LotError> {
        self.lots.get(self.head).ok_or(LotError::EmptyQueue)
    }

    pub fn peek_oldest_mut(&mut self) -> Result<&mut Lot, LotError> {
        self.lots.get_mut(self.head).ok_or(LotError::EmptyQueue)
    }

    /// Retire the oldest lot, which must be fully consumed
    pub fn dequeue_oldest(&mut self) -> Result<Lot, LotError> {
        let oldest = self.peek_oldest()?;
        if !oldest.is_exhausted() {
            return Err(LotError::LotNotExhausted {
                id: oldest.id,
                remaining: oldest.remaining,
            });
        }
        let lot = oldest.clone();
        self.head += 1;
        log::debug!("Lot {} DEQUEUE. Open lots: {}", lot.id, self.len());
        if self.is_empty() {
            self.lots.clear();
            self.head = 0;
        } else if self.head > self.lots.len() / 2 {
            self.lots.drain(..self.head);
            self.head = 0;
        }
        Ok(lot)
    }

    /// Consume `quantity` units oldest first, retiring every lot that runs out.
    pub fn take_oldest(&mut self, quantity: Decimal) -> Result<(), LotError> {
        let mut remaining = quantity;
        while remaining > Decimal::ZERO {
            let lot = self.peek_oldest_mut()?;
            remaining -= lot.consume(remaining);
            if lot.is_exhausted() {
                self.dequeue_oldest()?;
            }
        }
        Ok(())
    }

    /// Total units still open
    pub fn available(&self) -> Decimal {
        self.open_lots()
            .filter(|l| !l.is_exhausted())
            .map(|l| l.remaining)
            .sum()
    }

    pub fn open_lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots[self.head..].iter()
    }

    pub fn len(&self) -> usize {
        self.lots.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn lot(id: usize, acquired: &str, units: Decimal, price: Decimal) -> Lot {
        Lot::new(id, "kauf", date(acquired), units, price)
    }

    #[test]
    fn empty_queue_has_nothing_to_peek() {
        let queue = LotQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.peek_oldest(), Err(LotError::EmptyQueue));
        assert_eq!(queue.available(), Decimal::ZERO);
    }

    #[test]
    fn peek_returns_oldest_lot() {
        let mut queue = LotQueue::new();
        queue.enqueue(lot(0, "2010-01-01", dec!(5), dec!(10)));
        queue.enqueue(lot(1, "2012-01-01", dec!(5), dec!(20)));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek_oldest().unwrap().id, 0);
        assert_eq!(queue.available(), dec!(10));
    }

    #[test]
    fn dequeue_requires_exhausted_lot() {
        let mut queue = LotQueue::new();
        queue.enqueue(lot(0, "2010-01-01", dec!(5), dec!(10)));

        assert_eq!(
            queue.dequeue_oldest(),
            Err(LotError::LotNotExhausted {
                id: 0,
                remaining: dec!(5)
            })
        );

        let taken = queue.peek_oldest_mut().unwrap().consume(dec!(5));
        assert_eq!(taken, dec!(5));
        let retired = queue.dequeue_oldest().unwrap();
        assert_eq!(retired.id, 0);
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue_oldest(), Err(LotError::EmptyQueue));
    }

    #[test]
    fn consume_never_goes_below_zero() {
        let mut l = lot(0, "2010-01-01", dec!(3), dec!(10));
        assert_eq!(l.consume(dec!(5)), dec!(3));
        assert_eq!(l.remaining, Decimal::ZERO);
        assert!(l.is_exhausted());
    }

    #[test]
    fn arena_reuse_after_drain() {
        let mut queue = LotQueue::new();
        queue.enqueue(lot(0, "2010-01-01", dec!(1), dec!(10)));
        queue.peek_oldest_mut().unwrap().consume(dec!(1));
        queue.dequeue_oldest().unwrap();

        queue.enqueue(lot(1, "2011-01-01", dec!(2), dec!(12)));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek_oldest().unwrap().id, 1);
        assert_eq!(queue.open_lots().count(), 1);
    }

    #[test]
    fn cost_of_remaining_units() {
        let mut l = lot(0, "2010-01-01", dec!(4), dec!(12.5));
        l.consume(dec!(1));
        assert_eq!(l.cost_eur(), Some(dec!(37.5)));
    }

    #[test]
    fn take_oldest_spans_lots() {
        let mut queue = LotQueue::new();
        queue.enqueue(lot(0, "2010-01-01", dec!(2), dec!(10)));
        queue.enqueue(lot(1, "2011-01-01", dec!(3), dec!(12)));

        queue.take_oldest(dec!(4)).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek_oldest().unwrap().id, 1);
        assert_eq!(queue.available(), dec!(1));
    }

    #[test]
    fn take_oldest_skips_empty_lots() {
        let mut queue = LotQueue::new();
        queue.enqueue(lot(0, "2010-01-01", Decimal::ZERO, dec!(10)));
        queue.enqueue(lot(1, "2011-01-01", dec!(3), dec!(12)));
        assert_eq!(queue.available(), dec!(3));

        queue.take_oldest(dec!(3)).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn take_oldest_on_empty_queue_fails() {
        let mut queue = LotQueue::new();
        assert_eq!(queue.take_oldest(dec!(1)), Err(LotError::EmptyQueue));
    }

    #[test]
    fn retired_lots_are_compacted_while_lots_stay_open() {
        let mut queue = LotQueue::new();
        queue.enqueue(lot(0, "2012-01-01", dec!(1), dec!(10)));
        for id in 1..10 {
            queue.enqueue(lot(id, "2012-01-01", dec!(1), dec!(10)));
            queue.take_oldest(dec!(1)).unwrap();
        }

        assert_eq!(queue.len(), 1);
        assert!(queue.lots.len() <= 2);
        assert_eq!(queue.peek_oldest().unwrap().id, 9);
        assert_eq!(queue.available(), dec!(1));
    }
}
