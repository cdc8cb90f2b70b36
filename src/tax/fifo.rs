//! FIFO matching of disposals against open lots.
//!
//! A disposal of `D` units consumes the oldest open lots first. Every lot touched
//! produces one [`Fragment`] whose gain is `q * sell - q * buy`. Whether the
//! fragment is taxable depends on the acquisition date of the lot, not on the
//! date of the disposal: shares acquired before [`KEST_CUTOFF`] are exempt.

use super::lots::{LotError, LotQueue};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt::{self, Display};

/// Shares acquired on or after this date are subject to KESt on disposal
pub const KEST_CUTOFF: NaiveDate = match NaiveDate::from_ymd_opt(2011, 1, 1) {
    Some(date) => date,
    None => panic!("invalid cutoff date"),
};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("disposal of {required} units exceeds the {available} units held")]
    UnmatchedDisposal {
        available: Decimal,
        required: Decimal,
    },
    #[error("gain of {quantity} units at {sell_price_eur} is out of range")]
    Overflow {
        quantity: Decimal,
        sell_price_eur: Decimal,
    },
    #[error(transparent)]
    Lot(#[from] LotError),
}

/// Portion of a disposal matched against a single lot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Fragment {
    pub lot_id: usize,
    #[schemars(with = "String")]
    pub quantity: Decimal,
    #[schemars(with = "String")]
    pub purchase_price_eur: Decimal,
    pub acquired: NaiveDate,
    #[schemars(with = "String")]
    pub gain: Decimal,
    pub taxable: bool,
}

impl Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({}, {})",
            self.quantity.normalize(),
            self.purchase_price_eur.round_dp(4).normalize(),
            self.acquired.format("%Y-%m-%d"),
            if self.taxable { "taxable" } else { "exempt" }
        )
    }
}

/// Result of matching one disposal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Match {
    pub fragments: Vec<Fragment>,
}

impl Match {
    #[cfg(test)]
    pub fn quantity(&self) -> Decimal {
        self.fragments.iter().map(|f| f.quantity).sum()
    }

    pub fn total_gain(&self) -> Decimal {
        self.fragments.iter().map(|f| f.gain).sum()
    }

    pub fn taxable_gain(&self) -> Decimal {
        self.fragments
            .iter()
            .filter(|f| f.taxable)
            .map(|f| f.gain)
            .sum()
    }

    pub fn exempt_gain(&self) -> Decimal {
        self.fragments
            .iter()
            .filter(|f| !f.taxable)
            .map(|f| f.gain)
            .sum()
    }

    /// Which lots were consumed, e.g. `5 @ 10 (2010-01-01, exempt) + 3 @ 20 (2012-01-01, taxable)`
    pub fn explanation(&self) -> String {
        self.fragments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// Consume `quantity` units at `sell_price_eur` from the oldest lots in `queue`.
///
/// Fragments are computed before any lot is touched, so on error the queue is
/// left as it was. Lots with no units left are skipped without a fragment.
pub fn match_disposal(
    queue: &mut LotQueue,
    quantity: Decimal,
    sell_price_eur: Decimal,
    cutoff: NaiveDate,
) -> Result<Match, MatchError> {
    let available = queue.available();
    if quantity > available {
        return Err(MatchError::UnmatchedDisposal {
            available,
            required: quantity,
        });
    }

    let overflow = || MatchError::Overflow {
        quantity,
        sell_price_eur,
    };
    let mut remaining = quantity;
    let mut total = Decimal::ZERO;
    let mut fragments = Vec::new();

    for lot in queue.open_lots().filter(|l| !l.is_exhausted()) {
        if remaining <= Decimal::ZERO {
            break;
        }
        let q = remaining.min(lot.remaining);
        let gain = fragment_gain(q, sell_price_eur, lot.redemption_price_eur)
            .ok_or_else(overflow)?;
        total = total.checked_add(gain).ok_or_else(overflow)?;
        log::debug!(
            "Lot {} CONSUME: {} units @ {} -> {}, gain={}, remaining={}",
            lot.id,
            q,
            lot.redemption_price_eur,
            sell_price_eur,
            gain,
            lot.remaining - q
        );
        fragments.push(Fragment {
            lot_id: lot.id,
            quantity: q,
            purchase_price_eur: lot.redemption_price_eur,
            acquired: lot.acquired,
            gain,
            taxable: lot.acquired >= cutoff,
        });
        remaining -= q;
    }

    queue.take_oldest(quantity)?;
    Ok(Match { fragments })
}

/// `q * sell - q * buy`, `None` on overflow
fn fragment_gain(quantity: Decimal, sell: Decimal, buy: Decimal) -> Option<Decimal> {
    quantity
        .checked_mul(sell)?
        .checked_sub(quantity.checked_mul(buy)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::lots::Lot;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn queue(lots: &[(&str, Decimal, Decimal)]) -> LotQueue {
        let mut queue = LotQueue::new();
        for (id, (acquired, units, price)) in lots.iter().enumerate() {
            queue.enqueue(Lot::new(id, "kauf", date(acquired), *units, *price));
        }
        queue
    }

    #[test]
    fn cutoff_is_first_of_january_2011() {
        assert_eq!(KEST_CUTOFF, date("2011-01-01"));
    }

    #[test]
    fn single_lot_fully_consumed() {
        let mut q = queue(&[("2010-06-01", dec!(10), dec!(10))]);
        let m = match_disposal(&mut q, dec!(10), dec!(15), KEST_CUTOFF).unwrap();

        assert_eq!(m.fragments.len(), 1);
        assert_eq!(m.total_gain(), dec!(50));
        assert_eq!(m.taxable_gain(), dec!(0));
        assert_eq!(m.exempt_gain(), dec!(50));
        assert!(q.is_empty());
    }

    #[test]
    fn spans_lots_oldest_first() {
        let mut q = queue(&[
            ("2010-01-01", dec!(5), dec!(10)),
            ("2012-01-01", dec!(5), dec!(20)),
        ]);
        let m = match_disposal(&mut q, dec!(8), dec!(25), KEST_CUTOFF).unwrap();

        assert_eq!(
            m.fragments,
            vec![
                Fragment {
                    lot_id: 0,
                    quantity: dec!(5),
                    purchase_price_eur: dec!(10),
                    acquired: date("2010-01-01"),
                    gain: dec!(75),
                    taxable: false,
                },
                Fragment {
                    lot_id: 1,
                    quantity: dec!(3),
                    purchase_price_eur: dec!(20),
                    acquired: date("2012-01-01"),
                    gain: dec!(15),
                    taxable: true,
                },
            ]
        );
        assert_eq!(m.total_gain(), dec!(90));
        assert_eq!(m.taxable_gain(), dec!(15));
        assert_eq!(m.exempt_gain(), dec!(75));

        assert_eq!(q.len(), 1);
        let open = q.peek_oldest().unwrap();
        assert_eq!(open.id, 1);
        assert_eq!(open.remaining, dec!(2));
    }

    #[test]
    fn exact_exhaustion_dequeues_in_same_step() {
        let mut q = queue(&[
            ("2012-01-01", dec!(4), dec!(10)),
            ("2012-02-01", dec!(4), dec!(11)),
        ]);
        match_disposal(&mut q, dec!(4), dec!(12), KEST_CUTOFF).unwrap();

        assert_eq!(q.len(), 1);
        assert_eq!(q.peek_oldest().unwrap().id, 1);
        assert!(q.open_lots().all(|l| l.remaining > Decimal::ZERO));
    }

    #[test]
    fn lot_acquired_on_cutoff_is_taxable() {
        let mut q = queue(&[
            ("2010-12-31", dec!(1), dec!(10)),
            ("2011-01-01", dec!(1), dec!(10)),
        ]);
        let m = match_disposal(&mut q, dec!(2), dec!(11), KEST_CUTOFF).unwrap();

        assert!(!m.fragments[0].taxable);
        assert!(m.fragments[1].taxable);
    }

    #[test]
    fn losses_are_signed() {
        let mut q = queue(&[("2012-01-01", dec!(2), dec!(30))]);
        let m = match_disposal(&mut q, dec!(2), dec!(25), KEST_CUTOFF).unwrap();
        assert_eq!(m.total_gain(), dec!(-10));
        assert_eq!(m.taxable_gain(), dec!(-10));
    }

    #[test]
    fn empty_queue_is_unmatched() {
        let mut q = LotQueue::new();
        let err = match_disposal(&mut q, dec!(10), dec!(15), KEST_CUTOFF).unwrap_err();
        assert_eq!(
            err,
            MatchError::UnmatchedDisposal {
                available: dec!(0),
                required: dec!(10)
            }
        );
        assert!(q.is_empty());
    }

    #[test]
    fn insufficient_units_leave_queue_untouched() {
        let mut q = queue(&[
            ("2010-01-01", dec!(2), dec!(10)),
            ("2012-01-01", dec!(3), dec!(20)),
        ]);
        let err = match_disposal(&mut q, dec!(6), dec!(25), KEST_CUTOFF).unwrap_err();
        assert_eq!(
            err,
            MatchError::UnmatchedDisposal {
                available: dec!(5),
                required: dec!(6)
            }
        );
        assert_eq!(q.len(), 2);
        assert_eq!(q.available(), dec!(5));
    }

    #[test]
    fn fragment_quantities_add_up_to_disposal() {
        let mut q = queue(&[
            ("2009-03-01", dec!(1.5), dec!(10)),
            ("2010-03-01", dec!(0.25), dec!(11)),
            ("2011-03-01", dec!(2.125), dec!(12)),
            ("2012-03-01", dec!(7), dec!(13)),
        ]);
        let m = match_disposal(&mut q, dec!(4.3), dec!(14), KEST_CUTOFF).unwrap();

        assert_eq!(m.quantity(), dec!(4.3));
        assert!(m.fragments.iter().all(|f| f.quantity > Decimal::ZERO));
        assert_eq!(m.total_gain(), m.taxable_gain() + m.exempt_gain());
        let ids: Vec<_> = m.fragments.iter().map(|f| f.lot_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_lots_produce_no_fragments() {
        let mut q = queue(&[
            ("2012-01-01", Decimal::ZERO, dec!(10)),
            ("2012-02-01", dec!(5), dec!(10)),
            ("2012-03-01", Decimal::ZERO, dec!(11)),
            ("2012-04-01", dec!(2), dec!(11)),
        ]);
        let m = match_disposal(&mut q, dec!(6), dec!(12), KEST_CUTOFF).unwrap();

        assert!(m.fragments.iter().all(|f| f.quantity > Decimal::ZERO));
        assert_eq!(m.quantity(), dec!(6));
        let ids: Vec<_> = m.fragments.iter().map(|f| f.lot_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(
            m.explanation(),
            "5 @ 10 (2012-02-01, taxable) + 1 @ 11 (2012-04-01, taxable)"
        );
        assert_eq!(q.len(), 1);
        assert_eq!(q.available(), dec!(1));
    }

    #[test]
    fn negative_lots_do_not_count_as_available() {
        let mut q = queue(&[
            ("2012-01-01", dec!(-2), dec!(10)),
            ("2012-02-01", dec!(5), dec!(10)),
        ]);
        assert_eq!(q.available(), dec!(5));

        let m = match_disposal(&mut q, dec!(4), dec!(12), KEST_CUTOFF).unwrap();
        assert_eq!(m.fragments.len(), 1);
        assert_eq!(m.fragments[0].lot_id, 1);
        assert_eq!(m.total_gain(), dec!(8));
    }

    #[test]
    fn gain_out_of_range_leaves_queue_untouched() {
        let mut q = queue(&[
            ("2012-01-01", dec!(1), dec!(10)),
            ("2012-02-01", dec!(1000), dec!(10)),
        ]);
        let err = match_disposal(&mut q, dec!(2), Decimal::MAX, KEST_CUTOFF).unwrap_err();

        assert!(matches!(err, MatchError::Overflow { .. }));
        assert_eq!(q.len(), 2);
        assert_eq!(q.available(), dec!(1001));
    }

    #[test]
    fn zero_units_match_nothing() {
        let mut q = LotQueue::new();
        let m = match_disposal(&mut q, Decimal::ZERO, dec!(10), KEST_CUTOFF).unwrap();
        assert!(m.fragments.is_empty());
        assert_eq!(m.total_gain(), Decimal::ZERO);
    }

    #[test]
    fn explanation_lists_consumed_lots() {
        let mut q = queue(&[
            ("2010-01-01", dec!(5), dec!(10)),
            ("2012-01-01", dec!(5), dec!(20)),
        ]);
        let m = match_disposal(&mut q, dec!(8), dec!(25), KEST_CUTOFF).unwrap();
        assert_eq!(
            m.explanation(),
            "5 @ 10 (2010-01-01, exempt) + 3 @ 20 (2012-01-01, taxable)"
        );
    }
}
