use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Realized gains per calendar year of disposal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GainAggregator {
    gains: BTreeMap<i32, Decimal>,
    taxable_gains: BTreeMap<i32, Decimal>,
}

impl GainAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a disposal's total and taxable gain to `year`
    pub fn add_gain(&mut self, year: i32, total: Decimal, taxable: Decimal) {
        add_to(&mut self.gains, year, total);
        add_to(&mut self.taxable_gains, year, taxable);
    }

    #[allow(dead_code)]
    pub fn gains(&self) -> &BTreeMap<i32, Decimal> {
        &self.gains
    }

    #[allow(dead_code)]
    pub fn taxable_gains(&self) -> &BTreeMap<i32, Decimal> {
        &self.taxable_gains
    }

    #[allow(dead_code)]
    pub fn exempt_gains(&self) -> BTreeMap<i32, Decimal> {
        self.gains
            .iter()
            .map(|(year, total)| (*year, *total - self.taxable(*year)))
            .collect()
    }

    pub fn gain(&self, year: i32) -> Decimal {
        self.gains.get(&year).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn taxable(&self, year: i32) -> Decimal {
        self.taxable_gains
            .get(&year)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn exempt(&self, year: i32) -> Decimal {
        self.gain(year) - self.taxable(year)
    }

    pub fn total(&self) -> Decimal {
        self.gains.values().copied().sum()
    }

    pub fn total_taxable(&self) -> Decimal {
        self.taxable_gains.values().copied().sum()
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.gains.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.gains.is_empty()
    }

    /// Fold another aggregator into this one
    pub fn merge(&mut self, other: &GainAggregator) {
        for year in other.years() {
            self.add_gain(year, other.gain(year), other.taxable(year));
        }
    }
}

fn add_to(map: &mut BTreeMap<i32, Decimal>, year: i32, amount: Decimal) {
    *map.entry(year).or_insert(Decimal::ZERO) += amount;
}
