use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::record::HIGHEST_NUMBER;
use crate::types::DrawRecord;

/// How many of the latest draws count as "recent".
pub const RECENT_DRAWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accumulation {
    pub number: u8,
    pub count: usize,
    /// Share of draws containing the number, floored to 3 decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub numbers: Vec<Accumulation>,
    pub specials: Vec<Accumulation>,
    pub numbers_not_in_last_10: Vec<u8>,
}

pub fn compute(records: &[DrawRecord]) -> Stats {
    let total = records.len();

    let numbers = accumulate(records.iter().flat_map(|r| r.numbers.iter().copied()), total);
    let specials = accumulate(records.iter().map(|r| r.special), total);

    let recent = numbers_in_latest(records, RECENT_DRAWS);
    let numbers_not_in_last_10 = (1..=HIGHEST_NUMBER)
        .filter(|n| !recent.contains(n))
        .collect();

    Stats {
        total,
        numbers,
        specials,
        numbers_not_in_last_10,
    }
}

fn accumulate(drawn: impl Iterator<Item = u8>, total: usize) -> Vec<Accumulation> {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for number in drawn {
        *counts.entry(number).or_insert(0) += 1;
    }

    let mut accumulations: Vec<Accumulation> = counts
        .into_iter()
        .map(|(number, count)| Accumulation {
            number,
            count,
            percentage: floor_to_thousandths(count, total),
        })
        .collect();
    // most frequent first, ties by number
    accumulations.sort_by(|a, b| b.count.cmp(&a.count).then(a.number.cmp(&b.number)));
    accumulations
}

fn floor_to_thousandths(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count * 1000 / total) as f64 / 1000.0
}

/// Distinct main numbers drawn in the `quantity` most recent draws.
pub fn numbers_in_latest(records: &[DrawRecord], quantity: usize) -> BTreeSet<u8> {
    let mut by_date: Vec<&DrawRecord> = records.iter().collect();
    by_date.sort_by_key(|r| r.date);
    by_date
        .iter()
        .rev()
        .take(quantity)
        .flat_map(|r| r.numbers.iter().copied())
        .collect()
}
