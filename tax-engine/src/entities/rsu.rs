//! RSU cost-basis correction for 1099-B sales.
//!
//! Brokers often report RSU sales with zero or unadjusted basis even though
//! the shares' value at vest was already taxed as wages. Each sale is
//! matched to at most one vest lot and its basis raised to the lot's fair
//! market value. Sales that match nothing pass through unchanged.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::{BrokerageTransaction, RsuVestEvent};

static RSU_HINT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(rsu|restricted\s+stock|stock\s+plan|vest(ed|ing)?)\b").ok()
});

/// Acquisition dates within this many days of the vest date count as close.
const DATE_TOLERANCE_DAYS: i64 = 3;
/// Minimum score to accept a match.
const MATCH_THRESHOLD: u32 = 60;

const SCORE_SECURITY: u32 = 50;
const SCORE_SAME_DATE: u32 = 30;
const SCORE_NEAR_DATE: u32 = 15;
const SCORE_HINT: u32 = 20;
const SCORE_EXACT_SHARES: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsuMatch {
    pub sale_id: String,
    pub vest_id: String,
    pub score: u32,
    pub reported_basis: Money,
    pub corrected_basis: Money,
}

impl RsuMatch {
    pub fn adjustment(&self) -> Money {
        self.corrected_basis - self.reported_basis
    }
}

/// A sale with the basis to use on Form 8949.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedSale {
    pub sale_id: String,
    pub proceeds: Money,
    pub reported_basis: Money,
    pub basis: Money,
    /// Gain or loss after the basis correction and wash-sale adjustment.
    pub gain_loss: Money,
    pub matched_vest: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsuBasisResult {
    pub matches: Vec<RsuMatch>,
    /// One entry per input sale, in input order.
    pub sales: Vec<AdjustedSale>,
}

impl RsuBasisResult {
    pub fn total_adjustment(&self) -> Money {
        self.matches.iter().map(RsuMatch::adjustment).sum()
    }
}

fn same_security(
    sale: &BrokerageTransaction,
    vest: &RsuVestEvent,
) -> bool {
    let normalize = |s: &str| s.trim().to_ascii_uppercase();
    match (&sale.cusip, &vest.cusip) {
        (Some(a), Some(b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
            normalize(a) == normalize(b)
        }
        _ => !sale.symbol.trim().is_empty() && normalize(&sale.symbol) == normalize(&vest.symbol),
    }
}

fn days_apart(
    a: NaiveDate,
    b: NaiveDate,
) -> i64 {
    (a - b).num_days().abs()
}

/// Confidence that `vest` supplied the shares in `sale`, or `None` when it
/// cannot have.
pub fn match_score(
    sale: &BrokerageTransaction,
    vest: &RsuVestEvent,
) -> Option<u32> {
    if !same_security(sale, vest) || sale.date_sold < vest.vest_date {
        return None;
    }
    let delivered = vest.shares_delivered();
    if sale.shares <= Decimal::ZERO || sale.shares > delivered {
        return None;
    }

    let mut score = SCORE_SECURITY;
    if let Some(acquired) = sale.date_acquired {
        match days_apart(acquired, vest.vest_date) {
            0 => score += SCORE_SAME_DATE,
            d if d <= DATE_TOLERANCE_DAYS => score += SCORE_NEAR_DATE,
            _ => return None,
        }
    }
    if RSU_HINT
        .as_ref()
        .is_some_and(|re| re.is_match(&sale.description))
    {
        score += SCORE_HINT;
    }
    if sale.shares == delivered {
        score += SCORE_EXACT_SHARES;
    }
    Some(score)
}

/// Matches sales to vest lots and corrects their basis.
///
/// Candidates are taken greedily by descending score, ties broken by sale
/// then vest position, so the same inputs always give the same matches.
///
/// The value at vest covers only the shares sold: a sale of part of a lot
/// gets `sale.shares * fmv_per_share`, not the value of the whole delivery.
pub fn correct_rsu_basis(
    sales: &[BrokerageTransaction],
    vests: &[RsuVestEvent],
) -> RsuBasisResult {
    let mut candidates: Vec<(u32, usize, usize)> = sales
        .iter()
        .enumerate()
        .flat_map(|(s, sale)| {
            vests.iter().enumerate().filter_map(move |(v, vest)| {
                match_score(sale, vest)
                    .filter(|score| *score >= MATCH_THRESHOLD)
                    .map(|score| (score, s, v))
            })
        })
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut sale_match: Vec<Option<(usize, u32)>> = vec![None; sales.len()];
    let mut vest_used = vec![false; vests.len()];
    for (score, s, v) in candidates {
        if sale_match[s].is_none() && !vest_used[v] {
            sale_match[s] = Some((v, score));
            vest_used[v] = true;
        }
    }

    let mut result = RsuBasisResult::default();
    for (sale, matched) in sales.iter().zip(sale_match) {
        let reported_basis = sale.cost_basis;
        let (basis, matched_vest) = match matched {
            Some((v, score)) => {
                let vest = &vests[v];
                let shares = sale.shares.min(vest.shares_delivered());
                let fmv_basis = Money::from_decimal(vest.fmv_per_share.to_decimal() * shares);
                let corrected_basis = reported_basis.max(fmv_basis);
                result.matches.push(RsuMatch {
                    sale_id: sale.id.clone(),
                    vest_id: vest.id.clone(),
                    score,
                    reported_basis,
                    corrected_basis,
                });
                (corrected_basis, Some(vest.id.clone()))
            }
            None => (reported_basis, None),
        };
        result.sales.push(AdjustedSale {
            sale_id: sale.id.clone(),
            proceeds: sale.proceeds,
            reported_basis,
            basis,
            gain_loss: sale.proceeds - basis + sale.wash_sale_disallowed,
            matched_vest,
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn vest(
        id: &str,
        day: u32,
    ) -> RsuVestEvent {
        RsuVestEvent {
            id: id.into(),
            symbol: "ACME".into(),
            cusip: None,
            vest_date: date(2025, 3, day),
            shares_vested: dec!(100),
            shares_withheld: dec!(40),
            fmv_per_share: Money::dollars(50),
        }
    }

    fn sale(
        id: &str,
        day: u32,
    ) -> BrokerageTransaction {
        BrokerageTransaction {
            id: id.into(),
            description: "ACME CORP RSU".into(),
            symbol: "acme".into(),
            date_acquired: Some(date(2025, 3, day)),
            date_sold: date(2025, 6, 1),
            shares: dec!(60),
            proceeds: Money::dollars(3_600),
            ..Default::default()
        }
    }

    #[test]
    fn zero_basis_corrected_to_value_at_vest() {
        let result = correct_rsu_basis(&[sale("b-1", 15)], &[vest("v-1", 15)]);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.sales[0].basis, Money::dollars(3_000));
        assert_eq!(result.sales[0].gain_loss, Money::dollars(600));
        assert_eq!(result.total_adjustment(), Money::dollars(3_000));
    }

    #[test]
    fn partial_sale_of_a_lot_uses_only_the_shares_sold() {
        let partial = BrokerageTransaction {
            shares: dec!(30),
            proceeds: Money::dollars(1_800),
            ..sale("b-1", 15)
        };

        let result = correct_rsu_basis(&[partial], &[vest("v-1", 15)]);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].score, SCORE_SECURITY + SCORE_SAME_DATE + SCORE_HINT);
        assert_eq!(result.sales[0].basis, Money::dollars(1_500));
        assert_eq!(result.sales[0].gain_loss, Money::dollars(300));
    }

    #[test]
    fn higher_reported_basis_is_kept() {
        let mut high = sale("b-1", 15);
        high.cost_basis = Money::dollars(3_100);

        let result = correct_rsu_basis(&[high], &[vest("v-1", 15)]);

        assert_eq!(result.sales[0].basis, Money::dollars(3_100));
    }

    #[test]
    fn different_symbol_never_matches() {
        let mut other = sale("b-1", 15);
        other.symbol = "WIDG".into();

        let result = correct_rsu_basis(&[other], &[vest("v-1", 15)]);

        assert!(result.matches.is_empty());
        assert_eq!(result.sales[0].basis, Money::ZERO);
        assert_eq!(result.sales[0].gain_loss, Money::dollars(3_600));
    }

    #[test]
    fn cusip_overrides_symbol_when_both_present() {
        let mut with_cusip = sale("b-1", 15);
        with_cusip.cusip = Some("000000001".into());
        let mut lot = vest("v-1", 15);
        lot.cusip = Some("000000002".into());

        assert_eq!(match_score(&with_cusip, &lot), None);
    }

    #[test]
    fn acquisition_date_outside_tolerance_never_matches() {
        assert_eq!(match_score(&sale("b-1", 20), &vest("v-1", 15)), None);
        assert!(match_score(&sale("b-1", 17), &vest("v-1", 15)).is_some());
    }

    #[test]
    fn each_lot_matches_at_most_one_sale() {
        let sales = [sale("b-1", 15), sale("b-2", 15)];

        let result = correct_rsu_basis(&sales, &[vest("v-1", 15)]);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].sale_id, "b-1");
        assert_eq!(result.sales[1].matched_vest, None);
    }

    #[test]
    fn best_score_wins_and_result_is_stable() {
        let sales = [sale("b-1", 16), sale("b-2", 15)];
        let vests = [vest("v-1", 15)];

        let first = correct_rsu_basis(&sales, &vests);
        let second = correct_rsu_basis(&sales, &vests);

        assert_eq!(first.matches[0].sale_id, "b-2");
        assert_eq!(first, second);
    }

    #[test]
    fn symbol_alone_is_not_enough() {
        let bare = BrokerageTransaction {
            description: "ACME CORP".into(),
            date_acquired: None,
            shares: dec!(10),
            ..sale("b-1", 15)
        };

        assert_eq!(match_score(&bare, &vest("v-1", 15)), Some(SCORE_SECURITY));
        assert!(correct_rsu_basis(&[bare], &[vest("v-1", 15)]).matches.is_empty());
    }
}
