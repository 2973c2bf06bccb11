//! Pieces every state module shares: residency apportionment, the common
//! subtractions, withholding and the final settlement.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calculations::common::Money;
use crate::models::{ResidencyType, StateCode, StateReturnConfig, TaxReturn, ValidationItem};
use crate::states::{StateComputeResult, StateContext, StateDetail};
use crate::trace::{Line, NodeId, TraceError, TraceScope};

/// Labels for the nodes [`settle`] and the shared helpers record.
pub const COMMON_LABELS: &[(&str, &str)] = &[
    ("usObligationInterest", "U.S. obligation interest"),
    ("municipalInterest", "Interest on other states' municipal bonds"),
    ("sourceIncome", "Income while resident"),
    ("tax", "Tax after apportionment"),
    ("netTax", "Tax after credits"),
    ("withholding", "State income tax withheld"),
    ("estimatedPayments", "Estimated payments"),
    ("payments", "Total payments and refundable credits"),
    ("overpaid", "Overpayment"),
    ("owed", "Amount owed"),
];

/// Looks `key` up in `labels`, then in [`COMMON_LABELS`]; unknown keys
/// label themselves.
pub fn label<'a>(
    labels: &'static [(&'static str, &'static str)],
    key: &'a str,
) -> &'a str {
    labels
        .iter()
        .chain(COMMON_LABELS)
        .find(|(k, _)| *k == key)
        .map_or(key, |(_, label)| *label)
}

// ─── apportionment ──────────────────────────────────────────────────────────

/// Fraction of `tax_year` between `start` and `end` inclusive.
///
/// Missing dates default to the year's first and last day, dates outside
/// the year are clamped to it, and an end before the start yields zero.
pub fn day_count_ratio(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    tax_year: i32,
) -> Decimal {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(tax_year, 1, 1),
        NaiveDate::from_ymd_opt(tax_year, 12, 31),
    ) else {
        return Decimal::ZERO;
    };
    let start = start.unwrap_or(first).max(first);
    let end = end.unwrap_or(last).min(last);
    if end < start {
        return Decimal::ZERO;
    }

    let days = (end - start).num_days() + 1;
    let days_in_year = (last - first).num_days() + 1;
    Decimal::from(days) / Decimal::from(days_in_year)
}

/// The apportionment ratio for a state configuration, plus a finding when
/// the ratio could not be derived from residency dates.
pub fn apportionment(
    config: &StateReturnConfig,
    tax_year: i32,
) -> (Decimal, Option<ValidationItem>) {
    match config.residency {
        ResidencyType::FullYear => (Decimal::ONE, None),
        ResidencyType::PartYear => (
            day_count_ratio(config.residency_start, config.residency_end, tax_year),
            None,
        ),
        ResidencyType::Nonresident
            if config.residency_start.is_none() && config.residency_end.is_none() =>
        {
            let code = config.state_code;
            warn!(state = %code, "nonresident without residency dates; apportioned to zero");
            (
                Decimal::ZERO,
                Some(ValidationItem::warning(
                    format!("{}.nonresident-source-income", code.as_str().to_ascii_lowercase()),
                    format!(
                        "{code} nonresident return: income sourced to {code} is not modelled, \
                         so no {code} tax is computed"
                    ),
                )),
            )
        }
        ResidencyType::Nonresident => (
            day_count_ratio(config.residency_start, config.residency_end, tax_year),
            None,
        ),
    }
}

/// Records `full` scaled by `ratio` under `key`.
///
/// A partial-year amount is rounded to whole dollars.
pub fn apportion(
    scope: &mut TraceScope<'_>,
    key: &str,
    full: &Line,
    ratio: Decimal,
    label: &str,
) -> Result<Line, TraceError> {
    let value = if ratio == Decimal::ONE {
        full.amount
    } else {
        full.amount.mul_rate(ratio).round_to_dollar()
    };
    scope.record(key, value, [full.id()], label)
}

// ─── shared subtractions ────────────────────────────────────────────────────

/// 1099-INT box 3 total, or the configured override.
pub fn us_obligation_interest(
    ctx: &StateContext<'_>,
    scope: &mut TraceScope<'_>,
    labels: &'static [(&'static str, &'static str)],
) -> Result<Line, TraceError> {
    let key = "usObligationInterest";
    if let Some(amount) = ctx.config.us_obligation_interest_override {
        return scope.input(key, amount, label(labels, key));
    }
    let statements = &ctx.tax_return.interest_statements;
    let inputs: Vec<NodeId> = (0..statements.len())
        .map(|i| NodeId::document("1099int", i, "box3"))
        .collect();
    let total: Money = statements.iter().map(|s| s.us_obligation_interest).sum();
    scope.record(key, total, &inputs, label(labels, key))
}

/// Tax-exempt interest the state taxes: bonds not issued by this state.
///
/// Interest with no issuing state and exempt-interest dividends count as
/// out of state unless the configuration supplies the figure.
pub fn other_state_municipal_interest(
    ctx: &StateContext<'_>,
    scope: &mut TraceScope<'_>,
    labels: &'static [(&'static str, &'static str)],
) -> Result<Line, TraceError> {
    let key = "municipalInterest";
    if let Some(amount) = ctx.config.other_state_municipal_interest {
        return scope.input(key, amount, label(labels, key));
    }
    let code = ctx.code();
    let mut inputs = Vec::new();
    let mut total = Money::ZERO;
    for (i, statement) in ctx.tax_return.interest_statements.iter().enumerate() {
        let in_state = statement
            .tax_exempt_issuer_state
            .as_deref()
            .is_some_and(|issuer| code.matches(issuer));
        if !in_state && !statement.tax_exempt_interest.is_zero() {
            total += statement.tax_exempt_interest;
            inputs.push(NodeId::document("1099int", i, "box8"));
        }
    }
    for (i, statement) in ctx.tax_return.dividend_statements.iter().enumerate() {
        if !statement.exempt_interest_dividends.is_zero() {
            total += statement.exempt_interest_dividends;
            inputs.push(NodeId::document("1099div", i, "box12"));
        }
    }
    scope.record(key, total, &inputs, label(labels, key))
}

/// W-2 state withholding for `code`.
pub fn state_withholding(
    tax_return: &TaxReturn,
    code: StateCode,
) -> Money {
    tax_return
        .wage_statements
        .iter()
        .flat_map(|w2| &w2.state_rows)
        .filter(|row| code.matches(&row.state))
        .map(|row| row.state_withholding)
        .sum()
}

/// Number of filers who are 65 or older at year end.
pub fn filers_65_or_older(ctx: &StateContext<'_>) -> usize {
    ctx.tax_return
        .filers()
        .filter(|(_, person)| person.age_at_year_end(ctx.tax_year()) >= 65)
        .count()
}

// ─── settlement ─────────────────────────────────────────────────────────────

/// The amounts every module hands to [`settle`].
#[derive(Debug)]
pub struct StateTotals {
    pub state_agi: Line,
    pub taxable_income: Line,
    /// Apportioned tax before credits.
    pub tax: Line,
    pub nonrefundable_credits: Line,
    pub refundable_credits: Line,
}

/// Reconciles tax against payments and assembles the result.
pub fn settle(
    ctx: &StateContext<'_>,
    scope: &mut TraceScope<'_>,
    form_name: &str,
    ratio: Decimal,
    totals: StateTotals,
    detail: StateDetail,
    warnings: Vec<ValidationItem>,
) -> Result<StateComputeResult, TraceError> {
    let no_labels: &'static [(&'static str, &'static str)] = &[];
    let StateTotals {
        state_agi,
        taxable_income,
        tax,
        nonrefundable_credits,
        refundable_credits,
    } = totals;

    let source_income = scope.record(
        "sourceIncome",
        state_agi.amount.mul_rate(ratio),
        [state_agi.id()],
        label(no_labels, "sourceIncome"),
    )?;
    let net_tax = scope.record(
        "netTax",
        (tax.amount - nonrefundable_credits.amount).max_zero(),
        [tax.id(), nonrefundable_credits.id()],
        label(no_labels, "netTax"),
    )?;
    let withholding = scope.input(
        "withholding",
        state_withholding(ctx.tax_return, ctx.code()),
        label(no_labels, "withholding"),
    )?;
    let estimated_payments = scope.input(
        "estimatedPayments",
        ctx.config.estimated_payments,
        label(no_labels, "estimatedPayments"),
    )?;
    let total_payments = scope.sum(
        "payments",
        [&withholding, &estimated_payments, &refundable_credits],
        label(no_labels, "payments"),
    )?;
    let overpaid = scope.record(
        "overpaid",
        (total_payments.amount - net_tax.amount).max_zero(),
        [total_payments.id(), net_tax.id()],
        label(no_labels, "overpaid"),
    )?;
    let owed = scope.record(
        "owed",
        (net_tax.amount - total_payments.amount).max_zero(),
        [net_tax.id(), total_payments.id()],
        label(no_labels, "owed"),
    )?;

    debug!(
        state = %ctx.code(),
        %ratio,
        agi = %state_agi.amount,
        tax = %net_tax.amount,
        payments = %total_payments.amount,
        "state return settled"
    );

    Ok(StateComputeResult {
        state_code: ctx.code(),
        form_name: form_name.to_owned(),
        residency: ctx.config.residency,
        apportionment_ratio: ratio,
        state_agi,
        source_income,
        taxable_income,
        tax,
        nonrefundable_credits,
        net_tax,
        refundable_credits,
        withholding,
        estimated_payments,
        total_payments,
        overpaid,
        owed,
        detail,
        warnings,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::calculations::common::Money;
    use crate::entities::RefundableCredits;
    use crate::federal::compute_federal;
    use crate::models::{
        FilingStatusCode, Person, StateReturnConfig, StateWageRow, TaxReturn, TaxYearConfig,
        WageStatement,
    };
    use crate::states::{StateComputeResult, StateContext, StateRulesModule};
    use crate::trace::{TraceBuilder, TraceGraph};

    pub fn person(born: i32) -> Person {
        Person {
            first_name: "Jordan".into(),
            date_of_birth: NaiveDate::from_ymd_opt(born, 4, 20).unwrap(),
            ..Default::default()
        }
    }

    pub fn wage_earner(
        status: FilingStatusCode,
        wages: i64,
        state: &str,
        state_withheld: i64,
    ) -> TaxReturn {
        TaxReturn {
            tax_year: 2025,
            filing_status: status,
            taxpayer: person(1985),
            wage_statements: vec![WageStatement {
                id: "w2-1".into(),
                employer_name: "Employer".into(),
                wages: Money::dollars(wages),
                social_security_wages: Money::dollars(wages),
                medicare_wages: Money::dollars(wages),
                state_rows: vec![StateWageRow {
                    state: state.into(),
                    state_wages: Money::dollars(wages),
                    state_withholding: Money::dollars(state_withheld),
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// Runs the federal return and then `module` for `config`.
    pub fn run(
        module: &dyn StateRulesModule,
        tax_return: &TaxReturn,
        config: &StateReturnConfig,
    ) -> (StateComputeResult, TraceGraph) {
        let mut trace = TraceBuilder::new();
        let federal = compute_federal(
            tax_return,
            &TaxYearConfig::TY2025,
            &RefundableCredits::builtin(),
            &mut trace,
        )
        .unwrap();
        let ctx = StateContext {
            tax_return,
            federal: &federal,
            config,
        };
        let result = module
            .compute(&ctx, &mut trace.scope(module.metadata().node_prefix))
            .unwrap();
        (result, trace.finish())
    }
}
