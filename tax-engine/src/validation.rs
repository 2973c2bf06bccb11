//! Return-level checks.
//!
//! Nothing here stops a computation. Each check looks at the input or a
//! finished result and reports what a filer or preparer should look at,
//! pointing at the traced node involved where there is one.

use std::collections::BTreeMap;

use tracing::debug;

use crate::calculations::common::Money;
use crate::federal::FederalComputation;
use crate::models::{FilingStatusCode, StateReturnConfig, TaxReturn, TaxYearConfig, ValidationItem};
use crate::states::StateRegistry;
use crate::trace::NodeId;

/// Checks on the input alone, before anything is computed.
pub fn check_input(tax_return: &TaxReturn) -> Vec<ValidationItem> {
    let mut items = Vec::new();
    let status = tax_return.filing_status;

    match (status, tax_return.spouse.is_some()) {
        (FilingStatusCode::MarriedFilingJointly, false) => items.push(ValidationItem::error(
            "filing-status.spouse-missing",
            "Married filing jointly requires spouse information",
        )),
        (FilingStatusCode::Single | FilingStatusCode::HeadOfHousehold, true) => {
            items.push(ValidationItem::warning(
                "filing-status.spouse-ignored",
                format!("Spouse information is ignored when filing as {}", status.label()),
            ));
        }
        _ => {}
    }
    if status == FilingStatusCode::HeadOfHousehold && tax_return.dependents.is_empty() {
        items.push(ValidationItem::warning(
            "filing-status.no-qualifying-person",
            "Head of household requires a qualifying person, but no dependents are listed",
        ));
    }

    for (i, w2) in tax_return.wage_statements.iter().enumerate() {
        if w2.federal_withholding > w2.wages {
            items.push(
                ValidationItem::warning(
                    "w2.withholding-exceeds-wages",
                    format!(
                        "W-2 from {}: federal withholding {} exceeds wages {}",
                        w2.employer_name, w2.federal_withholding, w2.wages
                    ),
                )
                .at(&NodeId::document("w2", i, "box2")),
            );
        }
        if tax_return.person(w2.owner).is_none() {
            items.push(ValidationItem::error(
                "w2.owner-missing",
                format!(
                    "W-2 from {} belongs to a spouse who is not on the return",
                    w2.employer_name
                ),
            ));
        }
    }

    items
}

/// The tax-year parameters to use, with an error when the year has none.
pub fn year_config(tax_year: i32) -> (&'static TaxYearConfig, Option<ValidationItem>) {
    match TaxYearConfig::for_year(tax_year) {
        Some(config) => (config, None),
        None => {
            let fallback = &TaxYearConfig::TY2025;
            (
                fallback,
                Some(ValidationItem::error(
                    "tax-year.unsupported",
                    format!(
                        "Tax year {tax_year} is not supported; computed with {} rules",
                        fallback.tax_year
                    ),
                )),
            )
        }
    }
}

/// The state configurations that will run, in the filer's order.
///
/// Configurations for states with no registered module, and repeats of a
/// state already selected, are dropped with an error.
pub fn select_states<'a>(
    configs: &'a [StateReturnConfig],
    registry: &StateRegistry,
) -> (Vec<&'a StateReturnConfig>, Vec<ValidationItem>) {
    let mut selected: Vec<&StateReturnConfig> = Vec::new();
    let mut items = Vec::new();
    for config in configs {
        let code = config.state_code;
        if registry.get(code).is_none() {
            items.push(ValidationItem::error(
                "state.unsupported",
                format!("No rules are registered for {code}; the state return was not computed"),
            ));
        } else if selected.iter().any(|s| s.state_code == code) {
            items.push(ValidationItem::error(
                "state.duplicate",
                format!(
                    "{code} is configured more than once; only the first configuration was used"
                ),
            ));
        } else {
            selected.push(config);
        }
    }
    (selected, items)
}

/// Checks on the finished federal computation.
pub fn check_federal(
    tax_return: &TaxReturn,
    config: &TaxYearConfig,
    federal: &FederalComputation,
) -> Vec<ValidationItem> {
    let mut items = Vec::new();
    let schedules = &federal.schedules;

    for ira in &schedules.ira {
        if ira.result.excess_contribution.is_positive() {
            items.push(
                ValidationItem::warning(
                    "ira.over-limit",
                    format!(
                        "Traditional IRA contributions exceed the {} limit by {}; the excess is \
                         subject to a 6% excise tax unless withdrawn",
                        ira.result.limit, ira.result.excess_contribution
                    ),
                )
                .at(&NodeId::new("ira", &format!("{}.contribution", ira.owner.key()))),
            );
        }
    }

    items.extend(single_employer_excess_social_security(tax_return, config));

    if let Some(ptc) = &schedules.premium_tax_credit {
        if tax_return.filing_status == FilingStatusCode::MarriedFilingSeparately {
            items.push(
                ValidationItem::warning(
                    "ptc.married-filing-separately",
                    "Premium tax credit is generally not allowed when married filing separately; \
                     any advance payments must be repaid",
                )
                .at(&NodeId::new("form8962", "line29")),
            );
        }
        items.push(
            ValidationItem::info(
                "form8962.reconciled",
                format!(
                    "Form 8962 reconciliation was performed: net credit {}, repayment {}",
                    ptc.net_credit, ptc.repayment
                ),
            )
            .at(&NodeId::new("form8962", "line26")),
        );
    }

    if schedules.qbi.as_ref().is_some_and(|q| q.above_threshold) {
        items.push(
            ValidationItem::warning(
                "qbi.above-threshold",
                "Taxable income is above the QBI threshold; W-2 wage, property and specified \
                 service limits are not applied",
            )
            .at(&NodeId::new("form8995", "line15")),
        );
    }

    if let Some(rsu) = &schedules.rsu {
        for (i, sale) in rsu.sales.iter().enumerate() {
            let Some(vest) = &sale.matched_vest else {
                continue;
            };
            if sale.basis != sale.reported_basis {
                items.push(
                    ValidationItem::info(
                        "rsu.basis-corrected",
                        format!(
                            "Sale {}: basis corrected from {} to {} using vest {vest}",
                            sale.sale_id, sale.reported_basis, sale.basis
                        ),
                    )
                    .at(&NodeId::document("rsu", i, "basis")),
                );
            }
        }
    }

    for (i, business) in schedules.schedule_c.iter().enumerate() {
        let Some(office) = &business.home_office else {
            continue;
        };
        if office.carryforward.is_positive() {
            let message = if office.form8829_carryover.is_positive() {
                format!(
                    "{}: {} of home office expenses exceed the income limit; {} carries forward \
                     to next year's Form 8829",
                    business.name, office.carryforward, office.form8829_carryover
                )
            } else {
                format!(
                    "{}: {} of home office expenses exceed the income limit and are not deductible",
                    business.name, office.carryforward
                )
            };
            items.push(
                ValidationItem::info("home-office.carryforward", message)
                    .at(&NodeId::document("scheduleC", i, "line30")),
            );
        }
    }

    if let Some(energy) = &schedules.energy_credits {
        if energy.clean_energy_carryforward.is_positive() {
            items.push(
                ValidationItem::info(
                    "energy.carryforward",
                    format!(
                        "{} of residential clean energy credit exceeds this year's tax and \
                         carries forward",
                        energy.clean_energy_carryforward
                    ),
                )
                .at(&NodeId::new("form5695", "line15")),
            );
        }
    }

    debug!(count = items.len(), "federal checks");
    items
}

/// An employer that withholds social security above the wage-base maximum
/// must refund it; it is never a credit on the return.
fn single_employer_excess_social_security(
    tax_return: &TaxReturn,
    config: &TaxYearConfig,
) -> Vec<ValidationItem> {
    let max_tax = config.ss_wage_max.mul_rate(config.employee_ss_rate);
    let mut by_employer: BTreeMap<(String, String), (Money, usize)> = BTreeMap::new();
    for (i, w2) in tax_return.wage_statements.iter().enumerate() {
        let employer = if w2.employer_ein.trim().is_empty() {
            w2.employer_name.trim().to_owned()
        } else {
            w2.employer_ein.trim().to_owned()
        };
        let entry = by_employer
            .entry((w2.owner.key().to_owned(), employer))
            .or_insert((Money::ZERO, i));
        entry.0 += w2.social_security_withholding;
    }

    by_employer
        .into_iter()
        .filter(|(_, (withheld, _))| *withheld > max_tax)
        .map(|((_, employer), (withheld, first))| {
            ValidationItem::warning(
                "social-security.single-employer-excess",
                format!(
                    "Employer {employer} withheld {withheld} of social security tax, more than \
                     the {max_tax} maximum; ask the employer to refund the excess"
                ),
            )
            .at(&NodeId::document("w2", first, "box4"))
        })
        .collect()
}
