//! Refundable credits reported on Schedule 3, Part II.
//!
//! Each credit is an independent [`RefundableCreditProvider`]. The
//! aggregator asks every registered provider in turn and sums what they
//! return; adding a credit means adding a provider.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::entities::premium_tax_credit::PremiumTaxCreditResult;
use crate::models::{TaxReturn, TaxYearConfig};
use crate::trace::NodeId;

/// What providers may look at. Everything here is known before line 31.
#[derive(Debug, Clone, Copy)]
pub struct RefundableCreditContext<'a> {
    pub tax_return: &'a TaxReturn,
    pub config: &'a TaxYearConfig,
    pub premium_tax_credit: Option<&'a PremiumTaxCreditResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundableCreditItem {
    /// Stable provider id, also the trace key.
    pub id: String,
    pub label: String,
    /// Schedule 3 line, e.g. `9` or `11`.
    pub schedule3_line: String,
    pub amount: Money,
    /// Trace nodes the amount was computed from.
    #[serde(default)]
    pub inputs: Vec<NodeId>,
}

pub trait RefundableCreditProvider: Send + Sync {
    fn id(&self) -> &'static str;

    /// The credit for this return, or `None` when it does not apply.
    fn compute(
        &self,
        ctx: &RefundableCreditContext<'_>,
    ) -> Option<RefundableCreditItem>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundableCreditsResult {
    pub items: Vec<RefundableCreditItem>,
    pub total: Money,
}

/// Ordered provider list.
pub struct RefundableCredits {
    providers: Vec<Box<dyn RefundableCreditProvider>>,
}

impl std::fmt::Debug for RefundableCredits {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.id()))
            .finish()
    }
}

impl Default for RefundableCredits {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RefundableCredits {
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn builtin() -> Self {
        Self::empty()
            .with(NetPremiumTaxCredit)
            .with(ExcessSocialSecurity)
    }

    pub fn with(
        mut self,
        provider: impl RefundableCreditProvider + 'static,
    ) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.iter().map(|p| p.id())
    }

    pub fn aggregate(
        &self,
        ctx: &RefundableCreditContext<'_>,
    ) -> RefundableCreditsResult {
        let items: Vec<RefundableCreditItem> = self
            .providers
            .iter()
            .filter_map(|provider| provider.compute(ctx))
            .filter(|item| item.amount.is_positive())
            .collect();
        let total = items.iter().map(|item| item.amount).sum();
        RefundableCreditsResult { items, total }
    }
}

/// Net premium tax credit (Form 8962 line 26).
#[derive(Debug, Clone, Copy, Default)]
pub struct NetPremiumTaxCredit;

impl RefundableCreditProvider for NetPremiumTaxCredit {
    fn id(&self) -> &'static str {
        "netPremiumTaxCredit"
    }

    fn compute(
        &self,
        ctx: &RefundableCreditContext<'_>,
    ) -> Option<RefundableCreditItem> {
        let ptc = ctx.premium_tax_credit?;
        Some(RefundableCreditItem {
            id: self.id().to_owned(),
            label: "Net premium tax credit (Form 8962)".to_owned(),
            schedule3_line: "9".to_owned(),
            amount: ptc.net_credit,
            inputs: vec![NodeId::new("form8962", "line26")],
        })
    }
}

/// Social security withheld above the wage-base maximum by two or more
/// employers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcessSocialSecurity;

impl ExcessSocialSecurity {
    /// Per filer: the excess, counted only with two or more employers.
    ///
    /// A single employer that over-withholds must refund it itself, so each
    /// employer's contribution is capped at the maximum.
    pub fn excess_by_filer(ctx: &RefundableCreditContext<'_>) -> Vec<Money> {
        let max_tax = ctx.config.ss_wage_max.mul_rate(ctx.config.employee_ss_rate);
        ctx.tax_return
            .filers()
            .map(|(owner, _)| {
                let mut by_employer: BTreeMap<String, Money> = BTreeMap::new();
                for w2 in ctx.tax_return.wage_statements.iter().filter(|w| w.owner == owner) {
                    let key = if w2.employer_ein.trim().is_empty() {
                        format!("{}#{}", w2.employer_name.trim(), w2.id)
                    } else {
                        w2.employer_ein.trim().to_owned()
                    };
                    *by_employer.entry(key).or_default() += w2.social_security_withholding;
                }
                if by_employer.len() < 2 {
                    return Money::ZERO;
                }
                let withheld: Money = by_employer.values().map(|v| (*v).min(max_tax)).sum();
                (withheld - max_tax).max_zero()
            })
            .collect()
    }
}

impl RefundableCreditProvider for ExcessSocialSecurity {
    fn id(&self) -> &'static str {
        "excessSocialSecurity"
    }

    fn compute(
        &self,
        ctx: &RefundableCreditContext<'_>,
    ) -> Option<RefundableCreditItem> {
        let amount: Money = Self::excess_by_filer(ctx).into_iter().sum();
        let filers: Vec<_> = ctx.tax_return.filers().map(|(owner, _)| owner).collect();
        let inputs = ctx
            .tax_return
            .wage_statements
            .iter()
            .enumerate()
            .filter(|(_, w2)| filers.contains(&w2.owner))
            .map(|(i, _)| NodeId::document("w2", i, "box4"))
            .collect();
        amount.is_positive().then(|| RefundableCreditItem {
            id: self.id().to_owned(),
            label: "Excess social security tax withheld".to_owned(),
            schedule3_line: "11".to_owned(),
            amount,
            inputs,
        })
    }
}
