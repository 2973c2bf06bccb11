//! Residential energy credits (Form 5695).
//!
//! Part II (energy efficient home improvements) is limited first and has
//! no carryforward; Part I (residential clean energy) takes what tax is
//! left and carries the rest forward.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::{EnergyImprovement, EnergyImprovementKind};

const AGGREGATE_LIMIT: Money = Money::dollars(1_200);
const HEAT_PUMP_LIMIT: Money = Money::dollars(2_000);
const WINDOWS_LIMIT: Money = Money::dollars(600);
const DOORS_LIMIT: Money = Money::dollars(500);
const AUDIT_LIMIT: Money = Money::dollars(150);
const PROPERTY_ITEM_LIMIT: Money = Money::dollars(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreditGroup {
    CleanEnergy,
    Windows,
    Doors,
    Audit,
    /// Each item separately limited.
    QualifiedProperty,
    Insulation,
    HeatPump,
}

fn group(kind: EnergyImprovementKind) -> CreditGroup {
    use EnergyImprovementKind::*;
    match kind {
        SolarElectric | SolarWaterHeating | SmallWind | Geothermal | BatteryStorage => {
            CreditGroup::CleanEnergy
        }
        Windows => CreditGroup::Windows,
        ExteriorDoors => CreditGroup::Doors,
        HomeEnergyAudit => CreditGroup::Audit,
        CentralAirConditioner | WaterHeater | Furnace | ElectricPanel => {
            CreditGroup::QualifiedProperty
        }
        Insulation => CreditGroup::Insulation,
        HeatPump | HeatPumpWaterHeater | BiomassStove => CreditGroup::HeatPump,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyCreditsResult {
    /// Part I line 6b, plus any carryforward from last year.
    pub clean_energy_tentative: Money,
    /// Part I line 15: Schedule 3, line 5a.
    pub clean_energy_credit: Money,
    /// Part I line 16.
    pub clean_energy_carryforward: Money,
    /// Part II line 29 before the tax limit.
    pub home_improvement_tentative: Money,
    /// Part II line 32: Schedule 3, line 5b.
    pub home_improvement_credit: Money,
}

impl EnergyCreditsResult {
    pub fn total(&self) -> Money {
        self.clean_energy_credit + self.home_improvement_credit
    }
}

/// Returns `None` when no improvements were reported.
///
/// `tax_limit` is the tax left after credits taken before Schedule 3 line 5.
pub fn compute_energy_credits(
    improvements: &[EnergyImprovement],
    tax_limit: Money,
) -> Option<EnergyCreditsResult> {
    if improvements.is_empty() {
        return None;
    }

    let credit = |kind: CreditGroup| -> Money {
        improvements
            .iter()
            .filter(|item| group(item.kind) == kind)
            .map(|item| item.cost.max_zero())
            .sum::<Money>()
            .mul_rate(dec!(0.30))
    };

    let clean_energy_tentative = credit(CreditGroup::CleanEnergy);

    let per_item_property: Money = improvements
        .iter()
        .filter(|item| group(item.kind) == CreditGroup::QualifiedProperty)
        .map(|item| item.cost.max_zero().mul_rate(dec!(0.30)).min(PROPERTY_ITEM_LIMIT))
        .sum();
    let aggregate = (credit(CreditGroup::Windows).min(WINDOWS_LIMIT)
        + credit(CreditGroup::Doors).min(DOORS_LIMIT)
        + credit(CreditGroup::Audit).min(AUDIT_LIMIT)
        + credit(CreditGroup::Insulation)
        + per_item_property)
        .min(AGGREGATE_LIMIT);
    let home_improvement_tentative = aggregate + credit(CreditGroup::HeatPump).min(HEAT_PUMP_LIMIT);

    let tax_limit = tax_limit.max_zero();
    let home_improvement_credit = home_improvement_tentative.min(tax_limit);
    let clean_energy_credit = clean_energy_tentative.min(tax_limit - home_improvement_credit);

    Some(EnergyCreditsResult {
        clean_energy_tentative,
        clean_energy_credit,
        clean_energy_carryforward: clean_energy_tentative - clean_energy_credit,
        home_improvement_tentative,
        home_improvement_credit,
    })
}
