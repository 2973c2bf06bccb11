//! Line-by-line results for Form 1040 and Schedules 1, 2 and 3.
//!
//! Each field is a [`Line`]: the amount plus the trace node that explains
//! it. `lines()` lists them in form order for export.

use serde::{Deserialize, Serialize};

use crate::models::FilingStatusCode;
use crate::trace::Line;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form1040Result {
    pub tax_year: i32,
    pub filing_status: FilingStatusCode,

    /// W-2 box 1 wages
    pub line1a: Line,
    pub line1z: Line,
    /// Tax-exempt interest
    pub line2a: Line,
    /// Taxable interest
    pub line2b: Line,
    /// Qualified dividends
    pub line3a: Line,
    /// Ordinary dividends
    pub line3b: Line,
    /// IRA distributions
    pub line4a: Line,
    pub line4b: Line,
    /// Pensions and annuities
    pub line5a: Line,
    pub line5b: Line,
    /// Social security benefits
    pub line6a: Line,
    pub line6b: Line,
    /// Capital gain or (loss)
    pub line7: Line,
    /// Schedule 1, line 10
    pub line8: Line,
    /// Total income
    pub line9: Line,
    /// Schedule 1, line 26
    pub line10: Line,
    /// Adjusted gross income
    pub line11: Line,
    /// Standard or itemized deduction
    pub line12: Line,
    /// Qualified business income deduction
    pub line13: Line,
    pub line14: Line,
    /// Taxable income
    pub line15: Line,
    pub line16: Line,
    /// Schedule 2, line 3
    pub line17: Line,
    pub line18: Line,
    /// Child tax credit and credit for other dependents
    pub line19: Line,
    /// Schedule 3, line 8
    pub line20: Line,
    pub line21: Line,
    pub line22: Line,
    /// Schedule 2, line 21
    pub line23: Line,
    /// Total tax
    pub line24: Line,
    /// Withholding from W-2s
    pub line25a: Line,
    /// Withholding from 1099s
    pub line25b: Line,
    /// Other withholding (Form 8959)
    pub line25c: Line,
    pub line25d: Line,
    /// Estimated tax payments
    pub line26: Line,
    /// Earned income credit
    pub line27: Line,
    /// Additional child tax credit
    pub line28: Line,
    /// Schedule 3, line 15
    pub line31: Line,
    pub line32: Line,
    /// Total payments
    pub line33: Line,
    /// Overpaid
    pub line34: Line,
    /// Refunded
    pub line35a: Line,
    /// Amount owed
    pub line37: Line,
}

impl Form1040Result {
    pub fn agi(&self) -> &Line {
        &self.line11
    }

    pub fn total_tax(&self) -> &Line {
        &self.line24
    }

    pub fn lines(&self) -> Vec<(&'static str, &Line)> {
        vec![
            ("1a", &self.line1a),
            ("1z", &self.line1z),
            ("2a", &self.line2a),
            ("2b", &self.line2b),
            ("3a", &self.line3a),
            ("3b", &self.line3b),
            ("4a", &self.line4a),
            ("4b", &self.line4b),
            ("5a", &self.line5a),
            ("5b", &self.line5b),
            ("6a", &self.line6a),
            ("6b", &self.line6b),
            ("7", &self.line7),
            ("8", &self.line8),
            ("9", &self.line9),
            ("10", &self.line10),
            ("11", &self.line11),
            ("12", &self.line12),
            ("13", &self.line13),
            ("14", &self.line14),
            ("15", &self.line15),
            ("16", &self.line16),
            ("17", &self.line17),
            ("18", &self.line18),
            ("19", &self.line19),
            ("20", &self.line20),
            ("21", &self.line21),
            ("22", &self.line22),
            ("23", &self.line23),
            ("24", &self.line24),
            ("25a", &self.line25a),
            ("25b", &self.line25b),
            ("25c", &self.line25c),
            ("25d", &self.line25d),
            ("26", &self.line26),
            ("27", &self.line27),
            ("28", &self.line28),
            ("31", &self.line31),
            ("32", &self.line32),
            ("33", &self.line33),
            ("34", &self.line34),
            ("35a", &self.line35a),
            ("37", &self.line37),
        ]
    }
}

/// Additional income and adjustments to income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule1Result {
    /// Business income (Schedule C)
    pub line3: Line,
    /// Unemployment compensation
    pub line7: Line,
    /// Taxable HSA distributions (Form 8889)
    pub line8f: Line,
    /// Other income
    pub line8z: Line,
    pub line9: Line,
    /// Form 1040 line 8
    pub line10: Line,
    /// Educator expenses
    pub line11: Line,
    /// HSA deduction
    pub line13: Line,
    /// Deductible part of self-employment tax
    pub line15: Line,
    /// IRA deduction
    pub line20: Line,
    /// Student loan interest deduction
    pub line21: Line,
    /// Form 1040 line 10
    pub line26: Line,
}

impl Schedule1Result {
    pub fn lines(&self) -> Vec<(&'static str, &Line)> {
        vec![
            ("3", &self.line3),
            ("7", &self.line7),
            ("8f", &self.line8f),
            ("8z", &self.line8z),
            ("9", &self.line9),
            ("10", &self.line10),
            ("11", &self.line11),
            ("13", &self.line13),
            ("15", &self.line15),
            ("20", &self.line20),
            ("21", &self.line21),
            ("26", &self.line26),
        ]
    }
}

/// Additional taxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule2Result {
    /// Excess advance premium tax credit repayment
    pub line2: Line,
    /// Form 1040 line 17
    pub line3: Line,
    /// Self-employment tax
    pub line4: Line,
    /// Additional tax on HSA excess contributions (Form 5329)
    pub line8: Line,
    /// Additional Medicare tax
    pub line11: Line,
    /// Net investment income tax
    pub line12: Line,
    /// Additional tax on HSA distributions
    pub line17c: Line,
    /// Form 1040 line 23
    pub line21: Line,
}

impl Schedule2Result {
    pub fn lines(&self) -> Vec<(&'static str, &Line)> {
        vec![
            ("2", &self.line2),
            ("3", &self.line3),
            ("4", &self.line4),
            ("8", &self.line8),
            ("11", &self.line11),
            ("12", &self.line12),
            ("17c", &self.line17c),
            ("21", &self.line21),
        ]
    }
}

/// Additional credits and payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule3Result {
    /// Residential clean energy credit
    pub line5a: Line,
    /// Energy efficient home improvement credit
    pub line5b: Line,
    /// Form 1040 line 20
    pub line8: Line,
    /// One line per refundable credit provider that applied.
    pub refundable: Vec<Line>,
    /// Form 1040 line 31
    pub line15: Line,
}

impl Schedule3Result {
    pub fn lines(&self) -> Vec<(&'static str, &Line)> {
        vec![
            ("5a", &self.line5a),
            ("5b", &self.line5b),
            ("8", &self.line8),
            ("15", &self.line15),
        ]
    }
}
