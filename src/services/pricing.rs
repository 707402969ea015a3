//! Line-item pricing and document aggregation.
//!
//! Everything here is pure: no database, no clock, no side effects. Monetary
//! intermediate values keep full precision; rounding to 2 decimal places for
//! amounts (3 for percentages) happens once, at the persistence boundary,
//! so multi-line documents do not compound rounding error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::auth::Actor;
use crate::config::ApprovalPolicy;
use crate::errors::ServiceError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// How the header-level discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountMode {
    Percent,
    Amount,
}

impl DiscountMode {
    pub fn parse(value: &str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}

/// Where tax is computed. Both modes exist because different creation paths
/// price tax per line (each at its own rate) or once on the discounted
/// header; callers choose one mode per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxMode {
    PerLine,
    OnHeader,
}

impl TaxMode {
    pub fn parse(value: &str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}

/// Optional per-line discount for the already-priced variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineDiscount {
    Percent(Decimal),
    Amount(Decimal),
}

/// Cost-plus-margin input for a single line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub product: String,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub margin_percent: Decimal,
    pub vat_percent: Decimal,
}

/// Computed monetary figures for one line, at full precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    pub unit_price: Decimal,
    pub line_gross: Decimal,
    pub line_cost_total: Decimal,
    pub line_tax: Decimal,
    pub line_gp: Decimal,
}

/// Header-level totals aggregated from a document's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: Decimal,
    pub total_cost: Decimal,
    pub discount_amount: Decimal,
    pub vat_amount: Decimal,
    pub grand_total: Decimal,
    pub gross_profit: Decimal,
    pub profit_percent: Decimal,
}

/// Prices a line from cost and margin:
/// `unit_price = unit_cost * (1 + margin/100)`, gross, cost, per-line tax
/// and gross profit.
pub fn compute_line(input: &LineInput) -> LineTotals {
    let quantity = Decimal::from(input.quantity);
    let unit_price = input.unit_cost * (Decimal::ONE + input.margin_percent / HUNDRED);
    let line_gross = unit_price * quantity;
    let line_cost_total = input.unit_cost * quantity;
    let line_tax = line_gross * input.vat_percent / HUNDRED;
    let line_gp = line_gross - line_cost_total;

    LineTotals {
        unit_price,
        line_gross,
        line_cost_total,
        line_tax,
        line_gp,
    }
}

/// Variant for lines that already carry a rate instead of cost + margin.
///
/// The optional per-line discount is capped so it can never exceed the line's
/// gross. Cost is unknown here, so `line_cost_total` and `line_gp` are zero
/// and gross profit must come from the caller's own cost data.
pub fn compute_priced_line(
    rate: Decimal,
    quantity: i32,
    discount: Option<LineDiscount>,
    vat_percent: Decimal,
) -> LineTotals {
    let qty = Decimal::from(quantity);
    let gross_before_discount = rate * qty;

    let discount_amount = match discount {
        Some(LineDiscount::Percent(pct)) => gross_before_discount * pct / HUNDRED,
        Some(LineDiscount::Amount(amount)) => amount,
        None => Decimal::ZERO,
    };
    let discount_amount = discount_amount.min(gross_before_discount).max(Decimal::ZERO);

    let line_gross = gross_before_discount - discount_amount;
    let line_tax = line_gross * vat_percent / HUNDRED;

    LineTotals {
        unit_price: rate,
        line_gross,
        line_cost_total: Decimal::ZERO,
        line_tax,
        line_gp: Decimal::ZERO,
    }
}

/// Aggregates computed lines into header totals.
///
/// The discount can never exceed the subtotal. With [`TaxMode::PerLine`] the
/// header VAT is the sum of each line's own tax; with [`TaxMode::OnHeader`]
/// it is `net_after_discount * rate / 100`.
pub fn aggregate(
    lines: &[LineTotals],
    discount_mode: DiscountMode,
    discount_value: Decimal,
    tax_mode: TaxMode,
    header_vat_percent: Decimal,
) -> DocumentTotals {
    let subtotal: Decimal = lines.iter().map(|l| l.line_gross).sum();
    let total_cost: Decimal = lines.iter().map(|l| l.line_cost_total).sum();

    let discount_amount = match discount_mode {
        DiscountMode::Percent => subtotal * discount_value / HUNDRED,
        DiscountMode::Amount => discount_value.min(subtotal),
    };

    let net_after_discount = subtotal - discount_amount;

    let vat_amount = match tax_mode {
        TaxMode::PerLine => lines.iter().map(|l| l.line_tax).sum(),
        TaxMode::OnHeader => net_after_discount * header_vat_percent / HUNDRED,
    };

    let grand_total = net_after_discount + vat_amount;
    let gross_profit = net_after_discount - total_cost;
    let profit_percent = if net_after_discount > Decimal::ZERO {
        gross_profit / net_after_discount * HUNDRED
    } else {
        Decimal::ZERO
    };

    DocumentTotals {
        subtotal,
        total_cost,
        discount_amount,
        vat_amount,
        grand_total,
        gross_profit,
        profit_percent,
    }
}

/// The approval gate: a document requires managerial approval when any single
/// line's margin is below the policy floor and the creator is not privileged.
/// This is per-line, not a blended average: one thin-margin line forces
/// approval even if the document as a whole is healthy.
pub fn requires_approval(lines: &[LineInput], actor: &Actor, policy: &ApprovalPolicy) -> bool {
    if actor.is_privileged() {
        return false;
    }
    lines
        .iter()
        .any(|line| line.margin_percent < policy.margin_floor_percent)
}

/// Rounds a currency amount to 2 decimal places for persistence.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Rounds a percentage to 3 decimal places for persistence.
pub fn round_percent(value: Decimal) -> Decimal {
    value.round_dp(3)
}

/// Validates raw line inputs before any transaction opens.
pub fn validate_lines(lines: &[LineInput]) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "at least one line item is required".to_string(),
        ));
    }
    for (idx, line) in lines.iter().enumerate() {
        if line.product.trim().is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "line {}: product is required",
                idx + 1
            )));
        }
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "line {}: quantity must be positive",
                idx + 1
            )));
        }
        if line.unit_cost < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "line {}: unit cost cannot be negative",
                idx + 1
            )));
        }
        if line.margin_percent < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "line {}: margin cannot be negative",
                idx + 1
            )));
        }
        if line.vat_percent < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "line {}: VAT rate cannot be negative",
                idx + 1
            )));
        }
    }
    Ok(())
}
