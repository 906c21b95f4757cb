//! Profitability metrics for a single listing.

use crate::domain::Decimal;
use thiserror::Error;

/// Contingency surcharge applied on top of the acquisition cost (5%).
pub fn buffer_fee_rate() -> Decimal {
    Decimal::from_cents(5)
}

/// Net profit and ROI (as a percentage) for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Metrics {
    pub net_profit: Decimal,
    pub roi: Decimal,
}

impl Metrics {
    pub fn is_profitable(&self) -> bool {
        self.net_profit.is_positive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    #[error("Amounts too large to compute {0}")]
    Overflow(&'static str),
}

/// Compute net profit and ROI.
///
/// A non-positive acquisition cost means the price is unknown; both metrics
/// are then the zero sentinel. No rounding is applied. Amounts outside the
/// decimal range yield `MetricsError::Overflow` instead of panicking.
pub fn compute_metrics(
    selling_price: Decimal,
    platform_fees: Decimal,
    acquisition_cost: Decimal,
) -> Result<Metrics, MetricsError> {
    if !acquisition_cost.is_positive() {
        return Ok(Metrics::default());
    }

    let overflow = |what: &'static str| move || MetricsError::Overflow(what);

    let buffer_fee = acquisition_cost
        .checked_mul(buffer_fee_rate())
        .ok_or_else(overflow("buffer fee"))?;
    let total_cost = acquisition_cost
        .checked_add(buffer_fee)
        .ok_or_else(overflow("total cost"))?;
    let net_profit = selling_price
        .checked_sub(platform_fees)
        .and_then(|v| v.checked_sub(acquisition_cost))
        .and_then(|v| v.checked_sub(buffer_fee))
        .ok_or_else(overflow("net profit"))?;
    let roi = net_profit
        .checked_div(total_cost)
        .and_then(|v| v.checked_mul(Decimal::hundred()))
        .ok_or_else(overflow("roi"))?;

    Ok(Metrics { net_profit, roi })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_profitable_listing() {
        let metrics = compute_metrics(d("50"), d("5"), d("20")).unwrap();
        assert_eq!(metrics.net_profit, d("24"));
        assert_eq!(metrics.roi.to_fixed(2), "114.29");
        assert!(metrics.is_profitable());
    }

    #[test]
    fn test_roi_matches_closed_form() {
        let cases = [("50", "5", "20"), ("19.99", "7.31", "12.40"), ("10", "3", "30")];
        for (price, fees, cost) in cases {
            let (price, fees, cost) = (d(price), d(fees), d(cost));
            let buffer = cost * d("0.05");
            let expected_net = price - fees - cost - buffer;
            let expected_roi = expected_net / (cost + buffer) * Decimal::hundred();
            let metrics = compute_metrics(price, fees, cost).unwrap();
            assert_eq!(metrics.net_profit, expected_net);
            assert_eq!(metrics.roi, expected_roi);
        }
    }

    #[test]
    fn test_loss_making_listing_has_negative_roi() {
        let metrics = compute_metrics(d("10"), d("3"), d("30")).unwrap();
        assert_eq!(metrics.net_profit, d("-24.5"));
        assert!(metrics.roi.is_negative());
        assert!(!metrics.is_profitable());
    }

    #[test]
    fn test_unknown_cost_yields_zero_sentinel() {
        for cost in ["0", "-1", "-0.01"] {
            for (price, fees) in [("50", "5"), ("0", "0"), ("1000", "999")] {
                let metrics = compute_metrics(d(price), d(fees), d(cost)).unwrap();
                assert!(metrics.net_profit.is_zero());
                assert!(metrics.roi.is_zero());
            }
        }
    }

    #[test]
    fn test_extreme_amounts_report_overflow() {
        let max = "79228162514264337593543950335";
        assert_eq!(
            compute_metrics(d(max), d("0"), d("20")),
            Err(MetricsError::Overflow("roi"))
        );
        assert!(compute_metrics(d("1000000000000000000000000000"), d("0"), d("0.01")).is_err());
        assert_eq!(
            compute_metrics(d("0"), d(max), d("20")),
            Err(MetricsError::Overflow("net profit"))
        );
        // Unknown cost short-circuits before any arithmetic.
        assert_eq!(compute_metrics(d(max), d("0"), d("0")), Ok(Metrics::default()));
    }
}
