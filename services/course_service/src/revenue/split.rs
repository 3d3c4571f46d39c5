use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Currency precision used for the platform share.
const CURRENCY_DP: u32 = 2;

/// Fixed 80/20 split of revenue between course creators and the platform.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RevenueSplit {
    pub total_revenue: Decimal,
    pub creator_earnings: Decimal,
    pub platform_share: Decimal,
}

impl RevenueSplit {
    /// Share of the revenue kept by the platform, 20%.
    pub fn platform_rate() -> Decimal {
        Decimal::new(2, 1)
    }

    /// Share of the revenue paid to the creator, 80%.
    pub fn creator_rate() -> Decimal {
        Decimal::ONE - Self::platform_rate()
    }

    /// The platform share is rounded to currency precision and the creator gets the remainder, so
    /// both parts always add up to the total.
    pub fn from_total(total_revenue: Decimal) -> Self {
        let platform_share = (total_revenue * Self::platform_rate())
            .round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero);

        RevenueSplit {
            total_revenue,
            creator_earnings: total_revenue - platform_share,
            platform_share,
        }
    }

    pub fn zero() -> Self {
        Self::from_total(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn sprint_course_example() {
        let split = RevenueSplit::from_total(Decimal::new(1499, 0));

        assert_eq!(split.total_revenue, Decimal::new(1499, 0));
        assert_eq!(split.creator_earnings, Decimal::new(119920, 2));
        assert_eq!(split.platform_share, Decimal::new(29980, 2));
    }

    #[rstest]
    #[case(Decimal::new(1, 2))]
    #[case(Decimal::new(333, 2))]
    #[case(Decimal::new(100_001, 3))]
    #[case(Decimal::new(987_654_321, 2))]
    fn parts_add_up_to_total(#[case] total: Decimal) {
        let split = RevenueSplit::from_total(total);
        assert_eq!(split.creator_earnings + split.platform_share, total);
    }

    #[test]
    fn zero_revenue_is_zero_everywhere() {
        let split = RevenueSplit::zero();
        assert!(split.creator_earnings.is_zero());
        assert!(split.platform_share.is_zero());
    }

    #[test]
    fn rates_are_fixed() {
        assert_eq!(RevenueSplit::creator_rate(), Decimal::new(8, 1));
        assert_eq!(RevenueSplit::platform_rate() + RevenueSplit::creator_rate(), Decimal::ONE);
    }
}
