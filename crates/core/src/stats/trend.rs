use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Trend {
    pub percent: u32,
    pub direction: TrendDirection,
}

impl Trend {
    const NEUTRAL: Trend = Trend { percent: 0, direction: TrendDirection::Neutral };
}

/// Period-over-period change, rounded to a whole percent.
///
/// A real change never shows as 0%: when rounding would hide it the trend
/// reports 1% in the direction of the raw change.
pub fn trend(current: Decimal, previous: Decimal) -> Trend {
    if previous.is_zero() {
        return if current > Decimal::ZERO {
            Trend { percent: 100, direction: TrendDirection::Up }
        } else {
            Trend::NEUTRAL
        };
    }

    let change = (current - previous) / previous * Decimal::ONE_HUNDRED;
    let rounded = (change + Decimal::new(5, 1)).floor();

    if rounded.is_zero() && current != previous {
        let direction =
            if change > Decimal::ZERO { TrendDirection::Up } else { TrendDirection::Down };
        return Trend { percent: 1, direction };
    }

    let direction = if rounded > Decimal::ZERO {
        TrendDirection::Up
    } else if rounded < Decimal::ZERO {
        TrendDirection::Down
    } else {
        TrendDirection::Neutral
    };
    Trend { percent: rounded.abs().to_u32().unwrap_or(u32::MAX), direction }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{trend, Trend, TrendDirection};

    fn t(current: i64, previous: i64) -> Trend {
        trend(Decimal::from(current), Decimal::from(previous))
    }

    fn expect(percent: u32, direction: TrendDirection) -> Trend {
        Trend { percent, direction }
    }

    #[test]
    fn zero_baselines() {
        assert_eq!(t(0, 0), expect(0, TrendDirection::Neutral));
        assert_eq!(t(5, 0), expect(100, TrendDirection::Up));
    }

    #[test]
    fn ordinary_changes_round_to_whole_percent() {
        assert_eq!(t(10, 10), expect(0, TrendDirection::Neutral));
        assert_eq!(t(11, 10), expect(10, TrendDirection::Up));
        assert_eq!(t(5, 10), expect(50, TrendDirection::Down));
        assert_eq!(t(3, 8), expect(62, TrendDirection::Down));
    }

    #[test]
    fn small_real_changes_never_show_as_flat() {
        assert_eq!(t(101, 100), expect(1, TrendDirection::Up));
        assert_eq!(t(1001, 1000), expect(1, TrendDirection::Up));
        assert_eq!(t(999, 1000), expect(1, TrendDirection::Down));
    }
}
