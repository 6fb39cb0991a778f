// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Minor-unit money. Gross/net/patient-share/payment amounts are summed
//! repeatedly while aggregating remittances (cumulative-with-cap); `i64`
//! cents keeps that exact where `f64` would drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use crate::error::IngestionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Parses a decimal string with up to two fraction digits, the shape
    /// every amount in the wire XML takes (e.g. `"90.00"`).
    pub fn from_decimal_str(s: &str) -> Result<Self, IngestionError> {
        let s = s.trim();
        let negative = s.starts_with('-');
        let s = s.strip_prefix('-').unwrap_or(s);
        let mut parts = s.splitn(2, '.');
        let whole = parts.next().unwrap_or("0");
        let frac = parts.next().unwrap_or("0");
        if frac.len() > 2 {
            return Err(IngestionError::validation(format!("amount has more than 2 fraction digits: {s}")));
        }
        let whole: i64 = whole
            .parse()
            .map_err(|_| IngestionError::validation(format!("invalid amount: {s}")))?;
        let frac_padded = format!("{:0<2}", frac);
        let frac: i64 = frac_padded
            .parse()
            .map_err(|_| IngestionError::validation(format!("invalid amount: {s}")))?;
        let cents = whole * 100 + frac;
        Ok(Self(if negative { -cents } else { cents }))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Clamps `self` to at most `cap`, used by the cumulative-with-cap
    /// remittance aggregation rule.
    pub fn capped_at(&self, cap: Money) -> Money {
        if self.0 > cap.0 {
            cap
        } else {
            *self
        }
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_decimal_amounts() {
        assert_eq!(Money::from_decimal_str("90.00").unwrap(), Money::from_cents(9000));
        assert_eq!(Money::from_decimal_str("0.05").unwrap(), Money::from_cents(5));
    }

    #[test]
    fn parses_whole_amounts() {
        assert_eq!(Money::from_decimal_str("100").unwrap(), Money::from_cents(10000));
    }

    #[test]
    fn rejects_too_many_fraction_digits() {
        assert!(Money::from_decimal_str("1.234").is_err());
    }

    #[test]
    fn caps_at_net() {
        let net = Money::from_cents(9000);
        let paid = Money::from_cents(15000);
        assert_eq!(paid.capped_at(net), net);
    }

    #[test]
    fn sums_across_iterator() {
        let total: Money = vec![Money::from_cents(6000), Money::from_cents(3000)].into_iter().sum();
        assert_eq!(total, Money::from_cents(9000));
    }

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::from_cents(9000).to_string(), "90.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }

    proptest::proptest! {
        #[test]
        fn display_then_parse_round_trips(cents in -1_000_000_000i64..1_000_000_000i64) {
            let money = Money::from_cents(cents);
            let reparsed = Money::from_decimal_str(&money.to_string()).unwrap();
            proptest::prop_assert_eq!(money, reparsed);
        }

        #[test]
        fn cap_never_exceeds_the_cap(paid in 0i64..10_000_000i64, net in 0i64..10_000_000i64) {
            let capped = Money::from_cents(paid).capped_at(Money::from_cents(net));
            proptest::prop_assert!(capped <= Money::from_cents(net));
        }
    }
}
