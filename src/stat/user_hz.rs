use std::{
    ops::{Add, Div, Sub},
    str::FromStr,
};

/// a duration of cpu time, counted in clock ticks.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UserHz(u64);

// === impl UserHz ===

impl UserHz {
    pub const ZERO: Self = Self(0);
}

impl FromStr for UserHz {
    type Err = <u64 as FromStr>::Err;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u64> for UserHz {
    fn from(ticks: u64) -> Self {
        Self(ticks)
    }
}

impl Add for UserHz {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        let (Self(lhs), Self(rhs)) = (self, rhs);
        Self(lhs.saturating_add(rhs))
    }
}

/// NB: saturates at zero. the kernel's counters may step backwards (e.g. iowait, or a cpu being
/// hotplugged), and a negative duration means nothing to us.
impl Sub for UserHz {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        let (Self(lhs), Self(rhs)) = (self, rhs);
        Self(lhs.saturating_sub(rhs))
    }
}

impl Div for UserHz {
    type Output = f64;
    fn div(self, rhs: Self) -> Self::Output {
        let (Self(lhs), Self(rhs)) = (self, rhs);
        if rhs == 0 {
            return 0.0;
        }

        lhs as f64 / rhs as f64
    }
}
