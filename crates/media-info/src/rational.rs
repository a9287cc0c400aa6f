use std::{fmt, str::FromStr};

use ffmpeg::ffi;
use serde::{Deserialize, Serialize};

/// A time base, frame rate or aspect ratio expressed as `num/den`.
///
/// A zero denominator means "unknown", which is how the native layer reports
/// frame rates and aspect ratios it could not determine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const UNKNOWN: Self = Self::new(0, 0);
    pub const ZERO: Self = Self::new(0, 1);

    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Both terms are non-zero.
    pub const fn is_valid(&self) -> bool {
        self.num != 0 && self.den != 0
    }

    pub const fn invert(&self) -> Self {
        Self::new(self.den, self.num)
    }

    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }

        self.num as f64 / self.den as f64
    }

    /// Sample aspect ratios with a zero denominator are reported as `0/1`,
    /// which buffer sources accept as "undefined".
    pub const fn or_zero(self) -> Self {
        if self.den == 0 { Self::ZERO } else { self }
    }

    /// Index of the candidate closest to `self`, picked by
    /// `av_find_nearest_q_idx`. Ties resolve to the earliest candidate; like
    /// native lists, the candidates end at the first zero denominator.
    pub fn nearest_index(&self, candidates: &[Rational]) -> Option<usize> {
        let list = candidates
            .iter()
            .take_while(|candidate| candidate.den != 0)
            .map(|candidate| ffi::AVRational::from(*candidate))
            .chain([ffi::AVRational { num: 0, den: 0 }])
            .collect::<Vec<_>>();

        if list.len() == 1 {
            return None;
        }

        // SAFETY: `list` is terminated by 0/0 and outlives the call.
        let index = unsafe { ffi::av_find_nearest_q_idx((*self).into(), list.as_ptr()) };
        usize::try_from(index).ok()
    }

    pub fn nearest(&self, candidates: &[Rational]) -> Option<Rational> {
        self.nearest_index(candidates).map(|index| candidates[index])
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num, den)
    }
}

impl From<Rational> for ffi::AVRational {
    fn from(value: Rational) -> Self {
        ffi::AVRational {
            num: value.num,
            den: value.den,
        }
    }
}

impl From<ffi::AVRational> for Rational {
    fn from(value: ffi::AVRational) -> Self {
        Self::new(value.num, value.den)
    }
}

impl From<Rational> for ffmpeg::Rational {
    fn from(value: Rational) -> Self {
        ffmpeg::Rational::new(value.num, value.den)
    }
}

impl From<ffmpeg::Rational> for Rational {
    fn from(value: ffmpeg::Rational) -> Self {
        Self::new(value.numerator(), value.denominator())
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rational '{0}'")]
pub struct ParseRationalError(String);

impl FromStr for Rational {
    type Err = ParseRationalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| ParseRationalError(s.to_string()))
        };

        match s.split_once(['/', ':']) {
            Some((num, den)) => Ok(Self::new(parse(num)?, parse(den)?)),
            None => Ok(Self::new(parse(s)?, 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_prefers_smallest_distance() {
        let rates = [Rational::new(24, 1), Rational::new(30, 1), Rational::new(60, 1)];

        assert_eq!(Rational::new(25, 1).nearest(&rates), Some(Rational::new(24, 1)));
        assert_eq!(Rational::new(50, 1).nearest(&rates), Some(Rational::new(60, 1)));
    }

    #[test]
    fn nearest_handles_ntsc_rates() {
        let rates = [Rational::new(24000, 1001), Rational::new(30000, 1001)];

        assert_eq!(
            Rational::new(2997, 100).nearest(&rates),
            Some(Rational::new(30000, 1001))
        );
    }

    #[test]
    fn nearest_ties_keep_first() {
        let rates = [Rational::new(20, 1), Rational::new(30, 1)];
        assert_eq!(Rational::new(25, 1).nearest_index(&rates), Some(0));
    }

    #[test]
    fn nearest_of_nothing() {
        assert_eq!(Rational::new(25, 1).nearest(&[]), None);
        assert_eq!(Rational::new(25, 1).nearest(&[Rational::UNKNOWN]), None);
    }

    #[test]
    fn nearest_stops_at_terminator() {
        let rates = [Rational::new(24, 1), Rational::UNKNOWN, Rational::new(25, 1)];
        assert_eq!(Rational::new(25, 1).nearest(&rates), Some(Rational::new(24, 1)));
    }

    #[test]
    fn converts_to_and_from_ffmpeg() {
        let rate = Rational::new(30000, 1001);
        let native = ffmpeg::Rational::from(rate);

        assert_eq!((native.numerator(), native.denominator()), (30000, 1001));
        assert_eq!(Rational::from(native), rate);
    }

    #[test]
    fn parses_both_separators() {
        assert_eq!("30000/1001".parse(), Ok(Rational::new(30000, 1001)));
        assert_eq!("16:9".parse(), Ok(Rational::new(16, 9)));
        assert_eq!("25".parse(), Ok(Rational::new(25, 1)));
        assert!("x/1".parse::<Rational>().is_err());
    }

    #[test]
    fn undefined_aspect_ratio_becomes_zero() {
        assert_eq!(Rational::new(1, 0).or_zero(), Rational::ZERO);
        assert_eq!(Rational::new(4, 3).or_zero(), Rational::new(4, 3));
    }
}
