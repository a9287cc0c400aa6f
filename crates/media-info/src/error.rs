use std::fmt;

use ffmpeg::ffi;

/// A negative result code returned by the native multimedia framework.
///
/// `EAGAIN` and `EOF` are ordinary flow signals for buffer sinks; every other
/// code is a failure.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvError(pub i32);

impl AvError {
    // errno values differ between platforms; AVERROR(e) is -e everywhere.
    pub const EAGAIN: Self = Self(-libc::EAGAIN);
    pub const ENOMEM: Self = Self(-libc::ENOMEM);
    pub const EINVAL: Self = Self(-libc::EINVAL);
    pub const ENOSYS: Self = Self(-libc::ENOSYS);
    pub const EOF: Self = Self(ffi::AVERROR_EOF);
    pub const INVALID_DATA: Self = Self(ffi::AVERROR_INVALIDDATA);
    pub const FILTER_NOT_FOUND: Self = Self(ffi::AVERROR_FILTER_NOT_FOUND);
    pub const OPTION_NOT_FOUND: Self = Self(ffi::AVERROR_OPTION_NOT_FOUND);
    pub const ENCODER_NOT_FOUND: Self = Self(ffi::AVERROR_ENCODER_NOT_FOUND);

    pub const fn code(&self) -> i32 {
        self.0
    }

    /// No data is available right now; more input is needed.
    pub const fn is_again(&self) -> bool {
        self.0 == Self::EAGAIN.0
    }

    pub const fn is_eof(&self) -> bool {
        self.0 == Self::EOF.0
    }

    /// Treats negative native return values as errors and passes through the rest.
    pub const fn check(ret: i32) -> Result<i32, AvError> {
        if ret < 0 { Err(AvError(ret)) } else { Ok(ret) }
    }

    pub fn describe(&self) -> &'static str {
        match *self {
            Self::EAGAIN => "Resource temporarily unavailable",
            Self::ENOMEM => "Cannot allocate memory",
            Self::EINVAL => "Invalid argument",
            Self::ENOSYS => "Function not implemented",
            Self::EOF => "End of file",
            Self::INVALID_DATA => "Invalid data found when processing input",
            Self::FILTER_NOT_FOUND => "Filter not found",
            Self::OPTION_NOT_FOUND => "Option not found",
            Self::ENCODER_NOT_FOUND => "Encoder not found",
            _ => "Native error",
        }
    }
}

impl fmt::Display for AvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.0)
    }
}

impl std::error::Error for AvError {}

impl From<ffmpeg::Error> for AvError {
    fn from(err: ffmpeg::Error) -> Self {
        Self(err.into())
    }
}

impl From<AvError> for ffmpeg::Error {
    fn from(err: AvError) -> Self {
        ffmpeg::Error::from(err.0)
    }
}

impl fmt::Debug for AvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AvError({}: {})", self.0, self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_codes_match_native_values() {
        assert_eq!(AvError::EOF.code(), -541_478_725);
        assert_eq!(AvError::EAGAIN.code(), -libc::EAGAIN);
        assert!(AvError::EOF.is_eof());
        assert!(!AvError::EOF.is_again());
        assert!(AvError::EAGAIN.is_again());
    }

    #[test]
    fn codes_agree_with_ffmpeg_errors() {
        assert!(AvError::from(ffmpeg::Error::Other { errno: libc::EAGAIN }).is_again());
        assert!(AvError::from(ffmpeg::Error::Eof).is_eof());
        assert_eq!(AvError::from(ffmpeg::Error::FilterNotFound), AvError::FILTER_NOT_FOUND);
        assert_eq!(ffmpeg::Error::from(AvError::EAGAIN), ffmpeg::Error::Other { errno: libc::EAGAIN });
    }

    #[test]
    fn check_passes_non_negative() {
        assert_eq!(AvError::check(3), Ok(3));
        assert_eq!(AvError::check(-libc::EINVAL), Err(AvError::EINVAL));
    }

    #[test]
    fn display_names_known_codes() {
        assert_eq!(
            AvError::EINVAL.to_string(),
            format!("Invalid argument ({})", -libc::EINVAL)
        );
        assert_eq!(AvError(-9999).to_string(), "Native error (-9999)");
    }
}
