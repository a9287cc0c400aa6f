//! Plain value types describing decoded media, shared by the option store and
//! the filter graph. Identifiers mirror the native framework's numbering so
//! they can cross the FFI boundary unchanged.

mod error;
mod rational;

pub use error::AvError;
pub use rational::{ParseRationalError, Rational};

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Filter description used when the caller supplies none.
    pub const fn passthrough_filter(&self) -> &'static str {
        match self {
            Self::Video => "null",
            Self::Audio => "anull",
        }
    }

    pub const fn source_filter(&self) -> &'static str {
        match self {
            Self::Video => "buffer",
            Self::Audio => "abuffer",
        }
    }

    pub const fn sink_filter(&self) -> &'static str {
        match self {
            Self::Video => "buffersink",
            Self::Audio => "abuffersink",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// Native pixel format id. Names and component depths are owned by the native
/// library and looked up through the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelFormat(pub i32);

impl PixelFormat {
    pub const NONE: Self = Self(-1);
    pub const YUV420P: Self = Self(0);
    pub const YUYV422: Self = Self(1);
    pub const RGB24: Self = Self(2);
    pub const BGR24: Self = Self(3);
    pub const YUV422P: Self = Self(4);
    pub const YUV444P: Self = Self(5);
    pub const GRAY8: Self = Self(8);
    pub const YUVJ420P: Self = Self(12);
    pub const YUVJ422P: Self = Self(13);
    pub const YUVJ444P: Self = Self(14);
    pub const NV12: Self = Self(23);
    pub const RGBA: Self = Self(26);
    pub const BGRA: Self = Self(28);

    pub const fn is_none(&self) -> bool {
        self.0 < 0
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::NONE
    }
}

/// Native sample format id. Sample formats are a closed set, so their names
/// and sizes live here rather than behind the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleFormat(pub i32);

impl SampleFormat {
    pub const NONE: Self = Self(-1);
    pub const U8: Self = Self(0);
    pub const S16: Self = Self(1);
    pub const S32: Self = Self(2);
    pub const FLT: Self = Self(3);
    pub const DBL: Self = Self(4);
    pub const U8P: Self = Self(5);
    pub const S16P: Self = Self(6);
    pub const S32P: Self = Self(7);
    pub const FLTP: Self = Self(8);
    pub const DBLP: Self = Self(9);
    pub const S64: Self = Self(10);
    pub const S64P: Self = Self(11);

    const NAMES: [(&'static str, usize); 12] = [
        ("u8", 1),
        ("s16", 2),
        ("s32", 4),
        ("flt", 4),
        ("dbl", 8),
        ("u8p", 1),
        ("s16p", 2),
        ("s32p", 4),
        ("fltp", 4),
        ("dblp", 8),
        ("s64", 8),
        ("s64p", 8),
    ];

    pub const fn is_none(&self) -> bool {
        self.0 < 0
    }

    pub fn name(&self) -> Option<&'static str> {
        self.entry().map(|(name, _)| name)
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.entry().map(|(_, bytes)| bytes).unwrap_or(0)
    }

    pub fn is_planar(&self) -> bool {
        matches!(
            *self,
            Self::U8P | Self::S16P | Self::S32P | Self::FLTP | Self::DBLP | Self::S64P
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|(candidate, _)| *candidate == name)
            .map(|index| Self(index as i32))
    }

    fn entry(&self) -> Option<(&'static str, usize)> {
        usize::try_from(self.0)
            .ok()
            .and_then(|index| Self::NAMES.get(index))
            .copied()
    }
}

impl Default for SampleFormat {
    fn default() -> Self {
        Self::NONE
    }
}

/// Speaker mask in native channel order. An empty mask means the layout is
/// unknown and only a channel count is available.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLayout(pub u64);

impl ChannelLayout {
    pub const FRONT_LEFT: u64 = 0x1;
    pub const FRONT_RIGHT: u64 = 0x2;
    pub const FRONT_CENTER: u64 = 0x4;
    pub const LOW_FREQUENCY: u64 = 0x8;
    pub const BACK_LEFT: u64 = 0x10;
    pub const BACK_RIGHT: u64 = 0x20;
    pub const BACK_CENTER: u64 = 0x100;
    pub const SIDE_LEFT: u64 = 0x200;
    pub const SIDE_RIGHT: u64 = 0x400;

    pub const UNSPECIFIED: Self = Self(0);
    pub const MONO: Self = Self(Self::FRONT_CENTER);
    pub const STEREO: Self = Self(Self::FRONT_LEFT | Self::FRONT_RIGHT);
    pub const _2POINT1: Self = Self(Self::STEREO.0 | Self::LOW_FREQUENCY);
    pub const SURROUND: Self = Self(Self::STEREO.0 | Self::FRONT_CENTER);
    pub const _4POINT0: Self = Self(Self::SURROUND.0 | Self::BACK_CENTER);
    pub const QUAD: Self = Self(Self::STEREO.0 | Self::BACK_LEFT | Self::BACK_RIGHT);
    pub const _5POINT0_BACK: Self = Self(Self::SURROUND.0 | Self::BACK_LEFT | Self::BACK_RIGHT);
    pub const _5POINT1_BACK: Self = Self(Self::_5POINT0_BACK.0 | Self::LOW_FREQUENCY);
    pub const _5POINT1: Self =
        Self(Self::SURROUND.0 | Self::LOW_FREQUENCY | Self::SIDE_LEFT | Self::SIDE_RIGHT);
    pub const _6POINT1: Self = Self(Self::_5POINT1.0 | Self::BACK_CENTER);
    pub const _7POINT1: Self = Self(Self::_5POINT1.0 | Self::BACK_LEFT | Self::BACK_RIGHT);

    /// The layout the native framework picks for a bare channel count.
    pub const fn default_for_channels(channels: u32) -> Option<Self> {
        Some(match channels {
            1 => Self::MONO,
            2 => Self::STEREO,
            3 => Self::_2POINT1,
            4 => Self::_4POINT0,
            5 => Self::_5POINT0_BACK,
            6 => Self::_5POINT1_BACK,
            7 => Self::_6POINT1,
            8 => Self::_7POINT1,
            _ => return None,
        })
    }

    pub const fn is_unspecified(&self) -> bool {
        self.0 == 0
    }

    pub const fn channels(&self) -> u32 {
        self.0.count_ones()
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChromaLocation(pub i32);

impl ChromaLocation {
    pub const UNSPECIFIED: Self = Self(0);
    pub const LEFT: Self = Self(1);
    pub const CENTER: Self = Self(2);
    pub const TOP_LEFT: Self = Self(3);
}

bitflags::bitflags! {
    /// Stream disposition bits, copied verbatim from an input stream to the
    /// output stream fed by the same graph.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Disposition: i32 {
        const DEFAULT = 0x0001;
        const DUB = 0x0002;
        const ORIGINAL = 0x0004;
        const COMMENT = 0x0008;
        const LYRICS = 0x0010;
        const KARAOKE = 0x0020;
        const FORCED = 0x0040;
        const HEARING_IMPAIRED = 0x0080;
        const VISUAL_IMPAIRED = 0x0100;
        const CLEAN_EFFECTS = 0x0200;
        const ATTACHED_PIC = 0x0400;
        const TIMED_THUMBNAILS = 0x0800;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layouts_match_channel_counts() {
        for channels in 1..=8 {
            let layout = ChannelLayout::default_for_channels(channels).unwrap();
            assert_eq!(layout.channels(), channels);
        }

        assert_eq!(ChannelLayout::default_for_channels(0), None);
        assert_eq!(ChannelLayout::default_for_channels(9), None);
    }

    #[test]
    fn sample_format_names_round_trip() {
        assert_eq!(SampleFormat::FLTP.name(), Some("fltp"));
        assert_eq!(SampleFormat::from_name("s16"), Some(SampleFormat::S16));
        assert_eq!(SampleFormat::NONE.name(), None);
        assert_eq!(SampleFormat::S32P.bytes_per_sample(), 4);
        assert!(SampleFormat::FLTP.is_planar());
        assert!(!SampleFormat::FLT.is_planar());
    }

    #[test]
    fn passthrough_depends_on_kind() {
        assert_eq!(MediaKind::Video.passthrough_filter(), "null");
        assert_eq!(MediaKind::Audio.passthrough_filter(), "anull");
    }

    #[test]
    fn media_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MediaKind::Audio).unwrap(), "\"audio\"");
    }
}
