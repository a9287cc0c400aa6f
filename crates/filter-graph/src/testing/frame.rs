use avgraph_media_info::{ChannelLayout, MediaKind, PixelFormat, Rational, SampleFormat};

use crate::backend::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    I,
    P,
    B,
}

impl PictureType {
    pub fn letter(&self) -> char {
        match self {
            Self::I => 'I',
            Self::P => 'P',
            Self::B => 'B',
        }
    }
}

/// Format description shared by frames, sources and sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameProps {
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub sample_aspect_ratio: Rational,
    pub sample_format: SampleFormat,
    pub sample_rate: u32,
    pub channels: u32,
    pub channel_layout: ChannelLayout,
    pub time_base: Rational,
    pub frame_rate: Rational,
}

impl FrameProps {
    pub fn video(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            kind: MediaKind::Video,
            width,
            height,
            pixel_format,
            sample_aspect_ratio: Rational::new(1, 1),
            sample_format: SampleFormat::NONE,
            sample_rate: 0,
            channels: 0,
            channel_layout: ChannelLayout::UNSPECIFIED,
            time_base: Rational::UNKNOWN,
            frame_rate: Rational::UNKNOWN,
        }
    }

    pub fn audio(sample_format: SampleFormat, sample_rate: u32, layout: ChannelLayout) -> Self {
        Self {
            kind: MediaKind::Audio,
            width: 0,
            height: 0,
            pixel_format: PixelFormat::NONE,
            sample_aspect_ratio: Rational::UNKNOWN,
            sample_format,
            sample_rate,
            channels: layout.channels(),
            channel_layout: layout,
            time_base: Rational::UNKNOWN,
            frame_rate: Rational::UNKNOWN,
        }
    }

    /// Whether a frame with these props can enter a source configured with
    /// `other` without a format change.
    pub(crate) fn same_format(&self, other: &FrameProps) -> bool {
        match self.kind {
            MediaKind::Video => {
                self.width == other.width
                    && self.height == other.height
                    && self.pixel_format == other.pixel_format
            }
            MediaKind::Audio => {
                self.sample_format == other.sample_format
                    && self.sample_rate == other.sample_rate
                    && self.channels == other.channels
            }
        }
    }
}

/// A decoded frame without payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFrame {
    pub props: FrameProps,
    pub pts: Option<i64>,
    pub picture_type: PictureType,
    /// Samples per channel for audio frames.
    pub samples: u32,
}

impl TestFrame {
    pub fn video(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            props: FrameProps::video(width, height, pixel_format),
            pts: None,
            picture_type: PictureType::I,
            samples: 0,
        }
    }

    pub fn audio(
        sample_format: SampleFormat,
        sample_rate: u32,
        layout: ChannelLayout,
        samples: u32,
    ) -> Self {
        Self {
            props: FrameProps::audio(sample_format, sample_rate, layout),
            pts: None,
            picture_type: PictureType::I,
            samples,
        }
    }

    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn with_picture_type(mut self, picture_type: PictureType) -> Self {
        self.picture_type = picture_type;
        self
    }

    pub fn with_sample_aspect_ratio(mut self, sar: Rational) -> Self {
        self.props.sample_aspect_ratio = sar;
        self
    }

    /// Drops the channel layout but keeps the channel count.
    pub fn without_layout(mut self) -> Self {
        self.props.channel_layout = ChannelLayout::UNSPECIFIED;
        self
    }

    /// A group-of-pictures sequence: an I frame every `gop` frames, P frames
    /// in between. Pts count up from zero.
    pub fn video_sequence(
        count: usize,
        gop: usize,
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
    ) -> Vec<Self> {
        (0..count)
            .map(|index| {
                let picture_type = if index % gop.max(1) == 0 {
                    PictureType::I
                } else {
                    PictureType::P
                };
                Self::video(width, height, pixel_format)
                    .with_pts(index as i64)
                    .with_picture_type(picture_type)
            })
            .collect()
    }
}

impl Frame for TestFrame {
    fn width(&self) -> u32 {
        self.props.width
    }

    fn height(&self) -> u32 {
        self.props.height
    }

    fn pixel_format(&self) -> PixelFormat {
        self.props.pixel_format
    }

    fn sample_format(&self) -> SampleFormat {
        self.props.sample_format
    }

    fn sample_rate(&self) -> u32 {
        self.props.sample_rate
    }

    fn channels(&self) -> u32 {
        self.props.channels
    }

    fn channel_layout(&self) -> ChannelLayout {
        self.props.channel_layout
    }

    fn sample_aspect_ratio(&self) -> Rational {
        self.props.sample_aspect_ratio
    }

    fn pts(&self) -> Option<i64> {
        self.pts
    }
}
