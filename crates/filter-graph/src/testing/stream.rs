use avgraph_media_info::{
    AvError, ChannelLayout, ChromaLocation, Disposition, MediaKind, PixelFormat, Rational,
    SampleFormat,
};
use avgraph_options::Dictionary;

use crate::stream::{CodecContext, Stream};

/// Codec context whose "open" only records the call.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCodec {
    pub name: String,
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub sample_aspect_ratio: Rational,
    pub chroma_location: ChromaLocation,
    pub sample_format: SampleFormat,
    pub sample_rate: u32,
    pub channels: u32,
    pub channel_layout: ChannelLayout,
    pub time_base: Rational,
    pub frame_rate: Rational,
    pub bits_per_raw_sample: u32,
    pub frame_size: u32,
    pub variable_frame_size: bool,
    pub supported_pixel_formats: Option<Vec<PixelFormat>>,
    pub supported_sample_formats: Option<Vec<SampleFormat>>,
    pub supported_sample_rates: Option<Vec<u32>>,
    pub supported_channel_layouts: Option<Vec<ChannelLayout>>,
    pub supported_frame_rates: Option<Vec<Rational>>,
    /// Returned by the next `open` instead of succeeding.
    pub open_error: Option<AvError>,
    pub open_count: usize,
    pub open_options: Option<Dictionary>,
}

impl TestCodec {
    fn empty(name: &str, kind: MediaKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            width: 0,
            height: 0,
            pixel_format: PixelFormat::NONE,
            sample_aspect_ratio: Rational::UNKNOWN,
            chroma_location: ChromaLocation::UNSPECIFIED,
            sample_format: SampleFormat::NONE,
            sample_rate: 0,
            channels: 0,
            channel_layout: ChannelLayout::UNSPECIFIED,
            time_base: Rational::UNKNOWN,
            frame_rate: Rational::UNKNOWN,
            bits_per_raw_sample: 0,
            frame_size: 0,
            variable_frame_size: true,
            supported_pixel_formats: None,
            supported_sample_formats: None,
            supported_sample_rates: None,
            supported_channel_layouts: None,
            supported_frame_rates: None,
            open_error: None,
            open_count: 0,
            open_options: None,
        }
    }

    pub fn video_decoder(width: u32, height: u32, pixel_format: PixelFormat, rate: Rational) -> Self {
        Self {
            width,
            height,
            pixel_format,
            frame_rate: rate,
            sample_aspect_ratio: Rational::new(1, 1),
            bits_per_raw_sample: 8,
            chroma_location: ChromaLocation::LEFT,
            ..Self::empty("h264", MediaKind::Video)
        }
    }

    pub fn audio_decoder(sample_format: SampleFormat, sample_rate: u32, layout: ChannelLayout) -> Self {
        Self {
            sample_format,
            sample_rate,
            channels: layout.channels(),
            channel_layout: layout,
            bits_per_raw_sample: 16,
            ..Self::empty("pcm", MediaKind::Audio)
        }
    }

    /// An encoder that accepts any format and size.
    pub fn video_encoder(name: &str) -> Self {
        Self::empty(name, MediaKind::Video)
    }

    pub fn audio_encoder(name: &str) -> Self {
        Self::empty(name, MediaKind::Audio)
    }

    /// Motion JPEG at a fixed size: full-range YUV only.
    pub fn mjpeg(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            supported_pixel_formats: Some(vec![
                PixelFormat::YUVJ420P,
                PixelFormat::YUVJ422P,
                PixelFormat::YUVJ444P,
            ]),
            ..Self::empty("mjpeg", MediaKind::Video)
        }
    }

    /// AAC: planar float, fixed 1024-sample frames.
    pub fn aac() -> Self {
        Self {
            frame_size: 1024,
            variable_frame_size: false,
            supported_sample_formats: Some(vec![SampleFormat::FLTP]),
            supported_sample_rates: Some(vec![
                96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000,
                7350,
            ]),
            ..Self::empty("aac", MediaKind::Audio)
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    pub fn with_sample_format(mut self, format: SampleFormat) -> Self {
        self.sample_format = format;
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_time_base(mut self, time_base: Rational) -> Self {
        self.time_base = time_base;
        self
    }

    pub fn with_frame_rate(mut self, rate: Rational) -> Self {
        self.frame_rate = rate;
        self
    }

    pub fn with_bits_per_raw_sample(mut self, bits: u32) -> Self {
        self.bits_per_raw_sample = bits;
        self
    }

    pub fn with_supported_frame_rates(mut self, rates: Vec<Rational>) -> Self {
        self.supported_frame_rates = Some(rates);
        self
    }

    pub fn with_supported_pixel_formats(mut self, formats: Vec<PixelFormat>) -> Self {
        self.supported_pixel_formats = Some(formats);
        self
    }

    pub fn with_open_error(mut self, error: AvError) -> Self {
        self.open_error = Some(error);
        self
    }
}

impl CodecContext for TestCodec {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_height(&mut self, height: u32) {
        self.height = height;
    }

    fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    fn set_pixel_format(&mut self, format: PixelFormat) {
        self.pixel_format = format;
    }

    fn sample_aspect_ratio(&self) -> Rational {
        self.sample_aspect_ratio
    }

    fn set_sample_aspect_ratio(&mut self, sar: Rational) {
        self.sample_aspect_ratio = sar;
    }

    fn chroma_location(&self) -> ChromaLocation {
        self.chroma_location
    }

    fn set_chroma_location(&mut self, location: ChromaLocation) {
        self.chroma_location = location;
    }

    fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    fn set_sample_format(&mut self, format: SampleFormat) {
        self.sample_format = format;
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
    }

    fn channels(&self) -> u32 {
        self.channels
    }

    fn set_channels(&mut self, channels: u32) {
        self.channels = channels;
    }

    fn channel_layout(&self) -> ChannelLayout {
        self.channel_layout
    }

    fn set_channel_layout(&mut self, layout: ChannelLayout) {
        self.channel_layout = layout;
    }

    fn time_base(&self) -> Rational {
        self.time_base
    }

    fn set_time_base(&mut self, time_base: Rational) {
        self.time_base = time_base;
    }

    fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    fn set_frame_rate(&mut self, rate: Rational) {
        self.frame_rate = rate;
    }

    fn bits_per_raw_sample(&self) -> u32 {
        self.bits_per_raw_sample
    }

    fn set_bits_per_raw_sample(&mut self, bits: u32) {
        self.bits_per_raw_sample = bits;
    }

    fn frame_size(&self) -> u32 {
        self.frame_size
    }

    fn has_variable_frame_size(&self) -> bool {
        self.variable_frame_size
    }

    fn supported_pixel_formats(&self) -> Option<Vec<PixelFormat>> {
        self.supported_pixel_formats.clone()
    }

    fn supported_sample_formats(&self) -> Option<Vec<SampleFormat>> {
        self.supported_sample_formats.clone()
    }

    fn supported_sample_rates(&self) -> Option<Vec<u32>> {
        self.supported_sample_rates.clone()
    }

    fn supported_channel_layouts(&self) -> Option<Vec<ChannelLayout>> {
        self.supported_channel_layouts.clone()
    }

    fn supported_frame_rates(&self) -> Option<Vec<Rational>> {
        self.supported_frame_rates.clone()
    }

    fn is_open(&self) -> bool {
        self.open_count > 0
    }

    fn open(&mut self, options: &Dictionary) -> Result<(), AvError> {
        if self.is_open() {
            return Err(AvError::EINVAL);
        }

        if let Some(error) = self.open_error.take() {
            return Err(error);
        }

        self.open_count += 1;
        self.open_options = Some(options.clone());
        Ok(())
    }
}

/// What `copy_parameters_from_codec` published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamParameters {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub format: i32,
    pub sample_rate: u32,
    pub channels: u32,
    pub channel_layout: ChannelLayout,
    pub bits_per_raw_sample: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestStream {
    pub index: usize,
    pub codec: TestCodec,
    pub time_base: Rational,
    pub avg_frame_rate: Rational,
    /// Container-level rate guess, preferred over `avg_frame_rate`.
    pub r_frame_rate: Rational,
    pub disposition: Disposition,
    pub parameters: Option<StreamParameters>,
    pub copy_error: Option<AvError>,
}

impl TestStream {
    pub fn new(index: usize, codec: TestCodec) -> Self {
        Self {
            index,
            codec,
            time_base: Rational::UNKNOWN,
            avg_frame_rate: Rational::UNKNOWN,
            r_frame_rate: Rational::UNKNOWN,
            disposition: Disposition::empty(),
            parameters: None,
            copy_error: None,
        }
    }

    /// A decoded video stream with the usual 90kHz container time base.
    pub fn video_input(index: usize, width: u32, height: u32, rate: Rational) -> Self {
        Self {
            time_base: Rational::new(1, 90_000),
            avg_frame_rate: rate,
            r_frame_rate: rate,
            disposition: Disposition::DEFAULT,
            ..Self::new(
                index,
                TestCodec::video_decoder(width, height, PixelFormat::YUV420P, rate),
            )
        }
    }

    pub fn audio_input(index: usize, sample_rate: u32, layout: ChannelLayout) -> Self {
        Self {
            time_base: Rational::new(1, sample_rate as i32),
            disposition: Disposition::DEFAULT,
            ..Self::new(
                index,
                TestCodec::audio_decoder(SampleFormat::S16, sample_rate, layout),
            )
        }
    }

    pub fn with_time_base(mut self, time_base: Rational) -> Self {
        self.time_base = time_base;
        self
    }

    pub fn with_rates(mut self, avg_frame_rate: Rational, r_frame_rate: Rational) -> Self {
        self.avg_frame_rate = avg_frame_rate;
        self.r_frame_rate = r_frame_rate;
        self
    }

    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    pub fn with_copy_error(mut self, error: AvError) -> Self {
        self.copy_error = Some(error);
        self
    }
}

impl Stream for TestStream {
    type Codec = TestCodec;

    fn index(&self) -> usize {
        self.index
    }

    fn codec(&self) -> &TestCodec {
        &self.codec
    }

    fn codec_mut(&mut self) -> &mut TestCodec {
        &mut self.codec
    }

    fn time_base(&self) -> Rational {
        self.time_base
    }

    fn avg_frame_rate(&self) -> Rational {
        self.avg_frame_rate
    }

    fn set_avg_frame_rate(&mut self, rate: Rational) {
        self.avg_frame_rate = rate;
    }

    fn guess_frame_rate(&self) -> Rational {
        [self.r_frame_rate, self.avg_frame_rate, self.codec.frame_rate]
            .into_iter()
            .find(Rational::is_valid)
            .unwrap_or(Rational::UNKNOWN)
    }

    fn disposition(&self) -> Disposition {
        self.disposition
    }

    fn set_disposition(&mut self, disposition: Disposition) {
        self.disposition = disposition;
    }

    fn copy_parameters_from_codec(&mut self) -> Result<(), AvError> {
        if let Some(error) = self.copy_error {
            return Err(error);
        }

        let codec = &self.codec;
        self.parameters = Some(StreamParameters {
            codec: codec.name.clone(),
            width: codec.width,
            height: codec.height,
            format: match codec.kind {
                MediaKind::Video => codec.pixel_format.0,
                MediaKind::Audio => codec.sample_format.0,
            },
            sample_rate: codec.sample_rate,
            channels: codec.channels,
            channel_layout: codec.channel_layout,
            bits_per_raw_sample: codec.bits_per_raw_sample,
        });

        Ok(())
    }
}
