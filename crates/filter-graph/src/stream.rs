use avgraph_media_info::{
    AvError, ChannelLayout, ChromaLocation, Disposition, MediaKind, PixelFormat, Rational,
    SampleFormat,
};
use avgraph_options::Dictionary;

/// Decoder or encoder state paired with a stream.
///
/// Getters report what the context currently holds. An empty or zero value
/// means "not set". The `supported_*` lists are only meaningful for encoders;
/// `None` means the codec accepts anything.
pub trait CodecContext {
    fn kind(&self) -> MediaKind;

    fn width(&self) -> u32;
    fn set_width(&mut self, width: u32);
    fn height(&self) -> u32;
    fn set_height(&mut self, height: u32);
    fn pixel_format(&self) -> PixelFormat;
    fn set_pixel_format(&mut self, format: PixelFormat);
    fn sample_aspect_ratio(&self) -> Rational;
    fn set_sample_aspect_ratio(&mut self, sar: Rational);
    fn chroma_location(&self) -> ChromaLocation;
    fn set_chroma_location(&mut self, location: ChromaLocation);

    fn sample_format(&self) -> SampleFormat;
    fn set_sample_format(&mut self, format: SampleFormat);
    fn sample_rate(&self) -> u32;
    fn set_sample_rate(&mut self, rate: u32);
    fn channels(&self) -> u32;
    fn set_channels(&mut self, channels: u32);
    fn channel_layout(&self) -> ChannelLayout;
    fn set_channel_layout(&mut self, layout: ChannelLayout);

    fn time_base(&self) -> Rational;
    fn set_time_base(&mut self, time_base: Rational);
    fn frame_rate(&self) -> Rational;
    fn set_frame_rate(&mut self, rate: Rational);
    fn bits_per_raw_sample(&self) -> u32;
    fn set_bits_per_raw_sample(&mut self, bits: u32);

    /// Samples per audio frame the encoder expects. Zero when unconstrained.
    fn frame_size(&self) -> u32;
    fn has_variable_frame_size(&self) -> bool;

    fn supported_pixel_formats(&self) -> Option<Vec<PixelFormat>>;
    fn supported_sample_formats(&self) -> Option<Vec<SampleFormat>>;
    fn supported_sample_rates(&self) -> Option<Vec<u32>>;
    fn supported_channel_layouts(&self) -> Option<Vec<ChannelLayout>>;
    fn supported_frame_rates(&self) -> Option<Vec<Rational>>;

    fn is_open(&self) -> bool;
    fn open(&mut self, options: &Dictionary) -> Result<(), AvError>;
}

/// A container stream and its codec context.
pub trait Stream {
    type Codec: CodecContext;

    fn index(&self) -> usize;

    fn codec(&self) -> &Self::Codec;
    fn codec_mut(&mut self) -> &mut Self::Codec;

    fn time_base(&self) -> Rational;

    fn avg_frame_rate(&self) -> Rational;
    fn set_avg_frame_rate(&mut self, rate: Rational);

    /// Best guess at the real frame rate from container and codec hints.
    fn guess_frame_rate(&self) -> Rational;

    fn disposition(&self) -> Disposition;
    fn set_disposition(&mut self, disposition: Disposition);

    /// Fills the stream's codec parameters from its (opened) codec context.
    fn copy_parameters_from_codec(&mut self) -> Result<(), AvError>;
}
