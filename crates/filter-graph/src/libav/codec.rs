use avgraph_media_info::{
    AvError, ChannelLayout, ChromaLocation, Disposition, MediaKind, PixelFormat, Rational,
    SampleFormat,
};
use avgraph_options::Dictionary;
use ffmpeg::{codec, ffi, format};

use super::{to_av_chroma_location, to_av_pixel_format, to_av_sample_format};
use crate::stream::{CodecContext, Stream};

/// Reads a list terminated by `is_end` into a vector. A null list means the
/// codec places no restriction.
///
/// # Safety
///
/// `list` must be null or point to a terminated array.
unsafe fn terminated<T: Copy, U>(
    list: *const T,
    is_end: impl Fn(&T) -> bool,
    map: impl Fn(T) -> U,
) -> Option<Vec<U>> {
    if list.is_null() {
        return None;
    }

    let mut values = Vec::new();
    let mut current = list;
    loop {
        let value = unsafe { *current };
        if is_end(&value) {
            break;
        }
        values.push(map(value));
        current = unsafe { current.add(1) };
    }
    Some(values)
}

/// A libavcodec context, decoder or encoder, that stays a plain context after
/// opening so its fields can keep being read.
pub struct FfmpegCodec {
    context: codec::Context,
}

impl FfmpegCodec {
    /// An encoder context for `codec`, not yet opened.
    pub fn encoder(codec: codec::Codec) -> Self {
        Self {
            context: codec::Context::new_with_codec(codec),
        }
    }

    /// An encoder context for the codec registered under `name`.
    pub fn encoder_by_name(name: &str) -> Result<Self, AvError> {
        codec::encoder::find_by_name(name)
            .map(Self::encoder)
            .ok_or(AvError::ENCODER_NOT_FOUND)
    }

    /// A decoder context filled from a demuxed stream's parameters.
    pub fn from_parameters(parameters: codec::Parameters) -> Result<Self, AvError> {
        let context =
            codec::Context::from_parameters(parameters).map_err(AvError::from)?;
        Ok(Self { context })
    }

    pub fn as_context(&self) -> &codec::Context {
        &self.context
    }

    pub fn into_context(self) -> codec::Context {
        self.context
    }

    fn raw(&self) -> &ffi::AVCodecContext {
        // SAFETY: the context is allocated for as long as `self` lives.
        unsafe { &*self.context.as_ptr() }
    }

    fn raw_mut(&mut self) -> &mut ffi::AVCodecContext {
        // SAFETY: see `raw`.
        unsafe { &mut *self.context.as_mut_ptr() }
    }

    fn codec(&self) -> Option<&ffi::AVCodec> {
        // SAFETY: `codec` is null or a static codec definition.
        unsafe { self.raw().codec.as_ref() }
    }
}

impl CodecContext for FfmpegCodec {
    fn kind(&self) -> MediaKind {
        match self.raw().codec_type {
            ffi::AVMediaType::AVMEDIA_TYPE_AUDIO => MediaKind::Audio,
            _ => MediaKind::Video,
        }
    }

    fn width(&self) -> u32 {
        self.raw().width.max(0) as u32
    }

    fn set_width(&mut self, width: u32) {
        self.raw_mut().width = width as i32;
    }

    fn height(&self) -> u32 {
        self.raw().height.max(0) as u32
    }

    fn set_height(&mut self, height: u32) {
        self.raw_mut().height = height as i32;
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat(self.raw().pix_fmt as i32)
    }

    fn set_pixel_format(&mut self, format: PixelFormat) {
        self.raw_mut().pix_fmt = to_av_pixel_format(format);
    }

    fn sample_aspect_ratio(&self) -> Rational {
        Rational::from(self.raw().sample_aspect_ratio)
    }

    fn set_sample_aspect_ratio(&mut self, sar: Rational) {
        self.raw_mut().sample_aspect_ratio = sar.into();
    }

    fn chroma_location(&self) -> ChromaLocation {
        ChromaLocation(self.raw().chroma_sample_location as i32)
    }

    fn set_chroma_location(&mut self, location: ChromaLocation) {
        self.raw_mut().chroma_sample_location = to_av_chroma_location(location);
    }

    fn sample_format(&self) -> SampleFormat {
        SampleFormat(self.raw().sample_fmt as i32)
    }

    fn set_sample_format(&mut self, format: SampleFormat) {
        self.raw_mut().sample_fmt = to_av_sample_format(format);
    }

    fn sample_rate(&self) -> u32 {
        self.raw().sample_rate.max(0) as u32
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.raw_mut().sample_rate = rate as i32;
    }

    fn channels(&self) -> u32 {
        self.raw().ch_layout.nb_channels.max(0) as u32
    }

    fn set_channels(&mut self, channels: u32) {
        let layout = &mut self.raw_mut().ch_layout;
        if layout.nb_channels == channels as i32 {
            return;
        }
        // SAFETY: the layout belongs to the context and is reinitialized.
        unsafe {
            ffi::av_channel_layout_uninit(layout);
            ffi::av_channel_layout_default(layout, channels as i32);
        }
    }

    fn channel_layout(&self) -> ChannelLayout {
        let layout = &self.raw().ch_layout;
        if layout.order != ffi::AVChannelOrder::AV_CHANNEL_ORDER_NATIVE {
            return ChannelLayout::UNSPECIFIED;
        }
        // SAFETY: `mask` is the active member for native ordering.
        ChannelLayout(unsafe { layout.u.mask })
    }

    fn set_channel_layout(&mut self, layout: ChannelLayout) {
        if layout.is_unspecified() {
            return;
        }
        let native = &mut self.raw_mut().ch_layout;
        // SAFETY: see `set_channels`.
        unsafe {
            ffi::av_channel_layout_uninit(native);
            ffi::av_channel_layout_from_mask(native, layout.bits());
        }
    }

    fn time_base(&self) -> Rational {
        Rational::from(self.raw().time_base)
    }

    fn set_time_base(&mut self, time_base: Rational) {
        self.raw_mut().time_base = time_base.into();
    }

    fn frame_rate(&self) -> Rational {
        Rational::from(self.raw().framerate)
    }

    fn set_frame_rate(&mut self, rate: Rational) {
        self.raw_mut().framerate = rate.into();
    }

    fn bits_per_raw_sample(&self) -> u32 {
        self.raw().bits_per_raw_sample.max(0) as u32
    }

    fn set_bits_per_raw_sample(&mut self, bits: u32) {
        self.raw_mut().bits_per_raw_sample = bits as i32;
    }

    fn frame_size(&self) -> u32 {
        self.raw().frame_size.max(0) as u32
    }

    fn has_variable_frame_size(&self) -> bool {
        self.codec().is_some_and(|codec| {
            codec.capabilities as u32 & ffi::AV_CODEC_CAP_VARIABLE_FRAME_SIZE != 0
        })
    }

    fn supported_pixel_formats(&self) -> Option<Vec<PixelFormat>> {
        let codec = self.codec()?;
        // SAFETY: terminated by AV_PIX_FMT_NONE.
        unsafe {
            terminated(
                codec.pix_fmts,
                |format| *format == ffi::AVPixelFormat::AV_PIX_FMT_NONE,
                |format| PixelFormat(format as i32),
            )
        }
    }

    fn supported_sample_formats(&self) -> Option<Vec<SampleFormat>> {
        let codec = self.codec()?;
        // SAFETY: terminated by AV_SAMPLE_FMT_NONE.
        unsafe {
            terminated(
                codec.sample_fmts,
                |format| *format == ffi::AVSampleFormat::AV_SAMPLE_FMT_NONE,
                |format| SampleFormat(format as i32),
            )
        }
    }

    fn supported_sample_rates(&self) -> Option<Vec<u32>> {
        let codec = self.codec()?;
        // SAFETY: zero-terminated.
        unsafe { terminated(codec.supported_samplerates, |rate| *rate == 0, |rate| rate as u32) }
    }

    fn supported_channel_layouts(&self) -> Option<Vec<ChannelLayout>> {
        let codec = self.codec()?;
        // SAFETY: terminated by a zeroed layout. Layouts without a native
        // mask cannot be expressed and are skipped.
        let layouts = unsafe {
            terminated(
                codec.ch_layouts,
                |layout| layout.nb_channels == 0,
                |layout| {
                    (layout.order == ffi::AVChannelOrder::AV_CHANNEL_ORDER_NATIVE)
                        .then(|| ChannelLayout(layout.u.mask))
                },
            )
        }?;
        Some(layouts.into_iter().flatten().collect())
    }

    fn supported_frame_rates(&self) -> Option<Vec<Rational>> {
        let codec = self.codec()?;
        // SAFETY: terminated by 0/0.
        unsafe {
            terminated(
                codec.supported_framerates,
                |rate| rate.num == 0 && rate.den == 0,
                Rational::from,
            )
        }
    }

    fn is_open(&self) -> bool {
        // SAFETY: a valid context pointer.
        unsafe { ffi::avcodec_is_open(self.context.as_ptr().cast_mut()) > 0 }
    }

    fn open(&mut self, options: &Dictionary) -> Result<(), AvError> {
        // SAFETY: ownership of the copy goes to `native` and comes back below.
        let mut native = unsafe { options.to_native().disown() };
        // SAFETY: the context was allocated with its codec; the call may
        // replace `native` with the options it did not consume.
        let ret = unsafe {
            ffi::avcodec_open2(self.context.as_mut_ptr(), self.raw().codec, &mut native)
        };
        drop(unsafe { ffmpeg::Dictionary::own(native) });
        AvError::check(ret)?;
        Ok(())
    }
}

/// A container stream paired with its codec context.
///
/// The snapshot is taken from the container when the stream is set up and is
/// written back with [`FfmpegStream::apply_to`] before the header is written.
pub struct FfmpegStream {
    index: usize,
    codec: FfmpegCodec,
    time_base: Rational,
    avg_frame_rate: Rational,
    r_frame_rate: Rational,
    disposition: Disposition,
    parameters: codec::Parameters,
}

impl FfmpegStream {
    /// A demuxed stream and its decoder.
    pub fn from_input(stream: &format::stream::Stream, codec: FfmpegCodec) -> Self {
        // SAFETY: reading the raw disposition of a live stream.
        let disposition = unsafe { (*stream.as_ptr()).disposition };

        Self {
            index: stream.index(),
            codec,
            time_base: Rational::from(stream.time_base()),
            avg_frame_rate: Rational::from(stream.avg_frame_rate()),
            r_frame_rate: Rational::from(stream.rate()),
            disposition: Disposition::from_bits_truncate(disposition),
            parameters: stream.parameters(),
        }
    }

    /// A muxer stream at `index`, encoded by `codec`.
    pub fn output(index: usize, codec: FfmpegCodec) -> Self {
        Self {
            index,
            codec,
            time_base: Rational::UNKNOWN,
            avg_frame_rate: Rational::UNKNOWN,
            r_frame_rate: Rational::UNKNOWN,
            disposition: Disposition::empty(),
            parameters: codec::Parameters::new(),
        }
    }

    pub fn parameters(&self) -> &codec::Parameters {
        &self.parameters
    }

    pub fn into_codec(self) -> FfmpegCodec {
        self.codec
    }

    /// Writes the negotiated state into the muxer's stream.
    pub fn apply_to(&self, stream: &mut format::stream::StreamMut) {
        stream.set_parameters(self.parameters.clone());

        let time_base = if self.time_base.is_valid() {
            self.time_base
        } else {
            self.codec.time_base()
        };
        stream.set_time_base((time_base.num, time_base.den));
        stream.set_avg_frame_rate((self.avg_frame_rate.num, self.avg_frame_rate.den));

        // SAFETY: plain field write on a live stream.
        unsafe { (*stream.as_mut_ptr()).disposition = self.disposition.bits() };
    }
}

impl Stream for FfmpegStream {
    type Codec = FfmpegCodec;

    fn index(&self) -> usize {
        self.index
    }

    fn codec(&self) -> &FfmpegCodec {
        &self.codec
    }

    fn codec_mut(&mut self) -> &mut FfmpegCodec {
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
        [self.r_frame_rate, self.avg_frame_rate, self.codec.frame_rate()]
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
        // SAFETY: both objects are live; the parameters are overwritten.
        AvError::check(unsafe {
            ffi::avcodec_parameters_from_context(
                self.parameters.as_mut_ptr(),
                self.codec.context.as_ptr(),
            )
        })?;
        Ok(())
    }
}
