//! Finalizes the output encoder from what the configured sink negotiated,
//! before the first frames are pulled from it.

use avgraph_media_info::{MediaKind, Rational};
use avgraph_options::DictFlags;

use crate::{
    GraphError,
    backend::{Backend, NativeGraph, NodeId},
    logger::GraphLogger,
    settings::GraphSettings,
    stream::{CodecContext, Stream},
};

pub const DEFAULT_FRAME_RATE: Rational = Rational::new(25, 1);

pub(crate) struct Negotiator<'a, B: Backend> {
    pub backend: &'a B,
    pub settings: &'a GraphSettings,
    pub logger: &'a GraphLogger,
}

impl<B: Backend> Negotiator<'_, B> {
    /// Fills in the encoder of `output`, opens it and publishes its parameters
    /// on the stream. Does nothing when the encoder is already open.
    pub fn negotiate<I: Stream, O: Stream>(
        &self,
        kind: MediaKind,
        native: &mut B::Graph,
        sink: NodeId,
        input: Option<&I>,
        output: &mut O,
    ) -> Result<(), GraphError> {
        if output.codec().is_open() {
            return Ok(());
        }

        match kind {
            MediaKind::Video => self.video(native, sink, input, output),
            MediaKind::Audio => self.audio(native, sink, input, output),
        }

        let mut options = self.settings.encoder_options.clone();
        options.set("threads", "auto", DictFlags::DONT_OVERWRITE)?;
        output
            .codec_mut()
            .open(&options)
            .map_err(GraphError::EncoderOpen)?;

        let codec = output.codec();
        if kind == MediaKind::Audio && !codec.has_variable_frame_size() && codec.frame_size() > 0 {
            native.set_sink_frame_size(sink, codec.frame_size());
        }

        output
            .copy_parameters_from_codec()
            .map_err(GraphError::StreamInit)?;

        if let Some(input) = input {
            output.set_disposition(input.disposition());
        }

        Ok(())
    }

    fn video<I: Stream, O: Stream>(
        &self,
        native: &B::Graph,
        sink: NodeId,
        input: Option<&I>,
        output: &mut O,
    ) {
        let params = native.sink_params(sink);
        let decoder = input.map(|input| input.codec());

        let frame_rate = self.frame_rate(params.frame_rate, input, output.codec());

        let encoder = output.codec_mut();
        if let Some(decoder) = decoder {
            encoder.set_chroma_location(decoder.chroma_location());
        }

        encoder.set_frame_rate(frame_rate);
        if !encoder.time_base().is_valid() {
            encoder.set_time_base(frame_rate.invert());
        }

        encoder.set_width(params.width);
        encoder.set_height(params.height);
        encoder.set_sample_aspect_ratio(params.sample_aspect_ratio);
        encoder.set_pixel_format(params.pixel_format());

        let decoder_bits = decoder.map_or(0, CodecContext::bits_per_raw_sample);
        let depth = self.backend.pixel_format_depth(params.pixel_format());
        encoder.set_bits_per_raw_sample(depth.map_or(decoder_bits, |depth| decoder_bits.min(depth)));

        self.logger.info(format_args!(
            "encoder video {}x{} pix_fmt={} rate={frame_rate} time_base={}",
            params.width,
            params.height,
            params.format,
            encoder.time_base()
        ));

        output.set_avg_frame_rate(frame_rate);
    }

    fn frame_rate<I: Stream, C: CodecContext>(
        &self,
        sink_rate: Rational,
        input: Option<&I>,
        encoder: &C,
    ) -> Rational {
        let preset = self
            .settings
            .frame_rate
            .filter(Rational::is_valid)
            .or_else(|| Some(encoder.frame_rate()).filter(Rational::is_valid));

        let candidates = [
            preset,
            Some(sink_rate),
            input.map(|input| input.codec().frame_rate()),
            input.map(Stream::avg_frame_rate),
        ];

        let rate = candidates
            .into_iter()
            .flatten()
            .find(Rational::is_valid)
            .unwrap_or_else(|| {
                self.logger.warn(format_args!(
                    "no information about the input framerate is available, falling back to {DEFAULT_FRAME_RATE}"
                ));
                DEFAULT_FRAME_RATE
            });

        let forced = self.settings.force_frame_rate && preset.is_some();
        match encoder.supported_frame_rates() {
            Some(supported) if !forced => rate.nearest(&supported).unwrap_or(rate),
            _ => rate,
        }
    }

    fn audio<I: Stream, O: Stream>(
        &self,
        native: &B::Graph,
        sink: NodeId,
        input: Option<&I>,
        output: &mut O,
    ) {
        let params = native.sink_params(sink);
        let decoder_bits = input.map_or(0, |input| input.codec().bits_per_raw_sample());

        let encoder = output.codec_mut();
        encoder.set_sample_format(params.sample_format());
        encoder.set_sample_rate(params.sample_rate);
        encoder.set_channel_layout(params.channel_layout);
        encoder.set_channels(params.channels);
        encoder.set_time_base(Rational::new(1, params.sample_rate as i32));

        let sample_bits = (params.sample_format().bytes_per_sample() * 8) as u32;
        encoder.set_bits_per_raw_sample(decoder_bits.min(sample_bits));

        self.logger.info(format_args!(
            "encoder audio sample_fmt={} rate={} channels={} layout={}",
            params.format, params.sample_rate, params.channels, params.channel_layout
        ));
    }
}
