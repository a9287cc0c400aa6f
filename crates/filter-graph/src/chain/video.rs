use avgraph_options::Dictionary;

use super::{allowed, join};
use crate::{
    ConfigError,
    backend::{Backend, Frame, NodeId, Port},
    node::{NodeFactory, NodeKind},
    stream::{CodecContext, Stream},
};

/// `buffer -> [description] -> [scale] -> [format] -> buffersink`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VideoChain;

impl VideoChain {
    pub fn configure_input<B: Backend, S: Stream>(
        &self,
        factory: &mut NodeFactory<'_, B::Graph>,
        index: usize,
        port: &Port,
        frame: &B::Frame,
        stream: &S,
    ) -> Result<NodeId, ConfigError> {
        let args = source_args(frame, stream);
        let source = factory.create(NodeKind::VideoSource, index, Some(&args), &Dictionary::new())?;
        factory.link_into(source, port)?;

        Ok(source)
    }

    pub fn configure_output<B: Backend, S: Stream>(
        &self,
        factory: &mut NodeFactory<'_, B::Graph>,
        backend: &B,
        index: usize,
        port: &Port,
        frame: &B::Frame,
        stream: &mut S,
    ) -> Result<NodeId, ConfigError> {
        let sink = factory.create(NodeKind::VideoSink, index, None, &Dictionary::new())?;
        let codec = stream.codec();

        let mut chain = Vec::with_capacity(3);

        if let Some(args) = scale_args(codec, frame) {
            chain.push(factory.create(NodeKind::Scale, index, Some(&args), &Dictionary::new())?);
        }

        let preset = Some(codec.pixel_format()).filter(|format| !format.is_none());
        let formats = allowed(preset, codec.supported_pixel_formats());
        if !formats.is_empty() {
            let args = format!(
                "pix_fmts={}",
                join(&formats, |format| backend
                    .pixel_format_name(*format)
                    .unwrap_or_else(|| format.0.to_string()))
            );
            chain.push(factory.create(NodeKind::Format, index, Some(&args), &Dictionary::new())?);
        }

        chain.push(sink);
        factory.link_chain(port, &chain)?;

        Ok(sink)
    }
}

fn source_args<F: Frame, S: Stream>(frame: &F, stream: &S) -> String {
    let mut args = format!(
        "video_size={}x{}:pix_fmt={}:time_base={}:pixel_aspect={}",
        frame.width(),
        frame.height(),
        frame.pixel_format().0,
        stream.time_base(),
        frame.sample_aspect_ratio().or_zero(),
    );

    let frame_rate = stream.guess_frame_rate();
    if frame_rate.is_valid() {
        args.push_str(&format!(":frame_rate={frame_rate}"));
    }

    args
}

/// A scaler is only needed when the encoder asks for a concrete size other
/// than the decoded one.
fn scale_args<C: CodecContext, F: Frame>(codec: &C, frame: &F) -> Option<String> {
    let (width, height) = (codec.width(), codec.height());

    if width == 0 || height == 0 {
        return None;
    }

    if width == frame.width() && height == frame.height() {
        return None;
    }

    Some(format!("{width}:{height}:flags=bicubic"))
}
