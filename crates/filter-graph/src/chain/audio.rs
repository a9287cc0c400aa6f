use avgraph_media_info::ChannelLayout;
use avgraph_options::{DictFlags, Dictionary};

use super::{allowed, join};
use crate::{
    ConfigError,
    backend::{Backend, Frame, NodeId, Port},
    node::{NodeFactory, NodeKind},
    stream::{CodecContext, Stream},
};

/// `abuffer -> [description] -> [aformat] -> abuffersink`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AudioChain;

impl AudioChain {
    pub fn configure_input<B: Backend, S: Stream>(
        &self,
        factory: &mut NodeFactory<'_, B::Graph>,
        index: usize,
        port: &Port,
        frame: &B::Frame,
        stream: &S,
    ) -> Result<NodeId, ConfigError> {
        let args = source_args(frame, stream);
        let source = factory.create(NodeKind::AudioSource, index, Some(&args), &Dictionary::new())?;
        factory.link_into(source, port)?;

        Ok(source)
    }

    pub fn configure_output<B: Backend, S: Stream>(
        &self,
        factory: &mut NodeFactory<'_, B::Graph>,
        index: usize,
        port: &Port,
        stream: &mut S,
    ) -> Result<NodeId, ConfigError> {
        let mut sink_options = Dictionary::new();
        sink_options
            .set_int("all_channel_counts", 1, DictFlags::empty())
            .map_err(|source| ConfigError::Option {
                target: NodeKind::AudioSink.instance_name(index),
                key: "all_channel_counts".to_string(),
                source,
            })?;
        let sink = factory.create(NodeKind::AudioSink, index, None, &sink_options)?;

        let codec = stream.codec_mut();
        let default_layout = ChannelLayout::default_for_channels(codec.channels())
            .filter(|_| codec.channel_layout().is_unspecified());
        if let Some(layout) = default_layout {
            codec.set_channel_layout(layout);
        }

        let mut chain = Vec::with_capacity(2);
        if let Some(args) = aformat_args(&*codec) {
            chain.push(factory.create(NodeKind::AudioFormat, index, Some(&args), &Dictionary::new())?);
        }

        chain.push(sink);
        factory.link_chain(port, &chain)?;

        Ok(sink)
    }
}

fn source_args<F: Frame, S: Stream>(frame: &F, stream: &S) -> String {
    let sample_format = frame.sample_format();
    let mut args = format!(
        "time_base={}:sample_rate={}:sample_fmt={}",
        stream.time_base(),
        frame.sample_rate(),
        sample_format
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| sample_format.0.to_string()),
    );

    let layout = frame.channel_layout();
    if layout.is_unspecified() {
        args.push_str(&format!(":channels={}", frame.channels()));
    } else {
        args.push_str(&format!(":channel_layout={layout}"));
    }

    args
}

fn aformat_args<C: CodecContext>(codec: &C) -> Option<String> {
    let mut parts = Vec::with_capacity(3);

    let preset = Some(codec.sample_format()).filter(|format| !format.is_none());
    let formats = allowed(preset, codec.supported_sample_formats());
    if !formats.is_empty() {
        parts.push(format!(
            "sample_fmts={}",
            join(&formats, |format| format
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format.0.to_string()))
        ));
    }

    let preset = Some(codec.sample_rate()).filter(|rate| *rate > 0);
    let rates = allowed(preset, codec.supported_sample_rates());
    if !rates.is_empty() {
        parts.push(format!("sample_rates={}", join(&rates, u32::to_string)));
    }

    let preset = Some(codec.channel_layout()).filter(|layout| !layout.is_unspecified());
    let layouts = allowed(preset, codec.supported_channel_layouts());
    if !layouts.is_empty() {
        parts.push(format!(
            "channel_layouts={}",
            join(&layouts, ChannelLayout::to_string)
        ));
    }

    (!parts.is_empty()).then(|| parts.join(":"))
}
