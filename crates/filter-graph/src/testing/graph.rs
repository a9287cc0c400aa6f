use std::collections::{HashMap, VecDeque};

use avgraph_media_info::{AvError, ChannelLayout, MediaKind, PixelFormat, Rational, SampleFormat};
use avgraph_options::{Configurable, DictFlags, Dictionary};

use super::{
    frame::{FrameProps, PictureType, TestFrame},
    parse::parse_description,
    pixel_format_by_name,
};
use crate::backend::{NativeGraph, NodeId, ParsedPorts, Port, PullFlags, PushFlags, SinkParams};

const GRAPH_OPTIONS: &[&str] = &["scale_sws_opts", "aresample_swr_opts", "threads", "thread_type"];

/// What a node in the test graph does with the frames reaching it.
#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Source(FrameProps),
    Sink,
    Passthrough,
    Select(Option<PictureType>, bool),
    Scale(u32, u32),
    Format(Vec<PixelFormat>),
    AudioFormat {
        sample_formats: Vec<SampleFormat>,
        sample_rates: Vec<u32>,
        channel_layouts: Vec<ChannelLayout>,
    },
    Stack(StackDirection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackDirection {
    Horizontal,
    Vertical,
    Overlay,
}

impl Filter {
    fn input_count(&self) -> usize {
        match self {
            Self::Source(_) => 0,
            Self::Stack(_) => 2,
            _ => 1,
        }
    }

    fn output_count(&self) -> usize {
        match self {
            Self::Sink => 0,
            _ => 1,
        }
    }
}

/// Public view of a node, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub filter: String,
    pub name: String,
    pub args: Option<String>,
    pub options: Dictionary,
}

#[derive(Debug)]
enum Item {
    Frame(TestFrame),
    Eof,
}

#[derive(Debug, Default)]
struct SinkState {
    /// Frames that reached the sink, split to `frame_size` only once read.
    incoming: VecDeque<TestFrame>,
    ended: bool,
    queue: VecDeque<TestFrame>,
    eof: bool,
    frame_size: u32,
    /// Samples waiting to fill a fixed-size frame.
    partial: Option<TestFrame>,
}

#[derive(Debug, Default)]
struct NodeState {
    /// Source frames not yet pushed into the graph.
    pending: VecDeque<Item>,
    closed: bool,
    /// Per-input queues of multi-input filters.
    waiting: Vec<VecDeque<TestFrame>>,
    input_eof: Vec<bool>,
    sink: SinkState,
}

#[derive(Debug)]
struct Node {
    kind: MediaKind,
    filter_name: String,
    name: String,
    args: Option<String>,
    options: Dictionary,
    filter: Filter,
    inputs: Vec<Option<(NodeId, u32)>>,
    outputs: Vec<Option<(NodeId, u32)>>,
    state: NodeState,
    sink_params: SinkParams,
}

/// A filter graph that moves frame metadata around instead of pixels.
///
/// Sources keep pushed frames until they are pushed with
/// [`PushFlags::PUSH`] or the graph is asked for its oldest frame, which is
/// enough to observe the difference between "try again" and end of stream.
#[derive(Debug, Default)]
pub struct TestGraph {
    nodes: Vec<Node>,
    options: Dictionary,
    configured: bool,
    request_error: Option<AvError>,
}

impl TestGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph whose `request_oldest` still moves queued frames but then
    /// reports `err`.
    pub fn with_request_error(err: AvError) -> Self {
        Self {
            request_error: Some(err),
            ..Self::default()
        }
    }

    pub fn nodes(&self) -> Vec<NodeInfo> {
        self.nodes
            .iter()
            .map(|node| NodeInfo {
                filter: node.filter_name.clone(),
                name: node.name.clone(),
                args: node.args.clone(),
                options: node.options.clone(),
            })
            .collect()
    }

    /// Nodes created from `filter`, in creation order.
    pub fn nodes_of(&self, filter: &str) -> Vec<NodeInfo> {
        self.nodes()
            .into_iter()
            .filter(|node| node.filter == filter)
            .collect()
    }

    pub fn node(&self, id: NodeId) -> Option<NodeInfo> {
        self.nodes().into_iter().nth(id.0)
    }

    pub fn graph_options(&self) -> &Dictionary {
        &self.options
    }

    pub fn sink_frame_size(&self, sink: NodeId) -> Option<u32> {
        self.nodes
            .get(sink.0)
            .map(|node| node.state.sink.frame_size)
            .filter(|size| *size > 0)
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    fn add_node(
        &mut self,
        filter_name: &str,
        name: String,
        args: Option<&str>,
        options: &Dictionary,
    ) -> Result<NodeId, AvError> {
        let (kind, filter) = build_filter(filter_name, args.unwrap_or_default(), options)?;

        let node = Node {
            kind,
            filter_name: filter_name.to_string(),
            name,
            args: args.map(str::to_string),
            options: options.clone(),
            inputs: vec![None; filter.input_count()],
            outputs: vec![None; filter.output_count()],
            state: NodeState {
                waiting: vec![VecDeque::new(); filter.input_count()],
                input_eof: vec![false; filter.input_count()],
                ..Default::default()
            },
            filter,
            sink_params: SinkParams::default(),
        };

        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, AvError> {
        self.nodes.get_mut(id.0).ok_or(AvError::EINVAL)
    }

    /// Output props of `id`, derived from its inputs.
    fn output_props(&self, id: NodeId, depth: usize) -> Result<FrameProps, AvError> {
        if depth > self.nodes.len() {
            return Err(AvError::EINVAL);
        }

        let node = &self.nodes[id.0];
        let mut inputs = Vec::with_capacity(node.inputs.len());
        for input in &node.inputs {
            let (upstream, _) = input.ok_or(AvError::EINVAL)?;
            inputs.push(self.output_props(upstream, depth + 1)?);
        }

        Ok(match &node.filter {
            Filter::Source(props) => *props,
            Filter::Stack(direction) => stack_props(*direction, &inputs[0], &inputs[1]),
            filter => transform_props(filter, inputs[0]),
        })
    }

    /// Feeds `item` to input `pad` of `id` and everything downstream of it.
    fn deliver(&mut self, id: NodeId, pad: u32, item: Item) {
        let mut work = VecDeque::from([(id, pad, item)]);

        while let Some((id, pad, item)) = work.pop_front() {
            let node = &mut self.nodes[id.0];
            let mut emitted = Vec::new();

            match (&node.filter, item) {
                (Filter::Sink, Item::Frame(frame)) => node.state.sink.accept(frame),
                (Filter::Sink, Item::Eof) => node.state.sink.finish(),
                (Filter::Stack(direction), Item::Frame(frame)) => {
                    let direction = *direction;
                    node.state.waiting[pad as usize].push_back(frame);
                    if node.state.waiting.iter().all(|queue| !queue.is_empty()) {
                        let main = node.state.waiting[0].pop_front();
                        let second = node.state.waiting[1].pop_front();
                        if let (Some(main), Some(second)) = (main, second) {
                            let mut frame = main;
                            frame.props = stack_props(direction, &frame.props, &second.props);
                            emitted.push(Item::Frame(frame));
                        }
                    }
                }
                (Filter::Stack(_), Item::Eof) => {
                    node.state.input_eof[pad as usize] = true;
                    if node.state.input_eof.iter().all(|eof| *eof) {
                        emitted.push(Item::Eof);
                    }
                }
                (filter, Item::Frame(frame)) => {
                    if let Some(frame) = transform_frame(filter, frame) {
                        emitted.push(Item::Frame(frame));
                    }
                }
                (_, Item::Eof) => emitted.push(Item::Eof),
            }

            if let Some(Some((next, next_pad))) = node.outputs.first().copied() {
                work.extend(emitted.into_iter().map(|item| (next, next_pad, item)));
            }
        }
    }

    /// Moves everything queued on sources into the graph.
    fn flush_sources(&mut self) -> bool {
        let mut moved = false;

        for index in 0..self.nodes.len() {
            while let Some(item) = self.nodes[index].state.pending.pop_front() {
                moved = true;
                if let Some(Some((next, pad))) = self.nodes[index].outputs.first().copied() {
                    self.deliver(next, pad, item);
                }
            }
        }

        moved
    }

    fn source_mut(&mut self, id: NodeId) -> Result<&mut Node, AvError> {
        if !self.configured {
            return Err(AvError::EINVAL);
        }

        let node = self.node_mut(id)?;
        match node.filter {
            Filter::Source(_) => Ok(node),
            _ => Err(AvError::EINVAL),
        }
    }

    fn enqueue(&mut self, source: NodeId, item: Item, flags: PushFlags) {
        self.nodes[source.0].state.pending.push_back(item);

        if flags.contains(PushFlags::PUSH) {
            while let Some(item) = self.nodes[source.0].state.pending.pop_front() {
                if let Some(Some((next, pad))) = self.nodes[source.0].outputs.first().copied() {
                    self.deliver(next, pad, item);
                }
            }
        }
    }
}

impl SinkState {
    fn accept(&mut self, frame: TestFrame) {
        self.incoming.push_back(frame);
    }

    fn finish(&mut self) {
        self.ended = true;
    }

    /// Moves what reached the sink into the read queue at the current frame
    /// size.
    fn settle(&mut self) {
        while let Some(frame) = self.incoming.pop_front() {
            self.split(frame);
        }
        if self.ended && !self.eof {
            if let Some(partial) = self.partial.take() {
                self.queue.push_back(partial);
            }
            self.eof = true;
        }
    }

    fn split(&mut self, frame: TestFrame) {
        if self.frame_size == 0 || frame.props.kind != MediaKind::Audio {
            self.queue.push_back(frame);
            return;
        }

        let mut partial = match self.partial.take() {
            Some(mut partial) => {
                partial.samples += frame.samples;
                partial
            }
            None => frame,
        };

        while partial.samples >= self.frame_size {
            let mut chunk = partial.clone();
            chunk.samples = self.frame_size;
            self.queue.push_back(chunk);

            partial.samples -= self.frame_size;
            partial.pts = partial.pts.map(|pts| pts + i64::from(self.frame_size));
        }

        if partial.samples > 0 {
            self.partial = Some(partial);
        }
    }
}

impl Configurable for TestGraph {
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), AvError> {
        if !GRAPH_OPTIONS.contains(&key) {
            return Err(AvError::OPTION_NOT_FOUND);
        }

        self.options.set(key, value, DictFlags::empty())
    }
}

impl NativeGraph for TestGraph {
    type Frame = TestFrame;

    fn parse(&mut self, description: &str) -> Result<ParsedPorts, AvError> {
        let chains = parse_description(description)?;

        let mut open_inputs: Vec<Port> = Vec::new();
        let mut open_outputs: Vec<Port> = Vec::new();

        for chain in chains {
            let mut carried: Vec<(NodeId, u32)> = Vec::new();
            let last = chain.len().saturating_sub(1);

            for (position, spec) in chain.into_iter().enumerate() {
                let name = format!("Parsed_{}_{}", spec.name, self.nodes.len());
                let node = self.add_node(&spec.name, name, spec.args.as_deref(), &Dictionary::new())?;
                let (input_count, output_count) = {
                    let node = &self.nodes[node.0];
                    (node.inputs.len() as u32, node.outputs.len() as u32)
                };

                let mut entries = carried
                    .drain(..)
                    .map(Ok)
                    .chain(spec.inputs.into_iter().map(Err))
                    .collect::<VecDeque<_>>();

                for pad in 0..input_count {
                    match entries.pop_front() {
                        Some(Ok((from, from_pad))) => self.link(from, from_pad, node, pad)?,
                        Some(Err(label)) => {
                            let matched = open_outputs
                                .iter()
                                .position(|port| port.label.as_deref() == Some(label.as_str()));
                            match matched {
                                Some(index) => {
                                    let port = open_outputs.remove(index);
                                    self.link(port.node, port.pad, node, pad)?;
                                }
                                None => open_inputs.push(Port {
                                    node,
                                    pad,
                                    label: Some(label),
                                }),
                            }
                        }
                        None => open_inputs.push(Port {
                            node,
                            pad,
                            label: None,
                        }),
                    }
                }

                if !entries.is_empty() || spec.outputs.len() as u32 > output_count {
                    return Err(AvError::EINVAL);
                }

                let mut labels = spec.outputs.into_iter();
                for pad in 0..output_count {
                    match labels.next() {
                        Some(label) => {
                            let matched = open_inputs
                                .iter()
                                .position(|port| port.label.as_deref() == Some(label.as_str()));
                            match matched {
                                Some(index) => {
                                    let port = open_inputs.remove(index);
                                    self.link(node, pad, port.node, port.pad)?;
                                }
                                None => open_outputs.push(Port {
                                    node,
                                    pad,
                                    label: Some(label),
                                }),
                            }
                        }
                        None if position < last => carried.push((node, pad)),
                        None => open_outputs.push(Port {
                            node,
                            pad,
                            label: None,
                        }),
                    }
                }
            }
        }

        Ok(ParsedPorts {
            inputs: open_inputs,
            outputs: open_outputs,
        })
    }

    fn create_filter(
        &mut self,
        filter: &str,
        name: &str,
        args: Option<&str>,
        options: &Dictionary,
    ) -> Result<NodeId, AvError> {
        if self.nodes.iter().any(|node| node.name == name) {
            return Err(AvError::EINVAL);
        }

        self.add_node(filter, name.to_string(), args, options)
    }

    fn link(
        &mut self,
        src: NodeId,
        src_pad: u32,
        dst: NodeId,
        dst_pad: u32,
    ) -> Result<(), AvError> {
        let (src_kind, dst_kind) = match (self.nodes.get(src.0), self.nodes.get(dst.0)) {
            (Some(src), Some(dst)) => (src.kind, dst.kind),
            _ => return Err(AvError::EINVAL),
        };

        if src_kind != dst_kind {
            return Err(AvError::EINVAL);
        }

        let output = self.nodes[src.0]
            .outputs
            .get(src_pad as usize)
            .copied()
            .ok_or(AvError::EINVAL)?;
        let input = self.nodes[dst.0]
            .inputs
            .get(dst_pad as usize)
            .copied()
            .ok_or(AvError::EINVAL)?;

        if output.is_some() || input.is_some() {
            return Err(AvError::EINVAL);
        }

        self.nodes[src.0].outputs[src_pad as usize] = Some((dst, dst_pad));
        self.nodes[dst.0].inputs[dst_pad as usize] = Some((src, src_pad));

        Ok(())
    }

    fn node_name(&self, node: NodeId) -> Option<String> {
        self.nodes.get(node.0).map(|node| node.name.clone())
    }

    fn configure(&mut self) -> Result<(), AvError> {
        let unlinked = self.nodes.iter().any(|node| {
            node.inputs.iter().any(Option::is_none) || node.outputs.iter().any(Option::is_none)
        });
        if unlinked {
            return Err(AvError::EINVAL);
        }

        for index in 0..self.nodes.len() {
            if self.nodes[index].filter != Filter::Sink {
                continue;
            }

            let props = self.output_props(NodeId(index), 0)?;
            self.nodes[index].sink_params = SinkParams {
                format: match props.kind {
                    MediaKind::Video => props.pixel_format.0,
                    MediaKind::Audio => props.sample_format.0,
                },
                width: props.width,
                height: props.height,
                sample_aspect_ratio: props.sample_aspect_ratio,
                time_base: props.time_base,
                frame_rate: props.frame_rate,
                sample_rate: props.sample_rate,
                channels: props.channels,
                channel_layout: props.channel_layout,
            };
        }

        self.configured = true;
        Ok(())
    }

    fn push_frame(
        &mut self,
        source: NodeId,
        frame: &TestFrame,
        flags: PushFlags,
    ) -> Result<(), AvError> {
        let node = self.source_mut(source)?;
        if node.state.closed {
            return Err(AvError::EOF);
        }

        let Filter::Source(props) = &node.filter else {
            return Err(AvError::EINVAL);
        };
        if !flags.contains(PushFlags::NO_CHECK_FORMAT) && !frame.props.same_format(props) {
            return Err(AvError::EINVAL);
        }

        let mut frame = frame.clone();
        frame.props.time_base = props.time_base;
        frame.props.frame_rate = props.frame_rate;

        self.enqueue(source, Item::Frame(frame), flags);
        Ok(())
    }

    fn close_source(
        &mut self,
        source: NodeId,
        _pts: Option<i64>,
        flags: PushFlags,
    ) -> Result<(), AvError> {
        let node = self.source_mut(source)?;
        if node.state.closed {
            return Ok(());
        }
        node.state.closed = true;

        self.enqueue(source, Item::Eof, flags);
        Ok(())
    }

    fn pull_frame(&mut self, sink: NodeId, flags: PullFlags) -> Result<TestFrame, AvError> {
        if !self.configured || self.nodes.get(sink.0).map(|node| &node.filter) != Some(&Filter::Sink) {
            return Err(AvError::EINVAL);
        }

        self.nodes[sink.0].state.sink.settle();
        if self.nodes[sink.0].state.sink.queue.is_empty() && !flags.contains(PullFlags::NO_REQUEST) {
            self.flush_sources();
        }

        let state = &mut self.nodes[sink.0].state.sink;
        state.settle();
        let frame = if flags.contains(PullFlags::PEEK) {
            state.queue.front().cloned()
        } else {
            state.queue.pop_front()
        };

        match frame {
            Some(frame) => Ok(frame),
            None if state.eof => Err(AvError::EOF),
            None => Err(AvError::EAGAIN),
        }
    }

    fn request_oldest(&mut self) -> Result<(), AvError> {
        let moved = self.flush_sources();
        if let Some(err) = self.request_error {
            return Err(err);
        }
        if moved {
            return Ok(());
        }

        let sinks_done = self
            .nodes
            .iter()
            .filter(|node| node.filter == Filter::Sink)
            .all(|node| node.state.sink.ended);

        if sinks_done { Err(AvError::EOF) } else { Err(AvError::EAGAIN) }
    }

    fn sink_params(&self, sink: NodeId) -> SinkParams {
        self.nodes
            .get(sink.0)
            .map(|node| node.sink_params)
            .unwrap_or_default()
    }

    fn set_sink_frame_size(&mut self, sink: NodeId, frame_size: u32) {
        if let Some(node) = self.nodes.get_mut(sink.0) {
            node.state.sink.frame_size = frame_size;
        }
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn dump(&self) -> String {
        let mut out = String::new();

        for node in &self.nodes {
            out.push_str(&format!(
                "[{}] ({}) {}\n",
                node.name,
                node.filter_name,
                node.args.as_deref().unwrap_or_default()
            ));
            for (pad, output) in node.outputs.iter().enumerate() {
                if let Some((next, next_pad)) = output {
                    out.push_str(&format!(
                        "  {pad} -> {}:{next_pad}\n",
                        self.nodes[next.0].name
                    ));
                }
            }
        }

        out
    }
}

fn build_filter(
    filter: &str,
    args: &str,
    options: &Dictionary,
) -> Result<(MediaKind, Filter), AvError> {
    for (key, _) in options.iter() {
        if !(filter == "abuffersink" && key == "all_channel_counts") {
            return Err(AvError::OPTION_NOT_FOUND);
        }
    }

    let built = match filter {
        "buffer" => (MediaKind::Video, Filter::Source(video_source_props(args)?)),
        "abuffer" => (MediaKind::Audio, Filter::Source(audio_source_props(args)?)),
        "buffersink" => (MediaKind::Video, Filter::Sink),
        "abuffersink" => (MediaKind::Audio, Filter::Sink),
        "null" | "copy" | "setpts" | "fps" => (MediaKind::Video, Filter::Passthrough),
        "anull" | "acopy" | "asetpts" => (MediaKind::Audio, Filter::Passthrough),
        "select" => {
            let (picture_type, keep) = select_expr(args)?;
            (MediaKind::Video, Filter::Select(picture_type, keep))
        }
        "scale" => {
            let (width, height) = scale_size(args)?;
            (MediaKind::Video, Filter::Scale(width, height))
        }
        "format" => {
            let list = named_list(args, "pix_fmts")?;
            let formats = list
                .iter()
                .map(|name| pixel_format_by_name(name).ok_or(AvError::EINVAL))
                .collect::<Result<Vec<_>, _>>()?;
            (MediaKind::Video, Filter::Format(formats))
        }
        "aformat" => (MediaKind::Audio, audio_format(args)?),
        "hstack" => (MediaKind::Video, Filter::Stack(StackDirection::Horizontal)),
        "vstack" => (MediaKind::Video, Filter::Stack(StackDirection::Vertical)),
        "overlay" => (MediaKind::Video, Filter::Stack(StackDirection::Overlay)),
        _ => return Err(AvError::FILTER_NOT_FOUND),
    };

    Ok(built)
}

fn key_values(args: &str) -> HashMap<&str, &str> {
    args.split(':')
        .filter_map(|pair| pair.split_once('='))
        .collect()
}

fn rational(value: &str) -> Result<Rational, AvError> {
    value.parse().map_err(|_| AvError::EINVAL)
}

fn number<T: std::str::FromStr>(value: &str) -> Result<T, AvError> {
    value.parse().map_err(|_| AvError::EINVAL)
}

fn video_source_props(args: &str) -> Result<FrameProps, AvError> {
    let values = key_values(args);
    let required = |key: &str| values.get(key).copied().ok_or(AvError::EINVAL);

    let (width, height) = required("video_size")?
        .split_once('x')
        .ok_or(AvError::EINVAL)?;
    let format = required("pix_fmt")?;
    let pixel_format = match format.parse::<i32>() {
        Ok(id) => PixelFormat(id),
        Err(_) => pixel_format_by_name(format).ok_or(AvError::EINVAL)?,
    };

    let mut props = FrameProps::video(number(width)?, number(height)?, pixel_format);
    props.time_base = rational(required("time_base")?)?;
    props.sample_aspect_ratio = match values.get("pixel_aspect") {
        Some(sar) => rational(sar)?,
        None => Rational::ZERO,
    };
    if let Some(rate) = values.get("frame_rate") {
        props.frame_rate = rational(rate)?;
    }

    Ok(props)
}

fn audio_source_props(args: &str) -> Result<FrameProps, AvError> {
    let values = key_values(args);
    let required = |key: &str| values.get(key).copied().ok_or(AvError::EINVAL);

    let sample_format = SampleFormat::from_name(required("sample_fmt")?).ok_or(AvError::EINVAL)?;
    let layout = match values.get("channel_layout") {
        Some(layout) => channel_layout(layout)?,
        None => ChannelLayout::UNSPECIFIED,
    };

    let mut props = FrameProps::audio(sample_format, number(required("sample_rate")?)?, layout);
    if layout.is_unspecified() {
        props.channels = number(required("channels")?)?;
    }
    props.time_base = rational(required("time_base")?)?;

    Ok(props)
}

fn channel_layout(value: &str) -> Result<ChannelLayout, AvError> {
    let hex = value.strip_prefix("0x").ok_or(AvError::EINVAL)?;
    u64::from_str_radix(hex, 16)
        .map(ChannelLayout)
        .map_err(|_| AvError::EINVAL)
}

fn select_expr(args: &str) -> Result<(Option<PictureType>, bool), AvError> {
    let expr = args.strip_prefix("expr=").unwrap_or(args);

    match expr {
        "" | "1" => Ok((None, true)),
        "0" => Ok((None, false)),
        "eq(pict_type,I)" => Ok((Some(PictureType::I), true)),
        "eq(pict_type,P)" => Ok((Some(PictureType::P), true)),
        "eq(pict_type,B)" => Ok((Some(PictureType::B), true)),
        _ => Err(AvError::EINVAL),
    }
}

fn scale_size(args: &str) -> Result<(u32, u32), AvError> {
    let mut positional = args.split(':').filter(|part| !part.contains('='));
    let values = key_values(args);

    let width = values
        .get("w")
        .copied()
        .or_else(|| positional.next())
        .ok_or(AvError::EINVAL)?;
    let height = values
        .get("h")
        .copied()
        .or_else(|| positional.next())
        .ok_or(AvError::EINVAL)?;

    Ok((number(width)?, number(height)?))
}

fn named_list<'a>(args: &'a str, key: &str) -> Result<Vec<&'a str>, AvError> {
    let values = key_values(args);
    let list = values.get(key).copied().unwrap_or(args);

    if list.is_empty() {
        return Err(AvError::EINVAL);
    }

    Ok(list.split('|').collect())
}

fn audio_format(args: &str) -> Result<Filter, AvError> {
    let values = key_values(args);

    let sample_formats = list(&values, "sample_fmts")
        .into_iter()
        .map(|name| SampleFormat::from_name(name).ok_or(AvError::EINVAL))
        .collect::<Result<Vec<_>, _>>()?;
    let sample_rates = list(&values, "sample_rates")
        .into_iter()
        .map(number::<u32>)
        .collect::<Result<Vec<_>, _>>()?;
    let channel_layouts = list(&values, "channel_layouts")
        .into_iter()
        .map(channel_layout)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Filter::AudioFormat {
        sample_formats,
        sample_rates,
        channel_layouts,
    })
}

fn list<'a>(values: &HashMap<&'a str, &'a str>, key: &str) -> Vec<&'a str> {
    values
        .get(key)
        .map(|list| list.split('|').collect())
        .unwrap_or_default()
}

/// Keeps `current` when allowed, otherwise picks the first allowed value.
fn pick<T: PartialEq + Copy>(current: T, allowed: &[T]) -> T {
    if allowed.is_empty() || allowed.contains(&current) {
        current
    } else {
        allowed[0]
    }
}

fn transform_props(filter: &Filter, mut props: FrameProps) -> FrameProps {
    match filter {
        Filter::Scale(width, height) => {
            props.width = *width;
            props.height = *height;
        }
        Filter::Format(formats) => props.pixel_format = pick(props.pixel_format, formats),
        Filter::AudioFormat {
            sample_formats,
            sample_rates,
            channel_layouts,
        } => {
            props.sample_format = pick(props.sample_format, sample_formats);
            props.sample_rate = pick(props.sample_rate, sample_rates);
            if !channel_layouts.is_empty() && !channel_layouts.contains(&props.channel_layout) {
                props.channel_layout = channel_layouts[0];
                props.channels = props.channel_layout.channels();
            }
        }
        _ => {}
    }

    props
}

fn transform_frame(filter: &Filter, mut frame: TestFrame) -> Option<TestFrame> {
    match filter {
        Filter::Select(picture_type, keep) => {
            let selected = match picture_type {
                Some(picture_type) => frame.picture_type == *picture_type,
                None => *keep,
            };
            selected.then_some(frame)
        }
        Filter::AudioFormat { .. } => {
            let rate = frame.props.sample_rate;
            frame.props = transform_props(filter, frame.props);
            if rate > 0 && frame.props.sample_rate != rate {
                let resampled =
                    u64::from(frame.samples) * u64::from(frame.props.sample_rate) / u64::from(rate);
                frame.samples = resampled as u32;
            }
            Some(frame)
        }
        filter => {
            frame.props = transform_props(filter, frame.props);
            Some(frame)
        }
    }
}

fn stack_props(direction: StackDirection, main: &FrameProps, second: &FrameProps) -> FrameProps {
    let mut props = *main;
    match direction {
        StackDirection::Horizontal => {
            props.width = main.width + second.width;
            props.height = main.height.max(second.height);
        }
        StackDirection::Vertical => {
            props.width = main.width.max(second.width);
            props.height = main.height + second.height;
        }
        StackDirection::Overlay => {}
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn source(graph: &mut TestGraph) -> NodeId {
        graph
            .create_filter(
                "buffer",
                "in_0",
                Some("video_size=64x48:pix_fmt=0:time_base=1/25:pixel_aspect=1/1"),
                &Dictionary::new(),
            )
            .unwrap()
    }

    #[test]
    fn parse_reports_open_ports_in_order() {
        let mut graph = TestGraph::new();
        let ports = graph.parse("[in0][in1]hstack, scale=32:24").unwrap();

        assert_eq!(
            ports.inputs.iter().map(|port| port.label.clone()).collect::<Vec<_>>(),
            vec![Some("in0".to_string()), Some("in1".to_string())]
        );
        assert_eq!(ports.inputs[1].pad, 1);
        assert_eq!(ports.outputs.len(), 1);
        assert_eq!(graph.node_name(ports.outputs[0].node).as_deref(), Some("Parsed_scale_1"));
    }

    #[test]
    fn parse_links_labels_across_chains() {
        let mut graph = TestGraph::new();
        let ports = graph.parse("null[mid]; [mid]null").unwrap();

        assert_eq!(ports.inputs.len(), 1);
        assert_eq!(ports.outputs.len(), 1);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn unknown_filter() {
        let mut graph = TestGraph::new();
        assert_eq!(graph.parse("nosuchfilter").unwrap_err(), AvError::FILTER_NOT_FOUND);
    }

    #[test]
    fn link_rejects_media_mismatch() {
        let mut graph = TestGraph::new();
        let video = source(&mut graph);
        let sink = graph
            .create_filter("abuffersink", "out_0", None, &Dictionary::new())
            .unwrap();

        assert_eq!(graph.link(video, 0, sink, 0), Err(AvError::EINVAL));
    }

    #[test]
    fn configure_requires_every_pad_linked() {
        let mut graph = TestGraph::new();
        source(&mut graph);

        assert_eq!(graph.configure(), Err(AvError::EINVAL));
    }

    #[test]
    fn frames_wait_for_push_or_request() {
        let mut graph = TestGraph::new();
        let input = source(&mut graph);
        let sink = graph
            .create_filter("buffersink", "out_0", None, &Dictionary::new())
            .unwrap();
        graph.link(input, 0, sink, 0).unwrap();
        graph.configure().unwrap();

        let frame = TestFrame::video(64, 48, PixelFormat::YUV420P);
        graph.push_frame(input, &frame, PushFlags::empty()).unwrap();
        assert_eq!(graph.pull_frame(sink, PullFlags::NO_REQUEST), Err(AvError::EAGAIN));

        graph.request_oldest().unwrap();
        assert!(graph.pull_frame(sink, PullFlags::NO_REQUEST).is_ok());
        assert_eq!(graph.request_oldest(), Err(AvError::EAGAIN));

        graph.close_source(input, None, PushFlags::PUSH).unwrap();
        assert_eq!(graph.pull_frame(sink, PullFlags::NO_REQUEST), Err(AvError::EOF));
        assert_eq!(graph.request_oldest(), Err(AvError::EOF));
    }

    #[test]
    fn sink_rechunks_audio_to_frame_size() {
        let mut graph = TestGraph::new();
        let input = graph
            .create_filter(
                "abuffer",
                "in_0",
                Some("time_base=1/48000:sample_rate=48000:sample_fmt=fltp:channel_layout=0x3"),
                &Dictionary::new(),
            )
            .unwrap();
        let sink = graph
            .create_filter("abuffersink", "out_0", None, &Dictionary::new())
            .unwrap();
        graph.link(input, 0, sink, 0).unwrap();
        graph.configure().unwrap();
        graph.set_sink_frame_size(sink, 1024);

        let frame = TestFrame::audio(SampleFormat::FLTP, 48000, ChannelLayout::STEREO, 1500)
            .with_pts(0);
        graph.push_frame(input, &frame, PushFlags::PUSH).unwrap();
        graph.close_source(input, None, PushFlags::PUSH).unwrap();

        let sizes = std::iter::from_fn(|| graph.pull_frame(sink, PullFlags::NO_REQUEST).ok())
            .map(|frame| (frame.pts, frame.samples))
            .collect::<Vec<_>>();

        assert_eq!(sizes, vec![(Some(0), 1024), (Some(1024), 476)]);
    }

    #[test]
    fn frame_size_applies_to_samples_already_delivered() {
        let mut graph = TestGraph::new();
        let input = graph
            .create_filter(
                "abuffer",
                "in_0",
                Some("time_base=1/48000:sample_rate=48000:sample_fmt=fltp:channel_layout=0x3"),
                &Dictionary::new(),
            )
            .unwrap();
        let sink = graph
            .create_filter("abuffersink", "out_0", None, &Dictionary::new())
            .unwrap();
        graph.link(input, 0, sink, 0).unwrap();
        graph.configure().unwrap();

        let frame = TestFrame::audio(SampleFormat::FLTP, 48000, ChannelLayout::STEREO, 1500);
        graph.push_frame(input, &frame, PushFlags::PUSH).unwrap();
        graph.set_sink_frame_size(sink, 1024);

        let first = graph.pull_frame(sink, PullFlags::NO_REQUEST).unwrap();
        assert_eq!(first.samples, 1024);
        assert_eq!(graph.pull_frame(sink, PullFlags::NO_REQUEST), Err(AvError::EAGAIN));
    }
}
