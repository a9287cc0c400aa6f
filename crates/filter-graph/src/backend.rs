//! The seam between the graph logic and the native filtering library.
//!
//! A [`Backend`] allocates [`NativeGraph`]s and answers pixel-format queries.
//! Nodes live in the native graph's arena and are referred to by [`NodeId`];
//! parsing a description yields ordered [`Port`] lists instead of a linked
//! list of unconnected pads.

use avgraph_media_info::{AvError, ChannelLayout, PixelFormat, Rational, SampleFormat};
use avgraph_options::{Configurable, Dictionary};

/// Index of a node in its native graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// An unconnected pad left open by parsing a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub node: NodeId,
    pub pad: u32,
    pub label: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedPorts {
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
}

bitflags::bitflags! {
    /// Flags for pushing into a buffer source, forwarded verbatim.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PushFlags: i32 {
        /// Do not check for format changes.
        const NO_CHECK_FORMAT = 1;
        /// Immediately push the frame through the graph.
        const PUSH = 4;
        /// Keep a reference to the frame instead of taking it over.
        const KEEP_REF = 8;
    }
}

bitflags::bitflags! {
    /// Flags for pulling from a buffer sink.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PullFlags: i32 {
        /// Return the next frame without removing it.
        const PEEK = 1;
        /// Only return frames already buffered; never ask upstream.
        const NO_REQUEST = 2;
    }
}

/// Output format a sink settled on once the graph was configured.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkParams {
    pub format: i32,
    pub width: u32,
    pub height: u32,
    pub sample_aspect_ratio: Rational,
    pub time_base: Rational,
    pub frame_rate: Rational,
    pub sample_rate: u32,
    pub channels: u32,
    pub channel_layout: ChannelLayout,
}

impl SinkParams {
    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat(self.format)
    }

    pub fn sample_format(&self) -> SampleFormat {
        SampleFormat(self.format)
    }
}

/// A decoded frame as seen by the graph. Pulled frames are owned values and
/// are released on drop.
pub trait Frame {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn pixel_format(&self) -> PixelFormat;
    fn sample_format(&self) -> SampleFormat;
    fn sample_rate(&self) -> u32;
    fn channels(&self) -> u32;
    fn channel_layout(&self) -> ChannelLayout;
    fn sample_aspect_ratio(&self) -> Rational;
    fn pts(&self) -> Option<i64>;
}

/// A native filter graph. Graph-level options (`scale_sws_opts`,
/// `aresample_swr_opts`, ...) are set through [`Configurable`].
pub trait NativeGraph: Configurable {
    type Frame: Frame;

    /// Parses `description` into this graph, returning its open pads in order.
    fn parse(&mut self, description: &str) -> Result<ParsedPorts, AvError>;

    /// Creates and initializes a node. `options` are applied before `args`.
    fn create_filter(
        &mut self,
        filter: &str,
        name: &str,
        args: Option<&str>,
        options: &Dictionary,
    ) -> Result<NodeId, AvError>;

    fn link(&mut self, src: NodeId, src_pad: u32, dst: NodeId, dst_pad: u32)
    -> Result<(), AvError>;

    fn node_name(&self, node: NodeId) -> Option<String>;

    /// Checks every pad is connected and negotiates formats on all links.
    fn configure(&mut self) -> Result<(), AvError>;

    fn push_frame(
        &mut self,
        source: NodeId,
        frame: &Self::Frame,
        flags: PushFlags,
    ) -> Result<(), AvError>;

    /// Marks end of stream on a source, at `pts` when given.
    fn close_source(
        &mut self,
        source: NodeId,
        pts: Option<i64>,
        flags: PushFlags,
    ) -> Result<(), AvError>;

    /// Fails with [`AvError::EAGAIN`] when no frame is ready and with
    /// [`AvError::EOF`] once the sink has seen end of stream.
    fn pull_frame(&mut self, sink: NodeId, flags: PullFlags) -> Result<Self::Frame, AvError>;

    fn request_oldest(&mut self) -> Result<(), AvError>;

    fn sink_params(&self, sink: NodeId) -> SinkParams;

    fn set_sink_frame_size(&mut self, sink: NodeId, frame_size: u32);

    fn node_count(&self) -> usize;

    fn dump(&self) -> String;
}

pub trait Backend {
    type Frame: Frame;
    type Graph: NativeGraph<Frame = Self::Frame>;

    fn alloc_graph(&self) -> Result<Self::Graph, AvError>;

    fn pixel_format_name(&self, format: PixelFormat) -> Option<String>;

    /// Bit depth of the first component.
    fn pixel_format_depth(&self, format: PixelFormat) -> Option<u32>;
}
