//! Filter graphs that are described up front but built lazily from the first
//! decoded frame, then driven frame by frame.
//!
//! A [`FilterGraph`] wraps a textual filter description with one buffer
//! source per input port and one sink (behind optional `scale`/`format` or
//! `aformat` conversion nodes) per output port. Frames go in through
//! [`FilterGraph::add_frame`] and come out of [`FilterGraph::get_frames`],
//! which also finalizes and opens the output encoder once the sink has
//! settled on a format.
//!
//! The native filtering library sits behind [`Backend`]. The `libav`
//! feature provides one on top of libavfilter; the `testing` feature provides
//! an in-memory one.

pub mod backend;
mod chain;
mod error;
mod graph;
mod logger;
mod negotiate;
mod node;
mod settings;
mod stream;

#[cfg(feature = "libav")]
pub mod libav;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use avgraph_media_info::{
    AvError, ChannelLayout, ChromaLocation, Disposition, MediaKind, PixelFormat, Rational,
    SampleFormat,
};
pub use avgraph_options::{ConfigOption, DictFlags, Dictionary, OptionValue};
pub use backend::{Backend, Frame, NativeGraph, NodeId, PullFlags, PushFlags, SinkParams};
pub use error::{ConfigError, GraphError};
pub use graph::{FilterGraph, GraphBuilder, GraphState, PullStatus, Pulled};
pub use logger::GraphLogger;
pub use negotiate::DEFAULT_FRAME_RATE;
pub use node::NodeKind;
pub use settings::{DEFAULT_SCALE_OPTIONS, GraphSettings};
pub use stream::{CodecContext, Stream};

/// Push flags used for regular decoded frames.
pub const DEFAULT_PUSH_FLAGS: PushFlags = PushFlags::NO_CHECK_FORMAT
    .union(PushFlags::PUSH)
    .union(PushFlags::KEEP_REF);
