//! An in-memory [`Backend`] for exercising graphs without native libraries.
//!
//! Frames carry format metadata and a picture type but no payload. The graph
//! understands the filters the graph builder inserts plus a handful of
//! common ones (`null`, `select`, `hstack`, ...), which is enough to drive
//! configuration, flow control and encoder negotiation end to end.

mod frame;
mod graph;
mod parse;
mod stream;

use std::{cell::Cell, rc::Rc};

use avgraph_media_info::{AvError, PixelFormat};

use crate::backend::Backend;

pub use frame::{FrameProps, PictureType, TestFrame};
pub use graph::{NodeInfo, TestGraph};
pub use parse::{ChainSpec, FilterSpec, parse_description};
pub use stream::{StreamParameters, TestCodec, TestStream};

/// `(format, name, depth of the first component)`
const PIXEL_FORMATS: &[(PixelFormat, &str, u32)] = &[
    (PixelFormat::YUV420P, "yuv420p", 8),
    (PixelFormat::YUYV422, "yuyv422", 8),
    (PixelFormat::RGB24, "rgb24", 8),
    (PixelFormat::BGR24, "bgr24", 8),
    (PixelFormat::YUV422P, "yuv422p", 8),
    (PixelFormat::YUV444P, "yuv444p", 8),
    (PixelFormat::GRAY8, "gray", 8),
    (PixelFormat::YUVJ420P, "yuvj420p", 8),
    (PixelFormat::YUVJ422P, "yuvj422p", 8),
    (PixelFormat::YUVJ444P, "yuvj444p", 8),
    (PixelFormat::NV12, "nv12", 8),
    (PixelFormat::RGBA, "rgba", 8),
    (PixelFormat::BGRA, "bgra", 8),
];

pub fn pixel_format_name(format: PixelFormat) -> Option<&'static str> {
    PIXEL_FORMATS
        .iter()
        .find(|(candidate, _, _)| *candidate == format)
        .map(|(_, name, _)| *name)
}

pub fn pixel_format_by_name(name: &str) -> Option<PixelFormat> {
    PIXEL_FORMATS
        .iter()
        .find(|(_, candidate, _)| *candidate == name)
        .map(|(format, _, _)| *format)
}

/// Hands out [`TestGraph`]s and counts them. Clones share the counter, so a
/// test can keep one to inspect a backend it moved into a graph.
#[derive(Debug, Clone, Default)]
pub struct TestBackend {
    allocations: Rc<Cell<usize>>,
    fail_alloc: bool,
    request_error: Option<AvError>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose allocations always fail with `ENOMEM`.
    pub fn failing() -> Self {
        Self {
            fail_alloc: true,
            ..Self::default()
        }
    }

    /// A backend whose graphs fail every `request_oldest` with `err`.
    pub fn failing_requests(err: AvError) -> Self {
        Self {
            request_error: Some(err),
            ..Self::default()
        }
    }

    /// Number of native graphs allocated so far, scratch graphs included.
    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }
}

impl Backend for TestBackend {
    type Frame = TestFrame;
    type Graph = TestGraph;

    fn alloc_graph(&self) -> Result<TestGraph, AvError> {
        if self.fail_alloc {
            return Err(AvError::ENOMEM);
        }

        self.allocations.set(self.allocations.get() + 1);
        Ok(match self.request_error {
            Some(err) => TestGraph::with_request_error(err),
            None => TestGraph::new(),
        })
    }

    fn pixel_format_name(&self, format: PixelFormat) -> Option<String> {
        pixel_format_name(format).map(str::to_string)
    }

    fn pixel_format_depth(&self, format: PixelFormat) -> Option<u32> {
        PIXEL_FORMATS
            .iter()
            .find(|(candidate, _, _)| *candidate == format)
            .map(|(_, _, depth)| *depth)
    }
}
