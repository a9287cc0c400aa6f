#![allow(dead_code)]

use avgraph_filter::{
    DEFAULT_PUSH_FLAGS, FilterGraph, GraphBuilder, GraphError, MediaKind, PixelFormat, Pulled,
    Rational,
    testing::{TestBackend, TestCodec, TestFrame, TestStream},
};

pub type TestFilterGraph = FilterGraph<TestBackend, TestStream, TestStream>;

pub const FPS_25: Rational = Rational::new(25, 1);

pub fn video_builder(backend: TestBackend) -> GraphBuilder<TestBackend, TestStream, TestStream> {
    GraphBuilder::new(backend, MediaKind::Video)
}

pub fn audio_builder(backend: TestBackend) -> GraphBuilder<TestBackend, TestStream, TestStream> {
    GraphBuilder::new(backend, MediaKind::Audio)
}

pub fn hd_input() -> TestStream {
    TestStream::video_input(0, 1280, 720, FPS_25)
}

pub fn encoder_stream(codec: TestCodec) -> TestStream {
    TestStream::new(0, codec)
}

pub fn hd_frame(pts: i64) -> TestFrame {
    TestFrame::video(1280, 720, PixelFormat::YUV420P).with_pts(pts)
}

/// Pushes `frame` into input 0 and pulls whatever is ready.
pub fn push_and_pull(
    graph: &mut TestFilterGraph,
    frame: &TestFrame,
) -> Result<Pulled<TestFrame>, GraphError> {
    graph.add_frame(frame, 0, DEFAULT_PUSH_FLAGS)?;
    graph.get_frames()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
