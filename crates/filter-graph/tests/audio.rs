mod common;

use avgraph_filter::{
    ChannelLayout, DEFAULT_PUSH_FLAGS, DictFlags, PullStatus, Rational, SampleFormat,
    testing::{TestBackend, TestCodec, TestFrame, TestStream},
};
use common::*;
use pretty_assertions::assert_eq;

fn stereo_input() -> TestStream {
    TestStream::audio_input(0, 44100, ChannelLayout::STEREO)
}

fn stereo_frame(pts: i64, samples: u32) -> TestFrame {
    TestFrame::audio(SampleFormat::S16, 44100, ChannelLayout::STEREO, samples).with_pts(pts)
}

#[test]
fn aac_gets_planar_float_in_fixed_frames() {
    init_tracing();

    let mut graph = audio_builder(TestBackend::new())
        .input(stereo_input())
        .output(encoder_stream(TestCodec::aac()))
        .build()
        .unwrap();

    assert_eq!(graph.description(), "anull");

    let first = push_and_pull(&mut graph, &stereo_frame(0, 1500)).unwrap();
    assert_eq!(first.frames.len(), 1);
    assert_eq!(first.frames[0].samples, 1024);
    assert_eq!(first.frames[0].props.sample_format, SampleFormat::FLTP);
    assert_eq!(first.frames[0].props.sample_rate, 44100);

    let encoder = &graph.output_streams()[0].codec;
    assert_eq!(encoder.open_count, 1);
    assert_eq!(encoder.sample_format, SampleFormat::FLTP);
    assert_eq!(encoder.sample_rate, 44100);
    assert_eq!(encoder.channel_layout, ChannelLayout::STEREO);
    assert_eq!(encoder.channels, 2);
    assert_eq!(encoder.time_base, Rational::new(1, 44100));
    assert_eq!(encoder.bits_per_raw_sample, 16);

    let sink = graph.output_nodes().unwrap()[0];
    assert_eq!(graph.native().unwrap().sink_frame_size(sink), Some(1024));

    let second = push_and_pull(&mut graph, &stereo_frame(1500, 1500)).unwrap();
    assert_eq!(
        second.frames.iter().map(|frame| frame.samples).collect::<Vec<_>>(),
        vec![1024]
    );

    graph.close(0).unwrap();
    let last = graph.get_frames().unwrap();
    assert_eq!(last.status, PullStatus::EndOfStream);
    assert_eq!(
        last.frames.iter().map(|frame| frame.samples).collect::<Vec<_>>(),
        vec![952]
    );
}

#[test]
fn aformat_lists_what_the_encoder_supports() {
    let mut graph = audio_builder(TestBackend::new())
        .input(stereo_input())
        .output(encoder_stream(TestCodec::aac()))
        .build()
        .unwrap();

    graph
        .add_frame(&stereo_frame(0, 1024), 0, DEFAULT_PUSH_FLAGS)
        .unwrap();

    let native = graph.native().unwrap();
    let nodes = native.nodes_of("aformat");
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name, "aformat_0");
    assert_eq!(
        nodes[0].args.as_deref(),
        Some(
            "sample_fmts=fltp:sample_rates=96000|88200|64000|48000|44100|32000|24000|22050|16000|12000|11025|8000|7350"
        )
    );

    let sink = native.nodes_of("abuffersink").remove(0);
    assert_eq!(sink.name, "out_0");
    assert_eq!(
        sink.options.get("all_channel_counts", DictFlags::empty()),
        Some("1")
    );

    let source = native.nodes_of("abuffer").remove(0);
    assert_eq!(
        source.args.as_deref(),
        Some("time_base=1/44100:sample_rate=44100:sample_fmt=s16:channel_layout=0x3")
    );
}

#[test]
fn preset_sample_rate_resamples() {
    let codec = TestCodec::aac().with_sample_rate(48000);
    let mut graph = audio_builder(TestBackend::new())
        .input(stereo_input())
        .output(encoder_stream(codec))
        .build()
        .unwrap();

    // 4410 samples at 44.1 kHz become 4800 at 48 kHz: four full frames.
    let pulled = push_and_pull(&mut graph, &stereo_frame(0, 4410)).unwrap();

    assert_eq!(pulled.frames.len(), 4);
    assert_eq!(pulled.frames[0].props.sample_rate, 48000);
    assert_eq!(pulled.frames[0].samples, 1024);
    assert_eq!(graph.output_streams()[0].codec.time_base, Rational::new(1, 48000));
}

#[test]
fn unconstrained_encoder_needs_no_aformat() {
    let mut graph = audio_builder(TestBackend::new())
        .input(stereo_input())
        .output(encoder_stream(TestCodec::audio_encoder("pcm_s16le")))
        .build()
        .unwrap();

    let pulled = push_and_pull(&mut graph, &stereo_frame(0, 1500)).unwrap();

    assert!(graph.native().unwrap().nodes_of("aformat").is_empty());
    // Variable frame size: the sink is left alone.
    let sink = graph.output_nodes().unwrap()[0];
    assert_eq!(graph.native().unwrap().sink_frame_size(sink), None);
    assert_eq!(pulled.frames[0].samples, 1500);
    assert_eq!(graph.output_streams()[0].codec.sample_format, SampleFormat::S16);
}

#[test]
fn channel_count_gets_a_default_layout() {
    let codec = TestCodec::audio_encoder("pcm_s16le").with_channels(6);
    let mut graph = audio_builder(TestBackend::new())
        .input(stereo_input())
        .output(encoder_stream(codec))
        .build()
        .unwrap();

    let pulled = push_and_pull(&mut graph, &stereo_frame(0, 1024)).unwrap();

    let layout = ChannelLayout::default_for_channels(6).unwrap();
    let nodes = graph.native().unwrap().nodes_of("aformat");
    assert_eq!(
        nodes[0].args.as_deref(),
        Some(format!("channel_layouts={layout}").as_str())
    );
    assert_eq!(pulled.frames[0].props.channels, 6);
    assert_eq!(graph.output_streams()[0].codec.channel_layout, layout);
}

#[test]
fn frames_without_layout_use_channel_count() {
    let mut graph = audio_builder(TestBackend::new())
        .input(stereo_input())
        .output(encoder_stream(TestCodec::audio_encoder("pcm_s16le")))
        .build()
        .unwrap();

    graph
        .add_frame(&stereo_frame(0, 1024).without_layout(), 0, DEFAULT_PUSH_FLAGS)
        .unwrap();

    let source = graph.native().unwrap().nodes_of("abuffer").remove(0);
    assert_eq!(
        source.args.as_deref(),
        Some("time_base=1/44100:sample_rate=44100:sample_fmt=s16:channels=2")
    );
}

#[test]
fn raw_bits_follow_the_smaller_side() {
    let mut input = stereo_input();
    input.codec.bits_per_raw_sample = 24;

    let codec = TestCodec::audio_encoder("pcm_s16le").with_sample_format(SampleFormat::S16);
    let mut graph = audio_builder(TestBackend::new())
        .input(input)
        .output(encoder_stream(codec))
        .build()
        .unwrap();

    push_and_pull(&mut graph, &stereo_frame(0, 1024)).unwrap();

    assert_eq!(graph.output_streams()[0].codec.bits_per_raw_sample, 16);
}
