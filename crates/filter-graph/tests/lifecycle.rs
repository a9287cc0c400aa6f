mod common;

use avgraph_filter::{
    AvError, ChannelLayout, ConfigError, ConfigOption, DEFAULT_PUSH_FLAGS, DictFlags, GraphError,
    GraphSettings, GraphState, SampleFormat,
    testing::{TestBackend, TestCodec, TestFrame, TestStream},
};
use common::*;
use pretty_assertions::assert_eq;

fn passthrough() -> TestFilterGraph {
    video_builder(TestBackend::new())
        .input(hd_input())
        .output(encoder_stream(TestCodec::video_encoder("rawvideo")))
        .build()
        .unwrap()
}

#[test]
fn nothing_works_before_the_first_frame() {
    let mut graph = passthrough();

    assert_eq!(graph.state(), GraphState::Unconfigured);
    assert_eq!(graph.get_frames().unwrap_err(), GraphError::NotInitialized);
    assert_eq!(graph.close(0).unwrap_err(), GraphError::NotInitialized);
    assert_eq!(graph.request_oldest().unwrap_err(), GraphError::NotInitialized);
    assert_eq!(graph.input_nodes().unwrap_err(), GraphError::NotInitialized);
    assert_eq!(graph.dump().unwrap_err(), GraphError::NotInitialized);
}

#[test]
fn released_graph_is_disposed() {
    let mut graph = passthrough();
    push_and_pull(&mut graph, &hd_frame(0)).unwrap();

    graph.release().unwrap();

    assert_eq!(graph.state(), GraphState::Released);
    assert_eq!(
        graph.add_frame(&hd_frame(1), 0, DEFAULT_PUSH_FLAGS).unwrap_err(),
        GraphError::Disposed
    );
    assert_eq!(graph.get_frames().unwrap_err(), GraphError::Disposed);
    assert_eq!(graph.release().unwrap_err(), GraphError::Disposed);
}

#[test]
fn builder_description_outlives_settings() {
    let select = "select='eq(pict_type,I)'";

    let graph = video_builder(TestBackend::new())
        .description(select)
        .settings(GraphSettings::default().with_tag("cam"))
        .input(hd_input())
        .output(encoder_stream(TestCodec::video_encoder("rawvideo")))
        .build()
        .unwrap();
    assert_eq!(graph.description(), select);

    let graph = video_builder(TestBackend::new())
        .settings(GraphSettings::new("null").with_tag("cam"))
        .description(select)
        .input(hd_input())
        .output(encoder_stream(TestCodec::video_encoder("rawvideo")))
        .build()
        .unwrap();
    assert_eq!(graph.description(), select);
}

#[test]
fn settings_description_is_used_without_override() {
    let graph = video_builder(TestBackend::new())
        .settings(GraphSettings::new("copy"))
        .input(hd_input())
        .output(encoder_stream(TestCodec::video_encoder("rawvideo")))
        .build()
        .unwrap();

    assert_eq!(graph.description(), "copy");
}

#[test]
fn failed_request_keeps_pulled_frames() {
    init_tracing();

    let mut graph = video_builder(TestBackend::failing_requests(AvError::EINVAL))
        .input(hd_input())
        .output(encoder_stream(TestCodec::video_encoder("rawvideo")))
        .build()
        .unwrap();

    let pulled = push_and_pull(&mut graph, &hd_frame(0)).unwrap();
    assert_eq!(
        pulled.frames.iter().map(|frame| frame.pts).collect::<Vec<_>>(),
        vec![Some(0)]
    );

    let pulled = push_and_pull(&mut graph, &hd_frame(1)).unwrap();
    assert_eq!(pulled.frames.len(), 1);
    assert_eq!(graph.state(), GraphState::Configured);

    // Callers asking directly still see the failure.
    assert_eq!(
        graph.request_oldest().unwrap_err(),
        GraphError::Av(AvError::EINVAL)
    );
}

#[test]
fn unconfigured_graph_can_be_released() {
    let mut graph = passthrough();

    graph.release().unwrap();

    assert_eq!(
        graph.add_frame(&hd_frame(0), 0, DEFAULT_PUSH_FLAGS).unwrap_err(),
        GraphError::Disposed
    );
}

#[test]
fn input_index_is_checked() {
    let mut graph = passthrough();

    let err = graph.add_frame(&hd_frame(0), 3, DEFAULT_PUSH_FLAGS).unwrap_err();
    assert_eq!(
        err,
        GraphError::Index {
            what: "input",
            index: 3,
            len: 1
        }
    );
    // The graph itself is fine.
    assert_eq!(graph.state(), GraphState::Configured);
    assert!(matches!(graph.close(1), Err(GraphError::Index { .. })));
    assert!(matches!(graph.output_stream_mut(1), Err(GraphError::Index { .. })));
}

#[test]
fn more_ports_than_streams_is_unusable() {
    let mut graph = video_builder(TestBackend::new())
        .description("[in0][in1]hstack")
        .input(hd_input())
        .output(encoder_stream(TestCodec::video_encoder("rawvideo")))
        .build()
        .unwrap();

    let err = graph.add_frame(&hd_frame(0), 0, DEFAULT_PUSH_FLAGS).unwrap_err();
    assert!(matches!(err, GraphError::Index { what: "input", .. }));
    assert_eq!(graph.state(), GraphState::Failed);

    assert_eq!(
        graph.add_frame(&hd_frame(1), 0, DEFAULT_PUSH_FLAGS).unwrap_err(),
        GraphError::Unusable
    );
    assert_eq!(graph.get_frames().unwrap_err(), GraphError::Unusable);
}

#[test]
fn parse_errors_surface_at_construction() {
    let backend = TestBackend::new();
    let err = video_builder(backend.clone())
        .description("nosuchfilter")
        .input(hd_input())
        .output(encoder_stream(TestCodec::video_encoder("rawvideo")))
        .build()
        .err()
        .unwrap();

    assert_eq!(
        err,
        GraphError::Parse {
            description: "nosuchfilter".to_string(),
            source: AvError::FILTER_NOT_FOUND
        }
    );
    assert_eq!(err.av_error(), Some(AvError::FILTER_NOT_FOUND));

    let err = video_builder(backend)
        .description("[in0 null")
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, GraphError::Parse { source: AvError::EINVAL, .. }));
}

#[test]
fn allocation_failure_is_reported() {
    let err = video_builder(TestBackend::failing())
        .description("null")
        .build()
        .err()
        .unwrap();

    assert_eq!(err, GraphError::Av(AvError::ENOMEM));
}

#[test]
fn media_mismatch_fails_linking() {
    let mut graph = audio_builder(TestBackend::new())
        .description("null")
        .input(TestStream::audio_input(0, 48000, ChannelLayout::STEREO))
        .output(encoder_stream(TestCodec::audio_encoder("pcm_s16le")))
        .build()
        .unwrap();

    let frame = TestFrame::audio(SampleFormat::S16, 48000, ChannelLayout::STEREO, 1024);
    let err = graph.add_frame(&frame, 0, DEFAULT_PUSH_FLAGS).unwrap_err();

    assert_eq!(
        err,
        GraphError::Config(ConfigError::Link {
            from: "in_0".to_string(),
            from_pad: 0,
            to: "Parsed_null_0".to_string(),
            to_pad: 0,
            source: AvError::EINVAL,
        })
    );
    assert_eq!(graph.state(), GraphState::Failed);
}

#[test]
fn unknown_graph_option_fails_configuration() {
    let mut graph = video_builder(TestBackend::new())
        .input(hd_input())
        .output(encoder_stream(TestCodec::video_encoder("rawvideo")))
        .option(ConfigOption::new("no_such_option", 1))
        .build()
        .unwrap();

    let err = graph.add_frame(&hd_frame(0), 0, DEFAULT_PUSH_FLAGS).unwrap_err();

    assert_eq!(
        err,
        GraphError::Config(ConfigError::Option {
            target: "graph".to_string(),
            key: "no_such_option".to_string(),
            source: AvError::OPTION_NOT_FOUND,
        })
    );
}

#[test]
fn graph_options_reach_the_native_graph() {
    let settings = GraphSettings::new("null")
        .with_scale_options("flags=lanczos")
        .with_resample_options("async=1");
    let mut graph = video_builder(TestBackend::new())
        .settings(settings)
        .input(hd_input())
        .output(encoder_stream(TestCodec::video_encoder("rawvideo")))
        .option(ConfigOption::new("threads", 2))
        .build()
        .unwrap();

    push_and_pull(&mut graph, &hd_frame(0)).unwrap();

    let options = graph.native().unwrap().graph_options();
    assert_eq!(options.get("scale_sws_opts", DictFlags::empty()), Some("flags=lanczos"));
    assert_eq!(options.get("aresample_swr_opts", DictFlags::empty()), Some("async=1"));
    assert_eq!(options.get("threads", DictFlags::empty()), Some("2"));
}

#[test]
fn encoder_open_failure() {
    let codec = TestCodec::video_encoder("libx264").with_open_error(AvError::ENOSYS);
    let mut graph = video_builder(TestBackend::new())
        .input(hd_input())
        .output(encoder_stream(codec))
        .build()
        .unwrap();

    let err = push_and_pull(&mut graph, &hd_frame(0)).unwrap_err();

    assert_eq!(err, GraphError::EncoderOpen(AvError::ENOSYS));
    assert_eq!(graph.output_streams()[0].codec.open_count, 0);
}

#[test]
fn stream_parameter_failure() {
    let output = encoder_stream(TestCodec::video_encoder("libx264")).with_copy_error(AvError::EINVAL);
    let mut graph = video_builder(TestBackend::new())
        .input(hd_input())
        .output(output)
        .build()
        .unwrap();

    let err = push_and_pull(&mut graph, &hd_frame(0)).unwrap_err();

    assert_eq!(err, GraphError::StreamInit(AvError::EINVAL));
    assert!(graph.output_streams()[0].parameters.is_none());
}

#[test]
fn invalid_log_level_is_rejected() {
    let err = video_builder(TestBackend::new())
        .settings(GraphSettings::new("null").with_log_level("chatty"))
        .build()
        .err()
        .unwrap();

    assert_eq!(
        err,
        GraphError::InvalidSetting {
            key: "logLevel",
            value: "chatty".to_string()
        }
    );
}

#[test]
fn dump_lists_every_node() {
    let mut graph = passthrough();
    push_and_pull(&mut graph, &hd_frame(0)).unwrap();

    let dump = graph.dump().unwrap();

    for name in ["Parsed_null_0", "in_0", "out_0"] {
        assert!(dump.contains(name), "{name} missing from\n{dump}");
    }
}
