use avgraph_media_info::{AvError, MediaKind};
use avgraph_options::{ConfigOption, Configurable, apply_all};

use crate::{
    ConfigError, GraphError,
    backend::{Backend, NativeGraph, NodeId, PullFlags, PushFlags},
    chain::MediaChain,
    logger::GraphLogger,
    negotiate::Negotiator,
    node::NodeFactory,
    settings::GraphSettings,
    stream::{CodecContext, Stream},
};

/// Where a graph is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// No frame seen yet; only the description has been checked.
    Unconfigured,
    Configured,
    /// Configuration failed; the graph cannot be used.
    Failed,
    Released,
}

/// Why [`FilterGraph::get_frames`] stopped pulling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    /// The sink has nothing more right now. Push more input.
    TryAgain,
    /// The sink is drained for good.
    EndOfStream,
}

/// Frames pulled in one [`FilterGraph::get_frames`] call.
#[derive(Debug)]
pub struct Pulled<F> {
    pub frames: Vec<F>,
    pub status: PullStatus,
}

impl<F> Pulled<F> {
    pub fn is_end_of_stream(&self) -> bool {
        self.status == PullStatus::EndOfStream
    }
}

struct Configured<G> {
    native: G,
    sources: Vec<NodeId>,
    sinks: Vec<NodeId>,
}

enum Lifecycle<G> {
    Unconfigured,
    Configured(Configured<G>),
    Failed,
    Released,
}

impl<G> Lifecycle<G> {
    fn state(&self) -> GraphState {
        match self {
            Self::Unconfigured => GraphState::Unconfigured,
            Self::Configured(_) => GraphState::Configured,
            Self::Failed => GraphState::Failed,
            Self::Released => GraphState::Released,
        }
    }

    fn configured(&self) -> Result<&Configured<G>, GraphError> {
        match self {
            Self::Configured(configured) => Ok(configured),
            Self::Unconfigured => Err(GraphError::NotInitialized),
            Self::Failed => Err(GraphError::Unusable),
            Self::Released => Err(GraphError::Disposed),
        }
    }

    fn configured_mut(&mut self) -> Result<&mut Configured<G>, GraphError> {
        match self {
            Self::Configured(configured) => Ok(configured),
            Self::Unconfigured => Err(GraphError::NotInitialized),
            Self::Failed => Err(GraphError::Unusable),
            Self::Released => Err(GraphError::Disposed),
        }
    }
}

/// A filter graph bound to decoder streams on its inputs and encoder streams
/// on its outputs.
///
/// Construction only checks the description. The native graph is built from
/// the first frame pushed through [`add_frame`](Self::add_frame), because the
/// buffer sources need the decoded frame's geometry and formats. Once the
/// first filtered frames come out, the encoder of output 0 is configured from
/// the sink and opened.
pub struct FilterGraph<B: Backend, I: Stream, O: Stream> {
    backend: B,
    settings: GraphSettings,
    kind: MediaKind,
    chain: MediaChain,
    inputs: Vec<I>,
    outputs: Vec<O>,
    options: Vec<ConfigOption>,
    logger: GraphLogger,
    lifecycle: Lifecycle<B::Graph>,
}

impl<B: Backend, I: Stream, O: Stream> FilterGraph<B, I, O> {
    pub fn new(
        backend: B,
        mut settings: GraphSettings,
        kind: MediaKind,
        inputs: Vec<I>,
        outputs: Vec<O>,
        options: Vec<ConfigOption>,
    ) -> Result<Self, GraphError> {
        let logger = settings.logger()?;

        if settings.description.trim().is_empty() {
            settings.description = kind.passthrough_filter().to_string();
        } else {
            let mut scratch = backend.alloc_graph()?;
            scratch
                .parse(&settings.description)
                .map_err(|source| GraphError::Parse {
                    description: settings.description.clone(),
                    source,
                })?;
        }

        logger.debug(format_args!(
            "new {kind} graph '{}' with {} inputs and {} outputs",
            settings.description,
            inputs.len(),
            outputs.len()
        ));

        Ok(Self {
            backend,
            settings,
            kind,
            chain: MediaChain::for_kind(kind),
            inputs,
            outputs,
            options,
            logger,
            lifecycle: Lifecycle::Unconfigured,
        })
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.settings.description
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    pub fn state(&self) -> GraphState {
        self.lifecycle.state()
    }

    pub fn input_streams(&self) -> &[I] {
        &self.inputs
    }

    pub fn output_streams(&self) -> &[O] {
        &self.outputs
    }

    pub fn output_stream_mut(&mut self, index: usize) -> Result<&mut O, GraphError> {
        let len = self.outputs.len();
        self.outputs
            .get_mut(index)
            .ok_or(GraphError::output_index(index, len))
    }

    pub fn input_nodes(&self) -> Result<&[NodeId], GraphError> {
        Ok(&self.lifecycle.configured()?.sources)
    }

    pub fn output_nodes(&self) -> Result<&[NodeId], GraphError> {
        Ok(&self.lifecycle.configured()?.sinks)
    }

    pub fn node_count(&self) -> Result<usize, GraphError> {
        Ok(self.lifecycle.configured()?.native.node_count())
    }

    /// The native graph, once configured.
    pub fn native(&self) -> Result<&B::Graph, GraphError> {
        Ok(&self.lifecycle.configured()?.native)
    }

    pub fn dump(&self) -> Result<String, GraphError> {
        Ok(self.lifecycle.configured()?.native.dump())
    }

    /// Pushes `frame` into input `index`, building the graph from it first if
    /// this is the first frame.
    pub fn add_frame(
        &mut self,
        frame: &B::Frame,
        index: usize,
        flags: PushFlags,
    ) -> Result<(), GraphError> {
        self.ensure_configured(frame)?;

        let configured = self.lifecycle.configured_mut()?;
        let source = *configured
            .sources
            .get(index)
            .ok_or(GraphError::input_index(index, configured.sources.len()))?;

        configured.native.push_frame(source, frame, flags)?;

        Ok(())
    }

    /// Pulls every frame the first sink has ready.
    ///
    /// Stops on "try again" or end of stream and reports which one. Any other
    /// failure drops the frames pulled so far. Before the first pull, the
    /// encoder of output 0 is negotiated from the configured sink and opened,
    /// so that a fixed encoder frame size already shapes the first batch.
    pub fn get_frames(&mut self) -> Result<Pulled<B::Frame>, GraphError> {
        let Self {
            backend,
            settings,
            kind,
            inputs,
            outputs,
            logger,
            lifecycle,
            ..
        } = self;

        let configured = lifecycle.configured_mut()?;
        let sink = *configured
            .sinks
            .first()
            .ok_or(GraphError::output_index(0, 0))?;

        let pending = outputs.first_mut().filter(|output| !output.codec().is_open());
        if let Some(output) = pending {
            let negotiator = Negotiator {
                backend: &*backend,
                settings: &*settings,
                logger: &*logger,
            };
            negotiator.negotiate(*kind, &mut configured.native, sink, inputs.first(), output)?;
        }

        let mut frames = Vec::new();
        let status = loop {
            match configured.native.pull_frame(sink, PullFlags::NO_REQUEST) {
                Ok(frame) => frames.push(frame),
                Err(err) if err.is_again() => break PullStatus::TryAgain,
                Err(err) if err.is_eof() => break PullStatus::EndOfStream,
                Err(err) => return Err(err.into()),
            }
        };

        // The frames are already out of the sink; a failed request only
        // affects what the next call sees.
        if let Err(err) = request_oldest(&mut configured.native) {
            logger.warn(format_args!("request for the oldest frame failed: {err}"));
        }

        Ok(Pulled { frames, status })
    }

    /// Signals end of stream on input `index` so buffered frames drain.
    pub fn close(&mut self, index: usize) -> Result<(), GraphError> {
        self.close_source(index, None)
    }

    /// Like [`close`](Self::close), with an explicit end timestamp.
    pub fn close_at(&mut self, index: usize, pts: i64) -> Result<(), GraphError> {
        self.close_source(index, Some(pts))
    }

    fn close_source(&mut self, index: usize, pts: Option<i64>) -> Result<(), GraphError> {
        let configured = self.lifecycle.configured_mut()?;
        let source = *configured
            .sources
            .get(index)
            .ok_or(GraphError::input_index(index, configured.sources.len()))?;

        configured
            .native
            .close_source(source, pts, PushFlags::PUSH)?;

        self.logger.debug(format_args!("closed input {index}"));

        Ok(())
    }

    /// Asks the graph to pull on its oldest link. "Try again" and end of
    /// stream are reported as [`GraphError::Av`].
    pub fn request_oldest(&mut self) -> Result<(), GraphError> {
        let configured = self.lifecycle.configured_mut()?;
        configured.native.request_oldest()?;
        Ok(())
    }

    /// Frees the native graph. Every later call fails with
    /// [`GraphError::Disposed`].
    pub fn release(&mut self) -> Result<(), GraphError> {
        if let Lifecycle::Released = self.lifecycle {
            return Err(GraphError::Disposed);
        }

        self.lifecycle = Lifecycle::Released;
        self.logger.debug("released");

        Ok(())
    }

    fn ensure_configured(&mut self, frame: &B::Frame) -> Result<(), GraphError> {
        if !matches!(self.lifecycle, Lifecycle::Unconfigured) {
            return self.lifecycle.configured().map(|_| ());
        }

        match self.configure(frame) {
            Ok(configured) => {
                self.lifecycle = Lifecycle::Configured(configured);
                Ok(())
            }
            Err(err) => {
                self.logger.warn(format_args!("configuration failed: {err}"));
                self.lifecycle = Lifecycle::Failed;
                Err(err)
            }
        }
    }

    fn configure(&mut self, frame: &B::Frame) -> Result<Configured<B::Graph>, GraphError> {
        let mut native = self.backend.alloc_graph()?;

        let graph_option = |key: &str| {
            let key = key.to_string();
            move |source: AvError| ConfigError::Option {
                target: "graph".to_string(),
                key,
                source,
            }
        };

        native
            .set_option("scale_sws_opts", &self.settings.scale_options)
            .map_err(graph_option("scale_sws_opts"))?;
        native
            .set_option("aresample_swr_opts", &self.settings.resample_options)
            .map_err(graph_option("aresample_swr_opts"))?;
        apply_all(&self.options, &mut native)
            .map_err(|(option, source)| graph_option(&option.key)(source))?;

        let ports = native
            .parse(&self.settings.description)
            .map_err(|source| GraphError::Parse {
                description: self.settings.description.clone(),
                source,
            })?;

        if ports.inputs.len() > self.inputs.len() {
            return Err(GraphError::input_index(self.inputs.len(), self.inputs.len()));
        }
        if ports.outputs.len() > self.outputs.len() {
            return Err(GraphError::output_index(self.outputs.len(), self.outputs.len()));
        }

        let mut factory = NodeFactory::new(&mut native, &self.logger);

        let mut sources = Vec::with_capacity(ports.inputs.len());
        for (index, (port, stream)) in ports.inputs.iter().zip(&self.inputs).enumerate() {
            sources.push(
                self.chain
                    .configure_input::<B, I>(&mut factory, index, port, frame, stream)?,
            );
        }

        let mut sinks = Vec::with_capacity(ports.outputs.len());
        for (index, (port, stream)) in ports.outputs.iter().zip(&mut self.outputs).enumerate() {
            sinks.push(self.chain.configure_output(
                &mut factory,
                &self.backend,
                index,
                port,
                frame,
                stream,
            )?);
        }

        native.configure().map_err(ConfigError::Validate)?;

        self.logger.info(format_args!(
            "configured '{}': {} sources, {} sinks, {} nodes",
            self.settings.description,
            sources.len(),
            sinks.len(),
            native.node_count()
        ));

        Ok(Configured {
            native,
            sources,
            sinks,
        })
    }
}

fn request_oldest<G: NativeGraph>(native: &mut G) -> Result<(), AvError> {
    match native.request_oldest() {
        Err(err) if !err.is_again() && !err.is_eof() => Err(err),
        _ => Ok(()),
    }
}

/// Fluent construction of a [`FilterGraph`].
pub struct GraphBuilder<B: Backend, I: Stream, O: Stream> {
    backend: B,
    kind: MediaKind,
    settings: GraphSettings,
    description: Option<String>,
    inputs: Vec<I>,
    outputs: Vec<O>,
    options: Vec<ConfigOption>,
}

impl<B: Backend, I: Stream, O: Stream> GraphBuilder<B, I, O> {
    pub fn new(backend: B, kind: MediaKind) -> Self {
        Self {
            backend,
            kind,
            settings: GraphSettings::default(),
            description: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Takes precedence over the description in [`settings`](Self::settings),
    /// in either call order.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn settings(mut self, settings: GraphSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn input(mut self, stream: I) -> Self {
        self.inputs.push(stream);
        self
    }

    pub fn output(mut self, stream: O) -> Self {
        self.outputs.push(stream);
        self
    }

    pub fn option(mut self, option: ConfigOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn build(mut self) -> Result<FilterGraph<B, I, O>, GraphError> {
        if let Some(description) = self.description {
            self.settings.description = description;
        }

        FilterGraph::new(
            self.backend,
            self.settings,
            self.kind,
            self.inputs,
            self.outputs,
            self.options,
        )
    }
}
