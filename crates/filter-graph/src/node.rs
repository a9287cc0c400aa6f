use avgraph_options::Dictionary;

use crate::{
    ConfigError,
    backend::{NativeGraph, NodeId, Port},
    logger::GraphLogger,
};

/// The nodes the graph inserts around a parsed description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    VideoSource,
    AudioSource,
    VideoSink,
    AudioSink,
    Scale,
    Format,
    AudioFormat,
}

impl NodeKind {
    pub const fn filter_name(&self) -> &'static str {
        match self {
            Self::VideoSource => "buffer",
            Self::AudioSource => "abuffer",
            Self::VideoSink => "buffersink",
            Self::AudioSink => "abuffersink",
            Self::Scale => "scale",
            Self::Format => "format",
            Self::AudioFormat => "aformat",
        }
    }

    const fn prefix(&self) -> &'static str {
        match self {
            Self::VideoSource | Self::AudioSource => "in",
            Self::VideoSink | Self::AudioSink => "out",
            Self::Scale => "scale",
            Self::Format => "format",
            Self::AudioFormat => "aformat",
        }
    }

    /// Instance name for the node serving port `index`, e.g. `in_0`.
    pub fn instance_name(&self, index: usize) -> String {
        format!("{}_{index}", self.prefix())
    }
}

/// Creates and links nodes in one native graph, attaching filter and pad
/// context to failures.
pub(crate) struct NodeFactory<'a, G: NativeGraph> {
    graph: &'a mut G,
    logger: &'a GraphLogger,
}

impl<'a, G: NativeGraph> NodeFactory<'a, G> {
    pub fn new(graph: &'a mut G, logger: &'a GraphLogger) -> Self {
        Self { graph, logger }
    }

    pub fn create(
        &mut self,
        kind: NodeKind,
        index: usize,
        args: Option<&str>,
        options: &Dictionary,
    ) -> Result<NodeId, ConfigError> {
        let name = kind.instance_name(index);

        let node = self
            .graph
            .create_filter(kind.filter_name(), &name, args, options)
            .map_err(|source| ConfigError::CreateFilter {
                filter: kind.filter_name(),
                name: name.clone(),
                source,
            })?;

        self.logger.debug(format_args!(
            "created {} '{name}' args='{}'",
            kind.filter_name(),
            args.unwrap_or_default()
        ));

        Ok(node)
    }

    pub fn link(
        &mut self,
        from: NodeId,
        from_pad: u32,
        to: NodeId,
        to_pad: u32,
    ) -> Result<(), ConfigError> {
        self.graph
            .link(from, from_pad, to, to_pad)
            .map_err(|source| ConfigError::Link {
                from: self.name_of(from),
                from_pad,
                to: self.name_of(to),
                to_pad,
                source,
            })
    }

    /// Links a source node's first output into a parsed input port.
    pub fn link_into(&mut self, from: NodeId, port: &Port) -> Result<(), ConfigError> {
        self.link(from, 0, port.node, port.pad)
    }

    /// Links an output port through each node of `chain` in order; the last
    /// node is expected to be the sink.
    pub fn link_chain(&mut self, port: &Port, chain: &[NodeId]) -> Result<(), ConfigError> {
        let mut from = (port.node, port.pad);
        for &node in chain {
            self.link(from.0, from.1, node, 0)?;
            from = (node, 0);
        }
        Ok(())
    }

    fn name_of(&self, node: NodeId) -> String {
        self.graph
            .node_name(node)
            .unwrap_or_else(|| format!("#{}", node.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_names_follow_port_index() {
        assert_eq!(NodeKind::VideoSource.instance_name(0), "in_0");
        assert_eq!(NodeKind::AudioSink.instance_name(2), "out_2");
        assert_eq!(NodeKind::AudioFormat.instance_name(1), "aformat_1");
        assert_eq!(NodeKind::Scale.filter_name(), "scale");
    }
}
