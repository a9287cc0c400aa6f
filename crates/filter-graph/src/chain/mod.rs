//! Per-kind construction of the nodes around a parsed description: one
//! source per input port, and an optional conversion chain ending in a sink
//! per output port.

mod audio;
mod video;

use avgraph_media_info::MediaKind;

use crate::{
    ConfigError,
    backend::{Backend, NodeId, Port},
    node::NodeFactory,
    stream::Stream,
};

pub(crate) use audio::AudioChain;
pub(crate) use video::VideoChain;

/// Chain strategy, picked once from the graph's media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaChain {
    Video(VideoChain),
    Audio(AudioChain),
}

impl MediaChain {
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Video => Self::Video(VideoChain),
            MediaKind::Audio => Self::Audio(AudioChain),
        }
    }

    pub fn configure_input<B: Backend, S: Stream>(
        &self,
        factory: &mut NodeFactory<'_, B::Graph>,
        index: usize,
        port: &Port,
        frame: &B::Frame,
        stream: &S,
    ) -> Result<NodeId, ConfigError> {
        match self {
            Self::Video(chain) => chain.configure_input::<B, S>(factory, index, port, frame, stream),
            Self::Audio(chain) => chain.configure_input::<B, S>(factory, index, port, frame, stream),
        }
    }

    pub fn configure_output<B: Backend, S: Stream>(
        &self,
        factory: &mut NodeFactory<'_, B::Graph>,
        backend: &B,
        index: usize,
        port: &Port,
        frame: &B::Frame,
        stream: &mut S,
    ) -> Result<NodeId, ConfigError> {
        match self {
            Self::Video(chain) => {
                chain.configure_output(factory, backend, index, port, frame, stream)
            }
            Self::Audio(chain) => chain.configure_output::<B, S>(factory, index, port, stream),
        }
    }
}

/// Values a conversion node may constrain an output to.
///
/// A preset value the encoder supports wins outright. Otherwise the encoder's
/// supported list applies, falling back to the preset alone when the encoder
/// accepts anything.
pub(crate) fn allowed<T: PartialEq + Copy>(preset: Option<T>, supported: Option<Vec<T>>) -> Vec<T> {
    match (preset, supported) {
        (Some(preset), Some(supported)) if supported.contains(&preset) => vec![preset],
        (_, Some(supported)) if !supported.is_empty() => supported,
        (Some(preset), _) => vec![preset],
        (None, _) => Vec::new(),
    }
}

pub(crate) fn join<T>(values: &[T], render: impl Fn(&T) -> String) -> String {
    values.iter().map(render).collect::<Vec<_>>().join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_preset_wins() {
        assert_eq!(allowed(Some(2), Some(vec![1, 2, 3])), vec![2]);
    }

    #[test]
    fn unsupported_preset_falls_back_to_list() {
        assert_eq!(allowed(Some(9), Some(vec![1, 2, 3])), vec![1, 2, 3]);
        assert_eq!(allowed(None, Some(vec![1, 2])), vec![1, 2]);
    }

    #[test]
    fn unconstrained_encoder() {
        assert_eq!(allowed(Some(4), None), vec![4]);
        assert_eq!(allowed::<i32>(None, None), Vec::<i32>::new());
        assert_eq!(allowed::<i32>(None, Some(vec![])), Vec::<i32>::new());
    }

    #[test]
    fn joins_with_pipes() {
        assert_eq!(join(&[44100, 48000], |rate| rate.to_string()), "44100|48000");
    }
}
