use std::{ffi::CStr, ptr};

use avgraph_media_info::{AvError, ChannelLayout, Rational};
use avgraph_options::{Configurable, Dictionary};
use ffmpeg::{ffi, filter};

use super::c_string;
use crate::backend::{NativeGraph, NodeId, ParsedPorts, Port, PullFlags, PushFlags, SinkParams};

/// A libavfilter graph. Filter contexts are owned by the graph and addressed
/// through an arena of raw pointers that lives exactly as long as it does.
pub struct FfmpegGraph {
    graph: filter::Graph,
    nodes: Vec<*mut ffi::AVFilterContext>,
}

impl FfmpegGraph {
    pub fn new() -> Self {
        Self {
            graph: filter::Graph::new(),
            nodes: Vec::new(),
        }
    }

    pub fn as_graph(&self) -> &filter::Graph {
        &self.graph
    }

    fn context(&self, node: NodeId) -> Result<*mut ffi::AVFilterContext, AvError> {
        self.nodes.get(node.0).copied().ok_or(AvError::EINVAL)
    }

    fn register(&mut self, context: *mut ffi::AVFilterContext) -> NodeId {
        match self.nodes.iter().position(|known| *known == context) {
            Some(index) => NodeId(index),
            None => {
                self.nodes.push(context);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Turns an `AVFilterInOut` list into ports and frees it.
    fn collect_ports(&mut self, mut list: *mut ffi::AVFilterInOut) -> Vec<Port> {
        let mut ports = Vec::new();

        let mut current = list;
        while !current.is_null() {
            // SAFETY: `current` walks a list returned by avfilter_graph_parse2.
            let (context, pad, label, next) = unsafe {
                let entry = &*current;
                let label = (!entry.name.is_null())
                    .then(|| CStr::from_ptr(entry.name).to_string_lossy().into_owned());
                (entry.filter_ctx, entry.pad_idx, label, entry.next)
            };

            ports.push(Port {
                node: self.register(context),
                pad: pad as u32,
                label,
            });
            current = next;
        }

        // SAFETY: the list and its names are ours to free once read.
        unsafe { ffi::avfilter_inout_free(&mut list) };

        ports
    }
}

impl Default for FfmpegGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Configurable for FfmpegGraph {
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), AvError> {
        let (key, value) = (c_string(key)?, c_string(value)?);
        // SAFETY: the graph is a valid AVOptions-enabled object.
        AvError::check(unsafe {
            ffi::av_opt_set(
                self.graph.as_mut_ptr().cast(),
                key.as_ptr(),
                value.as_ptr(),
                0,
            )
        })?;
        Ok(())
    }
}

impl NativeGraph for FfmpegGraph {
    type Frame = ffmpeg::Frame;

    fn parse(&mut self, description: &str) -> Result<ParsedPorts, AvError> {
        let description = c_string(description)?;
        let mut inputs = ptr::null_mut();
        let mut outputs = ptr::null_mut();

        // SAFETY: the out-lists start null and are freed by collect_ports.
        let ret = unsafe {
            ffi::avfilter_graph_parse2(
                self.graph.as_mut_ptr(),
                description.as_ptr(),
                &mut inputs,
                &mut outputs,
            )
        };
        if let Err(err) = AvError::check(ret) {
            unsafe {
                ffi::avfilter_inout_free(&mut inputs);
                ffi::avfilter_inout_free(&mut outputs);
            }
            return Err(err);
        }

        Ok(ParsedPorts {
            inputs: self.collect_ports(inputs),
            outputs: self.collect_ports(outputs),
        })
    }

    fn create_filter(
        &mut self,
        filter: &str,
        name: &str,
        args: Option<&str>,
        options: &Dictionary,
    ) -> Result<NodeId, AvError> {
        let filter = c_string(filter)?;
        let name = c_string(name)?;
        let args = args.map(c_string).transpose()?;

        // SAFETY: lookups and allocation on a live graph. The context is
        // owned by the graph from here on, also when init fails.
        unsafe {
            let definition = ffi::avfilter_get_by_name(filter.as_ptr());
            if definition.is_null() {
                return Err(AvError::FILTER_NOT_FOUND);
            }

            let context =
                ffi::avfilter_graph_alloc_filter(self.graph.as_mut_ptr(), definition, name.as_ptr());
            if context.is_null() {
                return Err(AvError::ENOMEM);
            }

            for (key, value) in options.iter() {
                let (key, value) = (c_string(key)?, c_string(value)?);
                AvError::check(ffi::av_opt_set(
                    context.cast(),
                    key.as_ptr(),
                    value.as_ptr(),
                    ffi::AV_OPT_SEARCH_CHILDREN as i32,
                ))?;
            }

            AvError::check(ffi::avfilter_init_str(
                context,
                args.as_ref().map_or(ptr::null(), |args| args.as_ptr()),
            ))?;

            Ok(self.register(context))
        }
    }

    fn link(&mut self, src: NodeId, src_pad: u32, dst: NodeId, dst_pad: u32) -> Result<(), AvError> {
        let (src, dst) = (self.context(src)?, self.context(dst)?);
        // `filter::Context::link` drops the result code.
        // SAFETY: both contexts belong to this graph.
        AvError::check(unsafe { ffi::avfilter_link(src, src_pad, dst, dst_pad) })?;
        Ok(())
    }

    fn node_name(&self, node: NodeId) -> Option<String> {
        let context = self.context(node).ok()?;
        // SAFETY: graph-owned context with a NUL-terminated name.
        unsafe {
            let name = (*context).name;
            (!name.is_null()).then(|| CStr::from_ptr(name).to_string_lossy().into_owned())
        }
    }

    fn configure(&mut self) -> Result<(), AvError> {
        self.graph.validate().map_err(AvError::from)
    }

    fn push_frame(
        &mut self,
        source: NodeId,
        frame: &ffmpeg::Frame,
        flags: PushFlags,
    ) -> Result<(), AvError> {
        let context = self.context(source)?;
        // The caller keeps the frame, so the source must only take a new
        // reference to it.
        let flags = flags | PushFlags::KEEP_REF;
        // SAFETY: with KEEP_REF the frame is only read.
        AvError::check(unsafe {
            ffi::av_buffersrc_add_frame_flags(context, frame.as_ptr().cast_mut(), flags.bits())
        })?;
        Ok(())
    }

    fn close_source(
        &mut self,
        source: NodeId,
        pts: Option<i64>,
        flags: PushFlags,
    ) -> Result<(), AvError> {
        let context = self.context(source)?;
        // SAFETY: a null frame marks end of stream.
        let ret = unsafe {
            match pts {
                Some(pts) => ffi::av_buffersrc_close(context, pts, flags.bits() as u32),
                None => ffi::av_buffersrc_add_frame_flags(context, ptr::null_mut(), flags.bits()),
            }
        };
        AvError::check(ret)?;
        Ok(())
    }

    fn pull_frame(&mut self, sink: NodeId, flags: PullFlags) -> Result<ffmpeg::Frame, AvError> {
        let context = self.context(sink)?;
        let mut frame = unsafe { ffmpeg::Frame::empty() };
        // SAFETY: `frame` is a freshly allocated AVFrame owned by us.
        AvError::check(unsafe {
            ffi::av_buffersink_get_frame_flags(context, frame.as_mut_ptr(), flags.bits())
        })?;
        Ok(frame)
    }

    fn request_oldest(&mut self) -> Result<(), AvError> {
        // SAFETY: live, configured graph.
        AvError::check(unsafe { ffi::avfilter_graph_request_oldest(self.graph.as_mut_ptr()) })?;
        Ok(())
    }

    fn sink_params(&self, sink: NodeId) -> SinkParams {
        let Ok(context) = self.context(sink) else {
            return SinkParams::default();
        };

        // SAFETY: getters on a configured sink context.
        unsafe {
            let mut layout: ffi::AVChannelLayout = std::mem::zeroed();
            let mask = if ffi::av_buffersink_get_ch_layout(context, &mut layout) >= 0
                && layout.order == ffi::AVChannelOrder::AV_CHANNEL_ORDER_NATIVE
            {
                layout.u.mask
            } else {
                0
            };
            ffi::av_channel_layout_uninit(&mut layout);

            SinkParams {
                format: ffi::av_buffersink_get_format(context),
                width: ffi::av_buffersink_get_w(context).max(0) as u32,
                height: ffi::av_buffersink_get_h(context).max(0) as u32,
                sample_aspect_ratio: Rational::from(ffi::av_buffersink_get_sample_aspect_ratio(context)),
                time_base: Rational::from(ffi::av_buffersink_get_time_base(context)),
                frame_rate: Rational::from(ffi::av_buffersink_get_frame_rate(context)),
                sample_rate: ffi::av_buffersink_get_sample_rate(context).max(0) as u32,
                channels: ffi::av_buffersink_get_channels(context).max(0) as u32,
                channel_layout: ChannelLayout(mask),
            }
        }
    }

    fn set_sink_frame_size(&mut self, sink: NodeId, frame_size: u32) {
        let Some(name) = self.node_name(sink) else {
            return;
        };
        if let Some(mut context) = self.graph.get(&name) {
            context.sink().set_frame_size(frame_size);
        }
    }

    fn node_count(&self) -> usize {
        // SAFETY: reading a counter of a live graph.
        unsafe { (*self.graph.as_ptr()).nb_filters as usize }
    }

    fn dump(&self) -> String {
        self.graph.dump()
    }
}
