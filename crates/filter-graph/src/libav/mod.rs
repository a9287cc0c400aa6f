//! [`Backend`] on top of libavfilter and libavcodec.
//!
//! The safe `ffmpeg-next` types own the native objects (`filter::Graph`,
//! `codec::Context`, `Frame`); the calls they do not wrap go through
//! `ffmpeg::ffi`.

mod codec;
mod frame;
mod graph;

use std::ffi::{CStr, CString};

use avgraph_media_info::{AvError, ChromaLocation, PixelFormat, SampleFormat};
use ffmpeg::ffi;

use crate::backend::Backend;

pub use codec::{FfmpegCodec, FfmpegStream};
pub use graph::FfmpegGraph;

#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    /// Initializes the native libraries.
    pub fn new() -> Result<Self, AvError> {
        ffmpeg::init().map_err(AvError::from)?;
        Ok(Self)
    }
}

impl Backend for FfmpegBackend {
    type Frame = ffmpeg::Frame;
    type Graph = FfmpegGraph;

    fn alloc_graph(&self) -> Result<FfmpegGraph, AvError> {
        Ok(FfmpegGraph::new())
    }

    fn pixel_format_name(&self, format: PixelFormat) -> Option<String> {
        let descriptor = pixel_format_descriptor(format)?;
        // SAFETY: descriptors are static and carry a NUL-terminated name.
        let name = unsafe { CStr::from_ptr((*descriptor).name) };
        Some(name.to_string_lossy().into_owned())
    }

    fn pixel_format_depth(&self, format: PixelFormat) -> Option<u32> {
        let descriptor = pixel_format_descriptor(format)?;
        // SAFETY: see above.
        let depth = unsafe { (*descriptor).comp[0].depth };
        u32::try_from(depth).ok()
    }
}

/// Looks a format up by walking the descriptor table, so that no integer is
/// ever reinterpreted as an `AVPixelFormat`.
fn pixel_format_descriptor(format: PixelFormat) -> Option<*const ffi::AVPixFmtDescriptor> {
    if format.is_none() {
        return None;
    }

    let mut descriptor = std::ptr::null();
    loop {
        // SAFETY: iterating the static descriptor table from its start.
        descriptor = unsafe { ffi::av_pix_fmt_desc_next(descriptor) };
        if descriptor.is_null() {
            return None;
        }
        if unsafe { ffi::av_pix_fmt_desc_get_id(descriptor) } as i32 == format.0 {
            return Some(descriptor);
        }
    }
}

pub(crate) fn to_av_pixel_format(format: PixelFormat) -> ffi::AVPixelFormat {
    let Some(descriptor) = pixel_format_descriptor(format) else {
        return ffi::AVPixelFormat::AV_PIX_FMT_NONE;
    };
    // SAFETY: the descriptor came from the table.
    unsafe { ffi::av_pix_fmt_desc_get_id(descriptor) }
}

pub(crate) fn to_av_sample_format(format: SampleFormat) -> ffi::AVSampleFormat {
    let Some(name) = format.name().and_then(|name| CString::new(name).ok()) else {
        return ffi::AVSampleFormat::AV_SAMPLE_FMT_NONE;
    };
    // SAFETY: `name` is NUL-terminated and outlives the call.
    unsafe { ffi::av_get_sample_fmt(name.as_ptr()) }
}

pub(crate) fn to_av_chroma_location(location: ChromaLocation) -> ffi::AVChromaLocation {
    use ffi::AVChromaLocation::*;

    match location.0 {
        1 => AVCHROMA_LOC_LEFT,
        2 => AVCHROMA_LOC_CENTER,
        3 => AVCHROMA_LOC_TOPLEFT,
        4 => AVCHROMA_LOC_TOP,
        5 => AVCHROMA_LOC_BOTTOMLEFT,
        6 => AVCHROMA_LOC_BOTTOM,
        _ => AVCHROMA_LOC_UNSPECIFIED,
    }
}

pub(crate) fn c_string(value: &str) -> Result<CString, AvError> {
    CString::new(value).map_err(|_| AvError::EINVAL)
}
