use avgraph_media_info::{ChannelLayout, PixelFormat, Rational, SampleFormat};
use ffmpeg::ffi;

use crate::backend::Frame;

fn raw(frame: &ffmpeg::Frame) -> &ffi::AVFrame {
    // SAFETY: a `Frame` always wraps an allocated AVFrame.
    unsafe { &*frame.as_ptr() }
}

impl Frame for ffmpeg::Frame {
    fn width(&self) -> u32 {
        raw(self).width.max(0) as u32
    }

    fn height(&self) -> u32 {
        raw(self).height.max(0) as u32
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat(raw(self).format)
    }

    fn sample_format(&self) -> SampleFormat {
        SampleFormat(raw(self).format)
    }

    fn sample_rate(&self) -> u32 {
        raw(self).sample_rate.max(0) as u32
    }

    fn channels(&self) -> u32 {
        raw(self).ch_layout.nb_channels.max(0) as u32
    }

    fn channel_layout(&self) -> ChannelLayout {
        let layout = &raw(self).ch_layout;
        if layout.order != ffi::AVChannelOrder::AV_CHANNEL_ORDER_NATIVE {
            return ChannelLayout::UNSPECIFIED;
        }
        // SAFETY: `mask` is the active member for native ordering.
        ChannelLayout(unsafe { layout.u.mask })
    }

    fn sample_aspect_ratio(&self) -> Rational {
        let sar = raw(self).sample_aspect_ratio;
        Rational::new(sar.num, sar.den)
    }

    fn pts(&self) -> Option<i64> {
        let pts = raw(self).pts;
        (pts != ffi::AV_NOPTS_VALUE).then_some(pts)
    }
}
