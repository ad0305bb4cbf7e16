//! V4L2 webcam access.
//!
//! Only V4L2 `VIDEO_CAPTURE` devices yielding JFIF JPEG or Motion JPEG frames are supported.

use std::{cmp::Reverse, io, path::PathBuf};

use anyhow::{anyhow, bail};
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, Pixelformat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::{
    capture::FrameSource,
    image::{Image, Resolution},
    num::TotalF32,
    timer::Timer,
    Error,
};

/// Webcam selection and format negotiation options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebcamOptions {
    index: u32,
    resolution: Resolution,
    fps: Option<u32>,
}

impl Default for WebcamOptions {
    fn default() -> Self {
        Self {
            index: 0,
            resolution: Resolution::RES_VGA,
            fps: None,
        }
    }
}

impl WebcamOptions {
    /// Selects the device `/dev/video{index}`.
    #[inline]
    pub fn index(self, index: u32) -> Self {
        Self { index, ..self }
    }

    /// Sets the minimum desired image resolution.
    ///
    /// If the webcam cannot deliver at least this resolution, any supported format is used.
    #[inline]
    pub fn resolution(self, resolution: Resolution) -> Self {
        Self { resolution, ..self }
    }

    /// Sets the minimum desired frame rate.
    #[inline]
    pub fn fps(self, fps: u32) -> Self {
        Self {
            fps: Some(fps),
            ..self
        }
    }

    pub fn get_index(&self) -> u32 {
        self.index
    }

    fn device_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/video{}", self.index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameFormat {
    resolution: Resolution,
    frame_interval: Fract,
}

impl FrameFormat {
    fn fps(&self) -> f32 {
        1.0 / self.frame_interval.as_f32()
    }
}

fn negotiate_format(
    device: &Device,
    options: &WebcamOptions,
) -> anyhow::Result<(PixFormat, Fract)> {
    let mut pixel_format = None;
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let format = format?;
        if format.pixelformat() == Pixelformat::JPEG || format.pixelformat() == Pixelformat::MJPG {
            pixel_format = Some(format.pixelformat());
            break;
        }
    }

    let Some(pixel_format) = pixel_format else {
        bail!("no supported pixel format found");
    };

    let mut formats = Vec::new();
    match device.frame_sizes(pixel_format)? {
        FrameSizes::Discrete(sizes) => {
            for size in sizes {
                let intervals =
                    match device.frame_intervals(pixel_format, size.width(), size.height())? {
                        FrameIntervals::Discrete(intervals) => intervals,
                        FrameIntervals::Stepwise(_) | FrameIntervals::Continuous(_) => {
                            bail!("stepwise or continuous frame rates are not supported")
                        }
                    };
                for rate in intervals {
                    formats.push(FrameFormat {
                        resolution: Resolution::new(size.width(), size.height()),
                        frame_interval: *rate.fract(),
                    });
                }
            }
        }
        FrameSizes::Stepwise(_) | FrameSizes::Continuous(_) => {
            bail!("stepwise or continuous resolutions are not supported");
        }
    }

    let fmt = select_format(&formats, options)
        .ok_or_else(|| anyhow!("device does not list any frame formats"))?;
    Ok((
        PixFormat::new(
            fmt.resolution.width(),
            fmt.resolution.height(),
            pixel_format,
        ),
        fmt.frame_interval,
    ))
}

/// Picks the smallest format not below the requested resolution (and frame rate, if any),
/// preferring higher frame rates among equally sized ones.
///
/// Falls back to the largest, fastest format if none qualifies.
fn select_format(formats: &[FrameFormat], options: &WebcamOptions) -> Option<FrameFormat> {
    let res = options.resolution;
    let best = formats
        .iter()
        .filter(|fmt| {
            fmt.resolution.width() >= res.width()
                && fmt.resolution.height() >= res.height()
                && options.fps.map_or(true, |fps| fmt.fps().round() >= fps as f32)
        })
        .min_by_key(|fmt| (fmt.resolution.num_pixels(), Reverse(TotalF32(fmt.fps()))))
        .copied();
    if best.is_some() {
        return best;
    }

    log::debug!("no format satisfies {:?}, using any supported format", options);
    formats
        .iter()
        .max_by_key(|fmt| (fmt.resolution.num_pixels(), TotalF32(fmt.fps())))
        .copied()
}

/// A webcam yielding a stream of [`Image`]s.
pub struct Webcam {
    index: u32,
    stream: ReadStream,
    resolution: Resolution,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the webcam selected by `options`.
    ///
    /// This can block for a significant amount of time while the webcam initializes (on the order
    /// of hundreds of milliseconds).
    pub fn open(options: WebcamOptions) -> Result<Self, Error> {
        Self::open_impl(&options).map_err(|e| Error::CameraUnavailable {
            index: options.index,
            reason: format!("{e:#}"),
        })
    }

    fn open_impl(options: &WebcamOptions) -> anyhow::Result<Self> {
        let path = options.device_path();
        let dev = Device::open(&path)?;
        let caps = dev.capabilities()?;
        let cap_flags = caps.device_capabilities();
        log::debug!(
            "device {} ({}) capabilities: {:?}",
            caps.card(),
            path.display(),
            cap_flags,
        );

        if !cap_flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            bail!("{} is not a video capture device", path.display());
        }

        let (pixfmt, fract) = negotiate_format(&dev, options)?;
        let capture = dev.video_capture(pixfmt)?;
        let format = capture.format();
        let resolution = Resolution::new(format.width(), format.height());
        let actual = capture.set_frame_interval(fract)?;

        log::info!(
            "opened {} ({}), {} @ {:.1}Hz",
            caps.card(),
            path.display(),
            resolution,
            1.0 / actual.as_f32(),
        );

        let stream = capture.into_stream(2)?;

        Ok(Self {
            index: options.index,
            stream,
            resolution,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        })
    }

    /// Returns the negotiated frame resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Reads the next frame from the camera, blocking until one is available.
    ///
    /// Webcams occasionally produce corrupted MJPEG frames; those are reported as
    /// [`Error::FrameReadFailure`]. If the device itself fails (for example because it was
    /// unplugged), [`Error::CameraUnavailable`] is returned instead.
    pub fn read(&mut self) -> Result<Image, Error> {
        let dequeue_guard = self.t_dequeue.start();
        let t_decode = &mut self.t_decode;
        let decoded = self
            .stream
            .dequeue(|buf| {
                drop(dequeue_guard);
                Ok(t_decode.time(|| Image::decode_jpeg(&buf)))
            })
            .map_err(|e| dequeue_error(self.index, e))?;
        decoded.map_err(|e| Error::FrameReadFailure(format!("webcam decode error: {e}")))
    }

}

/// Classifies an I/O error returned while dequeuing a frame.
///
/// Errors indicating that the device is gone or broken will not go away by reading again.
fn dequeue_error(index: u32, e: io::Error) -> Error {
    match e.raw_os_error() {
        Some(libc::ENODEV | libc::ENXIO | libc::EIO) => Error::CameraUnavailable {
            index,
            reason: e.to_string(),
        },
        _ => Error::FrameReadFailure(e.to_string()),
    }
}

impl FrameSource for Webcam {
    fn read(&mut self) -> Result<Image, Error> {
        Webcam::read(self)
    }

    fn timers(&self) -> Vec<&Timer> {
        vec![&self.t_dequeue, &self.t_decode]
    }
}
