//! Live capture from a V4L2 device

use crate::pixel::decode_captured;
use crate::source::FrameSource;
use crate::{CameraError, CaptureConfig, VideoFrame};
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

const BUFFER_COUNT: u32 = 4;

/// Memory-mapped V4L2 capture stream
pub struct V4l2Source {
    stream: Stream<'static>,
    fourcc: String,
    width: u32,
    height: u32,
    sequence: u32,
    opened_at: Instant,
}

impl V4l2Source {
    /// Open the device and negotiate format and frame rate
    pub fn open(config: &CaptureConfig) -> Result<Self, CameraError> {
        let open_err = |e: std::io::Error| CameraError::Open(format!("{}: {}", config.device, e));

        let fourcc: [u8; 4] = config
            .fourcc
            .as_bytes()
            .try_into()
            .map_err(|_| CameraError::UnsupportedFormat(config.fourcc.clone()))?;

        let device = Device::with_path(&config.device).map_err(open_err)?;
        let mut format = device.format().map_err(open_err)?;
        format.fourcc = FourCC::new(&fourcc);
        format.width = config.width;
        format.height = config.height;
        // the driver may settle on the closest supported mode
        let actual = device.set_format(&format).map_err(open_err)?;

        let mut params = device.params().map_err(open_err)?;
        params.interval.numerator = 1;
        params.interval.denominator = config.fps;
        if let Err(e) = device.set_params(&params) {
            warn!("Could not set {} fps on {}: {}", config.fps, config.device, e);
        }

        let stream =
            Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT).map_err(open_err)?;
        let fourcc = actual
            .fourcc
            .str()
            .map_err(|_| CameraError::UnsupportedFormat(format!("{:?}", actual.fourcc.repr)))?
            .to_string();

        info!(
            "Camera opened: {} {}x{} [{}] at {} fps",
            config.device, actual.width, actual.height, fourcc, config.fps
        );

        Ok(Self {
            stream,
            fourcc,
            width: actual.width,
            height: actual.height,
            sequence: 0,
            opened_at: Instant::now(),
        })
    }
}

impl FrameSource for V4l2Source {
    /// A live camera never runs out; a failed read is an error and ends the run
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let (data, _meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::Capture(e.to_string()))?;
        let rgb = decode_captured(&self.fourcc, data, self.width, self.height)?;

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        debug!("Captured frame {}", sequence);

        Ok(Some(VideoFrame::from_rgb_image(
            rgb,
            self.opened_at.elapsed().as_nanos() as u64,
            sequence,
        )))
    }
}
