//! Camera Functions
//!

use image::RgbImage;
use rscam::{Camera, Config};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::BoxError;

/// A live image provider with an explicit lifecycle.
///
/// `open` → `configure` → `start` → (`poll_frame` | `capture_still`)* → `stop` → `close`.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<(), BoxError>;
    fn configure(&mut self, width: u32, height: u32, format: &str) -> Result<(), BoxError>;
    fn start(&mut self) -> Result<(), BoxError>;
    /// Grab the next preview frame.
    fn poll_frame(&mut self) -> Result<RgbImage, BoxError>;
    /// Write one still picture to `path`. The source must be started.
    fn capture_still(&mut self, path: &Path) -> Result<(), BoxError>;
    fn stop(&mut self) -> Result<(), BoxError>;
    fn close(&mut self);
}

/// Represents a V4L2 camera configuration and capture functionality.
///
pub struct V4l2Camera {
    device: String,
    cap: Option<Camera>,
    resolution: (u32, u32),
    format: [u8; 4],
    streaming: bool,
}

impl V4l2Camera {
    /// Creates a closed V4L2 camera for `device` (e.g. `/dev/video0`).
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            cap: None,
            resolution: (320, 240),
            format: *b"MJPG",
            streaming: false,
        }
    }

    fn streaming_cap(&self) -> Result<&Camera, BoxError> {
        match &self.cap {
            Some(cap) if self.streaming => Ok(cap),
            _ => Err("camera is not streaming".into()),
        }
    }

    fn decode(&self, frame: &[u8]) -> Result<RgbImage, BoxError> {
        match &self.format {
            b"MJPG" => Ok(image::load_from_memory(frame)?.to_rgb8()),
            b"RGB3" => {
                let (w, h) = self.resolution;
                RgbImage::from_raw(w, h, frame.to_vec())
                    .ok_or_else(|| "short RGB3 frame".into())
            }
            other => Err(format!("unsupported pixel format {:?}", other).into()),
        }
    }
}

impl FrameSource for V4l2Camera {
    fn open(&mut self) -> Result<(), BoxError> {
        let cap = Camera::new(&self.device)
            .map_err(|e| format!("Can't open {}: {}", self.device, e))?;
        self.cap = Some(cap);
        Ok(())
    }

    fn configure(&mut self, width: u32, height: u32, format: &str) -> Result<(), BoxError> {
        let bytes = format.as_bytes();
        if bytes.len() != 4 {
            return Err(format!("pixel format must be a fourcc, got {:?}", format).into());
        }
        self.format.copy_from_slice(bytes);
        self.resolution = (width, height);
        Ok(())
    }

    fn start(&mut self) -> Result<(), BoxError> {
        let cap = self.cap.as_mut().ok_or("camera is not open")?;
        // Configure and start the camera with specified settings.
        cap.start(&Config {
            interval: (1, 30), // 30 fps.
            resolution: self.resolution,
            format: &self.format,
            nbuffers: 1,
            ..Default::default()
        })
        .map_err(|e| format!("Can't start {}: {}", self.device, e))?;
        self.streaming = true;
        log::info!("Camera feed started.");
        Ok(())
    }

    fn poll_frame(&mut self) -> Result<RgbImage, BoxError> {
        let frame = self.streaming_cap()?.capture()?;
        self.decode(&frame[..])
    }

    fn capture_still(&mut self, path: &Path) -> Result<(), BoxError> {
        let cap = self.streaming_cap()?;
        let _ = cap.capture(); // Grab a frame to reduce delay.
        let frame = cap.capture()?;
        if &self.format == b"MJPG" {
            // Save the original jpeg as delivered by the camera.
            let mut file = fs::File::create(path)?;
            file.write_all(&frame[..])?;
        } else {
            self.decode(&frame[..])?.save(path)?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        if let (Some(cap), true) = (self.cap.as_mut(), self.streaming) {
            self.streaming = false;
            cap.stop()?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.streaming = false;
        if self.cap.take().is_some() {
            log::info!("Camera feed stopped and resource closed.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_rejects_bad_fourcc() {
        let mut cam = V4l2Camera::new("/dev/video0");
        assert!(cam.configure(320, 240, "JPEG2").is_err());
        assert!(cam.configure(640, 480, "RGB3").is_ok());
        assert_eq!(cam.resolution, (640, 480));
    }

    #[test]
    fn closed_camera_refuses_frames() {
        let mut cam = V4l2Camera::new("/dev/video0");
        assert!(cam.start().is_err());
        assert!(cam.poll_frame().is_err());
        assert!(cam.capture_still(Path::new("/tmp/wastecamtest/never.jpg")).is_err());
        assert!(cam.stop().is_ok());
        cam.close();
    }

    #[test]
    fn raw_rgb_frames_decode() {
        let mut cam = V4l2Camera::new("/dev/video0");
        cam.configure(2, 1, "RGB3").unwrap();
        let img = cam.decode(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(img.get_pixel(1, 0).0, [4, 5, 6]);
        assert!(cam.decode(&[1, 2, 3]).is_err());
    }
}
