//! Timelapse GIF assembly
//!
//! Turns the numbered frames of a session folder into one animated GIF and
//! retires the session.
//!
//! ## Session lifecycle
//!
//! ```text
//! EMPTY ──append──► ACCUMULATING ──assemble──► ASSEMBLED (folder removed)
//! ```
//!
//! Assembling an already assembled session fails with `SessionNotFound`.

use crate::config::TimelapseConfig;
use crate::folder::{ensure_folder, remove_folder_best_effort};
use crate::frame_store::{list_frames, FrameStore, StoredFrame};
use crate::result::{TimelapseError, TimelapseResult};
use gif::{Encoder, Frame, Repeat};
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Playback speed of the assembled GIF
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameTiming {
    /// Frames per second
    Fps(f64),
    /// Seconds each frame stays on screen
    Duration(f64),
}

impl FrameTiming {
    /// Check that the value is finite and strictly positive
    pub fn validate(self) -> TimelapseResult<Self> {
        let (label, value) = match self {
            Self::Fps(v) => ("fps", v),
            Self::Duration(v) => ("duration", v),
        };
        if value.is_finite() && value > 0.0 {
            Ok(self)
        } else {
            Err(TimelapseError::invalid_rate(format!(
                "{label} must be a positive number, got {value}"
            )))
        }
    }

    /// Frame delay in centiseconds (GIF standard), at least 1
    #[must_use]
    pub fn delay_cs(self) -> u16 {
        let cs = match self {
            // fps=10 -> 10cs, fps=20 -> 5cs
            Self::Fps(fps) => 100.0 / fps,
            Self::Duration(secs) => secs * 100.0,
        };
        cs.round().clamp(1.0, f64::from(u16::MAX)) as u16
    }
}

/// Encoder settings for one assembly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GifConfig {
    /// Playback speed
    pub timing: FrameTiming,
    /// Quality level (1-100, affects palette quantization)
    pub quality: u8,
    /// Loop count (0 = infinite)
    pub loop_count: u16,
}

impl GifConfig {
    /// Create settings for `timing` with default quality and infinite loop
    #[must_use]
    pub fn new(timing: FrameTiming) -> Self {
        Self {
            timing,
            quality: 80,
            loop_count: 0,
        }
    }

    /// Set quality (1-100)
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Set loop count (0 = infinite)
    #[must_use]
    pub fn with_loop_count(mut self, count: u16) -> Self {
        self.loop_count = count;
        self
    }

    /// Frame delay in centiseconds
    #[must_use]
    pub fn frame_delay_cs(&self) -> u16 {
        self.timing.delay_cs()
    }

    /// Convert quality (1-100) to GIF encoder speed (1-30)
    #[must_use]
    pub fn encoder_speed(&self) -> i32 {
        // quality 100 -> speed 1 (slowest, best palette)
        let normalized = i32::from(100 - self.quality.clamp(1, 100));
        (normalized * 29 / 100 + 1).clamp(1, 30)
    }
}

/// Outcome of a successful assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledGif {
    /// Written GIF
    pub path: PathBuf,
    /// Number of frames encoded
    pub frame_count: usize,
}

/// Builds GIFs out of session folders
#[derive(Debug, Clone)]
pub struct GifAssembler {
    store: FrameStore,
    config: TimelapseConfig,
}

impl GifAssembler {
    /// Create an assembler from configuration
    #[must_use]
    pub fn new(config: &TimelapseConfig) -> Self {
        Self {
            store: FrameStore::new(config),
            config: config.clone(),
        }
    }

    /// Encode session `session` into `<output_dir>/<session>.gif`
    ///
    /// Preconditions are checked in order: the session folder exists, is a
    /// folder, and holds at least one frame. On success the session folder is
    /// removed (best effort); on encode failure it is left intact.
    pub fn assemble(
        &self,
        session: &str,
        output_dir: &str,
        timing: FrameTiming,
    ) -> TimelapseResult<AssembledGif> {
        let timing = timing.validate()?;
        let session_dir = self.store.prepare_session(session)?;

        if !session_dir.exists() {
            return Err(TimelapseError::SessionNotFound { path: session_dir });
        }
        if !session_dir.is_dir() {
            return Err(TimelapseError::NotADirectory { path: session_dir });
        }
        let frames = list_frames(&session_dir)?;
        if frames.is_empty() {
            return Err(TimelapseError::EmptySession { path: session_dir });
        }

        let output_path = self.store.guard().resolve(output_dir)?;
        if is_within(&output_path, &session_dir) {
            return Err(TimelapseError::InvalidPath {
                path: output_dir.to_string(),
                reason: "output folder is inside the session folder".to_string(),
            });
        }
        ensure_folder(&output_path, false)?;

        let gif_path = output_path.join(format!("{session}.gif"));
        encode_frames(&frames, &gif_path, &self.config.gif_config(timing))?;

        remove_folder_best_effort(&session_dir);
        info!(
            session,
            frames = frames.len(),
            path = %gif_path.display(),
            "assembled timelapse gif"
        );

        Ok(AssembledGif {
            path: gif_path,
            frame_count: frames.len(),
        })
    }
}

/// Encode `frames` in order into a GIF at `path`
///
/// The canvas takes the first frame's size; later frames of another size are
/// resized to it.
pub fn encode_frames(
    frames: &[StoredFrame],
    path: &Path,
    config: &GifConfig,
) -> TimelapseResult<()> {
    let Some(first) = frames.first() else {
        return Err(TimelapseError::image_processing("no frames to encode"));
    };
    let first_image = image::open(&first.path)?;
    let (width, height) = first_image.dimensions();
    let (gif_width, gif_height) = gif_dimensions(width, height)?;

    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = Encoder::new(writer, gif_width, gif_height, &[])?;

    let repeat = if config.loop_count == 0 {
        Repeat::Infinite
    } else {
        Repeat::Finite(config.loop_count)
    };
    encoder.set_repeat(repeat)?;

    let delay = config.frame_delay_cs();
    let speed = config.encoder_speed();

    let mut pending = Some(first_image);
    for stored in frames {
        let image = match pending.take() {
            Some(image) => image,
            None => image::open(&stored.path)?,
        };
        let mut rgba = fit_to_canvas(&image, width, height);

        let mut frame = Frame::from_rgba_speed(gif_width, gif_height, &mut rgba, speed);
        frame.delay = delay;
        encoder.write_frame(&frame)?;
        debug!(index = stored.index, "encoded frame");
    }

    // Writes the trailer
    let mut writer = encoder.into_inner()?;
    writer.flush()?;
    Ok(())
}

fn gif_dimensions(width: u32, height: u32) -> TimelapseResult<(u16, u16)> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(TimelapseError::image_processing(format!(
            "frame size {width}x{height} does not fit a GIF canvas"
        ))),
    }
}

/// Check whether `path` is `dir` or lies below it, following symlinks where
/// the path already exists
fn is_within(path: &Path, dir: &Path) -> bool {
    if path.starts_with(dir) {
        return true;
    }
    let Ok(dir) = dir.canonicalize() else {
        return false;
    };
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(resolved) = existing.canonicalize() {
            let full = rest.iter().rev().fold(resolved, |acc, part| acc.join(part));
            return full.starts_with(&dir);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return false,
        }
    }
}

/// RGBA pixels of `image` at exactly `width` x `height`
fn fit_to_canvas(image: &DynamicImage, width: u32, height: u32) -> Vec<u8> {
    if image.dimensions() == (width, height) {
        return image.to_rgba8().into_raw();
    }
    image
        .resize_exact(width, height, image::imageops::FilterType::Triangle)
        .to_rgba8()
        .into_raw()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::frame_store::tests::{close_to, solid};
    use std::fs;

    /// Decoded GIF: (canvas size, per-frame delay and centre colour)
    fn decode_gif(path: &Path) -> ((u16, u16), Vec<(u16, [u8; 3])>) {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(File::open(path).unwrap()).unwrap();
        let size = (decoder.width(), decoder.height());

        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            let w = usize::from(frame.width);
            let h = usize::from(frame.height);
            let offset = ((h / 2) * w + w / 2) * 4;
            let px = &frame.buffer[offset..offset + 3];
            frames.push((frame.delay, [px[0], px[1], px[2]]));
        }
        (size, frames)
    }

    fn setup(dir: &Path) -> (TimelapseConfig, FrameStore, GifAssembler) {
        let config = TimelapseConfig::new(dir);
        (
            config.clone(),
            FrameStore::new(&config),
            GifAssembler::new(&config),
        )
    }

    mod timing_tests {
        use super::*;

        #[test]
        fn test_fps_delay() {
            assert_eq!(FrameTiming::Fps(10.0).delay_cs(), 10);
            assert_eq!(FrameTiming::Fps(20.0).delay_cs(), 5);
            assert_eq!(FrameTiming::Fps(1.0).delay_cs(), 100);
            assert_eq!(FrameTiming::Fps(1000.0).delay_cs(), 1);
        }

        #[test]
        fn test_duration_delay() {
            assert_eq!(FrameTiming::Duration(2.0).delay_cs(), 200);
            assert_eq!(FrameTiming::Duration(0.25).delay_cs(), 25);
            assert_eq!(FrameTiming::Duration(0.001).delay_cs(), 1);
            assert_eq!(FrameTiming::Duration(1.0e9).delay_cs(), u16::MAX);
        }

        #[test]
        fn test_validate_rejects_non_positive() {
            for timing in [
                FrameTiming::Fps(0.0),
                FrameTiming::Fps(-1.0),
                FrameTiming::Duration(f64::NAN),
                FrameTiming::Duration(f64::INFINITY),
            ] {
                assert!(matches!(
                    timing.validate(),
                    Err(TimelapseError::InvalidRate { .. })
                ));
            }
        }

        #[test]
        fn test_gif_config_defaults() {
            let config = GifConfig::new(FrameTiming::Fps(10.0));
            assert_eq!(config.quality, 80);
            assert_eq!(config.loop_count, 0);
            assert_eq!(config.frame_delay_cs(), 10);
        }

        #[test]
        fn test_encoder_speed_bounds() {
            let best = GifConfig::new(FrameTiming::Fps(10.0)).with_quality(100);
            assert_eq!(best.encoder_speed(), 1);
            let worst = GifConfig::new(FrameTiming::Fps(10.0)).with_quality(0);
            assert_eq!(worst.quality, 1);
            assert_eq!(worst.encoder_speed(), 29);
        }
    }

    mod canvas_tests {
        use super::*;

        #[test]
        fn test_gif_dimensions_accepts_u16_range() {
            assert_eq!(gif_dimensions(1, 1).unwrap(), (1, 1));
            assert_eq!(gif_dimensions(65535, 65535).unwrap(), (65535, 65535));
        }

        #[test]
        fn test_gif_dimensions_rejects_oversized_and_empty() {
            for (w, h) in [(65536, 1), (1, 65536), (0, 4), (4, 0)] {
                assert!(
                    matches!(
                        gif_dimensions(w, h),
                        Err(TimelapseError::ImageProcessing { .. })
                    ),
                    "{w}x{h} should not fit"
                );
            }
        }

        #[test]
        fn test_is_within() {
            let dir = tempfile::tempdir().unwrap();
            let session = dir.path().join("job");
            fs::create_dir(&session).unwrap();

            assert!(is_within(&session, &session));
            assert!(is_within(&session.join("out"), &session));
            assert!(is_within(&dir.path().join(".").join("job"), &session));
            assert!(!is_within(&dir.path().join("out"), &session));
            assert!(!is_within(&dir.path().join("jobs"), &session));
        }
    }

    mod assemble_tests {
        use super::*;

        #[test]
        fn test_output_inside_session_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            let first = store.append("job", &solid(4, 4, [1, 2, 3])).unwrap();

            for output in [".dremel_3d_printer/job", ".dremel_3d_printer/job/out"] {
                let result = assembler.assemble("job", output, FrameTiming::Fps(10.0));
                assert!(
                    matches!(result, Err(TimelapseError::InvalidPath { .. })),
                    "{output}: {result:?}"
                );
            }
            assert!(first.is_file());
            assert!(!first.parent().unwrap().join("out").exists());
            assert!(!first.parent().unwrap().join("job.gif").exists());
        }

        #[test]
        fn test_scenario_three_frames() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            let colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255]];
            for color in colors {
                store.append("job42", &solid(16, 16, color)).unwrap();
            }

            let result = assembler
                .assemble("job42", "out", FrameTiming::Fps(10.0))
                .unwrap();

            assert_eq!(result.path, dir.path().join("out").join("job42.gif"));
            assert_eq!(result.frame_count, 3);
            assert!(!store.session_dir("job42").unwrap().exists());

            let (size, frames) = decode_gif(&result.path);
            assert_eq!(size, (16, 16));
            assert_eq!(frames.len(), 3);
            for ((delay, px), expected) in frames.iter().zip(colors.iter()) {
                assert_eq!(*delay, 10);
                assert!(close_to(*px, *expected), "{px:?} vs {expected:?}");
            }
        }

        #[test]
        fn test_numeric_not_lexical_order() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            let session = store.prepare_session("gappy").unwrap();
            fs::create_dir(&session).unwrap();

            let frames = [(10, [0, 0, 255]), (0, [255, 0, 0]), (2, [0, 255, 0])];
            for (index, color) in frames {
                crate::frame_store::write_jpeg(
                    &session.join(format!("{index}.jpeg")),
                    &solid(8, 8, color),
                )
                .unwrap();
            }

            let result = assembler
                .assemble("gappy", "out", FrameTiming::Duration(2.0))
                .unwrap();
            let (_, decoded) = decode_gif(&result.path);
            let expected = [[255, 0, 0], [0, 255, 0], [0, 0, 255]];
            assert_eq!(decoded.len(), 3);
            for ((delay, px), want) in decoded.iter().zip(expected.iter()) {
                assert_eq!(*delay, 200);
                assert!(close_to(*px, *want), "{px:?} vs {want:?}");
            }
        }

        #[test]
        fn test_second_assemble_not_found() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            store.append("once", &solid(4, 4, [9, 9, 9])).unwrap();

            assembler
                .assemble("once", "out", FrameTiming::Fps(5.0))
                .unwrap();
            let again = assembler.assemble("once", "out", FrameTiming::Fps(5.0));
            assert!(matches!(again, Err(TimelapseError::SessionNotFound { .. })));
        }

        #[test]
        fn test_missing_session() {
            let dir = tempfile::tempdir().unwrap();
            let (_, _, assembler) = setup(dir.path());

            let result = assembler.assemble("ghost", "out", FrameTiming::Fps(10.0));
            assert!(matches!(result, Err(TimelapseError::SessionNotFound { .. })));
            assert!(!dir.path().join("out").exists());
        }

        #[test]
        fn test_session_is_file() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            let session = store.prepare_session("flat").unwrap();
            fs::write(&session, b"file").unwrap();

            let result = assembler.assemble("flat", "out", FrameTiming::Fps(10.0));
            assert!(matches!(result, Err(TimelapseError::NotADirectory { .. })));
        }

        #[test]
        fn test_empty_session() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            let session = store.prepare_session("empty").unwrap();
            fs::create_dir(&session).unwrap();
            fs::write(session.join("cover.jpeg"), b"x").unwrap();

            let result = assembler.assemble("empty", "out", FrameTiming::Fps(10.0));
            assert!(matches!(result, Err(TimelapseError::EmptySession { .. })));
            assert!(session.exists());
        }

        #[test]
        fn test_corrupt_frame_keeps_session() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            store.append("broken", &solid(4, 4, [1, 1, 1])).unwrap();
            let session = store.session_dir("broken").unwrap();
            fs::write(session.join("1.jpeg"), b"definitely not a jpeg").unwrap();

            let result = assembler.assemble("broken", "out", FrameTiming::Fps(10.0));
            assert!(matches!(result, Err(TimelapseError::Image(_))));
            assert!(session.join("0.jpeg").exists());
            assert!(session.join("1.jpeg").exists());
        }

        #[test]
        fn test_mixed_sizes_resized_to_first() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            store.append("sizes", &solid(20, 10, [255, 0, 0])).unwrap();
            store.append("sizes", &solid(40, 40, [0, 0, 255])).unwrap();

            let result = assembler
                .assemble("sizes", "out", FrameTiming::Fps(10.0))
                .unwrap();
            let (size, frames) = decode_gif(&result.path);
            assert_eq!(size, (20, 10));
            assert_eq!(frames.len(), 2);
        }

        #[test]
        fn test_invalid_timing_before_touching_disk() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            store.append("slow", &solid(4, 4, [0, 0, 0])).unwrap();

            let result = assembler.assemble("slow", "out", FrameTiming::Fps(0.0));
            assert!(matches!(result, Err(TimelapseError::InvalidRate { .. })));
            assert!(store.session_dir("slow").unwrap().exists());
        }

        #[test]
        fn test_gif_header_and_trailer() {
            let dir = tempfile::tempdir().unwrap();
            let (_, store, assembler) = setup(dir.path());
            store.append("hdr", &solid(4, 4, [0, 0, 0])).unwrap();

            let result = assembler
                .assemble("hdr", "out", FrameTiming::Fps(10.0))
                .unwrap();
            let data = fs::read(&result.path).unwrap();
            assert_eq!(&data[0..6], b"GIF89a");
            assert_eq!(data.last(), Some(&0x3B));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_fps_delay_always_positive(fps in 0.001f64..10_000.0) {
                prop_assert!(FrameTiming::Fps(fps).delay_cs() >= 1);
            }

            #[test]
            fn prop_duration_delay_always_positive(secs in 0.0001f64..1_000_000.0) {
                prop_assert!(FrameTiming::Duration(secs).delay_cs() >= 1);
            }

            #[test]
            fn prop_quality_always_valid(quality in 0u8..=255) {
                let config = GifConfig::new(FrameTiming::Fps(10.0)).with_quality(quality);
                prop_assert!((1..=100).contains(&config.quality));
                prop_assert!((1..=30).contains(&config.encoder_speed()));
            }
        }
    }
}
