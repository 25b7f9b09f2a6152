//! The interactive verification loop.
//!
//! Every image goes through the same cycle: load it, run the detector on the
//! prepared input, suppress and rescale the candidates, show them, then block on
//! one operator key. Accepted images go to [`DatasetStore`]; the counters in
//! [`ResumeState`] advance only once an outcome is final.

use image::RgbImage;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::conversion::normalize_boxes;
use crate::detector::Detector;
use crate::error::{CurateError, Result};
use crate::input::InputProvider;
use crate::io::load_image;
use crate::postprocess::{non_max_suppression, reading_string, rescale_boxes, Thresholds};
use crate::preprocess::{prepare, DetectorInput};
use crate::preview::{describe, render, Preview, PreviewGuard, PREVIEW_WIDTH};
use crate::store::DatasetStore;
use crate::types::{Bucket, Decision, DetectionBox, ResumeState};
use crate::utils::create_progress_bar;

pub const INPUT_SIZE: u32 = 640;
pub const STRIDE: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Side of the square detector input
    pub input_size: u32,
    pub stride: u32,
    pub thresholds: Thresholds,
    pub preview_width: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input_size: INPUT_SIZE,
            stride: STRIDE,
            thresholds: Thresholds::default(),
            preview_width: PREVIEW_WIDTH,
        }
    }
}

/// One image for the duration of a single iteration
pub struct ImageRecord {
    pub path: PathBuf,
    pub image: RgbImage,
    pub input: DetectorInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Every image in the sequence got a decision
    Exhausted,
    /// The operator pressed quit
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub end: SessionEnd,
    pub counters: ResumeState,
    /// Image files written during this run, in order
    pub written: Vec<PathBuf>,
}

impl SessionReport {
    pub fn summary(&self) -> String {
        match self.end {
            SessionEnd::Quit => format!("Stopped @ {}", self.counters),
            SessionEnd::Exhausted => format!("Done verifying predictions! {}", self.counters),
        }
    }
}

pub struct Session<D, P, I>
where
    D: Detector,
    P: Preview,
    I: InputProvider,
{
    store: DatasetStore,
    detector: D,
    preview: PreviewGuard<P>,
    input: I,
    config: SessionConfig,
}

impl<D, P, I> Session<D, P, I>
where
    D: Detector,
    P: Preview,
    I: InputProvider,
{
    pub fn new(store: DatasetStore, detector: D, preview: P, input: I, config: SessionConfig) -> Self {
        Self {
            store,
            detector,
            preview: PreviewGuard::new(preview),
            input,
            config,
        }
    }

    /// Run the loop over `image_paths`, starting at `counters.offset()`.
    ///
    /// The updated counters come back in the report. The preview is closed on
    /// every way out, errors included.
    pub fn run(mut self, image_paths: &[PathBuf], counters: ResumeState) -> Result<SessionReport> {
        let result = self.run_loop(image_paths, counters);
        let closed = self.preview.close();
        let report = result?;
        closed?;
        Ok(report)
    }

    fn run_loop(&mut self, image_paths: &[PathBuf], mut counters: ResumeState) -> Result<SessionReport> {
        let start = counters.offset();
        if start > image_paths.len() {
            warn!(
                "Resume offset {} is past the {} discovered images",
                start,
                image_paths.len()
            );
        }

        info!("Verifying predictions...");
        let pb = create_progress_bar(image_paths.len() as u64, "Verify");
        pb.set_position(start.min(image_paths.len()) as u64);

        let mut written = Vec::new();
        for path in image_paths.iter().skip(start) {
            pb.inc(1);
            match self.process(path, &mut counters, &mut written) {
                Ok(Some(end)) => {
                    pb.abandon();
                    return Ok(SessionReport {
                        end,
                        counters,
                        written,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    pb.abandon();
                    error!("Failed on {}, stopped @ {}", path.display(), counters);
                    return Err(e);
                }
            }
        }

        pb.finish_with_message("Verification complete");
        Ok(SessionReport {
            end: SessionEnd::Exhausted,
            counters,
            written,
        })
    }

    /// One full decision cycle; `Some` ends the session early
    fn process(
        &mut self,
        path: &Path,
        counters: &mut ResumeState,
        written: &mut Vec<PathBuf>,
    ) -> Result<Option<SessionEnd>> {
        let record = self.load(path)?;
        let boxes = self.detect(&record)?;
        self.present(&record, &boxes)?;

        match self.await_decision()? {
            Decision::Quit => return Ok(Some(SessionEnd::Quit)),
            Decision::Skip => counters.increment_skipped(),
            Decision::AcceptAuto => {
                written.push(self.persist(&record, &boxes, Bucket::Auto, counters)?);
            }
            Decision::AcceptManual => {
                written.push(self.persist(&record, &boxes, Bucket::Manual, counters)?);
            }
        }
        Ok(None)
    }

    fn load(&self, path: &Path) -> Result<ImageRecord> {
        let image = load_image(path)?;
        let input = prepare(&image, self.config.input_size, self.config.stride);
        Ok(ImageRecord {
            path: path.to_path_buf(),
            image,
            input,
        })
    }

    /// Candidates for the record in source-image pixels
    fn detect(&mut self, record: &ImageRecord) -> Result<Vec<DetectionBox>> {
        let raw = self.detector.detect(&record.path, &record.input)?;
        let kept = non_max_suppression(raw, self.config.thresholds);
        Ok(rescale_boxes(
            &kept,
            &record.input.letterbox,
            record.image.width(),
            record.image.height(),
        ))
    }

    fn present(&mut self, record: &ImageRecord, boxes: &[DetectionBox]) -> Result<()> {
        let names = self.detector.class_names();
        info!(
            "{}: {} candidates, reads {:?}",
            record.path.display(),
            boxes.len(),
            reading_string(boxes, names)
        );
        describe(boxes, names);

        let frame = render(&record.image, boxes, self.config.preview_width);
        self.preview.show(&record.image, &frame)
    }

    /// Block until one of the four command keys is pressed
    fn await_decision(&mut self) -> Result<Decision> {
        loop {
            let key = self.input.next_key()?;
            match Decision::from_key(key) {
                Ok(decision) => return Ok(decision),
                Err(e @ CurateError::UnrecognizedInput(_)) => warn!("{}", e),
                Err(e) => return Err(e),
            }
        }
    }

    fn persist(
        &self,
        record: &ImageRecord,
        boxes: &[DetectionBox],
        bucket: Bucket,
        counters: &mut ResumeState,
    ) -> Result<PathBuf> {
        let labels = match bucket {
            Bucket::Auto => Some(normalize_boxes(
                boxes,
                record.image.width(),
                record.image.height(),
            )),
            Bucket::Manual => None,
        };
        let saved = self
            .store
            .write(bucket, counters, &record.image, labels.as_deref())?;
        info!("Saved {} to {}", record.path.display(), saved.display());
        Ok(saved)
    }
}
