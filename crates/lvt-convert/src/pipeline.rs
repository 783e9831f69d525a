//! [`Pipeline`] – converts a whole recording, frame by frame.
//!
//! The sensor setup (lidar extrinsics and camera calibrations) is read once
//! from the first frame and frozen.  Frames are then pulled in batches of
//! [`PipelineConfig::batch_size`], assembled in parallel on a dedicated
//! rayon pool, and handed to a [`FrameSink`] strictly in input order.  The
//! cancel flag is checked between batches, so a cancelled run always ends
//! on a batch boundary with every accepted frame written.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::AtomicBool;
//! use lvt_convert::ConvertError;
//! use lvt_convert::pipeline::{Pipeline, PipelineConfig, VecSink};
//! use lvt_convert::source::RawFrame;
//!
//! let frames = (0..3).map(|n| {
//!     serde_json::from_value::<RawFrame>(serde_json::json!({
//!         "frame_num": n,
//!         "ego_pose": { "translation": [0.0, 0.0, 0.0], "rotation": [1.0, 0.0, 0.0, 0.0] }
//!     }))
//!     .map_err(ConvertError::from)
//! });
//!
//! let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
//! let mut sink = VecSink::default();
//! let report = pipeline.run(frames, &mut sink, &AtomicBool::new(false)).unwrap();
//! assert_eq!(report.frames_converted, 3);
//! assert_eq!(sink.frames.len(), 3);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use lvt_geometry::CalibrationTable;
use lvt_geometry::camera::CameraCalibration;
use lvt_types::FailurePolicy;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assembler::{AssemblerConfig, FrameAssembler, calibration_from_frame};
use crate::error::{ConvertError, Failure};
use crate::frame::AssembledFrame;
use crate::source::RawFrame;

/// Default number of frames assembled per parallel batch.
pub const DEFAULT_BATCH_SIZE: usize = 16;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(flatten)]
    pub assembler: AssemblerConfig,
    /// Worker threads; `0` lets rayon pick one per core.
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            assembler: AssemblerConfig::default(),
            threads: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensor setup
// ────────────────────────────────────────────────────────────────────────────

/// The calibration state fixed at the start of a recording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSetup {
    pub lidars: CalibrationTable,
    pub cameras: Vec<CameraCalibration>,
}

impl SensorSetup {
    pub fn from_first_frame(raw: &RawFrame) -> Result<Self, ConvertError> {
        let lidars = calibration_from_frame(raw)?;
        let cameras = raw
            .cameras
            .iter()
            .map(|(name, record)| {
                record
                    .to_calibration(name)
                    .map_err(|source| ConvertError::Calibration {
                        sensor: name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { lidars, cameras })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sinks
// ────────────────────────────────────────────────────────────────────────────

/// Destination for converted frames.
pub trait FrameSink {
    /// Called once, before the first frame, with the frozen sensor setup.
    fn begin(&mut self, _setup: &SensorSetup) -> Result<(), ConvertError> {
        Ok(())
    }

    /// Called once per converted frame, in frame order.
    fn write_frame(&mut self, frame: &AssembledFrame) -> Result<(), ConvertError>;
}

/// Collects everything in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub setup: Option<SensorSetup>,
    pub frames: Vec<AssembledFrame>,
}

impl FrameSink for VecSink {
    fn begin(&mut self, setup: &SensorSetup) -> Result<(), ConvertError> {
        self.setup = Some(setup.clone());
        Ok(())
    }

    fn write_frame(&mut self, frame: &AssembledFrame) -> Result<(), ConvertError> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub frames_converted: usize,
    pub frames_skipped: usize,
    pub ground_truth_boxes: usize,
    pub predicted_boxes: usize,
    pub points: usize,
    /// Skipped frames and skipped items inside converted frames.
    pub failures: Vec<Failure>,
    pub cancelled: bool,
}

impl ConversionReport {
    fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            frames_converted: 0,
            frames_skipped: 0,
            ground_truth_boxes: 0,
            predicted_boxes: 0,
            points: 0,
            failures: Vec::new(),
            cancelled: false,
        }
    }

    fn record(&mut self, assembled: &AssembledFrame) {
        self.frames_converted += 1;
        self.ground_truth_boxes += assembled.frame.ground_truth.len();
        self.predicted_boxes += assembled.frame.predicted.len();
        self.points += assembled.frame.point_count();
        self.failures.extend(assembled.failures.iter().cloned());
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Wall-clock run time, once finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct Pipeline {
    config: PipelineConfig,
    pool: rayon::ThreadPool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConvertError> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("lvt-worker-{i}"));
        if config.threads > 0 {
            builder = builder.num_threads(config.threads);
        }
        let pool = builder.build()?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Convert `frames` into `sink`.
    ///
    /// Frame numbers start at 0 and strictly increase.  The first frame may
    /// only be numbered above 0 when unreadable lines before it were skipped.
    ///
    /// A bad starting frame number, calibration errors in the first frame,
    /// I/O errors and sink errors always abort.  Unreadable lines,
    /// out-of-order frames and frames whose ego pose is invalid abort under
    /// [`FailurePolicy::FailFast`] and are skipped under
    /// [`FailurePolicy::BestEffort`].
    pub fn run<I, S>(
        &self,
        frames: I,
        sink: &mut S,
        cancel: &AtomicBool,
    ) -> Result<ConversionReport, ConvertError>
    where
        I: IntoIterator<Item = Result<RawFrame, ConvertError>>,
        S: FrameSink + ?Sized,
    {
        let mut report = ConversionReport::start();
        let mut frames = frames.into_iter();

        let first = loop {
            match frames.next() {
                Some(Ok(raw)) => break raw,
                Some(Err(err)) => self.skip(err, &mut report)?,
                None => {
                    info!("input contained no frames");
                    return Ok(report.finish());
                }
            }
        };

        if first.frame_num != 0 && report.frames_skipped == 0 {
            return Err(ConvertError::StartFrame {
                frame_num: first.frame_num,
            });
        }

        let setup = SensorSetup::from_first_frame(&first)?;
        info!(
            frame_num = first.frame_num,
            lidars = setup.lidars.len(),
            cameras = setup.cameras.len(),
            "sensor setup fixed"
        );
        sink.begin(&setup)?;
        let assembler = FrameAssembler::new(self.config.assembler, Arc::new(setup.lidars));

        let batch_size = self.config.batch_size.max(1);
        let mut previous = first.frame_num;
        let mut batch = vec![first];

        loop {
            while batch.len() < batch_size {
                match frames.next() {
                    Some(Ok(raw)) if raw.frame_num <= previous => self.skip(
                        ConvertError::FrameOrder {
                            frame_num: raw.frame_num,
                            previous,
                        },
                        &mut report,
                    )?,
                    Some(Ok(raw)) => {
                        previous = raw.frame_num;
                        batch.push(raw);
                    }
                    Some(Err(err)) => self.skip(err, &mut report)?,
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }

            let results: Vec<_> = self.pool.install(|| {
                std::mem::take(&mut batch)
                    .into_par_iter()
                    .map(|raw| assembler.assemble(raw))
                    .collect()
            });
            for result in results {
                match result {
                    Ok(assembled) => {
                        sink.write_frame(&assembled)?;
                        report.record(&assembled);
                    }
                    Err(err) => self.skip(err, &mut report)?,
                }
            }

            if cancel.load(Ordering::SeqCst) {
                warn!(frames = report.frames_converted, "conversion cancelled");
                report.cancelled = true;
                break;
            }
        }

        let report = report.finish();
        info!(
            converted = report.frames_converted,
            skipped = report.frames_skipped,
            failures = report.failures.len(),
            "conversion finished"
        );
        Ok(report)
    }

    /// Apply the failure policy to a frame-level error.
    fn skip(&self, err: ConvertError, report: &mut ConversionReport) -> Result<(), ConvertError> {
        let skippable = matches!(
            err,
            ConvertError::Parse { .. }
                | ConvertError::FrameOrder { .. }
                | ConvertError::EgoPose { .. }
        );
        if !skippable || self.config.assembler.policy == FailurePolicy::FailFast {
            return Err(err);
        }
        warn!(error = %err, "skipping frame");
        report.frames_skipped += 1;
        report.failures.push(Failure::from(&err));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
