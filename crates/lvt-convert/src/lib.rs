//! `lvt-convert` – frame assembly and conversion pipeline.
//!
//! Sits between dataset readers and the canonical output: raw per-frame
//! records come in, vehicle-anchored [`Frame`]s go out.
//!
//! # Modules
//!
//! - [`source`] – [`RawFrame`] and the boundary records that absorb each
//!   dataset's pose, quaternion, size and annotation-layout conventions.
//! - [`assembler`] – [`FrameAssembler`]: one raw frame → one canonical
//!   frame, under a configurable failure policy.
//! - [`pipeline`] – [`Pipeline`]: batched parallel conversion of a whole
//!   recording into a [`FrameSink`].
//! - [`jsonl`] – newline-delimited JSON reader and sink.
//! - [`compare`] – prediction vs. ground-truth matching on converted frames.
//! - [`telemetry`] – `tracing` subscriber setup.

pub mod assembler;
pub mod compare;
pub mod error;
pub mod frame;
pub mod jsonl;
pub mod pipeline;
pub mod source;
pub mod telemetry;

pub use assembler::{AssemblerConfig, FrameAssembler};
pub use error::{ConvertError, Failure, FailureTarget};
pub use frame::{AssembledFrame, Frame};
pub use pipeline::{ConversionReport, FrameSink, Pipeline, PipelineConfig, SensorSetup, VecSink};
pub use source::RawFrame;
