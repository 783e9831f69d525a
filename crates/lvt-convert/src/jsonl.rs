//! Newline-delimited JSON input and output.
//!
//! Input carries one [`RawFrame`] per line; output carries one
//! [`AssembledFrame`] per line.  Blank lines are ignored.  Line numbers in
//! errors are 1-based.

use std::io::{BufRead, Write};

use serde::de::DeserializeOwned;

use crate::error::ConvertError;
use crate::frame::AssembledFrame;
use crate::pipeline::{FrameSink, SensorSetup};
use crate::source::RawFrame;

fn read_lines<T, R>(reader: R) -> impl Iterator<Item = Result<T, ConvertError>>
where
    T: DeserializeOwned,
    R: BufRead,
{
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| match line {
            Err(err) => Some(Err(ConvertError::Io(err))),
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                serde_json::from_str(&line).map_err(|source| ConvertError::Parse {
                    line: index + 1,
                    source,
                }),
            ),
        })
}

/// Lazily parse raw frames.
pub fn read_frames<R: BufRead>(reader: R) -> impl Iterator<Item = Result<RawFrame, ConvertError>> {
    read_lines(reader)
}

/// Lazily parse previously converted frames.
pub fn read_converted<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<AssembledFrame, ConvertError>> {
    read_lines(reader)
}

/// Writes each converted frame as one JSON line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    setup: Option<SensorSetup>,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            setup: None,
            written: 0,
        }
    }

    /// The sensor setup the run started with, once known.
    pub fn setup(&self) -> Option<&SensorSetup> {
        self.setup.as_ref()
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the writer.
    pub fn into_inner(mut self) -> Result<W, ConvertError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> FrameSink for JsonLinesSink<W> {
    fn begin(&mut self, setup: &SensorSetup) -> Result<(), ConvertError> {
        self.setup = Some(setup.clone());
        Ok(())
    }

    fn write_frame(&mut self, frame: &AssembledFrame) -> Result<(), ConvertError> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }
}
