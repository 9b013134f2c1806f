//! Histogram matching against one reference image.

use grade_compute::WorkerPool;
use grade_io::{ImageData, OutputFormat};
use grade_ops::{HistogramTransferBuilder, TransferLut};
use tracing::{debug, trace};

use crate::{BatchReport, EngineResult};

/// Matches encoded source images to a reference held by the engine.
///
/// Obtained from [`GradingEngine::build_histogram_transfer`](crate::GradingEngine::build_histogram_transfer).
/// Each source gets its own tables: distributions are built at working
/// resolution and the tables applied at full resolution.
pub struct HistogramMatcher<'a> {
    builder: HistogramTransferBuilder,
    pool: &'a WorkerPool,
    output: OutputFormat,
}

impl<'a> HistogramMatcher<'a> {
    pub(crate) fn new(builder: HistogramTransferBuilder, pool: &'a WorkerPool, output: OutputFormat) -> Self {
        Self { builder, pool, output }
    }

    /// Sets the output encoding.
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn builder(&self) -> &HistogramTransferBuilder {
        &self.builder
    }

    /// Transfer tables for an encoded source.
    pub fn transfer_for(&self, source_bytes: &[u8]) -> EngineResult<TransferLut> {
        let source = grade_io::decode(source_bytes)?;
        Ok(self.builder.build(&source))
    }

    /// Matches one encoded source.
    pub fn apply_to(&self, source_bytes: &[u8]) -> EngineResult<Vec<u8>> {
        trace!(len = source_bytes.len(), "histogram apply_to");
        let source = grade_io::decode(source_bytes)?;
        let matched = self.builder.apply_to(&source);
        Ok(grade_io::encode(&matched, self.output)?)
    }

    /// Matches every encoded source on the worker pool.
    ///
    /// Failing items are reported and do not stop the rest.
    pub fn match_batch(&self, sources: &[Vec<u8>]) -> BatchReport {
        let inputs: Vec<&[u8]> = sources.iter().map(Vec::as_slice).collect();
        let results = self.pool.map_ordered(inputs, |bytes| self.apply_to(bytes));
        let report = BatchReport::from_results(results);
        debug!(items = report.len(), succeeded = report.succeeded, "histogram batch matched");
        report
    }

    /// Matches decoded sources on the worker pool, in input order.
    pub fn match_images(&self, sources: Vec<ImageData>) -> Vec<ImageData> {
        self.builder.apply_batch(sources, self.pool)
    }
}
