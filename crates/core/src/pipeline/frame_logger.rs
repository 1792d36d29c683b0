use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for the live loop's per-frame events.
///
/// Lets the CLI report stage timings while tests and embedders stay quiet.
pub trait FrameLogger: Send {
    /// Called once per processed frame with the running count.
    fn frame(&mut self, processed: usize);

    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A per-frame measurement, e.g. the number of faces.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

pub struct NullFrameLogger;

impl FrameLogger for NullFrameLogger {
    fn frame(&mut self, _processed: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running aggregate of one stage or metric.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Series {
    pub count: usize,
    pub total: f64,
    pub min: f64,
    pub max: f64,
}

impl Series {
    fn new(value: f64) -> Self {
        Self {
            count: 1,
            total: value,
            min: value,
            max: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn mean(&self) -> f64 {
        self.total / self.count as f64
    }
}

/// Logs progress every `every_frames` frames and a stage/metric summary
/// at the end of the run.
pub struct StdoutFrameLogger {
    every_frames: usize,
    timings: BTreeMap<String, Series>,
    metrics: BTreeMap<String, Series>,
    started: Instant,
    frames: usize,
}

impl StdoutFrameLogger {
    pub fn new(every_frames: usize) -> Self {
        Self {
            every_frames: every_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            frames: 0,
        }
    }

    pub fn timing_series(&self, stage: &str) -> Option<&Series> {
        self.timings.get(stage)
    }

    pub fn metric_series(&self, name: &str) -> Option<&Series> {
        self.metrics.get(name)
    }

    /// `None` until something has been recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Live capture summary ({} frames in {elapsed:.1}s):",
            self.frames
        )];
        for (stage, s) in &self.timings {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  min {:6.1}ms  max {:6.1}ms",
                s.mean(),
                s.min,
                s.max
            ));
        }
        for (name, s) in &self.metrics {
            lines.push(format!(
                "  {name}: avg {:.1}  range {}..{}",
                s.mean(),
                s.min,
                s.max
            ));
        }
        if self.frames > 0 && elapsed > 0.0 {
            lines.push(format!(
                "  Detection rate: {:.1} fps",
                self.frames as f64 / elapsed
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutFrameLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

fn record(series: &mut BTreeMap<String, Series>, key: &str, value: f64) {
    match series.get_mut(key) {
        Some(s) => s.push(value),
        None => {
            series.insert(key.to_string(), Series::new(value));
        }
    }
}

impl FrameLogger for StdoutFrameLogger {
    fn frame(&mut self, processed: usize) {
        self.frames = processed;
        if processed % self.every_frames == 0 {
            log::info!("Processed {processed} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        record(&mut self.timings, stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        record(&mut self.metrics, name, value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
