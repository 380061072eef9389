//! Line-oriented parser for rig captures.
//!
//! Grammar after the trigger line:
//! - `== ...` separator, ignored
//! - `temperature: <float>` (last one wins)
//! - `us <index> <voltage>` / `ds <index> <voltage>`
//! - `DONE` ends the capture
//!
//! Anything before the first line starting with the trigger phrase is
//! discarded, and so is any line that does not match the grammar.

use std::io::BufRead;

use crate::error::ParseIncomplete;
use crate::types::{Channel, RawSample};

/// Counters gathered while scanning, for logging and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub triggered: bool,
    pub done_seen: bool,
    /// Lines examined after the trigger (the `DONE` line included).
    pub lines_scanned: usize,
    /// `us`/`ds` lines dropped for a wrong token count or bad number.
    pub malformed_lines: usize,
}

/// Raw parser output, before warm-up trimming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCapture {
    pub upstream: Vec<RawSample>,
    pub downstream: Vec<RawSample>,
    /// Fahrenheit.
    pub temperature: Option<f64>,
    pub stats: ScanStats,
}

/// Both channels after warm-up trimming; each is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedCapture {
    pub upstream: Vec<RawSample>,
    pub downstream: Vec<RawSample>,
    pub temperature: Option<f64>,
}

enum LineKind {
    Ignored,
    Done,
}

struct Scanner<'t> {
    trigger: &'t str,
    out: ParsedCapture,
}

impl<'t> Scanner<'t> {
    fn new(trigger: &'t str) -> Self {
        Self {
            trigger,
            out: ParsedCapture::default(),
        }
    }

    fn feed(&mut self, raw_line: &str) -> LineKind {
        let line = raw_line.trim();
        if !self.out.stats.triggered {
            if line.starts_with(self.trigger) {
                self.out.stats.triggered = true;
            }
            return LineKind::Ignored;
        }
        self.out.stats.lines_scanned += 1;

        if line.starts_with("==") {
            return LineKind::Ignored;
        }
        if let Some(rest) = line.strip_prefix("temperature: ") {
            match rest.trim().parse::<f64>() {
                Ok(t) => self.out.temperature = Some(t),
                Err(_) => tracing::warn!(value = rest, "unparseable temperature line skipped"),
            }
            return LineKind::Ignored;
        }
        if line.starts_with("DONE") {
            self.out.stats.done_seen = true;
            return LineKind::Done;
        }
        if line.starts_with("us") || line.starts_with("ds") {
            self.sample_line(line);
        }
        LineKind::Ignored
    }

    fn sample_line(&mut self, line: &str) {
        let mut parts = line.split_whitespace();
        let (Some(prefix), Some(index), Some(voltage), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            self.out.stats.malformed_lines += 1;
            return;
        };
        let (Ok(index), Ok(voltage)) = (index.parse::<f64>(), voltage.parse::<f64>()) else {
            self.out.stats.malformed_lines += 1;
            return;
        };
        // "nan"/"inf" parse as f64 but are not samples.
        if !(index.is_finite() && index >= 0.0 && voltage.is_finite()) {
            self.out.stats.malformed_lines += 1;
            return;
        }
        let sample = RawSample { index, voltage };
        match prefix {
            "us" => self.out.upstream.push(sample),
            "ds" => self.out.downstream.push(sample),
            // e.g. "usb 1 2": starts like a sample line but names no channel
            _ => {}
        }
    }

    fn finish(self) -> ParsedCapture {
        let out = self.out;
        tracing::debug!(
            triggered = out.stats.triggered,
            done = out.stats.done_seen,
            upstream = out.upstream.len(),
            downstream = out.downstream.len(),
            malformed = out.stats.malformed_lines,
            "capture scanned"
        );
        out
    }
}

/// Parse an in-memory capture.
pub fn parse_capture(text: &str, trigger: &str) -> ParsedCapture {
    let mut scanner = Scanner::new(trigger);
    for line in text.lines() {
        if let LineKind::Done = scanner.feed(line) {
            break;
        }
    }
    scanner.finish()
}

/// Parse a capture from any buffered reader, stopping at `DONE`.
pub fn parse_reader<R: BufRead>(reader: R, trigger: &str) -> std::io::Result<ParsedCapture> {
    let mut scanner = Scanner::new(trigger);
    for line in reader.lines() {
        if let LineKind::Done = scanner.feed(&line?) {
            break;
        }
    }
    Ok(scanner.finish())
}

/// Drop the first `warmup` samples.
pub fn trim_warmup(mut samples: Vec<RawSample>, warmup: usize) -> Vec<RawSample> {
    if warmup >= samples.len() {
        samples.clear();
    } else {
        samples.drain(..warmup);
    }
    samples
}

impl ParsedCapture {
    /// Apply warm-up trimming and check both channels are usable.
    pub fn into_trimmed(
        self,
        warmup: usize,
        trigger: &str,
    ) -> Result<TrimmedCapture, ParseIncomplete> {
        if !self.stats.triggered {
            return Err(ParseIncomplete::NoTrigger {
                trigger: trigger.to_string(),
            });
        }
        let us_len = self.upstream.len();
        let ds_len = self.downstream.len();
        let upstream = trim_warmup(self.upstream, warmup);
        let downstream = trim_warmup(self.downstream, warmup);
        for (channel, raw_len, trimmed) in [
            (Channel::Upstream, us_len, &upstream),
            (Channel::Downstream, ds_len, &downstream),
        ] {
            if trimmed.is_empty() {
                return Err(ParseIncomplete::EmptyAfterTrim {
                    channel,
                    raw_len,
                    warmup,
                });
            }
        }
        Ok(TrimmedCapture {
            upstream,
            downstream,
            temperature: self.temperature,
        })
    }
}
