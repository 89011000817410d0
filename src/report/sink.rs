use std::io::{self, Stdout, Write};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::output::csv::{report_csv_header, report_to_csv_row};
use crate::output::render_json;
use crate::output::table::render_report_table;
use crate::output::OutputFormat;
use crate::report::EventReport;

#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn send(&self, report: &EventReport) -> Result<()>;
}

/// Prints each report as soon as it is produced, to stdout unless another
/// writer is supplied.
pub struct StdoutSink<W: Write + Send = Stdout> {
    format: OutputFormat,
    show_skipped: bool,
    state: Mutex<SinkState<W>>,
}

struct SinkState<W> {
    out: W,
    wrote_header: bool,
}

impl StdoutSink {
    pub fn new(format: OutputFormat, show_skipped: bool) -> Self {
        Self::with_writer(io::stdout(), format, show_skipped)
    }
}

impl<W: Write + Send> StdoutSink<W> {
    pub fn with_writer(out: W, format: OutputFormat, show_skipped: bool) -> Self {
        Self {
            format,
            show_skipped,
            state: Mutex::new(SinkState {
                out,
                wrote_header: false,
            }),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.state
            .into_inner()
            .map(|state| state.out)
            .map_err(|_| anyhow!("stdout sink mutex poisoned"))
    }
}

#[async_trait]
impl<W: Write + Send> ReportSink for StdoutSink<W> {
    async fn send(&self, report: &EventReport) -> Result<()> {
        if report.is_skipped() && !self.show_skipped {
            return Ok(());
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("stdout sink mutex poisoned"))?;
        match self.format {
            OutputFormat::Table => writeln!(state.out, "{}", render_report_table(report))?,
            OutputFormat::Json => writeln!(state.out, "{}", render_json(report)?)?,
            OutputFormat::Csv => {
                if !state.wrote_header {
                    write!(state.out, "{}", report_csv_header()?)?;
                    state.wrote_header = true;
                }
                write!(state.out, "{}", report_to_csv_row(report)?)?;
            }
        }
        state.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    reports: Mutex<Vec<EventReport>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<EventReport> {
        self.reports
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[async_trait]
impl ReportSink for MemorySink {
    async fn send(&self, report: &EventReport) -> Result<()> {
        self.reports
            .lock()
            .map_err(|_| anyhow!("memory sink mutex poisoned"))?
            .push(report.clone());
        Ok(())
    }
}
