// Batch driver for Reflector
//
// Processes every configured source in turn. A source that fails is logged
// and counted, and the batch moves on to the next one.
//
// Used by: main.rs, which turns the summary into the exit status

use std::io::{self, Write};
use tracing::{error, info};

use crate::config::{Mode, ScanConfig};
use crate::correlator::Correlator;
use crate::errors::ArchiveError;
use crate::input::InputSource;
use crate::models::{ArchiveParser, CapturedEntry};
use crate::parsers::HarParser;
use crate::reporting::{export_csv, export_markdown, write_dump, write_reflections};

/// Outcome of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub sources: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Run every source in `config` and write reports to `out`
pub fn run<W: Write>(config: &ScanConfig, out: &mut W) -> RunSummary {
    let mut summary = RunSummary::default();
    for source in &config.inputs {
        summary.sources += 1;
        let result = match config.mode {
            Mode::Dump => run_dump(config, source, out),
            Mode::Reflect => run_reflect(config, source, out),
        };
        if let Err(e) = result {
            error!(source = %e.source_name(), "{}", e);
            summary.failed += 1;
        }
    }

    if summary.failed > 0 && summary.sources > 1 {
        error!("{} of {} sources failed", summary.failed, summary.sources);
    }
    summary
}

fn load(source: &InputSource) -> Result<Vec<CapturedEntry>, ArchiveError> {
    let content = source.read_to_string()?;
    HarParser.parse(&source.name(), &content)
}

fn output_error(source: &InputSource, error: io::Error) -> ArchiveError {
    ArchiveError::Output {
        source_name: source.name(),
        error,
    }
}

/// Dump every leaf of one source, entry by entry
fn run_dump<W: Write>(
    config: &ScanConfig,
    source: &InputSource,
    out: &mut W,
) -> Result<(), ArchiveError> {
    let entries = load(source)?;
    info!(source = %source, entries = entries.len(), "dumping parameters");

    let correlator = Correlator::new(config.decoder(), config.hosts.clone(), source.name());
    for entry in &entries {
        let record = correlator.dump(entry)?;
        match write_dump(out, &record) {
            Ok(()) => {}
            // Reader went away (e.g. `| head`); stop quietly
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(output_error(source, e)),
        }
    }
    out.flush().map_err(|e| output_error(source, e))
}

fn run_reflect<W: Write>(
    config: &ScanConfig,
    source: &InputSource,
    out: &mut W,
) -> Result<(), ArchiveError> {
    let entries = load(source)?;

    let correlator = Correlator::new(config.decoder(), config.hosts.clone(), source.name());
    let results = correlator.reflect_all(&entries)?;
    let reflected: usize = results.iter().map(|r| r.xss.len()).sum();
    info!(
        source = %source,
        entries = entries.len(),
        results = results.len(),
        reflected,
        "correlation finished"
    );

    write_reflections(out, &results, config.pretty)
        .and_then(|()| out.flush())
        .map_err(|e| output_error(source, e))?;

    if config.csv_report {
        let file = export_csv(&results).map_err(|e| output_error(source, e))?;
        info!("CSV report written to {}", file);
    }
    if config.markdown_report {
        let file = export_markdown(&results).map_err(|e| output_error(source, e))?;
        info!("Markdown report written to {}", file);
    }
    Ok(())
}
