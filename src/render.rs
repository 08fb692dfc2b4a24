//! # Render — Terminal Projection and CSV Export
//!
//! [`TerminalProjection`] is the [`Projection`] the CLI installs. It writes
//! plain text and `comfy-table` tables to any `Write` sink (stdout in the
//! binary, a byte buffer in tests). Errors go to the same sink, and the
//! projection counts them so one-shot commands can pick an exit status.
//!
//! Layouts:
//!
//! ```text
//! sequences   ┌───────┬───────────┬──────────────────┐
//!             │ Prime ┆ Sequences ┆ Sums             │    then
//!             ╞═══════╪═══════════╪══════════════════╡    "Found N primes"
//!             │ 17    ┆ 1         ┆ 2 + 3 + 5 + 7    │    "Search time: X.XX s"
//!             └───────┴───────────┴──────────────────┘
//! phones      "Found N prime phone numbers" + a grid, PHONE_COLUMNS wide
//! prefixes    numbered list; `pick N` in interactive mode selects entry N
//! ```

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::warn;

use crate::orchestrator::lock_or_recover;
use crate::outcome::{PrimeSequences, SearchResults};
use crate::projection::{ErrorNotice, Projection, SurfaceKind, Tab};

const PHONE_COLUMNS: usize = 5;

pub struct TerminalProjection<W> {
    out: Mutex<W>,
    errors: AtomicUsize,
}

impl TerminalProjection<std::io::Stdout> {
    pub fn stdout() -> Self {
        TerminalProjection::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> TerminalProjection<W> {
    pub fn new(out: W) -> Self {
        TerminalProjection {
            out: Mutex::new(out),
            errors: AtomicUsize::new(0),
        }
    }

    /// Number of errors shown so far.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }

    /// Consume the projection and hand back the sink.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, text: &str) {
        let mut out = lock_or_recover(&self.out);
        if let Err(e) = writeln!(out, "{}", text).and_then(|_| out.flush()) {
            warn!(error = %e, "failed to write to terminal");
        }
    }
}

impl<W: Write + Send + 'static> Projection for TerminalProjection<W> {
    fn loading_changed(&self, surface: SurfaceKind, busy: bool) {
        if busy {
            self.emit(&format!("[{}] searching...", surface));
        }
    }

    fn show_results(&self, surface: SurfaceKind, results: &SearchResults) {
        self.emit(&render_results(surface, results));
    }

    fn show_error(&self, notice: &ErrorNotice) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.emit(&format!("[{}] {}", notice.surface, notice.message));
    }

    fn tab_changed(&self, tab: Tab) {
        self.emit(&format!("Switched to the {} tab", tab));
    }
}

/// Full text block for one settled surface.
pub fn render_results(surface: SurfaceKind, results: &SearchResults) -> String {
    match surface {
        SurfaceKind::Sequences => render_sequences(results),
        SurfaceKind::Phones => render_phones(results),
        SurfaceKind::Prefixes => render_prefixes(results),
    }
}

fn render_sequences(results: &SearchResults) -> String {
    if results.is_empty() {
        return "No primes found matching these conditions.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::DynamicFullWidth);
    table.set_header(vec!["Prime", "Sequences", "Sums"]);
    for entry in results.prime_sequences() {
        table.add_row(vec![
            entry.prime.to_string(),
            entry.sequences.len().to_string(),
            entry
                .sequences
                .iter()
                .map(|s| sum_expression(s))
                .collect::<Vec<_>>()
                .join("\n"),
        ]);
    }
    let time = match results.elapsed_seconds {
        Some(secs) => format!("{:.2} s", secs),
        None => "unknown".to_string(),
    };
    format!(
        "{}\nFound {} primes\nSearch time: {}",
        table,
        results.len(),
        time
    )
}

fn render_phones(results: &SearchResults) -> String {
    if results.is_empty() {
        return "No prime phone numbers found for this prefix.".to_string();
    }
    let numbers: Vec<&str> = results.phone_numbers().collect();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    for row in numbers.chunks(PHONE_COLUMNS) {
        table.add_row(row.to_vec());
    }
    format!("Found {} prime phone numbers:\n{}", numbers.len(), table)
}

fn render_prefixes(results: &SearchResults) -> String {
    if results.is_empty() {
        return "No prefixes available.".to_string();
    }
    let mut lines = vec![format!("{} prefixes:", results.len())];
    for (i, option) in results.prefix_options().enumerate() {
        lines.push(format!("{:>4}. {} ({})", i + 1, option.full, option.short));
    }
    lines.join("\n")
}

fn sum_expression(sequence: &[u64]) -> String {
    sequence
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" + ")
}

#[derive(serde::Serialize)]
struct CsvRow<'a> {
    prime: u64,
    sequence_count: usize,
    sequences: &'a str,
}

/// Write sequence results as CSV. Returns the number of data rows.
pub fn export_csv<W: Write>(results: &SearchResults, writer: W) -> Result<usize, csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for PrimeSequences { prime, sequences } in results.prime_sequences() {
        let joined = sequences
            .iter()
            .map(|s| sum_expression(s))
            .collect::<Vec<_>>()
            .join("; ");
        csv.serialize(CsvRow {
            prime: *prime,
            sequence_count: sequences.len(),
            sequences: &joined,
        })?;
        rows += 1;
    }
    if rows == 0 {
        csv.write_record(["prime", "sequence_count", "sequences"])?;
    }
    csv.flush()?;
    Ok(rows)
}

pub fn export_csv_file(results: &SearchResults, path: &Path) -> Result<usize, csv::Error> {
    let file = std::fs::File::create(path)?;
    export_csv(results, std::io::BufWriter::new(file))
}
