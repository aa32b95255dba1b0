//! Timing scopes and the reconciliation event log.
//!
//! Scopes are free when disabled. When enabled, each closed scope is
//! aggregated per name and traced; [`summary`] reports the totals. The event
//! log is a plain text file that records one line per reconciliation so a
//! session can be replayed by eye.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

static ENABLED: AtomicBool = AtomicBool::new(false);
static STATE: LazyLock<Mutex<State>> = LazyLock::new(|| Mutex::new(State::default()));

#[derive(Debug, Default)]
struct State {
    timings: BTreeMap<&'static str, Timing>,
    log: Option<EventLog>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Timing {
    calls: u64,
    total: Duration,
    max: Duration,
}

#[derive(Debug)]
struct EventLog {
    start: Instant,
    writer: BufWriter<File>,
}

fn state() -> MutexGuard<'static, State> {
    STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Guard returned by [`scope`]; records its lifetime on drop.
#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed = self.start.elapsed();
        record(self.name, elapsed);
        tracing::trace!(
            target: "live_preview::perf",
            scope = self.name,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "perf"
        );
    }
}

/// Aggregate timing for one scope name.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSummary {
    pub name: &'static str,
    pub calls: u64,
    pub total_ms: f64,
    pub max_ms: f64,
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

fn record(name: &'static str, elapsed: Duration) {
    let mut state = state();
    let timing = state.timings.entry(name).or_default();
    timing.calls += 1;
    timing.total += elapsed;
    timing.max = timing.max.max(elapsed);
}

/// Totals per scope name, sorted by name.
pub fn summary() -> Vec<TimingSummary> {
    state()
        .timings
        .iter()
        .map(|(name, t)| TimingSummary {
            name: *name,
            calls: t.calls,
            total_ms: t.total.as_secs_f64() * 1000.0,
            max_ms: t.max.as_secs_f64() * 1000.0,
        })
        .collect()
}

/// Open (or, with `None`, close) the event log.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn set_debug_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut state = state();
    state.log = None;
    if let Some(path) = path {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "live-preview render debug log start")?;
        writer.flush()?;
        state.log = Some(EventLog {
            start: Instant::now(),
            writer,
        });
    }
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    state().log.is_some()
}

/// Append one event line to the log, if open. Write failures are ignored.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut state = state();
    let Some(log) = state.log.as_mut() else {
        return;
    };
    let elapsed_ms = log.start.elapsed().as_secs_f64() * 1000.0;
    let _ = writeln!(log.writer, "[{elapsed_ms:>10.3} ms] {name}: {}", detail.as_ref());
    let _ = log.writer.flush();
}
