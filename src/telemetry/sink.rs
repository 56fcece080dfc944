use std::sync::{Arc, Mutex, MutexGuard, OnceLock, atomic::{AtomicBool, AtomicUsize, Ordering}};

use anyhow::Result;

use crate::output::config::OutputConfig;
use crate::output::Emitter;
use crate::output::types::Envelope;

pub trait OutputSink: Send + Sync {
    fn on_plan(&self, env: &Envelope) -> Result<()>;
    fn on_result(&self, env: &Envelope) -> Result<()>;
}

/// Writes envelopes to stdout, only when `--json` is on.
#[derive(Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn on_plan(&self, env: &Envelope) -> Result<()> {
        if stdout_disabled() || !super::config::json_mode() {
            return Ok(());
        }
        emit_to_stdout(env)
    }

    fn on_result(&self, env: &Envelope) -> Result<()> {
        if stdout_disabled() || !super::config::json_mode() {
            return Ok(());
        }
        emit_to_stdout(env)
    }
}

fn emit_to_stdout(env: &Envelope) -> Result<()> {
    let cfg = OutputConfig::from_env();
    let emitter = Emitter::from_env(cfg);
    emitter.emit(env).map_err(anyhow::Error::from)
}

type DynSink = Arc<dyn OutputSink>;

fn sink_slot() -> &'static Mutex<DynSink> {
    static SINK: OnceLock<Mutex<DynSink>> = OnceLock::new();
    SINK.get_or_init(|| Mutex::new(Arc::new(StdoutSink) as DynSink))
}

// a panic while swapping sinks leaves a valid Arc behind
fn lock_slot() -> MutexGuard<'static, DynSink> {
    sink_slot().lock().unwrap_or_else(|p| p.into_inner())
}

pub fn current_sink() -> DynSink {
    lock_slot().clone()
}

pub struct SinkGuard {
    previous: DynSink,
}

/// Route envelopes to `new_sink` until the guard drops. Stdout stays quiet
/// while any guard is alive.
pub fn install_sink(new_sink: DynSink) -> SinkGuard {
    let mut guard = lock_slot();
    let previous = guard.clone();
    *guard = new_sink;
    let prev = stdout_disable_counter().fetch_add(1, Ordering::SeqCst);
    if prev == 0 {
        stdout_disabled_flag().store(true, Ordering::SeqCst);
    }
    SinkGuard { previous }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        let mut guard = lock_slot();
        *guard = self.previous.clone();
        if stdout_disable_counter().fetch_sub(1, Ordering::SeqCst) == 1 {
            stdout_disabled_flag().store(false, Ordering::SeqCst);
        }
    }
}

fn stdout_disable_counter() -> &'static AtomicUsize {
    static COUNTER: OnceLock<AtomicUsize> = OnceLock::new();
    COUNTER.get_or_init(|| AtomicUsize::new(0))
}

fn stdout_disabled_flag() -> &'static AtomicBool {
    static FLAG: OnceLock<AtomicBool> = OnceLock::new();
    FLAG.get_or_init(|| AtomicBool::new(false))
}

fn stdout_disabled() -> bool {
    stdout_disabled_flag().load(Ordering::SeqCst)
}
