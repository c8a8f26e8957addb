use std::io::{BufWriter, Stdout, Write};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use once_cell::sync::{Lazy, OnceCell};

use crate::core::support::simulation_time::SimulationTime;
use crate::core::worker::{RunId, Worker};
use crate::utility::time::TimeParts;

static SIM_LOGGER: Lazy<SimLogger> = Lazy::new(SimLogger::new);

/// Initialize the simulator's logger.
pub fn init(max_log_level: LevelFilter, log_errors_to_stderr: bool) -> Result<(), SetLoggerError> {
    SIM_LOGGER.set_max_level(max_log_level);
    SIM_LOGGER.set_log_errors_to_stderr(log_errors_to_stderr);

    log::set_logger(&*SIM_LOGGER)?;
    log::set_max_level(max_log_level);

    // Arrange to flush the logger on panic.
    let default_panic_handler = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        SIM_LOGGER.flush();
        default_panic_handler(panic_info);
    }));

    Ok(())
}

/// When disabled, every record is flushed to stdout as soon as it's logged.
pub fn set_buffering_enabled(buffering_enabled: bool) {
    SIM_LOGGER.set_buffering_enabled(buffering_enabled);
}

/// A logger that attaches simulation context (the active run and its simulation time) to log
/// entries. Records from all threads share one buffered stdout writer.
pub struct SimLogger {
    stdout: Mutex<BufWriter<Stdout>>,

    buffering_enabled: RwLock<bool>,

    // The maximum log level.
    max_log_level: OnceCell<LevelFilter>,

    // Whether to log errors to stderr in addition to stdout.
    log_errors_to_stderr: OnceCell<bool>,

    start: Instant,
}

impl SimLogger {
    fn new() -> SimLogger {
        SimLogger {
            stdout: Mutex::new(BufWriter::new(std::io::stdout())),
            buffering_enabled: RwLock::new(false),
            max_log_level: OnceCell::new(),
            log_errors_to_stderr: OnceCell::new(),
            start: Instant::now(),
        }
    }

    pub fn set_buffering_enabled(&self, buffering_enabled: bool) {
        let mut writer = self.buffering_enabled.write().unwrap();
        *writer = buffering_enabled;
    }

    /// If the maximum log level has not yet been set, returns `LevelFilter::Trace`.
    pub fn max_level(&self) -> LevelFilter {
        self.max_log_level
            .get()
            .copied()
            .unwrap_or(LevelFilter::Trace)
    }

    /// Is only intended to be called from `init()`. Will panic if called more than once.
    fn set_max_level(&self, level: LevelFilter) {
        self.max_log_level.set(level).unwrap()
    }

    /// Is only intended to be called from `init()`. Will panic if called more than once.
    fn set_log_errors_to_stderr(&self, val: bool) {
        self.log_errors_to_stderr.set(val).unwrap()
    }

    fn write_record(&self, record: &SimLogRecord) -> std::io::Result<()> {
        let line = record.to_string();

        let mut stdout = self.stdout.lock().unwrap();
        stdout.write_all(line.as_bytes())?;

        if record.level <= Level::Error {
            if self.log_errors_to_stderr.get().copied().unwrap_or(false) {
                std::io::stderr().lock().write_all(line.as_bytes())?;
            }
            // we're likely about to exit one way or another
            stdout.flush()?;
        } else if !*self.buffering_enabled.read().unwrap() {
            stdout.flush()?;
        }

        Ok(())
    }
}

impl Log for SimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let record = SimLogRecord {
            level: record.level(),
            file: record.file(),
            module_path: record.module_path(),
            line: record.line(),
            message: std::fmt::format(*record.args()),
            wall_time: self.start.elapsed(),
            sim_time: Worker::current_time(),
            thread_name: std::thread::current().name().map(str::to_string),
            run: Worker::active_run(),
        };

        self.write_record(&record).unwrap_or_else(|e| {
            // there's nowhere else to report this
            eprintln!("WARNING: Couldn't write log record: {e}");
        });
    }

    fn flush(&self) {
        if let Ok(mut stdout) = self.stdout.lock() {
            stdout.flush().ok();
        }
    }
}

struct SimLogRecord<'a> {
    level: Level,
    file: Option<&'a str>,
    module_path: Option<&'a str>,
    line: Option<u32>,
    message: String,
    wall_time: Duration,

    sim_time: Option<SimulationTime>,
    thread_name: Option<String>,
    run: Option<RunId>,
}

impl std::fmt::Display for SimLogRecord<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", TimeParts::from_micros(self.wall_time.as_micros()))?;
        write!(
            f,
            " [{}]",
            self.thread_name.as_deref().unwrap_or("unnamed")
        )?;
        match self.sim_time {
            Some(t) => write!(f, " {t}")?,
            None => write!(f, " n/a")?,
        }
        write!(f, " [{level}]", level = self.level)?;
        match self.run {
            Some(RunId(run)) => write!(f, " [run {run}]")?,
            None => write!(f, " [n/a]")?,
        }
        write!(
            f,
            " [{file}:",
            file = self
                .file
                .map(|f| if let Some(sep_pos) = f.rfind('/') {
                    &f[(sep_pos + 1)..]
                } else {
                    f
                })
                .unwrap_or("n/a"),
        )?;
        if let Some(line) = self.line {
            write!(f, "{line}")?;
        } else {
            write!(f, "n/a")?;
        }
        writeln!(
            f,
            "] [{module}] {msg}",
            module = self.module_path.unwrap_or("n/a"),
            msg = self.message
        )
    }
}
