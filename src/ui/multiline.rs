//! Multi-line terminal reporter
//!
//! Gives each concurrent pipeline an isolated row of a shared terminal
//! region. Allocation prints `count` blank lines up front so every later
//! update is a cursor-relative move within an already-rendered region:
//! move up to the owning row, clear it, write, move back down. The whole
//! sequence runs under one mutex because cursor position is a single
//! shared resource; callers format their strings before calling in.
//!
//! When the output is not a terminal (or cursor control is disabled),
//! every write degrades to appending a plain line.

use std::io::{Stdout, Write, stdout};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::{
    QueueableCommand,
    cursor::{MoveDown, MoveToColumn, MoveUp},
    style::Stylize,
    terminal::{Clear, ClearType},
    tty::IsTty,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Inner {
    out: Box<dyn Write + Send>,
    prefixes: Vec<String>,
}

/// A fixed region of terminal rows, one per concurrent pipeline.
///
/// Line indices are assigned at allocation and equal request order, so
/// interleaved completion never reorders which row belongs to which
/// package.
pub struct MultiReporter {
    count: usize,
    ansi: bool,
    inner: Mutex<Inner>,
}

impl MultiReporter {
    /// Reserve `count` rows on stdout, probing once whether cursor
    /// control sequences are safe to emit.
    pub fn allocate(count: usize) -> Arc<Self> {
        let ansi = stdout().is_tty();
        Self::with_writer(count, Box::new(LockingStdout(stdout())), ansi)
    }

    /// Reserve `count` rows on an arbitrary writer. Tests pass an
    /// in-memory buffer here; `ansi` forces or suppresses cursor control.
    pub fn with_writer(count: usize, mut out: Box<dyn Write + Send>, ansi: bool) -> Arc<Self> {
        for _ in 0..count {
            let _ = writeln!(out);
        }
        let _ = out.flush();
        Arc::new(Self {
            count,
            ansi,
            inner: Mutex::new(Inner {
                out,
                prefixes: vec![String::new(); count],
            }),
        })
    }

    /// Number of rows in the region
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether cursor control sequences are being emitted
    pub fn is_ansi(&self) -> bool {
        self.ansi
    }

    /// Set a persistent prefix prepended to all subsequent writes on a
    /// line (e.g. a stable `[name]` tag before dynamic progress text).
    pub fn set_prefix(&self, index: usize, prefix: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.prefixes.get_mut(index) {
            *slot = prefix.to_string();
        }
    }

    /// Overwrite line `index` with `msg` (or append a plain line when
    /// cursor control is unavailable).
    pub fn print(&self, index: usize, msg: &str) {
        if index >= self.count {
            return;
        }
        // The lock covers the full move-clear-write-restore sequence so
        // two lines can never interleave their escape sequences.
        let mut inner = self.inner.lock().unwrap();
        let prefix = inner.prefixes[index].clone();
        let rows = (self.count - index) as u16;

        if self.ansi {
            let _ = inner.out.queue(MoveUp(rows));
            let _ = inner.out.queue(MoveToColumn(0));
            let _ = inner.out.queue(Clear(ClearType::CurrentLine));
            let _ = write!(inner.out, "{prefix}{msg}");
            let _ = inner.out.queue(MoveDown(rows));
            let _ = inner.out.queue(MoveToColumn(0));
        } else {
            let _ = writeln!(inner.out, "{prefix}{msg}");
        }
        let _ = inner.out.flush();
    }

    /// `print` with the message styled as a success, tty permitting
    pub fn print_ok(&self, index: usize, msg: &str) {
        if self.ansi {
            self.print(index, &format!("{}", msg.green()));
        } else {
            self.print(index, msg);
        }
    }

    /// `print` with the message styled as an error, tty permitting
    pub fn print_err(&self, index: usize, msg: &str) {
        if self.ansi {
            self.print(index, &format!("{}", msg.red()));
        } else {
            self.print(index, msg);
        }
    }

    /// Heartbeat for a long step with no finer-grained progress: every
    /// `millis`, rewrite the line as `text` plus a growing run of dots.
    /// Stops the instant `done` fires. In plain (non-ansi) mode the ticks
    /// stay silent and exactly one final line is written on completion;
    /// in ansi mode the last animated frame is left in place.
    pub fn print_until_done(
        self: Arc<Self>,
        index: usize,
        text: String,
        done: oneshot::Receiver<()>,
        millis: u64,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut done = done;
            let mut dots = 0usize;
            let mut tick = tokio::time::interval(Duration::from_millis(millis));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut done => {
                        if !self.ansi {
                            self.print(index, &text);
                        }
                        return;
                    }
                    _ = tick.tick() => {
                        if self.ansi {
                            let trail = ".".repeat(dots);
                            self.print(index, &format!("{text} {}", trail.dark_grey()));
                        }
                        dots += 1;
                    }
                }
            }
        })
    }
}

/// Stdout wrapper that takes the stream lock per write, keeping reporter
/// output whole even if something else prints concurrently.
struct LockingStdout(Stdout);

impl Write for LockingStdout {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}
