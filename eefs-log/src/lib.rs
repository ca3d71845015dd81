//! Diagnostic-only logging for the engine. Nothing in `eefs-core` depends on a log line
//! actually reaching anywhere; `log!` is a cold path used for `ChkDsk`-style dumps and
//! operational tracing. The host installs a sink once at startup; until then, messages are
//! silently dropped.

#![no_std]

use core::fmt;

use spin::Mutex;

/// A destination for log output. Implementations are expected to be cheap and
/// non-blocking-ish (the global lock in this crate is held for the duration of a write).
pub trait LogSink: Sync {
    fn write_str(&self, s: &str);
}

struct NullSink;

impl LogSink for NullSink {
    fn write_str(&self, _s: &str) {}
}

static NULL_SINK: NullSink = NullSink;
static SINK: Mutex<&'static dyn LogSink> = Mutex::new(&NULL_SINK);

/// Installs the sink log output is written to. Call once during host startup; later calls
/// simply replace the sink.
pub fn set_sink(sink: &'static dyn LogSink) {
    *SINK.lock() = sink;
}

#[doc(hidden)]
pub fn _log(args: fmt::Arguments) {
    struct Adapter<'a>(&'a dyn LogSink);

    impl fmt::Write for Adapter<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0.write_str(s);
            Ok(())
        }
    }

    use fmt::Write;
    let sink = *SINK.lock();
    let _ = Adapter(sink).write_fmt(args);
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        $crate::_log(format_args!("{} - line {}, {}\n", file!(), line!(), format_args!($($arg)*)))
    };
}
