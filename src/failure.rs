//! # Failures and when two of them are "the same"
//!
//! A check signals failure by panicking. [`catch_failure`] runs a closure,
//! catches its panic without printing anything, and records what is needed
//! to compare it later: the payload kind, its message, where it was raised,
//! and optionally a backtrace.
//!
//! While shrinking, a candidate only counts as a witness if it fails *the same
//! way* as the original. How strict "the same" is depends on the caller; see
//! [`FailureComparison`] for the built-in levels and [`FailureEquivalence`]
//! for plugging in a custom policy.

use std::any::{Any, TypeId};
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// Source location a panic was raised at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Site {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A caught panic.
#[derive(Debug, Clone)]
pub struct Failure {
    kind: TypeId,
    message: Option<String>,
    site: Option<Site>,
    backtrace: Option<String>,
}

impl Failure {
    fn from_payload(payload: Box<dyn Any + Send>, site: Option<Site>, backtrace: Option<String>) -> Self {
        // `&str` and `String` payloads are the same kind of failure: a message.
        let (kind, message) = if let Some(msg) = payload.downcast_ref::<&str>() {
            (TypeId::of::<String>(), Some((*msg).to_owned()))
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            (TypeId::of::<String>(), Some(msg.clone()))
        } else {
            ((*payload).type_id(), None)
        };
        Failure {
            kind,
            message,
            site,
            backtrace,
        }
    }

    /// Type of the panic payload, with `&str` folded into `String`.
    pub fn kind(&self) -> TypeId {
        self.kind
    }

    /// The panic message, if the payload was a string.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn site(&self) -> Option<&Site> {
        self.site.as_ref()
    }

    /// Only captured when the active policy asks for it.
    pub fn backtrace(&self) -> Option<&str> {
        self.backtrace.as_deref()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.site {
            Some(site) => write!(f, "panicked at {}", site)?,
            None => f.write_str("panicked")?,
        }
        match &self.message {
            Some(message) => write!(f, ": {}", message),
            None => f.write_str(" with a non-string payload"),
        }
    }
}

/// Built-in failure equivalence levels. Each level checks everything the
/// previous one does, plus one more thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FailureComparison {
    /// Same payload type.
    SameKind,
    /// ... and the same message.
    SameMessage,
    /// ... and raised in the same source file.
    SameSiteIgnoringLine,
    /// ... and at the same file, line and column.
    #[default]
    SameSite,
    /// ... and with the same stack up to the point the panic was caught.
    SameBacktrace,
}

impl FailureComparison {
    pub fn matches(self, original: &Failure, candidate: &Failure) -> bool {
        use FailureComparison::*;

        if original.kind != candidate.kind {
            return false;
        }
        if self >= SameMessage && original.message != candidate.message {
            return false;
        }
        let file = |failure: &Failure| failure.site.as_ref().map(|site| site.file.clone());
        if self >= SameSiteIgnoringLine && file(original) != file(candidate) {
            return false;
        }
        if self >= SameSite && original.site != candidate.site {
            return false;
        }
        if self >= SameBacktrace && original.backtrace != candidate.backtrace {
            return false;
        }
        true
    }
}

/// Decides whether a candidate failure reproduces the original one.
pub trait FailureEquivalence {
    fn equivalent(&self, original: &Failure, candidate: &Failure) -> bool;

    /// Whether failures must carry a backtrace for this policy to decide.
    fn needs_backtrace(&self) -> bool {
        false
    }
}

impl FailureEquivalence for FailureComparison {
    fn equivalent(&self, original: &Failure, candidate: &Failure) -> bool {
        self.matches(original, candidate)
    }

    fn needs_backtrace(&self) -> bool {
        *self == FailureComparison::SameBacktrace
    }
}

impl<F> FailureEquivalence for F
where
    F: Fn(&Failure, &Failure) -> bool,
{
    fn equivalent(&self, original: &Failure, candidate: &Failure) -> bool {
        self(original, candidate)
    }
}

struct Capture {
    want_backtrace: bool,
    site: Option<Site>,
    backtrace: Option<String>,
}

thread_local! {
    static CAPTURE: RefCell<Option<Capture>> = RefCell::new(None);
}

static HOOK: Once = Once::new();

/// Installs, once per process, a panic hook that records panics raised
/// inside [`catch_failure`] on this thread and stays silent about them. Any
/// other panic goes to the hook that was installed before.
fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let captured = CAPTURE
                .try_with(|cell| {
                    let mut slot = match cell.try_borrow_mut() {
                        Ok(slot) => slot,
                        Err(_) => return false,
                    };
                    let capture = match slot.as_mut() {
                        Some(capture) => capture,
                        None => return false,
                    };
                    capture.site = info.location().map(|location| Site {
                        file: location.file().to_owned(),
                        line: location.line(),
                        column: location.column(),
                    });
                    if capture.want_backtrace {
                        let trace = Backtrace::force_capture().to_string();
                        capture.backtrace = Some(trim_backtrace(&trace));
                    }
                    true
                })
                .unwrap_or(false);
            if !captured {
                previous(info);
            }
        }));
    });
}

/// Cuts a rendered backtrace at the first frame of the unwinding machinery,
/// so only frames between the panic and the catch remain.
fn trim_backtrace(trace: &str) -> String {
    trace
        .lines()
        .take_while(|line| !line.contains("catch_unwind") && !line.contains("panicking::try"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs `f`, turning a panic into a [`Failure`]. The panic message is not
/// printed.
pub fn catch_failure<R>(capture_backtrace: bool, f: impl FnOnce() -> R) -> Result<R, Failure> {
    install_hook();
    let outer = CAPTURE.with(|cell| {
        cell.replace(Some(Capture {
            want_backtrace: capture_backtrace,
            site: None,
            backtrace: None,
        }))
    });
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    let capture = CAPTURE.with(|cell| cell.replace(outer));

    result.map_err(|payload| {
        let (site, backtrace) = match capture {
            Some(capture) => (capture.site, capture.backtrace),
            None => (None, None),
        };
        Failure::from_payload(payload, site, backtrace)
    })
}
