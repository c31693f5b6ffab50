//! Terminal styling for compatibility verdicts, rule traces and diagnostics.
//!
//! Whether to colour is decided once at startup by [`configure_color`];
//! everything painted afterwards follows that choice.

use lazy_static::lazy_static;
use nu_ansi_term::{Color, Style};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cli::ColorMode;
use crate::resolver::Verdict;

lazy_static! {
    static ref COMPATIBLE: Style = Color::Green.bold();
    static ref NOT_COMPATIBLE: Style = Color::Red.bold();
    static ref SELECTED_RULE: Style = Color::Green.bold();
    static ref SKIPPED_RULE: Style = Color::DarkGray.normal();
    static ref ERROR_LABEL: Style = Color::Red.bold();
    static ref WARNING_LABEL: Style = Color::Yellow.bold();
    static ref DIAGNOSTIC_TEXT: Style = Color::Default.bold();
}

static USE_COLOR: AtomicBool = AtomicBool::new(true);

pub(crate) fn configure_color(mode: ColorMode) {
    USE_COLOR.store(matches!(mode, ColorMode::On), Ordering::Relaxed);
}

fn paint_if(enabled: bool, style: Style, text: &str) -> String {
    if enabled {
        style.paint(text).to_string()
    } else {
        text.to_string()
    }
}

/// `text` in `style`, or unchanged when colour is off.
pub(crate) fn paint(style: Style, text: &str) -> String {
    paint_if(USE_COLOR.load(Ordering::Relaxed), style, text)
}

/// The label of a `check` result, painted.
pub(crate) fn compatibility_label(compatible: bool) -> String {
    if compatible {
        paint(*COMPATIBLE, "compatible:")
    } else {
        paint(*NOT_COMPATIBLE, "not compatible:")
    }
}

/// Row style for a rule in a trace. Rules that were evaluated and did not
/// match stay plain.
pub(crate) fn verdict_style(verdict: Verdict) -> Option<Style> {
    match verdict {
        Verdict::Selected => Some(*SELECTED_RULE),
        Verdict::Shadowed | Verdict::Disabled => Some(*SKIPPED_RULE),
        Verdict::NoMatch => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Diagnostic {
    Error,
    Warning,
}

impl Diagnostic {
    fn label(self) -> (&'static str, Style) {
        match self {
            Diagnostic::Error => ("error:", *ERROR_LABEL),
            Diagnostic::Warning => ("warning:", *WARNING_LABEL),
        }
    }

    /// The line written to stderr for `message`.
    pub(crate) fn line(self, message: &str) -> String {
        let (label, style) = self.label();

        format!("{} {}", paint(style, label), paint(*DIAGNOSTIC_TEXT, message))
    }
}
