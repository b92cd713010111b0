//! The simulated embedding page: a host window that writes posted steps to
//! stdout and a status area that logs rendered fragments.

use posbridge_core::channel::{HostWindow, HostWindowError};
use posbridge_core::ui::{StatusFragment, UiAdapter};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// One posted step as written to the output stream.
#[derive(Serialize)]
struct PostedStep<'a> {
    target_origin: &'a str,
    message: &'a Value,
}

/// Host window that serializes each posted step as one JSON line.
pub struct ConsoleWindow<W> {
    out: Mutex<W>,
    embedded: bool,
}

impl ConsoleWindow<std::io::Stdout> {
    pub fn stdout(embedded: bool) -> Self {
        Self::new(std::io::stdout(), embedded)
    }
}

impl<W: Write + Send> ConsoleWindow<W> {
    pub fn new(out: W, embedded: bool) -> Self {
        Self {
            out: Mutex::new(out),
            embedded,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> HostWindow for ConsoleWindow<W> {
    fn post_message(&self, message: &str, target_origin: &str) -> Result<(), HostWindowError> {
        let message: Value =
            serde_json::from_str(message).map_err(|e| HostWindowError(e.to_string()))?;
        let line = serde_json::to_string(&PostedStep {
            target_origin,
            message: &message,
        })
        .map_err(|e| HostWindowError(e.to_string()))?;

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| HostWindowError(e.to_string()))
    }

    fn is_embedded(&self) -> bool {
        self.embedded
    }
}

/// Status area that logs fragments, rendering them from template files when
/// a template directory is configured.
pub struct LogUi {
    templates_dir: Option<PathBuf>,
}

impl LogUi {
    pub fn new(templates_dir: Option<PathBuf>) -> Self {
        Self { templates_dir }
    }

    fn render(&self, fragment: &StatusFragment) -> Option<String> {
        let path = self.templates_dir.as_ref()?.join(fragment.template());
        match std::fs::read_to_string(&path) {
            Ok(body) => Some(fragment.render(&body)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read status template");
                None
            }
        }
    }
}

impl UiAdapter for LogUi {
    fn show_status(&self, fragment: &StatusFragment) {
        match self.render(fragment) {
            Some(html) => info!(template = fragment.template(), html = %html, "Status"),
            None => info!(fragment = ?fragment, "Status"),
        }
    }

    fn clear_status(&self) {
        debug!("Status cleared");
    }

    fn set_outcomes_visible(&self, visible: bool) {
        info!(visible = visible, "Outcome buttons");
    }
}
