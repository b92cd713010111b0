//! Status fragments shown to the cashier and the UI seam that renders them.

/// Placeholder for the lower-cased gateway status in a template body.
const STATUS_PLACEHOLDER: &str = "${response.status}";
/// Placeholder for the gateway message in a template body.
const MESSAGE_PLACEHOLDER: &str = "${response.message}";

/// A status-area fragment.
///
/// Each variant maps to one static template; the declined and failed
/// templates carry the gateway status and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFragment {
    /// Idle page, waiting for the cashier to choose an outcome.
    Waiting,
    /// Tap, insert or swipe prompt while the attempt runs.
    Payment,
    Cancelling,
    Declined { status: String, message: String },
    Failed { status: String, message: String },
    Timeout,
}

impl StatusFragment {
    /// A failure fragment with no gateway detail.
    pub fn generic_failure() -> Self {
        StatusFragment::Failed {
            status: String::new(),
            message: String::new(),
        }
    }

    /// File name of the template backing this fragment.
    pub fn template(&self) -> &'static str {
        match self {
            StatusFragment::Waiting => "waiting.html",
            StatusFragment::Payment => "payment.html",
            StatusFragment::Cancelling => "cancelling.html",
            StatusFragment::Declined { .. } => "declined.html",
            StatusFragment::Failed { .. } => "failed.html",
            StatusFragment::Timeout => "timeout.html",
        }
    }

    /// Substitute the fragment's status and message into a template body.
    ///
    /// Only the first occurrence of each placeholder is replaced. Fragments
    /// without gateway detail return the body unchanged.
    pub fn render(&self, template_body: &str) -> String {
        match self {
            StatusFragment::Declined { status, message }
            | StatusFragment::Failed { status, message } => template_body
                .replacen(STATUS_PLACEHOLDER, &escape_html(status), 1)
                .replacen(MESSAGE_PLACEHOLDER, &escape_html(message), 1),
            _ => template_body.to_owned(),
        }
    }
}

/// The page around the bridge: status area and outcome buttons.
///
/// Implementations render fragments however the embedding page does it; the
/// coordinator only decides which fragment is current.
pub trait UiAdapter: Send + Sync {
    /// Replace the status area with `fragment`.
    fn show_status(&self, fragment: &StatusFragment);

    /// Empty the status area.
    fn clear_status(&self);

    fn set_outcomes_visible(&self, visible: bool);
}

/// Escape text for inclusion in receipt or status HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_status_and_message() {
        let body = "<p>Payment ${response.status}: ${response.message}</p>";
        let fragment = StatusFragment::Declined {
            status: "declined".to_string(),
            message: "insufficient funds".to_string(),
        };
        assert_eq!(
            fragment.render(body),
            "<p>Payment declined: insufficient funds</p>"
        );
        assert_eq!(fragment.template(), "declined.html");
    }

    #[test]
    fn test_render_leaves_plain_templates_alone() {
        let body = "<div class=\"loader\"></div>";
        assert_eq!(StatusFragment::Cancelling.render(body), body);
        assert_eq!(StatusFragment::Timeout.template(), "timeout.html");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }
}
