//! Plain-text transcript rendering with word wrapping.

use proto::{RenderError, Role};
use unicode_width::UnicodeWidthStr;

/// Columns reserved around message bodies.
const WRAP_MARGIN: usize = 4;

/// Labels and layout passed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderStyle {
    pub user_label: String,
    pub assistant_label: String,
    pub system_label: String,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            user_label: "User: ".to_string(),
            assistant_label: "Assistant: ".to_string(),
            system_label: "System: ".to_string(),
        }
    }
}

impl RenderStyle {
    pub fn label(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user_label,
            Role::Assistant => &self.assistant_label,
            Role::System => &self.system_label,
        }
    }
}

/// Renders one message as `label` followed by its wrapped body.
///
/// When the body cannot be wrapped the raw content is used instead.
pub fn render_message(style: &RenderStyle, role: Role, content: &str, width: usize) -> String {
    let body = match wrap(content, width.saturating_sub(WRAP_MARGIN)) {
        Ok(body) => body,
        Err(e) => {
            tracing::trace!(error = %e, "Rendering raw message text");
            content.to_string()
        }
    };

    let mut out = String::with_capacity(style.label(role).len() + body.len() + 1);
    out.push_str(style.label(role));
    out.push_str(&body);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Greedy word wrap to `width` display columns; words wider than a line are split.
pub fn wrap(text: &str, width: usize) -> Result<String, RenderError> {
    if width == 0 {
        return Err(RenderError::WidthTooSmall(width));
    }

    let mut out = String::with_capacity(text.len());
    for (i, paragraph) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        wrap_paragraph(paragraph, width, &mut out);
    }
    Ok(out)
}

fn wrap_paragraph(paragraph: &str, width: usize, out: &mut String) {
    let mut column = 0;
    for word in paragraph.split(' ') {
        let word_width = word.width();
        if column > 0 && column + 1 + word_width > width {
            out.push('\n');
            column = 0;
        } else if column > 0 {
            out.push(' ');
            column += 1;
        }

        if word_width <= width {
            out.push_str(word);
            column += word_width;
            continue;
        }

        for ch in word.chars() {
            let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
            if column > 0 && column + ch_width > width {
                out.push('\n');
                column = 0;
            }
            out.push(ch);
            column += ch_width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let wrapped = wrap("the quick brown fox", 10).expect("wrap");
        assert_eq!(wrapped, "the quick\nbrown fox");
    }

    #[test]
    fn wrap_keeps_existing_newlines() {
        let wrapped = wrap("one\ntwo three", 20).expect("wrap");
        assert_eq!(wrapped, "one\ntwo three");
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let wrapped = wrap("abcdefgh", 3).expect("wrap");
        assert_eq!(wrapped, "abc\ndef\ngh");
    }

    #[test]
    fn wrap_counts_wide_characters_by_display_width() {
        let wrapped = wrap("日本語 テキスト", 6).expect("wrap");
        assert_eq!(wrapped, "日本語\nテキス\nト");
    }

    #[test]
    fn zero_width_is_an_error() {
        assert_eq!(wrap("hi", 0), Err(RenderError::WidthTooSmall(0)));
    }

    #[test]
    fn narrow_viewport_falls_back_to_raw_text() {
        let style = RenderStyle::default();
        let rendered = render_message(&style, Role::User, "hello world", 3);
        assert_eq!(rendered, "User: hello world\n");
    }

    #[test]
    fn render_uses_configured_labels() {
        let style = RenderStyle {
            user_label: "> ".to_string(),
            ..RenderStyle::default()
        };
        let rendered = render_message(&style, Role::User, "hello", 80);
        assert_eq!(rendered, "> hello\n");
    }
}
