//! `{@link ...}` markup rewriting for persisted descriptions.

use std::borrow::Cow;

use regex::{Captures, Regex};

use super::StorageError;

/// Rewrites inline link markup into anchors rooted at a base URL.
///
/// Three forms are recognised:
/// - `{@link a.b.C}` renders the target as its own label
/// - `{@link a.b.C|label}` and `{@link a.b.C label}` use the given label
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    base: String,
    pattern: Regex,
}

impl LinkRewriter {
    /// `base` is prefixed to every target with a single `/`; an empty base leaves targets relative.
    pub fn new(base: Option<&str>) -> Result<Self, StorageError> {
        let pattern = Regex::new(r"\{@link\s+([^\s|}]+)(?:\s*\|\s*([^}]*?)|\s+([^}]*?))?\s*\}")
            .map_err(|e| StorageError::LinkPattern {
                message: e.to_string(),
            })?;
        Ok(LinkRewriter {
            base: base.unwrap_or("").trim_end_matches('/').to_string(),
            pattern,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn href(&self, target: &str) -> String {
        if self.base.is_empty() {
            target.to_string()
        } else {
            format!("{}/{}", self.base, target)
        }
    }

    /// Rewrite every link in `text`. Text without markup is returned borrowed.
    pub fn rewrite<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, |caps: &Captures<'_>| {
            let target = &caps[1];
            let label = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim())
                .filter(|label| !label.is_empty())
                .unwrap_or(target);
            format!("<a href=\"{}\">{}</a>", self.href(target), label)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> LinkRewriter {
        LinkRewriter::new(Some("https://docs.example.com/api/")).unwrap()
    }

    #[test]
    fn bare_link_uses_target_as_label() {
        assert_eq!(
            rewriter().rewrite("See {@link plat.App}."),
            "See <a href=\"https://docs.example.com/api/plat.App\">plat.App</a>."
        );
    }

    #[test]
    fn pipe_and_space_labels() {
        let r = rewriter();
        assert_eq!(
            r.rewrite("{@link plat.App|the app}"),
            "<a href=\"https://docs.example.com/api/plat.App\">the app</a>"
        );
        assert_eq!(
            r.rewrite("{@link plat.App the app}"),
            "<a href=\"https://docs.example.com/api/plat.App\">the app</a>"
        );
    }

    #[test]
    fn several_links_in_one_text() {
        let out = rewriter().rewrite("{@link a.B} and {@link a.C|C}");
        assert_eq!(out.matches("<a href=").count(), 2);
        assert!(out.contains(">C</a>"));
    }

    #[test]
    fn plain_text_is_borrowed() {
        let out = rewriter().rewrite("no links here");
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn missing_base_keeps_targets_relative() {
        let r = LinkRewriter::new(None).unwrap();
        assert_eq!(r.rewrite("{@link a.B}"), "<a href=\"a.B\">a.B</a>");
    }
}
