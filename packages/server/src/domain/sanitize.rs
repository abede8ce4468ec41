//! Markup stripping for inbound client text.
//!
//! The output is plain text: every tag, comment and declaration is removed
//! together with its attributes, the bodies of raw-text elements (`script`,
//! `style`, ...) are dropped, and the characters that could start markup are
//! entity-escaped. Running [`sanitize`] on its own output returns it unchanged.

use std::collections::HashSet;

use ammonia::Builder;

/// Elements whose body is never rendered as text.
const RAW_TEXT_ELEMENTS: [&str; 5] = ["script", "style", "textarea", "option", "noscript"];

/// Strip all markup from `input` and return the trimmed, escaped text.
pub fn sanitize(input: &str) -> String {
    Builder::empty()
        .clean_content_tags(HashSet::from(RAW_TEXT_ELEMENTS))
        .strip_comments(true)
        .clean(input)
        .to_string()
        .trim()
        .to_string()
}
