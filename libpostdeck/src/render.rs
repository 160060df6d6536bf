//! Rendering a post into the text a publisher transmits

use crate::types::Post;

/// Render body, link and hashtags into the published text.
///
/// Layout is the trimmed body, then a blank line and the trimmed link (when
/// present), then a blank line and the hashtags joined by single spaces in
/// their original order. The whole result is trimmed and ends with exactly
/// one newline.
///
/// ```
/// use libpostdeck::render::render_text;
///
/// let text = render_text(
///     "Hello world",
///     Some("http://x"),
///     &["#a".to_string(), "#b".to_string()],
/// );
/// assert_eq!(text, "Hello world\n\nhttp://x\n\n#a #b\n");
/// ```
pub fn render_text(body: &str, link_url: Option<&str>, hashtags: &[String]) -> String {
    let mut parts = vec![body.trim().to_string()];

    if let Some(link) = link_url.filter(|link| !link.is_empty()) {
        parts.push(String::new());
        parts.push(link.trim().to_string());
    }

    if !hashtags.is_empty() {
        parts.push(String::new());
        parts.push(
            hashtags
                .iter()
                .map(|tag| tag.trim())
                .filter(|tag| !tag.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        );
    }

    let mut text = parts.join("\n").trim().to_string();
    text.push('\n');
    text
}

/// Render a stored post
pub fn render_post(post: &Post) -> String {
    render_text(&post.body, post.link_url.as_deref(), &post.hashtags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewPost;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_render_full_layout() {
        let text = render_text("Hello world", Some("http://x"), &tags(&["#a", "#b"]));
        assert_eq!(text, "Hello world\n\nhttp://x\n\n#a #b\n");
    }

    #[test]
    fn test_render_body_only() {
        assert_eq!(render_text("  Just text \n", None, &[]), "Just text\n");
    }

    #[test]
    fn test_render_hashtags_without_link() {
        let text = render_text("Body", None, &tags(&[" #rust ", "#async"]));
        assert_eq!(text, "Body\n\n#rust #async\n");
    }

    #[test]
    fn test_render_link_is_trimmed() {
        let text = render_text("Body", Some("  https://example.com/a  "), &[]);
        assert_eq!(text, "Body\n\nhttps://example.com/a\n");
    }

    #[test]
    fn test_render_empty_link_is_skipped() {
        assert_eq!(render_text("Body", Some(""), &[]), "Body\n");
    }

    #[test]
    fn test_render_blank_tags_leave_no_trailing_whitespace() {
        let text = render_text("Body", None, &tags(&["  ", ""]));
        assert_eq!(text, "Body\n");
    }

    #[test]
    fn test_render_preserves_hashtag_order() {
        let text = render_text("B", None, &tags(&["#z", "#a", "#m"]));
        assert!(text.ends_with("#z #a #m\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let hashtags = tags(&["#one", "#two"]);
        let first = render_text("Same input", Some("https://x.test"), &hashtags);
        for _ in 0..5 {
            assert_eq!(render_text("Same input", Some("https://x.test"), &hashtags), first);
        }
    }

    #[test]
    fn test_render_post_uses_stored_fields() {
        let post = crate::types::Post::new(
            1,
            NewPost {
                link_url: Some("http://x".to_string()),
                hashtags: tags(&["#a", "#b"]),
                ..NewPost::with_body("Hello world")
            },
        );
        assert_eq!(render_post(&post), "Hello world\n\nhttp://x\n\n#a #b\n");
    }
}
