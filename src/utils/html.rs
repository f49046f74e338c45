use ammonia;

/// Render a stored comment body as HTML using the ammonia library.
///
/// Whitelist-based: safe inline tags (like <b>, <em>) survive while
/// <script>, <iframe> and event-handler attributes are stripped. Bare `<`,
/// `>` and `&` come back entity-escaped. Bodies are stored as submitted, so
/// this runs on output only.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(clean_html("Hello world"), "Hello world");
    }

    #[test]
    fn bare_markup_characters_are_escaped() {
        assert_eq!(clean_html("Tom & Jerry <3"), "Tom &amp; Jerry &lt;3");
    }

    #[test]
    fn scripts_are_removed() {
        assert_eq!(clean_html("nice<script>alert(1)</script> post"), "nice post");
    }
}
