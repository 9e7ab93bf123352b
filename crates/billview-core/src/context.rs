pub const CONTEXT_START: &str = "=== FULL BILL TEXT START ===";
pub const CONTEXT_END: &str = "=== FULL BILL TEXT END ===";

/// Wraps the document text in the markers the chat endpoint looks for.
pub fn chat_context(text: &str) -> String {
    format!("\n\n{}\n{}\n{}", CONTEXT_START, text, CONTEXT_END)
}

#[cfg(test)]
mod tests {
    use super::chat_context;

    #[test]
    fn text_is_fenced_by_markers() {
        assert_eq!(
            chat_context("SEC. 1"),
            "\n\n=== FULL BILL TEXT START ===\nSEC. 1\n=== FULL BILL TEXT END ==="
        );
    }
}
