//! Word-respecting text splitting used to keep prompts under a size budget.

/// Split `text` into chunks of at most `budget` characters, never breaking a word.
///
/// Words are accumulated greedily; a word that would push the running length
/// (counting one joining space per word) past the budget starts a new chunk.
/// A single word longer than the budget becomes its own oversized chunk.
/// Original whitespace is not preserved: chunks are words joined by single spaces.
pub fn chunk(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len + word_len + 1 > budget {
            if !current.is_empty() {
                chunks.push(current.join(" "));
            }
            current = vec![word];
            current_len = word_len;
        } else {
            current.push(word);
            current_len += word_len + 1;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}
