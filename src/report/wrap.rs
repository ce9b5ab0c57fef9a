//! Greedy word wrapping by character count

/// Wrap `text` into lines of at most `width` characters.
///
/// Whitespace runs collapse to single spaces. Words longer than a line are
/// split at character boundaries. Blank input yields no lines.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0usize;

    for word in text.split_whitespace() {
        let mut word = word;
        let mut word_len = word.chars().count();

        if line_len > 0 && line_len + 1 + word_len <= width {
            line.push(' ');
            line.push_str(word);
            line_len += 1 + word_len;
            continue;
        }

        if line_len > 0 {
            lines.push(std::mem::take(&mut line));
        }

        while word_len > width {
            let split = word
                .char_indices()
                .nth(width)
                .map_or(word.len(), |(i, _)| i);
            let (head, tail) = word.split_at(split);
            lines.push(head.to_string());
            word = tail;
            word_len -= width;
        }

        line.push_str(word);
        line_len = word_len;
    }

    if line_len > 0 {
        lines.push(line);
    }
    lines
}
