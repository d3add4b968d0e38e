use crate::overlay::font::TextMeasure;

/// Greedy word wrap against a pixel width.
///
/// Words are never split: a word wider than `max_width` becomes its own
/// line and the caller sees the overflow when it measures the result.
pub(crate) fn wrap_words<M: TextMeasure>(text: &str, font: &M, max_width: u32) -> Vec<String> {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = first.to_string();
    for word in words {
        let candidate = format!("{} {}", current, word);
        if font.measure(&candidate).width <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    lines.push(current);
    lines
}
