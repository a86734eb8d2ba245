//! Splitting long text across several embeds.

use pinwheel_core::Embed;

/// Chunk length used when the caller passes zero or a negative length.
pub const DEFAULT_CHUNK_LEN: usize = 2048;

/// Splits `text` into embeds whose descriptions hold at most `chunk_len`
/// characters each.
///
/// A `chunk_len` of zero or less falls back to [`DEFAULT_CHUNK_LEN`]. Chunks
/// are taken in order and never split a character; the last chunk holds
/// whatever remains. Empty text yields no embeds.
///
/// ```rust
/// use pinwheel_widget::embeds_from_text;
///
/// let embeds = embeds_from_text("abcde", 2);
/// let parts: Vec<_> = embeds
///     .iter()
///     .map(|e| e.description.as_deref().unwrap())
///     .collect();
/// assert_eq!(parts, ["ab", "cd", "e"]);
/// ```
pub fn embeds_from_text(text: &str, chunk_len: isize) -> Vec<Embed> {
    let chunk_len = usize::try_from(chunk_len)
        .ok()
        .filter(|len| *len > 0)
        .unwrap_or(DEFAULT_CHUNK_LEN);

    split_chars(text, chunk_len)
        .map(|chunk| Embed::new().description(chunk))
        .collect()
}

fn split_chars(text: &str, chunk_len: usize) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(chunk_len)
            .map_or(rest.len(), |(idx, _)| idx);
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptions(embeds: &[Embed]) -> Vec<String> {
        embeds
            .iter()
            .map(|e| e.description.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_concatenation_reproduces_text() {
        let text = "The quick brown fox jumps over the lazy dog";
        for len in 1..=text.len() + 1 {
            let chunks = descriptions(&embeds_from_text(text, len as isize));
            assert_eq!(chunks.concat(), text, "chunk_len {len}");
            assert!(chunks.iter().all(|c| c.chars().count() <= len));
            assert_eq!(chunks.len(), text.len().div_ceil(len));
        }
    }

    #[test]
    fn test_non_positive_len_uses_default() {
        let text = "x".repeat(5000);
        let default = descriptions(&embeds_from_text(&text, 2048));
        assert_eq!(descriptions(&embeds_from_text(&text, 0)), default);
        assert_eq!(descriptions(&embeds_from_text(&text, -3)), default);
        assert_eq!(default.len(), 3);
        assert_eq!(default[2].len(), 5000 - 2 * 2048);
    }

    #[test]
    fn test_slightly_over_one_chunk_keeps_tail() {
        let text = "y".repeat(2049);
        let chunks = descriptions(&embeds_from_text(&text, 0));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "y");
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let text = "héllo wörld 👍👍";
        let chunks = descriptions(&embeds_from_text(text, 3));
        assert_eq!(chunks.concat(), text);
        assert_eq!(chunks[0], "hél");
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[4], "👍👍");
    }

    #[test]
    fn test_empty_text() {
        assert!(embeds_from_text("", 10).is_empty());
    }
}
