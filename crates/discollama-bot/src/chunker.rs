//! Splits generated text into Discord-sized messages

/// Discord rejects message content longer than this many characters
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Split `text` into consecutive chunks of at most `limit` characters.
///
/// Splitting is fixed-width with no attempt to find word boundaries, so the
/// chunk count is always `ceil(chars / limit)`. Text that already fits comes
/// back as a single chunk (including the empty string). A zero limit yields
/// nothing. Widths are counted in `char`s so no chunk ends mid-codepoint.
pub fn chunk_text(text: &str, limit: usize) -> Chunks<'_> {
    Chunks {
        remaining: text,
        limit,
        emitted: false,
    }
}

/// Iterator returned by [`chunk_text`]
#[derive(Debug)]
pub struct Chunks<'a> {
    remaining: &'a str,
    limit: usize,
    emitted: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.limit == 0 {
            return None;
        }
        if self.remaining.is_empty() {
            if self.emitted {
                return None;
            }
            self.emitted = true;
            return Some("");
        }

        let end = self
            .remaining
            .char_indices()
            .nth(self.limit)
            .map_or(self.remaining.len(), |(i, _)| i);
        let (head, tail) = self.remaining.split_at(end);
        self.remaining = tail;
        self.emitted = true;
        Some(head)
    }
}
