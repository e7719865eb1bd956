//! Append-only log of conversation turns.

use crate::state::Turn;

/// Ordered transcript; the single source of truth for what gets displayed.
///
/// Turns are never edited, removed or reordered once appended. Empty turns
/// may live here (an empty nudge still takes a slot) but [`Transcript::visible`]
/// never yields them.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Append a batch in the given order.
    pub fn append_many<I>(&mut self, turns: I)
    where
        I: IntoIterator<Item = Turn>,
    {
        self.turns.extend(turns);
    }

    /// Every stored turn, including empty ones.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns a renderer should show.
    pub fn visible(&self) -> impl Iterator<Item = &Turn> + '_ {
        self.turns.iter().filter(|turn| turn.is_displayable())
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Role;

    #[test]
    fn test_append_keeps_order_and_duplicates() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::user("hi"));
        transcript.append(Turn::user("hi"));
        transcript.append_many(vec![Turn::bot("a"), Turn::bot("b")]);

        let contents: Vec<&str> = transcript
            .snapshot()
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(contents, vec!["hi", "hi", "a", "b"]);
        assert_eq!(transcript.len(), 4);
    }

    #[test]
    fn test_visible_skips_empty_turns() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::user(""));
        transcript.append(Turn::bot("Welcome!"));
        transcript.append(Turn::user(""));

        assert_eq!(transcript.len(), 3);
        let visible: Vec<&Turn> = transcript.visible().collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].role, Role::Bot);
    }

    #[test]
    fn test_empty_transcript() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.visible().count(), 0);
    }
}
