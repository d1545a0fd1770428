//! Paragraph classification
//!
//! Maps paragraph text to a structural role and spots tables written as
//! plain text. Everything here is deterministic: the same text and the same
//! preceding context always give the same answer.

pub mod heading;
pub mod table_text;

use serde::{Deserialize, Serialize};

pub use heading::{classify_heading, classify_subheading};
pub use table_text::{TextGrid, detect_table_from_text, is_multiline};

/// How many preceding paragraph texts the classifier keeps
pub const RECENT_WINDOW: usize = 5;
/// Paragraphs after a heading that lean towards subheading
pub const HEADING_COOLDOWN: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Heading,
    Subheading,
    Body,
}

/// Rolling context for classifying one document, advanced once per paragraph
#[derive(Debug, Clone, Default)]
pub struct ClassificationState {
    recent: Vec<String>,
    cooldown: u8,
}

impl ClassificationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preceding paragraph texts, oldest first
    pub fn recent(&self) -> &[String] {
        &self.recent
    }

    pub fn cooldown(&self) -> u8 {
        self.cooldown
    }

    /// Classify the next paragraph and move the window forward
    pub fn advance(&mut self, text: &str) -> Role {
        let role = if classify_heading(text) {
            self.cooldown = HEADING_COOLDOWN;
            Role::Heading
        } else {
            let just_saw_heading = self.cooldown > 0;
            self.cooldown = self.cooldown.saturating_sub(1);
            if classify_subheading(text, &self.recent, just_saw_heading) {
                Role::Subheading
            } else {
                Role::Body
            }
        };

        self.recent.push(text.to_string());
        if self.recent.len() > RECENT_WINDOW {
            self.recent.remove(0);
        }

        role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "The delivery team met every fortnight to review progress against \
        the plan and agreed actions with the owners of each workstream.";

    #[test]
    fn heading_sets_cooldown_and_body_drains_it() {
        let mut state = ClassificationState::new();
        assert_eq!(state.advance("Introduction"), Role::Heading);
        assert_eq!(state.cooldown(), HEADING_COOLDOWN);

        assert_eq!(state.advance(BODY), Role::Body);
        assert_eq!(state.cooldown(), 2);
        assert_eq!(state.advance(BODY), Role::Body);
        assert_eq!(state.advance(BODY), Role::Body);
        assert_eq!(state.cooldown(), 0);
        assert_eq!(state.advance(BODY), Role::Body);
        assert_eq!(state.cooldown(), 0);
    }

    #[test]
    fn numbered_line_right_after_heading_is_subheading() {
        let numbered = "1.1. Where the programme stands today and what changed since the last review";
        let mut state = ClassificationState::new();
        state.advance("Background");
        assert_eq!(state.advance(numbered), Role::Subheading);

        // Far from any heading the same line is body text
        let mut state = ClassificationState::new();
        for _ in 0..4 {
            state.advance(BODY);
        }
        assert_eq!(state.advance(numbered), Role::Body);
    }

    #[test]
    fn window_keeps_last_five_texts() {
        let mut state = ClassificationState::new();
        for i in 0..8 {
            state.advance(&format!("{BODY} {i}"));
        }
        assert_eq!(state.recent().len(), RECENT_WINDOW);
        assert!(state.recent()[0].ends_with(" 3"));
        assert!(state.recent()[4].ends_with(" 7"));
    }
}
