//! Keyword classification of chat messages
//!
//! Decides whether a conversational message should be answered directly
//! or handed off to architecture generation.

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Chat,
    GenerateArchitecture,
}

const GENERATION_KEYWORDS: &[&str] = &[
    "build",
    "generate",
    "design",
    "architecture",
    "system",
    "backend",
    "frontend",
    "app",
    "website",
];

/// Classify a message. Generation keywords win over small talk.
pub fn detect(message: &str) -> Intent {
    let msg = message.to_lowercase();
    if GENERATION_KEYWORDS.iter().any(|k| msg.contains(k)) {
        Intent::GenerateArchitecture
    } else {
        Intent::Chat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_keywords_detected() {
        assert_eq!(
            detect("Build me a backend for a todo list"),
            Intent::GenerateArchitecture
        );
        assert_eq!(
            detect("DESIGN a system for inventory"),
            Intent::GenerateArchitecture
        );
        assert_eq!(
            detect("I want a website for my bakery"),
            Intent::GenerateArchitecture
        );
    }

    #[test]
    fn test_small_talk_is_chat() {
        assert_eq!(detect("hello there"), Intent::Chat);
        assert_eq!(detect("what can you do?"), Intent::Chat);
    }
}
