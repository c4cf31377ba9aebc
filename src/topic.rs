//! The closed set of playable trivia topics
//!
//! Topics are a fixed enumeration; each carries display metadata and the
//! guidance text embedded into content-generation requests. The details
//! table is keyed by an [`EnumMap`] so that adding a topic variant
//! without adding its details is a compile error rather than a runtime
//! lookup failure.

use std::fmt;
use std::sync::LazyLock;

use enum_map::{Enum, EnumMap, enum_map};
use serde::{Deserialize, Serialize};

/// A trivia category a session can be played on
///
/// Selected once per session and immutable for its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum Topic {
    /// Ecology, plants, and environmental concepts
    Biodiversity,
    /// The animal kingdom
    Zoology,
    /// World history and civilizations
    History,
    /// Major world religions and mythologies
    Religion,
    /// World geography
    Geography,
    /// Science and technology
    ScienceTech,
    /// Art and literature
    ArtLiterature,
    /// Sports and sporting events
    Sports,
}

/// Display metadata and generation guidance for a topic
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TopicDetails {
    /// Human-readable topic name
    pub name: &'static str,
    /// Emoji shown next to the topic in selection screens
    pub icon: &'static str,
    /// Context text embedded into the content-generation prompt to keep
    /// questions on-topic and at general-knowledge difficulty
    pub guidance: &'static str,
}

static DETAILS: LazyLock<EnumMap<Topic, TopicDetails>> = LazyLock::new(|| {
    enum_map! {
        Topic::Biodiversity => TopicDetails {
            name: "Biodiversity & Ecology",
            icon: "🌿",
            guidance: "General-knowledge questions about ecology, famous or \
                curious animals and plants, and basic environmental concepts \
                everyone should know. E.g.: Which gas do plants absorb? What \
                is the largest mammal?",
        },
        Topic::Zoology => TopicDetails {
            name: "The Animal Kingdom",
            icon: "🦁",
            guidance: "General-knowledge questions about animals: records \
                (fastest, largest), iconic animals, animal groups (mammals, \
                insects) and curiosities most people could know. Avoid \
                complex scientific terminology.",
        },
        Topic::History => TopicDetails {
            name: "History & Civilizations",
            icon: "🏛️",
            guidance: "Questions about very well known world events, famous \
                figures (kings, inventors, leaders) and iconic civilizations \
                in an accessible way. Focus on popular cultural facts, \
                avoiding overly specific dates and data.",
        },
        Topic::Religion => TopicDetails {
            name: "World Religions",
            icon: "📜",
            guidance: "General-knowledge questions about the major world \
                religions (Christianity, Islam, Judaism, Buddhism, Hinduism) \
                and famous mythologies (Greek, Roman). Focused on symbols, \
                key figures and the best known festivities, not deep \
                theology.",
        },
        Topic::Geography => TopicDetails {
            name: "World Geography",
            icon: "🌍",
            guidance: "General-knowledge geography questions: capitals of \
                important countries, famous rivers and mountains, flags, and \
                iconic places people recognize (Eiffel Tower, Great Wall of \
                China, etc.).",
        },
        Topic::ScienceTech => TopicDetails {
            name: "Science & Technology",
            icon: "🔬",
            guidance: "General-knowledge questions about science and \
                technology: inventions that changed the world (wheel, \
                printing press, internet), famous scientists (Einstein, \
                Newton, Curie), and basic concepts about the human body and \
                space.",
        },
        Topic::ArtLiterature => TopicDetails {
            name: "Art & Literature",
            icon: "🎨",
            guidance: "General-knowledge questions about art and literature: \
                famous painters and masterpieces (Mona Lisa, The Scream), \
                classic authors and books known worldwide (Don Quixote, \
                Romeo and Juliet), and basic artistic movements.",
        },
        Topic::Sports => TopicDetails {
            name: "Sports & Events",
            icon: "⚽",
            guidance: "General-knowledge questions about sports: basic rules \
                of popular sports (football, basketball), legendary athletes \
                (Michael Jordan, Pelé), and major world events like the \
                Olympic Games or the World Cup.",
        },
    }
});

impl Topic {
    /// Iterates over every playable topic in declaration order
    pub fn all() -> impl Iterator<Item = Topic> {
        (0..Topic::LENGTH).map(Topic::from_usize)
    }

    /// Returns the display metadata and generation guidance for this topic
    pub fn details(self) -> &'static TopicDetails {
        &DETAILS[self]
    }

    /// Returns the human-readable name of this topic
    pub fn name(self) -> &'static str {
        self.details().name
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_all_topics_listed() {
        assert_eq!(Topic::all().count(), 8);
    }

    #[test]
    fn test_details_cover_every_topic() {
        for topic in Topic::all() {
            let details = topic.details();
            assert!(!details.name.is_empty());
            assert!(!details.icon.is_empty());
            assert!(!details.guidance.is_empty());
        }
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(Topic::Geography.to_string(), "World Geography");
        assert_eq!(Topic::ScienceTech.to_string(), "Science & Technology");
    }

    #[test]
    fn test_topic_serde_round_trip() {
        let json = serde_json::to_string(&Topic::ArtLiterature).unwrap();
        let back: Topic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Topic::ArtLiterature);
    }
}
