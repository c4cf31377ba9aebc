//! Configuration constants for the trivia quiz engine
//!
//! This module contains the structural constants of a quiz session and
//! the fixed parameters of the generation service boundary, grouped by
//! the component they configure.

/// Quiz content shape constants
pub mod quiz {
    /// Number of questions grouped into a single fetched set
    pub const QUESTIONS_PER_SET: usize = 5;
    /// Number of question sets generated per topic
    pub const SETS_PER_TOPIC: usize = 2;
    /// Total number of questions presented during one session
    pub const TOTAL_QUESTIONS_PER_TOPIC: usize = QUESTIONS_PER_SET * SETS_PER_TOPIC;
    /// Number of answer options every question must carry
    pub const OPTION_COUNT: usize = 4;
}

/// Session clock constants
pub mod clock {
    /// Seconds available to answer a single question
    pub const QUESTION_SECONDS: u64 = 15;
    /// Seconds between consecutive clock ticks
    pub const TICK_INTERVAL_SECONDS: u64 = 1;
    /// Seconds the correct option stays highlighted after time expires
    /// before the explanation is shown
    pub const REVEAL_GRACE_SECONDS: u64 = 3;
}

/// Generation service constants
pub mod fetch {
    /// Default base URL of the generation service
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    /// Model used to generate quiz content
    pub const CONTENT_MODEL: &str = "gemini-2.5-flash";
    /// Model used to generate per-question illustrations
    pub const IMAGE_MODEL: &str = "imagen-4.0-generate-001";
    /// Aspect ratio requested for illustrations
    pub const IMAGE_ASPECT_RATIO: &str = "16:9";
    /// Mime type requested for illustrations
    pub const IMAGE_MIME_TYPE: &str = "image/jpeg";
    /// Seconds before an outstanding generation request is abandoned
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;
}

/// Credential storage constants
pub mod credential {
    /// Fixed key the credential is persisted under in the host's
    /// key/value store
    pub const STORAGE_KEY: &str = "gemini_api_key";
}
