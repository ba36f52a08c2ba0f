//! Feeling → Audius query mapping

/// Search parameters derived from a feeling keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodQuery {
    /// Free-text query for `/v1/tracks/search`
    pub query: &'static str,
    /// Audius genre name
    pub genre: &'static str,
    /// Audius mood tags, sent as `mood[]`
    pub moods: &'static [&'static str],
}

/// Used for any feeling not present in [`MOODS`]
pub const DEFAULT_MOOD: MoodQuery = MoodQuery {
    query: "chill",
    genre: "Electronic",
    moods: &[],
};

/// Built-in feeling table
pub const MOODS: &[(&str, MoodQuery)] = &[
    (
        "happy",
        MoodQuery {
            query: "happy upbeat",
            genre: "Electronic",
            moods: &["Upbeat", "Excited"],
        },
    ),
    (
        "sad",
        MoodQuery {
            query: "sad emotional",
            genre: "Acoustic",
            moods: &["Melancholy", "Sentimental"],
        },
    ),
    (
        "energetic",
        MoodQuery {
            query: "energetic workout",
            genre: "Electronic",
            moods: &["Energizing", "Empowering"],
        },
    ),
    (
        "calm",
        MoodQuery {
            query: "calm relaxing",
            genre: "Ambient",
            moods: &["Peaceful", "Easygoing"],
        },
    ),
    (
        "romantic",
        MoodQuery {
            query: "romantic love",
            genre: "R&B/Soul",
            moods: &["Romantic", "Tender"],
        },
    ),
    (
        "focus",
        MoodQuery {
            query: "focus study",
            genre: "Lo-Fi",
            moods: &["Cool", "Sophisticated"],
        },
    ),
    (
        "angry",
        MoodQuery {
            query: "angry aggressive",
            genre: "Metal",
            moods: &["Aggressive", "Fiery"],
        },
    ),
    (
        "chill",
        MoodQuery {
            query: "chill",
            genre: "Electronic",
            moods: &["Easygoing", "Cool"],
        },
    ),
];

/// Look up the query for a feeling, case-insensitively
///
/// Unknown feelings get [`DEFAULT_MOOD`].
pub fn mood_query(feeling: &str) -> MoodQuery {
    let key = feeling.trim().to_lowercase();
    MOODS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, query)| *query)
        .unwrap_or(DEFAULT_MOOD)
}
