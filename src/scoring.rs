use crate::analysis::{Analysis, AnalysisError};

/// Typing level bands, ordered slowest to fastest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
pub enum TypingLevel {
    #[strum(to_string = "Very slow (< 20WPM)")]
    VerySlow,
    #[strum(to_string = "Beginner (20–39 WPM)")]
    Beginner,
    #[strum(to_string = "Average (40–59 WPM)")]
    Average,
    #[strum(to_string = "Proficient (60–79 WPM)")]
    Proficient,
    #[strum(to_string = "Fast (80–99 WPM)")]
    Fast,
    #[strum(to_string = "Advanced (100+ WPM)")]
    Advanced,
}

// exclusive upper bound of each band, the last band is open ended
const LEVEL_BOUNDS: [(u32, TypingLevel); 5] = [
    (20, TypingLevel::VerySlow),
    (40, TypingLevel::Beginner),
    (60, TypingLevel::Average),
    (80, TypingLevel::Proficient),
    (100, TypingLevel::Fast),
];

impl TypingLevel {
    pub fn from_wpm(wpm: u32) -> Self {
        LEVEL_BOUNDS
            .iter()
            .find(|(upper, _)| wpm < *upper)
            .map(|(_, level)| *level)
            .unwrap_or(TypingLevel::Advanced)
    }
}

/// Words per minute, rounded half away from zero
pub fn words_per_minute(word_count: u32, elapsed_secs: u32) -> Result<u32, AnalysisError> {
    if elapsed_secs == 0 {
        return Err(AnalysisError::ZeroElapsed);
    }

    let minutes = elapsed_secs as f64 / 60.0;
    Ok((word_count as f64 / minutes).round() as u32)
}

/// Outcome of one analyze action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreResult {
    pub word_count: u32,
    pub symbol_count: u32,
    pub wpm: u32,
    pub level: TypingLevel,
}

impl ScoreResult {
    pub fn compute(analysis: Analysis, elapsed_secs: u32) -> Result<Self, AnalysisError> {
        let wpm = words_per_minute(analysis.words, elapsed_secs)?;

        Ok(Self {
            word_count: analysis.words,
            symbol_count: analysis.symbols,
            wpm,
            level: TypingLevel::from_wpm(wpm),
        })
    }

    pub fn summary(&self) -> String {
        format!("{} — {} WPM", self.level, self.wpm)
    }
}
