//! Song records

use serde::{Deserialize, Serialize};

use super::{join_list, ValidationError};

/// A stored song with every column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub name: String,
    pub tones: Vec<String>,
    /// Who sings it best; may be empty
    pub best: String,
    pub lyrics: Option<String>,
    pub chords: Option<String>,
    /// Local path or URL of a reference recording
    pub audio_url: Option<String>,
}

/// Narrow projection used by list views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongSummary {
    pub id: i64,
    pub name: String,
    pub tones: Vec<String>,
    pub best: String,
}

/// Song to insert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSong {
    pub name: String,
    #[serde(default)]
    pub tones: Vec<String>,
    #[serde(default)]
    pub best: String,
    #[serde(default)]
    pub lyrics: Option<String>,
    #[serde(default)]
    pub chords: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

impl NewSong {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn tones<I, S>(mut self, tones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tones = tones.into_iter().map(Into::into).collect();
        self
    }

    pub fn best(mut self, best: impl Into<String>) -> Self {
        self.best = best.into();
        self
    }

    pub fn lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = Some(lyrics.into());
        self
    }

    pub fn chords(mut self, chords: impl Into<String>) -> Self {
        self.chords = Some(chords.into());
        self
    }

    pub fn audio_url(mut self, audio_url: impl Into<String>) -> Self {
        self.audio_url = Some(audio_url.into());
        self
    }

    /// Check invariants and return the stored form of `tones`.
    pub fn validate(&self) -> Result<String, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Empty { field: "song name" });
        }
        join_list("tone", &self.tones)
    }
}

impl From<Song> for SongSummary {
    fn from(song: Song) -> Self {
        Self {
            id: song.id,
            name: song.name,
            tones: song.tones,
            best: song.best,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_validate() {
        let song = NewSong::new("Amazing Grace").tones(["G", "A"]).best("Ana");
        assert_eq!(song.validate().unwrap(), "G,A");
        assert_eq!(song.lyrics, None);
    }

    #[test]
    fn rejects_blank_name() {
        let err = NewSong::new("   ").validate().unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "song name" });
    }

    #[test]
    fn deserializes_with_defaults() {
        let song: NewSong = serde_json::from_str(r#"{"name":"How Great"}"#).unwrap();
        assert_eq!(song, NewSong::new("How Great"));
    }
}
