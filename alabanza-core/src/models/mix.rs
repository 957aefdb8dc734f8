//! Mix records (ordered set lists)

use serde::{Deserialize, Serialize};

use super::{join_list, Song, ValidationError};

/// A stored mix; `songs` holds song names in set order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mix {
    pub id: i64,
    pub name: String,
    pub songs: Vec<String>,
}

/// Mix to insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMix {
    pub name: String,
    #[serde(default)]
    pub songs: Vec<String>,
}

impl NewMix {
    pub fn new<I, S>(name: impl Into<String>, songs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            songs: songs.into_iter().map(Into::into).collect(),
        }
    }

    /// Check invariants and return the stored form of `songs`.
    pub fn validate(&self) -> Result<String, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Empty { field: "mix name" });
        }
        join_list("song name", &self.songs)
    }
}

/// A mix with its songs resolved, in mix order.
///
/// Names that match no stored song are left out of `resolved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixDetails {
    #[serde(flatten)]
    pub mix: Mix,
    pub resolved: Vec<Song>,
}

impl MixDetails {
    /// Names in the mix with no matching song
    pub fn missing(&self) -> Vec<&str> {
        self.mix
            .songs
            .iter()
            .filter(|name| !self.resolved.iter().any(|s| &s.name == *name))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_keeps_order() {
        let mix = NewMix::new("Sunday Set", ["Amazing Grace", "How Great"]);
        assert_eq!(mix.validate().unwrap(), "Amazing Grace,How Great");
    }

    #[test]
    fn rejects_blank_name() {
        let err = NewMix::new("", ["Amazing Grace"]).validate().unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "mix name" });
    }

    #[test]
    fn missing_lists_dangling_names() {
        let details = MixDetails {
            mix: Mix {
                id: 1,
                name: "Sunday Set".into(),
                songs: vec!["Amazing Grace".into(), "How Great".into()],
            },
            resolved: vec![Song {
                id: 7,
                name: "Amazing Grace".into(),
                tones: vec!["G".into()],
                best: String::new(),
                lyrics: None,
                chords: None,
                audio_url: None,
            }],
        };
        assert_eq!(details.missing(), vec!["How Great"]);
    }
}
