//! Song repository
//!
//! One parameterized statement per operation; lists are newest first.

use crate::executor::QueryExecutor;
use crate::models::{split_list, NewSong, Song, SongSummary};
use crate::row::{Row, Value};
use crate::repos::returned_id;
use crate::Result;

const SONG_COLUMNS: &str = "id, name, tones, best, lyrics, chords, audio_url";

/// Song repository
pub struct SongRepo<'a> {
    exec: &'a QueryExecutor,
}

impl<'a> SongRepo<'a> {
    pub fn new(exec: &'a QueryExecutor) -> Self {
        Self { exec }
    }

    /// Insert a song and return its id.
    pub async fn add(&self, song: &NewSong) -> Result<i64> {
        let tones = song.validate()?;
        let row = self
            .exec
            .run_returning(
                "INSERT INTO songs (name, tones, best, lyrics, chords, audio_url) \
                 VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
                &[
                    song.name.as_str().into(),
                    tones.into(),
                    song.best.as_str().into(),
                    song.lyrics.as_deref().into(),
                    song.chords.as_deref().into(),
                    song.audio_url.as_deref().into(),
                ],
            )
            .await?;
        let id = returned_id(row)?;
        tracing::debug!(id, name = %song.name, "song added");
        Ok(id)
    }

    /// Every song with all columns, most recently added first.
    pub async fn list(&self) -> Result<Vec<Song>> {
        let rows = self
            .exec
            .fetch_all(
                &format!("SELECT {SONG_COLUMNS} FROM songs ORDER BY id DESC"),
                &[],
            )
            .await?;
        Ok(rows.iter().map(song_from_row).collect())
    }

    /// Id, name, tones and best singer only, for list views.
    pub async fn list_light(&self) -> Result<Vec<SongSummary>> {
        let rows = self
            .exec
            .fetch_all("SELECT id, name, tones, best FROM songs ORDER BY id DESC", &[])
            .await?;
        Ok(rows
            .iter()
            .map(|row| SongSummary {
                id: row.i64("id").unwrap_or_default(),
                name: text(row, "name"),
                tones: split_list(row.text("tones")),
                best: text(row, "best"),
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Song>> {
        let row = self
            .exec
            .fetch_optional(
                &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?"),
                &[Value::Integer(id)],
            )
            .await?;
        Ok(row.as_ref().map(song_from_row))
    }

    /// Delete a song. Returns `false` if it did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .exec
            .run("DELETE FROM songs WHERE id = ?", &[Value::Integer(id)])
            .await?;
        Ok(affected > 0)
    }
}

fn text(row: &Row, column: &str) -> String {
    row.text(column).unwrap_or_default().to_owned()
}

fn optional_text(row: &Row, column: &str) -> Option<String> {
    row.text(column).map(str::to_owned)
}

pub(crate) fn song_from_row(row: &Row) -> Song {
    Song {
        id: row.i64("id").unwrap_or_default(),
        name: text(row, "name"),
        tones: split_list(row.text("tones")),
        best: text(row, "best"),
        lyrics: optional_text(row, "lyrics"),
        chords: optional_text(row, "chords"),
        audio_url: optional_text(row, "audio_url"),
    }
}
