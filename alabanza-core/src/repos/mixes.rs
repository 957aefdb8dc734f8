//! Mix repository
//!
//! Song names are stored comma-joined in `mixes.songs`; order and
//! duplicates round-trip exactly. Names are not checked against `songs`.

use std::collections::HashMap;

use crate::executor::QueryExecutor;
use crate::models::{split_list, Mix, MixDetails, NewMix, Song};
use crate::repos::returned_id;
use crate::repos::songs::song_from_row;
use crate::row::{Row, Value};
use crate::Result;

/// Mix repository
pub struct MixRepo<'a> {
    exec: &'a QueryExecutor,
}

impl<'a> MixRepo<'a> {
    pub fn new(exec: &'a QueryExecutor) -> Self {
        Self { exec }
    }

    /// Insert a mix and return its id.
    pub async fn add(&self, mix: &NewMix) -> Result<i64> {
        let songs = mix.validate()?;
        let row = self
            .exec
            .run_returning(
                "INSERT INTO mixes (name, songs) VALUES (?, ?) RETURNING id",
                &[mix.name.as_str().into(), songs.into()],
            )
            .await?;
        let id = returned_id(row)?;
        tracing::debug!(id, name = %mix.name, songs = mix.songs.len(), "mix added");
        Ok(id)
    }

    /// Every mix, most recently added first.
    pub async fn list(&self) -> Result<Vec<Mix>> {
        let rows = self
            .exec
            .fetch_all("SELECT id, name, songs FROM mixes ORDER BY id DESC", &[])
            .await?;
        Ok(rows.iter().map(mix_from_row).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Mix>> {
        let row = self
            .exec
            .fetch_optional(
                "SELECT id, name, songs FROM mixes WHERE id = ?",
                &[Value::Integer(id)],
            )
            .await?;
        Ok(row.as_ref().map(mix_from_row))
    }

    /// Delete a mix. Returns `false` if it did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .exec
            .run("DELETE FROM mixes WHERE id = ?", &[Value::Integer(id)])
            .await?;
        Ok(affected > 0)
    }

    /// A mix with its songs resolved by name, in mix order.
    ///
    /// Names without a stored song are dropped from `resolved`. When several
    /// songs share a name the oldest one is used.
    pub async fn details(&self, id: i64) -> Result<Option<MixDetails>> {
        let Some(mix) = self.get(id).await? else {
            return Ok(None);
        };

        let mut names: Vec<&str> = mix.songs.iter().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();

        let by_name = if names.is_empty() {
            HashMap::new()
        } else {
            let placeholders = vec!["?"; names.len()].join(", ");
            let params: Vec<Value> = names.iter().map(|n| Value::from(*n)).collect();
            let rows = self
                .exec
                .fetch_all(
                    &format!(
                        "SELECT id, name, tones, best, lyrics, chords, audio_url \
                         FROM songs WHERE name IN ({placeholders}) ORDER BY id ASC"
                    ),
                    &params,
                )
                .await?;
            index_oldest_by_name(rows.iter().map(song_from_row))
        };

        let resolved = resolve_in_order(&mix.songs, &by_name);
        if resolved.len() < mix.songs.len() {
            tracing::debug!(
                mix = id,
                missing = mix.songs.len() - resolved.len(),
                "mix references songs that do not exist"
            );
        }

        Ok(Some(MixDetails { mix, resolved }))
    }
}

fn mix_from_row(row: &Row) -> Mix {
    Mix {
        id: row.i64("id").unwrap_or_default(),
        name: row.text("name").unwrap_or_default().to_owned(),
        songs: split_list(row.text("songs")),
    }
}

/// Name → song, keeping the first (oldest) song seen for each name
fn index_oldest_by_name(songs: impl Iterator<Item = Song>) -> HashMap<String, Song> {
    let mut index = HashMap::new();
    for song in songs {
        index.entry(song.name.clone()).or_insert(song);
    }
    index
}

fn resolve_in_order(names: &[String], by_name: &HashMap<String, Song>) -> Vec<Song> {
    names
        .iter()
        .filter_map(|name| by_name.get(name).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: i64, name: &str) -> Song {
        Song {
            id,
            name: name.into(),
            tones: Vec::new(),
            best: String::new(),
            lyrics: None,
            chords: None,
            audio_url: None,
        }
    }

    #[test]
    fn oldest_song_wins_name_clash() {
        let index = index_oldest_by_name(vec![song(1, "Grace"), song(5, "Grace")].into_iter());
        assert_eq!(index["Grace"].id, 1);
    }

    #[test]
    fn resolves_in_mix_order_and_drops_dangling() {
        let index = index_oldest_by_name(vec![song(1, "A"), song(2, "B")].into_iter());
        let names: Vec<String> = ["B", "Missing", "A", "B"].iter().map(|s| s.to_string()).collect();
        let ids: Vec<i64> = resolve_in_order(&names, &index).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1, 2]);
    }

    #[test]
    fn maps_empty_song_list() {
        let row = Row::new(vec![
            ("id".into(), Value::Integer(2)),
            ("name".into(), "Empty".into()),
            ("songs".into(), Value::Null),
        ]);
        assert!(mix_from_row(&row).songs.is_empty());
    }
}
