//! Domain models with validation

mod mix;
mod song;
mod validation;

pub use mix::{Mix, MixDetails, NewMix};
pub use song::{NewSong, Song, SongSummary};
pub use validation::ValidationError;

/// Delimiter used when a sequence is stored in a single text column
pub const LIST_DELIMITER: char = ',';

/// Join a validated sequence into its stored representation.
///
/// Every item must be non-empty and free of [`LIST_DELIMITER`], otherwise
/// the stored value would not split back into the same sequence.
pub(crate) fn join_list(field: &'static str, items: &[String]) -> Result<String, ValidationError> {
    for item in items {
        if item.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        if item.contains(LIST_DELIMITER) {
            return Err(ValidationError::ContainsDelimiter {
                field,
                value: item.clone(),
            });
        }
    }
    Ok(items.join(","))
}

/// Split a stored sequence back into its items. `NULL` and `""` are empty.
pub(crate) fn split_list(stored: Option<&str>) -> Vec<String> {
    match stored {
        Some(s) if !s.is_empty() => s.split(LIST_DELIMITER).map(str::to_owned).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn join_then_split_keeps_order_and_duplicates() {
        let items = owned(&["Amazing Grace", "How Great", "Amazing Grace"]);
        let stored = join_list("song", &items).unwrap();
        assert_eq!(stored, "Amazing Grace,How Great,Amazing Grace");
        assert_eq!(split_list(Some(&stored)), items);
    }

    #[test]
    fn empty_storage_is_empty_list() {
        assert!(split_list(None).is_empty());
        assert!(split_list(Some("")).is_empty());
        assert_eq!(join_list("tone", &[]).unwrap(), "");
    }

    #[test]
    fn rejects_delimiter_inside_item() {
        let err = join_list("tone", &owned(&["G", "A,B"])).unwrap_err();
        assert!(matches!(err, ValidationError::ContainsDelimiter { .. }));
    }

    #[test]
    fn rejects_empty_item() {
        let err = join_list("tone", &owned(&["G", ""])).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "tone" });
    }
}
