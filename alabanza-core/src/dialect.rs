//! SQL dialect differences between the embedded and networked stores
//!
//! Statements are written once with `?` placeholders and rewritten here for
//! backends that want numbered parameters.

use std::borrow::Cow;

/// How a backend spells positional parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (SQLite)
    Question,
    /// `$1, $2, ...` (PostgreSQL)
    Numbered,
}

impl PlaceholderStyle {
    /// Rewrite `?` placeholders into this style.
    ///
    /// Question marks inside single-quoted literals, double-quoted
    /// identifiers and `--` comments are left alone.
    pub fn normalize<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self {
            Self::Question => Cow::Borrowed(sql),
            Self::Numbered if !sql.contains('?') => Cow::Borrowed(sql),
            Self::Numbered => Cow::Owned(number_placeholders(sql)),
        }
    }
}

fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            out.push(c);
            continue;
        }
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '-') if chars.peek() == Some(&'-') => in_comment = true,
            (None, '?') => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
                continue;
            }
            (None, _) => {}
        }
        out.push(c);
    }
    out
}

/// Schema syntax and catalog queries for one store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        match self {
            Self::Sqlite => PlaceholderStyle::Question,
            Self::Postgres => PlaceholderStyle::Numbered,
        }
    }

    /// Column definition for an auto-incrementing integer primary key
    pub fn identity_column(&self) -> &'static str {
        match self {
            Self::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
            Self::Postgres => "id SERIAL PRIMARY KEY",
        }
    }

    /// Query returning one `name` row per existing column of the table bound
    /// to the single placeholder.
    pub fn list_columns_sql(&self) -> &'static str {
        match self {
            Self::Sqlite => "SELECT name FROM pragma_table_info(?)",
            Self::Postgres => {
                "SELECT column_name::text AS name FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = ? \
                 ORDER BY ordinal_position"
            }
        }
    }

    /// `ALTER TABLE` adding a nullable text column.
    ///
    /// `table` and `column` come from the fixed migration list, never from
    /// user input.
    pub fn add_text_column_sql(&self, table: &str, column: &str) -> String {
        match self {
            Self::Sqlite => format!("ALTER TABLE {table} ADD COLUMN {column} TEXT"),
            Self::Postgres => format!("ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {column} TEXT"),
        }
    }

    /// Whether a failed `ADD COLUMN` only means another process got there first
    pub fn is_duplicate_column(&self, err: &sqlx::Error) -> bool {
        let Some(db_err) = err.as_database_error() else {
            return false;
        };
        match self {
            Self::Sqlite => db_err.message().contains("duplicate column name"),
            // 42701 = duplicate_column
            Self::Postgres => db_err.code().as_deref() == Some("42701"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_style_is_untouched() {
        let sql = "SELECT * FROM songs WHERE id = ?";
        assert!(matches!(
            PlaceholderStyle::Question.normalize(sql),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn numbers_placeholders_in_order() {
        let sql = "INSERT INTO songs (name, tones, best) VALUES (?, ?, ?)";
        assert_eq!(
            PlaceholderStyle::Numbered.normalize(sql),
            "INSERT INTO songs (name, tones, best) VALUES ($1, $2, $3)"
        );
    }

    #[test]
    fn skips_quoted_question_marks() {
        let sql = "SELECT '?' AS q, \"why?\" FROM t WHERE a = ? -- really?\nAND b = ?";
        assert_eq!(
            PlaceholderStyle::Numbered.normalize(sql),
            "SELECT '?' AS q, \"why?\" FROM t WHERE a = $1 -- really?\nAND b = $2"
        );
    }

    #[test]
    fn escaped_quotes_stay_in_literal() {
        let sql = "SELECT 'it''s ?' WHERE x = ?";
        assert_eq!(
            PlaceholderStyle::Numbered.normalize(sql),
            "SELECT 'it''s ?' WHERE x = $1"
        );
    }

    #[test]
    fn identity_syntax_differs() {
        assert!(Dialect::Sqlite.identity_column().contains("AUTOINCREMENT"));
        assert!(Dialect::Postgres.identity_column().contains("SERIAL"));
    }

    #[test]
    fn postgres_add_column_is_guarded() {
        assert_eq!(
            Dialect::Postgres.add_text_column_sql("songs", "lyrics"),
            "ALTER TABLE songs ADD COLUMN IF NOT EXISTS lyrics TEXT"
        );
        assert_eq!(
            Dialect::Sqlite.add_text_column_sql("songs", "lyrics"),
            "ALTER TABLE songs ADD COLUMN lyrics TEXT"
        );
    }

    #[test]
    fn non_database_errors_are_not_duplicates() {
        assert!(!Dialect::Sqlite.is_duplicate_column(&sqlx::Error::RowNotFound));
    }
}
