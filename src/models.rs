use std::fmt;

use serde::Deserialize;

/// One data row of the input file. Only `imdb_title_id` and `title` are
/// required in the header; every other column defaults to empty.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FilmRow {
    pub imdb_title_id: String,
    pub title: String,
    #[serde(default)]
    pub date_published: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub production_company: String,
    #[serde(default)]
    pub actors: String,
    #[serde(default)]
    pub director: String,
}

pub const REQUIRED_COLUMNS: [&str; 2] = ["imdb_title_id", "title"];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ImportMode {
    /// Truncate everything, then bulk load through spill segments.
    #[default]
    Create,
    /// Upsert row by row against what is already stored.
    Update,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PersonKind {
    Actor,
    Director,
}

impl PersonKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            PersonKind::Actor => "actors",
            PersonKind::Director => "directors",
        }
    }
}

impl fmt::Display for PersonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonKind::Actor => f.write_str("actor"),
            PersonKind::Director => f.write_str("director"),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ImportStats {
    pub rows_read: u64,
    pub films_created: u64,
    pub films_updated: u64,
    pub malformed_rows: u64,
    pub rows_without_id: u64,
    pub date_errors: u64,
    pub actors_created: u64,
    pub directors_created: u64,
    pub actor_links: u64,
    pub director_links: u64,
    pub batches: u64,
    /// Most name groups read back from a single relation segment.
    pub largest_segment: usize,
}

impl ImportStats {
    pub fn films_imported(&self) -> u64 {
        self.films_created + self.films_updated
    }

    pub fn record_segment(&mut self, groups: usize) {
        self.largest_segment = self.largest_segment.max(groups);
    }

    pub fn record_person(&mut self, kind: PersonKind, created: bool, linked: u64) {
        match kind {
            PersonKind::Actor => {
                self.actors_created += u64::from(created);
                self.actor_links += linked;
            },
            PersonKind::Director => {
                self.directors_created += u64::from(created);
                self.director_links += linked;
            },
        }
    }
}

/// Row totals across the five import tables.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TableCounts {
    pub films: u64,
    pub actors: u64,
    pub directors: u64,
    pub film_actors: u64,
    pub film_directors: u64,
}
