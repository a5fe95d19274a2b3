use jiff::{Timestamp, civil, fmt::strtime, tz::TimeZone};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::{
    entities::film,
    error::{ImportError, ImportResult},
    models::{FilmRow, ImportMode},
};

/// Formats tried after the bare-year and ISO forms, in order.
const DATE_FORMATS: [&str; 8] = [
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%Y.%m.%d",
];

#[derive(Debug)]
pub struct LoadedFilm {
    pub id: i32,
    pub created: bool,
    /// Set when `date_published` could not be parsed and was stored as null.
    pub date_error: Option<ImportError>,
}

/// Normalizes `date_published` to unix seconds at 00:00 UTC.
///
/// A bare year of up to four digits means January 1st of that year. Blank
/// input is `Ok(None)`; anything unrecognized is `DateParse`.
pub fn parse_date_published(raw: &str) -> ImportResult<Option<i64>> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let unparseable = || ImportError::DateParse { value: value.to_string() };

    if value.len() <= 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year: i16 = value.parse().map_err(|_| unparseable())?;
        let date = civil::Date::new(year, 1, 1).map_err(|_| unparseable())?;
        return midnight_utc(date).ok_or_else(unparseable).map(Some);
    }

    if let Ok(ts) = value.parse::<Timestamp>() {
        return Ok(Some(ts.as_second()));
    }
    if let Ok(date) = value.parse::<civil::Date>() {
        return midnight_utc(date).ok_or_else(unparseable).map(Some);
    }
    if let Ok(dt) = value.parse::<civil::DateTime>() {
        return midnight_utc(dt.date()).ok_or_else(unparseable).map(Some);
    }

    for format in DATE_FORMATS {
        if let Ok(date) = strtime::parse(format, value).and_then(|tm| tm.to_date()) {
            return midnight_utc(date).ok_or_else(unparseable).map(Some);
        }
    }

    Err(unparseable())
}

fn midnight_utc(date: civil::Date) -> Option<i64> {
    date.to_zoned(TimeZone::UTC).ok().map(|zdt| zdt.timestamp().as_second())
}

/// Integer cast of `duration`: blank is null, otherwise the leading digits
/// (none means 0), clamped to the column range.
pub fn coerce_duration(raw: &str) -> Option<i16> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, b| (acc * 10 + i64::from(b - b'0')).min(i64::from(i16::MAX) + 1));
    let minutes = if negative { -magnitude } else { magnitude };
    Some(minutes.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16)
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Writes one film row and hands back the store-assigned id, which is
/// visible inside the open batch before it commits.
pub struct FilmLoader {
    mode: ImportMode,
}

impl FilmLoader {
    pub fn new(mode: ImportMode) -> Self {
        Self { mode }
    }

    pub async fn load<C: ConnectionTrait>(
        &self,
        conn: &C,
        row: &FilmRow,
    ) -> ImportResult<LoadedFilm> {
        let (date_published, date_error) = match parse_date_published(&row.date_published) {
            Ok(ts) => (ts, None),
            Err(err) => (None, Some(err)),
        };
        let imdb_title_id = row.imdb_title_id.trim();

        let existing = match self.mode {
            ImportMode::Create => None,
            ImportMode::Update => {
                film::Entity::find()
                    .filter(film::Column::ImdbTitleId.eq(imdb_title_id))
                    .one(conn)
                    .await?
            },
        };

        if let Some(existing) = existing {
            let id = existing.id;
            let mut model: film::ActiveModel = existing.into();
            model.title = Set(row.title.trim().to_string());
            model.date_published = Set(date_published);
            model.genre = Set(optional(&row.genre));
            model.duration = Set(coerce_duration(&row.duration));
            model.production_company = Set(optional(&row.production_company));
            model.update(conn).await?;
            return Ok(LoadedFilm { id, created: false, date_error });
        }

        let model = film::ActiveModel {
            id: Default::default(),
            imdb_title_id: Set(imdb_title_id.to_string()),
            title: Set(row.title.trim().to_string()),
            date_published: Set(date_published),
            genre: Set(optional(&row.genre)),
            duration: Set(coerce_duration(&row.duration)),
            production_company: Set(optional(&row.production_company)),
        };
        let id = film::Entity::insert(model).exec(conn).await?.last_insert_id;
        Ok(LoadedFilm { id, created: true, date_error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_store;

    fn row(id: &str, title: &str, date: &str, duration: &str) -> FilmRow {
        FilmRow {
            imdb_title_id: id.into(),
            title: title.into(),
            date_published: date.into(),
            genre: "Drama".into(),
            duration: duration.into(),
            production_company: " ".into(),
            ..Default::default()
        }
    }

    #[test]
    fn bare_year_is_january_first_utc() {
        assert_eq!(parse_date_published("2015").unwrap(), Some(1_420_070_400));
        assert_eq!(parse_date_published(" 2000 ").unwrap(), Some(946_684_800));
    }

    #[test]
    fn full_dates_resolve_to_that_day() {
        let march_fifth = Some(1_425_513_600);
        assert_eq!(parse_date_published("March 5, 2015").unwrap(), march_fifth);
        assert_eq!(parse_date_published("2015-03-05").unwrap(), march_fifth);
        assert_eq!(parse_date_published("5 March 2015").unwrap(), march_fifth);
        assert_eq!(parse_date_published("03/05/2015").unwrap(), march_fifth);
    }

    #[test]
    fn garbage_dates_are_errors_and_blank_is_null() {
        assert!(matches!(
            parse_date_published("not-a-date"),
            Err(ImportError::DateParse { value }) if value == "not-a-date"
        ));
        assert_eq!(parse_date_published("  ").unwrap(), None);
    }

    #[test]
    fn duration_follows_integer_cast() {
        assert_eq!(coerce_duration(""), None);
        assert_eq!(coerce_duration("95"), Some(95));
        assert_eq!(coerce_duration("120 min"), Some(120));
        assert_eq!(coerce_duration("unknown"), Some(0));
        assert_eq!(coerce_duration("99999999"), Some(i16::MAX));
    }

    #[tokio::test]
    async fn create_mode_always_inserts() {
        let (store, _dir) = test_store().await;
        let loader = FilmLoader::new(ImportMode::Create);

        let txn = store.begin().await.unwrap();
        let first = loader.load(&txn, &row("tt001", "X", "2000", "90")).await.unwrap();
        let second = loader.load(&txn, &row("tt001", "X", "2000", "90")).await.unwrap();
        txn.commit().await.unwrap();

        assert!(first.created && second.created);
        assert_ne!(first.id, second.id);
        assert_eq!(store.counts().await.unwrap().films, 2);
    }

    #[tokio::test]
    async fn bad_date_still_creates_the_film() {
        let (store, _dir) = test_store().await;
        let loader = FilmLoader::new(ImportMode::Create);

        let loaded = loader.load(store.db(), &row("tt001", "X", "not-a-date", "")).await.unwrap();
        assert!(matches!(loaded.date_error, Some(ImportError::DateParse { .. })));

        let stored = film::Entity::find_by_id(loaded.id).one(store.db()).await.unwrap().unwrap();
        assert_eq!(stored.date_published, None);
        assert_eq!(stored.duration, None);
        assert_eq!(stored.genre.as_deref(), Some("Drama"));
        assert_eq!(stored.production_company, None);
    }

    #[tokio::test]
    async fn update_mode_rewrites_in_place() {
        let (store, _dir) = test_store().await;
        let loader = FilmLoader::new(ImportMode::Update);

        let created = loader.load(store.db(), &row("tt001", "X", "2000", "90")).await.unwrap();
        let recut = row("tt001", "X (cut)", "2001", "95");
        let updated = loader.load(store.db(), &recut).await.unwrap();
        assert!(created.created);
        assert!(!updated.created);
        assert_eq!(created.id, updated.id);

        let stored = film::Entity::find_by_id(created.id).one(store.db()).await.unwrap().unwrap();
        assert_eq!(stored.title, "X (cut)");
        assert_eq!(stored.date_published, Some(978_307_200));
        assert_eq!(stored.duration, Some(95));
        assert_eq!(store.counts().await.unwrap().films, 1);
    }
}
