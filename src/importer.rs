use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use sea_orm::DatabaseTransaction;
use tracing::{debug, info, trace, warn};

use crate::{
    chunker::{LineChunker, MalformedRowPolicy, Row, count_data_lines},
    db::Datastore,
    error::{ImportError, ImportFailure},
    extractor::{RelationExtractor, extract_names, read_segment},
    loader::{FilmLoader, LoadedFilm},
    models::{FilmRow, ImportMode, ImportStats, PersonKind, TableCounts},
    progress::ImportProgress,
    resolver::EntityResolver,
};

/// Create mode runs
/// `Idle -> Truncating -> LoadingFilms -> ExtractingRelations ->
/// ResolvingDirectors -> ResolvingActors -> Committed`.
/// Update mode goes `Idle -> LoadingFilms -> Committed`, resolving people
/// inline per row. Any state can end in `Failed`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImportState {
    Idle,
    Truncating,
    LoadingFilms,
    ExtractingRelations,
    ResolvingDirectors,
    ResolvingActors,
    Committed,
    Failed,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImportState::Idle => "idle",
            ImportState::Truncating => "truncating",
            ImportState::LoadingFilms => "loading films",
            ImportState::ExtractingRelations => "extracting relations",
            ImportState::ResolvingDirectors => "resolving directors",
            ImportState::ResolvingActors => "resolving actors",
            ImportState::Committed => "committed",
            ImportState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug)]
pub struct ImportOptions {
    pub mode: ImportMode,
    /// Rows per write batch; also persons per batch while resolving.
    pub batch_size: usize,
    pub row_limit: Option<u64>,
    pub scratch_dir: PathBuf,
    /// Minimum number of relation segments. Large inputs get more, so a
    /// segment holds about one batch of rows.
    pub segments: usize,
    pub malformed_rows: MalformedRowPolicy,
}

impl ImportOptions {
    pub fn new(mode: ImportMode, scratch_dir: impl Into<PathBuf>) -> Self {
        let batch_size = match mode {
            ImportMode::Create => 1000,
            ImportMode::Update => 100,
        };
        Self {
            mode,
            batch_size,
            row_limit: None,
            scratch_dir: scratch_dir.into(),
            segments: 256,
            malformed_rows: MalformedRowPolicy::Skip,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImportSummary {
    pub mode: ImportMode,
    pub stats: ImportStats,
    pub counts: TableCounts,
}

/// Every batch runs in one transaction. A committed batch is a durable
/// checkpoint; nothing is rolled back across batches.
pub struct Importer<'a> {
    store: &'a Datastore,
    options: ImportOptions,
    progress: &'a dyn ImportProgress,
    cancel: Arc<AtomicBool>,
    state: ImportState,
    stats: ImportStats,
}

impl<'a> Importer<'a> {
    pub fn new(
        store: &'a Datastore,
        options: ImportOptions,
        progress: &'a dyn ImportProgress,
    ) -> Self {
        Self {
            store,
            options,
            progress,
            cancel: Arc::new(AtomicBool::new(false)),
            state: ImportState::Idle,
            stats: ImportStats::default(),
        }
    }

    /// Checked between batches; setting it stops the run after the last
    /// committed batch.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub async fn run(&mut self, path: &Path) -> Result<ImportSummary, ImportFailure> {
        let outcome = match self.options.mode {
            ImportMode::Create => self.run_create(path).await,
            ImportMode::Update => self.run_update(path).await,
        };

        match outcome {
            Ok(()) => {
                let counts = self
                    .store
                    .counts()
                    .await
                    .map_err(|err| ImportFailure::new(ImportState::Committed, err))?;
                self.transition(ImportState::Committed);
                self.progress
                    .on_complete(&format!("{} films imported.", self.stats.films_imported()));
                info!(
                    films = counts.films,
                    actors = counts.actors,
                    directors = counts.directors,
                    film_actors = counts.film_actors,
                    film_directors = counts.film_directors,
                    malformed_rows = self.stats.malformed_rows,
                    date_errors = self.stats.date_errors,
                    largest_segment = self.stats.largest_segment,
                    "import committed"
                );
                Ok(ImportSummary { mode: self.options.mode, stats: self.stats.clone(), counts })
            },
            Err(failure) => {
                warn!(state = %failure.state, error = %failure, "import failed");
                self.transition(ImportState::Failed);
                Err(failure)
            },
        }
    }

    fn transition(&mut self, next: ImportState) {
        debug!(from = %self.state, to = %next, "import state");
        self.state = next;
    }

    fn fail(&self, source: ImportError) -> ImportFailure {
        ImportFailure::new(self.state, source)
    }

    fn check_cancelled(&self) -> Result<(), ImportFailure> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(self.fail(ImportError::Interrupted));
        }
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<(LineChunker, u64), ImportFailure> {
        let total = count_data_lines(path).map_err(|err| self.fail(err))?;
        let total = self.options.row_limit.map_or(total, |limit| total.min(limit));
        let chunker = LineChunker::open(path, self.options.batch_size, self.options.malformed_rows)
            .map_err(|err| self.fail(err))?
            .with_row_limit(self.options.row_limit);

        info!(path = %path.display(), rows = total, mode = ?self.options.mode, "starting import");
        let message = match self.options.mode {
            ImportMode::Create => {
                format!("Creating films and relation segments from {}", path.display())
            },
            ImportMode::Update => {
                format!("Updating database with {}. Found {total} films", path.display())
            },
        };
        self.progress.on_phase(&message, total);
        Ok((chunker, total))
    }

    /// Parses a row and drops the ones that cannot become a film.
    fn accept_row(
        &mut self,
        chunker: &LineChunker,
        row: &Row,
    ) -> Result<Option<FilmRow>, ImportFailure> {
        self.stats.rows_read += 1;
        let film = match row.parse(chunker.headers()) {
            Ok(film) => film,
            Err(err) => {
                return match self.options.malformed_rows {
                    MalformedRowPolicy::Skip => {
                        warn!(line = row.line, error = %err, "skipping malformed row");
                        self.stats.malformed_rows += 1;
                        Ok(None)
                    },
                    MalformedRowPolicy::Abort => Err(self.fail(err).at_row(row.line, None)),
                };
            },
        };

        if film.imdb_title_id.trim().is_empty() {
            warn!(line = row.line, "skipping row without imdb_title_id");
            self.stats.rows_without_id += 1;
            return Ok(None);
        }
        Ok(Some(film))
    }

    fn fail_at(&self, source: ImportError, row: &Row, film: &FilmRow) -> ImportFailure {
        self.fail(source).at_row(row.line, Some(film.imdb_title_id.as_str()))
    }

    fn record_load(&mut self, row: &Row, film: &FilmRow, loaded: LoadedFilm) {
        if loaded.created {
            self.stats.films_created += 1;
        } else {
            self.stats.films_updated += 1;
        }
        if let Some(err) = loaded.date_error {
            debug_assert!(err.is_recoverable());
            warn!(
                line = row.line,
                imdb_title_id = %film.imdb_title_id,
                error = %err,
                "date_published stored as null"
            );
            self.stats.date_errors += 1;
        }
    }

    async fn commit(&mut self, txn: DatabaseTransaction) -> Result<(), ImportFailure> {
        txn.commit().await.map_err(|err| self.fail(err.into()))?;
        self.stats.batches += 1;
        Ok(())
    }

    async fn run_create(&mut self, path: &Path) -> Result<(), ImportFailure> {
        // Open first so a missing file aborts before anything is truncated.
        let (mut chunker, total) = self.open(path)?;

        self.transition(ImportState::Truncating);
        let segments = segment_count(total, self.options.batch_size, self.options.segments);
        debug!(segments, rows = total, "sizing relation segments");
        let mut extractor = RelationExtractor::create(&self.options.scratch_dir, segments)
            .map_err(|err| self.fail(err))?;
        self.store.truncate_all().await.map_err(|err| self.fail(err))?;

        self.transition(ImportState::LoadingFilms);
        let loader = FilmLoader::new(ImportMode::Create);
        while let Some(batch) = chunker.next() {
            let batch = batch.map_err(|err| self.fail(err))?;
            let txn = self.store.begin().await.map_err(|err| self.fail(err))?;

            for row in &batch.rows {
                let Some(film) = self.accept_row(&chunker, row)? else {
                    continue;
                };
                let loaded =
                    loader.load(&txn, &film).await.map_err(|err| self.fail_at(err, row, &film))?;
                extractor.extract(&film, loaded.id).map_err(|err| self.fail_at(err, row, &film))?;
                self.record_load(row, &film, loaded);
            }

            self.commit(txn).await?;
            extractor.flush().map_err(|err| self.fail(err))?;
            self.progress.on_advance(batch.len() as u64);
            debug!(batch = batch.index, rows = batch.len(), "film batch committed");
            drop(batch);
            self.check_cancelled()?;
        }
        self.stats.malformed_rows += chunker.malformed();
        drop(chunker);

        self.transition(ImportState::ExtractingRelations);
        extractor.flush().map_err(|err| self.fail(err))?;
        info!(
            actor_records = extractor.arena(PersonKind::Actor).records_written(),
            director_records = extractor.arena(PersonKind::Director).records_written(),
            scratch = %extractor.scratch_path().display(),
            "relation segments sealed"
        );

        self.transition(ImportState::ResolvingDirectors);
        self.resolve_segments(&extractor, PersonKind::Director, path).await?;

        self.transition(ImportState::ResolvingActors);
        self.resolve_segments(&extractor, PersonKind::Actor, path).await?;

        drop(extractor);
        Ok(())
    }

    async fn resolve_segments(
        &mut self,
        extractor: &RelationExtractor,
        kind: PersonKind,
        path: &Path,
    ) -> Result<(), ImportFailure> {
        let segments = extractor.arena(kind).segment_files();
        if segments.is_empty() {
            return Ok(());
        }

        let message = format!("Importing {} from {}", kind.dir_name(), path.display());
        self.progress.on_phase(&message, segments.len() as u64);

        let resolver = EntityResolver::new(kind);
        let mut txn = self.store.begin().await.map_err(|err| self.fail(err))?;
        let mut in_batch = 0usize;

        for segment in &segments {
            let groups = read_segment(segment).map_err(|err| self.fail(err))?;
            self.stats.record_segment(groups.len());
            for group in groups {
                let resolution = resolver
                    .resolve(&txn, &group.name, &group.film_ids)
                    .await
                    .map_err(|err| self.fail(err).at_name(&group.name))?;
                trace!(kind = %kind, name = %group.name, id = resolution.id, "person resolved");
                self.stats.record_person(kind, resolution.created, resolution.linked);

                in_batch += 1;
                if in_batch >= self.options.batch_size {
                    self.commit(txn).await.map_err(|failure| failure.at_name(&group.name))?;
                    debug!(kind = %kind, persons = in_batch, "person batch committed");
                    self.check_cancelled()?;
                    txn = self.store.begin().await.map_err(|err| self.fail(err))?;
                    in_batch = 0;
                }
            }
            self.progress.on_advance(1);
        }

        self.commit(txn).await
    }

    async fn run_update(&mut self, path: &Path) -> Result<(), ImportFailure> {
        let (mut chunker, _) = self.open(path)?;

        self.transition(ImportState::LoadingFilms);
        let loader = FilmLoader::new(ImportMode::Update);
        let actors = EntityResolver::new(PersonKind::Actor);
        let directors = EntityResolver::new(PersonKind::Director);

        while let Some(batch) = chunker.next() {
            let batch = batch.map_err(|err| self.fail(err))?;
            let txn = self.store.begin().await.map_err(|err| self.fail(err))?;

            for row in &batch.rows {
                let Some(film) = self.accept_row(&chunker, row)? else {
                    continue;
                };
                let loaded =
                    loader.load(&txn, &film).await.map_err(|err| self.fail_at(err, row, &film))?;
                let names = extract_names(&film);
                for resolver in [&directors, &actors] {
                    for name in names.of(resolver.kind()) {
                        let resolution = resolver
                            .resolve(&txn, name, &[loaded.id])
                            .await
                            .map_err(|err| self.fail_at(err, row, &film).at_name(name))?;
                        self.stats.record_person(
                            resolver.kind(),
                            resolution.created,
                            resolution.linked,
                        );
                    }
                }
                self.record_load(row, &film, loaded);
            }

            self.commit(txn).await?;
            self.progress.on_advance(batch.len() as u64);
            debug!(batch = batch.index, rows = batch.len(), "update batch committed");
            drop(batch);
            self.check_cancelled()?;
        }
        self.stats.malformed_rows += chunker.malformed();
        Ok(())
    }
}

/// Enough segments that each one receives about `batch_size` input rows,
/// so reading a segment back stays bounded by the batch size.
fn segment_count(rows: u64, batch_size: usize, minimum: usize) -> usize {
    let batch_size = batch_size.max(1) as u64;
    let wanted = rows.div_ceil(batch_size);
    usize::try_from(wanted).unwrap_or(usize::MAX).max(minimum).max(1)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

    use super::*;
    use crate::{
        db::tests::test_store,
        entities::{actor, director, film, film_actor, film_director},
        progress::SilentProgress,
    };

    const HEADER: &str =
        "imdb_title_id,title,date_published,genre,duration,production_company,actors,director";

    fn csv_file(dir: &Path, rows: &[&str]) -> PathBuf {
        let path = dir.join("films.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        path
    }

    fn two_films(dir: &Path) -> PathBuf {
        csv_file(
            dir,
            &[
                "tt001,X,2000,Drama,90,Studio,\"Alice, Bob\",Carol",
                "tt002,Y,2001,Comedy,,,\"Bob, Dan\",Carol",
            ],
        )
    }

    fn options(mode: ImportMode, dir: &Path) -> ImportOptions {
        let mut options = ImportOptions::new(mode, dir.join("scratch"));
        options.segments = 4;
        options
    }

    async fn run(store: &Datastore, options: ImportOptions, path: &Path) -> ImportSummary {
        Importer::new(store, options, &SilentProgress).run(path).await.unwrap()
    }

    async fn person_films(store: &Datastore, kind: PersonKind, name: &str) -> Vec<String> {
        let db = store.db();
        let film_ids: Vec<i32> = match kind {
            PersonKind::Actor => {
                let person = actor::Entity::find()
                    .filter(actor::Column::Name.eq(name))
                    .one(db)
                    .await
                    .unwrap()
                    .unwrap();
                film_actor::Entity::find()
                    .filter(film_actor::Column::ActorId.eq(person.id))
                    .all(db)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|l| l.film_id)
                    .collect()
            },
            PersonKind::Director => {
                let person = director::Entity::find()
                    .filter(director::Column::Name.eq(name))
                    .one(db)
                    .await
                    .unwrap()
                    .unwrap();
                film_director::Entity::find()
                    .filter(film_director::Column::DirectorId.eq(person.id))
                    .all(db)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|l| l.film_id)
                    .collect()
            },
        };
        let mut titles: Vec<String> = film::Entity::find()
            .filter(film::Column::Id.is_in(film_ids))
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.imdb_title_id)
            .collect();
        titles.sort();
        titles
    }

    #[tokio::test]
    async fn create_mode_normalizes_the_two_film_fixture() {
        let (store, dir) = test_store().await;
        let path = two_films(dir.path());

        let summary = run(&store, options(ImportMode::Create, dir.path()), &path).await;

        assert_eq!(
            summary.counts,
            TableCounts { films: 2, actors: 3, directors: 1, film_actors: 4, film_directors: 2 }
        );
        assert_eq!(summary.stats.films_created, 2);
        assert_eq!(summary.stats.actors_created, 3);
        assert_eq!(summary.stats.directors_created, 1);
        assert_eq!(person_films(&store, PersonKind::Actor, "Bob").await, ["tt001", "tt002"]);
        assert_eq!(person_films(&store, PersonKind::Director, "Carol").await, ["tt001", "tt002"]);
        assert_eq!(person_films(&store, PersonKind::Actor, "Alice").await, ["tt001"]);
        assert!(!dir.path().join("scratch").exists());

        let x = film::Entity::find()
            .filter(film::Column::ImdbTitleId.eq("tt001"))
            .one(store.db())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(x.date_published, Some(946_684_800));
        assert_eq!(x.duration, Some(90));
    }

    #[tokio::test]
    async fn names_repeated_across_batches_resolve_to_one_person() {
        let (store, dir) = test_store().await;
        let rows: Vec<String> = (0..25)
            .map(|i| {
                format!("tt{i:03},Film {i},2000,Drama,90,Studio,\"Shared, Solo {i}\",\" Shared \"")
            })
            .collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let path = csv_file(dir.path(), &refs);

        let mut opts = options(ImportMode::Create, dir.path());
        opts.batch_size = 4;
        opts.segments = 1;
        let summary = run(&store, opts, &path).await;

        assert_eq!(summary.counts.films, 25);
        assert_eq!(summary.counts.actors, 26);
        assert_eq!(summary.counts.directors, 1);
        assert_eq!(summary.counts.film_actors, 50);
        assert_eq!(summary.counts.film_directors, 25);
        assert_eq!(summary.stats.batches, 7 + 7 + 1);
    }

    #[test]
    fn segment_count_grows_with_input_past_the_minimum() {
        assert_eq!(segment_count(0, 1000, 256), 256);
        assert_eq!(segment_count(85_000, 1000, 256), 256);
        assert_eq!(segment_count(400_000, 1000, 256), 400);
        assert_eq!(segment_count(400_001, 1000, 256), 401);
        assert_eq!(segment_count(10, 0, 0), 10);
    }

    fn distinct_actor_rows(dir: &Path, n: usize) -> PathBuf {
        let rows: Vec<String> = (0..n)
            .map(|i| format!("tt{i:05},Film {i},2000,Drama,90,Studio,Actor {i},Dir"))
            .collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        csv_file(dir, &refs)
    }

    #[tokio::test]
    async fn segment_groups_stay_bounded_as_input_grows() {
        let batch_size = 10;
        for n in [40, 400] {
            let (store, dir) = test_store().await;
            let path = distinct_actor_rows(dir.path(), n);

            let mut opts = options(ImportMode::Create, dir.path());
            opts.batch_size = batch_size;
            opts.segments = 1;
            let summary = run(&store, opts, &path).await;

            assert_eq!(summary.counts.actors, n as u64);
            assert!(
                summary.stats.largest_segment <= 3 * batch_size,
                "{n} rows put {} names in one segment",
                summary.stats.largest_segment
            );
        }
    }

    #[tokio::test]
    async fn resolution_failure_names_the_person() {
        let (store, dir) = test_store().await;
        store
            .db()
            .execute_unprepared(
                "CREATE TRIGGER reject_bob BEFORE INSERT ON actor WHEN NEW.name = 'Bob' \
                 BEGIN SELECT RAISE(ABORT, 'actor rejected'); END",
            )
            .await
            .unwrap();
        let path = two_films(dir.path());

        let mut importer =
            Importer::new(&store, options(ImportMode::Create, dir.path()), &SilentProgress);
        let failure = importer.run(&path).await.unwrap_err();

        assert_eq!(failure.state, ImportState::ResolvingActors);
        assert_eq!(failure.name.as_deref(), Some("Bob"));
        assert!(matches!(failure.source, ImportError::Datastore(_)));
        assert!(failure.to_string().contains("name \"Bob\""), "{failure}");
        assert_eq!(importer.state(), ImportState::Failed);
        assert_eq!(store.counts().await.unwrap().directors, 1);
        assert!(!dir.path().join("scratch").exists());
    }

    #[tokio::test]
    async fn create_mode_truncates_previous_data() {
        let (store, dir) = test_store().await;
        let path = two_films(dir.path());

        run(&store, options(ImportMode::Create, dir.path()), &path).await;
        let summary = run(&store, options(ImportMode::Create, dir.path()), &path).await;
        assert_eq!(summary.counts.films, 2);
        assert_eq!(summary.counts.film_actors, 4);
    }

    #[tokio::test]
    async fn update_mode_twice_matches_a_single_import() {
        let (store, dir) = test_store().await;
        let path = two_films(dir.path());

        let once = run(&store, options(ImportMode::Update, dir.path()), &path).await;
        let twice = run(&store, options(ImportMode::Update, dir.path()), &path).await;

        assert_eq!(
            once.counts,
            TableCounts { films: 2, actors: 3, directors: 1, film_actors: 4, film_directors: 2 }
        );
        assert_eq!(twice.counts, once.counts);
        assert_eq!(twice.stats.films_updated, 2);
        assert_eq!(twice.stats.actor_links + twice.stats.director_links, 0);
    }

    #[tokio::test]
    async fn update_mode_after_create_only_adds_new_rows() {
        let (store, dir) = test_store().await;
        let path = two_films(dir.path());
        run(&store, options(ImportMode::Create, dir.path()), &path).await;

        let more = csv_file(dir.path(), &["tt003,Z,2002,Drama,80,,\"Alice, Erin\",Carol"]);
        let summary = run(&store, options(ImportMode::Update, dir.path()), &more).await;
        assert_eq!(
            summary.counts,
            TableCounts { films: 3, actors: 4, directors: 1, film_actors: 6, film_directors: 3 }
        );
    }

    #[tokio::test]
    async fn recoverable_rows_are_counted_not_fatal() {
        let (store, dir) = test_store().await;
        let path = csv_file(
            dir.path(),
            &[
                "tt001,X,not-a-date,Drama,90,Studio,Alice,Carol",
                "tt002,too,few",
                ",No id,2000,Drama,90,Studio,Alice,Carol",
                "tt003,Z,2002,Drama,80,Studio,Alice,Carol",
            ],
        );

        let summary = run(&store, options(ImportMode::Create, dir.path()), &path).await;
        assert_eq!(summary.counts.films, 2);
        assert_eq!(summary.stats.date_errors, 1);
        assert_eq!(summary.stats.malformed_rows, 1);
        assert_eq!(summary.stats.rows_without_id, 1);
    }

    #[tokio::test]
    async fn row_limit_caps_the_import() {
        let (store, dir) = test_store().await;
        let rows: Vec<String> =
            (0..10).map(|i| format!("tt{i:03},Film {i},2000,,,,A{i},D{i}")).collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let path = csv_file(dir.path(), &refs);

        let mut opts = options(ImportMode::Create, dir.path());
        opts.row_limit = Some(3);
        let summary = run(&store, opts, &path).await;
        assert_eq!(summary.counts.films, 3);
        assert_eq!(summary.counts.actors, 3);
    }

    #[tokio::test]
    async fn missing_file_fails_before_truncating() {
        let (store, dir) = test_store().await;
        let path = two_films(dir.path());
        run(&store, options(ImportMode::Create, dir.path()), &path).await;

        let mut importer =
            Importer::new(&store, options(ImportMode::Create, dir.path()), &SilentProgress);
        let failure = importer.run(&dir.path().join("missing.csv")).await.unwrap_err();

        assert_eq!(failure.state, ImportState::Idle);
        assert!(matches!(failure.source, ImportError::Io { .. }));
        assert_eq!(importer.state(), ImportState::Failed);
        assert_eq!(store.counts().await.unwrap().films, 2);
    }

    #[tokio::test]
    async fn cancellation_stops_after_a_committed_batch_and_cleans_scratch() {
        let (store, dir) = test_store().await;
        let path = two_films(dir.path());

        let mut opts = options(ImportMode::Create, dir.path());
        opts.batch_size = 1;
        let cancel = Arc::new(AtomicBool::new(true));
        let failure = Importer::new(&store, opts, &SilentProgress)
            .with_cancel_flag(cancel)
            .run(&path)
            .await
            .unwrap_err();

        assert_eq!(failure.state, ImportState::LoadingFilms);
        assert!(matches!(failure.source, ImportError::Interrupted));
        assert_eq!(store.counts().await.unwrap().films, 1);
        assert!(!dir.path().join("scratch").exists());
    }
}
