use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbBackend, EntityTrait,
    PaginatorTrait, Statement, TransactionTrait,
};
use tracing::info;

use crate::{
    entities::{actor, director, film, film_actor, film_director},
    error::ImportResult,
    models::TableCounts,
};

/// Handle to the relational store.
pub struct Datastore {
    db: DatabaseConnection,
}

impl Datastore {
    pub async fn connect(database_url: &str) -> ImportResult<Self> {
        let db = Database::connect(database_url).await?;

        if db.get_database_backend() == DbBackend::Sqlite {
            for pragma in
                ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL", "PRAGMA cache_size=-64000"]
            {
                db.execute(Statement::from_string(DbBackend::Sqlite, pragma.to_string())).await?;
            }
        }

        Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Opens a write batch. Committing it is the flush point.
    pub async fn begin(&self) -> ImportResult<DatabaseTransaction> {
        Ok(self.db.begin().await?)
    }

    /// Empties the film, person and join tables. Migration bookkeeping is
    /// left alone.
    pub async fn truncate_all(&self) -> ImportResult<()> {
        let txn = self.db.begin().await?;
        film_actor::Entity::delete_many().exec(&txn).await?;
        film_director::Entity::delete_many().exec(&txn).await?;
        actor::Entity::delete_many().exec(&txn).await?;
        director::Entity::delete_many().exec(&txn).await?;
        let films = film::Entity::delete_many().exec(&txn).await?;
        txn.commit().await?;

        info!(films_removed = films.rows_affected, "truncated import tables");
        Ok(())
    }

    pub async fn counts(&self) -> ImportResult<TableCounts> {
        Ok(TableCounts {
            films: film::Entity::find().count(&self.db).await?,
            actors: actor::Entity::find().count(&self.db).await?,
            directors: director::Entity::find().count(&self.db).await?,
            film_actors: film_actor::Entity::find().count(&self.db).await?,
            film_directors: film_director::Entity::find().count(&self.db).await?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use sea_orm::{ActiveModelTrait, Set};

    use super::*;

    /// A migrated database in a temporary directory; the guard keeps it alive.
    pub(crate) async fn test_store() -> (Datastore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("films.db").display());
        (Datastore::connect(&url).await.unwrap(), dir)
    }

    #[tokio::test]
    async fn connect_creates_empty_schema() {
        let (store, _dir) = test_store().await;
        assert_eq!(store.counts().await.unwrap(), TableCounts::default());
    }

    #[tokio::test]
    async fn truncate_clears_everything_and_deleting_a_film_cascades() {
        let (store, _dir) = test_store().await;
        let db = store.db();

        let kept = film::ActiveModel {
            id: Default::default(),
            imdb_title_id: Set("tt001".into()),
            title: Set("X".into()),
            date_published: Set(None),
            genre: Set(None),
            duration: Set(None),
            production_company: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
        let gone = film::ActiveModel {
            id: Default::default(),
            imdb_title_id: Set("tt002".into()),
            title: Set("Y".into()),
            date_published: Set(None),
            genre: Set(None),
            duration: Set(None),
            production_company: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
        let actor = actor::ActiveModel {
            id: Default::default(),
            name: Set("Alice".into()),
            birthdate: Set(None),
            died: Set(None),
            born: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
        for film_id in [kept.id, gone.id] {
            film_actor::Entity::insert(film_actor::ActiveModel {
                film_id: Set(film_id),
                actor_id: Set(actor.id),
            })
            .exec_without_returning(db)
            .await
            .unwrap();
        }

        film::Entity::delete_by_id(gone.id).exec(db).await.unwrap();
        let counts = store.counts().await.unwrap();
        assert_eq!((counts.films, counts.actors, counts.film_actors), (1, 1, 1));

        store.truncate_all().await.unwrap();
        assert_eq!(store.counts().await.unwrap(), TableCounts::default());
    }
}
