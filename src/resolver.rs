use std::collections::HashSet;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    sea_query::OnConflict,
};
use tracing::debug;

use crate::{
    entities::{actor, director, film_actor, film_director},
    error::ImportResult,
    models::PersonKind,
};

/// Upper bound on bound parameters per `IN (...)` lookup.
const LINK_LOOKUP_CHUNK: usize = 500;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Resolution {
    pub id: i32,
    pub created: bool,
    /// Join rows added by this call.
    pub linked: u64,
}

/// Resolves a person name to exactly one actor or director row and links it
/// to a set of films. The trimmed name is the natural key.
#[derive(Clone, Copy, Debug)]
pub struct EntityResolver {
    kind: PersonKind,
}

impl EntityResolver {
    pub fn new(kind: PersonKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> PersonKind {
        self.kind
    }

    /// Idempotent: calling twice with the same name and films leaves one
    /// person row and no duplicate links.
    pub async fn resolve<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
        film_ids: &[i32],
    ) -> ImportResult<Resolution> {
        let name = name.trim();
        let (id, created) = match self.find(conn, name).await? {
            Some(id) => (id, false),
            None => (self.create(conn, name).await?, true),
        };

        let mut wanted: Vec<i32> = Vec::with_capacity(film_ids.len());
        for &film_id in film_ids {
            if !wanted.contains(&film_id) {
                wanted.push(film_id);
            }
        }
        if !created {
            let linked = self.linked_films(conn, id, &wanted).await?;
            wanted.retain(|film_id| !linked.contains(film_id));
        }

        let linked = self.link(conn, id, &wanted).await?;
        debug!(kind = %self.kind, name, id, created, linked, "resolved person");
        Ok(Resolution { id, created, linked })
    }

    async fn find<C: ConnectionTrait>(&self, conn: &C, name: &str) -> ImportResult<Option<i32>> {
        let id = match self.kind {
            PersonKind::Actor => actor::Entity::find()
                .filter(actor::Column::Name.eq(name))
                .one(conn)
                .await?
                .map(|a| a.id),
            PersonKind::Director => director::Entity::find()
                .filter(director::Column::Name.eq(name))
                .one(conn)
                .await?
                .map(|d| d.id),
        };
        Ok(id)
    }

    async fn create<C: ConnectionTrait>(&self, conn: &C, name: &str) -> ImportResult<i32> {
        let id = match self.kind {
            PersonKind::Actor => {
                let model = actor::ActiveModel {
                    id: Default::default(),
                    name: Set(name.to_string()),
                    birthdate: Set(None),
                    died: Set(None),
                    born: Set(None),
                };
                actor::Entity::insert(model).exec(conn).await?.last_insert_id
            },
            PersonKind::Director => {
                let model = director::ActiveModel {
                    id: Default::default(),
                    name: Set(name.to_string()),
                    birthdate: Set(None),
                };
                director::Entity::insert(model).exec(conn).await?.last_insert_id
            },
        };
        Ok(id)
    }

    async fn linked_films<C: ConnectionTrait>(
        &self,
        conn: &C,
        person_id: i32,
        film_ids: &[i32],
    ) -> ImportResult<HashSet<i32>> {
        let mut linked = HashSet::new();
        for chunk in film_ids.chunks(LINK_LOOKUP_CHUNK) {
            let found: Vec<i32> = match self.kind {
                PersonKind::Actor => film_actor::Entity::find()
                    .select_only()
                    .column(film_actor::Column::FilmId)
                    .filter(film_actor::Column::ActorId.eq(person_id))
                    .filter(film_actor::Column::FilmId.is_in(chunk.iter().copied()))
                    .into_tuple()
                    .all(conn)
                    .await?,
                PersonKind::Director => film_director::Entity::find()
                    .select_only()
                    .column(film_director::Column::FilmId)
                    .filter(film_director::Column::DirectorId.eq(person_id))
                    .filter(film_director::Column::FilmId.is_in(chunk.iter().copied()))
                    .into_tuple()
                    .all(conn)
                    .await?,
            };
            linked.extend(found);
        }
        Ok(linked)
    }

    async fn link<C: ConnectionTrait>(
        &self,
        conn: &C,
        person_id: i32,
        film_ids: &[i32],
    ) -> ImportResult<u64> {
        let mut inserted = 0;
        for chunk in film_ids.chunks(LINK_LOOKUP_CHUNK) {
            inserted += match self.kind {
                PersonKind::Actor => {
                    let links = chunk.iter().map(|&film_id| film_actor::ActiveModel {
                        film_id: Set(film_id),
                        actor_id: Set(person_id),
                    });
                    film_actor::Entity::insert_many(links)
                        .on_conflict(
                            OnConflict::columns([
                                film_actor::Column::FilmId,
                                film_actor::Column::ActorId,
                            ])
                            .do_nothing()
                            .to_owned(),
                        )
                        .exec_without_returning(conn)
                        .await?
                },
                PersonKind::Director => {
                    let links = chunk.iter().map(|&film_id| film_director::ActiveModel {
                        film_id: Set(film_id),
                        director_id: Set(person_id),
                    });
                    film_director::Entity::insert_many(links)
                        .on_conflict(
                            OnConflict::columns([
                                film_director::Column::FilmId,
                                film_director::Column::DirectorId,
                            ])
                            .do_nothing()
                            .to_owned(),
                        )
                        .exec_without_returning(conn)
                        .await?
                },
            };
        }
        Ok(inserted)
    }
}
