use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Film::Table)
                    .if_not_exists()
                    .col(pk_auto(Film::Id))
                    .col(string(Film::ImdbTitleId))
                    .col(string(Film::Title))
                    .col(big_integer_null(Film::DatePublished))
                    .col(string_null(Film::Genre))
                    .col(small_integer_null(Film::Duration))
                    .col(string_null(Film::ProductionCompany))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("find_one_idx")
                    .table(Film::Table)
                    .col(Film::ImdbTitleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("search_idx")
                    .table(Film::Table)
                    .col(Film::Title)
                    .col(Film::Genre)
                    .col(Film::ProductionCompany)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actor::Table)
                    .if_not_exists()
                    .col(pk_auto(Actor::Id))
                    .col(string(Actor::Name))
                    .col(date_null(Actor::Birthdate))
                    .col(date_null(Actor::Died))
                    .col(string_null(Actor::Born))
                    .to_owned(),
            )
            .await?;

        // Lookup only: names are deduplicated by the importer, not the schema.
        manager
            .create_index(
                Index::create()
                    .name("idx_actor_name")
                    .table(Actor::Table)
                    .col(Actor::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Director::Table)
                    .if_not_exists()
                    .col(pk_auto(Director::Id))
                    .col(string(Director::Name))
                    .col(date_null(Director::Birthdate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_director_name")
                    .table(Director::Table)
                    .col(Director::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FilmActor::Table)
                    .if_not_exists()
                    .col(integer(FilmActor::FilmId))
                    .col(integer(FilmActor::ActorId))
                    .primary_key(Index::create().col(FilmActor::FilmId).col(FilmActor::ActorId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_film_actor_film")
                            .from(FilmActor::Table, FilmActor::FilmId)
                            .to(Film::Table, Film::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_film_actor_actor")
                            .from(FilmActor::Table, FilmActor::ActorId)
                            .to(Actor::Table, Actor::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_film_actor_actor")
                    .table(FilmActor::Table)
                    .col(FilmActor::ActorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FilmDirector::Table)
                    .if_not_exists()
                    .col(integer(FilmDirector::FilmId))
                    .col(integer(FilmDirector::DirectorId))
                    .primary_key(
                        Index::create().col(FilmDirector::FilmId).col(FilmDirector::DirectorId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_film_director_film")
                            .from(FilmDirector::Table, FilmDirector::FilmId)
                            .to(Film::Table, Film::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_film_director_director")
                            .from(FilmDirector::Table, FilmDirector::DirectorId)
                            .to(Director::Table, Director::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_film_director_director")
                    .table(FilmDirector::Table)
                    .col(FilmDirector::DirectorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FilmDirector::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(FilmActor::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Director::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Actor::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Film::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Film {
    Table,
    Id,
    ImdbTitleId,
    Title,
    DatePublished,
    Genre,
    Duration,
    ProductionCompany,
}

#[derive(DeriveIden)]
enum Actor {
    Table,
    Id,
    Name,
    Birthdate,
    Died,
    Born,
}

#[derive(DeriveIden)]
enum Director {
    Table,
    Id,
    Name,
    Birthdate,
}

#[derive(DeriveIden)]
enum FilmActor {
    Table,
    FilmId,
    ActorId,
}

#[derive(DeriveIden)]
enum FilmDirector {
    Table,
    FilmId,
    DirectorId,
}
