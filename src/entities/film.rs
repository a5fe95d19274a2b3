use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "film")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub imdb_title_id: String,
    pub title: String,
    /// Unix seconds, 00:00 UTC of the published day.
    pub date_published: Option<i64>,
    pub genre: Option<String>,
    /// Minutes.
    pub duration: Option<i16>,
    pub production_company: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::film_actor::Entity")]
    FilmActor,
    #[sea_orm(has_many = "super::film_director::Entity")]
    FilmDirector,
}

impl Related<super::film_actor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FilmActor.def()
    }
}

impl Related<super::film_director::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FilmDirector.def()
    }
}

impl Related<super::actor::Entity> for Entity {
    fn to() -> RelationDef {
        super::film_actor::Relation::Actor.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::film_actor::Relation::Film.def().rev())
    }
}

impl Related<super::director::Entity> for Entity {
    fn to() -> RelationDef {
        super::film_director::Relation::Director.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::film_director::Relation::Film.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
