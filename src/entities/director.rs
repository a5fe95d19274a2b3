use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "director")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub birthdate: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::film_director::Entity")]
    FilmDirector,
}

impl Related<super::film_director::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FilmDirector.def()
    }
}

impl Related<super::film::Entity> for Entity {
    fn to() -> RelationDef {
        super::film_director::Relation::Film.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::film_director::Relation::Director.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
