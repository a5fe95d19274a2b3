pub mod actor;
pub mod director;
pub mod film;
pub mod film_actor;
pub mod film_director;
