pub mod db;
mod documents;
pub mod models;
mod projects;
pub mod repository;
mod roles;
mod tables;
mod users;

pub use db::{Database, DatabaseError};
pub use repository::{
    DocumentRepository, ProjectRepository, Repository, RoleRepository, UserRepository,
};
pub use tables::*;
