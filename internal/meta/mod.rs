pub mod db;
pub mod keypath;
pub mod migrate;
pub mod models;
pub mod repos;
