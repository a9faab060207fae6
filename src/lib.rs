pub mod auth;
pub mod controllers;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod postal;
pub mod repositories;
pub mod routes;
pub mod swagger;
