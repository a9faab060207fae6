pub mod account_repository;
pub mod request_repository;
