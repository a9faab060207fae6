pub mod auth_controller;
pub mod request_controller;
pub mod user_controller;
