pub mod auth_service;
pub mod items_service;

pub use auth_service::AuthService;
pub use items_service::ItemsService;
