pub mod auth;
pub mod error;
pub mod groups;
pub mod personal;
pub mod roommate;
pub mod routes;
pub mod schemas;
pub mod settings;
pub mod store;

pub use routes::configure;
