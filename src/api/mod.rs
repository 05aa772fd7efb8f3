mod extract;
mod handlers;
pub mod response;
mod routes;

pub use extract::CurrentUser;
pub use routes::create_router;
