pub mod auth;
pub mod multipart;
pub mod pipeline;
pub mod tokens;

pub use auth::Authenticator;
pub use pipeline::Pipeline;
pub use tokens::SessionStore;
