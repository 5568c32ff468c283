//! Domain types shared by the engine, the stores and the API.

mod filters;
mod user;

pub use filters::{Filters, Metadata};
pub use user::{NewUser, Registration, Role, UnknownRole, User, UserPatch};
