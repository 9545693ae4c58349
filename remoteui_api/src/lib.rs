//! Client for the Remote UI web console of networked printers and
//! multifunction devices: form login, session headers, page requests.

mod client;
mod errors;
pub mod login;
pub mod types;
pub use self::client::{Client, Session};
pub use self::errors::Error;
pub use self::types::{expand_template, ConsolePaths, Credentials, Page, Timeouts};
