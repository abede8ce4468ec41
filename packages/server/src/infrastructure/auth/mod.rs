//! Handshake authentication

pub mod token;

pub use token::SharedTokenAuthenticator;
