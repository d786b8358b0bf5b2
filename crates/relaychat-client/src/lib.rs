pub mod connection;

pub use connection::{connect, ClientEvent, ClientHandle};
