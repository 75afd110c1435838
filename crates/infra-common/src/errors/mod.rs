/*!
Error Handling

Common error type for the infrastructure layer. Library crates keep their
own domain errors; this one covers configuration, logging setup and I/O.
*/

pub mod types;

pub use types::{Error, Result};
