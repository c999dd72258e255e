pub mod fingerprint;
pub mod item;

pub use fingerprint::{prefixed_seed, suffixed_seed, Fingerprint};
pub use item::Item;
