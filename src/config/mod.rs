pub mod digest;

pub use digest::{load_digest_config_default, load_digest_config_from, DigestConfig, FilterRule};
