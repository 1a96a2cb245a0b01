//! Integration tests driving the release-train binary

mod helpers;
mod test_config;
mod test_hash;
mod test_publish;
