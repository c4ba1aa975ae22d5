//! Configuration access port trait.

/// Raw string lookup; typed parsing and validation live in
/// [`crate::domain::config_validation`].
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn sections(&self) -> Vec<String>;
}
