//! Configuration traits for validation and environment overrides.

use crate::error::ConfigError;

/// Types whose values can be checked after loading.
///
/// # Example
///
/// ```rust
/// use coinex_core::config::Validatable;
/// use coinex_core::error::ConfigError;
///
/// struct Endpoint {
///     url: String,
/// }
///
/// impl Validatable for Endpoint {
///     fn validate(&self) -> Result<(), ConfigError> {
///         if self.url.is_empty() {
///             return Err(ConfigError::missing_field("url"));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(Endpoint { url: String::new() }.validate().is_err());
/// ```
pub trait Validatable {
    /// Returns `Ok(())` if the configuration is usable.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Types that accept environment variable overrides.
pub trait Configurable: Sized {
    /// Applies overrides from variables named `{prefix}_...`.
    ///
    /// Unset variables leave the field untouched. A set variable that does
    /// not parse is an error.
    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError>;

    /// Lists the variable names that [`Configurable::apply_env_overrides`] reads.
    fn env_var_names(prefix: &str) -> Vec<String>;
}
