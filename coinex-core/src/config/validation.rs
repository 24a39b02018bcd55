//! Configuration validation and environment override helpers.

use crate::error::ConfigError;

/// Result type for validation operations.
pub type ValidationResult = Result<(), ConfigError>;

/// Tracks the current section path and collects validation errors.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    path: Vec<String>,
    errors: Vec<ConfigError>,
}

impl ValidationContext {
    /// Creates a new validation context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a nested section.
    pub fn enter(&mut self, section: impl Into<String>) {
        self.path.push(section.into());
    }

    /// Leaves the current section.
    pub fn exit(&mut self) {
        self.path.pop();
    }

    /// Returns the current path as a dot-separated string.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Records a validation error.
    pub fn add_error(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// Returns true if no errors were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the collected errors.
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// Consumes the context and returns the first error, if any.
    pub fn into_result(self) -> ValidationResult {
        self.errors.into_iter().next().map_or(Ok(()), Err)
    }

    fn missing_field(&self, field: &str) -> ConfigError {
        if self.path.is_empty() {
            ConfigError::missing_field(field)
        } else {
            ConfigError::missing_field_in_section(field, self.current_path())
        }
    }

    fn invalid_value(&self, field: &str, reason: impl Into<String>) -> ConfigError {
        let full_field = if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{field}", self.current_path())
        };
        ConfigError::invalid_value(full_field, reason)
    }
}

/// Fluent field checks that record into a [`ValidationContext`].
#[derive(Debug)]
pub struct Validator<'a> {
    ctx: &'a mut ValidationContext,
}

impl<'a> Validator<'a> {
    /// Creates a new validator over the given context.
    pub fn new(ctx: &'a mut ValidationContext) -> Self {
        Self { ctx }
    }

    /// Requires a string field to be non-empty.
    pub fn require_non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            let error = self.ctx.missing_field(field);
            self.ctx.add_error(error);
        }
        self
    }

    /// Requires a value to lie within `[min, max]`.
    pub fn in_range<T: PartialOrd + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
        min: &T,
        max: &T,
    ) -> &mut Self {
        if value < min || value > max {
            let error = self.ctx.invalid_value(
                field,
                format!("Value {value} must be between {min} and {max}"),
            );
            self.ctx.add_error(error);
        }
        self
    }

    /// Requires a value to be strictly positive.
    pub fn positive<T: PartialOrd + Default + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
    ) -> &mut Self {
        if *value <= T::default() {
            let error = self
                .ctx
                .invalid_value(field, format!("Value {value} must be positive"));
            self.ctx.add_error(error);
        }
        self
    }

    /// Requires a URL with one of the given schemes.
    pub fn url_with_scheme(&mut self, field: &str, value: &str, schemes: &[&str]) -> &mut Self {
        let ok = schemes.iter().any(|scheme| {
            value
                .strip_prefix(*scheme)
                .and_then(|rest| rest.strip_prefix("://"))
                .is_some_and(|host| !host.is_empty())
        });
        if !ok {
            let error = self.ctx.invalid_value(
                field,
                format!("Must be a {} URL", schemes.join(" or ")),
            );
            self.ctx.add_error(error);
        }
        self
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Applies environment values onto configuration fields.
///
/// The lookup is injectable so overrides can be tested without touching the
/// process environment.
///
/// ```rust
/// use coinex_core::config::EnvOverride;
///
/// let env = EnvOverride::from_fn(|name| (name == "APP_RETRIES").then(|| "7".to_string()));
/// let mut retries = 3u32;
/// env.apply_number("APP_RETRIES", &mut retries).unwrap();
/// assert_eq!(retries, 7);
/// ```
pub struct EnvOverride<F> {
    lookup: F,
}

impl EnvOverride<fn(&str) -> Option<String>> {
    /// Reads from the process environment.
    #[must_use]
    pub fn process() -> Self {
        Self {
            lookup: process_env,
        }
    }
}

impl<F> EnvOverride<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Reads from an arbitrary lookup function.
    pub fn from_fn(lookup: F) -> Self {
        Self { lookup }
    }

    /// Overrides a string field.
    pub fn apply_string(&self, var_name: &str, target: &mut String) {
        if let Some(value) = (self.lookup)(var_name) {
            *target = value;
        }
    }

    /// Overrides any field convertible from a string.
    pub fn apply_into<T: From<String>>(&self, var_name: &str, target: &mut T) {
        if let Some(value) = (self.lookup)(var_name) {
            *target = T::from(value);
        }
    }

    /// Overrides a numeric field.
    pub fn apply_number<T>(&self, var_name: &str, target: &mut T) -> Result<(), ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = (self.lookup)(var_name) {
            *target = value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar {
                name: var_name.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Overrides a boolean field. Accepts true/false, 1/0, yes/no and on/off.
    pub fn apply_bool(&self, var_name: &str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(value) = (self.lookup)(var_name) {
            *target = match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                other => {
                    return Err(ConfigError::InvalidEnvVar {
                        name: var_name.to_string(),
                        reason: format!("'{other}' is not a boolean"),
                    });
                }
            };
        }
        Ok(())
    }
}
