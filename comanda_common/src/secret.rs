use std::{
    env,
    fmt,
    fmt::{Debug, Display},
};

/// A value that must never end up in logs: API tokens, signing keys and the like. `Debug` and `Display` both print
/// `****`, so a secret can sit inside any config struct that derives `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl Secret<String> {
    /// Reads a secret from the environment variable `name`. Unset and blank variables give `None`.
    pub fn from_env(name: &str) -> Option<Self> {
        env::var(name).ok().filter(|s| !s.trim().is_empty()).map(Self::new)
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl<T: Clone + Default> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
