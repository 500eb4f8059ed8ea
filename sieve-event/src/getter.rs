/// Borrowed value of a field resolved through a [`Getter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Val<'a> {
    /// A boolean value.
    Bool(bool),
    /// A string value.
    String(&'a str),
}

impl<'a> Val<'a> {
    /// Returns the value if it is a boolean, otherwise `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string if this value is a string, otherwise `None`.
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for Val<'_> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<'a> From<&'a str> for Val<'a> {
    fn from(value: &'a str) -> Self {
        Self::String(value)
    }
}

impl<'a> From<&'a String> for Val<'a> {
    fn from(value: &'a String) -> Self {
        Self::String(value.as_str())
    }
}

/// A type that supports field access by paths.
///
/// Paths are dotted and carry the name of the root object, for example `event.user.id`. Paths
/// that do not exist, or that point to an empty value, resolve to `None`.
///
/// # Example
///
/// ```
/// use sieve_event::{Getter, Val};
///
/// struct Root {
///     name: String,
/// }
///
/// impl Getter for Root {
///     fn get_value(&self, path: &str) -> Option<Val<'_>> {
///         match path.strip_prefix("root.")? {
///             "name" => Some(self.name.as_str().into()),
///             _ => None,
///         }
///     }
/// }
///
/// let root = Root { name: "sieve".to_owned() };
/// assert_eq!(root.get_value("root.name"), Some(Val::String("sieve")));
/// assert_eq!(root.get_value("root.other"), None);
/// ```
pub trait Getter {
    /// Returns the value of a field pointed to by a `path`.
    fn get_value(&self, path: &str) -> Option<Val<'_>>;
}

impl<T: Getter + ?Sized> Getter for &T {
    fn get_value(&self, path: &str) -> Option<Val<'_>> {
        (**self).get_value(path)
    }
}

/// Treats empty strings as missing values.
pub(crate) fn or_none(string: &impl AsRef<str>) -> Option<&str> {
    match string.as_ref() {
        "" => None,
        other => Some(other),
    }
}
