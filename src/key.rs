//! Type keys for bean storage and lookup.

use std::any::TypeId;
use std::fmt;

/// Type identity of a bean, a slot element or a capability.
///
/// Works for concrete types and trait objects alike: `TypeKey::of::<Database>()`
/// and `TypeKey::of::<dyn Storage>()` are both valid keys. Equality, ordering and
/// hashing use the `TypeId` only; the name is carried for diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::TypeKey;
///
/// trait Storage: Send + Sync {}
///
/// let concrete = TypeKey::of::<String>();
/// let capability = TypeKey::of::<dyn Storage>();
///
/// assert_eq!(concrete, TypeKey::of::<String>());
/// assert_ne!(concrete, capability);
/// assert_eq!(concrete.name(), "alloc::string::String");
/// assert!(capability.name().contains("Storage"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T`, which may be unsized (`dyn Trait`).
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Printable type name, as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module path, used for default bean names.
    ///
    /// ```rust
    /// use ferrous_beans::TypeKey;
    ///
    /// assert_eq!(TypeKey::of::<String>().short_name(), "String");
    /// assert_eq!(TypeKey::of::<Vec<String>>().short_name(), "Vec<String>");
    /// ```
    pub fn short_name(&self) -> String {
        shorten(self.name)
    }
}

// TypeId-only comparison; two keys with the same id always carry the same name
impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Strips module paths from every path segment of a type name.
fn shorten(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut segment = String::new();
    for ch in name.chars() {
        match ch {
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                out.push_str(last_segment(&segment));
                segment.clear();
                out.push(ch);
            }
            _ => segment.push(ch),
        }
    }
    out.push_str(last_segment(&segment));
    out
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
