//! Method-name formatting for builder introspection.
//!
//! Pure string transforms: dependency and service names are rendered in the
//! `withX` / `getX` convention the builder surface advertises. Nothing here
//! touches resolution.

/// Uppercases the first character of `name`.
pub fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Prepends `prefix` to an upper-first rendering of `name`.
pub fn camel_prepend(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, upper_first(name))
}

/// The setter rendering of a dependency name: `meat` becomes `withMeat`.
pub fn setter_method(name: &str) -> String {
    camel_prepend("with", name)
}

/// The accessor rendering of a service name: `breakfast` becomes
/// `getBreakfast`.
pub fn accessor_method(name: &str) -> String {
    camel_prepend("get", name)
}
