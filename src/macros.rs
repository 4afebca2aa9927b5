/// Compile a literal regular expression once and hand out a `&'static Regex`.
///
/// Only used with literal patterns written in this crate, so compilation
/// cannot fail at runtime.
macro_rules! regex {
    ($pat:literal) => {{
        static PATTERN: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*PATTERN
    }};
}
