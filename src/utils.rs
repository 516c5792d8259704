//! # Utility Functions Module
//!
//! Small helpers for building external tool command lines.

/// Collect anything printable into owned command-line arguments.
///
/// ```ignore
/// use space_image_shrinker::utils::to_string_vec;
///
/// let quality = 80;
/// let args = to_string_vec(["-quality".to_string(), quality.to_string()]);
/// assert_eq!(args, vec!["-quality", "80"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Build an argument vector from heterogeneous expressions.
///
/// ```ignore
/// use space_image_shrinker::args;
///
/// let quality = 80;
/// let path = std::path::Path::new("in.jpg");
/// let args = args!["-quality", quality, path.display()];
/// assert_eq!(args, vec!["-quality", "80", "in.jpg"]);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$(::std::string::ToString::to_string(&$item)),*]
    };
}
