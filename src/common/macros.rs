/// Converts a vector of values to a vector of strings.
#[macro_export]
macro_rules! vec_to_strings {
    ($($x:expr),*) => (vec![$($x.to_string()),*]);
}
