/// Returns `true` if the given value is the default value of its type.
pub fn is_default<T: Default + PartialEq>(t: &T) -> bool {
    *t == T::default()
}
