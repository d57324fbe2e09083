use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating pole identifiers
    /// Starts with a letter or digit, then letters, digits, spaces, '.', '-' or '_'
    /// - Valid: "A1", "Pole 1", "pole-12", "north_gate", "B.2", "7"
    /// - Invalid: "", " A1", "a/b", "../x", "pole?id=1"
    pub static ref POLE_TYPE_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 ._-]*$").unwrap();
}
