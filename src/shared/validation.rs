use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches every character that may not appear in a public id
    /// - Kept: ASCII letters, digits, '.', '-'
    /// - Replaced: spaces, '_', '/', non-ASCII, everything else
    pub static ref FILENAME_UNSAFE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9.\-]").unwrap();

    /// Trailing file extension, including the dot
    pub static ref FILE_EXTENSION: Regex = Regex::new(r"\.[^.]+$").unwrap();

    /// Public ids accepted by the delete endpoint: folder segments of safe characters
    pub static ref PUBLIC_ID_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9._\-]+(?:/[A-Za-z0-9._\-]+)*$").unwrap();
}
