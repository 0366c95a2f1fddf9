pub mod config;

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

/// `1.0 → 1.1`, with `?` for unknown versions.
pub fn version_change(from: Option<&str>, to: Option<&str>) -> String {
    format!("{} → {}", from.unwrap_or("?"), to.unwrap_or("?"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_change_marks_unknown() {
        assert_eq!(version_change(Some("1.0"), Some("1.1")), "1.0 → 1.1");
        assert_eq!(version_change(None, Some("2")), "? → 2");
    }
}
