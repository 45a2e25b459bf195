use once_cell::sync::Lazy;
use std::time::{SystemTime, UNIX_EPOCH};

pub static RUNTIME: Lazy<std::io::Result<tokio::runtime::Runtime>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
});

/// Adds a scheme when missing and drops trailing slashes. Loopback hosts
/// default to plain http since the backend is usually a local dev server.
/// An explicit scheme is kept even when nothing follows it, so a bare
/// `http://` still fails to parse later.
pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    for scheme in ["http://", "https://"] {
        if let Some(rest) = trimmed.strip_prefix(scheme) {
            return format!("{}{}", scheme, rest.trim_end_matches('/'));
        }
    }
    let rest = trimmed.trim_end_matches('/');
    if rest.starts_with("localhost") || rest.starts_with("127.0.0.1") {
        format!("http://{}", rest)
    } else {
        format!("https://{}", rest)
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Keeps only the last four digits for log output.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        return "****".into();
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("***{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_scheme() {
        assert_eq!(normalize_url("localhost:8000/"), "http://localhost:8000");
        assert_eq!(normalize_url(" api.example.com "), "https://api.example.com");
        assert_eq!(normalize_url("http://10.0.0.2:8000//"), "http://10.0.0.2:8000");
    }

    #[test]
    fn normalize_keeps_bare_scheme() {
        assert_eq!(normalize_url("http://"), "http://");
        assert_eq!(normalize_url("https:///"), "https://");
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(""));
        assert!(is_blank("  \n\t"));
        assert!(!is_blank(" a "));
    }

    #[test]
    fn phone_masking() {
        assert_eq!(mask_phone("+1 555 123 4567"), "***4567");
        assert_eq!(mask_phone("12"), "****");
    }
}
