//! URL utilities for consistent URL handling

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use intervistai::utils::url::normalize_base_url;
///
/// assert_eq!(
///     normalize_base_url("https://generativelanguage.googleapis.com/v1beta/"),
///     "https://generativelanguage.googleapis.com/v1beta"
/// );
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete API endpoint URL from a base URL and endpoint path
///
/// # Examples
///
/// ```
/// use intervistai::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://example.com/v1beta/", "/models/m:generateContent"),
///     "https://example.com/v1beta/models/m:generateContent"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://api.example.com/v1"),
            "https://api.example.com/v1"
        );
        assert_eq!(
            normalize_base_url("https://api.example.com/v1///"),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn test_construct_api_url_joins_single_slash() {
        assert_eq!(
            construct_api_url("http://127.0.0.1:9/v1beta", "models/x:generateContent"),
            "http://127.0.0.1:9/v1beta/models/x:generateContent"
        );
        assert_eq!(
            construct_api_url("http://127.0.0.1:9/v1beta/", "/models"),
            "http://127.0.0.1:9/v1beta/models"
        );
    }
}
