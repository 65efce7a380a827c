use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, SET_COOKIE};

/// Authenticated upstream session.
///
/// `cookies` is sent back verbatim as the `Cookie` header.
#[derive(Debug, Clone)]
pub struct Session {
    pub cookies: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Collect `name=value` pairs from every `Set-Cookie` header.
pub fn cookie_blob(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// The login endpoint answers 200 even for bad credentials and reports the
/// failure in the body.
pub fn login_rejected(body: &str) -> bool {
    let body = body.to_lowercase();
    body.contains("login") && body.contains("error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_cookie_blob() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("chocolatechip=abc123; path=/; HttpOnly"));
        headers.append(SET_COOKIE, HeaderValue::from_static("spacetrack_csrf_cookie=xyz; path=/"));

        assert_eq!(
            cookie_blob(&headers).as_deref(),
            Some("chocolatechip=abc123; spacetrack_csrf_cookie=xyz")
        );
        assert_eq!(cookie_blob(&HeaderMap::new()), None);
    }

    #[test]
    fn test_login_rejected() {
        assert!(login_rejected(r#"{"Login":"Failed","error":"bad password"}"#));
        assert!(!login_rejected(r#""""#));
        assert!(!login_rejected("Internal error"));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            cookies: "a=b".to_string(),
            expires_at: now + Duration::minutes(30),
        };
        assert!(session.is_valid_at(now));
        assert!(!session.is_valid_at(now + Duration::minutes(30)));
    }
}
