//! Masking of credentials embedded in request URLs before they reach logs
//! or recorded error messages.

const SECRET_KEY_MARKERS: &[&str] = &["key", "token", "secret", "password"];
const SECRET_KEYS: &[&str] = &["appid"];

/// Mask the values of secret-looking query parameters in `url`.
///
/// A parameter is secret when its lowercase name contains one of
/// `key`, `token`, `secret`, `password`, or is `appId`.
pub fn redact_url(url: &str) -> String {
    let Some((base, rest)) = url.split_once('?') else {
        return url.to_owned();
    };
    let (query, fragment) = match rest.split_once('#') {
        Some((query, fragment)) => (query, Some(fragment)),
        None => (rest, None),
    };

    let masked = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if is_secret_name(name) => format!("{name}={}", mask_value(value)),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&");

    match fragment {
        Some(fragment) => format!("{base}?{masked}#{fragment}"),
        None => format!("{base}?{masked}"),
    }
}

fn is_secret_name(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    SECRET_KEYS.contains(&lowered.as_str())
        || SECRET_KEY_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
}

fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return String::from("***");
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_app_id_and_key_like_parameters() {
        let url = "https://api.test/getStatsData?appId=abcdef123456&statsDataId=0003&api_key=xyz&cdTime=2024";
        assert_eq!(
            redact_url(url),
            "https://api.test/getStatsData?appId=ab***56&statsDataId=0003&api_key=***&cdTime=2024"
        );
    }

    #[test]
    fn keeps_fragment_and_plain_urls() {
        assert_eq!(
            redact_url("https://a.test/x?token=supersecret#p1"),
            "https://a.test/x?token=su***et#p1"
        );
        assert_eq!(redact_url("https://a.test/feed.xml"), "https://a.test/feed.xml");
    }
}
