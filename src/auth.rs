// Copyright © 2022 Nikita Dudko. All rights reserved.
// Contacts: <nikita.dudko.95@gmail.com>
// Licensed under the MIT License.

use url::{form_urlencoded, Url};

/// ID of the 'VK Saved Photo Uploader' standalone application.
pub const DEFAULT_APP_ID: u64 = 51709693;
/// The provider's blank page: a token arrives in its URL fragment.
pub const DEFAULT_REDIRECT_URI: &str = "https://oauth.vk.com/blank.html";
/// Remove `offline` to get a limited-time token.
pub const DEFAULT_SCOPE: &str = "photos,offline";

pub struct Secrets {
    pub app_id: u64,
    pub redirect_uri: &'static str,
    pub scope: &'static str,
}

impl Default for Secrets {
    fn default() -> Secrets {
        Secrets {
            app_id: DEFAULT_APP_ID,
            redirect_uri: DEFAULT_REDIRECT_URI,
            scope: DEFAULT_SCOPE,
        }
    }
}

/// An access token paired with ID of the account it belongs to.
/// No expiration date is tracked: the default scope yields a non-expiring token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub owner_id: String,
}

pub fn authorize_url(secrets: &Secrets) -> crate::Result<Url> {
    let app_id = secrets.app_id.to_string();
    let params = [
        ("client_id", app_id.as_str()),
        ("display", "page"),
        ("redirect_uri", secrets.redirect_uri),
        ("scope", secrets.scope),
        ("response_type", "token"),
        ("v", crate::API_VERSION),
    ];
    Ok(Url::parse_with_params(
        format!("{}/authorize", crate::OAUTH_BASE_URL).as_str(),
        &params,
    )?)
}

/// Extracts an access token and an account ID from the URL the browser
/// lands on after consent. VK puts both into the fragment, but the query
/// is checked as well; parameter order doesn't matter. Returns `None`
/// unless both values are present, never a partial pair.
pub fn extract_credential(url: &str) -> Option<Credential> {
    let url = Url::parse(url.trim()).ok()?;
    let fragment = url.fragment().unwrap_or("");

    let mut access_token = None;
    let mut owner_id = None;
    let pairs = url
        .query_pairs()
        .chain(form_urlencoded::parse(fragment.as_bytes()));

    for (key, value) in pairs {
        match key.as_ref() {
            "access_token" if !value.is_empty() => access_token = Some(value.into_owned()),
            "user_id" if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) => {
                owner_id = Some(value.into_owned())
            }
            _ => {}
        }
    }

    match (access_token, owner_id) {
        (Some(access_token), Some(owner_id)) => Some(Credential {
            access_token,
            owner_id,
        }),
        _ => None,
    }
}

/// Opens the authorization page in the user's default browser and asks for
/// the redirect URL until a credential is extracted, at most `max_attempts`
/// times. Persisting the credential is up to the caller.
pub fn request_credential(secrets: &Secrets, max_attempts: usize) -> crate::Result<Credential> {
    let auth_url = authorize_url(secrets)?;

    println!("Opening the authorization page...");
    if let Err(e) = open::that(auth_url.as_str()) {
        eprintln!("Failed to open a URL: {}", e);
        println!("Follow this link manually to grant access to photos: {}", auth_url);
    }

    for _ in 0..max_attempts {
        let url = crate::prompt(
            "Paste the full URL you were redirected to \
            (like https://oauth.vk.com/blank.html#access_token=TOKEN&expires_in=0&user_id=ID): ",
        )?;

        if let Some(credential) = extract_credential(&url) {
            return Ok(credential);
        }
        eprintln!("Couldn't extract a token and an account ID, make sure the URL is complete.\n");
    }
    Err("no valid redirect URL provided".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_from_fragment() {
        let credential = extract_credential(
            "https://oauth.vk.com/blank.html#access_token=ABC123&expires_in=0&user_id=42",
        ).unwrap();
        assert_eq!(credential.access_token, "ABC123");
        assert_eq!(credential.owner_id, "42");
    }

    #[test]
    fn extract_from_query() {
        let credential = extract_credential(
            "https://oauth.vk.com/blank.html?access_token=ABC123&expires_in=0&user_id=42",
        ).unwrap();
        assert_eq!(credential.access_token, "ABC123");
        assert_eq!(credential.owner_id, "42");
    }

    #[test]
    fn extract_is_order_independent() {
        let credential = extract_credential(
            "https://oauth.vk.com/blank.html#user_id=42&expires_in=0&access_token=ABC123",
        ).unwrap();
        assert_eq!(credential.access_token, "ABC123");
        assert_eq!(credential.owner_id, "42");
    }

    #[test]
    fn extract_requires_both_fields() {
        assert!(extract_credential("https://oauth.vk.com/blank.html#access_token=ABC123").is_none());
        assert!(extract_credential("https://oauth.vk.com/blank.html#user_id=42").is_none());
        assert!(extract_credential("https://oauth.vk.com/blank.html").is_none());
    }

    #[test]
    fn extract_rejects_non_numeric_account_id() {
        let url = "https://oauth.vk.com/blank.html#access_token=ABC123&user_id=4x2";
        assert!(extract_credential(url).is_none());
    }

    #[test]
    fn extract_rejects_malformed_url() {
        assert!(extract_credential("not a url").is_none());
    }

    #[test]
    fn authorize_url_parameters() {
        let url = authorize_url(&Secrets::default()).unwrap();
        assert_eq!(url.host_str(), Some("oauth.vk.com"));
        assert_eq!(url.path(), "/authorize");

        let query: Vec<_> = url.query_pairs().collect();
        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, v)| v.to_string())
        };
        assert_eq!(get("client_id"), Some(DEFAULT_APP_ID.to_string()));
        assert_eq!(get("response_type"), Some("token".to_string()));
        assert_eq!(get("scope"), Some(DEFAULT_SCOPE.to_string()));
        assert_eq!(get("v"), Some("5.131".to_string()));
    }
}
