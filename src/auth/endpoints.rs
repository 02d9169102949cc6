/// URL constants for Flickr's OAuth 1.0a token endpoints.

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub request_token: &'static str,
    pub authorize: &'static str,
    pub access_token: &'static str,
}

impl Endpoints {
    pub const fn flickr() -> Self {
        Self {
            request_token: "https://www.flickr.com/services/oauth/request_token",
            authorize: "https://www.flickr.com/services/oauth/authorize",
            access_token: "https://www.flickr.com/services/oauth/access_token",
        }
    }

    /// Page the user visits to grant `perms` to the request token.
    pub fn authorize_url(&self, request_token: &str, perms: &str) -> String {
        format!(
            "{}?oauth_token={}&perms={}",
            self.authorize,
            urlencoding::encode(request_token),
            urlencoding::encode(perms)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        assert_eq!(
            Endpoints::flickr().authorize_url("72157-abc", "write"),
            "https://www.flickr.com/services/oauth/authorize?oauth_token=72157-abc&perms=write"
        );
    }
}
