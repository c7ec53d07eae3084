use std::fmt;

use url::form_urlencoded;

use crate::sources::credentials::Credentials;

/// The token requests this crate knows how to send.
#[derive(Clone, PartialEq, Eq)]
pub enum Grant {
    Password {
        client_id: String,
        username: String,
        password: String,
    },
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

impl Grant {
    /// Picks the grant for the configured credentials, password first.
    pub fn from_credentials(creds: &Credentials) -> Option<Grant> {
        if creds.have_password() {
            Some(Grant::Password {
                client_id: creds.client_id.clone(),
                username: creds.user.clone(),
                password: creds.password.clone(),
            })
        } else if creds.have_secret() {
            Some(Grant::ClientCredentials {
                client_id: creds.client_id.clone(),
                client_secret: creds.client_secret.clone(),
            })
        } else {
            None
        }
    }

    pub fn refresh(creds: &Credentials, refresh_token: &str) -> Grant {
        Grant::RefreshToken {
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
            refresh_token: refresh_token.to_owned(),
        }
    }

    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::Password { .. } => "password",
            Grant::ClientCredentials { .. } => "client_credentials",
            Grant::RefreshToken { .. } => "refresh_token",
        }
    }

    /// Form fields in the order they are sent.
    pub fn form(&self, scopes: &[String]) -> Vec<(&'static str, String)> {
        let mut form = vec![("grant_type", self.grant_type().to_owned())];
        match self {
            Grant::Password {
                client_id,
                username,
                password,
            } => {
                form.push(("client_id", client_id.clone()));
                form.push(("username", username.clone()));
                form.push(("password", password.clone()));
            }
            Grant::ClientCredentials {
                client_id,
                client_secret,
            } => {
                form.push(("client_id", client_id.clone()));
                form.push(("client_secret", client_secret.clone()));
            }
            Grant::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            } => {
                form.push(("client_id", client_id.clone()));
                form.push(("client_secret", client_secret.clone()));
                form.push(("refresh_token", refresh_token.clone()));
            }
        }
        form.push(("scope", scopes.join(" ")));
        form
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn encode(&self, scopes: &[String]) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.form(scopes))
            .finish()
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grant")
            .field("grant_type", &self.grant_type())
            .finish_non_exhaustive()
    }
}
