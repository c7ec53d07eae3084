use std::fmt;

/// Grant inputs fixed at construction time.
#[derive(Clone, Default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user: String,
    pub password: String,
    pub scopes: Vec<String>,
}

impl Credentials {
    pub fn have_password(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }

    pub fn have_secret(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("user", &self.user)
            .field("password", &redacted(&self.password))
            .field("scopes", &self.scopes)
            .finish()
    }
}

pub(crate) fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "***"
    }
}
