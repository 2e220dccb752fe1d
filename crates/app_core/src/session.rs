//! Signed-in user session

use app_api::{ApiError, DriveApi};
use drive_proto::UserInfo;

/// What the backend knows about the current browser session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub user: Option<UserInfo>,
}

impl Session {
    /// Ask the backend whether the session is valid, and who it belongs to
    pub async fn fetch(api: &dyn DriveApi) -> Result<Self, ApiError> {
        if !api.check_auth().await? {
            return Ok(Self::default());
        }

        let user = api.user_info().await?;
        tracing::info!("Signed in as {}", user.email);

        Ok(Self {
            authenticated: true,
            user: Some(user),
        })
    }

    pub fn display_name(&self) -> &str {
        match &self.user {
            Some(u) if !u.name.is_empty() => &u.name,
            Some(u) => &u.email,
            None => "(signed out)",
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.email.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeDrive};

    #[tokio::test]
    async fn test_signed_in_fetches_user() {
        let api = FakeDrive::new();
        let session = Session::fetch(api.as_ref()).await.unwrap();
        assert!(session.authenticated);
        assert_eq!(session.email(), Some("me@example.com"));
        assert_eq!(session.display_name(), "Me");
        assert_eq!(api.calls(), vec![Call::CheckAuth, Call::UserInfo]);
    }

    #[tokio::test]
    async fn test_signed_out_skips_user_info() {
        let api = FakeDrive::new();
        api.set_authenticated(false);
        let session = Session::fetch(api.as_ref()).await.unwrap();
        assert_eq!(session, Session::default());
        assert_eq!(api.calls(), vec![Call::CheckAuth]);
    }
}
