//! Registration, login and the admin gate.

use std::sync::Arc;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::SecretString;

use crate::{
    credential::CredentialPolicy,
    models::{Identity, Role, User},
    session::Sessions,
    store::UserStore,
    Error,
};

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{1,32}$").expect("username pattern compiles"));

/// Fails with [`Error::Forbidden`] unless `identity` is an admin.
pub fn require_admin(identity: &Identity) -> Result<(), Error> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

fn valid_username(username: &str) -> Result<&str, Error> {
    let username = username.trim();
    if USERNAME_REGEX.is_match(username) {
        Ok(username)
    } else {
        Err(Error::validation(
            "Usernames are 1 to 32 letters, digits, `_`, `.` or `-`",
        ))
    }
}

pub struct Gateway {
    users: Arc<dyn UserStore>,
    sessions: Sessions,
    policy: CredentialPolicy,
}

impl Gateway {
    pub fn new(users: Arc<dyn UserStore>, sessions: Sessions, policy: CredentialPolicy) -> Self {
        Self {
            users,
            sessions,
            policy,
        }
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<User, Error> {
        let username = valid_username(username)?;

        let user = User {
            username: username.to_string(),
            password: self.policy.seal(password).await?,
            role,
        };

        if !self.users.insert_user(&user).await? {
            debug!("Refusing duplicate registration of {username}");
            return Err(Error::AlreadyExists(username.to_string()));
        }

        info!("Registered {username} as {role}");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Identity, Error> {
        let Some(user) = self.users.find_user(username.trim()).await? else {
            debug!("Login for unknown user {username}");
            return Err(Error::InvalidCredentials);
        };

        if !self.policy.verify(&user.password, password).await? {
            warn!("Wrong password for {}", user.username);
            return Err(Error::InvalidCredentials);
        }

        Ok(user.identity())
    }

    /// Logs in and opens a session, returning its token.
    pub async fn start_session(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<(String, Identity), Error> {
        let identity = self.login(username, password).await?;
        let token = self.sessions.open(&identity.username).await;
        info!("{} logged in", identity.username);
        Ok((token, identity))
    }

    /// Who holds the session, with their current role.
    pub async fn identify(&self, token: Option<&str>) -> Result<Option<Identity>, Error> {
        let Some(token) = token else {
            return Ok(None);
        };
        let Some(username) = self.sessions.resolve(token).await else {
            return Ok(None);
        };

        Ok(self
            .users
            .find_user(&username)
            .await?
            .map(|user| user.identity()))
    }

    pub async fn logout(&self, token: &str) {
        if self.sessions.close(token).await {
            debug!("Session closed");
        }
    }

    /// Sets a role without an authorization check, for operators.
    pub async fn grant_role(&self, username: &str, role: Role) -> Result<User, Error> {
        let user = self
            .users
            .set_role(username.trim(), role)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User `{}`", username.trim())))?;

        info!("{} is now {role}", user.username);
        Ok(user)
    }

    pub async fn assign_role(
        &self,
        actor: &Identity,
        username: &str,
        role: Role,
    ) -> Result<User, Error> {
        require_admin(actor)?;
        self.grant_role(username, role).await
    }

    pub async fn users(&self, actor: &Identity) -> Result<Vec<User>, Error> {
        require_admin(actor)?;
        self.users.list_users().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::MemoryStore;

    fn gateway() -> Gateway {
        Gateway::new(
            Arc::new(MemoryStore::new()),
            Sessions::new(Duration::from_secs(60)),
            CredentialPolicy::Plaintext,
        )
    }

    fn secret(s: &str) -> SecretString {
        SecretString::new(s.to_string())
    }

    mod register {
        use super::*;

        #[tokio::test]
        async fn defaults_are_kept() {
            let user = gateway()
                .register("sam", &secret("pw1"), Role::default())
                .await
                .unwrap();

            assert_eq!(user.username, "sam");
            assert_eq!(user.role, Role::Angler);
        }

        #[tokio::test]
        async fn duplicate_fails_and_keeps_first_password() {
            let gateway = gateway();
            gateway
                .register("sam", &secret("pw1"), Role::Angler)
                .await
                .unwrap();

            let err = gateway
                .register("sam", &secret("pw2"), Role::Captain)
                .await
                .unwrap_err();

            assert!(matches!(err, Error::AlreadyExists(name) if name == "sam"));
            assert!(gateway.login("sam", &secret("pw1")).await.is_ok());
            assert!(matches!(
                gateway.login("sam", &secret("pw2")).await,
                Err(Error::InvalidCredentials)
            ));
            let identity = gateway.login("sam", &secret("pw1")).await.unwrap();
            assert_eq!(identity.role, Role::Angler);
        }

        #[tokio::test]
        async fn rejects_malformed_usernames() {
            let gateway = gateway();
            let too_long = "x".repeat(33);

            for username in ["", "   ", "has space", "semi;colon", too_long.as_str()] {
                let err = gateway
                    .register(username, &secret("pw"), Role::Angler)
                    .await
                    .unwrap_err();
                assert!(matches!(err, Error::Validation(_)), "{username:?}");
            }
        }

        #[tokio::test]
        async fn trims_usernames() {
            let gateway = gateway();

            let user = gateway
                .register("  sam ", &secret("pw"), Role::Angler)
                .await
                .unwrap();

            assert_eq!(user.username, "sam");
            assert!(gateway.login("sam", &secret("pw")).await.is_ok());
        }

        #[tokio::test]
        async fn hashes_under_argon2_policy() {
            let store = Arc::new(MemoryStore::new());
            let gateway = Gateway::new(
                store.clone(),
                Sessions::new(Duration::from_secs(60)),
                CredentialPolicy::Argon2,
            );

            gateway
                .register("sam", &secret("pw1"), Role::Angler)
                .await
                .unwrap();

            let stored = store.find_user("sam").await.unwrap().unwrap();
            assert_ne!(stored.password, "pw1");
            assert!(gateway.login("sam", &secret("pw1")).await.is_ok());
        }
    }

    mod login {
        use super::*;

        #[tokio::test]
        async fn returns_username_and_role() {
            let gateway = gateway();
            gateway
                .register("cap", &secret("pw"), Role::Captain)
                .await
                .unwrap();

            let identity = gateway.login("cap", &secret("pw")).await.unwrap();

            assert_eq!(
                identity,
                Identity {
                    username: "cap".to_string(),
                    role: Role::Captain
                }
            );
        }

        #[tokio::test]
        async fn unknown_user_is_invalid_credentials() {
            let err = gateway().login("ghost", &secret("pw")).await.unwrap_err();

            assert!(matches!(err, Error::InvalidCredentials));
        }
    }

    mod sessions {
        use super::*;

        #[tokio::test]
        async fn logout_clears_identity() {
            let gateway = gateway();
            gateway
                .register("sam", &secret("pw"), Role::Angler)
                .await
                .unwrap();

            let (token, identity) = gateway.start_session("sam", &secret("pw")).await.unwrap();
            assert_eq!(
                gateway.identify(Some(&token)).await.unwrap(),
                Some(identity)
            );

            gateway.logout(&token).await;

            assert_eq!(gateway.identify(Some(&token)).await.unwrap(), None);
            assert_eq!(gateway.identify(None).await.unwrap(), None);
        }

        #[tokio::test]
        async fn identify_sees_role_changes() {
            let gateway = gateway();
            gateway
                .register("sam", &secret("pw"), Role::Angler)
                .await
                .unwrap();
            let (token, _) = gateway.start_session("sam", &secret("pw")).await.unwrap();

            gateway.grant_role("sam", Role::Admin).await.unwrap();

            let identity = gateway.identify(Some(&token)).await.unwrap().unwrap();
            assert!(identity.is_admin());
        }
    }

    mod admin {
        use super::*;

        async fn with_admin() -> (Gateway, Identity) {
            let gateway = gateway();
            let admin = gateway
                .register("boss", &secret("pw"), Role::Admin)
                .await
                .unwrap()
                .identity();
            gateway
                .register("sam", &secret("pw"), Role::Angler)
                .await
                .unwrap();
            (gateway, admin)
        }

        #[tokio::test]
        async fn admin_assigns_roles() {
            let (gateway, admin) = with_admin().await;

            let user = gateway
                .assign_role(&admin, "sam", Role::Captain)
                .await
                .unwrap();

            assert_eq!(user.role, Role::Captain);
        }

        #[tokio::test]
        async fn captains_and_anglers_are_forbidden() {
            let (gateway, _) = with_admin().await;

            for role in [Role::Angler, Role::Captain] {
                let actor = Identity {
                    username: "sam".to_string(),
                    role,
                };

                assert!(matches!(
                    gateway.assign_role(&actor, "boss", Role::Angler).await,
                    Err(Error::Forbidden)
                ));
                assert!(matches!(gateway.users(&actor).await, Err(Error::Forbidden)));
            }
        }

        #[tokio::test]
        async fn unknown_user_is_not_found() {
            let (gateway, admin) = with_admin().await;

            let err = gateway
                .assign_role(&admin, "ghost", Role::Captain)
                .await
                .unwrap_err();

            assert!(matches!(err, Error::NotFound(_)));
        }

        #[tokio::test]
        async fn lists_users() {
            let (gateway, admin) = with_admin().await;

            let names: Vec<_> = gateway
                .users(&admin)
                .await
                .unwrap()
                .into_iter()
                .map(|user| user.username)
                .collect();

            assert_eq!(names, vec!["boss", "sam"]);
        }
    }
}
