//! Password sealing and verification.

use std::str::FromStr;

use log::{debug, warn};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::Error;

const ARGON2_PREFIX: &str = "$argon2";

/// How new credentials are stored.
///
/// `Plaintext` keeps the password verbatim. Use it for tests only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialPolicy {
    #[default]
    Argon2,
    Plaintext,
}

impl FromStr for CredentialPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "argon2" => Ok(Self::Argon2),
            "plaintext" => Ok(Self::Plaintext),
            other => Err(Error::validation(format!(
                "Unknown credential policy `{other}`"
            ))),
        }
    }
}

impl CredentialPolicy {
    /// Encodes `password` for storage.
    pub async fn seal(self, password: &SecretString) -> Result<String, Error> {
        match self {
            Self::Plaintext => Ok(password.expose_secret().clone()),
            Self::Argon2 => {
                let password = SecretString::new(password.expose_secret().clone());
                let salt: [u8; 16] = rand::thread_rng().gen();

                let encoded = task::spawn_blocking(move || {
                    argon2::hash_encoded(
                        password.expose_secret().as_bytes(),
                        &salt,
                        &argon2::Config::default(),
                    )
                })
                .await??;

                Ok(encoded)
            }
        }
    }

    /// Checks `password` against a stored credential.
    ///
    /// Argon2 hashes always verify, whatever the policy. Verbatim credentials
    /// only match under [`CredentialPolicy::Plaintext`], and are compared
    /// before anything is decoded as a hash.
    pub async fn verify(self, stored: &str, password: &SecretString) -> Result<bool, Error> {
        if self == Self::Plaintext && stored == password.expose_secret().as_str() {
            return Ok(true);
        }

        if stored.starts_with(ARGON2_PREFIX) {
            let stored = stored.to_string();
            let password = SecretString::new(password.expose_secret().clone());

            let verified = task::spawn_blocking(move || {
                argon2::verify_encoded(&stored, password.expose_secret().as_bytes())
            })
            .await?;

            return match verified {
                Ok(matches) => Ok(matches),
                Err(argon2::Error::DecodingFail) => {
                    debug!("Stored credential looks like an argon2 hash but is not one");
                    Ok(false)
                }
                Err(err) => Err(err.into()),
            };
        }

        match self {
            Self::Plaintext => Ok(false),
            Self::Argon2 => {
                warn!("Refusing unhashed credential while the argon2 policy is active");
                Ok(false)
            }
        }
    }
}
