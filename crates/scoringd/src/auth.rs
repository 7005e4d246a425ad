//! Token authentication for method calls.
//!
//! Regular callers present `sha512(account + login + salt)`. The admin login
//! presents `sha512(YYYYMMDDHH + admin_salt)` for the current local hour.

use chrono::NaiveDateTime;
use scoring_shared::AuthError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_salt")]
    pub salt: String,

    #[serde(default = "default_admin_login")]
    pub admin_login: String,

    #[serde(default = "default_admin_salt")]
    pub admin_salt: String,
}

fn default_salt() -> String {
    "Otus".to_string()
}

fn default_admin_login() -> String {
    "admin".to_string()
}

fn default_admin_salt() -> String {
    "42".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            salt: default_salt(),
            admin_login: default_admin_login(),
            admin_salt: default_admin_salt(),
        }
    }
}

impl AuthSettings {
    pub fn is_admin(&self, login: Option<&str>) -> bool {
        login == Some(self.admin_login.as_str())
    }

    /// Token the caller is expected to present at `now`
    pub fn expected_token(
        &self,
        account: Option<&str>,
        login: Option<&str>,
        now: NaiveDateTime,
    ) -> String {
        let material = if self.is_admin(login) {
            format!("{}{}", now.format("%Y%m%d%H"), self.admin_salt)
        } else {
            format!(
                "{}{}{}",
                account.unwrap_or(""),
                login.unwrap_or(""),
                self.salt
            )
        };
        hex::encode(Sha512::digest(material.as_bytes()))
    }

    pub fn check(
        &self,
        account: Option<&str>,
        login: Option<&str>,
        token: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<(), AuthError> {
        let Some(token) = token else {
            return Err(AuthError);
        };
        let expected = self.expected_token(account, login, now);
        if constant_time_eq(expected.as_bytes(), token.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError)
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (&x, &y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const USER_TOKEN: &str = "6909573a28d6b12900257df0064967141fb2cd5e82b6c269f3aaf49a0b450749e75872e4a717b90687e7f65bac6c59c0865ecafc467da803a634d5d0079ee9f5";
    const ADMIN_TOKEN_2024061512: &str = "a21de837f4b4d27fafbe25eddcbbce2da83f01ed5b56ae66d25d9389e939892259f34d93c344f655588d15d767f6d7501d310bbf472f079248db88a88bfb24cc";

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_user_token() {
        let auth = AuthSettings::default();
        assert_eq!(auth.expected_token(Some("111"), Some("test"), now()), USER_TOKEN);
        assert!(auth.check(Some("111"), Some("test"), Some(USER_TOKEN), now()).is_ok());
        assert!(auth.check(Some("112"), Some("test"), Some(USER_TOKEN), now()).is_err());
        assert!(auth.check(Some("111"), Some("test"), Some("0"), now()).is_err());
        assert!(auth.check(Some("111"), Some("test"), None, now()).is_err());
    }

    #[test]
    fn test_admin_token_is_hour_bound() {
        let auth = AuthSettings::default();
        assert!(auth
            .check(None, Some("admin"), Some(ADMIN_TOKEN_2024061512), now())
            .is_ok());

        let next_hour = now() + chrono::Duration::hours(1);
        assert!(auth
            .check(None, Some("admin"), Some(ADMIN_TOKEN_2024061512), next_hour)
            .is_err());
    }

    #[test]
    fn test_admin_ignores_account() {
        let auth = AuthSettings::default();
        assert_eq!(
            auth.expected_token(Some("111"), Some("admin"), now()),
            auth.expected_token(None, Some("admin"), now())
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
