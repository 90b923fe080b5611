//! Password hashing and session tokens

use anyhow::{bail, Result};

use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use std::str::FromStr;
use std::time::SystemTime;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AuthToken {
    pub user_id: usize,
    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
    pub value: AuthTokenValue,
}

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        AuthTokenValue(random_string)
    }
}

mod skillwise_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
        Argon2,
    };
    use rand::Rng;

    pub fn generate_b64_salt() -> Result<String> {
        let mut raw = [0u8; 16];
        rand::rng().fill(&mut raw);
        Ok(SaltString::encode_b64(&raw)
            .map_err(|err| anyhow!("{}", err))?
            .to_string())
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> Result<String> {
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default()
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string())
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default()
            .verify_password(plain_pw, &password_hash)
            .is_ok())
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum SkillwiseHasher {
    Argon2,
}

impl FromStr for SkillwiseHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(SkillwiseHasher::Argon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl std::fmt::Display for SkillwiseHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkillwiseHasher::Argon2 => f.write_str("argon2"),
        }
    }
}

impl SkillwiseHasher {
    pub fn generate_b64_salt(&self) -> Result<String> {
        match self {
            SkillwiseHasher::Argon2 => skillwise_argon2::generate_b64_salt(),
        }
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            SkillwiseHasher::Argon2 => skillwise_argon2::hash(plain, b64_salt),
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T) -> Result<bool> {
        match self {
            SkillwiseHasher::Argon2 => {
                skillwise_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
            }
        }
    }

    /// Salts and hashes `plain` in one step, for secrets stored as a single
    /// PHC string (the childlock password).
    pub fn hash_with_new_salt(&self, plain: &str) -> Result<String> {
        let salt = self.generate_b64_salt()?;
        self.hash(plain.as_bytes(), &salt)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UsernamePasswordCredentials {
    pub user_id: usize,
    pub salt: String,
    pub hash: String,
    pub hasher: SkillwiseHasher,

    pub created: SystemTime,
    pub last_tried: Option<SystemTime>,
    pub last_used: Option<SystemTime>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UserAuthCredentials {
    pub user_id: usize,
    pub username_password: Option<UsernamePasswordCredentials>,
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn argon2_hash() {
        let b64_salt = SkillwiseHasher::Argon2.generate_b64_salt().unwrap();

        let hash1 = SkillwiseHasher::Argon2
            .hash(b"123mypw", &b64_salt)
            .unwrap();
        let hash2 = SkillwiseHasher::Argon2
            .hash(b"123mypw", &b64_salt)
            .unwrap();
        assert_eq!(hash1, hash2);

        assert!(SkillwiseHasher::Argon2.verify("123mypw", &hash1).unwrap());
        assert!(!SkillwiseHasher::Argon2.verify("not the pw", &hash1).unwrap());
    }

    #[test]
    fn fresh_salts_differ() {
        let a = SkillwiseHasher::Argon2.hash_with_new_salt("lock").unwrap();
        let b = SkillwiseHasher::Argon2.hash_with_new_salt("lock").unwrap();
        assert_ne!(a, b);
        assert!(SkillwiseHasher::Argon2.verify("lock", &b).unwrap());
    }

    #[test]
    fn hasher_name_roundtrip() {
        let name = SkillwiseHasher::Argon2.to_string();
        assert_eq!(name, "argon2");
        assert_eq!(SkillwiseHasher::from_str(&name).unwrap(), SkillwiseHasher::Argon2);
        assert!(SkillwiseHasher::from_str("md5").is_err());
    }

    #[test]
    fn generated_tokens_are_long_and_unique() {
        let a = AuthTokenValue::generate();
        let b = AuthTokenValue::generate();
        assert_eq!(a.0.len(), 64);
        assert_ne!(a, b);
    }
}
