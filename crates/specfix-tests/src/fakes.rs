//! A fake users database and the factories that build test data for it.
//!
//! The factories are provided functions, so they resolve fresh data on every
//! call and compose as specs: `testdb()` resolves three `user()`s, each of
//! which resolves its own `password()`.

use std::path::{Path, PathBuf};

use specfix_provide::{provide, Function, Provided, Signature};
use specfix_spec::combinators::{between, choice, choices};
use specfix_spec::{BoxError, Kind, Object, Spec, Teardown};
use tempfile::TempDir;
use thiserror::Error;

pub const DIGITS: &str = "0123456789";
pub const ASCII_UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const ASCII_LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub password: String,
}

/// Bounds on password length, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_len: 8,
            max_len: 15,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InsertError {
    #[error("User with username '{0}' exists already!")]
    UsernameTaken(String),

    #[error("Password size must be between {min} and {max}")]
    PasswordLength { min: usize, max: usize },

    #[error("Password must contain a number")]
    NoDigit,

    #[error("Password must contain an uppercase letter")]
    NoUppercase,

    #[error("Password must contain a lowercase letter")]
    NoLowercase,
}

#[derive(Debug, Default)]
pub struct UsersDb {
    pub users: Vec<User>,
    pub policy: PasswordPolicy,
    /// Number of times the database was torn down.
    pub teardowns: usize,
}

impl UsersDb {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn usernames(&self) -> Vec<String> {
        self.users.iter().map(|u| u.username.clone()).collect()
    }

    pub fn insert(&mut self, user: User) -> Result<(), InsertError> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(InsertError::UsernameTaken(user.username));
        }

        let PasswordPolicy { min_len, max_len } = self.policy;
        let len = user.password.chars().count();
        if !(min_len..=max_len).contains(&len) {
            return Err(InsertError::PasswordLength {
                min: min_len,
                max: max_len,
            });
        }

        let password = &user.password;
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(InsertError::NoDigit);
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(InsertError::NoUppercase);
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(InsertError::NoLowercase);
        }

        self.users.push(user);
        Ok(())
    }
}

impl Teardown for UsersDb {
    fn teardown(&mut self) -> Result<(), BoxError> {
        self.users.clear();
        self.teardowns += 1;
        Ok(())
    }
}

/// A password with a digit, an uppercase and a lowercase letter, 8 to 15
/// characters long.
pub fn password() -> Provided<String> {
    provide()
        .with("digit", choice([DIGITS]))
        .with("uppercase", choice([ASCII_UPPERCASE]))
        .with("lowercase", choice([ASCII_LOWERCASE]))
        .with("chars", choices([Kind::Text], Some(between(5, 12))))
        .apply(Function::new(
            Signature::named(["uppercase", "lowercase", "digit", "chars"]),
            |_, kw| {
                Ok([
                    kw.text("uppercase")?,
                    kw.text("lowercase")?,
                    kw.text("digit")?,
                    kw.text("chars")?,
                ]
                .concat())
            },
        ))
}

/// A [`User`] wrapped in an object handle.
pub fn user() -> Provided<Object> {
    provide()
        .with("id", Kind::Text)
        .with("firstname", choice(["John", "Jane", "Orange"]))
        .with("lastname", choice(["Smith", "Doe", "Carrot"]))
        .with("username", choices([ASCII_LOWERCASE], Some(between(5, 10))))
        .with("password", password())
        .apply(Function::new(
            Signature::named(["id", "firstname", "lastname", "username", "password"]),
            |_, kw| {
                Ok(Object::new(User {
                    id: kw.text("id")?.to_string(),
                    firstname: kw.text("firstname")?.to_string(),
                    lastname: kw.text("lastname")?.to_string(),
                    username: kw.text("username")?.to_string(),
                    password: kw.text("password")?.to_string(),
                }))
            },
        ))
}

/// A tearable [`UsersDb`] seeded with three users.
pub fn testdb() -> Provided<Object> {
    provide()
        .with("users", Spec::repeat(user(), 3))
        .apply(Function::new(Signature::named(["users"]), |_, kw| {
            let mut users = Vec::new();
            for item in kw.items("users")? {
                let user = item
                    .as_object()
                    .and_then(|obj| obj.borrow::<User>().map(|u| u.clone()))
                    .ok_or("users must hold User objects")?;
                users.push(user);
            }
            Ok(Object::tearable(UsersDb::new(users)))
        }))
}

/// A temporary directory removed on teardown.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("specfix-").tempdir()?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true until the directory has been torn down.
    pub fn is_open(&self) -> bool {
        self.dir.is_some()
    }
}

impl Teardown for ScratchDir {
    fn teardown(&mut self) -> Result<(), BoxError> {
        match self.dir.take() {
            Some(dir) => Ok(dir.close()?),
            None => Err(format!("{} was already removed", self.path.display()).into()),
        }
    }
}

/// A spec creating a fresh [`ScratchDir`] on every resolution.
pub fn scratch_dir() -> Spec {
    Spec::lazy(|| ScratchDir::new().map(Spec::tearable))
}
