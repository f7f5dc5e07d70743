use serde::{Deserialize, Serialize};

pub const NAME_MAX: usize = 20;
pub const TITLE_MAX: usize = 60;
pub const YEAR_MAX: usize = 4;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub name: String,
    pub username: String,
    pub password_hash: String,
}

impl User {
    pub fn set_password(&mut self, password: &str) -> Result<(), bcrypt::BcryptError> {
        self.password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        Ok(())
    }

    // A row without a usable digest (e.g. freshly forged) must fail the
    // check, not error out.
    pub fn validate_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

pub fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().count() <= NAME_MAX
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Movie {
    pub title: String,
    pub year: String,
}

impl Movie {
    // The year is free-form text, only its length is checked.
    pub fn valid(&self) -> bool {
        !self.title.is_empty()
            && !self.year.is_empty()
            && self.title.chars().count() <= TITLE_MAX
            && self.year.chars().count() <= YEAR_MAX
    }
}
