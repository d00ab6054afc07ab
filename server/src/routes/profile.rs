//! Registration form fields shared by the patient and caregiver routes.
//!
//! The dashboard posts camelCase keys (`firstName`, `dob`), sends `""` for
//! untouched inputs, and sends height/weight as text. Bodies accept both
//! spellings and validate into the service-layer `Profile` types.

use serde::Deserialize;

use crate::services::profile::{Profile, ProfileChanges};
use crate::validate::{
    NumberOrText, Validated, email, languages, measurement, optional_date, optional_email, optional_text, phone,
    required,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileBody {
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    #[serde(default, alias = "middleName")]
    pub middle_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "dob", alias = "dateOfBirth")]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub height: Option<NumberOrText>,
    #[serde(default)]
    pub weight: Option<NumberOrText>,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl ProfileBody {
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn validate(self) -> Validated<Profile> {
        Ok(Profile {
            first_name: required("first_name", &self.first_name)?,
            middle_name: optional_text(self.middle_name),
            last_name: required("last_name", &self.last_name)?,
            phone: phone("phone", &required("phone", &self.phone)?)?,
            email: optional_email("email", self.email)?,
            address: optional_text(self.address),
            date_of_birth: optional_date("date_of_birth", self.date_of_birth)?,
            gender: optional_text(self.gender),
            height: measurement("height", self.height)?,
            weight: measurement("weight", self.weight)?,
            languages: languages(self.languages),
        })
    }
}

/// Partial profile for `PATCH`. Absent and blank fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChangesBody {
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "middleName")]
    pub middle_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "dob", alias = "dateOfBirth")]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub height: Option<NumberOrText>,
    #[serde(default)]
    pub weight: Option<NumberOrText>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
}

impl ProfileChangesBody {
    /// # Errors
    ///
    /// Returns the first provided field that fails validation.
    pub fn validate(self) -> Validated<ProfileChanges> {
        Ok(ProfileChanges {
            first_name: optional_text(self.first_name),
            middle_name: optional_text(self.middle_name),
            last_name: optional_text(self.last_name),
            phone: optional_text(self.phone).map(|p| phone("phone", &p)).transpose()?,
            email: optional_text(self.email).map(|e| email("email", &e)).transpose()?,
            address: optional_text(self.address),
            date_of_birth: optional_date("date_of_birth", self.date_of_birth)?,
            gender: optional_text(self.gender),
            height: measurement("height", self.height)?,
            weight: measurement("weight", self.weight)?,
            languages: self.languages.map(languages),
        })
    }
}
