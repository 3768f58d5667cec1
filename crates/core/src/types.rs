use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::validation::{is_valid_email, ValidationError};

/// Employee record as persisted in the `employees` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub salary: Option<i64>,
    pub department: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub hire_date: Option<DateTime<Utc>>,
}

/// Validated payload used to insert a new employee.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub salary: Option<i64>,
    pub department: Option<String>,
    pub hire_date: DateTime<Utc>,
}

/// Partial update applied to an existing employee.
///
/// Only `name` and `salary` can change after creation. For `salary` the outer
/// `Option` tracks whether the field was supplied at all, so `Some(None)`
/// clears the stored value while `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeChanges {
    pub name: Option<String>,
    pub salary: Option<Option<i64>>,
}

impl EmployeeChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.salary.is_none()
    }
}

/// Body accepted by `POST /employees`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEmployeeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub salary: Option<i64>,
    pub department: Option<String>,
}

impl CreateEmployeeRequest {
    /// Checks name presence, then email presence, then email format.
    pub fn validate(self, hire_date: DateTime<Utc>) -> Result<NewEmployee, ValidationError> {
        let name = self
            .name
            .filter(|name| !name.is_empty())
            .ok_or(ValidationError::NameRequired)?;
        let email = self
            .email
            .filter(|email| !email.is_empty())
            .ok_or(ValidationError::EmailRequired)?;
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail);
        }

        Ok(NewEmployee {
            name,
            email,
            salary: self.salary,
            department: self.department,
            hire_date,
        })
    }
}

/// Body accepted by `PATCH /employees/:id`.
///
/// Keys other than `name` and `salary` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEmployeeRequest {
    #[serde(default, deserialize_with = "deserialize_present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub salary: Option<Option<i64>>,
}

impl UpdateEmployeeRequest {
    /// Converts the request into a change set, rejecting a null or empty name.
    pub fn into_changes(self) -> Result<EmployeeChanges, ValidationError> {
        let name = match self.name {
            None => None,
            Some(Some(name)) if !name.is_empty() => Some(name),
            Some(_) => return Err(ValidationError::NameRequired),
        };

        Ok(EmployeeChanges {
            name,
            salary: self.salary,
        })
    }
}

/// Minimal echo returned after a successful partial update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedEmployee {
    pub id: i64,
    pub name: String,
    pub salary: Option<i64>,
}

impl From<Employee> for UpdatedEmployee {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            name: employee.name,
            salary: employee.salary,
        }
    }
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn serialize_timestamp<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => serializer.serialize_none(),
    }
}
