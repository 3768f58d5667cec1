//! Employee record model shared by the storage and HTTP layers.
pub mod types;
pub mod validation;

pub use types::{
    CreateEmployeeRequest, Employee, EmployeeChanges, NewEmployee, UpdateEmployeeRequest,
    UpdatedEmployee,
};
pub use validation::{is_valid_email, ValidationError};
