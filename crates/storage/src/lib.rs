use std::{str::FromStr, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    QueryBuilder, Sqlite, SqlitePool,
};
use thiserror::Error;

use employee_directory_core::{Employee, EmployeeChanges, NewEmployee};

const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

const EMPLOYEE_COLUMNS: &str = "id, name, email, salary, department, hire_date";

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    ///
    /// The database file is created when it does not exist yet.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Options)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Opens a private in-memory database backed by a single connection.
    ///
    /// Every call yields an isolated database, which keeps tests independent.
    pub async fn connect_in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(StorageError::Options)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to interact with the employees table.
    pub fn employees(&self) -> EmployeeRepository {
        EmployeeRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid sqlite connection options: {0}")]
    Options(sqlx::Error),
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository responsible for interacting with the `employees` table.
#[derive(Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    /// Lists every employee in insertion order.
    pub async fn list_all(&self) -> Result<Vec<Employee>, EmployeeError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EmployeeRow::into_domain).collect())
    }

    /// Lists employees whose department exactly matches `department`.
    pub async fn list_by_department(
        &self,
        department: &str,
    ) -> Result<Vec<Employee>, EmployeeError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE department = ? ORDER BY id"
        ))
        .bind(department)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EmployeeRow::into_domain).collect())
    }

    /// Loads a single employee by id.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Employee>, EmployeeError> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EmployeeRow::into_domain))
    }

    /// Inserts a new employee and returns the stored record with its assigned id.
    pub async fn insert(&self, employee: &NewEmployee) -> Result<Employee, EmployeeError> {
        let result = sqlx::query_as::<_, EmployeeRow>(&format!(
            "INSERT INTO employees (name, email, salary, department, hire_date) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING {EMPLOYEE_COLUMNS}"
        ))
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(employee.salary)
        .bind(&employee.department)
        .bind(to_rfc3339(employee.hire_date))
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into_domain()),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_UNIQUE) {
                    return Err(EmployeeError::DuplicateEmail);
                }
                Err(EmployeeError::Database(sqlx::Error::Database(db_err)))
            }
            Err(err) => Err(EmployeeError::Database(err)),
        }
    }

    /// Applies only the fields present in `changes`, leaving the rest untouched.
    ///
    /// Returns `None` when no employee has the given id.
    pub async fn update_fields(
        &self,
        id: i64,
        changes: &EmployeeChanges,
    ) -> Result<Option<Employee>, EmployeeError> {
        if changes.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE employees SET ");
        let mut assignments = builder.separated(", ");
        if let Some(name) = &changes.name {
            assignments.push("name = ");
            assignments.push_bind_unseparated(name.clone());
        }
        if let Some(salary) = changes.salary {
            assignments.push("salary = ");
            assignments.push_bind_unseparated(salary);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {EMPLOYEE_COLUMNS}"));

        let row = builder
            .build_query_as::<EmployeeRow>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(EmployeeRow::into_domain))
    }

    /// Deletes the employee, returning `true` when a row was removed.
    pub async fn delete_by_id(&self, id: i64) -> Result<bool, EmployeeError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Row representation of the `employees` table.
#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: i64,
    name: String,
    email: String,
    salary: Option<i64>,
    department: Option<String>,
    hire_date: Option<DateTime<Utc>>,
}

impl EmployeeRow {
    fn into_domain(self) -> Employee {
        Employee {
            id: self.id,
            name: self.name,
            email: self.email,
            salary: self.salary,
            department: self.department,
            hire_date: self.hire_date,
        }
    }
}

/// Errors that can occur while reading or mutating employees.
#[derive(Debug, Error)]
pub enum EmployeeError {
    #[error("an employee with the same email already exists")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for EmployeeError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
