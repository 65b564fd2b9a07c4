//! Identity resolver: callers keyed by network address

use diesel::prelude::*;

use super::diesel_schema::users;
use super::models::{current_timestamp, NewUser, User};
use crate::error::CrediError;

/// Get a user by address
pub fn get_user(conn: &mut SqliteConnection, ip: &str) -> Result<Option<User>, CrediError> {
    users::table
        .find(ip)
        .select(User::as_select())
        .first(conn)
        .optional()
        .map_err(CrediError::from)
}

/// Get a user by address, creating the record on first sight
pub fn get_or_create_user(conn: &mut SqliteConnection, ip: &str) -> Result<User, CrediError> {
    if let Some(user) = get_user(conn, ip)? {
        return Ok(user);
    }

    let now = current_timestamp();
    diesel::insert_into(users::table)
        .values(&NewUser { ip, created_at: &now })
        .execute(conn)?;

    Ok(User {
        ip: ip.to_string(),
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut conn = test_connection();

        assert!(get_user(&mut conn, "203.0.113.7").unwrap().is_none());

        let first = get_or_create_user(&mut conn, "203.0.113.7").unwrap();
        let second = get_or_create_user(&mut conn, "203.0.113.7").unwrap();

        assert_eq!(first.ip, "203.0.113.7");
        assert_eq!(first.created_at, second.created_at);

        let count: i64 = users::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_ipv6_address_fits() {
        let mut conn = test_connection();
        let ip = "2001:0db8:85a3:0000:0000:8a2e:0370:7334";
        get_or_create_user(&mut conn, ip).unwrap();
        assert!(get_user(&mut conn, ip).unwrap().is_some());
    }
}
