use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::error::KeeperError;
use crate::middleware::body::Validate;
use crate::service::usage::DEFAULT_STEP_COUNT;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Validate for SignupRequest {
    fn validate(&self) -> Result<(), KeeperError> {
        if !looks_like_email(&self.email) {
            return Err(KeeperError::validation("email must be a valid email address"));
        }
        if self.password.chars().count() < 6 {
            return Err(KeeperError::validation(
                "password must be at least 6 characters long",
            ));
        }
        if self.confirm_password != self.password {
            return Err(KeeperError::validation(
                "confirmPassword must match password",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), KeeperError> {
        Ok(())
    }
}

/// Body for creating or updating an application.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRequest {
    pub name: String,
    pub short_description: String,
}

impl Validate for ApplicationRequest {
    fn validate(&self) -> Result<(), KeeperError> {
        check_length("name", &self.name, 2, 64)?;
        check_length("shortDescription", &self.short_description, 30, 480)
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub name: String,
}

impl Validate for TokenRequest {
    fn validate(&self) -> Result<(), KeeperError> {
        check_length("name", &self.name, 2, 64)
    }
}

/// `?sort=&direction=` on list endpoints; parsed by the handler into closed enums.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OauthCallbackQuery {
    pub code: Option<String>,
}

/// `?from=&to=&step=` with millisecond epoch bounds, kept raw so a bad
/// number is reported as a 400 with our own message.
#[derive(Debug, Default, Deserialize)]
pub struct UsageQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub step: Option<String>,
}

impl UsageQuery {
    /// Resolve to `(from, to, step)`, defaulting to the last 24 hours in 12 steps.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>, i64), KeeperError> {
        let from = match self.from.as_deref() {
            Some(raw) => parse_millis("from", raw)?,
            None => now - TimeDelta::hours(24),
        };
        let to = match self.to.as_deref() {
            Some(raw) => parse_millis("to", raw)?,
            None => now,
        };
        let step = match self.step.as_deref() {
            Some(raw) => parse_int("step", raw)?,
            None => DEFAULT_STEP_COUNT,
        };
        Ok((from, to, step))
    }
}

fn parse_int(field: &str, raw: &str) -> Result<i64, KeeperError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| KeeperError::validation(format!("{field} must be an integer")))
}

fn parse_millis(field: &str, raw: &str) -> Result<DateTime<Utc>, KeeperError> {
    let ms = parse_int(field, raw)?;
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| KeeperError::validation(format!("{field} is out of range")))
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), KeeperError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(KeeperError::validation(format!(
            "{field} must be between {min} and {max} characters long"
        )));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signup(email: &str, password: &str, confirm: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn signup_validation() {
        assert!(signup("ada@example.com", "secret1", "secret1").validate().is_ok());
        assert!(signup("ada@example", "secret1", "secret1").validate().is_err());
        assert!(signup("ada.example.com", "secret1", "secret1").validate().is_err());
        assert!(signup("ada@example.com", "short", "short").validate().is_err());
        assert!(signup("ada@example.com", "secret1", "secret2").validate().is_err());
    }

    #[test]
    fn application_lengths_are_bounded() {
        let ok = ApplicationRequest {
            name: "My app".into(),
            short_description: "x".repeat(30),
        };
        assert!(ok.validate().is_ok());

        let short_description = ApplicationRequest {
            name: "My app".into(),
            short_description: "too short".into(),
        };
        assert!(short_description.validate().is_err());

        let long_name = TokenRequest {
            name: "n".repeat(65),
        };
        assert!(long_name.validate().is_err());
    }

    #[test]
    fn usage_query_defaults_to_last_day() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let (from, to, step) = UsageQuery::default().resolve(now).unwrap();
        assert_eq!(to, now);
        assert_eq!(to - from, TimeDelta::hours(24));
        assert_eq!(step, DEFAULT_STEP_COUNT);
    }

    #[test]
    fn usage_query_rejects_non_integers() {
        let query = UsageQuery {
            from: Some("yesterday".into()),
            ..UsageQuery::default()
        };
        let err = query.resolve(Utc::now()).unwrap_err();
        assert!(matches!(err, KeeperError::Validation(_)));
    }
}
