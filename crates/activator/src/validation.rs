use serde_json::Value;

/// Fields every activation request must carry as non-empty strings.
pub const REQUIRED_FIELDS: [&str; 5] = ["name", "role", "isp", "username", "password"];

/// A request that passed field validation.
#[derive(Clone)]
pub struct ActivateRequest {
    pub name: String,
    pub role: String,
    pub isp: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ActivateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivateRequest")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("isp", &self.isp)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Check `body` against the required-field schema.
///
/// Reports every missing, null, non-string or blank field at once. Anything
/// that is not a JSON object is missing all of them. Text fields other than
/// the password are trimmed.
pub fn validate(body: &Value) -> Result<ActivateRequest, Vec<&'static str>> {
    let field = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    };
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|key| field(key).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    let text = |key: &str| field(key).map(|s| s.trim().to_string()).unwrap_or_default();
    Ok(ActivateRequest {
        name: text("name"),
        role: text("role"),
        isp: text("isp"),
        username: text("username"),
        password: field("password").map(str::to_string).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn full() -> Value {
        json!({
            "name": "Zhang San",
            "role": "student",
            "isp": "cdu",
            "username": " 2021001234 ",
            "password": " p@ss ",
        })
    }

    #[test]
    fn complete_request_passes() {
        let req = validate(&full()).unwrap();
        assert_eq!(req.username, "2021001234");
        assert_eq!(req.password, " p@ss ");
        assert_eq!(req.isp, "cdu");
    }

    #[test]
    fn reports_every_missing_field() {
        let body = json!({"name": "x", "isp": "cdu"});
        assert_eq!(validate(&body).unwrap_err(), ["role", "username", "password"]);
    }

    #[test]
    fn null_empty_and_non_string_fields_are_missing() {
        let mut body = full();
        body["role"] = Value::Null;
        body["isp"] = json!("   ");
        body["password"] = json!(123456);
        assert_eq!(validate(&body).unwrap_err(), ["role", "isp", "password"]);
    }

    #[test]
    fn non_object_body_misses_everything() {
        assert_eq!(validate(&Value::Null).unwrap_err(), REQUIRED_FIELDS);
        assert_eq!(validate(&json!([1, 2])).unwrap_err(), REQUIRED_FIELDS);
    }

    #[test]
    fn debug_hides_password() {
        let shown = format!("{:?}", validate(&full()).unwrap());
        assert!(!shown.contains("p@ss"), "{shown}");
    }
}
