use super::ModelError;

/// The environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Candidate models, tried in this order.
pub const DEFAULT_CANDIDATES: [&str; 3] = [
    "gemini-2.5-flash",
    "gemini-flash-latest",
    "gemini-pro-latest",
];

pub fn default_candidates() -> Vec<String> {
    DEFAULT_CANDIDATES.iter().map(|m| m.to_string()).collect()
}

/// Read the API key from the environment. Empty values count as missing.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Like [`api_key_from_env`], for commands that can't run without one.
pub fn require_api_key() -> Result<String, ModelError> {
    api_key_from_env().ok_or(ModelError::MissingApiKey(API_KEY_ENV))
}

/// Strip the `models/` prefix the REST API puts on model names.
pub fn short_model_name(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_candidate_order() {
        let models = default_candidates();
        assert_eq!(models.len(), 3);
        assert_eq!(models[0], "gemini-2.5-flash");
        assert!(models.iter().all(|m| m.starts_with("gemini")));
    }

    #[test]
    fn short_names() {
        assert_eq!(short_model_name("models/gemini-2.5-flash"), "gemini-2.5-flash");
        assert_eq!(short_model_name("gemini-pro-latest"), "gemini-pro-latest");
    }

    #[test]
    fn missing_key_error_names_variable() {
        let err = ModelError::MissingApiKey(API_KEY_ENV);
        assert!(err.to_string().contains(API_KEY_ENV));
    }
}
