use crate::config::Config;
use crate::models::{Item, RecommendationRequest};
use anyhow::{anyhow, Result};

pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.workers == 0 {
        return Err(anyhow!("Server worker count must be greater than 0"));
    }

    if config.recommendation.default_count == 0 {
        return Err(anyhow!("Default recommendation count must be greater than 0"));
    }

    if config.recommendation.max_count == 0 {
        return Err(anyhow!("Maximum recommendation count must be greater than 0"));
    }

    if config.recommendation.default_count > config.recommendation.max_count {
        return Err(anyhow!(
            "Default recommendation count ({}) exceeds the maximum ({})",
            config.recommendation.default_count,
            config.recommendation.max_count
        ));
    }

    if config.poster.lookup_timeout_ms == 0 {
        return Err(anyhow!("Poster lookup timeout must be greater than 0"));
    }

    if config.features.min_token_len == 0 {
        return Err(anyhow!("Minimum token length must be at least 1"));
    }

    if config.features.max_features == Some(0) {
        return Err(anyhow!("Maximum feature count must be greater than 0 if specified"));
    }

    if config.resolver.fuzzy_max_distance == Some(0) {
        return Err(anyhow!("Fuzzy match distance must be greater than 0 if specified"));
    }

    Ok(())
}

/// Checks an incoming request; `max_count` bounds the requested size.
pub fn validate_recommendation_request(request: &RecommendationRequest, max_count: usize) -> Result<()> {
    if request.title.trim().is_empty() {
        return Err(anyhow!("Title cannot be empty"));
    }

    if request.title.len() > 512 {
        return Err(anyhow!("Title too long (max 512 characters)"));
    }

    match request.num_recommendations {
        Some(0) => return Err(anyhow!("Number of recommendations must be greater than 0")),
        Some(num) if num > max_count => {
            return Err(anyhow!(
                "Number of recommendations ({}) exceeds the maximum ({})",
                num,
                max_count
            ))
        }
        _ => {}
    }

    Ok(())
}

pub fn validate_item(item: &Item) -> Result<()> {
    if item.title.trim().is_empty() {
        return Err(anyhow!("Item title cannot be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_default_above_max() {
        let mut config = Config::default();
        config.recommendation.default_count = 60;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_workers() {
        let mut config = Config::default();
        config.server.workers = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_token_len() {
        let mut config = Config::default();
        config.features.min_token_len = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn validates_requests() {
        let ok = RecommendationRequest {
            title: "Inception".to_string(),
            num_recommendations: None,
        };
        assert!(validate_recommendation_request(&ok, 50).is_ok());

        let blank = RecommendationRequest {
            title: "   ".to_string(),
            num_recommendations: Some(3),
        };
        assert!(validate_recommendation_request(&blank, 50).is_err());

        let zero = RecommendationRequest {
            title: "Inception".to_string(),
            num_recommendations: Some(0),
        };
        assert!(validate_recommendation_request(&zero, 50).is_err());

        let too_many = RecommendationRequest {
            title: "Inception".to_string(),
            num_recommendations: Some(51),
        };
        assert!(validate_recommendation_request(&too_many, 50).is_err());
        assert!(validate_recommendation_request(&too_many, 51).is_ok());
    }

    #[test]
    fn validates_items() {
        assert!(validate_item(&Item::new(0, "Heat", "")).is_ok());
        assert!(validate_item(&Item::new(0, " ", "")).is_err());
    }
}
