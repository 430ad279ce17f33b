use {
    crate::error::DashboardError,
    solana_sdk::pubkey::Pubkey,
    std::str::FromStr,
};

/// Parses a user-supplied base58 public key, trimming surrounding whitespace.
pub fn validate_public_key(key: &str) -> Result<Pubkey, DashboardError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(DashboardError::Validation("Public key is required".into()));
    }

    if trimmed.len() < 32 || trimmed.len() > 44 {
        return Err(DashboardError::Validation("Invalid public key length".into()));
    }

    Pubkey::from_str(trimmed)
        .map_err(|_| DashboardError::Validation("Invalid public key format".into()))
}

/// Accepts commission rates in [0, 100], rounded to a whole percent.
pub fn validate_commission(commission: f64) -> Result<u8, DashboardError> {
    if !commission.is_finite() {
        return Err(DashboardError::Validation("Invalid number format".into()));
    }

    if !(0.0..=100.0).contains(&commission) {
        return Err(DashboardError::Validation(
            "Commission must be between 0% and 100%".into(),
        ));
    }

    Ok(commission.round() as u8)
}

pub fn validate_alert_threshold(threshold: f64) -> Result<f64, DashboardError> {
    if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
        return Err(DashboardError::Validation(format!(
            "Alert threshold must be between 0 and 100, got {}",
            threshold
        )));
    }
    Ok(threshold)
}

pub fn validate_url(url: &str) -> Result<reqwest::Url, DashboardError> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|e| DashboardError::Validation(format!("Invalid URL {}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(DashboardError::Validation(format!(
            "Unsupported URL scheme {} in {}",
            other, url
        ))),
    }
}
