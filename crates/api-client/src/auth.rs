use crate::error::ApiError;
use configuration::ApiPlan;
use reqwest::header::{HeaderMap, HeaderValue};

const PUBLIC_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PRO_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";

/// The host each plan is served from. Demo keys use the public host.
pub fn default_base_url(plan: ApiPlan) -> &'static str {
    match plan {
        ApiPlan::Public | ApiPlan::Demo => PUBLIC_BASE_URL,
        ApiPlan::Pro => PRO_BASE_URL,
    }
}

/// Builds the default headers carrying the API key for the given plan.
///
/// CoinGecko authenticates with a plain header rather than a signature; the
/// header name depends on the plan. Keyless public access sends no header.
pub fn auth_headers(plan: ApiPlan, api_key: Option<&str>) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();

    let header_name = match plan {
        ApiPlan::Public => return Ok(headers),
        ApiPlan::Demo => "x-cg-demo-api-key",
        ApiPlan::Pro => "x-cg-pro-api-key",
    };

    let key = api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::Configuration(format!("{:?} plan requires an API key", plan)))?;

    let mut value = HeaderValue::from_str(key)
        .map_err(|_| ApiError::Configuration("API key contains invalid characters".to_string()))?;
    value.set_sensitive(true);
    headers.insert(header_name, value);

    Ok(headers)
}
