use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::code::generate_discount_code;
use crate::error::ShopifyError;
use crate::types::{
    DiscountCode, DiscountCodeEnvelope, DiscountCodeResponse, NewDiscountCode, NewPriceRule,
    PriceRule, PriceRuleEnvelope, PriceRuleResponse,
};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// A discount code issued for a trade-in, with the price rule it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedDiscount {
    pub price_rule_id: i64,
    pub code: String,
}

/// HTTP client for the Shopify Admin REST price rule and discount code endpoints.
///
/// Every call is made once; there is no retry. Non-2xx responses surface as
/// typed errors.
pub struct ShopifyDiscountClient {
    client: Client,
    /// Store origin, e.g. `https://example.myshopify.com`.
    base_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for ShopifyDiscountClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyDiscountClient")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("access_token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

/// Reduces a store URL to its scheme+host origin.
///
/// Given `"https://example.myshopify.com/admin"`, returns
/// `"https://example.myshopify.com"`.
pub(crate) fn store_origin(store_url: &str) -> Result<String, ShopifyError> {
    let url = reqwest::Url::parse(store_url).map_err(|e| ShopifyError::InvalidStoreUrl {
        store_url: store_url.to_owned(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ShopifyError::InvalidStoreUrl {
            store_url: store_url.to_owned(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(url.origin().ascii_serialization())
}

impl ShopifyDiscountClient {
    /// Creates a client bound to one store with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::InvalidStoreUrl`] if `store_url` is not an
    /// http(s) URL, or [`ShopifyError::Http`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(
        store_url: &str,
        access_token: &str,
        api_version: &str,
        timeout_secs: u64,
    ) -> Result<Self, ShopifyError> {
        let base_url = store_origin(store_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("tradein/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.to_owned(),
            api_version: api_version.to_owned(),
        })
    }

    /// Creates a single-use, fixed-amount price rule worth `amount`.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::InvalidAmount`] if `amount` is not positive.
    /// - [`ShopifyError::RateLimited`] on HTTP 429.
    /// - [`ShopifyError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ShopifyError::Http`] on network or TLS failure.
    /// - [`ShopifyError::Deserialize`] if the body does not match.
    pub async fn create_price_rule(
        &self,
        title: &str,
        amount: Decimal,
    ) -> Result<PriceRule, ShopifyError> {
        if amount <= Decimal::ZERO {
            return Err(ShopifyError::InvalidAmount(amount));
        }

        let url = self.admin_url("price_rules.json");
        let body = PriceRuleEnvelope {
            price_rule: NewPriceRule::fixed_amount(title, amount, Utc::now()),
        };
        let parsed: PriceRuleResponse = self.post_json(&url, &body, "price rule").await?;
        Ok(parsed.price_rule)
    }

    /// Creates `code` under an existing price rule.
    ///
    /// # Errors
    ///
    /// Same HTTP and decoding errors as [`Self::create_price_rule`].
    pub async fn create_discount_code(
        &self,
        price_rule_id: i64,
        code: &str,
    ) -> Result<DiscountCode, ShopifyError> {
        let url = self.admin_url(&format!("price_rules/{price_rule_id}/discount_codes.json"));
        let body = DiscountCodeEnvelope {
            discount_code: NewDiscountCode { code },
        };
        let parsed: DiscountCodeResponse = self.post_json(&url, &body, "discount code").await?;
        Ok(parsed.discount_code)
    }

    /// Issues a trade-in discount: a price rule for `amount`, then one code
    /// under it.
    ///
    /// If the code cannot be created the price rule is left behind in the
    /// store; its id is logged at `warn`.
    ///
    /// # Errors
    ///
    /// Propagates any error from either Shopify call.
    pub async fn issue_trade_in_discount(
        &self,
        product_model: &str,
        amount: Decimal,
        code_prefix: &str,
    ) -> Result<IssuedDiscount, ShopifyError> {
        let title = format!("Trade-in {product_model}");
        let rule = self.create_price_rule(&title, amount).await?;
        tracing::debug!(price_rule_id = rule.id, product_model, "price rule created");

        let code = generate_discount_code(code_prefix);
        match self.create_discount_code(rule.id, &code).await {
            Ok(created) => Ok(IssuedDiscount {
                price_rule_id: rule.id,
                code: created.code,
            }),
            Err(e) => {
                tracing::warn!(
                    price_rule_id = rule.id,
                    product_model,
                    error = %e,
                    "discount code creation failed; price rule left orphaned"
                );
                Err(e)
            }
        }
    }

    fn admin_url(&self, resource: &str) -> String {
        format!(
            "{}/admin/api/{}/{resource}",
            self.base_url, self.api_version
        )
    }

    async fn post_json<B, T>(&self, url: &str, body: &B, context: &str) -> Result<T, ShopifyError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(body)
            .send()
            .await?;

        let response = check_status(response, url).await?;
        let text = response.text().await?;
        serde_json::from_str::<T>(&text).map_err(|e| ShopifyError::Deserialize {
            context: format!("{context} from {url}"),
            source: e,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
async fn check_status(response: Response, url: &str) -> Result<Response, ShopifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<f64>().ok())
            .map_or(2, |secs| secs.ceil().max(0.0) as u64);
        return Err(ShopifyError::RateLimited { retry_after_secs });
    }

    // Shopify puts validation details in the body; keep a bounded slice of it.
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(512).collect();
    Err(ShopifyError::UnexpectedStatus {
        status: status.as_u16(),
        url: url.to_owned(),
        body,
    })
}
