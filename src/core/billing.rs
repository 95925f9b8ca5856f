use crate::adapters::documents::DocumentStore;
use crate::config::toml_config::BillingSettings;
use crate::domain::model::{
    PaymentRecord, PlanTier, SubscriptionInfo, SubscriptionStatus, User, USERS,
};
use crate::domain::ports::Storage;
use crate::utils::error::{MapiesError, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

fn webhook_error(message: impl Into<String>) -> MapiesError {
    MapiesError::WebhookError {
        message: message.into(),
    }
}

fn signing_mac(payload: &[u8], timestamp: i64, secret: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| webhook_error(format!("invalid webhook secret: {}", e)))?;
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    Ok(mac)
}

/// Stripe 的 v1 簽章：HMAC-SHA256(`{t}.{payload}`) 的十六進位字串
pub fn sign_payload(payload: &[u8], timestamp: i64, secret: &str) -> Result<String> {
    let mac = signing_mac(payload, timestamp, secret)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// 驗證 `Stripe-Signature: t=...,v1=...`，任一 v1 相符即可
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: i64,
    now: i64,
) -> Result<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| webhook_error("signature header has no timestamp"))?;
    if signatures.is_empty() {
        return Err(webhook_error("signature header has no v1 signature"));
    }
    if now.abs_diff(timestamp) > tolerance_seconds.unsigned_abs() {
        return Err(webhook_error(format!(
            "signature timestamp {} is outside the {}s tolerance",
            timestamp, tolerance_seconds
        )));
    }

    // 格式錯誤的 v1 直接略過
    let mac = signing_mac(payload, timestamp, secret)?;
    let matched = signatures
        .iter()
        .filter_map(|candidate| hex::decode(candidate).ok())
        .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());
    if matched {
        Ok(())
    } else {
        Err(webhook_error("signature does not match the payload"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied { user_id: String },
    Ignored { reason: String },
    UserNotFound,
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))?
        .as_str()
        .filter(|s| !s.is_empty())
}

fn timestamp_at(value: &Value, path: &[&str]) -> Option<DateTime<Utc>> {
    let seconds = path
        .iter()
        .try_fold(value, |current, key| current.get(*key))?
        .as_i64()?;
    Utc.timestamp_opt(seconds, 0).single()
}

fn first_item(object: &Value) -> Option<&Value> {
    object.get("items")?.get("data")?.get(0)
}

/// 將 Stripe webhook 事件同步到使用者文件
pub struct BillingService<S: Storage> {
    store: Arc<DocumentStore<S>>,
    settings: BillingSettings,
}

impl<S: Storage> BillingService<S> {
    pub fn new(store: Arc<DocumentStore<S>>, settings: BillingSettings) -> Self {
        Self { store, settings }
    }

    /// 有設定簽章密鑰時必須帶 `Stripe-Signature`
    pub async fn handle_payload(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome> {
        if let Some(secret) = self.settings.webhook_secret() {
            let header =
                signature.ok_or_else(|| webhook_error("missing Stripe-Signature header"))?;
            verify_signature(
                payload,
                header,
                secret,
                self.settings.tolerance_seconds,
                Utc::now().timestamp(),
            )?;
        } else {
            tracing::warn!("⚠️ Webhook secret not configured, skipping signature check");
        }

        let event: StripeEvent = serde_json::from_slice(payload)?;
        self.handle_event(&event).await
    }

    pub async fn handle_event(&self, event: &StripeEvent) -> Result<WebhookOutcome> {
        let object = &event.data.object;
        let handled = matches!(
            event.event_type.as_str(),
            "customer.created"
                | "customer.updated"
                | "customer.deleted"
                | "customer.subscription.created"
                | "customer.subscription.updated"
                | "customer.subscription.deleted"
                | "invoice.payment_succeeded"
                | "invoice.paid"
                | "invoice.payment_failed"
        );
        if !handled {
            tracing::debug!("Ignoring Stripe event {} ({})", event.id, event.event_type);
            return Ok(WebhookOutcome::Ignored {
                reason: format!("unhandled event type '{}'", event.event_type),
            });
        }

        let customer_id = if event.event_type.starts_with("customer.")
            && !event.event_type.starts_with("customer.subscription.")
        {
            str_at(object, &["id"])
        } else {
            str_at(object, &["customer"])
        };

        let Some(mut user) = self.resolve_user(object, customer_id).await? else {
            tracing::warn!(
                "⚠️ No user for Stripe event {} ({}), customer {:?}",
                event.id,
                event.event_type,
                customer_id
            );
            return Ok(WebhookOutcome::UserNotFound);
        };

        match event.event_type.as_str() {
            "customer.created" | "customer.updated" => {
                user.stripe_customer_id = customer_id.map(str::to_string);
                if let Some(email) = str_at(object, &["email"]) {
                    user.email = email.to_string();
                }
            }
            "customer.deleted" => {
                user.stripe_customer_id = None;
                user.subscription = None;
                user.subscription_tier = PlanTier::Freemium;
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                self.apply_subscription(&mut user, object, customer_id)?;
            }
            "customer.subscription.deleted" => {
                if let Some(subscription) = user.subscription.as_mut() {
                    subscription.status = SubscriptionStatus::Canceled;
                }
                user.subscription_tier = PlanTier::Freemium;
            }
            "invoice.payment_succeeded" | "invoice.paid" => {
                user.last_payment = Some(PaymentRecord {
                    invoice_id: str_at(object, &["id"]).unwrap_or_default().to_string(),
                    amount_paid: object
                        .get("amount_paid")
                        .and_then(Value::as_i64)
                        .unwrap_or(0),
                    currency: str_at(object, &["currency"]).unwrap_or("usd").to_string(),
                    paid_at: timestamp_at(object, &["status_transitions", "paid_at"])
                        .unwrap_or_else(Utc::now),
                });
                user.payment_failed = false;
            }
            "invoice.payment_failed" => {
                user.payment_failed = true;
                if let Some(subscription) = user.subscription.as_mut() {
                    subscription.status = SubscriptionStatus::PastDue;
                }
            }
            _ => {}
        }

        user.updated_at = Utc::now();
        self.store.set(USERS, &user.id, &user).await?;
        tracing::info!(
            user_id = %user.id,
            "💳 Applied {} (tier: {})",
            event.event_type,
            user.subscription_tier.as_str()
        );
        Ok(WebhookOutcome::Applied { user_id: user.id })
    }

    fn apply_subscription(
        &self,
        user: &mut User,
        object: &Value,
        customer_id: Option<&str>,
    ) -> Result<()> {
        let status_raw = str_at(object, &["status"]).unwrap_or_default();
        let status = SubscriptionStatus::parse(status_raw)
            .ok_or_else(|| webhook_error(format!("unknown subscription status '{}'", status_raw)))?;

        let item = first_item(object);
        let price_id = item.and_then(|item| str_at(item, &["price", "id"]));
        let tier = price_id
            .and_then(|id| self.settings.price_tiers.get(id).copied())
            .or_else(|| item.and_then(|item| str_at(item, &["price", "metadata", "tier"])).map(PlanTier::parse))
            .or_else(|| str_at(object, &["metadata", "tier"]).map(PlanTier::parse))
            .or_else(|| user.subscription.as_ref().map(|s| s.tier))
            .unwrap_or(user.subscription_tier);

        let current_period_end = timestamp_at(object, &["current_period_end"])
            .or_else(|| item.and_then(|item| timestamp_at(item, &["current_period_end"])));

        user.subscription = Some(SubscriptionInfo {
            id: str_at(object, &["id"]).unwrap_or_default().to_string(),
            status,
            price_id: price_id.map(str::to_string),
            tier,
            current_period_end,
            cancel_at_period_end: object
                .get("cancel_at_period_end")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        });
        user.subscription_tier = if status.grants_access() {
            tier
        } else {
            PlanTier::Freemium
        };
        if user.stripe_customer_id.is_none() {
            user.stripe_customer_id = customer_id.map(str::to_string);
        }
        Ok(())
    }

    /// 先看 `metadata.userId`，再用 Stripe customer id 比對
    async fn resolve_user(&self, object: &Value, customer_id: Option<&str>) -> Result<Option<User>> {
        if let Some(user_id) = str_at(object, &["metadata", "userId"]) {
            if let Some(user) = self.store.get::<User>(USERS, user_id).await? {
                return Ok(Some(user));
            }
        }

        let Some(customer_id) = customer_id else {
            return Ok(None);
        };
        Ok(self
            .store
            .list::<User>(USERS)
            .await?
            .into_iter()
            .find(|user| user.stripe_customer_id.as_deref() == Some(customer_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256_rfc4231_vector() {
        let mut mac = HmacSha256::new_from_slice(b"Jefe").unwrap();
        mac.update(b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(mac.finalize().into_bytes()),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_sign_payload_covers_timestamp() {
        let signature = sign_payload(b"{}", 1_700_000_000, "whsec_test").unwrap();
        assert_eq!(signature.len(), 64);

        let mut mac = HmacSha256::new_from_slice(b"whsec_test").unwrap();
        mac.update(b"1700000000.{}");
        assert_eq!(hex::encode(mac.finalize().into_bytes()), signature);
        assert_ne!(sign_payload(b"{}", 1_700_000_001, "whsec_test").unwrap(), signature);
    }

    #[test]
    fn test_verify_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let signature = sign_payload(payload, 1_700_000_000, "whsec_test").unwrap();
        let header = format!("t=1700000000,v1=deadbeef,v1=zz,v1={}", signature);

        assert!(verify_signature(payload, &header, "whsec_test", 300, 1_700_000_100).is_ok());
        assert!(verify_signature(payload, &header, "whsec_other", 300, 1_700_000_100).is_err());
        assert!(verify_signature(payload, &header, "whsec_test", 300, 1_700_001_000).is_err());
        assert!(verify_signature(b"{}", &header, "whsec_test", 300, 1_700_000_000).is_err());
        assert!(verify_signature(payload, "v1=abc", "whsec_test", 300, 0).is_err());
    }

    #[test]
    fn test_verify_signature_rejects_extreme_timestamps() {
        let now = 1_700_000_000;
        for header in [
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
        ] {
            let err = verify_signature(b"{}", header, "whsec", 300, now).unwrap_err();
            assert!(err.to_string().contains("tolerance"));
        }
        assert!(verify_signature(b"{}", "t=0,v1=00", "whsec", 300, i64::MIN).is_err());
    }
}
