// src/services/gateways.rs
//
// Clientes das APIs externas. Ficam atrás de traits para que os serviços
// possam ser testados sem rede.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{common::error::AppError, db::integration_repo::ReviewUpsert};

// =============================================================================
//  WHATSAPP CLOUD API
// =============================================================================

#[async_trait::async_trait]
pub trait WhatsAppGateway: Send + Sync {
    /// Envia uma mensagem de texto. Retorna o id da mensagem no provedor.
    async fn send_text(
        &self,
        phone_number_id: &str,
        access_token: &str,
        to: &str,
        body: &str,
    ) -> Result<String, AppError>;
}

pub struct CloudWhatsAppGateway {
    http: Client,
    base_url: String,
}

impl CloudWhatsAppGateway {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[async_trait::async_trait]
impl WhatsAppGateway for CloudWhatsAppGateway {
    async fn send_text(
        &self,
        phone_number_id: &str,
        access_token: &str,
        to: &str,
        body: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/{phone_number_id}/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await
            .map_err(|e| AppError::IntegrationRequestFailed(format!("whatsapp: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::IntegrationRequestFailed(format!(
                "whatsapp respondeu {status}: {detail}"
            )));
        }

        let sent: SendMessageResponse = response.json().await?;
        Ok(sent.messages.into_iter().next().map(|m| m.id).unwrap_or_default())
    }
}

// =============================================================================
//  GOOGLE MY BUSINESS
// =============================================================================

/// Credenciais e localização da loja no Google.
pub struct GmbLocation<'a> {
    pub account_id: &'a str,
    pub location_id: &'a str,
    pub access_token: &'a str,
}

#[async_trait::async_trait]
pub trait GmbGateway: Send + Sync {
    async fn fetch_reviews(&self, location: &GmbLocation<'_>) -> Result<Vec<ReviewUpsert>, AppError>;

    async fn post_reply(
        &self,
        location: &GmbLocation<'_>,
        review_id: &str,
        comment: &str,
    ) -> Result<(), AppError>;
}

/// "ONE".."FIVE" do Google para 1..5. `STAR_RATING_UNSPECIFIED` e valores
/// desconhecidos não têm nota.
pub fn star_rating_value(rating: &str) -> Option<i16> {
    match rating {
        "ONE" => Some(1),
        "TWO" => Some(2),
        "THREE" => Some(3),
        "FOUR" => Some(4),
        "FIVE" => Some(5),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewsPage {
    #[serde(default)]
    reviews: Vec<GoogleReview>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleReview {
    review_id: String,
    reviewer: Option<GoogleReviewer>,
    #[serde(default)]
    star_rating: String,
    comment: Option<String>,
    create_time: DateTime<Utc>,
    review_reply: Option<GoogleReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleReviewer {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleReply {
    comment: String,
    update_time: Option<DateTime<Utc>>,
}

impl GoogleReview {
    /// Avaliação sem nota fica de fora da sincronização.
    fn into_upsert(self) -> Option<ReviewUpsert> {
        let Some(star_rating) = star_rating_value(&self.star_rating) else {
            tracing::warn!(
                review_id = %self.review_id,
                star_rating = %self.star_rating,
                "Avaliação do Google sem nota ignorada"
            );
            return None;
        };

        let (reply, replied_at) = match self.review_reply {
            Some(r) => (Some(r.comment), r.update_time),
            None => (None, None),
        };
        Some(ReviewUpsert {
            external_id: self.review_id,
            reviewer_name: self.reviewer.and_then(|r| r.display_name),
            star_rating,
            comment: self.comment,
            reply,
            replied_at,
            review_created_at: self.create_time,
        })
    }
}

pub struct GoogleMyBusinessGateway {
    http: Client,
    base_url: String,
}

impl GoogleMyBusinessGateway {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn reviews_url(&self, location: &GmbLocation<'_>) -> String {
        format!(
            "{}/accounts/{}/locations/{}/reviews",
            self.base_url, location.account_id, location.location_id
        )
    }
}

// Limite de páginas por sincronização
const MAX_REVIEW_PAGES: usize = 20;

#[async_trait::async_trait]
impl GmbGateway for GoogleMyBusinessGateway {
    async fn fetch_reviews(&self, location: &GmbLocation<'_>) -> Result<Vec<ReviewUpsert>, AppError> {
        let url = self.reviews_url(location);
        let mut reviews = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_REVIEW_PAGES {
            let mut request = self.http.get(&url).bearer_auth(location.access_token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AppError::IntegrationRequestFailed(format!("gmb: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(AppError::IntegrationRequestFailed(format!(
                    "gmb respondeu {status}: {detail}"
                )));
            }

            let page: ReviewsPage = response.json().await?;
            reviews.extend(page.reviews.into_iter().filter_map(GoogleReview::into_upsert));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(reviews)
    }

    async fn post_reply(
        &self,
        location: &GmbLocation<'_>,
        review_id: &str,
        comment: &str,
    ) -> Result<(), AppError> {
        let url = format!("{}/{review_id}/reply", self.reviews_url(location));
        let response = self
            .http
            .put(&url)
            .bearer_auth(location.access_token)
            .json(&json!({ "comment": comment }))
            .send()
            .await
            .map_err(|e| AppError::IntegrationRequestFailed(format!("gmb: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::IntegrationRequestFailed(format!(
                "gmb respondeu {status}: {detail}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_ratings_map_to_numbers() {
        assert_eq!(star_rating_value("ONE"), Some(1));
        assert_eq!(star_rating_value("FIVE"), Some(5));
        assert_eq!(star_rating_value("STAR_RATING_UNSPECIFIED"), None);
        assert_eq!(star_rating_value(""), None);
    }

    #[test]
    fn google_review_converts_with_reply() {
        let raw = serde_json::json!({
            "reviewId": "abc",
            "reviewer": { "displayName": "Maria" },
            "starRating": "FOUR",
            "comment": "Muito bom",
            "createTime": "2025-03-01T12:00:00Z",
            "reviewReply": { "comment": "Obrigado!", "updateTime": "2025-03-02T09:00:00Z" }
        });
        let review: GoogleReview = serde_json::from_value(raw).unwrap();
        let upsert = review.into_upsert().unwrap();

        assert_eq!(upsert.external_id, "abc");
        assert_eq!(upsert.reviewer_name.as_deref(), Some("Maria"));
        assert_eq!(upsert.star_rating, 4);
        assert_eq!(upsert.reply.as_deref(), Some("Obrigado!"));
        assert!(upsert.replied_at.is_some());
    }

    #[test]
    fn unrated_reviews_are_left_out_of_the_page() {
        let page: ReviewsPage = serde_json::from_value(serde_json::json!({
            "reviews": [
                { "reviewId": "a", "starRating": "STAR_RATING_UNSPECIFIED", "createTime": "2025-03-01T12:00:00Z" },
                { "reviewId": "b", "createTime": "2025-03-01T12:00:00Z" },
                { "reviewId": "c", "starRating": "TWO", "createTime": "2025-03-01T12:00:00Z" }
            ]
        }))
        .unwrap();

        let upserts: Vec<ReviewUpsert> = page.reviews.into_iter().filter_map(GoogleReview::into_upsert).collect();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].external_id, "c");
        assert_eq!(upserts[0].star_rating, 2);
    }

    #[test]
    fn reviews_page_tolerates_missing_fields() {
        let page: ReviewsPage = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(page.reviews.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
