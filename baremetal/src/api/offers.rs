use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

/// How an offer is billed. Some offers exist under both periods with the
/// same name but different identifiers.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPeriod {
    Hourly,
    Monthly,
    #[serde(other)]
    Unknown,
}

impl SubscriptionPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPeriod::Hourly => "hourly",
            SubscriptionPeriod::Monthly => "monthly",
            SubscriptionPeriod::Unknown => "unknown",
        }
    }
}

/// A commercial bare-metal offer.
#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct Offer {
    pub id: String,
    pub name: String,
    pub subscription_period: SubscriptionPeriod,
    /// Operating systems this offer cannot be installed with.
    #[serde(default)]
    pub incompatible_os_ids: Vec<String>,
    #[serde(default)]
    pub options: Vec<OfferOption>,
}

/// An option available on an offer.
#[derive(Clone, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
pub struct OfferOption {
    pub id: String,
    pub name: String,
}

/// Request message for ListOffers.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct ListOffersRequest {
    pub subscription_period: Option<SubscriptionPeriod>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct ListOffersResponse {
    #[serde(default)]
    pub offers: Vec<Offer>,
    #[serde(default)]
    pub total_count: u64,
}

pub(crate) fn build_list(base_url: &str, client: &Client, req: &ListOffersRequest) -> RequestBuilder {
    let url = format!("{base_url}/offers");
    let mut builder = client.get(url);
    if let Some(period) = &req.subscription_period {
        builder = builder.query(&[("subscription_period", period.as_str())]);
    }
    if let Some(page) = req.page {
        builder = builder.query(&[("page", page)]);
    }
    if let Some(page_size) = req.page_size {
        builder = builder.query(&[("page_size", page_size)]);
    }
    builder
}

/// Request message for GetOffer.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct GetOfferRequest {
    #[serde(skip_serializing)]
    pub offer_id: String,
}

pub(crate) fn build_get(base_url: &str, client: &Client, req: &GetOfferRequest) -> RequestBuilder {
    client.get(format!("{base_url}/offers/{}", req.offer_id))
}
