use auction_contracts::{AuctionCreated, AuctionStatus, AuctionUpdated};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Replicated auction as the search service stores and serves it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub reserve_price: i32,
    pub seller: String,
    pub winner: Option<String>,
    pub sold_amount: Option<i32>,
    pub current_high_bid: Option<i32>,
    pub created_at: DateTime<Utc>,
    /// Last change seen; also the catch-up watermark
    pub updated_at: DateTime<Utc>,
    pub auction_end: DateTime<Utc>,
    pub status: AuctionStatus,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub mileage: i32,
    pub image_url: String,
    pub version: i64,
}

/// Marker left behind by a deletion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tombstone {
    pub id: Uuid,
    pub version: i64,
    pub deleted_at: DateTime<Utc>,
}

impl From<&AuctionCreated> for Item {
    fn from(e: &AuctionCreated) -> Self {
        Self {
            id: e.id,
            reserve_price: e.reserve_price,
            seller: e.seller.clone(),
            winner: e.winner.clone(),
            sold_amount: e.sold_amount,
            current_high_bid: e.current_high_bid,
            created_at: e.created_at,
            updated_at: e.updated_at,
            auction_end: e.auction_end,
            status: e.status,
            make: e.make.clone(),
            model: e.model.clone(),
            year: e.year,
            color: e.color.clone(),
            mileage: e.mileage,
            image_url: e.image_url.clone(),
            version: e.version,
        }
    }
}

impl Item {
    /// Record built from an update alone, for when the Created was missed
    ///
    /// Attributes the update does not carry take empty defaults.
    pub fn from_update(e: &AuctionUpdated) -> Self {
        let mut item = Self {
            id: e.id,
            reserve_price: 0,
            seller: String::new(),
            winner: None,
            sold_amount: None,
            current_high_bid: None,
            created_at: e.created_at.unwrap_or(e.updated_at),
            updated_at: e.updated_at,
            auction_end: e.auction_end.unwrap_or(e.updated_at),
            status: AuctionStatus::default(),
            make: String::new(),
            model: String::new(),
            year: 0,
            color: String::new(),
            mileage: 0,
            image_url: String::new(),
            version: e.version,
        };
        item.apply_update(e);
        item
    }

    /// Overwrite the attributes the update carries
    pub fn apply_update(&mut self, e: &AuctionUpdated) {
        if let Some(v) = e.reserve_price {
            self.reserve_price = v;
        }
        if let Some(v) = &e.seller {
            self.seller = v.clone();
        }
        if let Some(v) = &e.winner {
            self.winner = Some(v.clone());
        }
        if let Some(v) = e.sold_amount {
            self.sold_amount = Some(v);
        }
        if let Some(v) = e.current_high_bid {
            self.current_high_bid = Some(v);
        }
        if let Some(v) = e.created_at {
            self.created_at = v;
        }
        if let Some(v) = e.auction_end {
            self.auction_end = v;
        }
        if let Some(v) = e.status {
            self.status = v;
        }
        if let Some(v) = &e.make {
            self.make = v.clone();
        }
        if let Some(v) = &e.model {
            self.model = v.clone();
        }
        if let Some(v) = e.year {
            self.year = v;
        }
        if let Some(v) = &e.color {
            self.color = v.clone();
        }
        if let Some(v) = e.mileage {
            self.mileage = v;
        }
        if let Some(v) = &e.image_url {
            self.image_url = v.clone();
        }
        self.updated_at = e.updated_at;
        self.version = e.version;
    }

    /// Reject records no auction could have produced
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_nil() {
            return Err("id cannot be nil".to_string());
        }
        check_text("make", Some(&self.make))?;
        check_text("model", Some(&self.model))?;
        check_numbers(
            Some(self.year),
            Some(self.mileage),
            [
                ("reserve_price", Some(self.reserve_price)),
                ("sold_amount", self.sold_amount),
                ("current_high_bid", self.current_high_bid),
            ],
        )
    }
}

/// Reject updates carrying impossible values
///
/// Only the attributes present are checked: an update may legitimately carry
/// a subset, and when its Created was missed the rest take empty defaults.
pub fn validate_update(e: &AuctionUpdated) -> Result<(), String> {
    if e.id.is_nil() {
        return Err("id cannot be nil".to_string());
    }
    check_text("make", e.make.as_deref())?;
    check_text("model", e.model.as_deref())?;
    check_numbers(
        e.year,
        e.mileage,
        [
            ("reserve_price", e.reserve_price),
            ("sold_amount", e.sold_amount),
            ("current_high_bid", e.current_high_bid),
        ],
    )
}

fn check_text(name: &str, value: Option<&str>) -> Result<(), String> {
    match value {
        Some(v) if v.trim().is_empty() => Err(format!("{} cannot be empty", name)),
        _ => Ok(()),
    }
}

fn check_numbers(
    year: Option<i32>,
    mileage: Option<i32>,
    prices: [(&str, Option<i32>); 3],
) -> Result<(), String> {
    if let Some(year) = year.filter(|y| *y <= 0) {
        return Err(format!("year must be positive, got {}", year));
    }
    if let Some(mileage) = mileage.filter(|m| *m < 0) {
        return Err(format!("mileage cannot be negative, got {}", mileage));
    }
    for (name, price) in prices {
        if let Some(p) = price.filter(|p| *p < 0) {
            return Err(format!("{} cannot be negative, got {}", name, p));
        }
    }
    Ok(())
}

/// Parameters of a search request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub search_term: Option<String>,
    pub seller: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_page_number")]
    pub page_number: usize,
}

fn default_page_size() -> usize {
    4
}

fn default_page_number() -> usize {
    1
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            search_term: None,
            seller: None,
            page_size: default_page_size(),
            page_number: default_page_number(),
        }
    }
}

impl SearchQuery {
    /// Page size clamped to at least one
    pub fn limit(&self) -> usize {
        self.page_size.max(1)
    }

    /// Rows skipped before the requested page; pages start at 1
    pub fn offset(&self) -> usize {
        self.page_number.max(1).saturating_sub(1) * self.limit()
    }

    /// Case-insensitive match on make, model or color
    pub fn matches(&self, item: &Item) -> bool {
        let term_ok = match self.search_term.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [&item.make, &item.model, &item.color]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
        };
        let seller_ok = match self.seller.as_deref() {
            None | Some("") => true,
            Some(seller) => item.seller == seller,
        };
        term_ok && seller_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<Item>,
    pub page_count: usize,
    pub total_count: usize,
}

impl SearchPage {
    pub fn new(results: Vec<Item>, total_count: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            results,
            page_count: total_count.div_ceil(page_size),
            total_count,
        }
    }
}
