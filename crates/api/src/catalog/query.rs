//! Catalog filtering, sorting and pagination.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kranes_core::Product;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 60;

/// Raw `GET /products` query string.
///
/// Every field is kept as text so malformed numbers fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQueryParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_rating: Option<String>,
    pub max_price: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub only_popular: Option<String>,
}

/// Sort criteria for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// `rate * 2 + count / 10`, highest first.
    #[default]
    Featured,
    PriceLowHigh,
    PriceHighLow,
    RatingHigh,
    MostReviewed,
}

impl SortOrder {
    /// Parse a `sortBy` value. Unknown values mean [`SortOrder::Featured`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "price-low-high" => Self::PriceLowHigh,
            "price-high-low" => Self::PriceHighLow,
            "rating-high" => Self::RatingHigh,
            "most-reviewed" => Self::MostReviewed,
            _ => Self::Featured,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceLowHigh => "price-low-high",
            Self::PriceHighLow => "price-high-low",
            Self::RatingHigh => "rating-high",
            Self::MostReviewed => "most-reviewed",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Featured => b.featured_score().total_cmp(&a.featured_score()),
            Self::PriceLowHigh => a.price.cmp(&b.price),
            Self::PriceHighLow => b.price.cmp(&a.price),
            Self::RatingHigh => b.rating.rate.total_cmp(&a.rating.rate),
            Self::MostReviewed => b.rating.count.cmp(&a.rating.count),
        }
    }
}

/// Normalized catalog query.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    /// Lowercased, trimmed search text; empty matches everything.
    pub search: String,
    /// Exact category, `None` for all categories.
    pub category: Option<String>,
    pub min_rating: f64,
    pub max_price: Option<Decimal>,
    pub sort: SortOrder,
    /// Requested page, at least 1. Clamped to the last page when run.
    pub page: usize,
    pub page_size: usize,
    pub only_popular: bool,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            min_rating: 0.0,
            max_price: None,
            sort: SortOrder::Featured,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            only_popular: false,
        }
    }
}

impl From<&ProductQueryParams> for ProductQuery {
    fn from(params: &ProductQueryParams) -> Self {
        let category = params
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "all")
            .map(str::to_string);

        Self {
            search: params
                .q
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_lowercase(),
            category,
            min_rating: parse_number::<f64>(params.min_rating.as_deref())
                .filter(|rating| rating.is_finite())
                .unwrap_or(0.0),
            max_price: parse_number::<Decimal>(params.max_price.as_deref()),
            sort: params
                .sort_by
                .as_deref()
                .map_or(SortOrder::Featured, SortOrder::parse),
            page: parse_number::<i64>(params.page.as_deref())
                .and_then(|page| usize::try_from(page.max(1)).ok())
                .unwrap_or(1),
            page_size: parse_number::<i64>(params.page_size.as_deref())
                .and_then(|size| usize::try_from(size.max(1)).ok())
                .map_or(DEFAULT_PAGE_SIZE, |size| size.min(MAX_PAGE_SIZE)),
            only_popular: params.only_popular.as_deref().map(str::trim) == Some("true"),
        }
    }
}

impl ProductQuery {
    /// Key identifying this query in the page cache.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "q={}|category={}|minRating={}|maxPrice={}|sortBy={}|page={}|pageSize={}|onlyPopular={}",
            self.search,
            self.category.as_deref().unwrap_or("all"),
            self.min_rating,
            self.max_price.map(|p| p.normalize().to_string()).unwrap_or_default(),
            self.sort.as_str(),
            self.page,
            self.page_size,
            self.only_popular,
        )
    }

    /// Whether a product passes every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let category_match = self
            .category
            .as_deref()
            .is_none_or(|category| product.category == category);
        let search_match = self.search.is_empty()
            || product.title.to_lowercase().contains(&self.search)
            || product.description.to_lowercase().contains(&self.search);
        let rating_match = product.rating.rate >= self.min_rating;
        let price_match = self.max_price.is_none_or(|max| product.price <= max);
        let popular_match = !self.only_popular || product.is_popular();

        category_match && search_match && rating_match && price_match && popular_match
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub meta: PageMeta,
}

/// Pagination details for a [`ProductPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// Filter, sort and paginate a merged catalog.
///
/// Sorting is stable: ties keep catalog order.
#[must_use]
pub fn run_query(products: Vec<Product>, query: &ProductQuery) -> ProductPage {
    let mut filtered: Vec<Product> = products
        .into_iter()
        .filter(|product| query.matches(product))
        .collect();
    filtered.sort_by(|a, b| query.sort.compare(a, b));

    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
    let total = filtered.len();
    let total_pages = total.div_ceil(page_size).max(1);
    let page = query.page.clamp(1, total_pages);
    let start = (page - 1) * page_size;

    let items = filtered.into_iter().skip(start).take(page_size).collect();

    ProductPage {
        items,
        meta: PageMeta {
            page,
            page_size,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        },
    }
}

fn parse_number<T: std::str::FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse().ok())
}
