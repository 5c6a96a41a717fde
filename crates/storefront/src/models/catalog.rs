//! Catalog types: categories, products and listing queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voentorg_core::{CategoryId, Price, ProductId, ProductImageId};

/// Separator between ancestor names in a category path.
pub const PATH_SEPARATOR: &str = " → ";

/// Default page size for product listings.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// A product category.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub description: String,
    /// Ancestor names joined with [`PATH_SEPARATOR`], ending with this category.
    pub full_path: String,
}

impl Category {
    /// Fill in `full_path` for every category of a complete list.
    ///
    /// Walks parent links; a cycle or a missing parent ends the walk.
    pub fn resolve_paths(categories: &mut [Self]) {
        let by_id: HashMap<CategoryId, (String, Option<CategoryId>)> = categories
            .iter()
            .map(|c| (c.id, (c.name.clone(), c.parent_id)))
            .collect();

        for category in categories.iter_mut() {
            let mut names = vec![category.name.clone()];
            let mut seen = vec![category.id];
            let mut next = category.parent_id;
            while let Some(parent_id) = next {
                if seen.contains(&parent_id) {
                    break;
                }
                let Some((name, parent)) = by_id.get(&parent_id) else {
                    break;
                };
                names.push(name.clone());
                seen.push(parent_id);
                next = *parent;
            }
            names.reverse();
            category.full_path = names.join(PATH_SEPARATOR);
        }
    }
}

/// A category with one page of its available products.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    pub category: Category,
    pub products: Page<Product>,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: String,
    pub price: Price,
    pub stock: u32,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub is_available: bool,
    /// URL of the main image, or of the first image when none is marked main.
    pub main_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Available and with at least one unit in stock.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.is_available && self.stock > 0
    }
}

/// A product picture, in gallery order.
#[derive(Debug, Clone, Serialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub url: String,
    pub alt_text: String,
    pub is_main: bool,
    pub display_order: u32,
}

/// Product page: the product and its whole gallery.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
}

/// Image to store for a product; gallery order is its position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductImage {
    pub url: String,
    pub alt_text: String,
    pub is_main: bool,
}

/// Which image of a gallery is the main one.
///
/// A product has at most one main image. When several are flagged the last
/// one wins, as if each had been saved in turn; when none is flagged the
/// first image is used.
#[must_use]
pub fn main_image_position(images: &[NewProductImage]) -> Option<usize> {
    images
        .iter()
        .rposition(|image| image.is_main)
        .or_else(|| (!images.is_empty()).then_some(0))
}

/// Product list ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Newest first until real popularity data exists.
    #[default]
    Popular,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl ProductSort {
    /// Code passed to the listing query.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Popular => "popular",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Newest => "newest",
        }
    }
}

/// Product listing filters, as sent in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    /// Category ID or slug.
    pub category: Option<String>,
    /// Case-insensitive name substring.
    pub q: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }

    /// Search term with surrounding whitespace removed; blank means none.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Category filter split into an ID or a slug.
    #[must_use]
    pub fn category_filter(&self) -> (Option<CategoryId>, Option<&str>) {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => (None, None),
            Some(raw) => raw
                .parse::<i32>()
                .map_or((None, Some(raw)), |id| (Some(CategoryId::new(id)), None)),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let total_pages = u32::try_from(total.div_ceil(u64::from(per_page.max(1))))
            .unwrap_or(u32::MAX);
        Self {
            items,
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
#[must_use]
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn category(id: i32, name: &str, parent: Option<i32>) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
            slug: name.to_lowercase(),
            parent_id: parent.map(CategoryId::new),
            description: String::new(),
            full_path: String::new(),
        }
    }

    #[test]
    fn test_resolve_paths() {
        let mut categories = vec![
            category(1, "Clothing", None),
            category(2, "Jackets", Some(1)),
            category(3, "Winter", Some(2)),
            category(4, "Orphan", Some(99)),
        ];
        Category::resolve_paths(&mut categories);
        assert_eq!(categories[0].full_path, "Clothing");
        assert_eq!(categories[2].full_path, "Clothing → Jackets → Winter");
        assert_eq!(categories[3].full_path, "Orphan");
    }

    #[test]
    fn test_resolve_paths_stops_on_cycle() {
        let mut categories = vec![category(1, "A", Some(2)), category(2, "B", Some(1))];
        Category::resolve_paths(&mut categories);
        assert_eq!(categories[0].full_path, "B → A");
        assert_eq!(categories[1].full_path, "A → B");
    }

    #[test]
    fn test_query_paging_defaults_and_limits() {
        let query = ProductQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(query.offset(), 0);

        let query = ProductQuery {
            page: Some(3),
            per_page: Some(500),
            ..ProductQuery::default()
        };
        assert_eq!(query.per_page(), MAX_PER_PAGE);
        assert_eq!(query.offset(), 200);

        let query = ProductQuery {
            page: Some(0),
            ..ProductQuery::default()
        };
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn test_category_filter() {
        let by_id = ProductQuery {
            category: Some("7".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(by_id.category_filter(), (Some(CategoryId::new(7)), None));

        let by_slug = ProductQuery {
            category: Some("boots".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(by_slug.category_filter(), (None, Some("boots")));

        let blank = ProductQuery {
            category: Some("  ".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(blank.category_filter(), (None, None));
    }

    #[test]
    fn test_sort_deserializes_from_query_code() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap();
        assert_eq!(sort, ProductSort::PriceDesc);
        assert_eq!(sort.code(), "price_desc");
    }

    #[test]
    fn test_page_counts() {
        let page = Page::new(vec![1, 2], 1, 20, 41);
        assert_eq!(page.total_pages, 3);
        let empty: Page<i32> = Page::new(Vec::new(), 1, 20, 0);
        assert_eq!(empty.total_pages, 0);
    }

    fn image(url: &str, is_main: bool) -> NewProductImage {
        NewProductImage {
            url: url.to_owned(),
            alt_text: String::new(),
            is_main,
        }
    }

    #[test]
    fn test_main_image_position() {
        assert_eq!(main_image_position(&[]), None);

        let unflagged = [image("/a.jpg", false), image("/b.jpg", false)];
        assert_eq!(main_image_position(&unflagged), Some(0));

        let one = [image("/a.jpg", false), image("/b.jpg", true)];
        assert_eq!(main_image_position(&one), Some(1));

        let several = [
            image("/a.jpg", true),
            image("/b.jpg", false),
            image("/c.jpg", true),
        ];
        assert_eq!(main_image_position(&several), Some(2));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_wool\\"), "100\\%\\_wool\\\\");
        assert_eq!(escape_like("берцы"), "берцы");
    }
}
