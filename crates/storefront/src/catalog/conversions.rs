//! Upstream JSON shapes and their conversion into domain types.

use std::str::FromStr;

use itu_shop_core::{Category, DEFAULT_CURRENCY_ISO, Money, ProductCode};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::types::{CategoryRef, Product, ProductPage};

const UNNAMED_PRODUCT: &str = "Unnamed Product";
const UNKNOWN_STOCK: &str = "unknown";

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireSearchPage {
    #[serde(default)]
    pub products: Vec<WireProduct>,
    #[serde(default)]
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WirePagination {
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireProduct {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<WirePrice>,
    #[serde(default)]
    pub stock: Option<WireStock>,
    #[serde(default)]
    pub images: Vec<WireImage>,
    #[serde(default)]
    pub categories: Vec<WireCategoryRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WirePrice {
    #[serde(default)]
    pub value: Option<serde_json::Number>,
    #[serde(default)]
    pub formatted_value: Option<String>,
    #[serde(default)]
    pub currency_iso: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireStock {
    #[serde(default)]
    pub stock_level_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireImage {
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireCategoryRef {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Catalog version document; its `categories` form a tree.
#[derive(Debug, Deserialize)]
pub(super) struct WireCatalogVersion {
    #[serde(default)]
    pub categories: Vec<WireCategoryNode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireCategoryNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<WireCategoryNode>,
}

// =============================================================================
// Conversions
// =============================================================================

/// Convert a product, or `None` if it has no usable code.
pub(super) fn convert_product(product: WireProduct, image_base_url: &str) -> Option<Product> {
    let code = ProductCode::parse(product.code.as_deref()?).ok()?;

    let (price, formatted_price) = convert_price(product.price);

    let image_url = product
        .images
        .into_iter()
        .find(|img| {
            img.image_type.as_deref() == Some("PRIMARY") && img.format.as_deref() == Some("product")
        })
        .and_then(|img| img.url)
        .map(|url| absolute_url(image_base_url, &url));

    let categories = product
        .categories
        .into_iter()
        .filter_map(|c| {
            Some(CategoryRef {
                code: c.code.filter(|code| !code.is_empty())?,
                name: c.name,
            })
        })
        .collect();

    Some(Product {
        code,
        name: product
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_PRODUCT.to_string()),
        url: product.url,
        price,
        formatted_price,
        stock_status: product
            .stock
            .and_then(|s| s.stock_level_status)
            .unwrap_or_else(|| UNKNOWN_STOCK.to_string()),
        image_url,
        categories,
    })
}

/// Convert a search page. `requested_page` fills in a missing `currentPage`.
pub(super) fn convert_search_page(
    page: WireSearchPage,
    requested_page: u32,
    page_size: u32,
    image_base_url: &str,
) -> ProductPage {
    let pagination = page.pagination.unwrap_or(WirePagination {
        current_page: None,
        page_size: None,
        total_pages: None,
        total_results: None,
    });

    let products: Vec<Product> = page
        .products
        .into_iter()
        .filter_map(|p| convert_product(p, image_base_url))
        .collect();

    ProductPage {
        current_page: pagination.current_page.unwrap_or(requested_page),
        page_size: pagination.page_size.unwrap_or(page_size),
        total_pages: pagination.total_pages.unwrap_or(1),
        total_results: pagination
            .total_results
            .unwrap_or_else(|| u64::try_from(products.len()).unwrap_or(u64::MAX)),
        products,
    }
}

/// Flatten a category tree depth-first, parents before children.
pub(super) fn flatten_categories(nodes: Vec<WireCategoryNode>) -> Vec<Category> {
    let mut out = Vec::new();
    let mut stack: Vec<WireCategoryNode> = nodes.into_iter().rev().collect();

    while let Some(node) = stack.pop() {
        if let Some(id) = node.id.filter(|id| !id.is_empty()) {
            let name = node
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| id.clone());
            out.push(Category::new(id, name));
        }
        stack.extend(node.subcategories.into_iter().rev());
    }

    out
}

fn convert_price(price: Option<WirePrice>) -> (Money, String) {
    let Some(price) = price else {
        let zero = Money::zero(DEFAULT_CURRENCY_ISO);
        let formatted = zero.display();
        return (zero, formatted);
    };

    let currency = price
        .currency_iso
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY_ISO.to_string());
    let amount = price
        .value
        .as_ref()
        .and_then(parse_decimal)
        .unwrap_or(Decimal::ZERO);
    let money = Money::new(amount, currency);
    let formatted = price
        .formatted_value
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| money.display());

    (money, formatted)
}

fn parse_decimal(number: &serde_json::Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn absolute_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product_json(value: serde_json::Value) -> WireProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_convert_full_product() {
        let wire = product_json(serde_json::json!({
            "code": "300938",
            "name": "Wireless Mouse",
            "url": "/Accessories/Mice/Wireless-Mouse/p/300938",
            "price": {"value": 24.9, "formattedValue": "CHF 24.90", "currencyIso": "CHF"},
            "stock": {"stockLevelStatus": "inStock"},
            "images": [
                {"imageType": "GALLERY", "format": "product", "url": "/medias/gallery.jpg"},
                {"imageType": "PRIMARY", "format": "thumbnail", "url": "/medias/thumb.jpg"},
                {"imageType": "PRIMARY", "format": "product", "url": "/medias/main.jpg"}
            ],
            "categories": [{"code": "mice", "name": "Mice"}]
        }));

        let product = convert_product(wire, "https://img.example.test/").unwrap();

        assert_eq!(product.code.as_str(), "300938");
        assert_eq!(product.name, "Wireless Mouse");
        assert_eq!(product.price.amount, Decimal::new(249, 1));
        assert_eq!(product.price.currency_iso, "CHF");
        assert_eq!(product.formatted_price, "CHF 24.90");
        assert_eq!(product.stock_status, "inStock");
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://img.example.test/medias/main.jpg")
        );
        assert_eq!(product.categories.len(), 1);
        assert_eq!(product.categories[0].code, "mice");
    }

    #[test]
    fn test_convert_product_defaults() {
        let wire = product_json(serde_json::json!({"code": "P1"}));
        let product = convert_product(wire, "https://img.example.test").unwrap();

        assert_eq!(product.name, "Unnamed Product");
        assert_eq!(product.price, Money::zero("CHF"));
        assert_eq!(product.formatted_price, "CHF 0.00");
        assert_eq!(product.stock_status, "unknown");
        assert_eq!(product.image_url, None);
    }

    #[test]
    fn test_convert_product_without_code() {
        let wire = product_json(serde_json::json!({"name": "Ghost"}));
        assert!(convert_product(wire, "https://img.example.test").is_none());
    }

    #[test]
    fn test_absolute_image_url_kept() {
        assert_eq!(
            absolute_url("https://a.test", "https://cdn.test/x.jpg"),
            "https://cdn.test/x.jpg"
        );
        assert_eq!(absolute_url("https://a.test/", "/x.jpg"), "https://a.test/x.jpg");
    }

    #[test]
    fn test_search_page_defaults_total_pages_to_one() {
        let wire: WireSearchPage = serde_json::from_value(serde_json::json!({
            "products": [{"code": "P1"}, {"code": "P2"}]
        }))
        .unwrap();

        let page = convert_search_page(wire, 3, 12, "https://img.example.test");

        assert_eq!(page.total_pages, 1);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.page_size, 12);
        assert_eq!(page.total_results, 2);
    }

    #[test]
    fn test_flatten_categories_depth_first() {
        let wire: WireCatalogVersion = serde_json::from_value(serde_json::json!({
            "categories": [
                {"id": "a", "name": "A", "subcategories": [
                    {"id": "a1", "name": "A1"},
                    {"id": "a2", "subcategories": [{"id": "a2x", "name": "A2X"}]}
                ]},
                {"id": "b", "name": "B"}
            ]
        }))
        .unwrap();

        let ids: Vec<String> = flatten_categories(wire.categories)
            .into_iter()
            .map(|c| c.id)
            .collect();

        assert_eq!(ids, ["a", "a1", "a2", "a2x", "b"]);
    }

    #[test]
    fn test_flatten_falls_back_to_id_for_name() {
        let nodes = vec![WireCategoryNode {
            id: Some("c1".to_string()),
            name: None,
            subcategories: vec![],
        }];
        assert_eq!(flatten_categories(nodes), vec![Category::new("c1", "c1")]);
    }
}
