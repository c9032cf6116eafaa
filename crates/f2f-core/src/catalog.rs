use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// The top-level storefront category. It anchors the tree and never has a parent.
pub const ROOT_CATEGORY_ID: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Simple,
    Bundle,
}

impl ProductType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Bundle => "bundle",
        }
    }
}

impl std::str::FromStr for ProductType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "bundle" => Ok(Self::Bundle),
            other => Err(CoreError::InvalidProductType(other.to_string())),
        }
    }
}

/// Pricing tier of the buying customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Public,
    Vip,
    Company,
}

impl std::str::FromStr for CustomerType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "vip" => Ok(Self::Vip),
            "company" => Ok(Self::Company),
            other => Err(CoreError::InvalidCustomerType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub size: Option<String>,
    pub bio: bool,
    pub net_price: Decimal,
    pub net_price_vip: Decimal,
    pub net_price_company: Decimal,
    pub gross_price: Decimal,
    pub vat_percent: Decimal,
    /// `None` means the product is not stock-tracked.
    pub stock: Option<Decimal>,
    pub backorder: bool,
    pub product_type: ProductType,
    pub producer_id: Option<i64>,
    pub featured_image: Option<String>,
    pub enabled: bool,
    pub woo_id: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Returns `true` when `qty` units can be sold right now.
    ///
    /// Untracked stock is unlimited regardless of the backorder flag.
    #[must_use]
    pub fn is_purchasable(&self, qty: Decimal) -> bool {
        match self.stock {
            None => true,
            Some(stock) => stock >= qty || self.backorder,
        }
    }

    /// Net unit price for the given customer tier.
    #[must_use]
    pub fn net_price_for(&self, customer: CustomerType) -> Decimal {
        match customer {
            CustomerType::Public => self.net_price,
            CustomerType::Vip => self.net_price_vip,
            CustomerType::Company => self.net_price_company,
        }
    }

    #[must_use]
    pub fn is_bundle(&self) -> bool {
        self.product_type == ProductType::Bundle
    }
}

/// One component row of a bundle ("box") product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleItem {
    pub box_id: i64,
    pub product_id: i64,
    pub qty: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub order: i32,
    pub enabled: bool,
    pub parent_id: Option<i64>,
    pub woo_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub bio: bool,
    pub enabled: bool,
    pub woo_id: Option<i64>,
}

/// Check that `parent_id` is an acceptable parent for `category_id`.
///
/// # Errors
///
/// Returns [`CoreError::RootCategoryParent`] when a parent is set on the root
/// category and [`CoreError::SelfParentCategory`] when a category points at itself.
pub fn validate_category_parent(category_id: i64, parent_id: Option<i64>) -> Result<(), CoreError> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };
    if category_id == ROOT_CATEGORY_ID {
        return Err(CoreError::RootCategoryParent);
    }
    if category_id == parent_id {
        return Err(CoreError::SelfParentCategory(category_id));
    }
    Ok(())
}

/// Lower-case, ASCII-folded, hyphen-separated slug for names entered without one.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(ch);
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'ő' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'ű' => 'u',
        other => other,
    }
}
