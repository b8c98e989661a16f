//! Parts catalog: vendors and the products they supply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::input;
use crate::storage::Storage;

/// A parts supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    /// Unique identifier.
    pub id: Uuid,
    /// Vendor name.
    pub name: String,
    /// Contact email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// Contact phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Vendor {
    /// Create a vendor with no contact details.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            contact_email: None,
            phone: None,
        }
    }
}

/// A catalog part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: Uuid,
    /// Manufacturer part number.
    pub part_number: String,
    /// Display name.
    pub name: String,
    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Link to a product photo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Free-form category, e.g. `Bearings`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Supplier, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<Uuid>,
    /// When the part was added to the catalog.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Create a product with only a part number and name.
    #[must_use]
    pub fn new(
        part_number: impl Into<String>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            part_number: part_number.into(),
            name: name.into(),
            description: None,
            price: None,
            image_url: None,
            category: None,
            vendor_id: None,
            created_at,
        }
    }
}

/// Input for [`Catalog::add_vendor`].
#[derive(Debug, Clone, Default)]
pub struct NewVendor {
    /// Vendor name. Required.
    pub name: String,
    /// Must contain `@` when given.
    pub contact_email: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
}

/// Input for [`Catalog::add_product`].
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    /// Part number. Required.
    pub part_number: String,
    /// Display name. Required.
    pub name: String,
    /// Longer description.
    pub description: Option<String>,
    /// Unit price; must not be negative.
    pub price: Option<f64>,
    /// Link to a product photo.
    pub image_url: Option<String>,
    /// Free-form category.
    pub category: Option<String>,
    /// Supplier; must already exist.
    pub vendor_id: Option<Uuid>,
}

/// Catalog operations over a [`Storage`].
#[derive(Debug)]
pub struct Catalog<'a> {
    storage: &'a Storage,
    search_limit: usize,
}

impl<'a> Catalog<'a> {
    /// Create a catalog that returns at most `search_limit` rows per query.
    #[must_use]
    pub fn new(storage: &'a Storage, search_limit: usize) -> Self {
        Self {
            storage,
            search_limit,
        }
    }

    /// Add a vendor.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, the email is malformed, or
    /// the database operation fails.
    pub fn add_vendor(&self, new: NewVendor) -> Result<Vendor> {
        let contact_email = input::optional(new.contact_email);
        if let Some(email) = &contact_email {
            if !email.contains('@') {
                return Err(Error::invalid_input(
                    "contact_email",
                    format!("'{email}' is not an email address"),
                ));
            }
        }

        let vendor = Vendor {
            id: Uuid::new_v4(),
            name: input::required("name", &new.name)?,
            contact_email,
            phone: input::optional(new.phone),
        };
        self.storage.upsert_vendor(&vendor)?;
        info!("Added vendor {} ({})", vendor.name, vendor.id);
        Ok(vendor)
    }

    /// All vendors, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn vendors(&self) -> Result<Vec<Vendor>> {
        self.storage.list_vendors()
    }

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is blank, the price is negative,
    /// the vendor does not exist, or the database operation fails.
    pub fn add_product(&self, new: NewProduct, now: DateTime<Utc>) -> Result<Product> {
        let price = new
            .price
            .map(|price| input::non_negative("price", price))
            .transpose()?;

        if let Some(vendor_id) = new.vendor_id {
            if self.storage.get_vendor(vendor_id)?.is_none() {
                return Err(Error::not_found("vendor", vendor_id));
            }
        }

        let product = Product {
            id: Uuid::new_v4(),
            part_number: input::required("part_number", &new.part_number)?,
            name: input::required("name", &new.name)?,
            description: input::optional(new.description),
            price,
            image_url: input::optional(new.image_url),
            category: input::optional(new.category),
            vendor_id: new.vendor_id,
            created_at: now,
        };
        self.storage.upsert_product(&product)?;
        info!("Added product {} ({})", product.part_number, product.id);
        Ok(product)
    }

    /// The most recently added products.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn products(&self) -> Result<Vec<Product>> {
        self.storage.list_products(self.search_limit)
    }

    /// Products whose part number or name contains `query`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is blank or the database operation fails.
    pub fn search(&self, query: &str) -> Result<Vec<Product>> {
        let query = input::required("query", query)?;
        self.storage.search_products(&query, self.search_limit)
    }
}
