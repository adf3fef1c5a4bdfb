//! Brand registry.

use parking_lot::RwLock;
use std::collections::HashMap;
use tonal_core::{check_id, Brand, ResourceKind, ToneError, AUTO_BRAND_DESCRIPTION};
use uuid::Uuid;

/// Maps brand ids to brands. Brands are created on first reference and
/// never deleted.
#[derive(Debug, Default)]
pub struct BrandRegistry {
    brands: RwLock<HashMap<String, Brand>>,
}

impl BrandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the brand for `brand_id`, creating it if unknown.
    ///
    /// With no id, a fresh `brand_<8 hex>` id is allocated. `brand_name`
    /// only applies to newly created brands; existing brands are returned
    /// unchanged.
    pub fn resolve(
        &self,
        brand_id: Option<&str>,
        brand_name: Option<&str>,
    ) -> Result<Brand, ToneError> {
        if let Some(id) = brand_id {
            check_id("brand_id", id)?;
            if let Some(existing) = self.brands.read().get(id) {
                return Ok(existing.clone());
            }
        }

        let mut brands = self.brands.write();
        let id = match brand_id {
            Some(id) => id.to_string(),
            None => loop {
                let candidate = generate_brand_id();
                if !brands.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        if let Some(existing) = brands.get(&id) {
            // Created by a concurrent resolve between our read and write
            return Ok(existing.clone());
        }

        let name = brand_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Brand::default_name(&id));
        let brand = Brand::new(id.clone(), name).with_description(AUTO_BRAND_DESCRIPTION);

        tracing::info!(brand_id = %brand.brand_id, name = %brand.name, "Created brand");
        brands.insert(id, brand.clone());
        Ok(brand)
    }

    /// Fetch a known brand.
    pub fn get(&self, brand_id: &str) -> Result<Brand, ToneError> {
        self.brands
            .read()
            .get(brand_id)
            .cloned()
            .ok_or_else(|| ToneError::not_found(ResourceKind::Brand, brand_id))
    }

    /// All brands, ordered by id.
    pub fn list(&self) -> Vec<Brand> {
        let mut brands: Vec<Brand> = self.brands.read().values().cloned().collect();
        brands.sort_by(|a, b| a.brand_id.cmp(&b.brand_id));
        brands
    }

    pub fn len(&self) -> usize {
        self.brands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_brand_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("brand_{}", &hex[..8])
}
