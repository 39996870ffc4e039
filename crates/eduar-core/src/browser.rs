//! Category browser view state

use crate::catalog::{Catalog, ModelRecord};

/// Category shown when the browser opens
pub const DEFAULT_CATEGORY: &str = "electrical";

/// Category whose main list shows only the overview model
pub const SPACE_CATEGORY: &str = "school";

/// Sub-category of the space overview model
pub const SPACE_OVERVIEW: &str = "solar-system";

/// Sub-category listed in the planet selector strip
pub const PLANET_SUB_CATEGORY: &str = "planet";

/// Which category tab is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Browser {
    active_category: String,
}

impl Default for Browser {
    fn default() -> Self {
        Self {
            active_category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl Browser {
    pub fn with_category(category: &str) -> Self {
        Self {
            active_category: category.to_string(),
        }
    }

    pub fn active_category(&self) -> &str {
        &self.active_category
    }

    pub fn set_category(&mut self, category: &str) {
        self.active_category = category.to_string();
    }

    /// Cards in the main list for the active category
    ///
    /// Planets are reached through the selector strip, so the space
    /// category lists only its solar-system overview here.
    pub fn main_entries<'a>(&self, catalog: &'a Catalog) -> Vec<&'a ModelRecord> {
        let entries = catalog.list_by_category(&self.active_category);
        if self.active_category == SPACE_CATEGORY {
            entries
                .into_iter()
                .filter(|r| r.sub_category == SPACE_OVERVIEW)
                .collect()
        } else {
            entries
        }
    }

    /// Planets for the selector strip, only while the space tab is active
    pub fn planet_entries<'a>(&self, catalog: &'a Catalog) -> Vec<&'a ModelRecord> {
        if self.active_category == SPACE_CATEGORY {
            catalog.list_by_sub_category(SPACE_CATEGORY, PLANET_SUB_CATEGORY)
        } else {
            Vec::new()
        }
    }
}
