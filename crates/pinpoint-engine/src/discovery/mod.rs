pub mod catalog;
pub mod descriptor;

pub use catalog::{CatalogMatch, CatalogStats, DISCOVERY_GROUPS, DiscoveryCatalog};
pub use descriptor::{ElementDescriptor, classify_element, element_confidence};
