pub mod card;
pub mod loader;

pub use card::CharacterRecord;
pub use loader::{CatalogError, CharacterCatalog};
