pub mod faction;
pub mod land;
pub mod location;
pub mod relation;

pub use faction::{Capabilities, Faction, FactionKind, Rank};
pub use land::{Land, LandKey, LandWrite};
pub use location::Location;
pub use relation::{Relation, RelationKind, canonical_pair};
