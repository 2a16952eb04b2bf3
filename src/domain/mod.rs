mod export;
mod face_recognition;
mod family_card;
mod features;
pub mod fields;
mod generic_lookup;
mod name_search;
mod noise;
mod normalize;
mod population;
mod render;
mod resolve;
mod timeline;
mod types;

pub use export::*;
pub use face_recognition::*;
pub use family_card::*;
pub use features::*;
pub use generic_lookup::*;
pub use name_search::*;
pub use noise::*;
pub use normalize::*;
pub use population::*;
pub use render::*;
pub use resolve::*;
pub use timeline::*;
pub use types::*;
