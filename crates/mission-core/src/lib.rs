pub mod edit;
pub mod models;
pub mod region;
pub mod sync;

pub use edit::{
    ContextAction, EditAction, EditError, EditMode, EditOutcome, InsertChaining, MissionEditor,
    PointRef,
};
pub use models::{Coordinate, Mission, MissionId, MissionPoint, PointId};
pub use region::{
    bounding_region, bounding_region_with_padding, CoordinateSpan, MapRegion, SPAN_PADDING_FACTOR,
};
pub use sync::{path_matches, MapEvent, MapSurface, MapSync, Marker, SyncReport};
