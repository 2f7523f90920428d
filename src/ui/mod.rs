pub mod map_view;
pub mod picker;
pub mod popup;

pub use map_view::MapView;
pub use picker::LocationPicker;
pub use popup::{PopupContent, PopupOverlay};
