//! Core constants for the marker engine and its collaborators.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

use std::time::Duration;

/// Side length of the zoom-0 world plane in pixels.
pub const WORLD_SIZE: f64 = 256.0;

/// Latitude limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Interval between two polls of the entity source.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);

/// Vertical bias applied to a projected marker so the popup sits above the glyph.
pub const POPUP_VERTICAL_OFFSET: f64 = -40.0;

/// Padding kept around the data when fitting the viewport to it.
pub const DEFAULT_FIT_PADDING: f64 = 20.0;

/// Center used before any data arrives (Patras).
pub const DEFAULT_CENTER: (f64, f64) = (38.246242, 21.735084);

/// Zoom used before any data arrives.
pub const DEFAULT_ZOOM: f64 = 13.0;

/// Zoom range supported by the provider.
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 21.0;

/// Public Nominatim instance.
pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Identifying client header, required by the Nominatim usage policy.
pub const DEFAULT_USER_AGENT: &str = "postmap/0.1";

/// Script endpoint of the map provider; the API key is appended as a query parameter.
pub const PROVIDER_SCRIPT_URL: &str = "https://maps.googleapis.com/maps/api/js";

/// Category assigned to posts that do not carry one.
pub const FALLBACK_CATEGORY: &str = "other";
