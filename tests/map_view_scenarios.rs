//! Map view scenarios driven the way a provider binding drives it:
//! provider callbacks push events, the owning task pumps them.

use async_trait::async_trait;
use postmap::prelude::*;
use postmap::provider::ScriptLoadError;

fn post(id: &str, category: &str, lat: f64, lng: f64) -> GeoEntity {
    GeoEntity::new(id, format!("Post {id}"), category, LatLng::new(lat, lng))
}

fn patras() -> Vec<GeoEntity> {
    vec![
        post("a", "cafe", 38.2466, 21.7346),
        post("b", "bar", 38.2500, 21.7400),
        post("c", "museum", 38.2442, 21.7372),
    ]
}

fn marker_of(view: &MapView<HeadlessMap>, id: &str) -> MarkerId {
    view.reconciler()
        .markers()
        .iter()
        .find(|m| m.entity_id() == id)
        .map(|m| m.id())
        .unwrap()
}

fn click(view: &MapView<HeadlessMap>, id: &str) {
    let marker = marker_of(view, id);
    assert!(view.backend().unwrap().click_marker(marker));
}

#[test]
fn test_select_a_then_b_leaves_one_popup_for_b() {
    let events = EventQueue::new();
    let mut view: MapView<HeadlessMap> = MapView::default();
    view.attach(HeadlessMap::default().with_events(events.sender()));
    view.set_entities(patras());

    click(&view, "a");
    click(&view, "b");
    assert_eq!(view.pump_events(&events), 2);

    let content = view.popup().content().unwrap();
    assert_eq!(content.title, "Post b");
    assert_eq!(content.category_label, "BAR");
    assert_eq!(view.popup().last_dismissal(), Some(DismissReason::Replaced));
}

#[test]
fn test_escape_from_page_closes_popup() {
    let events = EventQueue::new();
    let mut view: MapView<HeadlessMap> = MapView::default();
    view.attach(HeadlessMap::default().with_events(events.sender()));
    view.set_entities(patras());

    click(&view, "c");
    events.push(MapEvent::KeyPressed {
        key: KeyCode::from_key_name("Escape"),
    });
    view.pump_events(&events);

    assert!(!view.popup().is_open());
    assert_eq!(view.popup().last_dismissal(), Some(DismissReason::Escape));
}

#[test]
fn test_click_before_tiles_load_is_ignored() {
    let events = EventQueue::new();
    let mut map = HeadlessMap::default().with_events(events.sender());
    map.set_projection_ready(false);

    let mut view: MapView<HeadlessMap> = MapView::default();
    view.attach(map);
    view.set_entities(patras());

    click(&view, "a");
    assert_eq!(view.pump_events(&events), 0);
    assert!(!view.popup().is_open());

    // Once the projection is available the same click works
    view.backend_mut().unwrap().set_projection_ready(true);
    click(&view, "a");
    assert_eq!(view.pump_events(&events), 1);
    assert!(view.popup().is_open());
}

#[test]
fn test_empty_list_clears_markers_without_fitting() {
    let mut view: MapView<HeadlessMap> = MapView::default();
    view.attach(HeadlessMap::default());

    // Fifth call is the first non-empty one
    for _ in 0..4 {
        let outcome = view.set_entities(Vec::new()).unwrap();
        assert!(!outcome.fitted);
    }
    assert!(!view.controller().has_fitted());
    let outcome = view.set_entities(patras()).unwrap();
    assert!(outcome.fitted);

    let outcome = view.set_entities(Vec::new()).unwrap();
    assert_eq!(outcome.removed, 3);
    assert!(!outcome.fitted);
    assert_eq!(view.backend().unwrap().marker_count(), 0);
    assert!(view.controller().has_fitted());
    assert_eq!(view.backend().unwrap().fit_count(), 1);
}

#[test]
fn test_user_view_survives_refreshes() {
    let mut view: MapView<HeadlessMap> = MapView::default();
    view.attach(HeadlessMap::default());
    view.set_entities(patras());

    let map = view.backend_mut().unwrap();
    map.user_zoom(16.0);
    map.user_pan(Point::new(120.0, -40.0));
    let (center, zoom) = (map.viewport().center, map.viewport().zoom);

    for _ in 0..3 {
        view.set_entities(patras());
    }
    let viewport = view.backend().unwrap().viewport();
    assert_eq!(viewport.center, center);
    assert_eq!(viewport.zoom, zoom);
}

#[test]
fn test_diff_mode_keeps_unchanged_markers() {
    let mut config = PostmapConfig::default();
    config.viewport.reconcile_mode = ReconcileMode::Diff;
    let mut view: MapView<HeadlessMap> = MapView::new(&config);
    view.attach(HeadlessMap::default());
    view.set_entities(patras());
    let kept_handle = marker_of(&view, "a");

    let mut next = patras();
    next.retain(|p| p.id != "b");
    next.push(post("d", "park", 38.2600, 21.7500));
    let outcome = view.set_entities(next).unwrap();

    assert_eq!(outcome.kept, 2);
    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.removed, 1);
    assert_eq!(marker_of(&view, "a"), kept_handle);
    assert_eq!(view.backend().unwrap().marker_count(), 3);
}

struct PageScript;

#[async_trait]
impl ScriptInjector for PageScript {
    async fn inject(&self, _src: &str) -> std::result::Result<(), ScriptLoadError> {
        tokio::task::yield_now().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_two_maps_share_one_script_load() {
    let config = PostmapConfig::default();
    let loader = ProviderLoader::new(Arc::new(PageScript), &config.provider);

    let mut first: MapView<HeadlessMap> = MapView::new(&config);
    let mut second: MapView<HeadlessMap> = MapView::new(&config);
    let (a, b) = tokio::join!(loader.ready(), loader.ready());
    a.unwrap();
    b.unwrap();
    first.attach(HeadlessMap::default());
    second.attach(HeadlessMap::default());

    assert_eq!(loader.attempts(), 1);
    first.set_entities(patras());
    second.set_entities(patras());
    assert_eq!(first.backend().unwrap().fit_count(), 1);
    assert_eq!(second.backend().unwrap().fit_count(), 1);
}

struct OneAddress;

#[async_trait]
impl Geocoder for OneAddress {
    async fn geocode(&self, query: &str) -> postmap::Result<Option<LatLng>> {
        Ok((query == "Agios Andreas, Patras").then(|| LatLng::new(38.2445, 21.7253)))
    }

    async fn reverse(&self, _lat_lng: &LatLng) -> postmap::Result<Option<String>> {
        Ok(Some("Patras waterfront".to_string()))
    }
}

#[tokio::test]
async fn test_geocoded_address_then_click_refines_pin() {
    let config = PostmapConfig::default();
    let events = EventQueue::new();
    let mut picker = LocationPicker::new(None, None, &config.viewport);
    picker
        .attach(HeadlessMap::default().with_events(events.sender()))
        .unwrap();

    let found = OneAddress.geocode("Agios Andreas, Patras").await.unwrap().unwrap();
    picker.set_value(found).unwrap();
    assert_eq!(picker.backend().unwrap().viewport().center, found);

    // The address put the map on the spot; the click nudges the pin
    let clicked = picker.backend().unwrap().click_map(Point::new(420.0, 310.0));
    assert_eq!(picker.pump_events(&events), Some(clicked));
    assert_ne!(picker.value(), Some(found));
    assert_eq!(picker.backend().unwrap().marker_count(), 1);

    let address = picker.describe(&OneAddress).await.unwrap();
    assert_eq!(address.as_deref(), Some("Patras waterfront"));
}

#[test]
fn test_map_clicks_do_not_touch_the_listing_popup() {
    let events = EventQueue::new();
    let mut view: MapView<HeadlessMap> = MapView::default();
    view.attach(HeadlessMap::default().with_events(events.sender()));
    view.set_entities(patras());

    click(&view, "a");
    view.backend().unwrap().click_map(Point::new(10.0, 10.0));
    assert_eq!(view.pump_events(&events), 1);
    assert!(view.popup().is_open());
}
