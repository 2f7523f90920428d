use anyhow::Context;
use postmap::data::source::RestEntitySource;
use postmap::prelude::*;

/// Poll cycles to watch before exiting
const CYCLES: usize = 3;

fn seed_posts() -> Vec<GeoEntity> {
    vec![
        GeoEntity::new("p1", "Agios Andreas", "view", LatLng::new(38.2445, 21.7253))
            .with_description("Sunset over the gulf")
            .with_owner("u1"),
        GeoEntity::new("p2", "Plateia Olgas", "cafe", LatLng::new(38.2473, 21.7349))
            .with_owner("u2"),
        GeoEntity::new("p3", "Roman Odeon", "museum", LatLng::new(38.2442, 21.7372)),
    ]
}

/// Headless walkthrough: poll, draw markers, click one, show the popup
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    postmap::init_logging();

    let config = PostmapConfig::from_env().context("reading POSTMAP_* configuration")?;

    let memory = InMemoryEntityStore::with_posts(seed_posts());
    memory.set_profile("u1", "Eleni");
    memory.set_profile("u2", "Nikos");

    let source: Arc<dyn EntitySource> = match &config.backend {
        Some(backend) => {
            log::info!("polling {}", backend.endpoint);
            Arc::new(RestEntitySource::new(backend.clone()))
        }
        None => {
            log::info!("no backend configured, using in-memory posts");
            Arc::new(memory.clone())
        }
    };

    let events = EventQueue::new();
    let map = HeadlessMap::from_config(&config.viewport, Bounds::from_rect(0.0, 80.0, 1024.0, 640.0))
        .with_events(events.sender());
    let mut view: MapView<HeadlessMap> = MapView::new(&config);
    view.attach(map);

    let mut sync_config = config.sync.clone();
    sync_config.enrich_display_names = true;
    let wait = sync_config.poll_interval() * 2;
    let mut sync = PollingSynchronizer::new(source, sync_config)?.start();
    let mut updates = sync.subscribe();

    for cycle in 1..=CYCLES {
        match tokio::time::timeout(wait, updates.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => break,
            Err(_) => {
                log::warn!("no update within {:?}, still showing the last list", wait);
                continue;
            }
        }
        let snapshot = updates.borrow_and_update().clone();
        if let Some(outcome) = view.apply_snapshot(&snapshot) {
            println!(
                "cycle {}: snapshot #{} with {} posts ({} markers created, fitted: {})",
                cycle,
                snapshot.seq,
                snapshot.entities.len(),
                outcome.created,
                outcome.fitted
            );
        }

        if cycle == 1 {
            let created = memory
                .create(PostDraft {
                    category_slug: Some("bar".to_string()),
                    ..PostDraft::new("Kafeneio", LatLng::new(38.2501, 21.7388))
                })
                .await?;
            log::info!("added post {} for the next poll", created.id);
        }
    }

    // Click the newest marker as the provider would report it
    if let Some(marker) = view.reconciler().markers().first().map(|m| m.id()) {
        if let Some(map) = view.backend() {
            map.click_marker(marker);
        }
        view.pump_events(&events);
    }

    if let (Some(content), Some(anchor)) = (view.popup().content(), view.popup().position()) {
        println!("popup at ({:.1}, {:.1}):", anchor.x, anchor.y);
        println!("{}", serde_json::to_string_pretty(&content)?);
    }

    let stats = sync.stats();
    sync.stop();
    println!(
        "{} requests, {} published, {} failed, {} stale",
        stats.requests, stats.successes, stats.failures, stats.stale_discarded
    );
    Ok(())
}
