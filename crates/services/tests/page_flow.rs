use std::sync::Arc;

use course_core::model::{
    ItemId, ModuleId, ModuleMetadata, PageOutline, Percentage, ProgressSettings,
    ValidationCheckbox,
};
use course_core::time::fixed_clock;
use services::observers::{MemoryMount, MountPoint, Rendered, Tone, memory_mounts};
use services::{CourseServices, TrackerError};
use storage::repository::{InMemoryStore, ProgressStore, Storage};

fn catalog(n: usize) -> Vec<ModuleMetadata> {
    (1..=n)
        .map(|i| ModuleMetadata::new(ModuleId::new(format!("m{i}")), format!("Module {i}")))
        .collect()
}

fn services_over(store: &InMemoryStore) -> (CourseServices, Arc<MemoryMount>) {
    let storage = Storage {
        progress: Arc::new(store.clone()),
    };
    let (mounts, memory) = memory_mounts();
    let services = CourseServices::new(
        &storage,
        ProgressSettings::default(),
        fixed_clock(),
        catalog(5),
        mounts,
    );
    (services, memory)
}

/// Three headings plus one exercise block: four module items.
fn module_page() -> PageOutline {
    PageOutline {
        module_id: Some(ModuleId::new("m1")),
        sections: vec!["Install".into(), "Configure".into(), "Run".into()],
        exercises: 1,
        validation: None,
    }
}

fn exercise_page() -> PageOutline {
    PageOutline {
        validation: Some(vec![
            ValidationCheckbox {
                id: ItemId::new("check-build"),
                label: "Image builds".into(),
            },
            ValidationCheckbox {
                id: ItemId::new("check-run"),
                label: "Container runs".into(),
            },
        ]),
        ..PageOutline::default()
    }
}

#[tokio::test]
async fn badge_counts_completed_modules() {
    let store = InMemoryStore::new();
    let (services, memory) = services_over(&store);

    let page = services.open_page(&PageOutline::default()).await;
    assert!(page.module_id().is_none());
    assert_eq!(
        memory.last_text(MountPoint::NavigationBadge).as_deref(),
        Some("0/5")
    );

    page.complete_module(ModuleId::new("m1")).await;
    assert_eq!(
        memory.last_text(MountPoint::NavigationBadge).as_deref(),
        Some("1/5")
    );
    assert_eq!(
        store.get("devops_course_progress").await.unwrap().as_deref(),
        Some(r#"{"m1":100}"#)
    );
}

#[tokio::test]
async fn module_page_tracks_checked_share() {
    let store = InMemoryStore::new();
    let (services, memory) = services_over(&store);
    let mut page = services.open_page(&module_page()).await;
    assert_eq!(page.module_progress().unwrap().percentage(), Percentage::ZERO);

    page.toggle(&ItemId::new("section_0"), true).await.unwrap();
    let progress = page.toggle(&ItemId::new("section_1"), true).await.unwrap();
    assert_eq!(progress.unwrap().percentage().value(), 50);
    assert_eq!(
        memory.last_text(MountPoint::ModuleItems).as_deref(),
        Some("2/4 sections")
    );

    let progress = page.toggle(&ItemId::new("section_2"), true).await.unwrap();
    assert_eq!(progress.unwrap().percentage().value(), 75);
    assert_eq!(
        memory.last_text(MountPoint::ModulePercentage).as_deref(),
        Some("75%")
    );

    for id in ["section_0", "section_1", "section_2"] {
        page.toggle(&ItemId::new(id), false).await.unwrap();
    }
    assert_eq!(page.module_progress().unwrap().percentage(), Percentage::ZERO);
    assert_eq!(
        services.ledger().read_all().await.get(&ModuleId::new("m1")),
        Some(Percentage::ZERO)
    );
}

#[tokio::test]
async fn checking_every_item_completes_the_module() {
    let store = InMemoryStore::new();
    let (services, memory) = services_over(&store);
    let mut page = services.open_page(&module_page()).await;

    let ids: Vec<ItemId> = page.items().map(|item| item.id().clone()).collect();
    assert_eq!(ids.last().map(ItemId::as_str), Some("exercise_0"));
    for id in &ids {
        page.toggle(id, true).await.unwrap();
    }

    assert!(page.module_progress().unwrap().is_complete());
    assert_eq!(
        memory.last_text(MountPoint::NavigationBadge).as_deref(),
        Some("1/5")
    );
}

#[tokio::test]
async fn reopening_restores_state_from_the_store() {
    let store = InMemoryStore::new();
    {
        let (services, _) = services_over(&store);
        let mut page = services.open_page(&module_page()).await;
        page.toggle(&ItemId::new("section_1"), true).await.unwrap();
        page.toggle(&ItemId::new("exercise_0"), true).await.unwrap();
        services.shutdown();
    }

    let (services, memory) = services_over(&store);
    let page = services.open_page(&module_page()).await;

    let checked: Vec<&str> = page
        .items()
        .filter(|item| item.is_checked())
        .map(|item| item.id().as_str())
        .collect();
    assert_eq!(checked, ["section_1", "exercise_0"]);
    assert_eq!(page.module_progress().unwrap().percentage().value(), 50);
    assert_eq!(
        memory.last_text(MountPoint::ModulePercentage).as_deref(),
        Some("50%")
    );
}

#[tokio::test]
async fn validation_checklist_switches_to_done_label() {
    let store = InMemoryStore::new();
    let (services, memory) = services_over(&store);
    let mut page = services.open_page(&exercise_page()).await;
    assert_eq!(
        memory.last_text(MountPoint::ValidationLabel).as_deref(),
        Some("Progress: 0%")
    );

    page.toggle(&ItemId::new("check-build"), true).await.unwrap();
    page.toggle(&ItemId::new("check-run"), true).await.unwrap();
    assert_eq!(
        memory.last(MountPoint::ValidationLabel),
        Some(Rendered::Text {
            text: "✅ Exercise complete!".into(),
            tone: Tone::Success,
        })
    );

    page.toggle(&ItemId::new("check-run"), false).await.unwrap();
    assert_eq!(
        memory.last_text(MountPoint::ValidationLabel).as_deref(),
        Some("Progress: 50%")
    );
    assert_eq!(
        store.get("validation_check-run").await.unwrap().as_deref(),
        Some("false")
    );
    assert!(services.ledger().read_all().await.is_empty());
}

#[tokio::test]
async fn page_without_items_renders_nothing() {
    let store = InMemoryStore::new();
    let (services, memory) = services_over(&store);
    let page = services.open_page(&PageOutline {
        module_id: Some(ModuleId::new("m2")),
        ..PageOutline::default()
    })
    .await;

    assert_eq!(page.module_progress(), None);
    assert_eq!(page.validation_progress(), None);
    assert_eq!(memory.count(MountPoint::ModuleFill), 0);
    assert_eq!(memory.count(MountPoint::ValidationLabel), 0);
    assert!(services.ledger().read_all().await.is_empty());
}

#[tokio::test]
async fn toggling_an_unknown_item_fails() {
    let store = InMemoryStore::new();
    let (services, _) = services_over(&store);
    let mut page = services.open_page(&module_page()).await;

    let err = page
        .toggle(&ItemId::new("section_9"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::UnknownItem(_)));
}

#[tokio::test]
async fn opening_a_module_page_records_its_recomputed_share() {
    let store = InMemoryStore::new();
    let (services, memory) = services_over(&store);
    services.complete_module(ModuleId::new("m1")).await;
    assert_eq!(
        memory.last_text(MountPoint::NavigationBadge).as_deref(),
        Some("1/5")
    );

    services.open_page(&module_page()).await;

    assert_eq!(
        services.ledger().read_all().await.get(&ModuleId::new("m1")),
        Some(Percentage::ZERO)
    );
    assert_eq!(
        memory.last_text(MountPoint::NavigationBadge).as_deref(),
        Some("0/5")
    );
}
