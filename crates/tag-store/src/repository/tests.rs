//! Repository Integration Tests
//!
//! SQLite repository against an in-memory database, plus the cached store
//! over both backends.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex as StdMutex};

    use crate::domain::{DomainError, DomainResult, NewTag, PresetColor, TagColor, TagId, TagPatch, TagRecord};
    use crate::repository::{
        init_db, CachedTagStore, DeleteMode, MemoryTagRepository, RemoteResponse, RemoteTagApi,
        Repository, SqliteTagRepository, TagAttributeOperations, TagPositioningOperations,
        TagStore,
    };

    async fn setup_test_db() -> SqliteTagRepository {
        let db_state = init_db(&PathBuf::from(":memory:")).await.expect("Failed to init test DB");
        SqliteTagRepository::new(db_state.connection())
    }

    async fn setup_store() -> CachedTagStore<SqliteTagRepository> {
        CachedTagStore::new(setup_test_db().await)
    }

    fn red() -> TagColor {
        TagColor::Preset(PresetColor::Red)
    }

    // ========================
    // SqliteTagRepository
    // ========================

    #[tokio::test]
    async fn test_create_tag() {
        let repo = setup_test_db().await;
        let created = repo.create(&TagRecord::new(0, "Work")).await.expect("Failed to create");
        assert!(created.id.0 > 0);
        assert_eq!(created.name, "Work");
    }

    #[tokio::test]
    async fn test_find_by_id_roundtrips_all_fields() {
        let repo = setup_test_db().await;
        let parent = repo.create(&TagRecord::new(0, "Work").as_parent()).await.unwrap();
        let mut child = TagRecord::new(0, "Report").child_of(parent.id).with_color(red());
        child.is_pinned = true;
        child.is_favorite = true;
        child.sort_order = 4;
        let created = repo.create(&child).await.unwrap();

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.parent_id, Some(parent.id));
    }

    #[tokio::test]
    async fn test_list_orders_by_sort_order() {
        let repo = setup_test_db().await;
        repo.create(&TagRecord::new(0, "B").with_sort_order(2)).await.unwrap();
        repo.create(&TagRecord::new(0, "A").with_sort_order(1)).await.unwrap();
        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_next_sort_order_stops_at_limit() {
        let repo = setup_test_db().await;
        repo.create(&TagRecord::new(0, "Max").with_sort_order(i32::MAX)).await.unwrap();
        assert!(matches!(repo.next_sort_order().await, Err(DomainError::Conflict(_))));

        let store = CachedTagStore::new(repo);
        assert!(matches!(
            store.add_tag(NewTag::named("Next")).await,
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(store.get_tags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unique_name_is_case_insensitive() {
        let repo = setup_test_db().await;
        repo.create(&TagRecord::new(0, "Work")).await.unwrap();
        let err = repo.create(&TagRecord::new(0, "WORK")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let repo = setup_test_db().await;
        let err = repo.update(&TagRecord::new(42, "Ghost")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(repo.delete(TagId(42)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_favorites_table_replaced() {
        let repo = setup_test_db().await;
        let names = ["a".to_string(), "b".to_string()].into_iter().collect();
        repo.save_favorites(&names).await.unwrap();
        let only_b = ["b".to_string()].into_iter().collect();
        repo.save_favorites(&only_b).await.unwrap();
        assert_eq!(repo.load_favorites().await.unwrap(), only_b);
    }

    #[tokio::test]
    async fn test_uninitialized_db_is_persistence_error() {
        let state = crate::repository::DbState::new();
        let repo = SqliteTagRepository::new(state.connection());
        let err = repo.list().await.unwrap_err();
        assert_eq!(err, DomainError::Persistence("Database not initialized".to_string()));
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.db");
        {
            let store = CachedTagStore::new(SqliteTagRepository::new(init_db(&path).await.unwrap().connection()));
            store.add_tag(NewTag::named("Work").color(red())).await.unwrap();
        }
        let store = CachedTagStore::new(SqliteTagRepository::new(init_db(&path).await.unwrap().connection()));
        let tags = store.get_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(store.get_tag_colors().await.unwrap().get("Work"), Some(&red()));
    }

    // ========================
    // CachedTagStore
    // ========================

    #[tokio::test]
    async fn test_add_tag_appends_sort_order() {
        let store = setup_store().await;
        let a = store.add_tag(NewTag::named("A")).await.unwrap();
        let b = store.add_tag(NewTag::named("B")).await.unwrap();
        assert_eq!(a.sort_order, 0);
        assert_eq!(b.sort_order, 1);
        assert!(!b.is_parent);
    }

    #[tokio::test]
    async fn test_duplicate_add_is_rejected_without_mutation() {
        let store = setup_store().await;
        store.add_tag(NewTag::named("Work")).await.unwrap();
        let err = store.add_tag(NewTag::named("  work ")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(store.get_tags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_with_missing_parent() {
        let store = setup_store().await;
        let err = store.add_tag(NewTag::named("Orphan").parent(TagId(9))).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let store = setup_store().await;
        assert!(!store.update_tag(TagId(5), TagPatch::default().pinned(true)).await.unwrap());
        assert!(!store.delete_tag(TagId(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_self_parent_rejected() {
        let store = setup_store().await;
        let tag = store.add_tag(NewTag::named("Loop")).await.unwrap();
        let err = store
            .update_tag(tag.id, TagPatch::default().parent(Some(tag.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rename_moves_color_and_favorite() {
        let store = setup_store().await;
        let tag = store.add_tag(NewTag::named("Work").color(red())).await.unwrap();
        store.update_tag(tag.id, TagPatch::default().favorite(true)).await.unwrap();

        store.update_tag(tag.id, TagPatch::default().name("Job")).await.unwrap();

        let colors = store.get_tag_colors().await.unwrap();
        assert_eq!(colors.get("Job"), Some(&red()));
        assert!(!colors.contains_key("Work"));
        let favorites = store.favorite_names().await.unwrap();
        assert!(favorites.contains("Job"));
        assert!(!favorites.contains("Work"));
    }

    #[tokio::test]
    async fn test_rename_to_existing_name_rejected() {
        let store = setup_store().await;
        store.add_tag(NewTag::named("Work")).await.unwrap();
        let home = store.add_tag(NewTag::named("Home")).await.unwrap();
        let err = store.update_tag(home.id, TagPatch::default().name("work")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(store.get_tag(home.id).await.unwrap().unwrap().name, "Home");
    }

    #[tokio::test]
    async fn test_case_only_rename_allowed() {
        let store = setup_store().await;
        let tag = store.add_tag(NewTag::named("work")).await.unwrap();
        assert!(store.update_tag(tag.id, TagPatch::default().name("Work")).await.unwrap());
        assert_eq!(store.get_tag(tag.id).await.unwrap().unwrap().name, "Work");
    }

    #[tokio::test]
    async fn test_delete_removes_every_trace() {
        let store = setup_store().await;
        let tag = store.add_tag(NewTag::named("Gone").color(red())).await.unwrap();
        store.update_tag(tag.id, TagPatch::default().favorite(true)).await.unwrap();
        assert!(store.favorite_names().await.unwrap().contains("Gone"));

        assert!(store.delete_tag(tag.id).await.unwrap());

        assert!(store.get_tags().await.unwrap().is_empty());
        assert!(store.get_tag_colors().await.unwrap().is_empty());
        assert!(store.favorite_names().await.unwrap().is_empty());
        assert!(store.repository().load_favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_tag_color_updates_record() {
        let store = setup_store().await;
        let tag = store.add_tag(NewTag::named("Work")).await.unwrap();
        store.set_tag_color("work", red()).await.unwrap();
        assert_eq!(store.get_tag(tag.id).await.unwrap().unwrap().color, red());
        assert_eq!(store.get_tag_colors().await.unwrap().get("Work"), Some(&red()));
    }

    #[tokio::test]
    async fn test_load_from_database_picks_up_external_writes() {
        let repo = Arc::new(MemoryTagRepository::new());
        let store = CachedTagStore::from_arc(Arc::clone(&repo));
        let tag = store.add_tag(NewTag::named("Work")).await.unwrap();

        let mut external = tag.clone();
        external.is_favorite = true;
        repo.put_raw(external).await;
        assert!(!store.get_tag(tag.id).await.unwrap().unwrap().is_favorite);

        store.load_from_database().await.unwrap();
        assert!(store.get_tag(tag.id).await.unwrap().unwrap().is_favorite);
        assert!(store.favorite_names().await.unwrap().contains("Work"));
    }

    #[tokio::test]
    async fn test_favorites_mirror_repaired_on_load() {
        let repo = Arc::new(MemoryTagRepository::new());
        let stale = ["Ghost".to_string()].into_iter().collect();
        repo.save_favorites(&stale).await.unwrap();
        let store = CachedTagStore::from_arc(Arc::clone(&repo));

        assert!(store.favorite_names().await.unwrap().is_empty());
        assert!(repo.load_favorites().await.unwrap().is_empty());
    }

    // ========================
    // Remote tag API
    // ========================

    #[derive(Default)]
    struct FakeRemote {
        calls: StdMutex<Vec<String>>,
        reject: bool,
    }

    impl FakeRemote {
        fn answer(&self, call: String) -> DomainResult<RemoteResponse> {
            self.calls.lock().unwrap().push(call);
            if self.reject {
                Ok(RemoteResponse::failed("server said no"))
            } else {
                Ok(RemoteResponse::ok())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteTagApi for FakeRemote {
        async fn create_tag(&self, name: &str) -> DomainResult<RemoteResponse> {
            self.answer(format!("create:{}", name))
        }
        async fn rename_tag(&self, old_name: &str, new_name: &str) -> DomainResult<RemoteResponse> {
            self.answer(format!("rename:{}->{}", old_name, new_name))
        }
        async fn delete_tag(&self, name: &str) -> DomainResult<RemoteResponse> {
            self.answer(format!("delete:{}", name))
        }
        async fn remove_tag_from_all_notes(&self, name: &str) -> DomainResult<RemoteResponse> {
            self.answer(format!("strip:{}", name))
        }
        async fn delete_tag_and_notes(&self, name: &str) -> DomainResult<RemoteResponse> {
            self.answer(format!("purge:{}", name))
        }
    }

    #[tokio::test]
    async fn test_remote_called_by_exact_name() {
        let remote = Arc::new(FakeRemote::default());
        let store = CachedTagStore::new(MemoryTagRepository::new()).with_remote(remote.clone());

        let tag = store.add_tag(NewTag::named("Work")).await.unwrap();
        store.update_tag(tag.id, TagPatch::default().name("Job")).await.unwrap();
        store.delete_tag_with(tag.id, DeleteMode::DetachFromNotes).await.unwrap();

        assert_eq!(
            remote.calls(),
            vec!["create:Work", "rename:Work->Job", "strip:Job", "delete:Job"]
        );
    }

    #[tokio::test]
    async fn test_delete_with_notes_uses_purge() {
        let remote = Arc::new(FakeRemote::default());
        let store = CachedTagStore::new(MemoryTagRepository::new()).with_remote(remote.clone());
        let tag = store.add_tag(NewTag::named("Old")).await.unwrap();
        store.delete_tag_with(tag.id, DeleteMode::WithNotes).await.unwrap();
        assert_eq!(remote.calls().last().map(String::as_str), Some("purge:Old"));
    }

    #[tokio::test]
    async fn test_remote_rejection_leaves_local_state() {
        let remote = Arc::new(FakeRemote {
            reject: true,
            ..Default::default()
        });
        let store = CachedTagStore::new(MemoryTagRepository::new()).with_remote(remote);

        let err = store.add_tag(NewTag::named("Work")).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::Persistence("create tag failed: server said no".to_string())
        );
        assert!(err.surfaces_to_user());
        assert!(store.get_tags().await.unwrap().is_empty());
    }
}
