//! Repository Integration Tests
//!
//! Exercises the repositories against an in-memory SQLite database.

#[cfg(test)]
mod tests {
    use crate::domain::{DomainError, GroupPatch, ItemPatch, ListPatch, TodoGroup, TodoItem, TodoList};
    use crate::repository::{
        init_db, GroupRepository, ItemRepository, ListRepository, ListScoped, Patchable, Repository,
        IN_MEMORY,
    };
    use chrono::Utc;
    use std::path::Path;
    use uuid::Uuid;

    struct Repos {
        lists: ListRepository,
        groups: GroupRepository,
        items: ItemRepository,
    }

    async fn setup_test_db() -> Repos {
        let db_state = init_db(Path::new(IN_MEMORY)).await.expect("Failed to init test DB");
        Repos {
            lists: ListRepository::new(db_state.connection()),
            groups: GroupRepository::new(db_state.connection()),
            items: ItemRepository::new(db_state.connection()),
        }
    }

    async fn seed(repos: &Repos) -> (TodoList, TodoGroup) {
        let list = repos.lists.create(&TodoList::new("Groceries")).await.unwrap();
        let group = repos.groups.create(&TodoGroup::new(list.id, "Produce", 0)).await.unwrap();
        (list, group)
    }

    #[tokio::test]
    async fn test_create_and_find_list() {
        let repos = setup_test_db().await;

        let list = TodoList::new("Groceries");
        repos.lists.create(&list).await.expect("Failed to create");

        let found = repos.lists.find_by_id(list.id).await.expect("Find failed");
        assert_eq!(found, Some(list));
        assert_eq!(repos.lists.find_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let repos = setup_test_db().await;
        let list = TodoList::new("Once");
        repos.lists.create(&list).await.unwrap();

        let err = repos.lists.create(&list).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_patch_list_returns_old_and_new() {
        let repos = setup_test_db().await;
        let (list, _) = seed(&repos).await;

        let (old, new) = repos
            .lists
            .patch(list.id, &ListPatch::rename("Market", Utc::now()))
            .await
            .expect("Patch failed");

        assert_eq!(old.name, "Groceries");
        assert_eq!(new.name, "Market");
        assert!(new.updated_at >= old.updated_at);
        assert_eq!(repos.lists.find_by_id(list.id).await.unwrap().unwrap().name, "Market");
    }

    #[tokio::test]
    async fn test_patch_missing_list_is_not_found() {
        let repos = setup_test_db().await;
        let err = repos
            .lists
            .patch(Uuid::new_v4(), &ListPatch::rename("x", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_groups_ordered_by_position() {
        let repos = setup_test_db().await;
        let (list, first) = seed(&repos).await;

        let third = TodoGroup::new(list.id, "Bakery", 2);
        let second = TodoGroup::new(list.id, "Dairy", 1);
        repos.groups.create_many(&[third.clone(), second.clone()]).await.unwrap();

        let other = repos.lists.create(&TodoList::new("Other")).await.unwrap();
        repos.groups.create(&TodoGroup::new(other.id, "Elsewhere", 0)).await.unwrap();

        let ids: Vec<Uuid> = repos
            .groups
            .list_by_list(list.id)
            .await
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
    }

    #[tokio::test]
    async fn test_group_for_unknown_list_is_invalid() {
        let repos = setup_test_db().await;
        let err = repos
            .groups
            .create(&TodoGroup::new(Uuid::new_v4(), "Orphan", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_patch_group_collapsed() {
        let repos = setup_test_db().await;
        let (_, group) = seed(&repos).await;

        let patch = GroupPatch {
            collapsed: Some(true),
            ..Default::default()
        };
        let (old, new) = repos.groups.patch(group.id, &patch).await.unwrap();

        assert!(!old.collapsed);
        assert!(new.collapsed);
        assert_eq!(new.name, "Produce");
    }

    #[tokio::test]
    async fn test_delete_group_removes_items() {
        let repos = setup_test_db().await;
        let (list, group) = seed(&repos).await;
        let keep = repos.groups.create(&TodoGroup::new(list.id, "Keep", 1)).await.unwrap();

        repos
            .items
            .create_many(&[
                TodoItem::new(list.id, group.id, "Apples", 0),
                TodoItem::new(list.id, group.id, "Pears", 1),
                TodoItem::new(list.id, keep.id, "Milk", 0),
            ])
            .await
            .unwrap();

        let (deleted, items) = repos.groups.delete_cascade(group.id).await.unwrap();
        assert_eq!(deleted.id, group.id);
        assert_eq!(items.iter().map(|i| i.text.as_str()).collect::<Vec<_>>(), vec!["Apples", "Pears"]);

        let remaining = repos.items.list_by_list(list.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "Milk");

        let err = repos.groups.delete(group.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_item_must_match_group_list() {
        let repos = setup_test_db().await;
        let (_, group) = seed(&repos).await;
        let other = repos.lists.create(&TodoList::new("Other")).await.unwrap();

        let wrong_list = TodoItem::new(other.id, group.id, "Misplaced", 0);
        let err = repos.items.create(&wrong_list).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let no_group = TodoItem::new(other.id, Uuid::new_v4(), "Lost", 0);
        let err = repos.items.create(&no_group).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_many_is_atomic() {
        let repos = setup_test_db().await;
        let (list, group) = seed(&repos).await;

        let err = repos
            .items
            .create_many(&[
                TodoItem::new(list.id, group.id, "Fine", 0),
                TodoItem::new(list.id, Uuid::new_v4(), "Broken", 1),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(repos.items.list_by_list(list.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_patch_item_completion() {
        let repos = setup_test_db().await;
        let (list, group) = seed(&repos).await;
        let item = repos.items.create(&TodoItem::new(list.id, group.id, "Apples", 0)).await.unwrap();

        let now = Utc::now();
        let (old, new) = repos.items.patch(item.id, &ItemPatch::completion(true, now)).await.unwrap();
        assert!(!old.done);
        assert!(new.done);
        assert_eq!(new.completed_at, Some(now));

        let stored = repos.items.find_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored, new);

        let (_, reopened) = repos
            .items
            .patch(item.id, &ItemPatch::completion(false, Utc::now()))
            .await
            .unwrap();
        assert!(!reopened.done);
        assert_eq!(reopened.completed_at, None);
    }

    #[tokio::test]
    async fn test_update_and_delete_item() {
        let repos = setup_test_db().await;
        let (list, group) = seed(&repos).await;
        let mut item = repos.items.create(&TodoItem::new(list.id, group.id, "Apples", 0)).await.unwrap();

        item.text = "Green apples".to_string();
        repos.items.update(&item).await.expect("Update failed");
        assert_eq!(repos.items.find_by_id(item.id).await.unwrap().unwrap().text, "Green apples");

        repos.items.delete(item.id).await.expect("Delete failed");
        assert_eq!(repos.items.find_by_id(item.id).await.unwrap(), None);
        assert!(matches!(repos.items.delete(item.id).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_list_cascades() {
        let repos = setup_test_db().await;
        let (list, group) = seed(&repos).await;
        repos.items.create(&TodoItem::new(list.id, group.id, "Apples", 0)).await.unwrap();

        repos.lists.delete(list.id).await.unwrap();

        assert!(repos.groups.list_by_list(list.id).await.unwrap().is_empty());
        assert!(repos.items.list_by_list(list.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_patch_item_cannot_break_completion() {
        let repos = setup_test_db().await;
        let (list, group) = seed(&repos).await;
        let item = repos.items.create(&TodoItem::new(list.id, group.id, "Apples", 0)).await.unwrap();

        let done_without_time = ItemPatch {
            done: Some(true),
            completed_at: Some(None),
            ..Default::default()
        };
        let (_, new) = repos.items.patch(item.id, &done_without_time).await.unwrap();
        assert!(new.done);
        assert!(new.completed_at.is_some());

        let time_only = ItemPatch {
            completed_at: Some(None),
            ..Default::default()
        };
        let (_, unchanged) = repos.items.patch(item.id, &time_only).await.unwrap();
        assert_eq!(unchanged.completed_at, new.completed_at);

        let stored = repos.items.find_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored.done, stored.completed_at.is_some());
    }
}
