use metiers_core::db::{open_db_in_memory, KvError, KvResult};
use metiers_core::repo::collections::{
    CATEGORIES_KEY, CRITERIA_KEY, CRITERION_WEIGHTS_KEY, PROFESSIONS_KEY,
};
use metiers_core::{
    category_total_weight, CategoryPatch, CriterionType, EntityKind, KeyValueStore,
    MemoryKeyValueStore, ProfessionPatch, SqliteKeyValueStore, StoreError, TaxonomyStore,
};
use std::cell::Cell;

#[test]
fn added_entities_read_back_equal() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);

    let profession = store.add_profession("  Infirmier  ").unwrap();
    assert_eq!(profession.name, "Infirmier");
    assert_eq!(store.get_profession(profession.id), Some(profession.clone()));

    let category = store.add_category(" Cadre de travail ", "#e6194b").unwrap();
    assert_eq!(category.name, "Cadre de travail");
    assert_eq!(store.get_category(category.id), Some(category.clone()));

    let criterion = store.add_criterion(category.id, " Horaires ").unwrap();
    assert_eq!(criterion.name, "Horaires");
    assert_eq!(criterion.category_id, category.id);
    assert_eq!(store.get_criterion(criterion.id), Some(criterion.clone()));
    assert_eq!(store.list_criteria_for_category(category.id), vec![criterion]);
}

#[test]
fn ids_are_never_reused_after_delete() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    store.add_profession("P").unwrap();

    let first = store.add_category("A", "#e6194b").unwrap();
    let second = store.add_category("B", "#3cb44b").unwrap();
    store.delete_category(second.id).unwrap();
    let third = store.add_category("C", "#4363d8").unwrap();
    assert!(third.id > second.id);
    assert!(second.id > first.id);

    let criterion = store.add_criterion(first.id, "x").unwrap();
    store.delete_criterion(criterion.id).unwrap();
    let next = store.add_criterion(first.id, "y").unwrap();
    assert!(next.id > criterion.id);
}

#[test]
fn join_reports_profession_weights_and_totals() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let profession = store.add_profession("Développeur").unwrap();
    let category = store.add_category("Rémunération", "#e6194b").unwrap();

    for (name, weight) in [("Salaire", 10), ("Primes", 20), ("Retraite", 5)] {
        let criterion = store.add_criterion(category.id, name).unwrap();
        store
            .set_criterion_weight(profession.id, category.id, criterion.id, weight, None)
            .unwrap();
    }

    let views = store.get_categories_for_profession(profession.id);
    assert_eq!(views.len(), 1);
    let weights = views[0]
        .criteria
        .iter()
        .map(|criterion| criterion.weight)
        .collect::<Vec<_>>();
    assert_eq!(weights, vec![10, 20, 5]);
    assert_eq!(category_total_weight(&views[0]), 35);
    assert!(views[0]
        .criteria
        .iter()
        .all(|criterion| criterion.kind == CriterionType::Neutral));
}

#[test]
fn batched_join_matches_single_join() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let first = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let empty = store.add_category("Vide", "#3cb44b").unwrap();
    let shared = store.add_criterion(category.id, "shared").unwrap();
    store
        .set_criterion_weight(first.id, category.id, shared.id, 12, Some(CriterionType::Advantage))
        .unwrap();

    let second = store.add_profession("B").unwrap();
    let only_second = store.add_criterion(category.id, "only second").unwrap();
    store
        .set_criterion_weight(second.id, category.id, only_second.id, 3, None)
        .unwrap();

    let ids = [first.id, second.id, 999];
    let batched = store.get_categories_for_professions(&ids);
    for id in ids {
        assert_eq!(batched[&id], store.get_categories_for_profession(id));
    }
    assert_eq!(batched[&first.id][0].criteria.len(), 1);
    assert_eq!(batched[&second.id][0].criteria.len(), 2);
    assert!(batched[&999].iter().all(|c| c.criteria.is_empty()));
    assert_eq!(batched[&first.id][1].id, empty.id);
}

#[test]
fn weight_updates_touch_only_the_named_profession() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let first = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let criterion = store.add_criterion(category.id, "k").unwrap();
    store
        .set_criterion_weight(first.id, category.id, criterion.id, 10, Some(CriterionType::Advantage))
        .unwrap();
    let second = store.add_profession("B").unwrap();

    store
        .set_criterion_weight(second.id, category.id, criterion.id, 25, Some(CriterionType::Disadvantage))
        .unwrap();

    let first_row = store.get_criterion_weight(first.id, criterion.id).unwrap();
    assert_eq!(first_row.weight, 10);
    assert_eq!(first_row.kind, CriterionType::Advantage);
    let second_row = store.get_criterion_weight(second.id, criterion.id).unwrap();
    assert_eq!(second_row.weight, 25);
    assert_eq!(second_row.kind, CriterionType::Disadvantage);

    // `None` keeps the stored type.
    let kept = store
        .set_criterion_weight(second.id, category.id, criterion.id, 7, None)
        .unwrap();
    assert_eq!(kept.kind, CriterionType::Disadvantage);
    assert_eq!(store.list_weights_for_profession(second.id).len(), 1);
}

#[test]
fn renaming_a_criterion_keeps_weights() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let profession = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let criterion = store.add_criterion(category.id, "old").unwrap();
    store
        .set_criterion_weight(profession.id, category.id, criterion.id, 18, None)
        .unwrap();

    let renamed = store.update_criterion(criterion.id, " new ").unwrap().unwrap();
    assert_eq!(renamed.name, "new");
    let view = store.get_categories_for_profession(profession.id);
    assert_eq!(view[0].criteria[0].name, "new");
    assert_eq!(view[0].criteria[0].weight, 18);
    assert!(store.update_criterion(4242, "x").unwrap().is_none());
}

#[test]
fn deleting_a_criterion_removes_weights_for_every_profession() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let first = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let doomed = store.add_criterion(category.id, "doomed").unwrap();
    let kept = store.add_criterion(category.id, "kept").unwrap();
    for criterion in [&doomed, &kept] {
        store
            .set_criterion_weight(first.id, category.id, criterion.id, 9, None)
            .unwrap();
    }
    let second = store.add_profession("B").unwrap();
    assert_eq!(store.list_weights_for_profession(second.id).len(), 2);

    store.delete_criterion(doomed.id).unwrap();

    assert!(store.get_criterion(doomed.id).is_none());
    assert!(store.get_criterion_weight(first.id, doomed.id).is_none());
    assert!(store.get_criterion_weight(second.id, doomed.id).is_none());
    assert!(store.get_criterion_weight(second.id, kept.id).is_some());
    assert!(matches!(
        store.delete_criterion(doomed.id),
        Err(StoreError::NotFound {
            kind: EntityKind::Criterion,
            ..
        })
    ));
}

#[test]
fn category_with_criteria_cannot_be_deleted() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let criterion = store.add_criterion(category.id, "k").unwrap();

    let err = store.delete_category(category.id).unwrap_err();
    assert_eq!(
        err,
        StoreError::CategoryHasCriteria {
            category_id: category.id,
            criteria_count: 1
        }
    );
    assert!(store.get_category(category.id).is_some());

    store.delete_criterion(criterion.id).unwrap();
    store.delete_category(category.id).unwrap();
    assert!(store.list_categories().is_empty());
}

#[test]
fn category_patch_updates_only_given_fields() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let category = store.add_category("Cat", "#e6194b").unwrap();

    let patch = CategoryPatch {
        name: None,
        color: Some("#3cb44b".to_string()),
    };
    let updated = store.update_category(category.id, &patch).unwrap().unwrap();
    assert_eq!(updated.name, "Cat");
    assert_eq!(updated.color, "#3cb44b");
    assert!(store.update_category(77, &patch).unwrap().is_none());
}

#[test]
fn criterion_requires_existing_category() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let err = store.add_criterion(12, "orphan").unwrap_err();
    assert_eq!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Category,
            id: 12
        }
    );
}

#[test]
fn last_profession_deletion_reports_distinct_reasons() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let only = store.add_profession("Seul").unwrap();

    let err = store.delete_profession(only.id).unwrap_err();
    assert_eq!(err.reason_code(), "CANNOT_DELETE_LAST_PROFESSION");

    store.add_category("Cat", "#e6194b").unwrap();
    let err = store.delete_profession(only.id).unwrap_err();
    assert_eq!(err, StoreError::CannotDeleteLastProfessionWithData);
    assert_eq!(err.reason_code(), "CANNOT_DELETE_LAST_PROFESSION_WITH_DATA");
    assert_eq!(store.list_professions().len(), 1);
}

#[test]
fn deleting_a_profession_drops_its_weight_rows() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let first = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let criterion = store.add_criterion(category.id, "k").unwrap();
    store
        .set_criterion_weight(first.id, category.id, criterion.id, 5, None)
        .unwrap();
    let second = store.add_profession("B").unwrap();

    store.delete_profession(first.id).unwrap();

    assert!(store.list_weights_for_profession(first.id).is_empty());
    assert_eq!(store.list_weights_for_profession(second.id).len(), 1);
    assert_eq!(store.list_professions(), vec![second]);
}

#[test]
fn new_profession_clones_latest_profession_weights() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    let first = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let criterion = store.add_criterion(category.id, "k").unwrap();
    store
        .set_criterion_weight(first.id, category.id, criterion.id, 4, Some(CriterionType::SmallAdvantage))
        .unwrap();

    let second = store.add_profession("B").unwrap();
    store
        .set_criterion_weight(second.id, category.id, criterion.id, 28, Some(CriterionType::Disadvantage))
        .unwrap();
    let third = store.add_profession("C").unwrap();

    let cloned = store.get_criterion_weight(third.id, criterion.id).unwrap();
    assert_eq!(cloned.weight, 28);
    assert_eq!(cloned.kind, CriterionType::Disadvantage);
    assert_eq!(cloned.category_id, category.id);
}

#[test]
fn profession_limit_and_blank_names_are_enforced() {
    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    assert_eq!(
        store.add_profession("   ").unwrap_err(),
        StoreError::EmptyName(EntityKind::Profession)
    );

    for index in 0..store.limits().max_professions {
        store.add_profession(&format!("P{index}")).unwrap();
    }
    let err = store.add_profession("one too many").unwrap_err();
    assert_eq!(err, StoreError::ProfessionLimitReached { max: 5 });

    let first = store.list_professions()[0].id;
    let renamed = store
        .update_profession(
            first,
            &ProfessionPatch {
                name: Some(" Renommé ".to_string()),
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name, "Renommé");
}

#[test]
fn corrupt_persisted_collection_recovers_to_empty() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKeyValueStore::new(&conn);
    kv.set_item(CATEGORIES_KEY, "[{\"broken\"").unwrap();
    let store = TaxonomyStore::new(&kv);

    assert!(store.list_categories().is_empty());
    let category = store.add_category("Cat", "#e6194b").unwrap();
    assert_eq!(store.list_categories(), vec![category]);
}

/// Accepts reads, rejects writes to one key once armed.
struct RejectingStore {
    inner: MemoryKeyValueStore,
    rejected_key: Cell<Option<&'static str>>,
    rejected_writes: Cell<usize>,
}

impl RejectingStore {
    fn new() -> Self {
        Self {
            inner: MemoryKeyValueStore::new(),
            rejected_key: Cell::new(None),
            rejected_writes: Cell::new(0),
        }
    }

    fn reject(&self, key: &'static str) {
        self.rejected_key.set(Some(key));
    }
}

impl KeyValueStore for RejectingStore {
    fn get_item(&self, key: &str) -> KvResult<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> KvResult<()> {
        if self.rejected_key.get() == Some(key) {
            self.rejected_writes.set(self.rejected_writes.get() + 1);
            return Err(KvError::WriteRejected {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> KvResult<()> {
        self.inner.remove_item(key)
    }
}

#[test]
fn rejected_writes_are_reported_not_raised() {
    let kv = RejectingStore::new();
    kv.reject(CRITERION_WEIGHTS_KEY);
    let store = TaxonomyStore::new(&kv);
    let profession = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let criterion = store.add_criterion(category.id, "k").unwrap();

    let err = store
        .set_criterion_weight(profession.id, category.id, criterion.id, 10, None)
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::PersistFailed {
            key: CRITERION_WEIGHTS_KEY
        }
    );
    assert_eq!(kv.rejected_writes.get(), 1);
    assert!(store.list_weights_for_profession(profession.id).is_empty());
}

#[test]
fn failed_weight_clone_leaves_no_new_profession() {
    let kv = RejectingStore::new();
    let store = TaxonomyStore::new(&kv);
    let first = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let criterion = store.add_criterion(category.id, "k").unwrap();
    store
        .set_criterion_weight(first.id, category.id, criterion.id, 12, None)
        .unwrap();

    kv.reject(CRITERION_WEIGHTS_KEY);
    let err = store.add_profession("B").unwrap_err();
    assert_eq!(
        err,
        StoreError::PersistFailed {
            key: CRITERION_WEIGHTS_KEY
        }
    );
    assert_eq!(store.list_professions(), vec![first.clone()]);
    assert_eq!(store.list_weights_for_profession(first.id).len(), 1);
}

#[test]
fn failed_profession_write_restores_weight_rows() {
    let kv = RejectingStore::new();
    let store = TaxonomyStore::new(&kv);
    let first = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let criterion = store.add_criterion(category.id, "k").unwrap();
    store
        .set_criterion_weight(first.id, category.id, criterion.id, 12, None)
        .unwrap();
    let weights_before = kv.get_item(CRITERION_WEIGHTS_KEY).unwrap();

    kv.reject(PROFESSIONS_KEY);
    let err = store.add_profession("B").unwrap_err();
    assert_eq!(err, StoreError::PersistFailed { key: PROFESSIONS_KEY });
    assert_eq!(store.list_professions(), vec![first]);
    assert_eq!(kv.get_item(CRITERION_WEIGHTS_KEY).unwrap(), weights_before);
}

#[test]
fn failed_criterion_delete_keeps_its_weight_rows() {
    let kv = RejectingStore::new();
    let store = TaxonomyStore::new(&kv);
    let first = store.add_profession("A").unwrap();
    let category = store.add_category("Cat", "#e6194b").unwrap();
    let criterion = store.add_criterion(category.id, "k").unwrap();
    store
        .set_criterion_weight(first.id, category.id, criterion.id, 12, None)
        .unwrap();
    let second = store.add_profession("B").unwrap();

    kv.reject(CRITERIA_KEY);
    let err = store.delete_criterion(criterion.id).unwrap_err();
    assert_eq!(err, StoreError::PersistFailed { key: CRITERIA_KEY });

    assert!(store.get_criterion(criterion.id).is_some());
    for profession_id in [first.id, second.id] {
        let view = store.get_categories_for_profession(profession_id);
        assert_eq!(view[0].criteria.len(), 1);
        assert_eq!(view[0].criteria[0].weight, 12);
    }
}
