//! Integration tests for record versioning
//!
//! Exercises the save/select/reset/filter contract against the in-memory
//! record store, including the full edit → save → reselect → overwrite
//! cycle a host runs during an encounter.

use soap_scribe::{
    ClinicalNote, MemoryRecordStore, NoteCategory, PatientContext, PersistError, RecordId,
    RecordVersionManager, SaveError,
};

fn note_with(complaint: &str, subjective: &str) -> ClinicalNote {
    let mut note = ClinicalNote::new();
    note.append_chief_complaint(complaint);
    note.soap.append(NoteCategory::Subjective, subjective);
    note
}

fn patient(chart_id: &str, name: &str) -> PatientContext {
    PatientContext::new(chart_id, name)
}

// ============================================================================
// Versioning
// ============================================================================

mod versioning {
    use super::*;

    #[test]
    fn save_then_save_selected_keeps_one_record_with_latest_content() {
        let mut manager = RecordVersionManager::default();
        let mut store = MemoryRecordStore::new();
        let ctx = patient("P002", "이민수");

        let first = manager
            .save(&note_with("두통", "두통이 있어요"), &ctx, &mut store)
            .unwrap();
        let second = manager
            .save(
                &note_with("두통", "두통이 있어요\n어지러움도 있어요"),
                &ctx,
                &mut store,
            )
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(manager.records().len(), 1);
        assert_eq!(
            manager.records()[0].soap.subjective,
            "두통이 있어요\n어지러움도 있어요"
        );
        // The store saw both versions but holds one record
        assert_eq!(store.persisted().len(), 1);
    }

    #[test]
    fn reset_makes_next_save_a_new_record() {
        let mut manager = RecordVersionManager::default();
        let mut store = MemoryRecordStore::new();
        let ctx = patient("P002", "이민수");

        let first = manager
            .save(&note_with("두통", "두통이 있어요"), &ctx, &mut store)
            .unwrap();
        manager.reset();
        let second = manager
            .save(&note_with("기침", "기침이 나요"), &ctx, &mut store)
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(manager.records().len(), 2);
        // New records go to the front
        assert_eq!(manager.records()[0].id, second.id);
    }

    #[test]
    fn select_save_cycle_overwrites_the_selected_record() {
        let mut manager = RecordVersionManager::default();
        let mut store = MemoryRecordStore::new();
        let ctx = patient("P002", "이민수");

        let first = manager
            .save(&note_with("두통", "두통이 있어요"), &ctx, &mut store)
            .unwrap();
        manager.reset();
        manager
            .save(&note_with("기침", "기침이 나요"), &ctx, &mut store)
            .unwrap();

        // Reselect the older record, revise it, save
        let mut note = manager.select(first.id).unwrap();
        note.soap.append(NoteCategory::Plan, "진통제 처방");
        manager.save(&note, &ctx, &mut store).unwrap();

        assert_eq!(manager.records().len(), 2);
        // Order unchanged: the overwritten record is still second
        assert_eq!(manager.records()[1].id, first.id);
        assert_eq!(manager.records()[1].soap.plan, "진통제 처방");
    }

    #[test]
    fn snapshots_are_decoupled_from_later_edits() {
        let mut manager = RecordVersionManager::default();
        let mut store = MemoryRecordStore::new();
        let ctx = patient("P001", "김영희");

        let mut note = note_with("두통", "두통이 있어요");
        manager.save(&note, &ctx, &mut store).unwrap();

        // Keep editing after the save; the stored snapshot must not move
        note.soap.append(NoteCategory::Subjective, "불면도 있어요");
        assert_eq!(manager.records()[0].soap.subjective, "두통이 있어요");
    }
}

// ============================================================================
// Patient filtering
// ============================================================================

mod patient_filtering {
    use super::*;

    #[test]
    fn filter_returns_only_matching_patient_in_order() {
        let mut manager = RecordVersionManager::default();
        let mut store = MemoryRecordStore::new();

        for (chart_id, name, complaint) in [
            ("P001", "김영희", "복통"),
            ("P002", "이민수", "두통"),
            ("P002", "이민수", "기침"),
        ] {
            manager.reset();
            manager
                .save(
                    &note_with(complaint, complaint),
                    &patient(chart_id, name),
                    &mut store,
                )
                .unwrap();
        }

        let p002: Vec<_> = manager.filter_by_patient(Some("P002")).collect();
        assert_eq!(p002.len(), 2);
        assert!(p002.iter().all(|r| r.patient_id == "P002"));
        // Most-recent-first, relative order preserved
        assert_eq!(p002[0].chief_complaint, "기침");
        assert_eq!(p002[1].chief_complaint, "두통");
    }

    #[test]
    fn no_active_patient_returns_full_collection() {
        let mut manager = RecordVersionManager::default();
        let mut store = MemoryRecordStore::new();
        for chart_id in ["P001", "P002", "P003"] {
            manager.reset();
            manager
                .save(
                    &note_with("두통", "두통이 있어요"),
                    &patient(chart_id, "환자"),
                    &mut store,
                )
                .unwrap();
        }

        assert_eq!(manager.filter_by_patient(None).count(), 3);
        assert_eq!(manager.filter_by_patient(Some("P009")).count(), 0);
    }
}

// ============================================================================
// Failure paths
// ============================================================================

mod failure_paths {
    use super::*;

    #[test]
    fn persist_failure_is_surfaced_and_retryable() {
        let mut manager = RecordVersionManager::default();
        let mut store = MemoryRecordStore::new();
        let ctx = patient("P002", "이민수");
        let note = note_with("두통", "두통이 있어요");

        store.fail_next(PersistError::Unavailable("server down".to_string()));
        let result = manager.save(&note, &ctx, &mut store);

        match result {
            Err(SaveError::Persistence(e)) => assert!(e.to_string().contains("server down")),
            other => panic!("expected persistence failure, got {:?}", other.map(|r| r.id)),
        }
        // Nothing was merged locally; the note is intact for a retry
        assert!(manager.records().is_empty());
        assert_eq!(note.chief_complaint, "두통");

        let retried = manager.save(&note, &ctx, &mut store).unwrap();
        assert_eq!(manager.records().len(), 1);
        assert_eq!(manager.selected(), Some(retried.id));
    }

    #[test]
    fn empty_note_never_reaches_the_store() {
        let mut manager = RecordVersionManager::default();
        let mut store = MemoryRecordStore::new();

        let result = manager.save(
            &ClinicalNote::new(),
            &patient("P002", "이민수"),
            &mut store,
        );

        assert!(matches!(result, Err(SaveError::Validation(_))));
        assert!(store.persisted().is_empty());
        assert!(manager.records().is_empty());
    }

    #[test]
    fn selecting_a_missing_record_leaves_selection_clear() {
        let mut manager = RecordVersionManager::default();
        assert!(manager.select(RecordId::from_raw(20240128103000)).is_none());
        assert_eq!(manager.selected(), None);
    }
}
